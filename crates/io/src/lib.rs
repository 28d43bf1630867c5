#![forbid(unsafe_code)]

pub mod las;

pub use las::{read_las, write_las, LasCloud, INTENSITY};
