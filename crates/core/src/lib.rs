#![forbid(unsafe_code)]

pub mod bbox;
pub mod field;
pub mod layout;
pub mod point;
pub mod table;
pub mod view;

pub use bbox::{Aabb, Bounds2d};
pub use field::Field;
pub use layout::{DimId, DimType, Layout, CLASSIFICATION};
pub use point::PointRef;
pub use table::{PointId, PointTable};
pub use view::PointView;
