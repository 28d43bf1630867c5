#![forbid(unsafe_code)]

pub mod cache;
pub mod kdtree;
pub mod planar;

pub use cache::{IndexCache, IndexKind, SearchIndex};
pub use kdtree::{KdTree, Neighbor};
pub use planar::PlanarKdTree;
