#![forbid(unsafe_code)]

pub mod assign;
pub mod classify_by_distance;
pub mod classify_by_geo;
pub mod domain;
pub mod error;
pub mod grid_decimation;
pub mod radius_vote;

pub use assign::{assign, AssignJob, AssignOptions, DimKind, Predicate, ResolvedPredicate};
pub use classify_by_distance::{classify_by_distance, ClassifyReport, DistanceParams};
pub use classify_by_geo::{classify_by_geo, ClassPolygon, GeoOptions, PreparedPolygon};
pub use domain::{partition, Domain};
pub use error::FilterError;
pub use grid_decimation::{
    grid_decimation, Grid, GridJob, GridOptions, GridOutcome, GridParams, KeepMode,
};
pub use radius_vote::{
    radius_vote, GateMode, PendingUpdates, RadiusAssignOptions, RadiusJob, RadiusParams,
    RadiusReport, RadiusSearchOptions, VerticalGate,
};
