use thiserror::Error;

/// Configuration and setup failures of a filter.
///
/// Every variant is raised before the filter writes to any point.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid 'radius' option: {0}, must be > 0")]
    InvalidRadius(f64),

    #[error("resolution must be positive, got {0}")]
    InvalidResolution(f64),

    #[error("invalid '{name}' option: {value}, must be finite and >= 0")]
    InvalidDistance { name: &'static str, value: f64 },

    #[error("the output_type must be 'max' or 'min', got '{0}'")]
    InvalidKeepMode(String),

    #[error("the {0} must be given")]
    MissingName(&'static str),

    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),

    #[error("grid {axis} out of range: {cells} cells")]
    GridOverflow { axis: &'static str, cells: f64 },

    #[error("grid of {cols} x {rows} cells cannot be allocated")]
    GridAllocation { cols: usize, rows: usize },

    #[error("polygon ring needs at least 3 vertices, got {0}")]
    DegeneratePolygon(usize),

    #[error("grid export failed: {0}")]
    Io(#[from] std::io::Error),
}
