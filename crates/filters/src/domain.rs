use pcdomain_core::{DimId, DimType, PointId, PointTable, PointView};
use tracing::debug;

/// Predicate selecting the points of a reference or source domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    /// Points whose classification equals the value.
    Class(u8),
    /// Points whose dimension value is strictly positive.
    Flag(DimId),
    /// Every point.
    Everything,
}

impl Domain {
    /// A flag domain on `name`, registered as an 8-bit dimension when it does
    /// not exist yet. An empty name selects every point.
    pub fn flag_or_everything(table: &mut PointTable, name: &str) -> Self {
        if name.is_empty() {
            Domain::Everything
        } else {
            Domain::Flag(table.register_or_assign_dim(name, DimType::Unsigned8))
        }
    }

    #[inline]
    pub fn contains(&self, table: &PointTable, id: PointId) -> bool {
        match *self {
            Domain::Class(value) => {
                table.get_field_as::<u8>(table.classification_dim(), id) == value
            }
            Domain::Flag(dim) => table.get_field_as::<f64>(dim, id) > 0.0,
            Domain::Everything => true,
        }
    }
}

/// Selects the points of `view` that belong to `domain`, preserving order.
///
/// The result is a new view over the same table; nothing is written.
pub fn partition<'t>(view: &PointView<'t>, domain: &Domain) -> PointView<'t> {
    let table = view.table();
    let mut out = view.make_new();
    for index in 0..view.len() {
        if domain.contains(table, view.id(index)) {
            out.append_point(view, index);
        }
    }
    debug!(selected = out.len(), of = view.len(), "partitioned domain");
    out
}
