use crate::field::Field;
use crate::layout::DimId;
use crate::table::{PointId, PointTable};

/// Read access to one point of a [`PointTable`].
#[derive(Debug, Clone, Copy)]
pub struct PointRef<'t> {
    table: &'t PointTable,
    id: PointId,
}

impl<'t> PointRef<'t> {
    pub fn new(table: &'t PointTable, id: PointId) -> Self {
        assert!(id < table.len(), "point id out of bounds");
        Self { table, id }
    }

    pub fn point_id(&self) -> PointId {
        self.id
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.table.x(self.id)
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.table.y(self.id)
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.table.z(self.id)
    }

    #[inline]
    pub fn position(&self) -> [f64; 3] {
        self.table.position(self.id)
    }

    #[inline]
    pub fn get_field_as<T: Field>(&self, dim: DimId) -> T {
        self.table.get_field_as(dim, self.id)
    }
}
