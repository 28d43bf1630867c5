use crate::field::Field;
use crate::layout::{DimId, DimType, Layout, CLASSIFICATION};
use crate::{Aabb, PointView};

pub type PointId = usize;

#[derive(Debug, Clone, PartialEq)]
enum Column {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    F64(Vec<f64>),
}

impl Column {
    fn zeroed(ty: DimType, len: usize) -> Self {
        match ty {
            DimType::Unsigned8 => Column::U8(vec![0; len]),
            DimType::Unsigned16 => Column::U16(vec![0; len]),
            DimType::Signed32 => Column::I32(vec![0; len]),
            DimType::Double => Column::F64(vec![0.0; len]),
        }
    }

    fn push_zero(&mut self) {
        match self {
            Column::U8(v) => v.push(0),
            Column::U16(v) => v.push(0),
            Column::I32(v) => v.push(0),
            Column::F64(v) => v.push(0.0),
        }
    }

    #[inline]
    fn get(&self, i: usize) -> f64 {
        match self {
            Column::U8(v) => v[i] as f64,
            Column::U16(v) => v[i] as f64,
            Column::I32(v) => v[i] as f64,
            Column::F64(v) => v[i],
        }
    }

    #[inline]
    fn set(&mut self, i: usize, value: f64) {
        match self {
            Column::U8(v) => v[i] = u8::from_f64(value),
            Column::U16(v) => v[i] = u16::from_f64(value),
            Column::I32(v) => v[i] = i32::from_f64(value),
            Column::F64(v) => v[i] = value,
        }
    }

    fn fill(&mut self, value: f64) {
        match self {
            Column::U8(v) => v.fill(u8::from_f64(value)),
            Column::U16(v) => v.fill(u16::from_f64(value)),
            Column::I32(v) => v.fill(i32::from_f64(value)),
            Column::F64(v) => v.fill(value),
        }
    }
}

/// Columnar point storage: coordinates plus named attribute dimensions.
///
/// Coordinates are immutable once a point is pushed. Attribute columns are
/// added through [`register_or_assign_dim`](Self::register_or_assign_dim) and
/// are zero-filled for existing points.
#[derive(Debug, Clone, PartialEq)]
pub struct PointTable {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    layout: Layout,
    columns: Vec<Column>,
}

impl PointTable {
    pub fn new() -> Self {
        let layout = Layout::new();
        let columns = (0..layout.len())
            .map(|i| Column::zeroed(layout.dim_type(DimId(i)), 0))
            .collect();
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            layout,
            columns,
        }
    }

    pub fn from_xyz(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        let mut table = Self::new();
        let n = x.len();
        table.x = x;
        table.y = y;
        table.z = z;
        for (i, column) in table.columns.iter_mut().enumerate() {
            *column = Column::zeroed(table.layout.dim_type(DimId(i)), n);
        }
        table
    }

    /// Builds a table from `(x, y, z, classification)` records.
    pub fn from_classified(points: &[(f64, f64, f64, u8)]) -> Self {
        let mut table = Self::new();
        let class = table.classification_dim();
        for &(x, y, z, c) in points {
            let id = table.push_point(x, y, z);
            table.set_field(class, id, c);
        }
        table
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn push_point(&mut self, x: f64, y: f64, z: f64) -> PointId {
        let id = self.x.len();
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
        for column in &mut self.columns {
            column.push_zero();
        }
        id
    }

    #[inline]
    pub fn x(&self, id: PointId) -> f64 {
        self.x[id]
    }

    #[inline]
    pub fn y(&self, id: PointId) -> f64 {
        self.y[id]
    }

    #[inline]
    pub fn z(&self, id: PointId) -> f64 {
        self.z[id]
    }

    #[inline]
    pub fn position(&self, id: PointId) -> [f64; 3] {
        [self.x[id], self.y[id], self.z[id]]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| [*x, *y, *z])
    }

    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for p in self.iter_points() {
            aabb.expand_with_point(p);
        }
        aabb
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn dim(&self, name: &str) -> Option<DimId> {
        self.layout.find(name)
    }

    pub fn classification_dim(&self) -> DimId {
        // Registered by `Layout::new`, always at index 0.
        debug_assert_eq!(self.layout.name(DimId(0)), CLASSIFICATION);
        DimId(0)
    }

    pub fn register_or_assign_dim(&mut self, name: &str, ty: DimType) -> DimId {
        let (id, created) = self.layout.register_or_assign(name, ty);
        if created {
            self.columns.push(Column::zeroed(ty, self.len()));
        }
        id
    }

    #[inline]
    pub fn get_field_as<T: Field>(&self, dim: DimId, id: PointId) -> T {
        T::from_f64(self.columns[dim.0].get(id))
    }

    #[inline]
    pub fn set_field<T: Field>(&mut self, dim: DimId, id: PointId, value: T) {
        self.columns[dim.0].set(id, value.to_f64());
    }

    /// Sets `dim` to `value` for every point.
    pub fn fill_field<T: Field>(&mut self, dim: DimId, value: T) {
        self.columns[dim.0].fill(value.to_f64());
    }

    /// A view selecting every point in id order.
    pub fn view(&self) -> PointView<'_> {
        PointView::full(self)
    }
}

impl Default for PointTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::PointTable;
    use crate::DimType;
    use proptest::prelude::*;

    #[test]
    fn new_is_empty() {
        let table = PointTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert_eq!(table.layout().len(), 1);
    }

    #[test]
    fn from_xyz_builds_table() {
        let table = PointTable::from_xyz(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.position(0), [1.0, 3.0, 5.0]);
        assert_eq!(table.position(1), [2.0, 4.0, 6.0]);
        let class = table.classification_dim();
        assert_eq!(table.get_field_as::<u8>(class, 1), 0);
    }

    #[test]
    fn from_classified_sets_classification() {
        let table = PointTable::from_classified(&[(0.0, 0.0, 0.0, 2), (1.0, 1.0, 1.0, 6)]);
        let class = table.classification_dim();
        assert_eq!(table.get_field_as::<u8>(class, 0), 2);
        assert_eq!(table.get_field_as::<u8>(class, 1), 6);
    }

    #[test]
    fn registered_dims_are_zero_filled() {
        let mut table = PointTable::from_xyz(vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]);
        let dim = table.register_or_assign_dim("grid", DimType::Unsigned8);
        for id in 0..3 {
            assert_eq!(table.get_field_as::<u8>(dim, id), 0);
        }
        let id = table.push_point(1.0, 1.0, 1.0);
        assert_eq!(table.get_field_as::<u8>(dim, id), 0);
    }

    #[test]
    fn set_field_converts_to_column_type() {
        let mut table = PointTable::from_xyz(vec![0.0], vec![0.0], vec![0.0]);
        let flag = table.register_or_assign_dim("flag", DimType::Unsigned8);
        let dist = table.register_or_assign_dim("dist", DimType::Double);
        table.set_field(flag, 0, 2.7f64);
        table.set_field(dist, 0, 2.7f64);
        assert_eq!(table.get_field_as::<u8>(flag, 0), 2);
        assert_eq!(table.get_field_as::<f64>(dist, 0), 2.7);
        table.set_field(flag, 0, 1000i32);
        assert_eq!(table.get_field_as::<u8>(flag, 0), 255);
    }

    #[test]
    fn fill_field_overwrites_every_point() {
        let mut table = PointTable::from_xyz(vec![0.0; 4], vec![0.0; 4], vec![0.0; 4]);
        let dim = table.register_or_assign_dim("out", DimType::Double);
        table.set_field(dim, 2, 9.0f64);
        table.fill_field(dim, 0u8);
        assert!((0..4).all(|id| table.get_field_as::<f64>(dim, id) == 0.0));
    }

    #[test]
    fn aabb_ignores_nan() {
        let table = PointTable::from_xyz(
            vec![0.0, f64::NAN, 2.0],
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
        );
        let aabb = table.aabb();
        assert!(aabb.contains(&[0.0, 1.0, 4.0]));
        assert!(aabb.contains(&[2.0, 3.0, 6.0]));
        assert!(!aabb.contains(&[f64::NAN, 2.0, 5.0]));
    }

    #[test]
    #[should_panic]
    fn from_xyz_panics_on_mismatch() {
        let _ = PointTable::from_xyz(vec![1.0], vec![2.0, 3.0], vec![4.0]);
    }

    proptest! {
        #[test]
        fn aabb_contains_all_finite_points(
            pts in prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0, -1000.0f64..1000.0), 1..500)
        ) {
            let table = PointTable::from_xyz(
                pts.iter().map(|p| p.0).collect(),
                pts.iter().map(|p| p.1).collect(),
                pts.iter().map(|p| p.2).collect(),
            );
            let aabb = table.aabb();
            for p in table.iter_points() {
                prop_assert!(aabb.contains(&p));
            }
        }

        #[test]
        fn unsigned8_columns_stay_in_range(value in -1000.0f64..1000.0) {
            let mut table = PointTable::from_xyz(vec![0.0], vec![0.0], vec![0.0]);
            let class = table.classification_dim();
            table.set_field(class, 0, value);
            let stored = table.get_field_as::<f64>(class, 0);
            prop_assert!((0.0..=255.0).contains(&stored));
        }
    }
}
