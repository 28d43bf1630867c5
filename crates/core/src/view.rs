use std::sync::atomic::{AtomicU64, Ordering};

use crate::table::{PointId, PointTable};
use crate::{Aabb, Bounds2d, PointRef};

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

fn fresh_stamp() -> u64 {
    NEXT_STAMP.fetch_add(1, Ordering::Relaxed)
}

/// An ordered selection of point ids over a shared [`PointTable`].
///
/// Views own only their id list; coordinates and attributes stay in the
/// table. Every mutation of the selection takes a fresh stamp from a
/// process-wide counter, so a stamp identifies one exact state of one view.
/// Spatial indexes cache against the stamp and must be rebuilt when it
/// changes.
#[derive(Debug, Clone)]
pub struct PointView<'t> {
    table: &'t PointTable,
    ids: Vec<PointId>,
    stamp: u64,
}

impl<'t> PointView<'t> {
    /// A view over every point of `table`, in id order.
    pub fn full(table: &'t PointTable) -> Self {
        Self {
            table,
            ids: (0..table.len()).collect(),
            stamp: fresh_stamp(),
        }
    }

    /// An empty view backed by the same table.
    pub fn make_new(&self) -> PointView<'t> {
        Self {
            table: self.table,
            ids: Vec::new(),
            stamp: fresh_stamp(),
        }
    }

    /// Appends the point at `index` of `source` to this view.
    ///
    /// # Panics
    ///
    /// Panics if `source` is backed by a different table or `index` is out of
    /// bounds.
    pub fn append_point(&mut self, source: &PointView<'t>, index: usize) {
        assert!(
            std::ptr::eq(self.table, source.table),
            "views must share a point table"
        );
        self.push_id(source.ids[index]);
    }

    pub fn push_id(&mut self, id: PointId) {
        assert!(id < self.table.len(), "point id out of bounds");
        self.ids.push(id);
        self.stamp = fresh_stamp();
    }

    pub fn table(&self) -> &'t PointTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Table id of the point at `index` in this view.
    #[inline]
    pub fn id(&self, index: usize) -> PointId {
        self.ids[index]
    }

    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    #[inline]
    pub fn point(&self, index: usize) -> PointRef<'t> {
        PointRef::new(self.table, self.ids[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = PointRef<'t>> + '_ {
        self.ids.iter().map(|&id| PointRef::new(self.table, id))
    }

    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for &id in &self.ids {
            aabb.expand_with_point(self.table.position(id));
        }
        aabb
    }

    /// Planar bounds of the finite points in the view.
    pub fn calculate_bounds(&self) -> Bounds2d {
        self.aabb().to_2d()
    }
}
