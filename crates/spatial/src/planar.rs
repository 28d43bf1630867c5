use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use pcdomain_core::{PointId, PointView};
use tracing::{debug, warn};

/// A KdTree over the XY projection of a point view.
///
/// Distances ignore z, so a radius query selects a vertical cylinder around
/// the query point. The full 3D position of every entry is retained for
/// callers that gate matches on height.
#[derive(Debug, Clone)]
pub struct PlanarKdTree {
    tree: ImmutableKdTree<f64, u32, 2, 32>,
    positions: Vec<[f64; 3]>,
    ids: Vec<PointId>,
}

impl PlanarKdTree {
    /// Build the tree from the XY coordinates of the points selected by `view`.
    ///
    /// # Panics
    ///
    /// Panics if the view selects more than `u32::MAX` points.
    pub fn build(view: &PointView<'_>) -> Self {
        assert!(
            view.len() <= u32::MAX as usize,
            "view too large for a u32-indexed tree"
        );

        let mut positions = Vec::with_capacity(view.len());
        let mut ids = Vec::with_capacity(view.len());
        for point in view.iter() {
            let p = point.position();
            // z may be anything finite; it is only read back for gating.
            if p.iter().all(|v| v.is_finite()) {
                positions.push(p);
                ids.push(point.point_id());
            }
        }

        let skipped = view.len() - positions.len();
        if skipped > 0 {
            warn!(skipped, "non-finite points left out of 2d index");
        }

        let planar: Vec<[f64; 2]> = positions.iter().map(|p| [p[0], p[1]]).collect();
        let tree = ImmutableKdTree::new_from_slice(&planar);
        debug!(points = positions.len(), "built 2d index");

        Self {
            tree,
            positions,
            ids,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn position(&self, index: usize) -> [f64; 3] {
        self.positions[index]
    }

    #[inline]
    pub fn point_id(&self, index: usize) -> PointId {
        self.ids[index]
    }

    /// Entries whose planar distance to `(x, y)` is `<= radius`, ascending.
    ///
    /// Same edge cases as [`KdTree::radius_search`](crate::KdTree::radius_search).
    pub fn radius_search(&self, query: &[f64; 2], radius: f64) -> Vec<usize> {
        if self.is_empty()
            || radius <= 0.0
            || !radius.is_finite()
            || !query.iter().all(|v| v.is_finite())
        {
            return Vec::new();
        }

        let radius_sq = radius * radius;
        let query_radius_sq = radius_sq + f64::EPSILON * radius_sq.max(1.0);

        let mut indices: Vec<usize> = self
            .tree
            .within_unsorted::<SquaredEuclidean>(query, query_radius_sq)
            .into_iter()
            .filter(|nn| nn.distance <= radius_sq)
            .map(|nn| nn.item as usize)
            .collect();

        indices.sort_unstable();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::PlanarKdTree;
    use pcdomain_core::PointTable;

    #[test]
    fn radius_ignores_height() {
        let table = PointTable::from_xyz(
            vec![0.0, 0.5, 3.0],
            vec![0.0, 0.0, 0.0],
            vec![100.0, -50.0, 0.0],
        );
        let tree = PlanarKdTree::build(&table.view());
        let idx = tree.radius_search(&[0.0, 0.0], 1.0);
        assert_eq!(idx, vec![0, 1]);
        assert_eq!(tree.position(1)[2], -50.0);
    }

    #[test]
    fn radius_includes_planar_boundary() {
        let table = PointTable::from_xyz(vec![3.0], vec![4.0], vec![9.0]);
        let tree = PlanarKdTree::build(&table.view());
        assert_eq!(tree.radius_search(&[0.0, 0.0], 5.0), vec![0]);
        assert!(tree.radius_search(&[0.0, 0.0], 4.99).is_empty());
    }

    #[test]
    fn empty_view_yields_nothing() {
        let table = PointTable::new();
        let tree = PlanarKdTree::build(&table.view());
        assert!(tree.is_empty());
        assert!(tree.radius_search(&[0.0, 0.0], 10.0).is_empty());
    }
}
