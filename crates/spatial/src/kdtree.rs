use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use pcdomain_core::{PointId, PointView};
use std::num::NonZero;
use tracing::{debug, warn};

/// One result of a k-nearest query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Entry index inside the tree; use with [`KdTree::position`].
    pub index: usize,
    /// Id of the point in the backing table.
    pub id: PointId,
    /// Squared Euclidean distance to the query.
    pub dist_sq: f64,
}

/// A KdTree for 3D nearest-neighbour and radius queries over a point view.
///
/// Built on top of kiddo v5's `ImmutableKdTree`, which uses a cache-optimized
/// layout for faster queries than the mutable variant. The tree is built once
/// from the view's current selection and cannot be modified afterwards.
///
/// The tree keeps a copy of every indexed position together with the table
/// id it came from, so queries never need to go back to the view. Points with
/// non-finite coordinates are left out of the tree.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: ImmutableKdTree<f64, u32, 3, 32>,
    positions: Vec<[f64; 3]>,
    ids: Vec<PointId>,
}

impl KdTree {
    /// Build a KdTree from the points selected by `view`.
    ///
    /// # Panics
    ///
    /// Panics if the view selects more than `u32::MAX` points, the largest
    /// entry count the tree can address.
    pub fn build(view: &PointView<'_>) -> Self {
        assert!(
            view.len() <= u32::MAX as usize,
            "view too large for a u32-indexed tree"
        );

        let mut positions = Vec::with_capacity(view.len());
        let mut ids = Vec::with_capacity(view.len());
        for point in view.iter() {
            let p = point.position();
            if p.iter().all(|v| v.is_finite()) {
                positions.push(p);
                ids.push(point.point_id());
            }
        }

        let skipped = view.len() - positions.len();
        if skipped > 0 {
            warn!(skipped, "non-finite points left out of 3d index");
        }

        let tree = ImmutableKdTree::new_from_slice(&positions);
        debug!(points = positions.len(), "built 3d index");

        Self {
            tree,
            positions,
            ids,
        }
    }

    /// Returns the number of points in the tree.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the tree is empty.
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

    /// Find the `k` nearest neighbours to `query`.
    ///
    /// Results are ordered by ascending squared distance; equal distances are
    /// ordered by entry index.
    ///
    /// Edge cases:
    /// - Returns empty if `k == 0`, the tree is empty, or query contains NaN.
    /// - If `k > len()`, returns all points.
    pub fn knn(&self, query: &[f64; 3], k: usize) -> Vec<Neighbor> {
        let Some(nz_k) = NonZero::new(k) else {
            return Vec::new();
        };
        if self.is_empty() || !query.iter().all(|v| v.is_finite()) {
            return Vec::new();
        }

        // One extra candidate reveals whether the cutoff falls inside a run of
        // equal distances; kiddo picks arbitrarily among those.
        let mut out: Vec<Neighbor> = self
            .tree
            .nearest_n::<SquaredEuclidean>(query, nz_k.saturating_add(1))
            .into_iter()
            .map(|nn| self.neighbor(nn.item as usize, nn.distance))
            .collect();
        out.sort_by(Self::rank);

        if out.len() > k && out[k].dist_sq == out[k - 1].dist_sq {
            let cutoff = out[k - 1].dist_sq;
            out.retain(|n| n.dist_sq < cutoff);
            let mut tied: Vec<Neighbor> = self
                .tree
                .within_unsorted::<SquaredEuclidean>(
                    query,
                    cutoff + f64::EPSILON * cutoff.max(1.0),
                )
                .into_iter()
                .filter(|nn| nn.distance == cutoff)
                .map(|nn| self.neighbor(nn.item as usize, nn.distance))
                .collect();
            tied.sort_by(Self::rank);
            out.extend(tied);
        }
        out.truncate(nz_k.get());
        out
    }

    fn neighbor(&self, index: usize, dist_sq: f64) -> Neighbor {
        Neighbor {
            index,
            id: self.ids[index],
            dist_sq,
        }
    }

    fn rank(a: &Neighbor, b: &Neighbor) -> std::cmp::Ordering {
        a.dist_sq.total_cmp(&b.dist_sq).then(a.index.cmp(&b.index))
    }

    /// The single closest entry, if any.
    pub fn nearest(&self, query: &[f64; 3]) -> Option<Neighbor> {
        self.knn(query, 1).into_iter().next()
    }

    /// Find all entries within `radius` (Euclidean distance) of `query`.
    ///
    /// Returns entry indices where `euclidean_dist <= radius`, ascending.
    ///
    /// Edge cases:
    /// - Returns empty if radius <= 0, the tree is empty, radius is
    ///   non-finite, or query contains NaN.
    pub fn radius_search(&self, query: &[f64; 3], radius: f64) -> Vec<usize> {
        if self.is_empty()
            || radius <= 0.0
            || !radius.is_finite()
            || !query.iter().all(|v| v.is_finite())
        {
            return Vec::new();
        }

        let radius_sq = radius * radius;

        // kiddo's `within_unsorted` uses strict `<`. To include points
        // exactly on the boundary (dist == radius), we query with a tiny
        // epsilon added, then post-filter with `<=`.
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
