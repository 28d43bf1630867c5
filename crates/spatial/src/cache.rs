use pcdomain_core::PointView;
use tracing::debug;

use crate::{KdTree, PlanarKdTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Spatial,
    Planar,
}

/// Lazily built spatial indexes for one reference view.
///
/// Each variant is built on first request and reused while the view's stamp
/// is unchanged. Requesting an index for a view whose stamp differs from the
/// cached one drops the stale index and rebuilds it.
#[derive(Debug, Default)]
pub struct IndexCache {
    spatial: Option<(u64, KdTree)>,
    planar: Option<(u64, PlanarKdTree)>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spatial(&mut self, view: &PointView<'_>) -> &KdTree {
        let stamp = view.stamp();
        if self.spatial.as_ref().is_some_and(|(s, _)| *s != stamp) {
            debug!("reference view changed, dropping stale 3d index");
            self.spatial = None;
        }
        &self
            .spatial
            .get_or_insert_with(|| (stamp, KdTree::build(view)))
            .1
    }

    pub fn planar(&mut self, view: &PointView<'_>) -> &PlanarKdTree {
        let stamp = view.stamp();
        if self.planar.as_ref().is_some_and(|(s, _)| *s != stamp) {
            debug!("reference view changed, dropping stale 2d index");
            self.planar = None;
        }
        &self
            .planar
            .get_or_insert_with(|| (stamp, PlanarKdTree::build(view)))
            .1
    }

    /// The index a radius query of the given dimensionality runs against.
    pub fn search_index(&mut self, view: &PointView<'_>, search_3d: bool) -> SearchIndex<'_> {
        if search_3d {
            SearchIndex::Spatial(self.spatial(view))
        } else {
            SearchIndex::Planar(self.planar(view))
        }
    }

    /// Kinds that currently hold a built index, spatial first.
    pub fn built_kinds(&self) -> Vec<IndexKind> {
        let mut kinds = Vec::new();
        if self.spatial.is_some() {
            kinds.push(IndexKind::Spatial);
        }
        if self.planar.is_some() {
            kinds.push(IndexKind::Planar);
        }
        kinds
    }

    pub fn clear(&mut self) {
        self.spatial = None;
        self.planar = None;
    }
}

/// A borrowed index answering radius queries in 3D or in the XY plane.
#[derive(Debug, Clone, Copy)]
pub enum SearchIndex<'a> {
    Spatial(&'a KdTree),
    Planar(&'a PlanarKdTree),
}

impl SearchIndex<'_> {
    pub fn kind(&self) -> IndexKind {
        match self {
            SearchIndex::Spatial(_) => IndexKind::Spatial,
            SearchIndex::Planar(_) => IndexKind::Planar,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchIndex::Spatial(t) => t.len(),
            SearchIndex::Planar(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries within `radius` of `query`; the planar variant ignores z.
    pub fn radius(&self, query: &[f64; 3], radius: f64) -> Vec<usize> {
        match self {
            SearchIndex::Spatial(t) => t.radius_search(query, radius),
            SearchIndex::Planar(t) => t.radius_search(&[query[0], query[1]], radius),
        }
    }

    #[inline]
    pub fn position(&self, index: usize) -> [f64; 3] {
        match self {
            SearchIndex::Spatial(t) => t.position(index),
            SearchIndex::Planar(t) => t.position(index),
        }
    }
}
