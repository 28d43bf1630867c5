use pcdomain_core::PointTable;
use pcdomain_spatial::KdTree;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{partition, Domain};
use crate::error::FilterError;

/// Options of the nearest-neighbor threshold classifier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistanceParams {
    /// Classification of the points that may be reclassified.
    pub src_domain: u8,
    /// Classification of the points searched as neighbors.
    pub reference_domain: u8,
    pub distance_min: f64,
    pub distance_max: f64,
    pub new_class_value: u8,
    /// Only reclassify points lying at or above their nearest reference point.
    #[serde(alias = "only_bellow")]
    pub only_above: bool,
}

impl Default for DistanceParams {
    fn default() -> Self {
        Self {
            src_domain: 0,
            reference_domain: 1,
            distance_min: 0.0,
            distance_max: 0.0,
            new_class_value: 100,
            only_above: false,
        }
    }
}

impl DistanceParams {
    pub fn validate(&self) -> Result<(), FilterError> {
        for (name, value) in [
            ("distance_min", self.distance_min),
            ("distance_max", self.distance_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FilterError::InvalidDistance { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyReport {
    pub reference_points: usize,
    pub visited: usize,
    pub reclassified: usize,
}

/// Reclassifies source points whose nearest reference point lies strictly
/// between `distance_min` and `distance_max`.
///
/// The index owns copies of the reference positions, so classifications are
/// written as soon as each point is decided. An empty reference domain leaves
/// the table untouched.
pub fn classify_by_distance(table: &mut PointTable, params: &DistanceParams) -> ClassifyReport {
    let mut report = ClassifyReport::default();
    let tree = {
        let full = table.view();
        let reference = partition(&full, &Domain::Class(params.reference_domain));
        report.reference_points = reference.len();
        if reference.is_empty() {
            debug!(
                reference_domain = params.reference_domain,
                "empty reference domain, nothing to classify"
            );
            return report;
        }
        KdTree::build(&reference)
    };

    let class = table.classification_dim();
    for id in 0..table.len() {
        if table.get_field_as::<u8>(class, id) != params.src_domain {
            continue;
        }
        report.visited += 1;

        let p = table.position(id);
        let Some(nearest) = tree.nearest(&p) else {
            continue;
        };
        let dist = nearest.dist_sq.sqrt();
        if dist <= params.distance_min || dist >= params.distance_max {
            continue;
        }
        if params.only_above && tree.position(nearest.index)[2] < p[2] {
            continue;
        }
        table.set_field(class, id, params.new_class_value);
        report.reclassified += 1;
    }

    info!(
        reference = report.reference_points,
        visited = report.visited,
        reclassified = report.reclassified,
        "classify_by_distance done"
    );
    report
}
