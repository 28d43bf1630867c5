use pcdomain_core::{DimId, DimType, PointId, PointTable};
use pcdomain_spatial::{IndexCache, IndexKind};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{partition, Domain};
use crate::error::FilterError;

/// How a vertical gate combines per-neighbor outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Every neighbor must lie inside the height band, otherwise the match is dropped.
    AllMustSatisfy,
    /// A single neighbor strictly inside a one-sided band is enough.
    AnySatisfies,
}

/// Height constraint applied to planar radius matches.
///
/// `above` bounds how far a neighbor may sit above the source point, `below`
/// how far it may sit beneath it. `None` disables that side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalGate {
    pub mode: GateMode,
    pub above: Option<f64>,
    pub below: Option<f64>,
}

impl VerticalGate {
    pub fn disabled(mode: GateMode) -> Self {
        Self {
            mode,
            above: None,
            below: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.above.is_some() || self.below.is_some()
    }

    /// Decides a non-empty neighborhood of a source point at height `source_z`.
    pub fn admits(&self, source_z: f64, mut neighbor_z: impl Iterator<Item = f64>) -> bool {
        if !self.is_enabled() {
            return true;
        }
        match self.mode {
            GateMode::AllMustSatisfy => neighbor_z.all(|z| {
                self.above.map_or(true, |above| z - source_z <= above)
                    && self.below.map_or(true, |below| source_z - z <= below)
            }),
            GateMode::AnySatisfies => neighbor_z.any(|z| {
                self.above
                    .is_some_and(|above| z > source_z && z - source_z < above)
                    || self
                        .below
                        .is_some_and(|below| z < source_z && source_z - z < below)
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusParams {
    pub radius: f64,
    pub search_3d: bool,
    pub gate: VerticalGate,
}

/// Source points matched by a radius scan, in id order.
///
/// Nothing is written until [`flush`](Self::flush), so the scan never observes
/// its own output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingUpdates {
    ids: Vec<PointId>,
}

impl PendingUpdates {
    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sets `out` to 0 for every point, then to 1 for each pending id.
    pub fn flush(self, table: &mut PointTable, out: DimId) {
        table.fill_field(out, 0u8);
        for id in self.ids {
            table.set_field(out, id, 1u8);
        }
    }
}

/// Scans every source point against the reference domain and collects the
/// matches.
///
/// A source point matches when its radius query returns at least one
/// reference point and, for planar searches with an enabled gate, the gate
/// admits the neighborhood. The index is taken from `cache`, so only the
/// variant actually needed gets built.
pub fn radius_vote(
    table: &PointTable,
    src: &Domain,
    reference: &Domain,
    params: &RadiusParams,
    cache: &mut IndexCache,
) -> PendingUpdates {
    let full = table.view();
    let reference_view = partition(&full, reference);
    if reference_view.is_empty() {
        debug!("empty reference domain, skipping radius scan");
        return PendingUpdates::default();
    }

    let index = cache.search_index(&reference_view, params.search_3d);
    let gated = !params.search_3d && params.gate.is_enabled();
    let radius = params.radius;

    let ids: Vec<PointId> = (0..table.len())
        .into_par_iter()
        .filter(|&id| src.contains(table, id))
        .filter(|&id| {
            let p = table.position(id);
            let neighbors = index.radius(&p, radius);
            if neighbors.is_empty() {
                return false;
            }
            !gated
                || params
                    .gate
                    .admits(p[2], neighbors.iter().map(|&i| index.position(i)[2]))
        })
        .collect();

    debug!(
        reference = reference_view.len(),
        matched = ids.len(),
        index = ?index.kind(),
        "radius scan done"
    );
    PendingUpdates { ids }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RadiusReport {
    pub matched: usize,
    pub indexes_built: Vec<IndexKind>,
}

/// A validated radius stage with its dimensions registered.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusJob {
    pub src: Domain,
    pub reference: Domain,
    pub params: RadiusParams,
    pub output: DimId,
}

impl RadiusJob {
    /// Scans, then flushes the matches into the output dimension.
    pub fn run(&self, table: &mut PointTable) -> RadiusReport {
        let mut cache = IndexCache::new();
        let pending = radius_vote(table, &self.src, &self.reference, &self.params, &mut cache);
        let report = RadiusReport {
            matched: pending.len(),
            indexes_built: cache.built_kinds(),
        };
        pending.flush(table, self.output);
        info!(
            matched = report.matched,
            mode = ?self.params.gate.mode,
            "radius stage done"
        );
        report
    }
}

fn validate_radius_options(
    reference_domain: &str,
    radius: f64,
    output: &str,
) -> Result<(), FilterError> {
    if reference_domain.is_empty() {
        return Err(FilterError::MissingName("reference_domain"));
    }
    if !radius.is_finite() || radius <= 0.0 {
        return Err(FilterError::InvalidRadius(radius));
    }
    if output.is_empty() {
        return Err(FilterError::MissingName("output dimension"));
    }
    Ok(())
}

/// Conjunctive radius voting: an 8-bit flag set on source points whose whole
/// planar neighborhood stays within `max2d_above`/`max2d_below`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadiusAssignOptions {
    pub src_domain: String,
    pub reference_domain: String,
    pub radius: f64,
    pub output_dimension: String,
    pub is3d: bool,
    /// Enabled when `>= 0`.
    pub max2d_above: f64,
    /// Enabled when `>= 0`.
    pub max2d_below: f64,
}

impl Default for RadiusAssignOptions {
    fn default() -> Self {
        Self {
            src_domain: "SRC_DOMAIN".to_string(),
            reference_domain: "REF_DOMAIN".to_string(),
            radius: 1.0,
            output_dimension: "radius".to_string(),
            is3d: false,
            max2d_above: -1.0,
            max2d_below: -1.0,
        }
    }
}

impl RadiusAssignOptions {
    pub fn validate(&self) -> Result<(), FilterError> {
        validate_radius_options(&self.reference_domain, self.radius, &self.output_dimension)
    }

    pub fn params(&self) -> RadiusParams {
        RadiusParams {
            radius: self.radius,
            search_3d: self.is3d,
            gate: VerticalGate {
                mode: GateMode::AllMustSatisfy,
                above: (self.max2d_above >= 0.0).then_some(self.max2d_above),
                below: (self.max2d_below >= 0.0).then_some(self.max2d_below),
            },
        }
    }

    /// Validates and registers the output and domain dimensions.
    pub fn prepare(&self, table: &mut PointTable) -> Result<RadiusJob, FilterError> {
        self.validate()?;
        let output = table.register_or_assign_dim(&self.output_dimension, DimType::Unsigned8);
        let reference = Domain::flag_or_everything(table, &self.reference_domain);
        let src = Domain::flag_or_everything(table, &self.src_domain);
        Ok(RadiusJob {
            src,
            reference,
            params: self.params(),
            output,
        })
    }
}

/// Disjunctive radius voting: a double-typed flag set on source points with at
/// least one planar neighbor strictly inside the one-sided height bands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadiusSearchOptions {
    pub src_domain: String,
    pub reference_domain: String,
    pub radius: f64,
    pub output_name_attribute: String,
    pub search_3d: bool,
    /// Enabled when `> 0`.
    pub search_2d_above: f64,
    /// Enabled when `> 0`.
    #[serde(alias = "search_2d_bellow")]
    pub search_2d_below: f64,
}

impl Default for RadiusSearchOptions {
    fn default() -> Self {
        Self {
            src_domain: "SRC_DOMAIN".to_string(),
            reference_domain: "REF_DOMAIN".to_string(),
            radius: 1.0,
            output_name_attribute: "radius".to_string(),
            search_3d: false,
            search_2d_above: 0.0,
            search_2d_below: 0.0,
        }
    }
}

impl RadiusSearchOptions {
    pub fn validate(&self) -> Result<(), FilterError> {
        validate_radius_options(
            &self.reference_domain,
            self.radius,
            &self.output_name_attribute,
        )
    }

    pub fn params(&self) -> RadiusParams {
        RadiusParams {
            radius: self.radius,
            search_3d: self.search_3d,
            gate: VerticalGate {
                mode: GateMode::AnySatisfies,
                above: (self.search_2d_above > 0.0).then_some(self.search_2d_above),
                below: (self.search_2d_below > 0.0).then_some(self.search_2d_below),
            },
        }
    }

    pub fn prepare(&self, table: &mut PointTable) -> Result<RadiusJob, FilterError> {
        self.validate()?;
        let output = table.register_or_assign_dim(&self.output_name_attribute, DimType::Double);
        let reference = Domain::flag_or_everything(table, &self.reference_domain);
        let src = Domain::flag_or_everything(table, &self.src_domain);
        Ok(RadiusJob {
            src,
            reference,
            params: self.params(),
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Source point at the origin with two planar neighbors: one 0.5 above it
    /// and one 3.0 above it.
    fn two_neighbor_table() -> PointTable {
        let mut table = PointTable::new();
        table.push_point(0.0, 0.0, 0.0);
        table.push_point(0.3, 0.0, 0.5);
        table.push_point(0.0, 0.3, 3.0);
        table.push_point(50.0, 50.0, 0.0);
        let reference = table.register_or_assign_dim("REF_DOMAIN", DimType::Unsigned8);
        table.set_field(reference, 1, 1u8);
        table.set_field(reference, 2, 1u8);
        let src = table.register_or_assign_dim("SRC_DOMAIN", DimType::Unsigned8);
        table.set_field(src, 0, 1u8);
        table.set_field(src, 3, 1u8);
        table
    }

    fn flags(table: &PointTable, name: &str) -> Vec<f64> {
        let dim = table.dim(name).unwrap();
        (0..table.len())
            .map(|id| table.get_field_as::<f64>(dim, id))
            .collect()
    }

    #[test]
    fn gate_modes_disagree_on_mixed_neighborhood() {
        let mut table = two_neighbor_table();
        let assign = RadiusAssignOptions {
            output_dimension: "assigned".to_string(),
            max2d_above: 1.0,
            ..RadiusAssignOptions::default()
        };
        let search = RadiusSearchOptions {
            output_name_attribute: "searched".to_string(),
            search_2d_above: 1.0,
            ..RadiusSearchOptions::default()
        };
        let assign_job = assign.prepare(&mut table).unwrap();
        let search_job = search.prepare(&mut table).unwrap();
        assign_job.run(&mut table);
        search_job.run(&mut table);

        assert_eq!(flags(&table, "assigned"), vec![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(flags(&table, "searched"), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn ungated_planar_match_ignores_height() {
        let mut table = two_neighbor_table();
        let job = RadiusAssignOptions::default().prepare(&mut table).unwrap();
        let report = job.run(&mut table);
        assert_eq!(report.matched, 1);
        assert_eq!(report.indexes_built, vec![IndexKind::Planar]);
        assert_eq!(flags(&table, "radius"), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn spatial_search_ignores_gate() {
        let mut table = two_neighbor_table();
        let opts = RadiusAssignOptions {
            is3d: true,
            max2d_above: 0.0,
            ..RadiusAssignOptions::default()
        };
        let report = opts.prepare(&mut table).unwrap().run(&mut table);
        // only the neighbor 0.58 away is inside the sphere, gate not consulted
        assert_eq!(report.indexes_built, vec![IndexKind::Spatial]);
        assert_eq!(flags(&table, "radius"), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_reference_domain_leaves_zeros() {
        let mut table = PointTable::from_xyz(vec![0.0, 0.1], vec![0.0; 2], vec![0.0; 2]);
        let job = RadiusSearchOptions {
            src_domain: String::new(),
            ..RadiusSearchOptions::default()
        }
        .prepare(&mut table)
        .unwrap();
        let report = job.run(&mut table);
        assert_eq!(report.matched, 0);
        assert!(report.indexes_built.is_empty());
        assert_eq!(flags(&table, "radius"), vec![0.0, 0.0]);
    }

    #[test]
    fn empty_source_name_scans_every_point() {
        let mut table = two_neighbor_table();
        let job = RadiusSearchOptions {
            src_domain: String::new(),
            ..RadiusSearchOptions::default()
        }
        .prepare(&mut table)
        .unwrap();
        job.run(&mut table);
        // reference points find themselves
        assert_eq!(flags(&table, "radius"), vec![1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn flush_resets_stale_output() {
        let mut table = two_neighbor_table();
        let job = RadiusAssignOptions::default().prepare(&mut table).unwrap();
        table.set_field(job.output, 3, 1u8);
        job.run(&mut table);
        assert_eq!(flags(&table, "radius"), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn pending_updates_are_not_visible_during_scan() {
        // output doubles as the source flag: the scan must see the old values
        let mut table = two_neighbor_table();
        let opts = RadiusAssignOptions {
            output_dimension: "SRC_DOMAIN".to_string(),
            ..RadiusAssignOptions::default()
        };
        let job = opts.prepare(&mut table).unwrap();
        let mut cache = IndexCache::new();
        let pending = radius_vote(&table, &job.src, &job.reference, &job.params, &mut cache);
        assert_eq!(pending.ids(), &[0]);
        pending.flush(&mut table, job.output);
        assert_eq!(flags(&table, "SRC_DOMAIN"), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn assign_gate_bounds_are_inclusive() {
        let gate = VerticalGate {
            mode: GateMode::AllMustSatisfy,
            above: Some(1.0),
            below: Some(2.0),
        };
        assert!(gate.admits(0.0, [1.0, -2.0].into_iter()));
        assert!(!gate.admits(0.0, [1.0, -2.5].into_iter()));
        assert!(!gate.admits(0.0, [1.5].into_iter()));
    }

    #[test]
    fn search_gate_bounds_are_strict_and_one_sided() {
        let gate = VerticalGate {
            mode: GateMode::AnySatisfies,
            above: Some(1.0),
            below: None,
        };
        assert!(!gate.admits(0.0, [1.0].into_iter()));
        assert!(!gate.admits(0.0, [0.0].into_iter()));
        // the disabled side never grants a match
        assert!(!gate.admits(0.0, [-0.5].into_iter()));
        assert!(gate.admits(0.0, [-0.5, 0.5].into_iter()));
    }

    #[test]
    fn disabled_gate_admits_everything() {
        let gate = VerticalGate::disabled(GateMode::AllMustSatisfy);
        assert!(gate.admits(0.0, [100.0, -100.0].into_iter()));
    }

    #[test]
    fn gate_enablement_thresholds_differ() {
        let assign = RadiusAssignOptions {
            max2d_above: 0.0,
            ..RadiusAssignOptions::default()
        };
        assert_eq!(assign.params().gate.above, Some(0.0));
        assert_eq!(assign.params().gate.below, None);

        let search = RadiusSearchOptions::default();
        assert!(!search.params().gate.is_enabled());
    }

    #[test]
    fn prepare_rejects_invalid_options() {
        let mut table = PointTable::new();
        let zero = RadiusAssignOptions {
            radius: 0.0,
            ..RadiusAssignOptions::default()
        };
        assert!(matches!(
            zero.prepare(&mut table),
            Err(FilterError::InvalidRadius(_))
        ));
        let unnamed = RadiusSearchOptions {
            output_name_attribute: String::new(),
            ..RadiusSearchOptions::default()
        };
        assert!(matches!(
            unnamed.prepare(&mut table),
            Err(FilterError::MissingName(_))
        ));
        let no_reference = RadiusSearchOptions {
            reference_domain: String::new(),
            ..RadiusSearchOptions::default()
        };
        assert!(no_reference.validate().is_err());
        // nothing registered on failure
        assert_eq!(table.layout().len(), 1);
    }

    #[test]
    fn output_types_follow_variant() {
        let mut table = PointTable::new();
        let assign = RadiusAssignOptions::default().prepare(&mut table).unwrap();
        assert_eq!(table.layout().dim_type(assign.output), DimType::Unsigned8);
        let search = RadiusSearchOptions {
            output_name_attribute: "dist".to_string(),
            ..RadiusSearchOptions::default()
        }
        .prepare(&mut table)
        .unwrap();
        assert_eq!(table.layout().dim_type(search.output), DimType::Double);
    }

    #[test]
    fn search_options_accept_legacy_spelling() {
        let opts: RadiusSearchOptions = toml::from_str(
            "reference_domain = \"GROUND\"\nsearch_2d_above = 0.5\nsearch_2d_bellow = 1.5\n",
        )
        .unwrap();
        assert_eq!(opts.reference_domain, "GROUND");
        assert_eq!(opts.src_domain, "SRC_DOMAIN");
        let gate = opts.params().gate;
        assert_eq!(gate.mode, GateMode::AnySatisfies);
        assert_eq!(gate.above, Some(0.5));
        assert_eq!(gate.below, Some(1.5));
    }

    proptest! {
        #[test]
        fn disabled_gate_modes_agree(
            pts in prop::collection::vec(
                (-20.0f64..20.0, -20.0f64..20.0, -5.0f64..5.0, any::<bool>(), any::<bool>()),
                1..150
            ),
            radius in 0.1f64..5.0,
        ) {
            let mut table = PointTable::new();
            let reference = table.register_or_assign_dim("REF_DOMAIN", DimType::Unsigned8);
            let src = table.register_or_assign_dim("SRC_DOMAIN", DimType::Unsigned8);
            for &(x, y, z, is_ref, is_src) in &pts {
                let id = table.push_point(x, y, z);
                table.set_field(reference, id, is_ref as u8);
                table.set_field(src, id, is_src as u8);
            }
            let params = |mode| RadiusParams {
                radius,
                search_3d: false,
                gate: VerticalGate::disabled(mode),
            };
            let all = radius_vote(
                &table,
                &Domain::Flag(src),
                &Domain::Flag(reference),
                &params(GateMode::AllMustSatisfy),
                &mut IndexCache::new(),
            );
            let any = radius_vote(
                &table,
                &Domain::Flag(src),
                &Domain::Flag(reference),
                &params(GateMode::AnySatisfies),
                &mut IndexCache::new(),
            );
            prop_assert_eq!(all.ids(), any.ids());
            prop_assert!(all.ids().windows(2).all(|w| w[0] < w[1]));
            for &id in all.ids() {
                prop_assert!(table.get_field_as::<u8>(src, id) == 1);
            }
        }
    }
}
