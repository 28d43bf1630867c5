use pcdomain_core::{DimId, DimType, Layout, PointId, PointTable};
use serde::Deserialize;
use tracing::info;

use crate::error::FilterError;

/// Attribute condition selecting points by dimension value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Equals { dimension: String, value: f64 },
    NotEquals { dimension: String, value: f64 },
    In { dimension: String, values: Vec<f64> },
    All { of: Vec<Predicate> },
    Any { of: Vec<Predicate> },
}

impl Predicate {
    pub fn equals(dimension: &str, value: f64) -> Self {
        Predicate::Equals {
            dimension: dimension.to_string(),
            value,
        }
    }

    /// Points whose classification is one of `classes`.
    pub fn class_in(classes: &[u8]) -> Self {
        Predicate::In {
            dimension: pcdomain_core::CLASSIFICATION.to_string(),
            values: classes.iter().map(|&c| f64::from(c)).collect(),
        }
    }

    /// Binds dimension names to ids of `layout`.
    pub fn resolve(&self, layout: &Layout) -> Result<ResolvedPredicate, FilterError> {
        let find = |name: &str| {
            layout
                .find(name)
                .ok_or_else(|| FilterError::UnknownDimension(name.to_string()))
        };
        Ok(match self {
            Predicate::Equals { dimension, value } => {
                ResolvedPredicate::Equals(find(dimension)?, *value)
            }
            Predicate::NotEquals { dimension, value } => {
                ResolvedPredicate::NotEquals(find(dimension)?, *value)
            }
            Predicate::In { dimension, values } => {
                ResolvedPredicate::In(find(dimension)?, values.clone())
            }
            Predicate::All { of } => ResolvedPredicate::All(
                of.iter()
                    .map(|p| p.resolve(layout))
                    .collect::<Result<_, _>>()?,
            ),
            Predicate::Any { of } => ResolvedPredicate::Any(
                of.iter()
                    .map(|p| p.resolve(layout))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedPredicate {
    Equals(DimId, f64),
    NotEquals(DimId, f64),
    In(DimId, Vec<f64>),
    /// True when every member matches; an empty list matches everything.
    All(Vec<ResolvedPredicate>),
    /// True when some member matches; an empty list matches nothing.
    Any(Vec<ResolvedPredicate>),
}

impl ResolvedPredicate {
    pub fn matches(&self, table: &PointTable, id: PointId) -> bool {
        match self {
            ResolvedPredicate::Equals(dim, value) => table.get_field_as::<f64>(*dim, id) == *value,
            ResolvedPredicate::NotEquals(dim, value) => {
                table.get_field_as::<f64>(*dim, id) != *value
            }
            ResolvedPredicate::In(dim, values) => {
                let v = table.get_field_as::<f64>(*dim, id);
                values.contains(&v)
            }
            ResolvedPredicate::All(of) => of.iter().all(|p| p.matches(table, id)),
            ResolvedPredicate::Any(of) => of.iter().any(|p| p.matches(table, id)),
        }
    }
}

/// Storage type of a dimension created by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimKind {
    #[default]
    Uint8,
    Uint16,
    Int32,
    Double,
}

impl From<DimKind> for DimType {
    fn from(kind: DimKind) -> Self {
        match kind {
            DimKind::Uint8 => DimType::Unsigned8,
            DimKind::Uint16 => DimType::Unsigned16,
            DimKind::Int32 => DimType::Signed32,
            DimKind::Double => DimType::Double,
        }
    }
}

/// Writes a constant into a dimension, creating it when missing.
///
/// This is how boolean domains get synthesized from classifications before a
/// radius stage, e.g. `REF_DOMAIN = 1 where Classification in [6]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignOptions {
    pub dimension: String,
    pub value: f64,
    #[serde(default, rename = "type")]
    pub kind: DimKind,
    #[serde(default, rename = "where")]
    pub selection: Option<Predicate>,
}

impl AssignOptions {
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.dimension.is_empty() {
            return Err(FilterError::MissingName("dimension"));
        }
        Ok(())
    }

    pub fn prepare(&self, table: &mut PointTable) -> Result<AssignJob, FilterError> {
        self.validate()?;
        let dim = table.register_or_assign_dim(&self.dimension, self.kind.into());
        let selection = self
            .selection
            .as_ref()
            .map(|p| p.resolve(table.layout()))
            .transpose()?;
        Ok(AssignJob {
            dim,
            value: self.value,
            selection,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignJob {
    pub dim: DimId,
    pub value: f64,
    pub selection: Option<ResolvedPredicate>,
}

impl AssignJob {
    pub fn run(&self, table: &mut PointTable) -> usize {
        assign(table, self.dim, self.value, self.selection.as_ref())
    }
}

/// Sets `dim` to `value` on every point matching `selection` (all points when
/// `None`). Returns the number of points written.
pub fn assign(
    table: &mut PointTable,
    dim: DimId,
    value: f64,
    selection: Option<&ResolvedPredicate>,
) -> usize {
    let targets: Vec<PointId> = (0..table.len())
        .filter(|&id| selection.map_or(true, |p| p.matches(table, id)))
        .collect();
    for &id in &targets {
        table.set_field(dim, id, value);
    }
    info!(
        dimension = table.layout().name(dim),
        value,
        points = targets.len(),
        "assign done"
    );
    targets.len()
}
