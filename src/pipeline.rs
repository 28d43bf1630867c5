//! Ordered execution of configured stages over one point table.

use pcdomain_core::PointTable;
use pcdomain_filters::{
    classify_by_distance, classify_by_geo, AssignJob, ClassifyReport, DistanceParams,
    FilterError, GridJob, PreparedPolygon, RadiusJob, RadiusReport,
};
use pcdomain_io::{read_las, write_las};
use tracing::{info, info_span};

use crate::config::{PipelineConfig, StageConfig};
use crate::error::AppError;

/// What a stage did to the table.
#[derive(Debug, Clone, PartialEq)]
pub enum StageReport {
    Assign {
        points: usize,
    },
    ClassifyByDistance(ClassifyReport),
    Radius(RadiusReport),
    GridDecimation {
        cols: usize,
        rows: usize,
        participants: usize,
        kept: usize,
    },
    ClassifyByGeo {
        classified: usize,
    },
}

#[derive(Debug)]
enum PreparedStage {
    Assign(AssignJob),
    ClassifyByDistance(DistanceParams),
    Radius(RadiusJob),
    Grid(GridJob),
    Geo(Vec<PreparedPolygon>),
}

impl PreparedStage {
    fn run(&self, table: &mut PointTable) -> Result<StageReport, FilterError> {
        Ok(match self {
            PreparedStage::Assign(job) => StageReport::Assign {
                points: job.run(table),
            },
            PreparedStage::ClassifyByDistance(params) => {
                StageReport::ClassifyByDistance(classify_by_distance(table, params))
            }
            PreparedStage::Radius(job) => StageReport::Radius(job.run(table)),
            PreparedStage::Grid(job) => {
                let outcome = job.run(table)?;
                StageReport::GridDecimation {
                    cols: outcome.grid.cols(),
                    rows: outcome.grid.rows(),
                    participants: outcome.participants,
                    kept: outcome.kept,
                }
            }
            PreparedStage::Geo(polygons) => StageReport::ClassifyByGeo {
                classified: classify_by_geo(table, polygons),
            },
        })
    }
}

/// A validated list of stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<StageConfig>,
}

impl Pipeline {
    /// Validates every stage before any table is touched.
    pub fn new(stages: Vec<StageConfig>) -> Result<Self, FilterError> {
        for stage in &stages {
            stage.validate()?;
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    /// Registers every stage's dimensions on `table`, in stage order, and
    /// truncates grid exports. A stage may select on dimensions created by
    /// the stages before it.
    pub fn prepare(&self, table: &mut PointTable) -> Result<PreparedPipeline, FilterError> {
        let mut prepared = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let job = match stage {
                StageConfig::Assign(opts) => PreparedStage::Assign(opts.prepare(table)?),
                StageConfig::ClassifyByDistance(params) => {
                    PreparedStage::ClassifyByDistance(params.clone())
                }
                StageConfig::RadiusAssign(opts) => PreparedStage::Radius(opts.prepare(table)?),
                StageConfig::RadiusSearch(opts) => PreparedStage::Radius(opts.prepare(table)?),
                StageConfig::GridDecimation(opts) => PreparedStage::Grid(opts.prepare(table)?),
                StageConfig::ClassifyByGeo(opts) => PreparedStage::Geo(opts.prepare()?),
            };
            prepared.push((stage.name(), job));
        }
        Ok(PreparedPipeline { stages: prepared })
    }
}

/// Stages bound to the dimensions of one table.
#[derive(Debug)]
pub struct PreparedPipeline {
    stages: Vec<(&'static str, PreparedStage)>,
}

impl PreparedPipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the stages in order. A failing stage leaves the table as the
    /// previous stages wrote it.
    pub fn run(&self, table: &mut PointTable) -> Result<Vec<StageReport>, FilterError> {
        let mut reports = Vec::with_capacity(self.stages.len());
        for (index, (name, stage)) in self.stages.iter().enumerate() {
            let _span = info_span!("stage", index, name).entered();
            reports.push(stage.run(table)?);
        }
        Ok(reports)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub points_read: usize,
    pub points_written: Option<usize>,
    pub reports: Vec<StageReport>,
}

/// Reads the input, runs every stage and writes the output when one is
/// configured.
pub fn run_from_config(config: &PipelineConfig) -> Result<RunSummary, AppError> {
    config.validate()?;
    let input = config
        .input
        .as_ref()
        .ok_or_else(|| AppError::Config("no input file given".to_string()))?;

    let pipeline = Pipeline::new(config.stages.clone())?;
    let mut cloud = read_las(input)?;
    let prepared = pipeline.prepare(&mut cloud.table)?;
    let reports = prepared.run(&mut cloud.table)?;

    let points_written = match &config.output {
        Some(output) => {
            let keep = match &config.keep_where {
                Some(predicate) => {
                    let resolved = predicate.resolve(cloud.table.layout())?;
                    Some(
                        (0..cloud.table.len())
                            .map(|id| resolved.matches(&cloud.table, id))
                            .collect::<Vec<_>>(),
                    )
                }
                None => None,
            };
            Some(write_las(output, &cloud, keep.as_deref())?)
        }
        None => None,
    };

    info!(
        read = cloud.table.len(),
        written = ?points_written,
        stages = reports.len(),
        "pipeline finished"
    );
    Ok(RunSummary {
        points_read: cloud.table.len(),
        points_written,
        reports,
    })
}
