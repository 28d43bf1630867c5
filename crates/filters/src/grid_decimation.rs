use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pcdomain_core::{Bounds2d, DimId, DimType, PointId, PointTable};
use serde::Deserialize;
use tracing::{debug, info};

use crate::assign::{Predicate, ResolvedPredicate};
use crate::error::FilterError;

/// Which height a grid cell keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepMode {
    Max,
    Min,
}

impl KeepMode {
    /// Strict comparison, so ties keep the first champion.
    #[inline]
    fn improves(self, candidate: f64, champion: f64) -> bool {
        match self {
            KeepMode::Max => candidate > champion,
            KeepMode::Min => candidate < champion,
        }
    }
}

impl FromStr for KeepMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(KeepMode::Max),
            "min" => Ok(KeepMode::Min),
            other => Err(FilterError::InvalidKeepMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Champion {
    id: PointId,
    z: f64,
}

/// Regular grid of square cells over a planar extent, one champion per cell.
///
/// Cells are stored densely in row-major order. Cell `(col, row)` covers
/// `[min_x + col * edge, min_x + (col + 1) * edge)` and the same in y.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    bounds: Bounds2d,
    edge: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Option<Champion>>,
}

fn axis_cells(extent: f64, edge: f64, axis: &'static str) -> Result<usize, FilterError> {
    let cells = (extent / edge).floor() + 1.0;
    // negated so NaN fails too
    if !(cells >= 1.0 && cells <= i32::MAX as f64) {
        return Err(FilterError::GridOverflow { axis, cells });
    }
    Ok(cells as usize)
}

/// Floors `(coord - min) / edge`, then nudges the index by one when rounding
/// put the coordinate outside the nominal cell. `count` must be non-zero.
fn axis_index(coord: f64, min: f64, edge: f64, count: usize) -> usize {
    let mut i = ((coord - min) / edge).floor() as i64;
    if coord < min + i as f64 * edge {
        i -= 1;
    }
    if coord >= min + (i + 1) as f64 * edge {
        i += 1;
    }
    i.clamp(0, count as i64 - 1) as usize
}

impl Grid {
    /// Allocates every cell of `bounds` up front. An empty extent gives an
    /// empty grid.
    pub fn new(bounds: Bounds2d, edge: f64) -> Result<Self, FilterError> {
        if !edge.is_finite() || edge <= 0.0 {
            return Err(FilterError::InvalidResolution(edge));
        }
        if bounds.is_empty() {
            return Ok(Self {
                bounds: Bounds2d::empty(),
                edge,
                cols: 0,
                rows: 0,
                cells: Vec::new(),
            });
        }

        let cols = axis_cells(bounds.width(), edge, "width")?;
        let rows = axis_cells(bounds.height(), edge, "height")?;
        let total = cols
            .checked_mul(rows)
            .ok_or(FilterError::GridAllocation { cols, rows })?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(total)
            .map_err(|_| FilterError::GridAllocation { cols, rows })?;
        cells.resize(total, None);

        debug!(cols, rows, edge, "grid allocated");
        Ok(Self {
            bounds,
            edge,
            cols,
            rows,
            cells,
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn edge(&self) -> f64 {
        self.edge
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `(col, row)` of the cell holding `(x, y)`, or `None` outside the
    /// extent the grid was built for.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let col = axis_index(x, self.bounds.min_x, self.edge, self.cols);
        let row = axis_index(y, self.bounds.min_y, self.edge, self.rows);
        Some((col, row))
    }

    /// Offers a point to its cell. Returns `true` when it became the champion.
    pub fn offer(&mut self, id: PointId, position: [f64; 3], mode: KeepMode) -> bool {
        let Some((col, row)) = self.cell_of(position[0], position[1]) else {
            return false;
        };
        let z = position[2];
        let cell = &mut self.cells[row * self.cols + col];
        match cell {
            Some(champion) if !mode.improves(z, champion.z) => false,
            _ => {
                *cell = Some(Champion { id, z });
                true
            }
        }
    }

    /// Champion of `(col, row)`, if any point fell in it.
    pub fn champion(&self, col: usize, row: usize) -> Option<PointId> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells[row * self.cols + col].map(|c| c.id)
    }

    /// Champions in row-major cell order.
    pub fn champions(&self) -> impl Iterator<Item = PointId> + '_ {
        self.cells.iter().flatten().map(|c| c.id)
    }

    /// Extents of every cell, rows outer and columns inner.
    pub fn cell_bounds(&self) -> impl Iterator<Item = Bounds2d> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| {
                let x0 = self.bounds.min_x + col as f64 * self.edge;
                let y0 = self.bounds.min_y + row as f64 * self.edge;
                Bounds2d::new(x0, y0, x0 + self.edge, y0 + self.edge)
            })
        })
    }

    /// Writes one WKT `POLYGON` line per cell.
    pub fn write_wkt<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for b in self.cell_bounds() {
            writeln!(
                writer,
                "POLYGON (({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))",
                x0 = b.min_x,
                y0 = b.min_y,
                x1 = b.max_x,
                y1 = b.max_y,
            )?;
        }
        writer.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParams {
    pub edge: f64,
    pub mode: KeepMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridOutcome {
    pub grid: Grid,
    pub participants: usize,
    pub kept: usize,
}

/// Bins the selected points and flags the champion of each cell.
///
/// Only points matching `selection` (all when `None`) take part in the extent
/// and the binning, and only their output is written: 1 for champions, 0
/// otherwise. Grid errors are raised before any write.
pub fn grid_decimation(
    table: &mut PointTable,
    params: &GridParams,
    output: DimId,
    selection: Option<&ResolvedPredicate>,
) -> Result<GridOutcome, FilterError> {
    let (grid, participants) = {
        let full = table.view();
        let mut view = full.make_new();
        for (index, &id) in full.ids().iter().enumerate() {
            if selection.map_or(true, |p| p.matches(table, id)) {
                view.append_point(&full, index);
            }
        }

        let mut grid = Grid::new(view.calculate_bounds(), params.edge)?;
        for point in view.iter() {
            grid.offer(point.point_id(), point.position(), params.mode);
        }
        (grid, view.ids().to_vec())
    };

    let mut is_champion = vec![false; table.len()];
    for id in grid.champions() {
        is_champion[id] = true;
    }
    for &id in &participants {
        table.set_field(output, id, u8::from(is_champion[id]));
    }

    let kept = grid.champions().count();
    info!(
        cols = grid.cols(),
        rows = grid.rows(),
        participants = participants.len(),
        kept,
        "grid_decimation done"
    );
    Ok(GridOutcome {
        grid,
        participants: participants.len(),
        kept,
    })
}

/// Max/min height decimation over a regular grid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridOptions {
    pub resolution: f64,
    pub output_type: String,
    #[serde(alias = "output_name_attribut")]
    pub output_dimension: String,
    /// Path of the WKT cell export; empty disables it.
    pub output_wkt: String,
    #[serde(rename = "where")]
    pub selection: Option<Predicate>,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            output_type: "max".to_string(),
            output_dimension: "grid".to_string(),
            output_wkt: String::new(),
            selection: None,
        }
    }
}

impl GridOptions {
    pub fn validate(&self) -> Result<KeepMode, FilterError> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(FilterError::InvalidResolution(self.resolution));
        }
        if self.output_dimension.is_empty() {
            return Err(FilterError::MissingName("output dimension"));
        }
        self.output_type.parse()
    }

    /// Validates, registers the output dimension and truncates the WKT export.
    pub fn prepare(&self, table: &mut PointTable) -> Result<GridJob, FilterError> {
        let mode = self.validate()?;
        let selection = self
            .selection
            .as_ref()
            .map(|p| p.resolve(table.layout()))
            .transpose()?;
        let wkt = (!self.output_wkt.is_empty()).then(|| PathBuf::from(&self.output_wkt));
        if let Some(path) = &wkt {
            File::create(path)?;
        }
        let output = table.register_or_assign_dim(&self.output_dimension, DimType::Unsigned8);
        Ok(GridJob {
            params: GridParams {
                edge: self.resolution,
                mode,
            },
            output,
            selection,
            wkt,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridJob {
    pub params: GridParams,
    pub output: DimId,
    pub selection: Option<ResolvedPredicate>,
    pub wkt: Option<PathBuf>,
}

impl GridJob {
    pub fn run(&self, table: &mut PointTable) -> Result<GridOutcome, FilterError> {
        let outcome = grid_decimation(table, &self.params, self.output, self.selection.as_ref())?;
        if let Some(path) = &self.wkt {
            export_wkt(&outcome.grid, path)?;
        }
        Ok(outcome)
    }
}

fn export_wkt(grid: &Grid, path: &Path) -> Result<(), FilterError> {
    let file = File::create(path)?;
    grid.write_wkt(BufWriter::new(file))?;
    debug!(path = %path.display(), cells = grid.len(), "grid exported");
    Ok(())
}
