use geo::{BoundingRect, Contains, Coord, LineString, Point, Polygon, Rect};
use pcdomain_core::{PointId, PointTable};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::error::FilterError;

/// A polygon, optionally with holes, carrying the class it assigns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassPolygon {
    pub exterior: Vec<[f64; 2]>,
    #[serde(default)]
    pub holes: Vec<Vec<[f64; 2]>>,
    pub class_value: u8,
}

/// Polygon with its bounding rectangle computed ahead of the containment
/// tests, so the parallel scan only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPolygon {
    bounds: Rect<f64>,
    polygon: Polygon<f64>,
    class_value: u8,
}

fn ring(vertices: &[[f64; 2]]) -> Result<LineString<f64>, FilterError> {
    if vertices.len() < 3 {
        return Err(FilterError::DegeneratePolygon(vertices.len()));
    }
    Ok(vertices
        .iter()
        .map(|&[x, y]| Coord { x, y })
        .collect::<Vec<_>>()
        .into())
}

impl PreparedPolygon {
    pub fn new(polygon: &ClassPolygon) -> Result<Self, FilterError> {
        let exterior = ring(&polygon.exterior)?;
        let holes = polygon
            .holes
            .iter()
            .map(|hole| ring(hole))
            .collect::<Result<Vec<_>, _>>()?;
        // Polygon::new closes open rings.
        let shape = Polygon::new(exterior, holes);
        let bounds = shape
            .bounding_rect()
            .ok_or(FilterError::DegeneratePolygon(0))?;
        Ok(Self {
            bounds,
            polygon: shape,
            class_value: polygon.class_value,
        })
    }

    pub fn class_value(&self) -> u8 {
        self.class_value
    }

    /// Strict interior test: points on the exterior or on a hole ring are
    /// outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let point = Point::new(x, y);
        self.bounds.contains(&point) && self.polygon.contains(&point)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeoOptions {
    pub polygons: Vec<ClassPolygon>,
}

impl GeoOptions {
    pub fn prepare(&self) -> Result<Vec<PreparedPolygon>, FilterError> {
        self.polygons.iter().map(PreparedPolygon::new).collect()
    }
}

/// Sets the classification of every point inside a polygon. When polygons
/// overlap, the last one listed wins. Returns the number of points written.
pub fn classify_by_geo(table: &mut PointTable, polygons: &[PreparedPolygon]) -> usize {
    let updates: Vec<(PointId, u8)> = {
        let table = &*table;
        (0..table.len())
            .into_par_iter()
            .filter_map(|id| {
                let (x, y) = (table.x(id), table.y(id));
                polygons
                    .iter()
                    .rev()
                    .find(|p| p.contains(x, y))
                    .map(|p| (id, p.class_value))
            })
            .collect()
    };

    let class = table.classification_dim();
    for &(id, value) in &updates {
        table.set_field(class, id, value);
    }
    info!(
        polygons = polygons.len(),
        classified = updates.len(),
        "classify_by_geo done"
    );
    updates.len()
}
