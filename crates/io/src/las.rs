use las::{Read as _, Write as _};
use pcdomain_core::{DimType, PointTable};
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Name of the dimension intensity is loaded into.
pub const INTENSITY: &str = "Intensity";

/// Highest class point formats 0 to 5 can store.
const LEGACY_CLASS_MAX: u8 = 31;

/// Class code LAS reserves for overlap points, stored as a flag instead.
const OVERLAP_CLASS: u8 = 12;

/// A LAS file loaded into a point table.
///
/// The raw records are kept so that attributes the table does not model are
/// written back unchanged.
#[derive(Debug, Clone)]
pub struct LasCloud {
    pub table: PointTable,
    pub header: las::Header,
    pub points: Vec<las::Point>,
}

fn invalid_data(context: &str, e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("{context}: {e}"))
}

pub fn read_las(path: impl AsRef<Path>) -> io::Result<LasCloud> {
    let path = path.as_ref();
    let mut reader = las::Reader::from_path(path)
        .map_err(|e| io::Error::other(format!("failed to open LAS file: {}", e)))?;
    let header = reader.header().clone();

    let mut table = PointTable::new();
    let class = table.classification_dim();
    let intensity = table.register_or_assign_dim(INTENSITY, DimType::Unsigned16);
    let mut points = Vec::new();

    for point_result in reader.points() {
        let point = point_result.map_err(|e| invalid_data("failed to read LAS point", e))?;
        let id = table.push_point(point.x, point.y, point.z);
        table.set_field(class, id, u8::from(point.classification));
        table.set_field(intensity, id, point.intensity);
        points.push(point);
    }

    info!(path = %path.display(), points = points.len(), "read LAS");
    Ok(LasCloud {
        table,
        header,
        points,
    })
}

/// Checks that `value` can be stored as a classification in `format`.
fn check_class(format: &las::point::Format, id: usize, value: u8) -> io::Result<()> {
    let reason = if value == OVERLAP_CLASS {
        "class 12 is reserved for overlap points"
    } else if !format.is_extended && value > LEGACY_CLASS_MAX {
        "point formats 0 to 5 store classes up to 31"
    } else {
        return Ok(());
    };
    Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("point {id} has classification {value}: {reason}"),
    ))
}

/// Writes the records of `cloud` with the table's current classification.
///
/// With `keep`, only points whose entry is `true` are written. Returns the
/// number of points written.
///
/// Classification is the only table dimension written back. Other output
/// dimensions (grid or radius flags) reach the file only through `keep`.
/// Every selected class is checked before the file is created, so a
/// rejected cloud leaves nothing on disk.
pub fn write_las(
    path: impl AsRef<Path>,
    cloud: &LasCloud,
    keep: Option<&[bool]>,
) -> io::Result<usize> {
    let path = path.as_ref();
    if cloud.points.len() != cloud.table.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "table has {} points but {} LAS records",
                cloud.table.len(),
                cloud.points.len()
            ),
        ));
    }
    if let Some(keep) = keep {
        if keep.len() != cloud.points.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "selection has {} entries for {} points",
                    keep.len(),
                    cloud.points.len()
                ),
            ));
        }
    }

    let class = cloud.table.classification_dim();
    let format = cloud.header.point_format();
    let selected: Vec<(usize, u8)> = (0..cloud.points.len())
        .filter(|&id| keep.map_or(true, |keep| keep[id]))
        .map(|id| (id, cloud.table.get_field_as::<u8>(class, id)))
        .collect();
    for &(id, value) in &selected {
        check_class(format, id, value)?;
    }

    let result = write_records(path, cloud, &selected);
    if result.is_err() {
        let _ = std::fs::remove_file(path);
    }
    let written = result?;


    debug!(path = %path.display(), written, "wrote LAS");
    Ok(written)
}

fn write_records(path: &Path, cloud: &LasCloud, selected: &[(usize, u8)]) -> io::Result<usize> {
    let mut writer = las::Writer::from_path(path, cloud.header.clone())
        .map_err(|e| io::Error::other(format!("failed to create LAS file: {}", e)))?;
    for &(id, value) in selected {
        let mut point = cloud.points[id].clone();
        point.classification = las::point::Classification::new(value)
            .map_err(|e| invalid_data("invalid classification", e))?;
        writer
            .write(point)
            .map_err(|e| invalid_data("failed to write LAS point", e))?;
    }
    writer
        .close()
        .map_err(|e| io::Error::other(format!("failed to finish LAS file: {}", e)))?;
    Ok(selected.len())
}
