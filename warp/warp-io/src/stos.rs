//! Slice-to-slice registration file parsing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;
use warp_transform::{
    DiscreteTransform, FallbackTransform, GridTopologyCache, GridTransform, PointMapping,
};
use warp_types::{GridRect, MappingPoint, Point2, TransformInfo};

use crate::error::{IoError, IoResult};
use crate::params::TransformParameters;

/// A transform constructed from a textual description.
///
/// Grid descriptions produce a bare [`GridTransform`]; mesh descriptions
/// produce a [`FallbackTransform`] (the triangulated mesh backed by a
/// thin-plate-spline for points outside its hull), matching what
/// downstream assembly expects from each description type.
#[derive(Debug)]
pub enum ParsedTransform {
    /// A uniform-grid transform.
    Grid(GridTransform),
    /// A mesh transform with a continuous fallback.
    Mesh(Box<FallbackTransform>),
}

impl ParsedTransform {
    /// The transform's point array.
    #[must_use]
    pub fn points(&self) -> &[MappingPoint] {
        match self {
            Self::Grid(t) => t.points(),
            Self::Mesh(t) => t.points(),
        }
    }

    /// Transform metadata.
    #[must_use]
    pub fn info(&self) -> &TransformInfo {
        match self {
            Self::Grid(t) => t.info(),
            Self::Mesh(t) => t.info(),
        }
    }

    /// Bounding rectangle of the control points.
    #[must_use]
    pub fn control_bounds(&self) -> GridRect {
        match self {
            Self::Grid(t) => t.control_bounds(),
            Self::Mesh(t) => t.control_bounds(),
        }
    }

    /// Bounding rectangle of the mapped points.
    #[must_use]
    pub fn mapped_bounds(&self) -> GridRect {
        match self {
            Self::Grid(t) => t.mapped_bounds(),
            Self::Mesh(t) => t.mapped_bounds(),
        }
    }

    /// Grid dimensions, when this is a grid transform.
    #[must_use]
    pub fn grid_size(&self) -> Option<(usize, usize)> {
        match self {
            Self::Grid(t) => Some((t.grid_size_x(), t.grid_size_y())),
            Self::Mesh(_) => None,
        }
    }

    /// The underlying discrete transform, when one exists.
    #[must_use]
    pub fn discrete(&self) -> Option<&DiscreteTransform> {
        match self {
            Self::Grid(_) => None,
            Self::Mesh(t) => Some(t.discrete()),
        }
    }
}

impl PointMapping for ParsedTransform {
    fn try_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        match self {
            Self::Grid(t) => t.try_transform(point),
            Self::Mesh(t) => t.try_transform(point),
        }
    }

    fn try_inverse_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        match self {
            Self::Grid(t) => t.try_inverse_transform(point),
            Self::Mesh(t) => t.try_inverse_transform(point),
        }
    }

    fn can_transform(&self, point: &Point2<f64>) -> bool {
        match self {
            Self::Grid(t) => t.can_transform(point),
            Self::Mesh(t) => t.can_transform(point),
        }
    }

    fn can_inverse_transform(&self, point: &Point2<f64>) -> bool {
        match self {
            Self::Grid(t) => t.can_inverse_transform(point),
            Self::Mesh(t) => t.can_inverse_transform(point),
        }
    }

    fn mappable_bounds(&self) -> Option<GridRect> {
        match self {
            Self::Grid(t) => t.mappable_bounds(),
            Self::Mesh(t) => t.mappable_bounds(),
        }
    }
}

/// Parse a slice-to-slice registration file.
///
/// The section identifiers and the pixel-spacing factor come from the
/// file name (`<mapped>-<control>_<method>_<spacing>.stos`); the
/// last-modified time of the file becomes the transform's metadata
/// timestamp for cache invalidation.
///
/// # Errors
///
/// Filesystem errors, malformed content, or an unsupported transform
/// type.
pub fn parse_stos_file(
    path: impl AsRef<Path>,
    topology: &GridTopologyCache,
) -> IoResult<ParsedTransform> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IoError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IoError::Io(e)
        }
    })?;

    let modified = std::fs::metadata(path)?.modified()?;
    let (control_section, mapped_section, pixel_spacing) = file_name_fields(path);
    let info = TransformInfo::new(control_section, mapped_section, modified);

    let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
    parse_stos(&lines, info, pixel_spacing, topology)
}

/// `<mapped>-<control>_<method>_<spacing>` from a stos file name.
///
/// Missing or non-numeric fields fall back to section 0 / spacing 1.
fn file_name_fields(path: &Path) -> (i32, i32, f64) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let fields: Vec<&str> = stem.split(['-', '_']).collect();

    let mapped_section = fields.first().and_then(|s| s.parse().ok()).unwrap_or(0);
    let control_section = fields.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let pixel_spacing = fields.get(3).and_then(|s| s.parse().ok()).unwrap_or(1.0);

    (control_section, mapped_section, pixel_spacing)
}

/// Parse the lines of a slice-to-slice registration file.
///
/// Lines 0-3 are the image and mask references the registration tool
/// recorded; line 4 carries the control bounds, line 5 the mapped
/// bounds (both as `left bottom width height`), and line 6 the transform
/// entry.
///
/// # Errors
///
/// [`IoError::InvalidContent`] for a truncated file or malformed values,
/// [`IoError::UnsupportedTransform`] for an unknown type token.
pub fn parse_stos(
    lines: &[String],
    info: TransformInfo,
    pixel_spacing: f64,
    topology: &GridTopologyCache,
) -> IoResult<ParsedTransform> {
    if lines.len() < 7 {
        return Err(IoError::invalid(format!(
            "stos content has {} lines, expected at least 7",
            lines.len()
        )));
    }

    let control_bounds = parse_bounds_line(&lines[4], pixel_spacing, false)?;
    // Mapped header bounds are whole pixels in this format.
    let mapped_bounds = parse_bounds_line(&lines[5], pixel_spacing, true)?;
    debug!(
        ?control_bounds,
        ?mapped_bounds,
        pixel_spacing,
        "parsed stos header"
    );

    let entry = TransformParameters::parse(&lines[6])?;
    match entry.name.to_ascii_lowercase().as_str() {
        "gridtransform_double_2_2" => grid_from_params(&entry, pixel_spacing, info, topology),
        "meshtransform_double_2_2" => mesh_from_params(&entry, pixel_spacing, info),
        other => Err(IoError::UnsupportedTransform {
            name: other.to_string(),
        }),
    }
}

/// Parse a single transform entry (one tile of a mosaic description).
///
/// Supports the grid, mesh, and translation entry types; everything else
/// is [`IoError::UnsupportedTransform`].
///
/// # Errors
///
/// Malformed entries or an unsupported type token.
pub fn parse_transform_entry(
    entry: &str,
    info: TransformInfo,
    topology: &GridTopologyCache,
) -> IoResult<ParsedTransform> {
    let params = TransformParameters::parse(entry)?;
    match params.name.to_ascii_lowercase().as_str() {
        "gridtransform_double_2_2" => grid_from_params(&params, 1.0, info, topology),
        "meshtransform_double_2_2" => mesh_from_params(&params, 1.0, info),
        "translationtransform_double_2_2" => translation_from_params(&params, info, topology),
        other => Err(IoError::UnsupportedTransform {
            name: other.to_string(),
        }),
    }
}

/// `left bottom width height`, scaled by the pixel spacing.
fn parse_bounds_line(line: &str, pixel_spacing: f64, whole_pixels: bool) -> IoResult<GridRect> {
    let values: Vec<f64> = line
        .split_whitespace()
        .map(|w| {
            w.parse::<f64>()
                .map_err(|_| IoError::invalid(format!("invalid bounds value: {w}")))
        })
        .collect::<IoResult<_>>()?;

    let &[left, bottom, width, height] = values.as_slice() else {
        return Err(IoError::invalid(format!(
            "bounds line has {} values, expected 4",
            values.len()
        )));
    };

    let scale = |v: f64| {
        let scaled = v * pixel_spacing;
        if whole_pixels {
            scaled.trunc()
        } else {
            scaled
        }
    };

    let left = scale(left);
    let bottom = scale(bottom);
    Ok(GridRect::from_edges(
        left,
        bottom,
        left + scale(width),
        bottom + scale(height),
    ))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grid_from_params(
    params: &TransformParameters,
    pixel_spacing: f64,
    info: TransformInfo,
    topology: &GridTopologyCache,
) -> IoResult<ParsedTransform> {
    if params.fixed.len() < 7 {
        return Err(IoError::invalid(format!(
            "grid transform needs 7 fixed parameters, got {}",
            params.fixed.len()
        )));
    }

    // Fixed parameters carry cell counts; the lattice has one more point
    // per axis.
    let size_x = (params.fixed[2] + 1.0).round() as usize;
    let size_y = (params.fixed[1] + 1.0).round() as usize;
    let width = (params.fixed[5] * pixel_spacing).round();
    let height = (params.fixed[6] * pixel_spacing).round();

    let count = size_x * size_y;
    if params.variable.len() < count * 2 {
        return Err(IoError::invalid(format!(
            "grid of {size_x}x{size_y} needs {} variable parameters, got {}",
            count * 2,
            params.variable.len()
        )));
    }

    let mut points = Vec::with_capacity(count);
    for y in 0..size_y {
        for x in 0..size_x {
            let i = x + y * size_x;
            let control = Point2::new(
                params.variable[i * 2] * pixel_spacing,
                params.variable[i * 2 + 1] * pixel_spacing,
            );
            let mapped = GridTransform::lattice_point(x, y, size_x, size_y, width, height);
            points.push(MappingPoint::new(control, mapped));
        }
    }

    let mapped_bounds = GridRect::from_edges(0.0, 0.0, width, height);
    let grid = GridTransform::new(points, Some(mapped_bounds), size_x, size_y, info, topology)?;
    Ok(ParsedTransform::Grid(grid))
}

fn mesh_from_params(
    params: &TransformParameters,
    pixel_spacing: f64,
    info: TransformInfo,
) -> IoResult<ParsedTransform> {
    if params.fixed.len() < 7 {
        return Err(IoError::invalid(format!(
            "mesh transform needs 7 fixed parameters, got {}",
            params.fixed.len()
        )));
    }
    if params.variable.is_empty() || params.variable.len() % 4 != 0 {
        return Err(IoError::invalid(format!(
            "mesh transform variable parameters must come in quadruples, got {}",
            params.variable.len()
        )));
    }

    let left = params.fixed[3] * pixel_spacing;
    let bottom = params.fixed[4] * pixel_spacing;
    let width = params.fixed[5] * pixel_spacing;
    let height = params.fixed[6] * pixel_spacing;

    // Mapped coordinates arrive normalized to the unit square over the
    // image bounds; control coordinates are raw.
    let points: Vec<MappingPoint> = params
        .variable
        .chunks_exact(4)
        .map(|q| {
            MappingPoint::new(
                Point2::new(q[2] * pixel_spacing, q[3] * pixel_spacing),
                Point2::new(q[0] * width + left, q[1] * height + bottom),
            )
        })
        .collect();

    let fallback = FallbackTransform::from_points(points, info)?;
    Ok(ParsedTransform::Mesh(Box::new(fallback)))
}

fn translation_from_params(
    params: &TransformParameters,
    info: TransformInfo,
    topology: &GridTopologyCache,
) -> IoResult<ParsedTransform> {
    if params.fixed.len() < 4 || params.variable.len() < 2 {
        return Err(IoError::invalid(
            "translation transform needs 4 fixed and 2 variable parameters",
        ));
    }

    // Fixed parameters record the image half-extents.
    let width = (params.fixed[2] * 2.0).round();
    let height = (params.fixed[3] * 2.0).round();
    let dx = params.variable[0];
    let dy = params.variable[1];

    let corners = [
        (0.0, 0.0),
        (width, 0.0),
        (0.0, height),
        (width, height),
    ];
    let points: Vec<MappingPoint> = corners
        .into_iter()
        .map(|(x, y)| MappingPoint::new(Point2::new(x + dx, y + dy), Point2::new(x, y)))
        .collect();

    let mapped_bounds = GridRect::from_edges(0.0, 0.0, width, height);
    let grid = GridTransform::new(points, Some(mapped_bounds), 2, 2, info, topology)?;
    Ok(ParsedTransform::Grid(grid))
}
