//! Fixed-layout text export for external registration tools.

use std::io::Write;

use warp_types::{GridRect, MappingPoint};

use crate::error::IoResult;
use crate::stos::ParsedTransform;

/// Write a transform in the `meshtransform_double_2_2` text layout.
///
/// Any reference-point transform can be expressed as a mesh, so this is
/// the export for every transform type. Mapped coordinates are emitted
/// normalized to the unit interval over the mapped bounds; control
/// coordinates are raw.
///
/// # Errors
///
/// Underlying write errors.
pub fn write_itk_transform<W: Write>(writer: &mut W, transform: &ParsedTransform) -> IoResult<()> {
    write_itk_transform_parts(
        writer,
        transform.points(),
        &transform.control_bounds(),
        &transform.mapped_bounds(),
    )
}

/// [`write_itk_transform`] over the raw parts.
///
/// # Errors
///
/// Underlying write errors.
pub fn write_itk_transform_parts<W: Write>(
    writer: &mut W,
    points: &[MappingPoint],
    control_bounds: &GridRect,
    mapped_bounds: &GridRect,
) -> IoResult<()> {
    writeln!(writer, "0")?;
    writeln!(writer, "0")?;
    writeln!(
        writer,
        "0 0 {} {}",
        control_bounds.width(),
        control_bounds.height()
    )?;
    writeln!(
        writer,
        "{} {} {} {}",
        mapped_bounds.left(),
        mapped_bounds.bottom(),
        mapped_bounds.width(),
        mapped_bounds.height()
    )?;

    write!(writer, "meshtransform_double_2_2 vp {}", points.len() * 4)?;
    for p in points {
        write!(
            writer,
            " {} {} {} {}",
            (p.mapped.x - mapped_bounds.left()) / mapped_bounds.width(),
            (p.mapped.y - mapped_bounds.bottom()) / mapped_bounds.height(),
            p.control.x,
            p.control.y
        )?;
    }

    writeln!(
        writer,
        " fp 8 0 0 0 {} {} {} {} {}",
        mapped_bounds.left(),
        mapped_bounds.bottom(),
        mapped_bounds.width(),
        mapped_bounds.height(),
        points.len()
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stos::parse_transform_entry;
    use approx::assert_relative_eq;
    use warp_transform::{GridTopologyCache, PointMapping};
    use warp_types::{Point2, TransformInfo};

    fn sample_parts() -> (Vec<MappingPoint>, GridRect, GridRect) {
        let points = vec![
            MappingPoint::new(Point2::new(10.0, 20.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(110.0, 20.0), Point2::new(50.0, 0.0)),
            MappingPoint::new(Point2::new(10.0, 120.0), Point2::new(0.0, 50.0)),
            MappingPoint::new(Point2::new(110.0, 120.0), Point2::new(50.0, 50.0)),
        ];
        let control = GridRect::from_edges(10.0, 20.0, 110.0, 120.0);
        let mapped = GridRect::from_edges(0.0, 0.0, 50.0, 50.0);
        (points, control, mapped)
    }

    #[test]
    fn layout_matches_expectations() {
        let (points, control, mapped) = sample_parts();
        let mut out = Vec::new();
        write_itk_transform_parts(&mut out, &points, &control, &mapped).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "0");
        assert_eq!(lines[1], "0");
        assert_eq!(lines[2], "0 0 100 100");
        assert_eq!(lines[3], "0 0 50 50");
        assert!(lines[4].starts_with("meshtransform_double_2_2 vp 16 "));
        assert!(lines[4].contains(" fp 8 0 0 0 0 0 50 50 4"));
    }

    #[test]
    fn mapped_coordinates_normalized() {
        let (points, control, mapped) = sample_parts();
        let mut out = Vec::new();
        write_itk_transform_parts(&mut out, &points, &control, &mapped).unwrap();

        let text = String::from_utf8(out).unwrap();
        let entry = text.lines().last().unwrap();

        // First point: mapped (0,0) -> normalized (0,0), control (10,20).
        let words: Vec<&str> = entry.split_whitespace().collect();
        assert_eq!(&words[3..7], &["0", "0", "10", "20"]);
        // Last point: mapped (50,50) -> normalized (1,1).
        assert_eq!(&words[15..19], &["1", "1", "110", "120"]);
    }

    #[test]
    fn export_reparses_to_equivalent_transform() {
        let (points, control, mapped) = sample_parts();
        let mut out = Vec::new();
        write_itk_transform_parts(&mut out, &points, &control, &mapped).unwrap();
        let text = String::from_utf8(out).unwrap();
        let entry = text.lines().last().unwrap();

        let topo = GridTopologyCache::new();
        let reparsed =
            parse_transform_entry(entry, TransformInfo::default(), &topo).unwrap();

        // The mesh entry denormalizes against fp[3..7] = mapped bounds.
        for p in &points {
            let out = reparsed.transform(&p.mapped).unwrap();
            assert_relative_eq!(out.x, p.control.x, epsilon = 1e-9);
            assert_relative_eq!(out.y, p.control.y, epsilon = 1e-9);
        }
    }
}
