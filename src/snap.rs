//! Snapping floating-point geometry onto the integer grid.
//!
//! The clipper works in exact integer space. Floating-point callers choose
//! a scale factor (for example `1000.0` for three decimal places of
//! precision), snap their coordinates onto the scaled grid, clip, then
//! unsnap the result.
//!
//! # Example
//!
//! ```
//! use approx::assert_abs_diff_eq;
//! use exactum::snap::{snap_path, unsnap_path};
//!
//! let path = snap_path(&[(0.0_f64, 0.0), (1.25, 0.0), (1.25, 1.25)], 100.0).unwrap();
//! assert_eq!(path[1].x, 125);
//! let back = unsnap_path(&path, 100.0);
//! assert_abs_diff_eq!(back[2].1, 1.25, epsilon = 1e-9);
//! ```

use num_traits::Float;

use crate::clip::{difference, intersection, union_with, xor, FillRule};
use crate::error::ExactError;
use crate::primitives::{Path64, Paths64, Point64};

fn checked_scale<F: Float>(scale: F) -> Result<F, ExactError> {
    if scale.is_finite() && scale > F::zero() {
        Ok(scale)
    } else {
        Err(ExactError::InvalidScale)
    }
}

/// Snaps one floating-point path onto the integer grid.
pub fn snap_path<F: Float>(points: &[(F, F)], scale: F) -> Result<Path64, ExactError> {
    let scale = checked_scale(scale)?;
    Ok(points
        .iter()
        .map(|&(x, y)| {
            Point64::new(
                (x * scale).round().to_i64().unwrap_or(0),
                (y * scale).round().to_i64().unwrap_or(0),
            )
        })
        .collect())
}

/// Snaps several floating-point paths onto the integer grid.
pub fn snap_paths<F: Float>(paths: &[Vec<(F, F)>], scale: F) -> Result<Paths64, ExactError> {
    paths.iter().map(|p| snap_path(p, scale)).collect()
}

/// Converts an integer path back to floating point, dividing by `scale`.
pub fn unsnap_path(path: &Path64, scale: f64) -> Vec<(f64, f64)> {
    let inv = 1.0 / scale;
    path.iter().map(|p| (p.x as f64 * inv, p.y as f64 * inv)).collect()
}

/// Converts several integer paths back to floating point.
pub fn unsnap_paths(paths: &Paths64, scale: f64) -> Vec<Vec<(f64, f64)>> {
    paths.iter().map(|p| unsnap_path(p, scale)).collect()
}

/// Intersection of floating-point polygons via the scaled integer grid.
pub fn intersection_scaled(
    subjects: &[Vec<(f64, f64)>],
    clips: &[Vec<(f64, f64)>],
    fill_rule: FillRule,
    scale: f64,
) -> Result<Vec<Vec<(f64, f64)>>, ExactError> {
    let result = intersection(
        &snap_paths(subjects, scale)?,
        &snap_paths(clips, scale)?,
        fill_rule,
    )?;
    Ok(unsnap_paths(&result, scale))
}

/// Union of floating-point polygons via the scaled integer grid.
pub fn union_scaled(
    subjects: &[Vec<(f64, f64)>],
    clips: &[Vec<(f64, f64)>],
    fill_rule: FillRule,
    scale: f64,
) -> Result<Vec<Vec<(f64, f64)>>, ExactError> {
    let result = union_with(
        &snap_paths(subjects, scale)?,
        &snap_paths(clips, scale)?,
        fill_rule,
    )?;
    Ok(unsnap_paths(&result, scale))
}

/// Difference of floating-point polygons via the scaled integer grid.
pub fn difference_scaled(
    subjects: &[Vec<(f64, f64)>],
    clips: &[Vec<(f64, f64)>],
    fill_rule: FillRule,
    scale: f64,
) -> Result<Vec<Vec<(f64, f64)>>, ExactError> {
    let result = difference(
        &snap_paths(subjects, scale)?,
        &snap_paths(clips, scale)?,
        fill_rule,
    )?;
    Ok(unsnap_paths(&result, scale))
}

/// Symmetric difference of floating-point polygons via the scaled grid.
pub fn xor_scaled(
    subjects: &[Vec<(f64, f64)>],
    clips: &[Vec<(f64, f64)>],
    fill_rule: FillRule,
    scale: f64,
) -> Result<Vec<Vec<(f64, f64)>>, ExactError> {
    let result = xor(
        &snap_paths(subjects, scale)?,
        &snap_paths(clips, scale)?,
        fill_rule,
    )?;
    Ok(unsnap_paths(&result, scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_snap_rounds_to_nearest() {
        let path = snap_path(&[(1.2344_f64, 5.6789), (-0.5, 0.5)], 1000.0).unwrap();
        assert_eq!(path[0], Point64::new(1234, 5679));
        assert_eq!(path[1], Point64::new(-500, 500));
    }

    #[test]
    fn test_invalid_scales_are_rejected() {
        assert_eq!(
            snap_path(&[(1.0_f64, 1.0)], 0.0).unwrap_err(),
            ExactError::InvalidScale
        );
        assert_eq!(
            snap_path(&[(1.0_f64, 1.0)], -10.0).unwrap_err(),
            ExactError::InvalidScale
        );
        assert_eq!(
            snap_path(&[(1.0_f64, 1.0)], f64::NAN).unwrap_err(),
            ExactError::InvalidScale
        );
    }

    #[test]
    fn test_roundtrip() {
        let original = vec![(1.0_f64, 2.0), (3.5, 4.5), (-1.25, -2.75)];
        let snapped = snap_path(&original, 100.0).unwrap();
        let back = unsnap_path(&snapped, 100.0);
        for (a, b) in original.iter().zip(back.iter()) {
            assert_relative_eq!(a.0, b.0, epsilon = 0.01);
            assert_relative_eq!(a.1, b.1, epsilon = 0.01);
        }
    }

    #[test]
    fn test_intersection_scaled() {
        let a = vec![vec![(0.0_f64, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]];
        let b = vec![vec![(0.5_f64, 0.5), (1.5, 0.5), (1.5, 1.5), (0.5, 1.5)]];
        let result = intersection_scaled(&a, &b, FillRule::NonZero, 1000.0).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 4);
        // the clipped region is the quarter square [0.5, 1.0] x [0.5, 1.0]
        let ring = &result[0];
        let mut doubled_area = 0.0;
        for i in 0..ring.len() {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % ring.len()];
            doubled_area += x1 * y2 - x2 * y1;
        }
        assert_abs_diff_eq!(doubled_area * 0.5, 0.25, epsilon = 1e-9);
        let min_x = ring.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = ring.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = ring.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = ring.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        assert_abs_diff_eq!(min_x, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(max_x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(min_y, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(max_y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_f32_inputs() {
        let path = snap_path(&[(1.5_f32, 2.5)], 10.0).unwrap();
        assert_eq!(path[0], Point64::new(15, 25));
    }
}
