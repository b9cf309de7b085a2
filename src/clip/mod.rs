//! Polygon Boolean operations on 64-bit integer coordinates.
//!
//! This module implements intersection, union, difference and symmetric
//! difference over arbitrarily complex polygons — self-intersecting inputs,
//! holes and overlapping edges included — plus clipping of open polylines
//! against closed regions. The engine is a sweep-line clipper working
//! entirely in integer space, so results are deterministic: identical
//! inputs produce identical outputs on every platform.
//!
//! For one-shot operations use the free functions; for repeated clipping of
//! the same geometry, or for open paths, polygon trees and non-default fill
//! rules, drive a [`Clipper`] directly.
//!
//! # Example
//!
//! ```
//! use exactum::clip::{intersection, FillRule};
//! use exactum::Point2;
//!
//! let subject = vec![vec![
//!     Point2::new(0, 0),
//!     Point2::new(10, 0),
//!     Point2::new(10, 10),
//!     Point2::new(0, 10),
//! ]];
//! let clip = vec![vec![
//!     Point2::new(5, 5),
//!     Point2::new(15, 5),
//!     Point2::new(15, 15),
//!     Point2::new(5, 15),
//! ]];
//!
//! let result = intersection(&subject, &clip, FillRule::NonZero).unwrap();
//! assert_eq!(result.len(), 1);
//! assert_eq!(result[0].len(), 4);
//! ```

mod engine;
mod joins;
mod output;
mod topology;
mod tree;

pub use engine::{Clipper, ClipSolution};
#[cfg(feature = "z")]
pub use engine::ZCallback;
pub use tree::{PolyNode, PolyTree};

use crate::error::ExactError;
use crate::primitives::Paths64;

/// The Boolean operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipType {
    /// No operation; succeeds with empty output.
    None,
    /// Regions covered by both subject and clip.
    Intersection,
    /// Regions covered by subject or clip (or both).
    Union,
    /// Regions covered by subject but not clip.
    Difference,
    /// Regions covered by exactly one of subject and clip.
    Xor,
}

/// How winding counts map to filled regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    /// Odd winding counts are filled.
    EvenOdd,
    /// Non-zero winding counts are filled.
    NonZero,
    /// Positive winding counts are filled.
    Positive,
    /// Negative winding counts are filled.
    Negative,
}

/// Whether a path belongs to the subject or the clip set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    /// Subject geometry; may be closed or open.
    Subject,
    /// Clip geometry; always closed.
    Clip,
}

/// Computes the intersection of two closed path sets.
///
/// # Example
///
/// ```
/// use exactum::clip::{intersection, FillRule};
/// use exactum::Point2;
///
/// let a = vec![vec![
///     Point2::new(0, 0),
///     Point2::new(4, 0),
///     Point2::new(4, 4),
///     Point2::new(0, 4),
/// ]];
/// let b = vec![vec![
///     Point2::new(2, 2),
///     Point2::new(6, 2),
///     Point2::new(6, 6),
///     Point2::new(2, 6),
/// ]];
///
/// let result = intersection(&a, &b, FillRule::NonZero).unwrap();
/// assert_eq!(result.len(), 1);
/// assert_eq!(exactum::signed_area(&result[0]), 4.0);
/// ```
pub fn intersection(
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ExactError> {
    boolean_op(ClipType::Intersection, subjects, clips, fill_rule)
}

/// Computes the union of a single set of closed paths.
///
/// Overlapping and self-intersecting members are merged according to the
/// fill rule, which makes this the standard way to normalize messy input.
///
/// # Example
///
/// ```
/// use exactum::clip::{union, FillRule};
/// use exactum::Point2;
///
/// // Two overlapping squares collapse into one octagonal outline.
/// let squares = vec![
///     vec![
///         Point2::new(0, 0),
///         Point2::new(4, 0),
///         Point2::new(4, 4),
///         Point2::new(0, 4),
///     ],
///     vec![
///         Point2::new(2, 2),
///         Point2::new(6, 2),
///         Point2::new(6, 6),
///         Point2::new(2, 6),
///     ],
/// ];
///
/// let result = union(&squares, FillRule::NonZero).unwrap();
/// assert_eq!(result.len(), 1);
/// assert_eq!(exactum::signed_area(&result[0]), 28.0);
/// ```
pub fn union(subjects: &Paths64, fill_rule: FillRule) -> Result<Paths64, ExactError> {
    boolean_op(ClipType::Union, subjects, &Paths64::new(), fill_rule)
}

/// Computes the union of two closed path sets.
pub fn union_with(
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ExactError> {
    boolean_op(ClipType::Union, subjects, clips, fill_rule)
}

/// Computes the difference of two closed path sets (subject minus clip).
pub fn difference(
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ExactError> {
    boolean_op(ClipType::Difference, subjects, clips, fill_rule)
}

/// Computes the symmetric difference of two closed path sets.
pub fn xor(
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ExactError> {
    boolean_op(ClipType::Xor, subjects, clips, fill_rule)
}

fn boolean_op(
    clip_type: ClipType,
    subjects: &Paths64,
    clips: &Paths64,
    fill_rule: FillRule,
) -> Result<Paths64, ExactError> {
    let mut clipper = Clipper::new();
    clipper.add_paths(subjects, PathType::Subject, false)?;
    clipper.add_paths(clips, PathType::Clip, false)?;
    Ok(clipper.execute(clip_type, fill_rule)?.closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::signed_area;
    use crate::primitives::{Path64, Point64};

    fn path(pts: &[(i64, i64)]) -> Path64 {
        pts.iter().map(|&(x, y)| Point64::new(x, y)).collect()
    }

    fn subject_square() -> Paths64 {
        vec![path(&[(0, 0), (10, 0), (10, 10), (0, 10)])]
    }

    fn clip_square() -> Paths64 {
        vec![path(&[(5, 5), (15, 5), (15, 15), (5, 15)])]
    }

    /// Total area of a solution, counting holes negatively.
    fn total_area(paths: &Paths64) -> f64 {
        paths.iter().map(|p| signed_area(p)).sum()
    }

    /// Rings compare equal under rotation, so canonicalize before comparing.
    fn normalize(mut p: Path64) -> Path64 {
        let start = p
            .iter()
            .enumerate()
            .min_by_key(|(_, pt)| (pt.y, pt.x))
            .map(|(i, _)| i)
            .unwrap();
        p.rotate_left(start);
        p
    }

    fn assert_ring_eq(actual: &Path64, expected: &[(i64, i64)]) {
        let expected = normalize(path(expected));
        let actual = normalize(actual.clone());
        assert_eq!(actual, expected);
    }

    #[test]
    fn intersection_of_overlapping_squares() {
        let result = intersection(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_ring_eq(&result[0], &[(5, 5), (10, 5), (10, 10), (5, 10)]);
    }

    #[test]
    fn union_of_overlapping_squares() {
        let result = union_with(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_ring_eq(
            &result[0],
            &[
                (0, 0),
                (10, 0),
                (10, 5),
                (15, 5),
                (15, 15),
                (5, 15),
                (5, 10),
                (0, 10),
            ],
        );
    }

    #[test]
    fn difference_of_overlapping_squares() {
        let result = difference(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_ring_eq(
            &result[0],
            &[(0, 0), (10, 0), (10, 5), (5, 5), (5, 10), (0, 10)],
        );
    }

    #[test]
    fn xor_of_overlapping_squares() {
        let result = xor(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 2);
        // The two L-shapes partition union minus intersection.
        assert_eq!(total_area(&result), 150.0);
        for ring in &result {
            assert_eq!(signed_area(ring).abs(), 75.0);
        }
    }

    #[test]
    fn intersection_is_commutative() {
        let a = intersection(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        let b = intersection(&clip_square(), &subject_square(), FillRule::NonZero).unwrap();
        assert_eq!(total_area(&a), total_area(&b));
        assert_eq!(a.len(), b.len());
        assert_ring_eq(&b[0], &[(5, 5), (10, 5), (10, 10), (5, 10)]);
    }

    #[test]
    fn union_is_idempotent() {
        let mut both = subject_square();
        both.extend(subject_square());
        let result = union(&both, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_ring_eq(&result[0], &[(0, 0), (10, 0), (10, 10), (0, 10)]);
    }

    #[test]
    fn difference_with_self_is_empty() {
        let result = difference(&subject_square(), &subject_square(), FillRule::NonZero).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn xor_equals_union_minus_intersection() {
        let x = xor(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        let u = union_with(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        let i = intersection(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        let u_minus_i = difference(&u, &i, FillRule::NonZero).unwrap();
        assert_eq!(total_area(&x), total_area(&u_minus_i));
    }

    #[test]
    fn disjoint_union_keeps_both() {
        let a = vec![path(&[(0, 0), (4, 0), (4, 4), (0, 4)])];
        let b = vec![path(&[(10, 10), (14, 10), (14, 14), (10, 14)])];
        let result = union_with(&a, &b, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(total_area(&result), 32.0);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = vec![path(&[(0, 0), (4, 0), (4, 4), (0, 4)])];
        let b = vec![path(&[(10, 10), (14, 10), (14, 14), (10, 14)])];
        let result = intersection(&a, &b, FillRule::NonZero).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn contained_square_intersection() {
        let outer = vec![path(&[(0, 0), (20, 0), (20, 20), (0, 20)])];
        let inner = vec![path(&[(5, 5), (10, 5), (10, 10), (5, 10)])];
        let result = intersection(&outer, &inner, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_ring_eq(&result[0], &[(5, 5), (10, 5), (10, 10), (5, 10)]);
    }

    #[test]
    fn difference_carves_a_hole() {
        let outer = vec![path(&[(0, 0), (20, 0), (20, 20), (0, 20)])];
        let inner = vec![path(&[(5, 5), (10, 5), (10, 10), (5, 10)])];
        let result = difference(&outer, &inner, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(total_area(&result), 375.0);
        // One positive outer ring and one negative hole ring.
        let mut areas: Vec<f64> = result.iter().map(|p| signed_area(p)).collect();
        areas.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(areas, vec![-25.0, 400.0]);
    }

    #[test]
    fn outer_rings_are_positive() {
        let result = union_with(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        for ring in &result {
            assert!(signed_area(ring) > 0.0);
        }
    }

    #[test]
    fn closing_duplicate_point_is_ignored() {
        let explicit = vec![path(&[(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)])];
        let implicit = subject_square();
        let a = union(&explicit, FillRule::NonZero).unwrap();
        let b = union(&implicit, FillRule::NonZero).unwrap();
        assert_eq!(a.len(), b.len());
        assert_ring_eq(&a[0], &[(0, 0), (10, 0), (10, 10), (0, 10)]);
    }

    #[test]
    fn degenerate_paths_are_skipped() {
        let mut subj = subject_square();
        subj.push(path(&[(3, 3)]));
        subj.push(path(&[(4, 4), (4, 4), (4, 4)]));
        subj.push(Path64::new());
        let result = union(&subj, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(total_area(&result), 100.0);
    }

    #[test]
    fn no_consecutive_duplicate_points_in_output() {
        let result = union_with(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        for ring in &result {
            for i in 0..ring.len() {
                assert_ne!(ring[i], ring[(i + 1) % ring.len()]);
            }
        }
    }

    #[test]
    fn shared_collinear_edges_leave_no_artifacts() {
        // Two squares sharing a full edge: union is one rectangle.
        let a = vec![path(&[(0, 0), (10, 0), (10, 10), (0, 10)])];
        let b = vec![path(&[(10, 0), (20, 0), (20, 10), (10, 10)])];
        let result = union_with(&a, &b, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(total_area(&result), 200.0);
    }

    #[test]
    fn self_intersecting_bowtie_under_even_odd_and_nonzero() {
        // A figure-eight; EvenOdd and NonZero both fill the two lobes.
        let bowtie = vec![path(&[(0, 0), (10, 10), (10, 0), (0, 10)])];
        let nz = union(&bowtie, FillRule::NonZero).unwrap();
        let eo = union(&bowtie, FillRule::EvenOdd).unwrap();
        assert_eq!(nz.len(), 2);
        assert_eq!(eo.len(), 2);
        assert_eq!(total_area(&nz), 50.0);
        assert_eq!(total_area(&eo), 50.0);
    }

    #[test]
    fn positive_and_negative_fill_rules() {
        // A clockwise ring has winding -1 everywhere inside.
        let cw = vec![path(&[(0, 0), (0, 10), (10, 10), (10, 0)])];
        assert!(union(&cw, FillRule::Positive).unwrap().is_empty());
        let neg = union(&cw, FillRule::Negative).unwrap();
        assert_eq!(neg.len(), 1);
        assert_eq!(total_area(&neg), 100.0);
        let ccw = subject_square();
        assert!(union(&ccw, FillRule::Negative).unwrap().is_empty());
        assert_eq!(union(&ccw, FillRule::Positive).unwrap().len(), 1);
    }

    #[test]
    fn execute_twice_gives_same_result() {
        let mut clipper = Clipper::new();
        clipper
            .add_paths(&subject_square(), PathType::Subject, false)
            .unwrap();
        clipper
            .add_paths(&clip_square(), PathType::Clip, false)
            .unwrap();
        let first = clipper.execute(ClipType::Union, FillRule::NonZero).unwrap();
        let second = clipper.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(first.closed, second.closed);
        assert_eq!(first.open, second.open);
    }

    #[test]
    fn clip_type_none_yields_nothing() {
        let mut clipper = Clipper::new();
        clipper
            .add_paths(&subject_square(), PathType::Subject, false)
            .unwrap();
        let solution = clipper.execute(ClipType::None, FillRule::NonZero).unwrap();
        assert!(solution.closed.is_empty());
        assert!(solution.open.is_empty());
    }

    #[test]
    fn open_clip_paths_are_rejected() {
        let mut clipper = Clipper::new();
        let err = clipper
            .add_path(&path(&[(0, 0), (10, 0)]), PathType::Clip, true)
            .unwrap_err();
        assert_eq!(err, ExactError::OpenClipPath);
    }

    #[test]
    fn open_polyline_clipped_to_square() {
        let mut clipper = Clipper::new();
        clipper
            .add_path(&path(&[(-5, 5), (15, 5)]), PathType::Subject, true)
            .unwrap();
        clipper
            .add_paths(&subject_square(), PathType::Clip, false)
            .unwrap();
        let solution = clipper
            .execute(ClipType::Intersection, FillRule::NonZero)
            .unwrap();
        assert!(solution.closed.is_empty());
        assert_eq!(solution.open.len(), 1);
        let mut line = solution.open[0].clone();
        line.sort_by_key(|p| p.x);
        assert_eq!(line, path(&[(0, 5), (10, 5)]));
    }

    #[test]
    fn open_polyline_outside_clip_vanishes() {
        let mut clipper = Clipper::new();
        clipper
            .add_path(&path(&[(-5, 50), (15, 50)]), PathType::Subject, true)
            .unwrap();
        clipper
            .add_paths(&subject_square(), PathType::Clip, false)
            .unwrap();
        let solution = clipper
            .execute(ClipType::Intersection, FillRule::NonZero)
            .unwrap();
        assert!(solution.open.is_empty());
    }

    #[test]
    fn tree_nests_hole_inside_outer() {
        let mut clipper = Clipper::new();
        clipper
            .add_paths(&subject_square(), PathType::Subject, false)
            .unwrap();
        // The inner square becomes a hole under EvenOdd regardless of its
        // winding direction.
        clipper
            .add_path(&path(&[(3, 3), (7, 3), (7, 7), (3, 7)]), PathType::Subject, false)
            .unwrap();
        let (tree, open) = clipper
            .execute_tree(ClipType::Union, FillRule::EvenOdd)
            .unwrap();
        assert!(open.is_empty());
        let roots = tree.top_level();
        assert_eq!(roots.len(), 1);
        let outer = roots[0];
        assert!(!tree.is_hole(outer));
        let children = tree.children(outer);
        assert_eq!(children.len(), 1);
        assert!(tree.is_hole(children[0]));
        assert_eq!(signed_area(tree.path(outer)), 100.0);
        assert_eq!(signed_area(tree.path(children[0])), -16.0);
    }

    #[test]
    fn tree_depth_parity_for_nested_rings() {
        // Three concentric squares under EvenOdd: filled, hole, filled.
        let rings = vec![
            path(&[(0, 0), (30, 0), (30, 30), (0, 30)]),
            path(&[(5, 5), (25, 5), (25, 25), (5, 25)]),
            path(&[(10, 10), (20, 10), (20, 20), (10, 20)]),
        ];
        let mut clipper = Clipper::new();
        clipper.add_paths(&rings, PathType::Subject, false).unwrap();
        let (tree, _) = clipper
            .execute_tree(ClipType::Union, FillRule::EvenOdd)
            .unwrap();
        let roots = tree.top_level();
        assert_eq!(roots.len(), 1);
        let level1 = tree.children(roots[0]);
        assert_eq!(level1.len(), 1);
        assert!(tree.is_hole(level1[0]));
        let level2 = tree.children(level1[0]);
        assert_eq!(level2.len(), 1);
        assert!(!tree.is_hole(level2[0]));
    }

    #[test]
    fn all_emitted_rings_have_substantial_area() {
        let result = xor(&subject_square(), &clip_square(), FillRule::NonZero).unwrap();
        for ring in &result {
            assert!(signed_area(ring).abs() >= 1.0);
        }
    }

    #[test]
    fn reverse_solution_flips_orientation() {
        let mut clipper = Clipper::new();
        clipper.set_reverse_solution(true);
        clipper
            .add_paths(&subject_square(), PathType::Subject, false)
            .unwrap();
        let solution = clipper.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(solution.closed.len(), 1);
        assert!(signed_area(&solution.closed[0]) < 0.0);
    }

    #[test]
    fn preserve_collinear_keeps_midpoints() {
        // A square with an extra collinear midpoint on its bottom edge.
        let subj = vec![path(&[(0, 0), (5, 0), (10, 0), (10, 10), (0, 10)])];
        let mut keep = Clipper::new();
        keep.add_paths(&subj, PathType::Subject, false).unwrap();
        let kept = keep.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(kept.closed[0].len(), 5);

        let mut drop = Clipper::new();
        drop.set_preserve_collinear(false);
        drop.add_paths(&subj, PathType::Subject, false).unwrap();
        let dropped = drop.execute(ClipType::Union, FillRule::NonZero).unwrap();
        assert_eq!(dropped.closed[0].len(), 4);
    }

    #[test]
    fn horizontal_spikes_are_always_removed() {
        // A 180 degree spike along the top edge.
        let subj = vec![path(&[(0, 0), (10, 0), (10, 10), (12, 10), (8, 10), (0, 10)])];
        let result = union(&subj, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(total_area(&result), 100.0);
    }

    #[test]
    fn concave_intersection() {
        // L-shape clipped by a square that straddles its notch.
        let l_shape = vec![path(&[(0, 0), (20, 0), (20, 10), (10, 10), (10, 20), (0, 20)])];
        let square = vec![path(&[(5, 5), (15, 5), (15, 15), (5, 15)])];
        let result = intersection(&l_shape, &square, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_ring_eq(
            &result[0],
            &[(5, 5), (15, 5), (15, 10), (10, 10), (10, 15), (5, 15)],
        );
    }

    #[test]
    fn many_overlapping_rectangles_union() {
        let mut subj = Paths64::new();
        for i in 0..10 {
            let x = i * 5;
            subj.push(path(&[(x, 0), (x + 10, 0), (x + 10, 10), (x, 10)]));
        }
        let result = union(&subj, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(total_area(&result), 550.0);
    }
}
