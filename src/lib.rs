//! exactum - Exact integer geometry
//!
//! Where approximation is not an option. This library computes geometric
//! results on 64-bit integer coordinates with exact predicates, so outputs
//! are deterministic and identical on every platform. Its centerpiece is a
//! sweep-line polygon clipper supporting intersection, union, difference
//! and symmetric difference over arbitrarily complex polygons — holes,
//! self-intersections and open polylines included.
//!
//! Floating-point geometry interoperates through the [`snap`] module: pick
//! a scale, snap onto the integer grid, clip, unsnap.

pub mod clip;
pub mod error;
pub mod predicates;
pub mod primitives;
pub mod snap;

pub use clip::{
    difference, intersection, union, union_with, xor, ClipSolution, ClipType, Clipper, FillRule,
    PathType, PolyNode, PolyTree,
};
pub use error::ExactError;
pub use predicates::{
    cross_product, orientation, point_in_polygon, signed_area, Orientation, PointInPolygonResult,
};
pub use primitives::{Path64, Paths64, Point2, Point3, Point64, Vector2, Vector3};
