//! Output ring assembly.
//!
//! Provisional output polygons are rings of points in an index arena. Each
//! live ring is fed by up to two active edges: the front edge prepends at
//! the ring head, the back edge inserts just behind it, so the two sides of
//! a polygon grow toward each other and meet at a local maximum. Ring
//! records are never removed from the arena; a dead ring has `pts: None`
//! and its `owner` points at whatever absorbed it.

use crate::clip::engine::{ClipSolution, Clipper};
use crate::clip::tree::PolyTree;
use crate::primitives::{Path64, Paths64, Point64};

/// A vertex of a provisional output ring.
pub(crate) struct OutPt {
    pub pt: Point64,
    pub next: usize,
    pub prev: usize,
    pub outrec: usize,
    /// Head of this point's pending join list.
    pub joiner: Option<usize>,
    /// Link in the trial-horizontal-join list.
    pub next_horz: Option<usize>,
}

/// Classification of a provisional output ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutRecState {
    Open,
    Outer,
    Inner,
}

/// A provisional output polygon.
pub(crate) struct OutRec {
    pub owner: Option<usize>,
    pub front_edge: Option<usize>,
    pub back_edge: Option<usize>,
    pub pts: Option<usize>,
    /// Tree node assigned during tree emission.
    pub polypath: Option<usize>,
    pub state: OutRecState,
}

impl Clipper {
    pub(crate) fn new_out_rec(&mut self) -> usize {
        self.out_recs.push(OutRec {
            owner: None,
            front_edge: None,
            back_edge: None,
            pts: None,
            polypath: None,
            state: OutRecState::Outer,
        });
        self.out_recs.len() - 1
    }

    pub(crate) fn new_out_pt(&mut self, pt: Point64, outrec: usize) -> usize {
        let id = self.out_pts.len();
        self.out_pts.push(OutPt {
            pt,
            next: id,
            prev: id,
            outrec,
            joiner: None,
            next_horz: None,
        });
        id
    }

    /// The front edge appends at the ring head so that, walked forward from
    /// `pts.next`, the finished ring reads in emission order. Open rings use
    /// the bound direction instead, since either side may be missing.
    pub(crate) fn is_front(&self, e: usize) -> bool {
        let or_id = self.actives[e].outrec.expect("only hot edges have ring sides");
        if self.out_recs[or_id].state == OutRecState::Open {
            return self.actives[e].wind_dx > 0;
        }
        self.out_recs[or_id].front_edge == Some(e)
    }

    pub(crate) fn set_sides(&mut self, or_id: usize, start_edge: usize, end_edge: usize) {
        self.out_recs[or_id].front_edge = Some(start_edge);
        self.out_recs[or_id].back_edge = Some(end_edge);
    }

    pub(crate) fn swap_outrecs(&mut self, ae1: usize, ae2: usize) {
        let or1 = self.actives[ae1].outrec;
        let or2 = self.actives[ae2].outrec;
        if or1 == or2 {
            if let Some(or_id) = or1 {
                let f = self.out_recs[or_id].front_edge;
                self.out_recs[or_id].front_edge = self.out_recs[or_id].back_edge;
                self.out_recs[or_id].back_edge = f;
            }
            return;
        }
        if let Some(o1) = or1 {
            if self.out_recs[o1].front_edge == Some(ae1) {
                self.out_recs[o1].front_edge = Some(ae2);
            } else {
                self.out_recs[o1].back_edge = Some(ae2);
            }
        }
        if let Some(o2) = or2 {
            if self.out_recs[o2].front_edge == Some(ae2) {
                self.out_recs[o2].front_edge = Some(ae1);
            } else {
                self.out_recs[o2].back_edge = Some(ae1);
            }
        }
        self.actives[ae1].outrec = or2;
        self.actives[ae2].outrec = or1;
    }

    fn swap_front_back_sides(&mut self, or_id: usize) {
        let f = self.out_recs[or_id].front_edge;
        self.out_recs[or_id].front_edge = self.out_recs[or_id].back_edge;
        self.out_recs[or_id].back_edge = f;
        let pts = self.out_recs[or_id].pts.expect("side swap requires a live ring");
        self.out_recs[or_id].pts = Some(self.out_pts[pts].next);
    }

    fn uncouple_out_rec(&mut self, ae: usize) {
        let Some(or_id) = self.actives[ae].outrec else {
            return;
        };
        if let Some(f) = self.out_recs[or_id].front_edge {
            self.actives[f].outrec = None;
        }
        if let Some(b) = self.out_recs[or_id].back_edge {
            self.actives[b].outrec = None;
        }
        self.out_recs[or_id].front_edge = None;
        self.out_recs[or_id].back_edge = None;
    }

    /// Chases owner links until a ring that still holds points (or nothing).
    pub(crate) fn get_real_out_rec(&self, or_id: usize) -> Option<usize> {
        let mut cur = Some(or_id);
        while let Some(o) = cur {
            if self.out_recs[o].pts.is_some() {
                return Some(o);
            }
            cur = self.out_recs[o].owner;
        }
        None
    }

    fn real_owner(&self, or_id: usize) -> Option<usize> {
        let mut owner = self.out_recs[or_id].owner;
        while let Some(o) = owner {
            if self.out_recs[o].pts.is_some() {
                return Some(o);
            }
            owner = self.out_recs[o].owner;
        }
        None
    }

    /// Appends `pt` to the ring owned by `e`, on the side `e` feeds.
    /// Consecutive duplicates collapse to the existing point.
    pub(crate) fn add_out_pt(&mut self, e: usize, pt: Point64) -> usize {
        let or_id = self.actives[e].outrec.expect("only hot edges emit points");
        let to_front = self.is_front(e);
        let op_front = self.out_recs[or_id].pts.expect("ring has a head point");
        let op_back = self.out_pts[op_front].next;
        if to_front && pt == self.out_pts[op_front].pt {
            return op_front;
        }
        if !to_front && pt == self.out_pts[op_back].pt {
            return op_back;
        }
        let new_op = self.new_out_pt(pt, or_id);
        self.out_pts[op_back].prev = new_op;
        self.out_pts[new_op].prev = op_front;
        self.out_pts[new_op].next = op_back;
        self.out_pts[op_front].next = new_op;
        if to_front {
            self.out_recs[or_id].pts = Some(new_op);
        }
        new_op
    }

    /// Determines a newborn ring's owner and outer/inner state from the
    /// nearest hot closed edge to its left (or right, for a heading-left
    /// horizontal, where the left side has yet to be established).
    fn set_owner_and_inner_outer(&mut self, ae: usize, or_id: usize) {
        let owner = if self.is_heading_left_horz(ae) {
            let mut ae2 = self.actives[ae].next_in_ael;
            while let Some(a) = ae2 {
                if self.is_hot(a) && !self.is_open(a) {
                    break;
                }
                ae2 = self.actives[a].next_in_ael;
            }
            match ae2 {
                None => None,
                Some(a) => {
                    let aor = self.actives[a].outrec.expect("hot edge owns a ring");
                    if (self.out_recs[aor].state == OutRecState::Outer)
                        == (self.out_recs[aor].front_edge == Some(a))
                    {
                        self.out_recs[aor].owner
                    } else {
                        Some(aor)
                    }
                }
            }
        } else {
            let mut ae2 = self.actives[ae].prev_in_ael;
            while let Some(a) = ae2 {
                if self.is_hot(a) && !self.is_open(a) {
                    break;
                }
                ae2 = self.actives[a].prev_in_ael;
            }
            match ae2 {
                None => None,
                Some(a) => {
                    let aor = self.actives[a].outrec.expect("hot edge owns a ring");
                    // right of an outer ring's front edge is inside it;
                    // right of its back edge is outside
                    if (self.out_recs[aor].state == OutRecState::Outer)
                        == (self.out_recs[aor].front_edge == Some(a))
                    {
                        Some(aor)
                    } else {
                        self.out_recs[aor].owner
                    }
                }
            }
        };
        let state = match owner {
            None => OutRecState::Outer,
            Some(o) if self.out_recs[o].state == OutRecState::Inner => OutRecState::Outer,
            _ => OutRecState::Inner,
        };
        self.out_recs[or_id].owner = owner;
        self.out_recs[or_id].state = state;
    }

    /// Opens a new ring where two edges meet at a local minimum.
    pub(crate) fn add_local_min_poly(
        &mut self,
        ae1: usize,
        ae2: usize,
        pt: Point64,
        is_new: bool,
    ) -> usize {
        let or_id = self.new_out_rec();
        self.actives[ae1].outrec = Some(or_id);

        if self.is_open(ae1) {
            self.out_recs[or_id].owner = None;
            self.out_recs[or_id].state = OutRecState::Open;
            if self.actives[ae1].wind_dx > 0 {
                self.set_sides(or_id, ae1, ae2);
            } else {
                self.set_sides(or_id, ae2, ae1);
            }
        } else {
            self.set_owner_and_inner_outer(ae1, or_id);
            // side assignment decides output orientation: the front edge is
            // the ascending side of an outer ring
            if (self.out_recs[or_id].state == OutRecState::Outer) == is_new {
                self.set_sides(or_id, ae1, ae2);
            } else {
                self.set_sides(or_id, ae2, ae1);
            }
        }
        self.actives[ae2].outrec = Some(or_id);
        let op = self.new_out_pt(pt, or_id);
        self.out_recs[or_id].pts = Some(op);
        op
    }

    /// Closes out (or merges) rings where two hot edges meet at a local
    /// maximum. Returns the emitted point, or `None` when the meeting
    /// revealed an inconsistency.
    pub(crate) fn add_local_max_poly(
        &mut self,
        ae1: usize,
        ae2: usize,
        pt: Point64,
    ) -> Option<usize> {
        if !self.is_hot(ae1) || !self.is_hot(ae2) {
            self.fail("cold edge at a local maximum");
            return None;
        }
        if self.is_front(ae1) == self.is_front(ae2) {
            // open-ended rings can legitimately present the same side twice
            if self.is_open_end(ae1) {
                let or_id = self.actives[ae1].outrec.expect("hot edge owns a ring");
                self.swap_front_back_sides(or_id);
            } else if self.is_open_end(ae2) {
                let or_id = self.actives[ae2].outrec.expect("hot edge owns a ring");
                self.swap_front_back_sides(or_id);
            } else {
                self.fail("ring sides disagree at a local maximum");
                return None;
            }
        }

        let result = self.add_out_pt(ae1, pt);
        if self.actives[ae1].outrec == self.actives[ae2].outrec {
            // both edges feed the same ring: it is now complete
            let or_id = self.actives[ae1].outrec.expect("hot edge owns a ring");
            self.out_recs[or_id].pts = Some(result);
            self.uncouple_out_rec(ae1);
            if !self.is_open(ae1) {
                self.clean_collinear(Some(or_id));
            }
            return self.out_recs[or_id].pts;
        }

        // different rings touch here and must be joined into one; joining
        // the higher id into the lower preserves winding orientation
        if self.is_open(ae1) {
            if self.actives[ae1].wind_dx < 0 {
                self.join_outrec_paths(ae1, ae2);
            } else {
                self.join_outrec_paths(ae2, ae1);
            }
        } else {
            let or1 = self.actives[ae1].outrec.expect("hot edge owns a ring");
            let or2 = self.actives[ae2].outrec.expect("hot edge owns a ring");
            if or1 < or2 {
                self.join_outrec_paths(ae1, ae2);
            } else {
                self.join_outrec_paths(ae2, ae1);
            }
        }
        Some(result)
    }

    /// Splices `ae2`'s ring onto `ae1`'s and retires `ae2`'s record.
    fn join_outrec_paths(&mut self, ae1: usize, ae2: usize) {
        let or1 = self.actives[ae1].outrec.expect("hot edge owns a ring");
        let or2 = self.actives[ae2].outrec.expect("hot edge owns a ring");
        let p1_start = self.out_recs[or1].pts.expect("live ring has points");
        let p2_start = self.out_recs[or2].pts.expect("live ring has points");
        let p1_end = self.out_pts[p1_start].next;
        let p2_end = self.out_pts[p2_start].next;

        if self.is_front(ae1) {
            self.out_pts[p2_end].prev = p1_start;
            self.out_pts[p1_start].next = p2_end;
            self.out_pts[p2_start].next = p1_end;
            self.out_pts[p1_end].prev = p2_start;
            self.out_recs[or1].pts = Some(p2_start);
            let fe2 = self.out_recs[or2].front_edge;
            self.out_recs[or1].front_edge = fe2;
            if let Some(f) = fe2 {
                self.actives[f].outrec = Some(or1);
            }
        } else {
            self.out_pts[p1_end].prev = p2_start;
            self.out_pts[p2_start].next = p1_end;
            self.out_pts[p1_start].next = p2_end;
            self.out_pts[p2_end].prev = p1_start;
            let be2 = self.out_recs[or2].back_edge;
            self.out_recs[or1].back_edge = be2;
            if let Some(b) = be2 {
                self.actives[b].outrec = Some(or1);
            }
        }

        // ownership defers to the earliest ring id involved
        if let Some(own2) = self.out_recs[or2].owner {
            if own2 < or1
                && (self.out_recs[or1].owner.is_none()
                    || own2 < self.out_recs[or1].owner.expect("owner checked above"))
            {
                self.out_recs[or1].owner = Some(own2);
            }
        }

        self.out_recs[or2].front_edge = None;
        self.out_recs[or2].back_edge = None;
        self.out_recs[or2].pts = None;
        self.out_recs[or2].owner = Some(or1);

        if self.is_open_end(ae1) {
            self.out_recs[or2].pts = self.out_recs[or1].pts;
            self.out_recs[or1].pts = None;
        }

        self.actives[ae1].outrec = None;
        self.actives[ae2].outrec = None;
    }

    /// Starts an open output ring fed by a single edge.
    pub(crate) fn start_open_path(&mut self, ae: usize, pt: Point64) -> usize {
        let or_id = self.new_out_rec();
        self.out_recs[or_id].state = OutRecState::Open;
        if self.actives[ae].wind_dx > 0 {
            self.out_recs[or_id].front_edge = Some(ae);
        } else {
            self.out_recs[or_id].back_edge = Some(ae);
        }
        self.actives[ae].outrec = Some(or_id);
        let op = self.new_out_pt(pt, or_id);
        self.out_recs[or_id].pts = Some(op);
        op
    }

    // ------------------------------------------------------------------
    // Final emission
    // ------------------------------------------------------------------

    /// Signed area of a ring, accumulated exactly.
    pub(crate) fn ring_area(&self, op_start: usize) -> f64 {
        let mut area: i128 = 0;
        let mut op = op_start;
        loop {
            let p = self.out_pts[op].pt;
            let prev = self.out_pts[self.out_pts[op].prev].pt;
            area += (prev.y as i128 + p.y as i128) * (prev.x as i128 - p.x as i128);
            op = self.out_pts[op].next;
            if op == op_start {
                break;
            }
        }
        area as f64 * 0.5
    }

    fn reverse_ring(&mut self, or_id: usize) {
        let start = self.out_recs[or_id].pts.expect("reversal requires a live ring");
        let mut op = start;
        loop {
            let next = self.out_pts[op].next;
            self.out_pts[op].next = self.out_pts[op].prev;
            self.out_pts[op].prev = next;
            op = next;
            if op == start {
                break;
            }
        }
    }

    /// Joins and splits can leave a ring wound against its declared state;
    /// reverse it so outers always come out positive (before any requested
    /// whole-solution reversal).
    fn normalize_orientation(&mut self, or_id: usize) {
        let Some(pts) = self.out_recs[or_id].pts else {
            return;
        };
        let area = self.ring_area(pts);
        if area == 0.0 {
            return;
        }
        let want_positive = self.out_recs[or_id].state == OutRecState::Outer;
        if (area > 0.0) != want_positive {
            self.reverse_ring(or_id);
        }
    }

    fn build_path(&self, op: usize, reverse: bool, is_open: bool, path: &mut Path64) -> bool {
        if self.out_pts[op].next == op
            || (!is_open && self.out_pts[op].next == self.out_pts[op].prev)
        {
            return false;
        }
        path.clear();
        let start;
        let mut op2;
        let mut last_pt;
        if reverse {
            start = op;
            last_pt = self.out_pts[op].pt;
            op2 = self.out_pts[op].prev;
        } else {
            start = self.out_pts[op].next;
            last_pt = self.out_pts[start].pt;
            op2 = self.out_pts[start].next;
        }
        path.push(last_pt);
        while op2 != start {
            if self.out_pts[op2].pt != last_pt {
                last_pt = self.out_pts[op2].pt;
                path.push(last_pt);
            }
            op2 = if reverse {
                self.out_pts[op2].prev
            } else {
                self.out_pts[op2].next
            };
        }
        if is_open {
            path.len() >= 2
        } else {
            path.len() >= 3
        }
    }

    pub(crate) fn build_paths(&mut self, solution: &mut ClipSolution) {
        for i in 0..self.out_recs.len() {
            let Some(pts) = self.out_recs[i].pts else {
                continue;
            };
            let mut path = Path64::new();
            if self.out_recs[i].state == OutRecState::Open {
                if self.build_path(pts, self.reverse_solution, true, &mut path) {
                    solution.open.push(path);
                }
            } else {
                self.normalize_orientation(i);
                let pts = self.out_recs[i].pts.expect("normalization keeps the ring");
                if self.build_path(pts, self.reverse_solution, false, &mut path) {
                    solution.closed.push(path);
                }
            }
        }
    }

    pub(crate) fn build_tree(&mut self, tree: &mut PolyTree, open: &mut Paths64) {
        for i in 0..self.out_recs.len() {
            let Some(pts) = self.out_recs[i].pts else {
                continue;
            };
            if self.out_recs[i].state == OutRecState::Open {
                let mut path = Path64::new();
                if self.build_path(pts, self.reverse_solution, true, &mut path) {
                    open.push(path);
                }
                continue;
            }
            self.ensure_tree_node(i, tree);
        }
    }

    /// Creates the tree node for a ring, creating its owner's node first so
    /// parents always precede children.
    fn ensure_tree_node(&mut self, or_id: usize, tree: &mut PolyTree) -> Option<usize> {
        if let Some(node) = self.out_recs[or_id].polypath {
            return Some(node);
        }
        let pts = self.out_recs[or_id].pts?;
        self.normalize_orientation(or_id);
        let mut path = Path64::new();
        if !self.build_path(pts, self.reverse_solution, false, &mut path) {
            return None;
        }
        let parent = match self.real_owner(or_id) {
            // owner ids are always smaller, so this recursion terminates
            Some(owner) if owner != or_id => self.ensure_tree_node(owner, tree),
            _ => None,
        };
        let node = tree.add_child(parent, path);
        self.out_recs[or_id].polypath = Some(node);
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: i64, y: i64) -> Point64 {
        Point64::new(x, y)
    }

    /// Builds a closed ring directly in the arena.
    fn make_ring(c: &mut Clipper, pts: &[Point64]) -> usize {
        let or_id = c.new_out_rec();
        let first = c.new_out_pt(pts[0], or_id);
        c.out_recs[or_id].pts = Some(first);
        let mut prev = first;
        for &p in &pts[1..] {
            let id = c.new_out_pt(p, or_id);
            c.out_pts[id].prev = prev;
            c.out_pts[id].next = first;
            c.out_pts[prev].next = id;
            c.out_pts[first].prev = id;
            prev = id;
        }
        or_id
    }

    #[test]
    fn ring_area_matches_shoelace() {
        let mut c = Clipper::new();
        let or_id = make_ring(&mut c, &[pt(0, 0), pt(10, 0), pt(10, 10), pt(0, 10)]);
        let pts = c.out_recs[or_id].pts.unwrap();
        assert_eq!(c.ring_area(pts), 100.0);
    }

    #[test]
    fn reverse_ring_flips_area_sign() {
        let mut c = Clipper::new();
        let or_id = make_ring(&mut c, &[pt(0, 0), pt(10, 0), pt(10, 10), pt(0, 10)]);
        c.reverse_ring(or_id);
        let pts = c.out_recs[or_id].pts.unwrap();
        assert_eq!(c.ring_area(pts), -100.0);
    }

    #[test]
    fn build_path_skips_duplicate_points() {
        let mut c = Clipper::new();
        let or_id = make_ring(
            &mut c,
            &[pt(0, 0), pt(10, 0), pt(10, 0), pt(10, 10), pt(0, 10)],
        );
        let pts = c.out_recs[or_id].pts.unwrap();
        let mut path = Path64::new();
        assert!(c.build_path(pts, false, false, &mut path));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn build_path_rejects_two_point_rings() {
        let mut c = Clipper::new();
        let or_id = make_ring(&mut c, &[pt(0, 0), pt(10, 0)]);
        let pts = c.out_recs[or_id].pts.unwrap();
        let mut path = Path64::new();
        assert!(!c.build_path(pts, false, false, &mut path));
    }

    #[test]
    fn normalization_fixes_disagreeing_winding() {
        let mut c = Clipper::new();
        // a clockwise (negative) ring declared Outer gets reversed
        let or_id = make_ring(&mut c, &[pt(0, 0), pt(0, 10), pt(10, 10), pt(10, 0)]);
        c.out_recs[or_id].state = OutRecState::Outer;
        c.normalize_orientation(or_id);
        let pts = c.out_recs[or_id].pts.unwrap();
        assert_eq!(c.ring_area(pts), 100.0);
    }
}
