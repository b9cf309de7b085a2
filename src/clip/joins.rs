//! Deferred ring joins and post-sweep repair.
//!
//! The sweep never rewrites finished rings; when it notices two rings
//! touching along coincident edges it only records a joiner. Horizontal
//! touches are staged twice: first as trial entries (the overlap is only
//! known once both horizontals have been emitted), then promoted to real
//! joiners. After the sweep the join list is processed in insertion order,
//! merging distinct rings or splitting a ring that touches itself, and each
//! affected ring is tidied: collinear points removed and residual
//! self-intersections excised.

use crate::clip::engine::Clipper;
use crate::clip::output::OutRecState;
use crate::predicates::{
    collinear_segs_overlap, cross_product, distance_from_line_sqrd, distance_sqr, dot_product,
    intersect_point, point_between, point_equal_or_between, segments_cross, value_between,
};
use crate::primitives::Point64;

/// A deferred instruction to merge or split output rings at two points.
pub(crate) struct Joiner {
    pub op1: usize,
    pub op2: usize,
    /// Next joiner in `op1`'s chain.
    pub next1: Option<usize>,
    /// Next joiner in `op2`'s chain.
    pub next2: Option<usize>,
    pub deleted: bool,
}

fn horz_segs_overlap(x1a: i64, x1b: i64, x2a: i64, x2b: i64) -> bool {
    // segments shorter than this cannot overlap meaningfully
    const MIN_OVERLAP: i64 = 2;
    if x1a > x1b + MIN_OVERLAP {
        if x2a > x2b + MIN_OVERLAP {
            x1b < x2a && x2b < x1a
        } else {
            x1b < x2b && x2a < x1a
        }
    } else if x1b > x1a + MIN_OVERLAP {
        if x2a > x2b + MIN_OVERLAP {
            x2b < x1b && x1a < x2a
        } else {
            x2a < x1b && x1a < x2b
        }
    } else {
        false
    }
}

fn area_triangle(a: Point64, b: Point64, c: Point64) -> f64 {
    cross_product(a, b, c) as f64 * 0.5
}

impl Clipper {
    // ------------------------------------------------------------------
    // Joiner bookkeeping
    // ------------------------------------------------------------------

    pub(crate) fn add_join(&mut self, op1: usize, op2: usize) {
        if op1 == op2 {
            return;
        }
        if self.out_pts[op1].outrec == self.out_pts[op2].outrec {
            // joining ring neighbours achieves nothing unless the pair
            // spans the ring head
            let head = self.out_recs[self.out_pts[op1].outrec].pts;
            if (self.out_pts[op1].next == op2 && head != Some(op1))
                || (self.out_pts[op2].next == op1 && head != Some(op2))
            {
                return;
            }
        }
        let id = self.joiners.len();
        self.joiners.push(Joiner {
            op1,
            op2,
            next1: self.out_pts[op1].joiner,
            next2: self.out_pts[op2].joiner,
            deleted: false,
        });
        self.out_pts[op1].joiner = Some(id);
        self.out_pts[op2].joiner = Some(id);
    }

    fn find_join_parent(&self, joiner: usize, op: usize) -> usize {
        let mut result = self.out_pts[op].joiner.expect("chain contains the joiner");
        loop {
            if self.joiners[result].op1 == op {
                if self.joiners[result].next1 == Some(joiner) {
                    return result;
                }
                result = self.joiners[result].next1.expect("chain contains the joiner");
            } else {
                if self.joiners[result].next2 == Some(joiner) {
                    return result;
                }
                result = self.joiners[result].next2.expect("chain contains the joiner");
            }
        }
    }

    fn delete_join(&mut self, j: usize) {
        let op1 = self.joiners[j].op1;
        let op2 = self.joiners[j].op2;
        if self.out_pts[op1].joiner != Some(j) {
            let parent = self.find_join_parent(j, op1);
            if self.joiners[parent].op1 == op1 {
                self.joiners[parent].next1 = self.joiners[j].next1;
            } else {
                self.joiners[parent].next2 = self.joiners[j].next1;
            }
        } else {
            self.out_pts[op1].joiner = self.joiners[j].next1;
        }
        if self.out_pts[op2].joiner != Some(j) {
            let parent = self.find_join_parent(j, op2);
            if self.joiners[parent].op1 == op2 {
                self.joiners[parent].next1 = self.joiners[j].next2;
            } else {
                self.joiners[parent].next2 = self.joiners[j].next2;
            }
        } else {
            self.out_pts[op2].joiner = self.joiners[j].next2;
        }
        self.joiners[j].deleted = true;
    }

    fn safe_delete_out_pt_joiners(&mut self, op: usize) {
        if self.op_in_trial_horz_list(op) {
            self.delete_trial_horz_join(op);
        }
        while let Some(j) = self.out_pts[op].joiner {
            self.delete_join(j);
        }
    }

    // ------------------------------------------------------------------
    // Trial horizontal joins
    // ------------------------------------------------------------------

    pub(crate) fn op_in_trial_horz_list(&self, op: usize) -> bool {
        self.out_pts[op].next_horz.is_some() || self.horz_last == Some(op)
    }

    /// Stages an output point at the end of a horizontal run. Points on the
    /// trial list are protected from disposal until the list is converted.
    pub(crate) fn add_trial_horz_join(&mut self, op: usize) {
        if self.out_recs[self.out_pts[op].outrec].state == OutRecState::Open {
            return;
        }
        if self.op_in_trial_horz_list(op) {
            return;
        }
        self.out_pts[op].next_horz = self.horz_first;
        if self.horz_first.is_none() {
            self.horz_last = Some(op);
        }
        self.horz_first = Some(op);
    }

    fn delete_trial_horz_join(&mut self, op: usize) {
        let mut prev: Option<usize> = None;
        let mut cur = self.horz_first;
        while let Some(c) = cur {
            if c == op {
                let next = self.out_pts[c].next_horz;
                match prev {
                    None => self.horz_first = next,
                    Some(p) => self.out_pts[p].next_horz = next,
                }
                if self.horz_last == Some(op) {
                    self.horz_last = prev;
                }
                self.out_pts[op].next_horz = None;
                return;
            }
            prev = cur;
            cur = self.out_pts[c].next_horz;
        }
    }

    /// Widens `op` to the full run of consecutive same-Y points around it.
    /// Returns the run's two endpoints, or `None` for a lone point.
    fn get_horz_extended_horz_seg(&self, op: usize) -> Option<(usize, usize)> {
        let or_id = self.get_real_out_rec(self.out_pts[op].outrec)?;
        let mut op_a = op;
        let mut op_b = op;
        let y = self.out_pts[op].pt.y;
        if self.out_recs[or_id].front_edge.is_some() {
            let head = self.out_recs[or_id].pts.expect("live ring has points");
            while self.out_pts[op_a].prev != head
                && self.out_pts[self.out_pts[op_a].prev].pt.y == y
            {
                op_a = self.out_pts[op_a].prev;
            }
            while op_b != head && self.out_pts[self.out_pts[op_b].next].pt.y == y {
                op_b = self.out_pts[op_b].next;
            }
            if op_b == op_a {
                None
            } else {
                Some((op_a, op_b))
            }
        } else {
            while self.out_pts[op_a].prev != op_b
                && self.out_pts[self.out_pts[op_a].prev].pt.y == y
            {
                op_a = self.out_pts[op_a].prev;
            }
            while self.out_pts[op_b].next != op_a
                && self.out_pts[self.out_pts[op_b].next].pt.y == y
            {
                op_b = self.out_pts[op_b].next;
            }
            if op_b == op_a || self.out_pts[op_b].next == op_a {
                None // the ring is completely flat
            } else {
                Some((op_a, op_b))
            }
        }
    }

    /// Converts staged horizontal endpoints into real joiners wherever two
    /// runs on the same scanline overlap.
    pub(crate) fn convert_horz_trials_to_joins(&mut self) {
        while let Some(op1) = self.horz_first {
            self.horz_first = self.out_pts[op1].next_horz;
            self.out_pts[op1].next_horz = None;
            if self.horz_first.is_none() {
                self.horz_last = None;
            }

            let Some((op1a, op1b)) = self.get_horz_extended_horz_seg(op1) else {
                continue;
            };

            let mut prev: Option<usize> = None;
            let mut cur = self.horz_first;
            while let Some(op2) = cur {
                let next = self.out_pts[op2].next_horz;
                if let Some((op2a, op2b)) = self.get_horz_extended_horz_seg(op2) {
                    if self.out_pts[op2a].pt.y == self.out_pts[op1a].pt.y
                        && horz_segs_overlap(
                            self.out_pts[op1a].pt.x,
                            self.out_pts[op1b].pt.x,
                            self.out_pts[op2a].pt.x,
                            self.out_pts[op2b].pt.x,
                        )
                    {
                        match prev {
                            None => self.horz_first = next,
                            Some(p) => self.out_pts[p].next_horz = next,
                        }
                        if self.horz_last == Some(op2) {
                            self.horz_last = prev;
                        }
                        self.out_pts[op2].next_horz = None;
                        self.promote_horz_join(op1a, op1b, op2a, op2b);
                        break;
                    }
                }
                prev = cur;
                cur = next;
            }
        }
        self.horz_last = None;
    }

    fn promote_horz_join(&mut self, op1a: usize, op1b: usize, op2a: usize, op2b: usize) {
        let p1a = self.out_pts[op1a].pt;
        let p1b = self.out_pts[op1b].pt;
        let p2a = self.out_pts[op2a].pt;
        let p2b = self.out_pts[op2b].pt;
        // join at matching endpoints when they exist, otherwise split the
        // longer run at the inner endpoint of the shorter
        if p1a == p2b {
            self.add_join(op1a, op2b);
        } else if p1b == p2a {
            self.add_join(op1b, op2a);
        } else if p1a == p2a {
            self.add_join(op1a, op2a);
        } else if p1b == p2b {
            self.add_join(op1b, op2b);
        } else if value_between(p1a.x, p2a.x, p2b.x) {
            let ins = self.insert_op(p1a, op2a);
            self.add_join(op1a, ins);
        } else if value_between(p1b.x, p2a.x, p2b.x) {
            let ins = self.insert_op(p1b, op2a);
            self.add_join(op1b, ins);
        } else if value_between(p2a.x, p1a.x, p1b.x) {
            let ins = self.insert_op(p2a, op1a);
            self.add_join(op2a, ins);
        } else if value_between(p2b.x, p1a.x, p1b.x) {
            let ins = self.insert_op(p2b, op1a);
            self.add_join(op2b, ins);
        }
    }

    // ------------------------------------------------------------------
    // Ring surgery primitives
    // ------------------------------------------------------------------

    fn insert_op(&mut self, pt: Point64, insert_after: usize) -> usize {
        let or_id = self.out_pts[insert_after].outrec;
        let next = self.out_pts[insert_after].next;
        let id = self.new_out_pt(pt, or_id);
        self.out_pts[id].prev = insert_after;
        self.out_pts[id].next = next;
        self.out_pts[insert_after].next = id;
        self.out_pts[next].prev = id;
        id
    }

    /// Unlinks `op` from its ring. Returns the following point, or `None`
    /// when `op` was the last one.
    fn dispose_out_pt(&mut self, op: usize) -> Option<usize> {
        let next = self.out_pts[op].next;
        let prev = self.out_pts[op].prev;
        let result = if next == op { None } else { Some(next) };
        self.out_pts[prev].next = next;
        self.out_pts[next].prev = prev;
        result
    }

    /// Retires a whole ring, dropping every pending joiner on the way.
    fn safe_dispose_out_pts(&mut self, op: usize) {
        let or_id = self
            .get_real_out_rec(self.out_pts[op].outrec)
            .unwrap_or(self.out_pts[op].outrec);
        if let Some(f) = self.out_recs[or_id].front_edge {
            self.actives[f].outrec = None;
        }
        if let Some(b) = self.out_recs[or_id].back_edge {
            self.actives[b].outrec = None;
        }
        self.out_recs[or_id].front_edge = None;
        self.out_recs[or_id].back_edge = None;
        let start = op;
        let mut cur = op;
        loop {
            self.safe_delete_out_pt_joiners(cur);
            cur = self.out_pts[cur].next;
            if cur == start {
                break;
            }
        }
        self.out_recs[or_id].pts = None;
    }

    fn is_valid_path(&self, op: usize) -> bool {
        self.out_pts[op].next != op
    }

    fn is_valid_closed_path(&self, op: Option<usize>) -> bool {
        match op {
            Some(op) => {
                self.out_pts[op].next != op && self.out_pts[op].next != self.out_pts[op].prev
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Join processing
    // ------------------------------------------------------------------

    pub(crate) fn process_join_list(&mut self) {
        for j in 0..self.joiners.len() {
            if self.joiners[j].deleted {
                continue;
            }
            let or_id = self.process_join(j);
            self.clean_collinear(or_id);
            if !self.succeeded {
                return;
            }
        }
        self.joiners.clear();
    }

    fn process_join(&mut self, j: usize) -> Option<usize> {
        let mut op1 = self.joiners[j].op1;
        let mut op2 = self.joiners[j].op2;
        let Some(or1) = self.get_real_out_rec(self.out_pts[op1].outrec) else {
            self.delete_join(j);
            return None;
        };
        let Some(or2) = self.get_real_out_rec(self.out_pts[op2].outrec) else {
            self.delete_join(j);
            return Some(or1);
        };
        self.delete_join(j);

        if self.out_recs[or2].pts.is_none() {
            return Some(or1);
        }
        if !self.is_valid_closed_path(Some(op2)) {
            self.safe_dispose_out_pts(op2);
            return Some(or1);
        }
        if self.out_recs[or1].pts.is_none() || !self.is_valid_closed_path(Some(op1)) {
            self.safe_dispose_out_pts(op1);
            return Some(or2);
        }
        if or1 == or2
            && (op1 == op2 || self.out_pts[op1].next == op2 || self.out_pts[op1].prev == op2)
        {
            return Some(or1);
        }

        self.check_dispose_adjacent(&mut op1, op2, or1);
        self.check_dispose_adjacent(&mut op2, op1, or2);
        if self.out_pts[op1].next == op2 || self.out_pts[op2].next == op1 {
            return Some(or1);
        }

        let mut result = or1;
        loop {
            if !self.is_valid_path(op1)
                || !self.is_valid_path(op2)
                || (or1 == or2
                    && (self.out_pts[op1].prev == op2 || self.out_pts[op1].next == op2))
            {
                return Some(or1);
            }

            let p1 = self.out_pts[op1].pt;
            let p2 = self.out_pts[op2].pt;
            let op1_prev = self.out_pts[op1].prev;
            let op1_next = self.out_pts[op1].next;
            let op2_prev = self.out_pts[op2].prev;
            let op2_next = self.out_pts[op2].next;
            let p1_prev = self.out_pts[op1_prev].pt;
            let p1_next = self.out_pts[op1_next].pt;
            let p2_prev = self.out_pts[op2_prev].pt;
            let p2_next = self.out_pts[op2_next].pt;

            if p1_prev == p2_next
                || (cross_product(p1_prev, p1, p2_next) == 0
                    && collinear_segs_overlap(p1_prev, p1, p2, p2_next))
            {
                if or1 == or2 {
                    // SPLIT: align the two seam points, then pinch the ring
                    if p1_prev != p2_next {
                        if point_equal_or_between(p1_prev, p2, p2_next) {
                            self.insert_op(p1_prev, op2);
                        } else {
                            self.insert_op(p2_next, op1_prev);
                        }
                    }
                    let op_a = self.out_pts[op1].prev;
                    let op_b = self.out_pts[op2].next;
                    self.out_pts[op_a].next = op_b;
                    self.out_pts[op_b].prev = op_a;
                    self.out_pts[op1].prev = op2;
                    self.out_pts[op2].next = op1;
                    self.complete_split(op1, op_a, or1);
                } else {
                    // MERGE the two rings at the shared edge
                    let op_a = self.out_pts[op1].prev;
                    let op_b = self.out_pts[op2].next;
                    self.out_pts[op_a].next = op_b;
                    self.out_pts[op_b].prev = op_a;
                    self.out_pts[op1].prev = op2;
                    self.out_pts[op2].next = op1;
                    result = self.merge_rings(or1, or2, op1);
                }
                break;
            }

            if p1_next == p2_prev
                || (cross_product(p1_next, p2, p2_prev) == 0
                    && collinear_segs_overlap(p1_next, p1, p2, p2_prev))
            {
                if or1 == or2 {
                    if p1_next != p2_prev {
                        if point_equal_or_between(p2_prev, p1, p1_next) {
                            self.insert_op(p2_prev, op1);
                        } else {
                            self.insert_op(p1_next, op2_prev);
                        }
                    }
                    let op_a = self.out_pts[op2].prev;
                    let op_b = self.out_pts[op1].next;
                    self.out_pts[op_a].next = op_b;
                    self.out_pts[op_b].prev = op_a;
                    self.out_pts[op2].prev = op1;
                    self.out_pts[op1].next = op2;
                    self.complete_split(op1, op_a, or1);
                } else {
                    let op_a = self.out_pts[op1].next;
                    let op_b = self.out_pts[op2].prev;
                    self.out_pts[op_a].prev = op_b;
                    self.out_pts[op_b].next = op_a;
                    self.out_pts[op1].next = op2;
                    self.out_pts[op2].prev = op1;
                    result = self.merge_rings(or1, or2, op1);
                }
                break;
            }

            // no edge match yet: bridge nearly-touching points and retry
            if point_between(p1_next, p2, p2_prev)
                && distance_from_line_sqrd(p1_next, p2, p2_prev) < 2.01
            {
                self.insert_op(p1_next, op2_prev);
                continue;
            }
            if point_between(p2_next, p1, p1_prev)
                && distance_from_line_sqrd(p2_next, p1, p1_prev) < 2.01
            {
                self.insert_op(p2_next, op1_prev);
                continue;
            }
            if point_between(p1_prev, p2, p2_next)
                && distance_from_line_sqrd(p1_prev, p2, p2_next) < 2.01
            {
                self.insert_op(p1_prev, op2);
                continue;
            }
            if point_between(p2_prev, p1, p1_next)
                && distance_from_line_sqrd(p2_prev, p1, p1_next) < 2.01
            {
                self.insert_op(p2_prev, op1);
                continue;
            }

            // something is off at one of the seam points; tidy and retry
            if self.check_dispose_adjacent(&mut op1, op2, or1) {
                continue;
            }
            if self.check_dispose_adjacent(&mut op2, op1, or1) {
                continue;
            }
            if p1_prev != p2_next && distance_sqr(p1_prev, p2_next) <= 2 {
                self.out_pts[op1_prev].pt = p2_next;
                continue;
            }
            if p1_next != p2_prev && distance_sqr(p1_next, p2_prev) <= 2 {
                self.out_pts[op2_prev].pt = p1_next;
                continue;
            }

            // give up joining; leave both rings in a consistent state
            self.out_recs[or1].pts = Some(op1);
            if or2 != or1 {
                self.out_recs[or2].pts = Some(op2);
                self.clean_collinear(Some(or2));
            }
            break;
        }
        Some(result)
    }

    fn merge_rings(&mut self, or1: usize, or2: usize, op1: usize) -> usize {
        // the surviving ring is the one created first; the absorbed ring's
        // owner link is redirected at the survivor
        if or1 < or2 {
            self.out_recs[or1].pts = Some(op1);
            self.out_recs[or2].pts = None;
            if self.out_recs[or1].owner.is_some() {
                let own2 = self.out_recs[or2].owner;
                if own2.is_none() || own2 < self.out_recs[or1].owner {
                    self.out_recs[or1].owner = own2;
                }
            }
            self.out_recs[or2].owner = Some(or1);
            or1
        } else {
            self.out_recs[or2].pts = Some(op1);
            self.out_recs[or1].pts = None;
            if self.out_recs[or2].owner.is_some() {
                let own1 = self.out_recs[or1].owner;
                if own1.is_none() || own1 < self.out_recs[or2].owner {
                    self.out_recs[or2].owner = own1;
                }
            }
            self.out_recs[or1].owner = Some(or2);
            or2
        }
    }

    fn check_dispose_adjacent(&mut self, op: &mut usize, guard: usize, or_id: usize) -> bool {
        let mut result = false;
        while self.out_pts[*op].prev != *op {
            let prev = self.out_pts[*op].prev;
            if self.out_pts[*op].pt == self.out_pts[prev].pt
                && *op != guard
                && self.out_pts[prev].joiner.is_some()
                && self.out_pts[*op].joiner.is_none()
                && !self.op_in_trial_horz_list(*op)
            {
                if Some(*op) == self.out_recs[or_id].pts {
                    self.out_recs[or_id].pts = Some(prev);
                }
                self.dispose_out_pt(*op);
                *op = prev;
                result = true;
            } else {
                break;
            }
        }
        while self.out_pts[*op].next != *op {
            let next = self.out_pts[*op].next;
            if self.out_pts[*op].pt == self.out_pts[next].pt
                && *op != guard
                && self.out_pts[next].joiner.is_some()
                && self.out_pts[*op].joiner.is_none()
                && !self.op_in_trial_horz_list(*op)
            {
                if Some(*op) == self.out_recs[or_id].pts {
                    self.out_recs[or_id].pts = Some(next);
                }
                self.dispose_out_pt(*op);
                *op = next;
                result = true;
            } else {
                break;
            }
        }
        result
    }

    fn complete_split(&mut self, op1: usize, op2: usize, or_id: usize) {
        let area1 = self.ring_area(op1);
        let area2 = self.ring_area(op2);
        let signs_change = (area1 > 0.0) == (area2 < 0.0);

        // one side of a split can be vanishingly small; drop it
        if area1 == 0.0 || (signs_change && area1.abs() < 1.0) {
            self.safe_dispose_out_pts(op1);
            self.out_recs[or_id].pts = Some(op2);
            self.update_outrec_owner(or_id);
        } else if area2 == 0.0 || (signs_change && area2.abs() < 1.0) {
            self.safe_dispose_out_pts(op2);
            self.out_recs[or_id].pts = Some(op1);
            self.update_outrec_owner(or_id);
        } else {
            let new_or = self.new_out_rec();
            if area1.abs() >= area2.abs() {
                self.out_recs[or_id].pts = Some(op1);
                self.out_recs[new_or].pts = Some(op2);
            } else {
                self.out_recs[or_id].pts = Some(op2);
                self.out_recs[new_or].pts = Some(op1);
            }
            if (area1 > 0.0) == (area2 > 0.0) {
                // same winding: siblings under the original owner
                self.out_recs[new_or].owner = self.out_recs[or_id].owner;
                self.out_recs[new_or].state = self.out_recs[or_id].state;
            } else {
                // opposite winding: the smaller ring nests inside the larger
                self.out_recs[new_or].owner = Some(or_id);
                self.out_recs[new_or].state = if self.out_recs[or_id].state == OutRecState::Outer
                {
                    OutRecState::Inner
                } else {
                    OutRecState::Outer
                };
            }
            self.update_outrec_owner(new_or);
            self.clean_collinear(Some(new_or));
        }
    }

    fn update_outrec_owner(&mut self, or_id: usize) {
        let Some(start) = self.out_recs[or_id].pts else {
            return;
        };
        let mut op = start;
        loop {
            self.out_pts[op].outrec = or_id;
            op = self.out_pts[op].next;
            if op == start {
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Ring tidying
    // ------------------------------------------------------------------

    /// Removes collinear points (all of them, or only 180 degree spikes
    /// when collinear preservation is on), then repairs residual
    /// self-intersections. Points pinned by a pending join stay put.
    pub(crate) fn clean_collinear(&mut self, or_id: Option<usize>) {
        let Some(or_id) = or_id.and_then(|o| self.get_real_out_rec(o)) else {
            return;
        };
        if self.out_recs[or_id].state == OutRecState::Open
            || self.out_recs[or_id].front_edge.is_some()
        {
            return;
        }
        if !self.is_valid_closed_path(self.out_recs[or_id].pts) {
            if let Some(p) = self.out_recs[or_id].pts {
                self.safe_dispose_out_pts(p);
            }
            self.out_recs[or_id].pts = None;
            return;
        }

        let mut start = self.out_recs[or_id].pts.expect("validated above");
        let mut op2 = start;
        loop {
            let prev = self.out_pts[op2].prev;
            let next = self.out_pts[op2].next;
            let pp = self.out_pts[prev].pt;
            let pc = self.out_pts[op2].pt;
            let pn = self.out_pts[next].pt;
            if cross_product(pp, pc, pn) == 0
                && self.out_pts[op2].joiner.is_none()
                && !self.op_in_trial_horz_list(op2)
                && (pc == pp || pc == pn || !self.preserve_collinear || dot_product(pp, pc, pn) < 0)
            {
                if Some(op2) == self.out_recs[or_id].pts {
                    self.out_recs[or_id].pts = Some(prev);
                }
                let Some(d) = self.dispose_out_pt(op2) else {
                    self.out_recs[or_id].pts = None;
                    return;
                };
                if !self.is_valid_closed_path(Some(d)) {
                    self.safe_dispose_out_pts(d);
                    return;
                }
                start = d;
                op2 = d;
                continue;
            }
            op2 = self.out_pts[op2].next;
            if op2 == start {
                break;
            }
        }
        self.fix_self_intersects(or_id);
    }

    fn fix_self_intersects(&mut self, or_id: usize) {
        let Some(mut op) = self.out_recs[or_id].pts else {
            return;
        };
        let mut op2 = op;
        loop {
            let prev = self.out_pts[op2].prev;
            let next = self.out_pts[op2].next;
            let next_next = self.out_pts[next].next;
            // triangles cannot self-intersect
            if prev == next_next {
                break;
            }
            if segments_cross(
                self.out_pts[prev].pt,
                self.out_pts[op2].pt,
                self.out_pts[next].pt,
                self.out_pts[next_next].pt,
            ) {
                if op2 == op || next == op {
                    op = prev;
                }
                op2 = self.do_split_op(or_id, op, op2);
                op = op2;
                continue;
            }
            op2 = next;
            if op2 == op {
                break;
            }
        }
        self.out_recs[or_id].pts = Some(op);
    }

    /// Excises the crossing pair of segments around `split_op`, keeping the
    /// excised triangle as a new ring when it is substantial.
    fn do_split_op(&mut self, or_id: usize, outrec_op: usize, split_op: usize) -> usize {
        let prev_op = self.out_pts[split_op].prev;
        let next = self.out_pts[split_op].next;
        let next_next = self.out_pts[next].next;
        let result = prev_op;

        let ip = intersect_point(
            self.out_pts[prev_op].pt,
            self.out_pts[split_op].pt,
            self.out_pts[next].pt,
            self.out_pts[next_next].pt,
        )
        .unwrap_or(self.out_pts[split_op].pt);

        let area1 = self.ring_area(outrec_op);
        let area2 = area_triangle(ip, self.out_pts[split_op].pt, self.out_pts[next].pt);
        let abs_area2 = area2.abs();

        // unlink the crossing pair, inserting the intersection point
        if ip == self.out_pts[prev_op].pt || ip == self.out_pts[next_next].pt {
            self.out_pts[next_next].prev = prev_op;
            self.out_pts[prev_op].next = next_next;
        } else {
            let new2 = self.new_out_pt(ip, or_id);
            self.out_pts[new2].prev = prev_op;
            self.out_pts[new2].next = next_next;
            self.out_pts[next_next].prev = new2;
            self.out_pts[prev_op].next = new2;
        }

        self.safe_delete_out_pt_joiners(next);
        self.safe_delete_out_pt_joiners(split_op);

        if abs_area2 >= 1.0 && (abs_area2 > area1.abs() || (area2 > 0.0) == (area1 > 0.0)) {
            let new_or = self.new_out_rec();
            self.out_recs[new_or].owner = self.out_recs[or_id].owner;
            self.out_recs[new_or].state = self.out_recs[or_id].state;
            self.out_pts[split_op].outrec = new_or;
            self.out_pts[next].outrec = new_or;
            let new_op = self.new_out_pt(ip, new_or);
            self.out_pts[new_op].prev = next;
            self.out_pts[new_op].next = split_op;
            self.out_recs[new_or].pts = Some(new_op);
            self.out_pts[split_op].prev = new_op;
            self.out_pts[next].next = new_op;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::engine::Clipper;

    fn pt(x: i64, y: i64) -> Point64 {
        Point64::new(x, y)
    }

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

    fn ring_points(c: &Clipper, or_id: usize) -> Vec<(i64, i64)> {
        let mut out = Vec::new();
        let Some(start) = c.out_recs[or_id].pts else {
            return out;
        };
        let mut op = start;
        loop {
            let p = c.out_pts[op].pt;
            out.push((p.x, p.y));
            op = c.out_pts[op].next;
            if op == start {
                break;
            }
        }
        out
    }

    #[test]
    fn test_horz_segs_overlap() {
        assert!(horz_segs_overlap(0, 10, 5, 15));
        assert!(horz_segs_overlap(10, 0, 5, 15));
        assert!(!horz_segs_overlap(0, 10, 10, 20));
        assert!(!horz_segs_overlap(0, 1, 0, 1)); // too short
    }

    #[test]
    fn trial_list_membership_and_removal() {
        let mut c = Clipper::new();
        let or_id = make_ring(&mut c, &[pt(0, 0), pt(10, 0), pt(10, 10)]);
        let a = c.out_recs[or_id].pts.unwrap();
        let b = c.out_pts[a].next;
        let d = c.out_pts[b].next;

        c.add_trial_horz_join(a);
        c.add_trial_horz_join(b);
        c.add_trial_horz_join(d);
        assert!(c.op_in_trial_horz_list(a));
        assert!(c.op_in_trial_horz_list(b));
        assert!(c.op_in_trial_horz_list(d));

        // adding twice is a no-op
        c.add_trial_horz_join(b);

        c.delete_trial_horz_join(b);
        assert!(!c.op_in_trial_horz_list(b));
        assert!(c.op_in_trial_horz_list(a));
        assert!(c.op_in_trial_horz_list(d));

        c.delete_trial_horz_join(a);
        c.delete_trial_horz_join(d);
        assert!(c.horz_first.is_none());
        assert!(c.horz_last.is_none());
    }

    #[test]
    fn join_chain_add_and_delete() {
        let mut c = Clipper::new();
        let or_a = make_ring(&mut c, &[pt(0, 0), pt(10, 0), pt(10, 10)]);
        let or_b = make_ring(&mut c, &[pt(0, 0), pt(10, 0), pt(10, 10)]);
        let a = c.out_recs[or_a].pts.unwrap();
        let b = c.out_recs[or_b].pts.unwrap();
        let b2 = c.out_pts[b].next;

        c.add_join(a, b);
        c.add_join(a, b2);
        assert_eq!(c.joiners.len(), 2);
        assert_eq!(c.out_pts[a].joiner, Some(1));

        c.delete_join(0);
        assert!(c.joiners[0].deleted);
        assert_eq!(c.out_pts[a].joiner, Some(1));
        assert_eq!(c.out_pts[b].joiner, None);

        c.delete_join(1);
        assert_eq!(c.out_pts[a].joiner, None);
        assert_eq!(c.out_pts[b2].joiner, None);
    }

    #[test]
    fn clean_collinear_removes_midpoints() {
        let mut c = Clipper::new();
        c.preserve_collinear = false;
        let or_id = make_ring(
            &mut c,
            &[pt(0, 0), pt(5, 0), pt(10, 0), pt(10, 10), pt(0, 10)],
        );
        c.clean_collinear(Some(or_id));
        let pts = ring_points(&c, or_id);
        assert_eq!(pts.len(), 4);
        assert!(!pts.contains(&(5, 0)));
    }

    #[test]
    fn clean_collinear_keeps_midpoints_when_preserving() {
        let mut c = Clipper::new();
        let or_id = make_ring(
            &mut c,
            &[pt(0, 0), pt(5, 0), pt(10, 0), pt(10, 10), pt(0, 10)],
        );
        c.clean_collinear(Some(or_id));
        assert_eq!(ring_points(&c, or_id).len(), 5);
    }

    #[test]
    fn clean_collinear_always_removes_spikes() {
        let mut c = Clipper::new();
        // (12,0) then back to (10,0): a 180 degree spike off the top corner
        let or_id = make_ring(
            &mut c,
            &[pt(0, 0), pt(10, 0), pt(12, 0), pt(10, 0), pt(10, 10), pt(0, 10)],
        );
        c.clean_collinear(Some(or_id));
        let pts = ring_points(&c, or_id);
        assert_eq!(pts.len(), 4);
        assert!(!pts.contains(&(12, 0)));
    }

    #[test]
    fn degenerate_ring_is_disposed() {
        let mut c = Clipper::new();
        let or_id = make_ring(&mut c, &[pt(0, 0), pt(10, 0)]);
        c.clean_collinear(Some(or_id));
        assert!(c.out_recs[or_id].pts.is_none());
    }

    #[test]
    fn fix_self_intersects_splits_bowtie() {
        let mut c = Clipper::new();
        // a ring crossing itself between segments (10,0)->(0,10) and
        // (0,0)->(10,10) is cut at (5,5)
        let or_id = make_ring(&mut c, &[pt(0, 0), pt(10, 0), pt(0, 10), pt(10, 10)]);
        c.clean_collinear(Some(or_id));
        let live: Vec<usize> = (0..c.out_recs.len())
            .filter(|&i| c.out_recs[i].pts.is_some())
            .collect();
        assert_eq!(live.len(), 2);
        for or_id in live {
            let pts = c.out_recs[or_id].pts.unwrap();
            assert!(c.ring_area(pts).abs() >= 1.0);
        }
    }
}
