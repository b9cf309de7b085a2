//! The sweep-line clipping engine.
//!
//! The sweep processes scanlines bottom-up (largest Y first). Edges that
//! cross the current scanline live in the active edge list (AEL), ordered
//! left to right. Between two consecutive scanlines every edge crossing is
//! discovered with a bottom-up merge sort over a second linkage (the SEL),
//! then processed strictly in descending-Y order so winding counts stay
//! consistent. Output rings are accumulated in index arenas and finished by
//! the post-processing in [`super::joins`].

use std::collections::BinaryHeap;

use crate::clip::output::{OutPt, OutRec};
use crate::clip::topology::{LocalMinima, Vertex};
use crate::clip::tree::PolyTree;
use crate::clip::{ClipType, FillRule, PathType};
use crate::error::ExactError;
use crate::predicates::cross_product;
use crate::primitives::{Path64, Paths64, Point64};

use super::joins::Joiner;

/// Callback invoked at freshly computed intersection points; receives the
/// four edge endpoints (subject edge first where possible) and may rewrite
/// the new point's auxiliary coordinate.
#[cfg(feature = "z")]
pub type ZCallback = Box<dyn FnMut(Point64, Point64, Point64, Point64, &mut Point64)>;

/// An edge currently crossing the sweep line.
pub(crate) struct Active {
    pub bot: Point64,
    pub top: Point64,
    /// X where this edge crosses the current scanline.
    pub cur_x: i64,
    /// Inverse slope; signed infinity encodes horizontal headings.
    pub dx: f64,
    /// Winding direction of the underlying bound (+1 ascending, -1 descending).
    pub wind_dx: i32,
    /// Winding count of the edge's own path type.
    pub wind_cnt: i32,
    /// Winding count of the opposite path type.
    pub wind_cnt2: i32,
    pub outrec: Option<usize>,
    pub prev_in_ael: Option<usize>,
    pub next_in_ael: Option<usize>,
    pub prev_in_sel: Option<usize>,
    pub next_in_sel: Option<usize>,
    pub jump: Option<usize>,
    pub vertex_top: usize,
    pub local_min: usize,
    pub is_left_bound: bool,
}

#[derive(Clone, Copy)]
struct IntersectNode {
    pt: Point64,
    edge1: usize,
    edge2: usize,
}

/// The result of a clipping operation: closed rings and open polylines.
#[derive(Debug, Clone, Default)]
pub struct ClipSolution {
    /// Closed output rings. Outer rings wind positively unless the engine
    /// was configured with `set_reverse_solution(true)`.
    pub closed: Paths64,
    /// Clipped fragments of open subject paths.
    pub open: Paths64,
}

/// A reusable polygon clipping engine.
///
/// Add subject and clip paths, then call [`execute`](Clipper::execute) (or
/// [`execute_tree`](Clipper::execute_tree) for nested output). The added
/// paths are retained, so the same geometry can be executed repeatedly with
/// different operations or fill rules.
///
/// # Example
///
/// ```
/// use exactum::clip::{ClipType, Clipper, FillRule, PathType};
/// use exactum::Point2;
///
/// let mut clipper = Clipper::new();
/// clipper.add_subject(&vec![
///     Point2::new(0, 0),
///     Point2::new(10, 0),
///     Point2::new(10, 10),
///     Point2::new(0, 10),
/// ]);
/// clipper.add_clip(&vec![
///     Point2::new(5, 5),
///     Point2::new(15, 5),
///     Point2::new(15, 15),
///     Point2::new(5, 15),
/// ]);
/// let solution = clipper.execute(ClipType::Intersection, FillRule::NonZero).unwrap();
/// assert_eq!(solution.closed.len(), 1);
/// ```
pub struct Clipper {
    // preprocessing state, retained across executes
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) minima: Vec<LocalMinima>,
    pub(crate) minima_sorted: bool,
    pub(crate) has_open_paths: bool,

    // per-execute sweep state
    pub(crate) actives: Vec<Active>,
    pub(crate) out_pts: Vec<OutPt>,
    pub(crate) out_recs: Vec<OutRec>,
    pub(crate) joiners: Vec<Joiner>,
    pub(crate) horz_first: Option<usize>,
    pub(crate) horz_last: Option<usize>,
    ael_first: Option<usize>,
    sel_first: Option<usize>,
    scanlines: BinaryHeap<i64>,
    intersect_nodes: Vec<IntersectNode>,
    curr_loc_min: usize,
    current_bot_y: i64,

    pub(crate) clip_type: ClipType,
    pub(crate) fill_rule: FillRule,
    pub(crate) preserve_collinear: bool,
    pub(crate) reverse_solution: bool,
    pub(crate) succeeded: bool,
    pub(crate) fail_reason: &'static str,

    #[cfg(feature = "z")]
    z_callback: Option<ZCallback>,
}

impl Default for Clipper {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipper {
    /// Creates an empty clipper with default options: collinear vertices
    /// preserved, default orientation.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            minima: Vec::new(),
            minima_sorted: false,
            has_open_paths: false,
            actives: Vec::new(),
            out_pts: Vec::new(),
            out_recs: Vec::new(),
            joiners: Vec::new(),
            horz_first: None,
            horz_last: None,
            ael_first: None,
            sel_first: None,
            scanlines: BinaryHeap::new(),
            intersect_nodes: Vec::new(),
            curr_loc_min: 0,
            current_bot_y: 0,
            clip_type: ClipType::None,
            fill_rule: FillRule::EvenOdd,
            preserve_collinear: true,
            reverse_solution: false,
            succeeded: true,
            fail_reason: "",
            #[cfg(feature = "z")]
            z_callback: None,
        }
    }

    /// Keeps collinear output vertices when `true` (the default). Spikes
    /// that double back 180 degrees are always removed.
    pub fn set_preserve_collinear(&mut self, value: bool) {
        self.preserve_collinear = value;
    }

    /// Reverses the orientation of all emitted rings.
    pub fn set_reverse_solution(&mut self, value: bool) {
        self.reverse_solution = value;
    }

    /// Installs a callback that can stamp the auxiliary coordinate onto new
    /// intersection points.
    #[cfg(feature = "z")]
    pub fn set_z_callback(&mut self, callback: ZCallback) {
        self.z_callback = Some(callback);
    }

    /// Adds one path to the pending operation. Open paths are accepted for
    /// subjects only.
    pub fn add_path(
        &mut self,
        path: &Path64,
        polytype: PathType,
        is_open: bool,
    ) -> Result<(), ExactError> {
        if is_open {
            if polytype == PathType::Clip {
                return Err(ExactError::OpenClipPath);
            }
            self.has_open_paths = true;
        }
        self.minima_sorted = false;
        self.add_path_to_vertex_list(path, polytype, is_open);
        Ok(())
    }

    /// Adds several paths of the same kind.
    pub fn add_paths(
        &mut self,
        paths: &Paths64,
        polytype: PathType,
        is_open: bool,
    ) -> Result<(), ExactError> {
        for path in paths {
            self.add_path(path, polytype, is_open)?;
        }
        Ok(())
    }

    /// Adds a closed subject path.
    pub fn add_subject(&mut self, path: &Path64) {
        let _ = self.add_path(path, PathType::Subject, false);
    }

    /// Adds an open subject path.
    pub fn add_open_subject(&mut self, path: &Path64) {
        let _ = self.add_path(path, PathType::Subject, true);
    }

    /// Adds a closed clip path.
    pub fn add_clip(&mut self, path: &Path64) {
        let _ = self.add_path(path, PathType::Clip, false);
    }

    /// Drops all added paths and any intermediate state.
    pub fn clear(&mut self) {
        self.clear_solution_state();
        self.vertices.clear();
        self.minima.clear();
        self.minima_sorted = false;
        self.has_open_paths = false;
    }

    /// Runs the Boolean operation and returns closed rings and clipped open
    /// paths. The added geometry is retained for further executions.
    pub fn execute(
        &mut self,
        clip_type: ClipType,
        fill_rule: FillRule,
    ) -> Result<ClipSolution, ExactError> {
        self.execute_internal(clip_type, fill_rule)?;
        let mut solution = ClipSolution::default();
        self.build_paths(&mut solution);
        Ok(solution)
    }

    /// Runs the Boolean operation, returning closed rings as a nesting tree
    /// together with the clipped open paths.
    pub fn execute_tree(
        &mut self,
        clip_type: ClipType,
        fill_rule: FillRule,
    ) -> Result<(PolyTree, Paths64), ExactError> {
        self.execute_internal(clip_type, fill_rule)?;
        let mut tree = PolyTree::default();
        let mut open = Paths64::new();
        self.build_tree(&mut tree, &mut open);
        Ok((tree, open))
    }

    pub(crate) fn fail(&mut self, reason: &'static str) {
        if self.succeeded {
            self.succeeded = false;
            self.fail_reason = reason;
        }
    }

    fn clear_solution_state(&mut self) {
        self.actives.clear();
        self.out_pts.clear();
        self.out_recs.clear();
        self.joiners.clear();
        self.horz_first = None;
        self.horz_last = None;
        self.ael_first = None;
        self.sel_first = None;
        self.scanlines.clear();
        self.intersect_nodes.clear();
        self.curr_loc_min = 0;
        self.succeeded = true;
        self.fail_reason = "";
    }

    fn execute_internal(
        &mut self,
        clip_type: ClipType,
        fill_rule: FillRule,
    ) -> Result<(), ExactError> {
        self.clear_solution_state();
        if clip_type == ClipType::None {
            return Ok(());
        }
        self.clip_type = clip_type;
        self.fill_rule = fill_rule;
        self.reset();

        let Some(first_y) = self.pop_scanline() else {
            return Ok(());
        };
        let mut y = first_y;
        while self.succeeded {
            self.insert_local_minima_into_ael(y);
            while let Some(h) = self.pop_horz() {
                self.do_horizontal(h);
            }
            if self.horz_first.is_some() {
                self.convert_horz_trials_to_joins();
            }
            self.current_bot_y = y;
            let Some(top_y) = self.pop_scanline() else {
                break;
            };
            self.do_intersections(top_y);
            self.do_top_of_scanbeam(top_y);
            while let Some(h) = self.pop_horz() {
                self.do_horizontal(h);
            }
            y = top_y;
        }
        if self.succeeded {
            self.process_join_list();
        }
        if self.succeeded {
            Ok(())
        } else {
            Err(ExactError::SweepFailed {
                reason: self.fail_reason,
            })
        }
    }

    fn reset(&mut self) {
        if !self.minima_sorted {
            let mut minima = std::mem::take(&mut self.minima);
            // stable: simultaneous minima keep insertion order
            minima.sort_by(|a, b| {
                self.vertices[b.vertex]
                    .pt
                    .y
                    .cmp(&self.vertices[a.vertex].pt.y)
            });
            self.minima = minima;
            self.minima_sorted = true;
        }
        for lm in &self.minima {
            self.scanlines.push(self.vertices[lm.vertex].pt.y);
        }
        self.curr_loc_min = 0;
        self.ael_first = None;
        self.sel_first = None;
    }

    #[inline]
    fn insert_scanline(&mut self, y: i64) {
        self.scanlines.push(y);
    }

    fn pop_scanline(&mut self) -> Option<i64> {
        let y = self.scanlines.pop()?;
        while self.scanlines.peek() == Some(&y) {
            self.scanlines.pop();
        }
        Some(y)
    }

    // ------------------------------------------------------------------
    // Active edge helpers
    // ------------------------------------------------------------------

    #[inline]
    pub(crate) fn is_open(&self, e: usize) -> bool {
        self.minima[self.actives[e].local_min].is_open
    }

    #[inline]
    fn is_open_end_vertex(&self, v: usize) -> bool {
        self.vertices[v].is_open_start() || self.vertices[v].is_open_end()
    }

    #[inline]
    pub(crate) fn is_open_end(&self, e: usize) -> bool {
        self.is_open(e) && self.is_open_end_vertex(self.actives[e].vertex_top)
    }

    #[inline]
    pub(crate) fn polytype(&self, e: usize) -> PathType {
        self.minima[self.actives[e].local_min].polytype
    }

    #[inline]
    fn is_same_polytype(&self, e1: usize, e2: usize) -> bool {
        self.polytype(e1) == self.polytype(e2)
    }

    #[inline]
    pub(crate) fn is_hot(&self, e: usize) -> bool {
        self.actives[e].outrec.is_some()
    }

    #[inline]
    pub(crate) fn is_horizontal(&self, e: usize) -> bool {
        self.actives[e].top.y == self.actives[e].bot.y
    }

    #[inline]
    fn is_heading_right_horz(&self, e: usize) -> bool {
        self.actives[e].dx == f64::NEG_INFINITY
    }

    #[inline]
    pub(crate) fn is_heading_left_horz(&self, e: usize) -> bool {
        self.actives[e].dx == f64::INFINITY
    }

    #[inline]
    fn is_maxima(&self, e: usize) -> bool {
        self.vertices[self.actives[e].vertex_top].is_local_max()
    }

    #[inline]
    pub(crate) fn next_vertex_id(&self, e: usize) -> usize {
        let vt = self.actives[e].vertex_top;
        if self.actives[e].wind_dx > 0 {
            self.vertices[vt].next
        } else {
            self.vertices[vt].prev
        }
    }

    #[inline]
    fn prev_prev_vertex_pt(&self, e: usize) -> Point64 {
        let vt = self.actives[e].vertex_top;
        let id = if self.actives[e].wind_dx > 0 {
            self.vertices[self.vertices[vt].prev].prev
        } else {
            self.vertices[self.vertices[vt].next].next
        };
        self.vertices[id].pt
    }

    pub(crate) fn top_x(&self, e: usize, current_y: i64) -> i64 {
        let a = &self.actives[e];
        if current_y == a.top.y || a.top.x == a.bot.x {
            a.top.x
        } else if current_y == a.bot.y {
            a.bot.x
        } else {
            a.bot.x + (a.dx * (current_y - a.bot.y) as f64).round_ties_even() as i64
        }
    }

    fn get_maxima_pair(&self, e: usize) -> Option<usize> {
        let vt = self.actives[e].vertex_top;
        let mut ae = self.actives[e].next_in_ael;
        while let Some(a) = ae {
            if self.actives[a].vertex_top == vt {
                return Some(a);
            }
            ae = self.actives[a].next_in_ael;
        }
        None
    }

    fn push_active(&mut self, local_min: usize, wind_dx: i32) -> usize {
        let v = self.minima[local_min].vertex;
        let vtop = if wind_dx > 0 {
            self.vertices[v].next
        } else {
            self.vertices[v].prev
        };
        let bot = self.vertices[v].pt;
        let top = self.vertices[vtop].pt;
        let id = self.actives.len();
        self.actives.push(Active {
            bot,
            top,
            cur_x: bot.x,
            dx: edge_dx(bot, top),
            wind_dx,
            wind_cnt: 0,
            wind_cnt2: 0,
            outrec: None,
            prev_in_ael: None,
            next_in_ael: None,
            prev_in_sel: None,
            next_in_sel: None,
            jump: None,
            vertex_top: vtop,
            local_min,
            is_left_bound: false,
        });
        id
    }

    fn delete_from_ael(&mut self, e: usize) {
        let prev = self.actives[e].prev_in_ael;
        let next = self.actives[e].next_in_ael;
        if prev.is_none() && next.is_none() && self.ael_first != Some(e) {
            return; // already removed
        }
        match prev {
            Some(p) => self.actives[p].next_in_ael = next,
            None => self.ael_first = next,
        }
        if let Some(n) = next {
            self.actives[n].prev_in_ael = prev;
        }
        self.actives[e].prev_in_ael = None;
        self.actives[e].next_in_ael = None;
    }

    /// Swaps two AEL-adjacent edges, in either adjacency orientation.
    pub(crate) fn swap_positions_in_ael(&mut self, e1: usize, e2: usize) {
        let (l, r) = if self.actives[e1].next_in_ael == Some(e2) {
            (e1, e2)
        } else if self.actives[e2].next_in_ael == Some(e1) {
            (e2, e1)
        } else {
            self.fail("attempted swap of non-adjacent active edges");
            return;
        };
        let prev = self.actives[l].prev_in_ael;
        let next = self.actives[r].next_in_ael;
        if let Some(p) = prev {
            self.actives[p].next_in_ael = Some(r);
        }
        if let Some(n) = next {
            self.actives[n].prev_in_ael = Some(l);
        }
        self.actives[r].prev_in_ael = prev;
        self.actives[r].next_in_ael = Some(l);
        self.actives[l].prev_in_ael = Some(r);
        self.actives[l].next_in_ael = next;
        if prev.is_none() {
            self.ael_first = Some(r);
        }
    }

    fn push_horz(&mut self, e: usize) {
        self.actives[e].next_in_sel = self.sel_first;
        self.sel_first = Some(e);
    }

    fn pop_horz(&mut self) -> Option<usize> {
        let e = self.sel_first?;
        self.sel_first = self.actives[e].next_in_sel;
        Some(e)
    }

    // ------------------------------------------------------------------
    // AEL insertion order
    // ------------------------------------------------------------------

    /// Decides whether `newcomer` may sit immediately to the right of
    /// `resident` at the current scanline.
    fn is_valid_ael_order(&self, resident: usize, newcomer: usize) -> bool {
        let r = &self.actives[resident];
        let n = &self.actives[newcomer];
        if n.cur_x != r.cur_x {
            return n.cur_x > r.cur_x;
        }
        let d = cross_product(r.top, n.bot, n.top);
        if d != 0 {
            return d < 0;
        }

        // Edges are collinear at the insertion point. Rank edges that have
        // yet to turn by the direction they are about to turn.
        if !self.is_maxima(resident) && r.top.y > n.top.y {
            return cross_product(
                n.bot,
                r.top,
                self.vertices[self.next_vertex_id(resident)].pt,
            ) <= 0;
        }
        if !self.is_maxima(newcomer) && n.top.y > r.top.y {
            return cross_product(
                n.bot,
                n.top,
                self.vertices[self.next_vertex_id(newcomer)].pt,
            ) >= 0;
        }

        let y = n.bot.y;
        let newcomer_is_left = n.is_left_bound;
        if r.bot.y != y || self.vertices[self.minima[r.local_min].vertex].pt.y != y {
            return newcomer_is_left;
        }
        // resident must also have just been inserted at this minimum
        if r.is_left_bound != newcomer_is_left {
            return newcomer_is_left;
        }
        if cross_product(self.prev_prev_vertex_pt(resident), r.bot, r.top) == 0 {
            return true;
        }
        // compare turning direction of the alternate bounds
        (cross_product(
            self.prev_prev_vertex_pt(resident),
            n.bot,
            self.prev_prev_vertex_pt(newcomer),
        ) > 0)
            == newcomer_is_left
    }

    fn insert_left_edge(&mut self, e: usize) {
        match self.ael_first {
            None => {
                self.actives[e].prev_in_ael = None;
                self.actives[e].next_in_ael = None;
                self.ael_first = Some(e);
            }
            Some(first) if !self.is_valid_ael_order(first, e) => {
                self.actives[e].prev_in_ael = None;
                self.actives[e].next_in_ael = Some(first);
                self.actives[first].prev_in_ael = Some(e);
                self.ael_first = Some(e);
            }
            Some(first) => {
                let mut cur = first;
                while let Some(next) = self.actives[cur].next_in_ael {
                    if !self.is_valid_ael_order(next, e) {
                        break;
                    }
                    cur = next;
                }
                let next = self.actives[cur].next_in_ael;
                self.actives[e].next_in_ael = next;
                if let Some(n) = next {
                    self.actives[n].prev_in_ael = Some(e);
                }
                self.actives[e].prev_in_ael = Some(cur);
                self.actives[cur].next_in_ael = Some(e);
            }
        }
    }

    fn insert_right_edge(&mut self, left: usize, right: usize) {
        let next = self.actives[left].next_in_ael;
        self.actives[right].next_in_ael = next;
        if let Some(n) = next {
            self.actives[n].prev_in_ael = Some(right);
        }
        self.actives[right].prev_in_ael = Some(left);
        self.actives[left].next_in_ael = Some(right);
    }

    // ------------------------------------------------------------------
    // Winding counts and contribution
    // ------------------------------------------------------------------

    fn set_wind_count_closed(&mut self, e: usize) {
        let pt = self.polytype(e);

        // find the nearest closed edge of the same path type to the left
        let mut anchor = self.actives[e].prev_in_ael;
        while let Some(a) = anchor {
            if self.polytype(a) == pt && !self.is_open(a) {
                break;
            }
            anchor = self.actives[a].prev_in_ael;
        }

        let mut cursor;
        match anchor {
            None => {
                self.actives[e].wind_cnt = self.actives[e].wind_dx;
                cursor = self.ael_first;
            }
            Some(a) if self.fill_rule == FillRule::EvenOdd => {
                self.actives[e].wind_cnt = self.actives[e].wind_dx;
                self.actives[e].wind_cnt2 = self.actives[a].wind_cnt2;
                cursor = self.actives[a].next_in_ael;
            }
            Some(a) => {
                // Adjacent regions differ by exactly one winding; a reversal
                // of direction reuses the neighbour's count.
                let a_cnt = self.actives[a].wind_cnt;
                let a_dx = self.actives[a].wind_dx;
                let e_dx = self.actives[e].wind_dx;
                let wind_cnt = if a_cnt * a_dx < 0 {
                    // neighbour winds against its own count: `e` is outside it
                    if a_cnt.abs() > 1 {
                        if a_dx * e_dx < 0 {
                            a_cnt
                        } else {
                            a_cnt + e_dx
                        }
                    } else if self.is_open(e) {
                        1
                    } else {
                        e_dx
                    }
                } else {
                    // `e` is inside the neighbour's region
                    if a_dx * e_dx < 0 {
                        a_cnt
                    } else {
                        a_cnt + e_dx
                    }
                };
                self.actives[e].wind_cnt = wind_cnt;
                self.actives[e].wind_cnt2 = self.actives[a].wind_cnt2;
                cursor = self.actives[a].next_in_ael;
            }
        }

        // accumulate the opposite path type's winding up to `e`
        if self.fill_rule == FillRule::EvenOdd {
            while cursor != Some(e) {
                let a = cursor.expect("edge must be reachable in the active list");
                if self.polytype(a) != pt && !self.is_open(a) {
                    self.actives[e].wind_cnt2 = i32::from(self.actives[e].wind_cnt2 == 0);
                }
                cursor = self.actives[a].next_in_ael;
            }
        } else {
            while cursor != Some(e) {
                let a = cursor.expect("edge must be reachable in the active list");
                if self.polytype(a) != pt && !self.is_open(a) {
                    self.actives[e].wind_cnt2 += self.actives[a].wind_dx;
                }
                cursor = self.actives[a].next_in_ael;
            }
        }
    }

    fn set_wind_count_open(&mut self, e: usize) {
        let mut cursor = self.ael_first;
        if self.fill_rule == FillRule::EvenOdd {
            let mut cnt1 = 0;
            let mut cnt2 = 0;
            while cursor != Some(e) {
                let a = cursor.expect("edge must be reachable in the active list");
                if self.polytype(a) == PathType::Clip {
                    cnt2 += 1;
                } else if !self.is_open(a) {
                    cnt1 += 1;
                }
                cursor = self.actives[a].next_in_ael;
            }
            self.actives[e].wind_cnt = cnt1 & 1;
            self.actives[e].wind_cnt2 = cnt2 & 1;
        } else {
            let mut cnt1 = 0;
            let mut cnt2 = 0;
            while cursor != Some(e) {
                let a = cursor.expect("edge must be reachable in the active list");
                if self.polytype(a) == PathType::Clip {
                    cnt2 += self.actives[a].wind_dx;
                } else if !self.is_open(a) {
                    cnt1 += self.actives[a].wind_dx;
                }
                cursor = self.actives[a].next_in_ael;
            }
            self.actives[e].wind_cnt = cnt1;
            self.actives[e].wind_cnt2 = cnt2;
        }
    }

    fn is_contributing_closed(&self, e: usize) -> bool {
        let a = &self.actives[e];
        match self.fill_rule {
            FillRule::Positive => {
                if a.wind_cnt != 1 {
                    return false;
                }
            }
            FillRule::Negative => {
                if a.wind_cnt != -1 {
                    return false;
                }
            }
            FillRule::NonZero => {
                if a.wind_cnt.abs() != 1 {
                    return false;
                }
            }
            FillRule::EvenOdd => {}
        }
        match self.clip_type {
            ClipType::Intersection => match self.fill_rule {
                FillRule::Positive => a.wind_cnt2 > 0,
                FillRule::Negative => a.wind_cnt2 < 0,
                _ => a.wind_cnt2 != 0,
            },
            ClipType::Union => match self.fill_rule {
                FillRule::Positive => a.wind_cnt2 <= 0,
                FillRule::Negative => a.wind_cnt2 >= 0,
                _ => a.wind_cnt2 == 0,
            },
            ClipType::Difference => {
                let outside_clip = match self.fill_rule {
                    FillRule::Positive => a.wind_cnt2 <= 0,
                    FillRule::Negative => a.wind_cnt2 >= 0,
                    _ => a.wind_cnt2 == 0,
                };
                if self.polytype(e) == PathType::Subject {
                    outside_clip
                } else {
                    !outside_clip
                }
            }
            ClipType::Xor => true,
            ClipType::None => false,
        }
    }

    fn is_contributing_open(&self, e: usize) -> bool {
        let a = &self.actives[e];
        let (in_subj, in_clip) = match self.fill_rule {
            FillRule::Positive => (a.wind_cnt > 0, a.wind_cnt2 > 0),
            FillRule::Negative => (a.wind_cnt < 0, a.wind_cnt2 < 0),
            _ => (a.wind_cnt != 0, a.wind_cnt2 != 0),
        };
        match self.clip_type {
            ClipType::Intersection => in_clip,
            ClipType::Union => !in_subj && !in_clip,
            _ => !in_clip,
        }
    }

    // ------------------------------------------------------------------
    // Local minima insertion
    // ------------------------------------------------------------------

    #[inline]
    fn has_loc_min_at_y(&self, y: i64) -> bool {
        self.curr_loc_min < self.minima.len()
            && self.vertices[self.minima[self.curr_loc_min].vertex].pt.y == y
    }

    fn insert_local_minima_into_ael(&mut self, bot_y: i64) {
        while self.has_loc_min_at_y(bot_y) {
            let lm_idx = self.curr_loc_min;
            self.curr_loc_min += 1;
            let lm_vertex = self.minima[lm_idx].vertex;
            let lm_is_open = self.minima[lm_idx].is_open;

            // the descending bound heads into the previous vertices, the
            // ascending bound into the next
            let mut left = if self.vertices[lm_vertex].is_open_start() {
                None
            } else {
                Some(self.push_active(lm_idx, -1))
            };
            let mut right = if self.vertices[lm_vertex].is_open_end() {
                None
            } else {
                Some(self.push_active(lm_idx, 1))
            };

            if let (Some(l), Some(r)) = (left, right) {
                if self.is_horizontal(l) {
                    if self.is_heading_right_horz(l) {
                        std::mem::swap(&mut left, &mut right);
                    }
                } else if self.is_horizontal(r) {
                    if self.is_heading_left_horz(r) {
                        std::mem::swap(&mut left, &mut right);
                    }
                } else if self.actives[l].dx < self.actives[r].dx {
                    std::mem::swap(&mut left, &mut right);
                }
            } else if left.is_none() {
                left = right.take();
            }

            let Some(left) = left else { continue };
            self.actives[left].is_left_bound = true;
            self.insert_left_edge(left);

            let contributing = if lm_is_open {
                self.set_wind_count_open(left);
                self.is_contributing_open(left)
            } else {
                self.set_wind_count_closed(left);
                self.is_contributing_closed(left)
            };

            if let Some(right) = right {
                self.actives[right].wind_cnt = self.actives[left].wind_cnt;
                self.actives[right].wind_cnt2 = self.actives[left].wind_cnt2;
                self.insert_right_edge(left, right);

                if contributing {
                    let bot = self.actives[left].bot;
                    self.add_local_min_poly(left, right, bot, true);
                    if !self.is_horizontal(left) && self.test_join_with_prev1(left) {
                        let prev = self.actives[left].prev_in_ael
                            .expect("join test guarantees a previous edge");
                        let op1 = self.add_out_pt(prev, bot);
                        let op2 = self.out_recs[self.actives[left].outrec
                            .expect("contributing edge owns a ring")]
                        .pts
                        .expect("fresh ring has a point");
                        self.add_join(op1, op2);
                    }
                }

                // repair any ordering violations introduced to the right
                while let Some(next) = self.actives[right].next_in_ael {
                    if !self.is_valid_ael_order(next, right) {
                        break;
                    }
                    let bot = self.actives[right].bot;
                    self.intersect_edges(right, next, bot);
                    self.swap_positions_in_ael(right, next);
                }

                if !self.is_horizontal(right) && self.test_join_with_next1(right) {
                    let next = self.actives[right].next_in_ael
                        .expect("join test guarantees a next edge");
                    let bot = self.actives[right].bot;
                    let op1 = self.add_out_pt(right, bot);
                    let op2 = self.add_out_pt(next, bot);
                    self.add_join(op1, op2);
                }

                if self.is_horizontal(right) {
                    self.push_horz(right);
                } else {
                    self.insert_scanline(self.actives[right].top.y);
                }
            } else if contributing {
                let bot = self.actives[left].bot;
                self.start_open_path(left, bot);
            }

            if self.is_horizontal(left) {
                self.push_horz(left);
            } else {
                self.insert_scanline(self.actives[left].top.y);
            }
        }
    }

    // ------------------------------------------------------------------
    // Join predicates
    // ------------------------------------------------------------------

    fn test_join_with_prev1(&self, e: usize) -> bool {
        if !self.is_hot(e) || self.is_open(e) {
            return false;
        }
        let Some(prev) = self.actives[e].prev_in_ael else {
            return false;
        };
        self.actives[prev].cur_x == self.actives[e].cur_x
            && self.is_hot(prev)
            && !self.is_open(prev)
            && cross_product(
                self.actives[prev].top,
                self.actives[e].bot,
                self.actives[e].top,
            ) == 0
    }

    fn test_join_with_next1(&self, e: usize) -> bool {
        if !self.is_hot(e) || self.is_open(e) {
            return false;
        }
        let Some(next) = self.actives[e].next_in_ael else {
            return false;
        };
        self.actives[next].cur_x == self.actives[e].cur_x
            && self.is_hot(next)
            && !self.is_open(next)
            && cross_product(
                self.actives[next].top,
                self.actives[e].bot,
                self.actives[e].top,
            ) == 0
    }

    fn test_join_with_prev2(&self, e: usize, curr_pt: Point64) -> bool {
        if !self.is_hot(e) || self.is_open(e) {
            return false;
        }
        let Some(prev) = self.actives[e].prev_in_ael else {
            return false;
        };
        !self.is_open(prev)
            && self.is_hot(prev)
            && self.actives[prev].top.y < self.actives[e].bot.y
            && (self.top_x(prev, curr_pt.y) - curr_pt.x).abs() < 2
            && cross_product(self.actives[prev].top, curr_pt, self.actives[e].top) == 0
    }

    fn test_join_with_next2(&self, e: usize, curr_pt: Point64) -> bool {
        if !self.is_hot(e) || self.is_open(e) {
            return false;
        }
        let Some(next) = self.actives[e].next_in_ael else {
            return false;
        };
        !self.is_open(next)
            && self.is_hot(next)
            && self.actives[next].top.y < self.actives[e].bot.y
            && (self.top_x(next, curr_pt.y) - curr_pt.x).abs() < 2
            && cross_product(self.actives[next].top, curr_pt, self.actives[e].top) == 0
    }

    // ------------------------------------------------------------------
    // Edge intersection
    // ------------------------------------------------------------------

    #[cfg(feature = "z")]
    fn stamp_z(&mut self, e1: usize, e2: usize, mut pt: Point64) -> Point64 {
        let Some(cb) = self.z_callback.as_mut() else {
            return pt;
        };
        let (b1, t1) = (self.actives[e1].bot, self.actives[e1].top);
        let (b2, t2) = (self.actives[e2].bot, self.actives[e2].top);
        // prefer subject vertices, and pass subject endpoints first
        let subject_first = self.minima[self.actives[e1].local_min].polytype == PathType::Subject;
        let (pb1, pt1, pb2, pt2) = if subject_first {
            (b1, t1, b2, t2)
        } else {
            (b2, t2, b1, t1)
        };
        if pt == pb1 {
            pt.z = pb1.z;
        } else if pt == pt1 {
            pt.z = pt1.z;
        } else if pt == pb2 {
            pt.z = pb2.z;
        } else if pt == pt2 {
            pt.z = pt2.z;
        } else {
            cb(pb1, pt1, pb2, pt2, &mut pt);
        }
        pt
    }

    fn find_edge_with_matching_loc_min(&self, e: usize) -> Option<usize> {
        let lm = self.actives[e].local_min;
        let mut ae = self.actives[e].next_in_ael;
        while let Some(a) = ae {
            if self.actives[a].local_min == lm {
                return Some(a);
            }
            if !self.is_horizontal(a) && self.actives[e].bot != self.actives[a].bot {
                break;
            }
            ae = self.actives[a].next_in_ael;
        }
        let mut ae = self.actives[e].prev_in_ael;
        while let Some(a) = ae {
            if self.actives[a].local_min == lm {
                return Some(a);
            }
            if !self.is_horizontal(a) && self.actives[e].bot != self.actives[a].bot {
                return None;
            }
            ae = self.actives[a].prev_in_ael;
        }
        None
    }

    /// Processes the meeting of two AEL-adjacent edges at `pt`, updating
    /// winding counts and emitting output points as dictated by the active
    /// operation. Returns the output point created, if any.
    pub(crate) fn intersect_edges(
        &mut self,
        e1: usize,
        e2: usize,
        pt: Point64,
    ) -> Option<usize> {
        let mut ae1 = e1;
        let mut ae2 = e2;
        #[cfg(feature = "z")]
        let pt = self.stamp_z(ae1, ae2, pt);

        // open paths short-circuit: an open edge toggles against the closed
        // region it crosses
        if self.has_open_paths && (self.is_open(ae1) || self.is_open(ae2)) {
            if self.is_open(ae1) && self.is_open(ae2) {
                return None;
            }
            if self.is_open(ae2) {
                std::mem::swap(&mut ae1, &mut ae2);
            }
            match self.clip_type {
                ClipType::Union => {
                    if !self.is_hot(ae2) {
                        return None;
                    }
                }
                _ => {
                    if self.polytype(ae2) == PathType::Subject {
                        return None;
                    }
                }
            }
            match self.fill_rule {
                FillRule::Positive => {
                    if self.actives[ae2].wind_cnt != 1 {
                        return None;
                    }
                }
                FillRule::Negative => {
                    if self.actives[ae2].wind_cnt != -1 {
                        return None;
                    }
                }
                _ => {
                    if self.actives[ae2].wind_cnt.abs() != 1 {
                        return None;
                    }
                }
            }

            if self.is_hot(ae1) {
                let op = self.add_out_pt(ae1, pt);
                let or_id = self.actives[ae1].outrec.expect("hot edge owns a ring");
                if self.is_front(ae1) {
                    self.out_recs[or_id].front_edge = None;
                } else {
                    self.out_recs[or_id].back_edge = None;
                }
                self.actives[ae1].outrec = None;
                return Some(op);
            }

            // horizontal closed edges may pass under an open path right at
            // its local minimum; reconnect to the other side if it's hot
            let lm_vertex = self.minima[self.actives[ae1].local_min].vertex;
            if pt == self.vertices[lm_vertex].pt && !self.is_open_end_vertex(lm_vertex) {
                if let Some(ae3) = self.find_edge_with_matching_loc_min(ae1) {
                    if self.is_hot(ae3) {
                        let or3 = self.actives[ae3].outrec.expect("hot edge owns a ring");
                        self.actives[ae1].outrec = Some(or3);
                        if self.actives[ae1].wind_dx > 0 {
                            self.set_sides(or3, ae1, ae3);
                        } else {
                            self.set_sides(or3, ae3, ae1);
                        }
                        return None;
                    }
                }
            }
            return Some(self.start_open_path(ae1, pt));
        }

        // update winding counts (both edges are closed)
        if self.is_same_polytype(ae1, ae2) {
            if self.fill_rule == FillRule::EvenOdd {
                let tmp = self.actives[ae1].wind_cnt;
                self.actives[ae1].wind_cnt = self.actives[ae2].wind_cnt;
                self.actives[ae2].wind_cnt = tmp;
            } else {
                let dx2 = self.actives[ae2].wind_dx;
                let dx1 = self.actives[ae1].wind_dx;
                // a count may never collapse to zero on a live boundary;
                // crossing one's own reversal flips the sign instead
                if self.actives[ae1].wind_cnt + dx2 == 0 {
                    self.actives[ae1].wind_cnt = -self.actives[ae1].wind_cnt;
                } else {
                    self.actives[ae1].wind_cnt += dx2;
                }
                if self.actives[ae2].wind_cnt - dx1 == 0 {
                    self.actives[ae2].wind_cnt = -self.actives[ae2].wind_cnt;
                } else {
                    self.actives[ae2].wind_cnt -= dx1;
                }
            }
        } else if self.fill_rule != FillRule::EvenOdd {
            self.actives[ae1].wind_cnt2 += self.actives[ae2].wind_dx;
            self.actives[ae2].wind_cnt2 -= self.actives[ae1].wind_dx;
        } else {
            self.actives[ae1].wind_cnt2 = i32::from(self.actives[ae1].wind_cnt2 == 0);
            self.actives[ae2].wind_cnt2 = i32::from(self.actives[ae2].wind_cnt2 == 0);
        }

        let (old_e1, old_e2) = match self.fill_rule {
            FillRule::Positive => (self.actives[ae1].wind_cnt, self.actives[ae2].wind_cnt),
            FillRule::Negative => (-self.actives[ae1].wind_cnt, -self.actives[ae2].wind_cnt),
            _ => (
                self.actives[ae1].wind_cnt.abs(),
                self.actives[ae2].wind_cnt.abs(),
            ),
        };
        let e1_wc_01 = old_e1 == 0 || old_e1 == 1;
        let e2_wc_01 = old_e2 == 0 || old_e2 == 1;
        if (!self.is_hot(ae1) && !e1_wc_01) || (!self.is_hot(ae2) && !e2_wc_01) {
            return None;
        }

        if self.is_hot(ae1) && self.is_hot(ae2) {
            if !e1_wc_01
                || !e2_wc_01
                || (!self.is_same_polytype(ae1, ae2) && self.clip_type != ClipType::Xor)
            {
                self.add_local_max_poly(ae1, ae2, pt)
            } else if self.is_front(ae1) || self.actives[ae1].outrec == self.actives[ae2].outrec {
                // rings that only touch at a vertex: close and reopen so they
                // separate cleanly
                let result = self.add_local_max_poly(ae1, ae2, pt);
                let op2 = self.add_local_min_poly(ae1, ae2, pt, false);
                if let Some(r) = result {
                    if self.out_pts[r].pt == self.out_pts[op2].pt
                        && !self.is_horizontal(ae1)
                        && !self.is_horizontal(ae2)
                        && cross_product(
                            self.actives[ae1].bot,
                            self.out_pts[r].pt,
                            self.actives[ae2].bot,
                        ) == 0
                    {
                        self.add_join(r, op2);
                    }
                }
                result
            } else {
                let result = self.add_out_pt(ae1, pt);
                self.add_out_pt(ae2, pt);
                self.swap_outrecs(ae1, ae2);
                Some(result)
            }
        } else if self.is_hot(ae1) {
            let result = self.add_out_pt(ae1, pt);
            self.swap_outrecs(ae1, ae2);
            Some(result)
        } else if self.is_hot(ae2) {
            let result = self.add_out_pt(ae2, pt);
            self.swap_outrecs(ae1, ae2);
            Some(result)
        } else {
            // neither edge is hot; a new ring may start here
            let (e1_wc2, e2_wc2) = match self.fill_rule {
                FillRule::Positive => {
                    (self.actives[ae1].wind_cnt2, self.actives[ae2].wind_cnt2)
                }
                FillRule::Negative => {
                    (-self.actives[ae1].wind_cnt2, -self.actives[ae2].wind_cnt2)
                }
                _ => (
                    self.actives[ae1].wind_cnt2.abs(),
                    self.actives[ae2].wind_cnt2.abs(),
                ),
            };
            if !self.is_same_polytype(ae1, ae2) {
                Some(self.add_local_min_poly(ae1, ae2, pt, false))
            } else if old_e1 == 1 && old_e2 == 1 {
                match self.clip_type {
                    ClipType::Union => {
                        if e1_wc2 > 0 && e2_wc2 > 0 {
                            None
                        } else {
                            Some(self.add_local_min_poly(ae1, ae2, pt, false))
                        }
                    }
                    ClipType::Difference => {
                        if (self.polytype(ae1) == PathType::Clip && e1_wc2 > 0 && e2_wc2 > 0)
                            || (self.polytype(ae1) == PathType::Subject
                                && e1_wc2 <= 0
                                && e2_wc2 <= 0)
                        {
                            Some(self.add_local_min_poly(ae1, ae2, pt, false))
                        } else {
                            None
                        }
                    }
                    ClipType::Xor => Some(self.add_local_min_poly(ae1, ae2, pt, false)),
                    ClipType::Intersection => {
                        if e1_wc2 > 0 && e2_wc2 > 0 {
                            Some(self.add_local_min_poly(ae1, ae2, pt, false))
                        } else {
                            None
                        }
                    }
                    ClipType::None => None,
                }
            } else {
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Top of scanbeam
    // ------------------------------------------------------------------

    fn update_edge_into_ael(&mut self, e: usize) {
        let nv = self.next_vertex_id(e);
        let nv_pt = self.vertices[nv].pt;
        {
            let a = &mut self.actives[e];
            a.bot = a.top;
            a.vertex_top = nv;
            a.top = nv_pt;
            a.cur_x = a.bot.x;
            a.dx = edge_dx(a.bot, a.top);
        }
        if self.is_horizontal(e) {
            return;
        }
        self.insert_scanline(self.actives[e].top.y);
        if self.test_join_with_prev1(e) {
            let prev = self.actives[e].prev_in_ael.expect("join test guarantees a previous edge");
            let bot = self.actives[e].bot;
            let op1 = self.add_out_pt(prev, bot);
            let op2 = self.add_out_pt(e, bot);
            self.add_join(op1, op2);
        }
    }

    fn do_top_of_scanbeam(&mut self, y: i64) {
        self.sel_first = None; // the SEL doubles as the horizontal stack
        let mut ae = self.ael_first;
        while let Some(e) = ae {
            if self.actives[e].top.y == y {
                self.actives[e].cur_x = self.actives[e].top.x;
                if self.is_maxima(e) {
                    ae = self.do_maxima(e);
                    continue;
                }
                if self.is_hot(e) {
                    let t = self.actives[e].top;
                    self.add_out_pt(e, t);
                }
                self.update_edge_into_ael(e);
                if self.is_horizontal(e) {
                    self.push_horz(e);
                }
            } else {
                self.actives[e].cur_x = self.top_x(e, y);
            }
            ae = self.actives[e].next_in_ael;
        }
    }

    fn do_maxima(&mut self, e: usize) -> Option<usize> {
        let prev = self.actives[e].prev_in_ael;
        let next = self.actives[e].next_in_ael;

        if self.is_open_end(e) {
            if self.is_hot(e) {
                let t = self.actives[e].top;
                self.add_out_pt(e, t);
            }
            if !self.is_horizontal(e) {
                if self.is_hot(e) {
                    let or_id = self.actives[e].outrec.expect("hot edge owns a ring");
                    if self.is_front(e) {
                        self.out_recs[or_id].front_edge = None;
                    } else {
                        self.out_recs[or_id].back_edge = None;
                    }
                    self.actives[e].outrec = None;
                }
                self.delete_from_ael(e);
            }
            return next;
        }

        let Some(max_pair) = self.get_maxima_pair(e) else {
            return next; // the pair is a horizontal still to come
        };

        // resolve every edge sandwiched between the maxima pair
        let mut between = self.actives[e].next_in_ael;
        while let Some(a) = between {
            if a == max_pair {
                break;
            }
            let t = self.actives[e].top;
            self.intersect_edges(e, a, t);
            self.swap_positions_in_ael(e, a);
            between = self.actives[e].next_in_ael;
        }

        if self.is_open(e) {
            if self.is_hot(e) {
                let t = self.actives[e].top;
                self.add_local_max_poly(e, max_pair, t);
            }
            self.delete_from_ael(max_pair);
            self.delete_from_ael(e);
        } else {
            if self.is_hot(e) {
                let t = self.actives[e].top;
                self.add_local_max_poly(e, max_pair, t);
            }
            self.delete_from_ael(e);
            self.delete_from_ael(max_pair);
        }
        match prev {
            Some(p) => self.actives[p].next_in_ael,
            None => self.ael_first,
        }
    }

    // ------------------------------------------------------------------
    // Horizontal edges
    // ------------------------------------------------------------------

    fn get_curr_y_maxima_vertex(&self, e: usize) -> Option<usize> {
        let mut v = self.actives[e].vertex_top;
        let y = self.vertices[v].pt.y;
        if self.actives[e].wind_dx > 0 {
            while self.vertices[self.vertices[v].next].pt.y == y {
                v = self.vertices[v].next;
            }
        } else {
            while self.vertices[self.vertices[v].prev].pt.y == y {
                v = self.vertices[v].prev;
            }
        }
        if self.vertices[v].is_local_max() {
            Some(v)
        } else {
            None
        }
    }

    fn get_curr_y_maxima_vertex_open(&self, e: usize) -> Option<usize> {
        let mut v = self.actives[e].vertex_top;
        let y = self.vertices[v].pt.y;
        if self.actives[e].wind_dx > 0 {
            while self.vertices[self.vertices[v].next].pt.y == y
                && !self.vertices[v].is_open_end()
                && !self.vertices[v].is_local_max()
            {
                v = self.vertices[v].next;
            }
        } else {
            while self.vertices[self.vertices[v].prev].pt.y == y
                && !self.vertices[v].is_open_end()
                && !self.vertices[v].is_local_max()
            {
                v = self.vertices[v].prev;
            }
        }
        if self.vertices[v].is_local_max() {
            Some(v)
        } else {
            None
        }
    }

    fn trim_horz(&mut self, e: usize, preserve_collinear: bool) {
        let mut was_trimmed = false;
        let mut pt = self.vertices[self.next_vertex_id(e)].pt;
        while pt.y == self.actives[e].top.y {
            // spikes that double back are always trimmed, continuations only
            // when collinear points are not being preserved
            if preserve_collinear
                && (pt.x < self.actives[e].top.x) != (self.actives[e].bot.x < self.actives[e].top.x)
            {
                break;
            }
            self.actives[e].vertex_top = self.next_vertex_id(e);
            self.actives[e].top = pt;
            was_trimmed = true;
            if self.is_maxima(e) {
                break;
            }
            pt = self.vertices[self.next_vertex_id(e)].pt;
        }
        if was_trimmed {
            let a = &mut self.actives[e];
            a.dx = edge_dx(a.bot, a.top);
        }
    }

    fn horz_is_spike(&self, e: usize) -> bool {
        let next_pt = self.vertices[self.next_vertex_id(e)].pt;
        let a = &self.actives[e];
        (a.bot.x < a.top.x) != (a.top.x < next_pt.x)
    }

    fn reset_horz_direction(&self, horz: usize, vertex_max: Option<usize>) -> (bool, i64, i64) {
        let a = &self.actives[horz];
        if a.bot.x == a.top.x {
            // not moving horizontally; direction is whichever side the
            // maxima pair is on
            let x = a.cur_x;
            let mut ae = a.next_in_ael;
            while let Some(n) = ae {
                if vertex_max == Some(self.actives[n].vertex_top) {
                    break;
                }
                ae = self.actives[n].next_in_ael;
            }
            (ae.is_some(), x, x)
        } else if a.cur_x < a.top.x {
            (true, a.cur_x, a.top.x)
        } else {
            (false, a.top.x, a.cur_x)
        }
    }

    fn get_horz_maxima_pair(&self, horz: usize, max_vert: usize) -> Option<usize> {
        // the pair of a horizontal maxima may sit on either side in the AEL
        let mx = self.vertices[max_vert].pt.x;
        let mut ae = self.actives[horz].prev_in_ael;
        while let Some(a) = ae {
            if self.actives[a].cur_x < mx {
                break;
            }
            if self.actives[a].vertex_top == max_vert {
                return Some(a);
            }
            ae = self.actives[a].prev_in_ael;
        }
        let mut ae = self.actives[horz].next_in_ael;
        while let Some(a) = ae {
            if self.top_x(a, self.actives[horz].top.y) > mx {
                break;
            }
            if self.actives[a].vertex_top == max_vert {
                return Some(a);
            }
            ae = self.actives[a].next_in_ael;
        }
        None
    }

    fn do_horizontal(&mut self, horz: usize) {
        let horz_is_open = self.is_open(horz);
        let y = self.actives[horz].bot.y;

        let vertex_max = if horz_is_open {
            self.get_curr_y_maxima_vertex_open(horz)
        } else {
            self.get_curr_y_maxima_vertex(horz)
        };

        if let Some(vm) = vertex_max {
            if !horz_is_open && vm != self.actives[horz].vertex_top {
                self.trim_horz(horz, self.preserve_collinear);
            }
        }

        let (mut is_left_to_right, mut left_x, mut right_x) =
            self.reset_horz_direction(horz, vertex_max);

        if self.is_hot(horz) {
            let p = Point64::new(self.actives[horz].cur_x, y);
            self.add_out_pt(horz, p);
        }

        loop {
            let mut ae = if is_left_to_right {
                self.actives[horz].next_in_ael
            } else {
                self.actives[horz].prev_in_ael
            };
            while let Some(a) = ae {
                if vertex_max == Some(self.actives[a].vertex_top) {
                    // reached the horizontal's maxima pair
                    if self.is_hot(horz) {
                        while self.actives[horz].vertex_top != self.actives[a].vertex_top {
                            let t = self.actives[horz].top;
                            self.add_out_pt(horz, t);
                            self.update_edge_into_ael(horz);
                        }
                        let t = self.actives[horz].top;
                        let op = if is_left_to_right {
                            self.add_local_max_poly(horz, a, t)
                        } else {
                            self.add_local_max_poly(a, horz, t)
                        };
                        if let Some(op) = op {
                            if self.out_pts[op].pt == t {
                                self.add_trial_horz_join(op);
                            }
                        }
                    }
                    self.delete_from_ael(a);
                    self.delete_from_ael(horz);
                    return;
                }

                // unless this horizontal must run on to its maxima pair,
                // check the end-of-span break conditions
                if vertex_max != Some(self.actives[horz].vertex_top) || self.is_open_end(horz) {
                    if (is_left_to_right && self.actives[a].cur_x > right_x)
                        || (!is_left_to_right && self.actives[a].cur_x < left_x)
                    {
                        break;
                    }
                    if self.actives[a].cur_x == self.actives[horz].top.x
                        && !self.is_horizontal(a)
                    {
                        // an edge grazing the endpoint is only crossed when it
                        // slopes across the following segment's outbound path
                        let pt = self.vertices[self.next_vertex_id(horz)].pt;
                        let open_excluded = self.is_open(a)
                            && !self.is_same_polytype(a, horz)
                            && !self.is_hot(a);
                        if is_left_to_right {
                            if open_excluded {
                                if self.top_x(a, pt.y) > pt.x {
                                    break;
                                }
                            } else if self.top_x(a, pt.y) >= pt.x {
                                break;
                            }
                        } else if open_excluded {
                            if self.top_x(a, pt.y) < pt.x {
                                break;
                            }
                        } else if self.top_x(a, pt.y) <= pt.x {
                            break;
                        }
                    }
                }

                let pt = Point64::new(self.actives[a].cur_x, y);
                if is_left_to_right {
                    let op = self.intersect_edges(horz, a, pt);
                    self.swap_positions_in_ael(horz, a);
                    if self.is_hot(horz) && !self.is_open(horz) {
                        if let Some(op) = op {
                            if self.out_pts[op].pt == pt {
                                self.add_trial_horz_join(op);
                            }
                        }
                    }
                    if !self.is_horizontal(a) && self.test_join_with_prev1(horz) {
                        let prev = self.actives[horz].prev_in_ael
                            .expect("join test guarantees a previous edge");
                        let op1 = self.add_out_pt(prev, pt);
                        let op2 = self.add_out_pt(horz, pt);
                        self.add_join(op1, op2);
                    }
                    self.actives[horz].cur_x = self.actives[a].cur_x;
                    ae = self.actives[horz].next_in_ael;
                } else {
                    let op = self.intersect_edges(a, horz, pt);
                    self.swap_positions_in_ael(a, horz);
                    if self.is_hot(horz) && !self.is_open(horz) {
                        if let Some(op) = op {
                            if self.out_pts[op].pt == pt {
                                self.add_trial_horz_join(op);
                            }
                        }
                    }
                    if !self.is_horizontal(a) && self.test_join_with_next1(horz) {
                        let next = self.actives[horz].next_in_ael
                            .expect("join test guarantees a next edge");
                        let op1 = self.add_out_pt(horz, pt);
                        let op2 = self.add_out_pt(next, pt);
                        self.add_join(op1, op2);
                    }
                    self.actives[horz].cur_x = self.actives[a].cur_x;
                    ae = self.actives[horz].prev_in_ael;
                }
            }

            if horz_is_open && self.is_open_end(horz) {
                if self.is_hot(horz) {
                    let t = self.actives[horz].top;
                    self.add_out_pt(horz, t);
                    let or_id = self.actives[horz].outrec.expect("hot edge owns a ring");
                    if self.is_front(horz) {
                        self.out_recs[or_id].front_edge = None;
                    } else {
                        self.out_recs[or_id].back_edge = None;
                    }
                    self.actives[horz].outrec = None;
                }
                self.delete_from_ael(horz);
                return;
            }

            if self.vertices[self.next_vertex_id(horz)].pt.y != self.actives[horz].top.y {
                break;
            }

            // a consecutive horizontal segment follows
            if self.is_hot(horz) {
                let t = self.actives[horz].top;
                self.add_out_pt(horz, t);
            }
            self.update_edge_into_ael(horz);
            if self.preserve_collinear && !horz_is_open && self.horz_is_spike(horz) {
                self.trim_horz(horz, true);
            }
            let d = self.reset_horz_direction(horz, vertex_max);
            is_left_to_right = d.0;
            left_x = d.1;
            right_x = d.2;
        }

        // the horizontal ends within this scanline
        let op_end = if self.is_hot(horz) {
            let t = self.actives[horz].top;
            let op = self.add_out_pt(horz, t);
            if !horz_is_open {
                self.add_trial_horz_join(op);
            }
            Some(op)
        } else {
            None
        };

        if (horz_is_open && !self.is_open_end(horz))
            || (!horz_is_open && vertex_max != Some(self.actives[horz].vertex_top))
        {
            // an intermediate horizontal: the bound continues upward
            self.update_edge_into_ael(horz);
            if self.is_open(horz) {
                return;
            }
            if is_left_to_right && self.test_join_with_next1(horz) {
                let next = self.actives[horz].next_in_ael
                    .expect("join test guarantees a next edge");
                let bot = self.actives[horz].bot;
                let op2 = self.add_out_pt(next, bot);
                if let Some(op1) = op_end {
                    self.add_join(op1, op2);
                }
            } else if !is_left_to_right && self.test_join_with_prev1(horz) {
                let prev = self.actives[horz].prev_in_ael
                    .expect("join test guarantees a previous edge");
                let bot = self.actives[horz].bot;
                let op2 = self.add_out_pt(prev, bot);
                if let Some(op1) = op_end {
                    self.add_join(op2, op1);
                }
            }
        } else if let Some(vm) = vertex_max {
            // ends at a maximum whose pair was not met while walking
            if let Some(pair) = self.get_horz_maxima_pair(horz, vm) {
                if self.is_hot(horz) {
                    let t = self.actives[horz].top;
                    if is_left_to_right {
                        self.add_local_max_poly(horz, pair, t);
                    } else {
                        self.add_local_max_poly(pair, horz, t);
                    }
                }
                self.delete_from_ael(pair);
                self.delete_from_ael(horz);
            } else {
                self.delete_from_ael(horz);
            }
        } else {
            // an open-topped horizontal with no pair at all
            self.delete_from_ael(horz);
        }
    }

    // ------------------------------------------------------------------
    // Intersection discovery within a scanbeam
    // ------------------------------------------------------------------

    fn do_intersections(&mut self, top_y: i64) {
        if self.build_intersect_list(top_y) {
            self.process_intersect_list();
            self.intersect_nodes.clear();
        }
        self.sel_first = None;
    }

    fn adjust_curr_x_and_copy_to_sel(&mut self, top_y: i64) {
        let mut ae = self.ael_first;
        self.sel_first = ae;
        while let Some(e) = ae {
            let next = self.actives[e].next_in_ael;
            let a = &mut self.actives[e];
            a.prev_in_sel = a.prev_in_ael;
            a.next_in_sel = next;
            a.jump = next;
            ae = next;
            self.actives[e].cur_x = self.top_x(e, top_y);
        }
    }

    fn extract_from_sel(&mut self, e: usize) -> Option<usize> {
        let next = self.actives[e].next_in_sel;
        if let Some(n) = next {
            self.actives[n].prev_in_sel = self.actives[e].prev_in_sel;
        }
        let prev = self.actives[e].prev_in_sel
            .expect("merge never extracts the first sorted edge");
        self.actives[prev].next_in_sel = next;
        next
    }

    fn insert1_before2_in_sel(&mut self, e1: usize, e2: usize) {
        let prev = self.actives[e2].prev_in_sel;
        self.actives[e1].prev_in_sel = prev;
        if let Some(p) = prev {
            self.actives[p].next_in_sel = Some(e1);
        }
        self.actives[e1].next_in_sel = Some(e2);
        self.actives[e2].prev_in_sel = Some(e1);
    }

    fn add_new_intersect_node(&mut self, e1: usize, e2: usize, top_y: i64) {
        let mut ip = crate::predicates::intersect_point(
            self.actives[e1].bot,
            self.actives[e1].top,
            self.actives[e2].bot,
            self.actives[e2].top,
        )
        .unwrap_or_else(|| Point64::new(self.actives[e1].cur_x, top_y));

        if ip.y > self.current_bot_y || ip.y < top_y {
            // rounding pushed the point outside the scanbeam: clamp to the
            // violated scanline and take X from the more vertical edge
            let y = if ip.y < top_y { top_y } else { self.current_bot_y };
            let x = if self.actives[e1].dx.abs() < self.actives[e2].dx.abs() {
                self.top_x(e1, y)
            } else {
                self.top_x(e2, y)
            };
            ip = Point64::new(x, y);
        }
        self.intersect_nodes.push(IntersectNode {
            pt: ip,
            edge1: e1,
            edge2: e2,
        });
    }

    /// Discovers every edge crossing within the scanbeam ending at `top_y`
    /// using a bottom-up merge sort over the SEL; each adjacent swap the
    /// sort would perform becomes one intersection node.
    fn build_intersect_list(&mut self, top_y: i64) -> bool {
        let Some(first) = self.ael_first else {
            return false;
        };
        if self.actives[first].next_in_ael.is_none() {
            return false;
        }
        self.adjust_curr_x_and_copy_to_sel(top_y);

        let mut left = self.sel_first;
        while left.is_some() && self.actives[left.unwrap()].jump.is_some() {
            let mut prev_base: Option<usize> = None;
            while let Some(l) = left {
                let Some(right0) = self.actives[l].jump else {
                    break;
                };
                let mut curr_base = l;
                let mut l_cur: Option<usize> = Some(l);
                let mut l_end: Option<usize> = Some(right0);
                let mut right: Option<usize> = Some(right0);
                let r_end: Option<usize> = self.actives[right0].jump;
                self.actives[l].jump = r_end;

                while l_cur != l_end && right != r_end {
                    let rr = right.expect("right run is non-empty inside the merge");
                    let ll = l_cur.expect("left run is non-empty inside the merge");
                    if self.actives[rr].cur_x < self.actives[ll].cur_x {
                        // `rr` must move left past every remaining left-run
                        // edge; each hop is one crossing
                        let mut tmp = self.actives[rr].prev_in_sel
                            .expect("right-run edge always has a left neighbour");
                        loop {
                            self.add_new_intersect_node(tmp, rr, top_y);
                            if tmp == ll {
                                break;
                            }
                            tmp = self.actives[tmp].prev_in_sel
                                .expect("merge walk stays within the left run");
                        }
                        right = self.extract_from_sel(rr);
                        l_end = right;
                        self.insert1_before2_in_sel(rr, ll);
                        if ll == curr_base {
                            curr_base = rr;
                            self.actives[curr_base].jump = r_end;
                            match prev_base {
                                None => self.sel_first = Some(curr_base),
                                Some(pb) => self.actives[pb].jump = Some(curr_base),
                            }
                        }
                    } else {
                        l_cur = self.actives[ll].next_in_sel;
                    }
                }
                prev_base = Some(curr_base);
                left = r_end;
            }
            left = self.sel_first;
        }
        !self.intersect_nodes.is_empty()
    }

    fn edges_adjacent(&self, node: &IntersectNode) -> bool {
        self.actives[node.edge1].next_in_ael == Some(node.edge2)
            || self.actives[node.edge1].prev_in_ael == Some(node.edge2)
    }

    fn process_intersect_list(&mut self) {
        // bottom-up order: descending Y, ties by ascending X
        self.intersect_nodes
            .sort_by(|a, b| b.pt.y.cmp(&a.pt.y).then(a.pt.x.cmp(&b.pt.x)));

        for i in 0..self.intersect_nodes.len() {
            if !self.edges_adjacent(&self.intersect_nodes[i]) {
                // an earlier intersection reordered these edges; pull forward
                // the next node whose edges are adjacent
                let mut j = i + 1;
                loop {
                    if j >= self.intersect_nodes.len() {
                        self.fail("no adjacent edge pair among pending intersections");
                        return;
                    }
                    if self.edges_adjacent(&self.intersect_nodes[j]) {
                        break;
                    }
                    j += 1;
                }
                self.intersect_nodes.swap(i, j);
            }

            let node = self.intersect_nodes[i];
            self.intersect_edges(node.edge1, node.edge2, node.pt);
            self.swap_positions_in_ael(node.edge1, node.edge2);
            if !self.succeeded {
                return;
            }

            self.actives[node.edge1].cur_x = node.pt.x;
            self.actives[node.edge2].cur_x = node.pt.x;

            if self.test_join_with_prev2(node.edge2, node.pt) {
                let prev = self.actives[node.edge2].prev_in_ael
                    .expect("join test guarantees a previous edge");
                let op1 = self.add_out_pt(prev, node.pt);
                let op2 = self.add_out_pt(node.edge2, node.pt);
                if op1 != op2 {
                    self.add_join(op1, op2);
                }
            } else if self.test_join_with_next2(node.edge1, node.pt) {
                let next = self.actives[node.edge1].next_in_ael
                    .expect("join test guarantees a next edge");
                let op1 = self.add_out_pt(node.edge1, node.pt);
                let op2 = self.add_out_pt(next, node.pt);
                if op1 != op2 {
                    self.add_join(op1, op2);
                }
            }
        }
    }
}

fn edge_dx(bot: Point64, top: Point64) -> f64 {
    let dy = (top.y - bot.y) as f64;
    if dy != 0.0 {
        (top.x - bot.x) as f64 / dy
    } else if top.x > bot.x {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::topology::vertex_flags;

    fn pt(x: i64, y: i64) -> Point64 {
        Point64::new(x, y)
    }

    /// Builds a clipper holding one synthetic bound so ordering predicates
    /// can be probed directly.
    fn push_synthetic_bound(
        c: &mut Clipper,
        bot: Point64,
        top: Point64,
        before_bot: Point64,
        is_left: bool,
    ) -> usize {
        let v_pp = c.vertices.len();
        c.vertices.push(Vertex {
            pt: before_bot,
            flags: vertex_flags::NONE,
            prev: v_pp + 2,
            next: v_pp + 1,
        });
        c.vertices.push(Vertex {
            pt: bot,
            flags: vertex_flags::LOCAL_MIN,
            prev: v_pp,
            next: v_pp + 2,
        });
        c.vertices.push(Vertex {
            pt: top,
            flags: vertex_flags::LOCAL_MAX,
            prev: v_pp + 1,
            next: v_pp,
        });
        c.minima.push(LocalMinima {
            vertex: v_pp + 1,
            polytype: PathType::Subject,
            is_open: false,
        });
        let lm = c.minima.len() - 1;
        let id = c.actives.len();
        c.actives.push(Active {
            bot,
            top,
            cur_x: bot.x,
            dx: edge_dx(bot, top),
            wind_dx: 1,
            wind_cnt: 0,
            wind_cnt2: 0,
            outrec: None,
            prev_in_ael: None,
            next_in_ael: None,
            prev_in_sel: None,
            next_in_sel: None,
            jump: None,
            vertex_top: v_pp + 2,
            local_min: lm,
            is_left_bound: is_left,
        });
        id
    }

    #[test]
    fn ael_order_by_current_x() {
        let mut c = Clipper::new();
        let a = push_synthetic_bound(&mut c, pt(0, 10), pt(0, 0), pt(-5, 20), true);
        let b = push_synthetic_bound(&mut c, pt(5, 10), pt(5, 0), pt(10, 20), false);
        assert!(c.is_valid_ael_order(a, b));
        assert!(!c.is_valid_ael_order(b, a));
    }

    #[test]
    fn ael_order_by_slope_at_shared_x() {
        let mut c = Clipper::new();
        // both start at (5,10); `a` rises vertically, `b` leans right
        let a = push_synthetic_bound(&mut c, pt(5, 10), pt(5, 0), pt(0, 20), true);
        let b = push_synthetic_bound(&mut c, pt(5, 10), pt(10, 0), pt(10, 20), false);
        assert!(c.is_valid_ael_order(a, b));
        assert!(!c.is_valid_ael_order(b, a));
    }

    #[test]
    fn ael_order_coincident_bottoms() {
        // Two collinear new bounds sharing a bottom: when the resident's
        // alternate bound is also collinear the existing order is kept.
        let mut c = Clipper::new();
        let a = push_synthetic_bound(&mut c, pt(5, 10), pt(5, 0), pt(5, 20), true);
        let b = push_synthetic_bound(&mut c, pt(5, 10), pt(5, 0), pt(5, 20), true);
        assert!(c.is_valid_ael_order(a, b));
    }

    #[test]
    fn left_bounds_sort_left_of_right_bounds() {
        let mut c = Clipper::new();
        let a = push_synthetic_bound(&mut c, pt(5, 10), pt(5, 0), pt(0, 20), false);
        let b = push_synthetic_bound(&mut c, pt(5, 10), pt(5, 0), pt(0, 20), true);
        // a collinear newcomer that is a left bound sorts left
        assert!(c.is_valid_ael_order(b, a));
    }

    #[test]
    fn horizontal_dx_encodes_heading() {
        assert_eq!(edge_dx(pt(0, 5), pt(10, 5)), f64::NEG_INFINITY);
        assert_eq!(edge_dx(pt(10, 5), pt(0, 5)), f64::INFINITY);
        assert_eq!(edge_dx(pt(0, 0), pt(0, 10)), 0.0);
    }

    #[test]
    fn top_x_interpolates_with_banker_rounding() {
        let mut c = Clipper::new();
        let e = push_synthetic_bound(&mut c, pt(0, 10), pt(5, 0), pt(0, 20), true);
        assert_eq!(c.top_x(e, 10), 0);
        assert_eq!(c.top_x(e, 0), 5);
        assert_eq!(c.top_x(e, 5), 2); // exact 2.5 rounds to even
    }

    #[test]
    fn scanline_queue_pops_descending_and_dedups() {
        let mut c = Clipper::new();
        c.insert_scanline(5);
        c.insert_scanline(10);
        c.insert_scanline(5);
        c.insert_scanline(7);
        assert_eq!(c.pop_scanline(), Some(10));
        assert_eq!(c.pop_scanline(), Some(7));
        assert_eq!(c.pop_scanline(), Some(5));
        assert_eq!(c.pop_scanline(), None);
    }
}
