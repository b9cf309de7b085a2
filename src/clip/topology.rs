//! Input preprocessing: vertex rings and the sorted local-minima list.
//!
//! Each input path becomes a circular doubly-linked ring of vertices in an
//! index arena. A single walk over the ring tags the vertices where the
//! sweep will start (local minima, the locally largest Y values) and stop
//! (local maxima). The sweep consumes minima bottom-up, so the list is
//! sorted by Y descending.

use crate::clip::engine::Clipper;
use crate::clip::PathType;
use crate::primitives::Point64;

pub(crate) mod vertex_flags {
    pub const NONE: u8 = 0;
    pub const OPEN_START: u8 = 1;
    pub const OPEN_END: u8 = 2;
    pub const LOCAL_MAX: u8 = 4;
    pub const LOCAL_MIN: u8 = 8;
}

/// A node in a per-path circular vertex ring.
pub(crate) struct Vertex {
    pub pt: Point64,
    pub flags: u8,
    pub prev: usize,
    pub next: usize,
}

impl Vertex {
    #[inline]
    pub fn is_local_max(&self) -> bool {
        self.flags & vertex_flags::LOCAL_MAX != 0
    }

    #[inline]
    pub fn is_open_start(&self) -> bool {
        self.flags & vertex_flags::OPEN_START != 0
    }

    #[inline]
    pub fn is_open_end(&self) -> bool {
        self.flags & vertex_flags::OPEN_END != 0
    }
}

/// A sweep starting point: the bottom vertex of a pair of bounds.
#[derive(Clone)]
pub(crate) struct LocalMinima {
    pub vertex: usize,
    pub polytype: PathType,
    pub is_open: bool,
}

impl Clipper {
    /// Registers `vertex` as a local minimum. Idempotent per vertex, so flat
    /// spans resolved from both directions register only once.
    fn add_loc_min(&mut self, vertex: usize, polytype: PathType, is_open: bool) {
        if self.vertices[vertex].flags & vertex_flags::LOCAL_MIN != 0 {
            return;
        }
        self.vertices[vertex].flags |= vertex_flags::LOCAL_MIN;
        self.minima.push(LocalMinima {
            vertex,
            polytype,
            is_open,
        });
        self.minima_sorted = false;
    }

    /// Builds the vertex ring for one input path and registers its minima.
    /// Degenerate paths are skipped without error.
    pub(crate) fn add_path_to_vertex_list(
        &mut self,
        path: &[Point64],
        polytype: PathType,
        is_open: bool,
    ) {
        let start = self.vertices.len();

        // Chain vertices, collapsing consecutive duplicate points.
        for &pt in path {
            if self.vertices.len() == start {
                self.vertices.push(Vertex {
                    pt,
                    flags: vertex_flags::NONE,
                    prev: start,
                    next: start,
                });
            } else if self.vertices[self.vertices.len() - 1].pt != pt {
                let id = self.vertices.len();
                self.vertices.push(Vertex {
                    pt,
                    flags: vertex_flags::NONE,
                    prev: id - 1,
                    next: start,
                });
                self.vertices[id - 1].next = id;
            }
        }

        if self.vertices.len() < start + 2 {
            self.vertices.truncate(start);
            return;
        }
        let mut last = self.vertices.len() - 1;
        // A closed path repeating its first point is treated as if the
        // duplicate were absent.
        if !is_open && self.vertices[last].pt == self.vertices[start].pt {
            self.vertices.truncate(last);
            last -= 1;
            if last < start + 1 {
                self.vertices.truncate(start);
                return;
            }
        }
        self.vertices[last].next = start;
        self.vertices[start].prev = last;

        // Establish the initial Y direction. "Going up" means heading toward
        // smaller Y, the direction the sweep advances.
        let v0 = start;
        let mut going_up;
        if is_open {
            let mut curr = self.vertices[v0].next;
            while curr != v0 && self.vertices[curr].pt.y == self.vertices[v0].pt.y {
                curr = self.vertices[curr].next;
            }
            going_up = self.vertices[curr].pt.y <= self.vertices[v0].pt.y;
            if going_up {
                self.vertices[v0].flags = vertex_flags::OPEN_START;
                self.add_loc_min(v0, polytype, true);
            } else {
                self.vertices[v0].flags = vertex_flags::OPEN_START | vertex_flags::LOCAL_MAX;
            }
        } else {
            let mut prev = self.vertices[v0].prev;
            while prev != v0 && self.vertices[prev].pt.y == self.vertices[v0].pt.y {
                prev = self.vertices[prev].prev;
            }
            if prev == v0 {
                // Completely flat rings have no bounds to sweep.
                return;
            }
            going_up = self.vertices[prev].pt.y > self.vertices[v0].pt.y;
        }

        let going_up0 = going_up;
        let mut prev = v0;
        let mut curr = self.vertices[v0].next;
        while curr != v0 {
            if self.vertices[curr].pt.y > self.vertices[prev].pt.y && going_up {
                self.vertices[prev].flags |= vertex_flags::LOCAL_MAX;
                going_up = false;
            } else if self.vertices[curr].pt.y < self.vertices[prev].pt.y && !going_up {
                going_up = true;
                self.add_loc_min(prev, polytype, is_open);
            }
            prev = curr;
            curr = self.vertices[curr].next;
        }

        if is_open {
            self.vertices[prev].flags |= vertex_flags::OPEN_END;
            if going_up {
                self.vertices[prev].flags |= vertex_flags::LOCAL_MAX;
            } else {
                self.add_loc_min(prev, polytype, true);
            }
        } else if going_up != going_up0 {
            if going_up0 {
                self.add_loc_min(prev, polytype, false);
            } else {
                self.vertices[prev].flags |= vertex_flags::LOCAL_MAX;
            }
        }
    }
}
