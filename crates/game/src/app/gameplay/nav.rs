use std::collections::HashSet;
use std::fmt;

use engine::Vec2;
use serde::Serialize;

use super::TILE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub(crate) struct GridPoint {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl GridPoint {
    pub(crate) const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Rounds to the nearest cell. Obstacle sets and path starts both go
    /// through here so they agree on which cell an agent occupies.
    pub(crate) fn from_world(position: Vec2) -> Self {
        Self {
            x: (position.x / TILE_SIZE).round() as i32,
            y: (position.y / TILE_SIZE).round() as i32,
        }
    }

    pub(crate) fn to_world(self) -> Vec2 {
        Vec2 {
            x: self.x as f32 * TILE_SIZE,
            y: self.y as f32 * TILE_SIZE,
        }
    }

    fn neighbors(self) -> [GridPoint; 4] {
        [
            GridPoint::new(self.x, self.y + 1),
            GridPoint::new(self.x + 1, self.y),
            GridPoint::new(self.x, self.y - 1),
            GridPoint::new(self.x - 1, self.y),
        ]
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GridBounds {
    pub(crate) min_x: i32,
    pub(crate) min_y: i32,
    pub(crate) max_x: i32,
    pub(crate) max_y: i32,
}

impl GridBounds {
    pub(crate) fn contains(&self, point: GridPoint) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    fn width(&self) -> usize {
        (self.max_x - self.min_x + 1).max(0) as usize
    }

    fn height(&self) -> usize {
        (self.max_y - self.min_y + 1).max(0) as usize
    }

    fn index_of(&self, point: GridPoint) -> Option<usize> {
        if !self.contains(point) {
            return None;
        }
        let local_x = (point.x - self.min_x) as usize;
        let local_y = (point.y - self.min_y) as usize;
        Some(local_y * self.width() + local_x)
    }

    fn point_at(&self, index: usize) -> GridPoint {
        let width = self.width().max(1);
        GridPoint {
            x: self.min_x + (index % width) as i32,
            y: self.min_y + (index / width) as i32,
        }
    }
}

pub(crate) type BlockedCells = HashSet<GridPoint>;

/// A* over the implicit 4-connected grid. The returned path excludes `start`
/// and ends on `goal`; it is empty when there is nothing to walk (already
/// there) or no walkable route exists right now.
pub(crate) fn find_path(
    start: GridPoint,
    goal: GridPoint,
    blocked: &BlockedCells,
    bounds: GridBounds,
) -> Vec<GridPoint> {
    if start == goal || blocked.contains(&goal) {
        return Vec::new();
    }
    let (Some(start_index), Some(goal_index)) = (bounds.index_of(start), bounds.index_of(goal))
    else {
        return Vec::new();
    };

    let node_count = bounds.width() * bounds.height();
    let mut closed = vec![false; node_count];
    let mut best_g = vec![u32::MAX; node_count];
    let mut parent = vec![None::<usize>; node_count];
    let mut open = Vec::new();
    let mut next_insertion = 0u64;

    let start_h = manhattan_distance(start, goal);
    open.push(OpenNode {
        point: start,
        h_cost: start_h,
        f_cost: start_h,
        insertion_order: next_insertion,
    });
    next_insertion = next_insertion.saturating_add(1);
    best_g[start_index] = 0;

    while !open.is_empty() {
        let best_index = pick_best_open_node_index(&open);
        let current = open.swap_remove(best_index);
        let Some(current_index) = bounds.index_of(current.point) else {
            continue;
        };
        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        if current_index == goal_index {
            return reconstruct_path(&parent, bounds, start_index, goal_index);
        }

        let current_g = best_g[current_index];
        for neighbor in current.point.neighbors() {
            let Some(neighbor_index) = bounds.index_of(neighbor) else {
                continue;
            };
            if closed[neighbor_index] || blocked.contains(&neighbor) {
                continue;
            }

            let tentative_g = current_g.saturating_add(1);
            if tentative_g >= best_g[neighbor_index] {
                continue;
            }

            best_g[neighbor_index] = tentative_g;
            parent[neighbor_index] = Some(current_index);
            let h_cost = manhattan_distance(neighbor, goal);
            open.push(OpenNode {
                point: neighbor,
                h_cost,
                f_cost: tentative_g.saturating_add(h_cost),
                insertion_order: next_insertion,
            });
            next_insertion = next_insertion.saturating_add(1);
        }
    }

    Vec::new()
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    point: GridPoint,
    h_cost: u32,
    f_cost: u32,
    insertion_order: u64,
}

fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        if open_node_order_key(open[index]) < open_node_order_key(open[best_index]) {
            best_index = index;
        }
    }
    best_index
}

fn open_node_order_key(node: OpenNode) -> (u32, u32, u64) {
    (node.f_cost, node.h_cost, node.insertion_order)
}

fn reconstruct_path(
    parent: &[Option<usize>],
    bounds: GridBounds,
    start_index: usize,
    goal_index: usize,
) -> Vec<GridPoint> {
    let mut cursor = goal_index;
    let mut path = Vec::new();
    while cursor != start_index {
        path.push(bounds.point_at(cursor));
        let Some(next) = parent.get(cursor).copied().flatten() else {
            return Vec::new();
        };
        cursor = next;
    }
    path.reverse();
    path
}

pub(crate) fn manhattan_distance(a: GridPoint, b: GridPoint) -> u32 {
    a.x.abs_diff(b.x).saturating_add(a.y.abs_diff(b.y))
}
