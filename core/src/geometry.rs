//! Map geometry helpers built on top of `GameView`.

use crate::game::GameView;
use crate::types::TileRef;
use std::collections::{HashSet, VecDeque};

/// Inclusive bounding box in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

pub fn bounding_box(game: &dyn GameView, tiles: &[TileRef]) -> Option<BoundingBox> {
    let first = tiles.first()?;
    let mut bb = BoundingBox {
        min_x: game.x(*first),
        min_y: game.y(*first),
        max_x: game.x(*first),
        max_y: game.y(*first),
    };
    for &tile in &tiles[1..] {
        let (x, y) = (game.x(tile), game.y(tile));
        bb.min_x = bb.min_x.min(x);
        bb.min_y = bb.min_y.min(y);
        bb.max_x = bb.max_x.max(x);
        bb.max_y = bb.max_y.max(y);
    }
    Some(bb)
}

/// Breadth-first traversal from `start` over tiles accepted by `within`.
/// The start tile is always visited.
pub fn bfs(
    game: &dyn GameView,
    start: TileRef,
    within: impl Fn(TileRef) -> bool,
) -> Vec<TileRef> {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut visited = Vec::new();
    while let Some(tile) = queue.pop_front() {
        visited.push(tile);
        for n in game.neighbors(tile) {
            if within(n) && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    visited
}

/// Tiles within Manhattan distance `radius` of `center`, reached by BFS.
pub fn manhattan_ball(game: &dyn GameView, center: TileRef, radius: u32) -> Vec<TileRef> {
    bfs(game, center, |t| game.manhattan_dist(center, t) <= radius)
}

pub fn within_euclidean(game: &dyn GameView, a: TileRef, b: TileRef, radius: u32) -> bool {
    game.euclidean_dist_squared(a, b) <= (radius as u64) * (radius as u64)
}

/// Closest pair `(from_xs, from_ys)` by Manhattan distance. First pair wins ties.
pub fn closest_two_tiles(
    game: &dyn GameView,
    xs: &[TileRef],
    ys: &[TileRef],
) -> Option<(TileRef, TileRef)> {
    let mut best: Option<(TileRef, TileRef, u32)> = None;
    for &x in xs {
        for &y in ys {
            let d = game.manhattan_dist(x, y);
            if best.map_or(true, |(_, _, bd)| d < bd) {
                best = Some((x, y, d));
            }
        }
    }
    best.map(|(x, y, _)| (x, y))
}
