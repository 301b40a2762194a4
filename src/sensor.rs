//! Egocentric sensor encoding of a game snapshot.
//!
//! Layout of the 32 values:
//!
//! | range   | block                                   |
//! |---------|-----------------------------------------|
//! | 0..8    | distance to the wall along each ray      |
//! | 8..16   | food on the ray (distance), else 0      |
//! | 16..24  | nearest own body segment on the ray     |
//! | 24..28  | current heading, one-hot Up/Right/Down/Left |
//! | 28..32  | coarse tail direction, same order       |
//!
//! Rays run N, NE, E, SE, S, SW, W, NW. Distances are normalized by the
//! larger grid side.

use crate::game::{Dir, Snapshot};
use crate::pos::Pos;

pub const SENSOR_LEN: usize = 32;
pub const WALL_BLOCK: usize = 0;
pub const FOOD_BLOCK: usize = 8;
pub const BODY_BLOCK: usize = 16;
pub const HEADING_BLOCK: usize = 24;
pub const TAIL_BLOCK: usize = 28;

pub type SensorVector = [f32; SENSOR_LEN];

/// Unit steps for the eight rays, clockwise from north.
pub const COMPASS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

pub fn encode(snap: &Snapshot<'_>) -> SensorVector {
    let mut out = [0.0f32; SENSOR_LEN];
    let head = snap.head();
    let scale = f32::from(snap.max_dim());

    for (i, &(dx, dy)) in COMPASS.iter().enumerate() {
        out[WALL_BLOCK + i] = wall_steps(snap, head, dx, dy) as f32 / scale;

        if let Some(r) = snap.food.and_then(|f| ray_multiple(f, head, dx, dy)) {
            out[FOOD_BLOCK + i] = r as f32 / scale;
        }

        let nearest = snap
            .snake
            .iter()
            .skip(1)
            .filter_map(|&seg| ray_multiple(seg, head, dx, dy))
            .min();
        if let Some(r) = nearest {
            out[BODY_BLOCK + i] = r as f32 / scale;
        }
    }

    out[HEADING_BLOCK + snap.direction.index()] = 1.0;

    if let Some(d) = tail_direction(head, snap.tail()) {
        out[TAIL_BLOCK + d.index()] = 1.0;
    }

    out
}

// Cells visited from the head before leaving the grid, minus the head itself.
fn wall_steps(snap: &Snapshot<'_>, head: Pos, dx: i32, dy: i32) -> u32 {
    let (w, h) = (i32::from(snap.width), i32::from(snap.height));
    let mut p = head;
    let mut steps = 0u32;
    while p.x >= 0 && p.y >= 0 && p.x < w && p.y < h {
        steps += 1;
        p = p.offset(dx, dy);
    }
    steps.saturating_sub(1)
}

/// If `target` lies exactly on the ray from `origin` with step `(dx, dy)`,
/// returns the positive number of steps to reach it.
pub fn ray_multiple(target: Pos, origin: Pos, dx: i32, dy: i32) -> Option<i32> {
    let (ox, oy) = (target.x - origin.x, target.y - origin.y);
    let r = match (dx, dy) {
        (0, 0) => return None,
        (0, _) => {
            if ox != 0 || oy % dy != 0 {
                return None;
            }
            oy / dy
        }
        (_, 0) => {
            if oy != 0 || ox % dx != 0 {
                return None;
            }
            ox / dx
        }
        _ => {
            if ox % dx != 0 || oy % dy != 0 {
                return None;
            }
            let (rx, ry) = (ox / dx, oy / dy);
            if rx != ry {
                return None;
            }
            rx
        }
    };
    (r > 0).then_some(r)
}

/// Horizontal wins ties; `None` when tail and head coincide.
pub fn tail_direction(head: Pos, tail: Pos) -> Option<Dir> {
    let (dx, dy) = (tail.x - head.x, tail.y - head.y);
    let horizontal = match dx.signum() {
        1 => Some(Dir::Right),
        -1 => Some(Dir::Left),
        _ => None,
    };
    let vertical = match dy.signum() {
        1 => Some(Dir::Down),
        -1 => Some(Dir::Up),
        _ => None,
    };
    if dx.abs() >= dy.abs() {
        horizontal.or(vertical)
    } else {
        vertical.or(horizontal)
    }
}
