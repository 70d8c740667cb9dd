//! Coplanar-face elimination between neighbouring blocks.
//!
//! A single-sided boundary face pressed against an identical, opposite-facing
//! face of the neighbour can never be seen; both are switched off. Removing
//! a block switches the neighbours' faces back on.

use log::trace;

use crate::world::{
    geometry::{Block, Direction, FaceMode, Polygon},
    map::Map,
    math,
    popup::SquareCoord,
};

#[inline]
fn step((c, r, l): SquareCoord, dir: Direction) -> SquareCoord {
    let (dc, dr, dl) = dir.offset();
    (c + dc, r + dr, l + dl)
}

#[inline]
fn faces(block: &Block, poly: &Polygon) -> FaceMode {
    block.def.part(poly.part).faces
}

/// Same corner count, and every corner of `a` is present in `b` (world
/// positions, [`math::EPSILON`] tolerance).
fn same_outline(a: &Block, pa: &Polygon, b: &Block, pb: &Polygon) -> bool {
    pa.len() == pb.len()
        && pa.defs.iter().all(|da| {
            let va = a.world_vertex(da.vertex);
            pb.defs
                .iter()
                .any(|db| math::same_point(va, b.world_vertex(db.vertex)))
        })
}

/// Deactivate redundant faces of the block on `at`.
///
/// With `check_all_sides` every neighbour is examined; otherwise only
/// [`Direction::FORWARD`], which covers each pair exactly once when every
/// block of the map is processed in turn. Returns the number of polygons
/// newly switched off.
pub fn set_active_polygons(map: &mut Map, at: SquareCoord, check_all_sides: bool) -> usize {
    let mut count = 0;

    let Some(block) = map.get_block_mut(at.0, at.1, at.2) else {
        return 0;
    };
    let def = block.def.clone();
    for poly in block.polygons.iter_mut() {
        if poly.active && def.part(poly.part).faces == FaceMode::None {
            poly.active = false;
            count += 1;
        }
    }

    let dirs: &[Direction] = if check_all_sides {
        &Direction::ALL
    } else {
        &Direction::FORWARD
    };
    for &dir in dirs {
        let Some((here, there)) = map.get_block_pair_mut(at, step(at, dir)) else {
            continue;
        };
        for i in 0..here.polygons.len() {
            let p = &here.polygons[i];
            if !p.active || p.side != Some(dir) || faces(here, p) != FaceMode::Single {
                continue;
            }
            let opposite = dir.opposite();
            let hit = there.polygons.iter().position(|q| {
                q.active
                    && q.side == Some(opposite)
                    && faces(there, q) == FaceMode::Single
                    && same_outline(here, p, there, q)
            });
            if let Some(j) = hit {
                here.polygons[i].active = false;
                there.polygons[j].active = false;
                count += 2;
            }
        }
    }

    if count > 0 {
        trace!("activation {at:?}: {count} polygons off");
    }
    count
}

/// Switch back on every neighbour face that was closed against the block
/// on `at`. Call before the block leaves the square.
pub fn reset_active_polygons(map: &mut Map, at: SquareCoord) -> usize {
    let mut count = 0;
    for dir in Direction::ALL {
        let n = step(at, dir);
        let Some(block) = map.get_block_mut(n.0, n.1, n.2) else {
            continue;
        };
        let def = block.def.clone();
        let facing = dir.opposite();
        for poly in block.polygons.iter_mut() {
            if !poly.active
                && poly.side == Some(facing)
                && def.part(poly.part).faces == FaceMode::Single
            {
                poly.active = true;
                count += 1;
            }
        }
    }
    count
}

/// Full pass over a freshly loaded map.
pub fn activate_all(map: &mut Map) -> usize {
    let occupied: Vec<SquareCoord> = map.blocks().map(|(at, _)| at).collect();
    occupied
        .into_iter()
        .map(|at| set_active_polygons(map, at, false))
        .sum()
}
