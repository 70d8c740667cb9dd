//! Spatial index: a dense 3-D grid of squares plus the movable-block list.
//!
//! * Square `(column, row, level)` covers world
//!   `[c, c+1) × [l, l+1) × [r, r+1)` (times [`UNITS_PER_BLOCK`]) on
//!   `x × y × z`.
//! * A square owns at most one [`Block`] and per-square copies of the
//!   block template's trigger, popup, exit and sound.

use glam::Vec3;
use thiserror::Error;

use crate::world::{
    arena::{Arena, Handle},
    geometry::{Block, SoundTemplate, UNITS_PER_BLOCK},
    light::LightHandle,
    popup::{Exit, PopupHandle, SquareCoord, Trigger},
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MapError {
    #[error("square ({0}, {1}, {2}) lies outside the map")]
    OutOfBounds(i32, i32, i32),

    #[error("square ({0}, {1}, {2}) already holds a block")]
    Occupied(i32, i32, i32),

    #[error("map dimensions {0}×{1}×{2} are empty")]
    Empty(u32, u32, u32),
}

/// One grid cell.
#[derive(Debug, Default)]
pub struct Square {
    pub block: Option<Block>,
    pub trigger: Option<Trigger>,
    pub popup: Option<PopupHandle>,
    pub exit: Option<Exit>,
    pub sound: Option<SoundTemplate>,
    /// Light registered for the block on this square.
    pub light: Option<LightHandle>,
}

pub type MovableHandle = Handle<Block>;

pub struct Map {
    columns: u32,
    rows: u32,
    levels: u32,
    squares: Vec<Square>,
    movables: Arena<Block>,
}

impl Map {
    pub fn new(columns: u32, rows: u32, levels: u32) -> Result<Self, MapError> {
        if columns == 0 || rows == 0 || levels == 0 {
            return Err(MapError::Empty(columns, rows, levels));
        }
        let n = columns as usize * rows as usize * levels as usize;
        let mut squares = Vec::with_capacity(n);
        squares.resize_with(n, Square::default);
        Ok(Self {
            columns,
            rows,
            levels,
            squares,
            movables: Arena::new(),
        })
    }

    #[inline]
    pub fn dims(&self) -> (u32, u32, u32) {
        (self.columns, self.rows, self.levels)
    }

    #[inline]
    fn index(&self, c: i32, r: i32, l: i32) -> Option<usize> {
        if c < 0
            || r < 0
            || l < 0
            || c as u32 >= self.columns
            || r as u32 >= self.rows
            || l as u32 >= self.levels
        {
            return None;
        }
        Some((l as usize * self.rows as usize + r as usize) * self.columns as usize + c as usize)
    }

    pub fn get_square(&self, c: i32, r: i32, l: i32) -> Option<&Square> {
        self.index(c, r, l).map(|i| &self.squares[i])
    }

    pub fn get_square_mut(&mut self, c: i32, r: i32, l: i32) -> Option<&mut Square> {
        self.index(c, r, l).map(move |i| &mut self.squares[i])
    }

    pub fn get_block(&self, c: i32, r: i32, l: i32) -> Option<&Block> {
        self.get_square(c, r, l).and_then(|s| s.block.as_ref())
    }

    pub fn get_block_mut(&mut self, c: i32, r: i32, l: i32) -> Option<&mut Block> {
        self.get_square_mut(c, r, l).and_then(|s| s.block.as_mut())
    }

    /// Mutable access to two distinct squares' blocks at once.
    pub fn get_block_pair_mut(
        &mut self,
        a: SquareCoord,
        b: SquareCoord,
    ) -> Option<(&mut Block, &mut Block)> {
        let ia = self.index(a.0, a.1, a.2)?;
        let ib = self.index(b.0, b.1, b.2)?;
        if ia == ib {
            return None;
        }
        let (lo, hi) = (ia.min(ib), ia.max(ib));
        let (head, tail) = self.squares.split_at_mut(hi);
        let (sl, sh) = (&mut head[lo], &mut tail[0]);
        let (bl, bh) = (sl.block.as_mut()?, sh.block.as_mut()?);
        Some(if ia < ib { (bl, bh) } else { (bh, bl) })
    }

    /// World position of a square's minimum corner.
    #[inline]
    pub fn square_origin(c: i32, r: i32, l: i32) -> Vec3 {
        Vec3::new(c as f32, l as f32, r as f32) * UNITS_PER_BLOCK
    }

    /// Square containing world point `p` (may lie outside the map).
    #[inline]
    pub fn world_to_square(p: Vec3) -> SquareCoord {
        let s = p / UNITS_PER_BLOCK;
        (s.x.floor() as i32, s.z.floor() as i32, s.y.floor() as i32)
    }

    /// Store `block` on an empty square.
    pub fn put_block(&mut self, c: i32, r: i32, l: i32, block: Block) -> Result<(), MapError> {
        let sq = self
            .get_square_mut(c, r, l)
            .ok_or(MapError::OutOfBounds(c, r, l))?;
        if sq.block.is_some() {
            return Err(MapError::Occupied(c, r, l));
        }
        sq.block = Some(block);
        Ok(())
    }

    /// Take the block and every per-square copy off a square.
    pub fn clear_square(&mut self, c: i32, r: i32, l: i32) -> Result<Square, MapError> {
        let sq = self
            .get_square_mut(c, r, l)
            .ok_or(MapError::OutOfBounds(c, r, l))?;
        Ok(std::mem::take(sq))
    }

    /// Occupied squares in storage order.
    pub fn blocks(&self) -> impl Iterator<Item = (SquareCoord, &Block)> + '_ {
        let (cols, rows) = (self.columns as usize, self.rows as usize);
        self.squares.iter().enumerate().filter_map(move |(i, s)| {
            s.block.as_ref().map(|b| {
                let c = i % cols;
                let r = (i / cols) % rows;
                let l = i / (cols * rows);
                ((c as i32, r as i32, l as i32), b)
            })
        })
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> + '_ {
        self.squares.iter_mut().filter_map(|s| s.block.as_mut())
    }

    /*──────────────────────── movable blocks ───────────────────────*/

    pub fn add_movable(&mut self, block: Block) -> MovableHandle {
        self.movables.acquire(block)
    }

    pub fn remove_movable(&mut self, h: MovableHandle) -> Option<Block> {
        self.movables.release(h)
    }

    pub fn movable(&self, h: MovableHandle) -> Option<&Block> {
        self.movables.get(h)
    }

    pub fn movable_mut(&mut self, h: MovableHandle) -> Option<&mut Block> {
        self.movables.get_mut(h)
    }

    pub fn movables(&self) -> impl Iterator<Item = (MovableHandle, &Block)> + '_ {
        self.movables.iter()
    }

    pub fn movables_mut(&mut self) -> impl Iterator<Item = (MovableHandle, &mut Block)> + '_ {
        self.movables.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::world::{geometry::Part, shapes};

    fn cube_block(at: SquareCoord) -> Block {
        let def = Arc::new(shapes::cube("c", Part::coloured("p", [1, 2, 3])));
        Block::new(def, Map::square_origin(at.0, at.1, at.2))
    }

    #[test]
    fn lookup_respects_bounds() {
        let mut map = Map::new(4, 3, 2).unwrap();
        map.put_block(3, 2, 1, cube_block((3, 2, 1))).unwrap();
        assert!(map.get_block(3, 2, 1).is_some());
        assert!(map.get_block(2, 2, 1).is_none());
        assert!(map.get_square(4, 0, 0).is_none());
        assert!(map.get_square(-1, 0, 0).is_none());
        assert_eq!(
            map.put_block(3, 2, 1, cube_block((3, 2, 1))),
            Err(MapError::Occupied(3, 2, 1))
        );
        let coords: Vec<_> = map.blocks().map(|(c, _)| c).collect();
        assert_eq!(coords, vec![(3, 2, 1)]);
    }

    #[test]
    fn world_square_round_trip() {
        let o = Map::square_origin(2, 5, 1);
        assert_eq!(o, Vec3::new(512.0, 256.0, 1280.0));
        assert_eq!(Map::world_to_square(o + Vec3::splat(1.0)), (2, 5, 1));
        assert_eq!(Map::world_to_square(Vec3::new(-1.0, 0.0, 0.0)), (-1, 0, 0));
    }

    #[test]
    fn pair_access_is_ordered() {
        let mut map = Map::new(2, 1, 1).unwrap();
        map.put_block(0, 0, 0, cube_block((0, 0, 0))).unwrap();
        map.put_block(1, 0, 0, cube_block((1, 0, 0))).unwrap();
        let (a, b) = map.get_block_pair_mut((1, 0, 0), (0, 0, 0)).unwrap();
        assert_eq!(a.origin.x, UNITS_PER_BLOCK);
        assert_eq!(b.origin.x, 0.0);
        assert!(map.get_block_pair_mut((0, 0, 0), (0, 0, 0)).is_none());
    }

    #[test]
    fn empty_map_rejected() {
        assert_eq!(Map::new(0, 1, 1).err(), Some(MapError::Empty(0, 1, 1)));
    }
}
