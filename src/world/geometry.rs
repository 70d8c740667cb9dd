use std::sync::Arc;

use bitflags::bitflags;
use glam::{Vec2, Vec3};
use smallvec::SmallVec;

use crate::world::{
    bsp::BspTree,
    light::LightTemplate,
    math::{self, Plane},
    popup::{Exit, PopupTemplate, Trigger},
    texture::TextureId,
};

/// World units along the edge of one grid square.
pub const UNITS_PER_BLOCK: f32 = 256.0;

pub type VertexId = u16;
pub type PolygonId = u16;
pub type PartId = u16;

/// RGB colour with 0–255 channels.
pub type Rgb = [u8; 3];

/*----------------------------- compass ------------------------------*/

/// Grid neighbour directions. Columns grow east (+x), rows grow north
/// (+z), levels grow up (+y).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    /// The half used by incremental activation passes.
    pub const FORWARD: [Direction; 3] = [Direction::East, Direction::South, Direction::Up];

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// (column, row, level) step towards the neighbour.
    #[inline]
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, 1, 0),
            Direction::South => (0, -1, 0),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::Up => (0, 0, 1),
            Direction::Down => (0, 0, -1),
        }
    }
}

/*------------------------------ parts -------------------------------*/

/// Which sides of a polygon are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceMode {
    /// Never drawn.
    None,
    /// Front face only.
    Single,
    /// Both faces.
    Double,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureStyle {
    /// Texture coordinates come from the vertex definitions.
    Stretched,
    /// Texture coordinates follow world position so adjacent blocks tile.
    Tiled,
}

/// Material shared by a group of polygons.
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    pub name: String,
    /// `None` = flat colour.
    pub texture: Option<TextureId>,
    pub colour: Rgb,
    pub faces: FaceMode,
    /// 1.0 = opaque.
    pub alpha: f32,
    pub style: TextureStyle,
    /// Constant texture rotation in degrees.
    pub angle: Option<f32>,
}

impl Part {
    pub fn coloured<S: Into<String>>(name: S, colour: Rgb) -> Self {
        Self {
            name: name.into(),
            texture: None,
            colour,
            faces: FaceMode::Single,
            alpha: 1.0,
            style: TextureStyle::Stretched,
            angle: None,
        }
    }

    pub fn textured<S: Into<String>>(name: S, texture: TextureId) -> Self {
        Self {
            texture: Some(texture),
            colour: [255, 255, 255],
            ..Self::coloured(name, [255, 255, 255])
        }
    }

    #[inline]
    pub fn is_translucent(&self) -> bool {
        self.alpha < 1.0 - math::EPSILON
    }
}

/*----------------------------- polygons -----------------------------*/

/// Polygon corner: shared vertex plus its own texture coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexDef {
    pub vertex: VertexId,
    pub u: f32,
    pub v: f32,
}

impl VertexDef {
    pub const fn new(vertex: VertexId, u: f32, v: f32) -> Self {
        Self { vertex, u, v }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub defs: SmallVec<[VertexDef; 4]>,
    pub part: PartId,
    pub plane: Plane,
    pub centroid: Vec3,
    /// Compass side this face closes off, if it lies on the block boundary.
    pub side: Option<Direction>,
    pub active: bool,
}

impl Polygon {
    pub fn new(defs: &[VertexDef], part: PartId, side: Option<Direction>) -> Self {
        Self {
            defs: defs.iter().copied().collect(),
            part,
            plane: Plane::default(),
            centroid: Vec3::ZERO,
            side,
            active: true,
        }
    }

    /// Recompute plane equation and centroid from `vertices`.
    /// Degenerate outlines keep a zero normal and are never visible.
    pub fn update_plane(&mut self, vertices: &[Vec3]) {
        let pts: SmallVec<[Vec3; 8]> = self
            .defs
            .iter()
            .map(|d| vertices[d.vertex as usize])
            .collect();
        self.plane = Plane::from_outline(&pts).unwrap_or_default();
        self.centroid = pts.iter().copied().sum::<Vec3>() / pts.len().max(1) as f32;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/*---------------------------- templates -----------------------------*/

/// Ambient sound attached to a block; playback lives outside the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundTemplate {
    pub name: String,
    pub volume: f32,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpriteKind {
    /// Always turned towards the viewer.
    Facing,
    /// Spins at a constant rate.
    Revolving { deg_per_sec: f32 },
    /// Fixed heading.
    Angled { deg: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BlockType {
    Structural,
    Sprite(SpriteKind),
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct BlockFlags: u8 {
        /// The player may enter the square.
        const ENTRANCE = 0x01;
        /// Instances live in the movable list instead of the grid.
        const MOVABLE  = 0x02;
        /// Instances start collidable.
        const SOLID    = 0x04;
    }
}

/*----------------------------- BlockDef -----------------------------*/

/// Immutable block template shared by every instance.
#[derive(Clone, Debug)]
pub struct BlockDef {
    pub name: String,
    /// Local-space vertices, `0 ..= UNITS_PER_BLOCK` on each axis.
    pub vertices: Vec<Vec3>,
    pub polygons: Vec<Polygon>,
    pub parts: Vec<Part>,
    pub bsp: Option<BspTree>,
    pub kind: BlockType,
    pub flags: BlockFlags,
    pub light: Option<LightTemplate>,
    pub sound: Option<SoundTemplate>,
    pub popup: Option<PopupTemplate>,
    pub exit: Option<Exit>,
    pub trigger: Option<Trigger>,
}

impl BlockDef {
    /// Assemble a template from raw geometry: planes and centroids are
    /// computed here, a BSP tree is built when `with_bsp` is set.
    pub fn from_parts<S: Into<String>>(
        name: S,
        vertices: Vec<Vec3>,
        mut polygons: Vec<Polygon>,
        parts: Vec<Part>,
        kind: BlockType,
        with_bsp: bool,
    ) -> Self {
        for p in &mut polygons {
            debug_assert!(p.defs.iter().all(|d| (d.vertex as usize) < vertices.len()));
            debug_assert!((p.part as usize) < parts.len());
            p.update_plane(&vertices);
        }
        let bsp = if with_bsp {
            BspTree::build(&polygons, &vertices)
        } else {
            None
        };
        Self {
            name: name.into(),
            vertices,
            polygons,
            parts,
            bsp,
            kind,
            flags: BlockFlags::SOLID,
            light: None,
            sound: None,
            popup: None,
            exit: None,
            trigger: None,
        }
    }

    #[inline]
    pub fn part(&self, id: PartId) -> &Part {
        &self.parts[id as usize]
    }

    #[inline]
    pub fn is_sprite(&self) -> bool {
        matches!(self.kind, BlockType::Sprite(_))
    }

    #[inline]
    pub fn is_movable(&self) -> bool {
        self.flags.contains(BlockFlags::MOVABLE)
    }
}

/*------------------------------ Block -------------------------------*/

/// Per-instance mutable state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlockState {
    /// Heading the sprite vertices are currently rotated to, in degrees.
    pub sprite_angle: f32,
    /// Animation clock origin in milliseconds.
    pub start_ms: u64,
    pub solid: bool,
}

/// A template placed at a world translation.
#[derive(Clone, Debug)]
pub struct Block {
    pub def: Arc<BlockDef>,
    /// World position of the local origin.
    pub origin: Vec3,
    /// Local-space vertices; sprites rotate their copy every frame.
    pub vertices: Vec<Vec3>,
    /// Per-instance polygons: own activity flags and texture coordinates.
    pub polygons: Vec<Polygon>,
    pub state: BlockState,
}

impl Block {
    pub fn new(def: Arc<BlockDef>, origin: Vec3) -> Self {
        let vertices = def.vertices.clone();
        let mut polygons = def.polygons.clone();
        for poly in &mut polygons {
            let part = def.part(poly.part);
            apply_texture_style(poly, part, &vertices, origin);
        }
        let state = BlockState {
            sprite_angle: 0.0,
            start_ms: 0,
            solid: def.flags.contains(BlockFlags::SOLID),
        };
        Self {
            def,
            origin,
            vertices,
            polygons,
            state,
        }
    }

    #[inline]
    pub fn world_vertex(&self, id: VertexId) -> Vec3 {
        self.origin + self.vertices[id as usize]
    }

    /// World-space bounding box: one grid square from the origin.
    #[inline]
    pub fn bbox(&self) -> (Vec3, Vec3) {
        (self.origin, self.origin + Vec3::splat(UNITS_PER_BLOCK))
    }

    pub fn active_polygons(&self) -> usize {
        self.polygons.iter().filter(|p| p.active).count()
    }

    /// Rotate a sprite's quad about the vertical axis through the square
    /// centre so that it faces heading `deg`, then refresh the planes.
    pub fn orient_sprite(&mut self, deg: f32) {
        if !self.def.is_sprite() {
            return;
        }
        let deg = math::normalise_angle(deg);
        if deg == self.state.sprite_angle {
            return;
        }
        self.state.sprite_angle = deg;
        let (s, c) = (math::sine(deg), math::cosine(deg));
        let centre = Vec2::splat(UNITS_PER_BLOCK * 0.5);
        for (dst, src) in self.vertices.iter_mut().zip(&self.def.vertices) {
            let dx = src.x - centre.x;
            let dz = src.z - centre.y;
            dst.x = centre.x + dx * c + dz * s;
            dst.z = centre.y - dx * s + dz * c;
            dst.y = src.y;
        }
        for poly in &mut self.polygons {
            poly.update_plane(&self.vertices);
        }
    }
}

/// Fix per-instance texture coordinates according to the part's style.
fn apply_texture_style(poly: &mut Polygon, part: &Part, vertices: &[Vec3], origin: Vec3) {
    if part.style == TextureStyle::Tiled {
        let n = poly.plane.normal.abs();
        for d in poly.defs.iter_mut() {
            let p = (origin + vertices[d.vertex as usize]) / UNITS_PER_BLOCK;
            // project onto the plane of the dominant normal axis
            let (u, v) = if n.x >= n.y && n.x >= n.z {
                (p.z, -p.y)
            } else if n.y >= n.z {
                (p.x, -p.z)
            } else {
                (p.x, -p.y)
            };
            d.u = u;
            d.v = v;
        }
    }
    if let Some(angle) = part.angle {
        let (s, c) = (math::sine(angle), math::cosine(angle));
        for d in poly.defs.iter_mut() {
            let (du, dv) = (d.u - 0.5, d.v - 0.5);
            d.u = 0.5 + du * c - dv * s;
            d.v = 0.5 + du * s + dv * c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::shapes;

    #[test]
    fn opposite_directions_cancel() {
        for d in Direction::ALL {
            let (a, b, c) = d.offset();
            let (x, y, z) = d.opposite().offset();
            assert_eq!((a + x, b + y, c + z), (0, 0, 0));
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn tiled_uvs_follow_world_position() {
        let mut part = Part::coloured("tile", [200, 200, 200]);
        part.style = TextureStyle::Tiled;
        let def = Arc::new(shapes::cube("cube", part));
        let a = Block::new(def.clone(), Vec3::ZERO);
        let b = Block::new(def, Vec3::new(UNITS_PER_BLOCK, 0.0, 0.0));
        let south = |blk: &Block| {
            blk.polygons
                .iter()
                .find(|p| p.side == Some(Direction::South))
                .unwrap()
                .defs
                .iter()
                .map(|d| d.u)
                .fold(f32::MIN, f32::max)
        };
        // the neighbour continues where the first block's texture ends
        assert!((south(&b) - south(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rotation_keeps_uv_centre() {
        let mut part = Part::coloured("rot", [1, 2, 3]);
        part.angle = Some(90.0);
        let mut poly = Polygon::new(&[VertexDef::new(0, 0.5, 0.5), VertexDef::new(1, 1.0, 0.5)], 0, None);
        apply_texture_style(&mut poly, &part, &[Vec3::ZERO, Vec3::X], Vec3::ZERO);
        assert!((poly.defs[0].u - 0.5).abs() < 1e-6 && (poly.defs[0].v - 0.5).abs() < 1e-6);
        assert!((poly.defs[1].u - 0.5).abs() < 1e-5 && (poly.defs[1].v - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sprite_orientation_updates_plane() {
        let def = Arc::new(shapes::sprite(
            "tree",
            Part::coloured("leaf", [0, 255, 0]),
            SpriteKind::Facing,
        ));
        let mut blk = Block::new(def, Vec3::ZERO);
        blk.orient_sprite(90.0);
        let n = blk.polygons[0].plane.normal;
        assert!(n.y.abs() < 1e-5);
        assert!(n.z.abs() < 1e-4, "normal {n:?} should be along x");
        blk.orient_sprite(0.0);
        assert!(blk.polygons[0].plane.normal.x.abs() < 1e-4);
    }
}
