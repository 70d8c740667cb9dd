//! Stock block templates: the unit cube and the single-quad sprite.

use glam::Vec3;

use crate::world::geometry::{
    BlockDef, BlockType, Direction, FaceMode, Part, PartId, Polygon, SpriteKind, UNITS_PER_BLOCK,
    VertexDef,
};

const U: f32 = UNITS_PER_BLOCK;

/// Cube corners, bit 0 = +x, bit 1 = +y, bit 2 = +z (in this order:
/// bottom ring then top ring).
fn cube_vertices() -> Vec<Vec3> {
    vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(U, 0.0, 0.0),
        Vec3::new(U, U, 0.0),
        Vec3::new(0.0, U, 0.0),
        Vec3::new(0.0, 0.0, U),
        Vec3::new(U, 0.0, U),
        Vec3::new(U, U, U),
        Vec3::new(0.0, U, U),
    ]
}

/// Corner indices per face, clockwise seen from outside, starting at the
/// bottom-left corner.
fn face_corners(dir: Direction) -> [u16; 4] {
    match dir {
        Direction::South => [0, 3, 2, 1],
        Direction::North => [5, 6, 7, 4],
        Direction::West => [4, 7, 3, 0],
        Direction::East => [1, 2, 6, 5],
        Direction::Up => [3, 7, 6, 2],
        Direction::Down => [4, 0, 1, 5],
    }
}

const QUAD_UV: [(f32, f32); 4] = [(0.0, 1.0), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];

fn quad(corners: [u16; 4], part: PartId, side: Option<Direction>) -> Polygon {
    let defs: Vec<VertexDef> = corners
        .iter()
        .zip(QUAD_UV)
        .map(|(&v, (u, t))| VertexDef::new(v, u, t))
        .collect();
    Polygon::new(&defs, part, side)
}

/// Solid cube, one part on every face.
pub fn cube<S: Into<String>>(name: S, part: Part) -> BlockDef {
    cube_with(name, vec![part], [0; 6])
}

/// Solid cube with a part per face, `face_parts` ordered like
/// [`Direction::ALL`].
pub fn cube_with<S: Into<String>>(name: S, parts: Vec<Part>, face_parts: [PartId; 6]) -> BlockDef {
    let polygons = Direction::ALL
        .iter()
        .zip(face_parts)
        .map(|(&dir, part)| quad(face_corners(dir), part, Some(dir)))
        .collect();
    BlockDef::from_parts(
        name,
        cube_vertices(),
        polygons,
        parts,
        BlockType::Structural,
        true,
    )
}

/// Upright quad through the square centre, facing south at heading 0.
pub fn sprite<S: Into<String>>(name: S, mut part: Part, kind: SpriteKind) -> BlockDef {
    part.faces = FaceMode::Double;
    let c = U * 0.5;
    let vertices = vec![
        Vec3::new(0.0, 0.0, c),
        Vec3::new(0.0, U, c),
        Vec3::new(U, U, c),
        Vec3::new(U, 0.0, c),
    ];
    let polygons = vec![quad([0, 1, 2, 3], 0, None)];
    let mut def = BlockDef::from_parts(
        name,
        vertices,
        polygons,
        vec![part],
        BlockType::Sprite(kind),
        false,
    );
    def.flags.remove(crate::world::geometry::BlockFlags::SOLID);
    def
}
