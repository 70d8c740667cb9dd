pub mod activation;
pub mod arena;
pub mod bsp;
mod camera;
mod geometry;
pub mod light;
pub mod map;
pub mod math;
pub mod popup;
pub mod shapes;
mod spot;
mod texture;

pub use geometry::{
    Block, BlockDef, BlockFlags, BlockState, BlockType, Direction, FaceMode, Part, PartId,
    Polygon, PolygonId, Rgb, SoundTemplate, SpriteKind, TextureStyle, UNITS_PER_BLOCK, VertexDef,
    VertexId,
};

pub use camera::{Camera, MAX_FOV, MAX_PITCH, MIN_FOV};

pub use light::{Light, LightKind, LightList, LightStyle, LightTemplate};
pub use map::{Map, MapError, Square};
pub use popup::{Exit, Placement, Popup, PopupTemplate, PopupTrigger, SquareCoord, Trigger, TriggerKind};
pub use spot::{Orb, Sky, Spot};

pub use texture::{
    NO_TEXTURE, Pixmap, PixmapRef, SIZE_CLASSES, TEXELS_PER_BLOCK, Texture, TextureBank,
    TextureError, TextureId,
};
