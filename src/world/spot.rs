//! The loaded world: grid, movables, lights, popups, textures and the
//! backdrop (sky, orb, ambient light).
//!
//! Everything here belongs to the spot and is torn down with it; arenas are
//! dropped wholesale.

use std::{collections::HashMap, sync::Arc};

use glam::Vec3;
use log::{debug, info};

use crate::world::{
    activation,
    arena::Arena,
    geometry::{Block, BlockDef, Rgb},
    light::{Light, LightHandle, LightList},
    map::{Map, MapError, MovableHandle},
    popup::{Popup, PopupHandle, PopupTemplate, SquareCoord},
    texture::{TextureBank, TextureId},
};

/// Backdrop filling the screen before any geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sky {
    pub texture: Option<TextureId>,
    pub colour: Rgb,
}

/// The global directional light and its on-screen glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orb {
    /// Direction the light travels (from the orb towards the world).
    pub dir: Vec3,
    /// 0–255 per channel.
    pub colour: Vec3,
    pub texture: Option<TextureId>,
    /// Angular diameter of the glyph, degrees.
    pub size_deg: f32,
}

impl Orb {
    /// Orb shining from the sky at heading `yaw`, elevation `elevation`.
    pub fn from_angles(yaw: f32, elevation: f32, colour: Vec3) -> Self {
        use crate::world::math::{cosine, sine};
        let to_orb = Vec3::new(
            sine(yaw) * cosine(elevation),
            sine(elevation),
            cosine(yaw) * cosine(elevation),
        );
        Self {
            dir: -to_orb,
            colour,
            texture: None,
            size_deg: 8.0,
        }
    }
}

pub struct Spot {
    pub map: Map,
    pub lights: LightList,
    pub popups: Arena<Popup>,
    pub textures: TextureBank,
    pub sky: Option<Sky>,
    pub orb: Option<Orb>,
    /// Flat additive light, 0–255 per channel.
    pub ambient: Vec3,
    /// The player's own sprite, drawn after everything else.
    pub player: Option<Block>,
    /// Lights brought along by movables, released with them.
    movable_lights: HashMap<MovableHandle, LightHandle>,
}

impl Spot {
    pub fn new(map: Map, textures: TextureBank) -> Self {
        Self {
            map,
            lights: LightList::new(),
            popups: Arena::new(),
            textures,
            sky: None,
            orb: None,
            ambient: Vec3::splat(64.0),
            player: None,
            movable_lights: HashMap::new(),
        }
    }

    /// Instantiate `def` on a square and copy its templates onto the square.
    ///
    /// With `activate` set the new block is immediately merged with its
    /// neighbours; bulk loaders pass `false` and call
    /// [`Spot::finish_load`] afterwards.
    pub fn place_block(
        &mut self,
        def: &Arc<BlockDef>,
        at: SquareCoord,
        activate: bool,
    ) -> Result<(), MapError> {
        let origin = Map::square_origin(at.0, at.1, at.2);
        let block = Block::new(def.clone(), origin);
        self.map.put_block(at.0, at.1, at.2, block)?;

        let light = def
            .light
            .as_ref()
            .map(|t| self.lights.add(Light::from_template(t, origin)));
        let popup = def.popup.clone().map(|template| {
            self.popups.acquire(Popup {
                template,
                square: Some(at),
            })
        });
        if let Some(sq) = self.map.get_square_mut(at.0, at.1, at.2) {
            sq.trigger = def.trigger.clone();
            sq.exit = def.exit.clone();
            sq.sound = def.sound.clone();
            sq.popup = popup;
            sq.light = light;
        }

        if activate {
            activation::set_active_polygons(&mut self.map, at, true);
        }
        Ok(())
    }

    /// Remove the block on `at` together with everything it brought along.
    pub fn remove_block(&mut self, at: SquareCoord) -> Result<Option<Block>, MapError> {
        activation::reset_active_polygons(&mut self.map, at);
        let sq = self.map.clear_square(at.0, at.1, at.2)?;
        if let Some(h) = sq.light {
            self.lights.remove(h);
        }
        if let Some(h) = sq.popup {
            self.popups.release(h);
        }
        Ok(sq.block)
    }

    pub fn add_movable(&mut self, def: &Arc<BlockDef>, origin: Vec3) -> MovableHandle {
        let h = self.map.add_movable(Block::new(def.clone(), origin));
        if let Some(t) = def.light.as_ref() {
            let light = self.lights.add(Light::from_template(t, origin));
            self.movable_lights.insert(h, light);
        }
        h
    }

    /// Drop a movable and the light it registered. Stale handles yield `None`.
    pub fn remove_movable(&mut self, h: MovableHandle) -> Option<Block> {
        let block = self.map.remove_movable(h)?;
        if let Some(light) = self.movable_lights.remove(&h) {
            self.lights.remove(light);
        }
        Some(block)
    }

    pub fn add_popup(&mut self, template: PopupTemplate) -> PopupHandle {
        self.popups.acquire(Popup::global(template))
    }

    /// Activation pass over the whole grid after a bulk load.
    pub fn finish_load(&mut self) -> usize {
        let off = activation::activate_all(&mut self.map);
        let (c, r, l) = self.map.dims();
        info!(
            "spot ready: {c}×{r}×{l} grid, {} blocks, {} movables, {} lights, {} popups",
            self.map.blocks().count(),
            self.map.movables().count(),
            self.lights.len(),
            self.popups.len()
        );
        debug!("activation: {off} redundant polygons switched off");
        off
    }

    /// Advance time-driven state (light styles). Call between frames.
    pub fn animate(&mut self, elapsed_ms: u64) {
        self.lights.animate(elapsed_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{
        geometry::Part,
        light::{LightKind, LightStyle, LightTemplate},
        popup::{Exit, Placement, PopupTrigger},
        shapes,
    };

    fn lamp() -> Arc<BlockDef> {
        let mut def = shapes::cube("lamp", Part::coloured("brass", [200, 160, 60]));
        def.light = Some(LightTemplate {
            kind: LightKind::Point,
            style: LightStyle::Static,
            colour: Vec3::splat(255.0),
            intensity: 1.0,
            radius: 512.0,
            flood: false,
            offset: Vec3::splat(128.0),
        });
        def.exit = Some(Exit {
            url: "http://example.org/".into(),
            target: None,
        });
        def.popup = Some(PopupTemplate {
            placement: Placement::Centre,
            w: 32,
            h: 16,
            texture: None,
            colour: [0, 0, 0],
            trigger: PopupTrigger::Always,
            exit: None,
        });
        Arc::new(def)
    }

    #[test]
    fn placement_copies_templates_and_removal_cleans_up() {
        let mut spot = Spot::new(Map::new(4, 4, 2).unwrap(), TextureBank::default_with_checker());
        let def = lamp();
        spot.place_block(&def, (1, 2, 0), true).unwrap();
        assert_eq!(spot.lights.len(), 1);
        assert_eq!(spot.popups.len(), 1);
        let sq = spot.map.get_square(1, 2, 0).unwrap();
        assert!(sq.exit.is_some());
        let light = spot.lights.get(sq.light.unwrap()).unwrap();
        assert_eq!(light.pos, Vec3::new(384.0, 128.0, 640.0));

        assert!(spot.remove_block((1, 2, 0)).unwrap().is_some());
        assert!(spot.lights.is_empty());
        assert!(spot.popups.is_empty());
        assert!(spot.map.get_square(1, 2, 0).unwrap().exit.is_none());
    }

    #[test]
    fn removing_a_movable_releases_its_light() {
        let mut spot = Spot::new(Map::new(2, 2, 1).unwrap(), TextureBank::default_with_checker());
        let def = lamp();
        let plain = Arc::new(shapes::cube("crate", Part::coloured("wood", [90, 60, 30])));
        let a = spot.add_movable(&def, Vec3::ZERO);
        let b = spot.add_movable(&plain, Vec3::splat(256.0));
        assert_eq!(spot.lights.len(), 1);

        assert!(spot.remove_movable(b).is_some());
        assert_eq!(spot.lights.len(), 1);
        assert!(spot.remove_movable(a).is_some());
        assert!(spot.lights.is_empty());
        assert_eq!(spot.map.movables().count(), 0);
        assert!(spot.remove_movable(a).is_none());

        // a recycled slot must not inherit the old light
        let c = spot.add_movable(&plain, Vec3::ZERO);
        assert!(spot.remove_movable(c).is_some());
        assert!(spot.lights.is_empty());
    }

    #[test]
    fn incremental_edits_keep_faces_consistent() {
        let mut spot = Spot::new(Map::new(3, 1, 1).unwrap(), TextureBank::default_with_checker());
        let def = Arc::new(shapes::cube("c", Part::coloured("p", [1, 1, 1])));
        spot.place_block(&def, (0, 0, 0), true).unwrap();
        spot.place_block(&def, (2, 0, 0), true).unwrap();
        spot.place_block(&def, (1, 0, 0), true).unwrap();
        let active = |s: &Spot| s.map.blocks().map(|(_, b)| b.active_polygons()).sum::<usize>();
        assert_eq!(active(&spot), 14);
        spot.remove_block((1, 0, 0)).unwrap();
        assert_eq!(active(&spot), 12);
        assert_eq!(
            spot.place_block(&def, (5, 0, 0), true),
            Err(MapError::OutOfBounds(5, 0, 0))
        );
    }

    #[test]
    fn orb_direction_points_away_from_sky() {
        let orb = Orb::from_angles(0.0, 90.0, Vec3::ONE);
        assert!((orb.dir - Vec3::NEG_Y).length() < 1e-5);
    }
}
