use log::{debug, trace};

use crate::{
    config::RenderConfig,
    engine::{
        lighting::Lighting,
        pick::{PickTarget, Selection},
        pipeline::{self, BlockTag, FrameEnv, RenderContext},
        spans::Layer,
        types::{FrameInput, FrameStats},
    },
    error::RenderError,
    renderer::{Renderer, Rgba},
    world::{Camera, Exit, PopupTrigger, SquareCoord, Spot, popup::PopupHandle},
};

pub struct Engine<R: Renderer> {
    renderer: R,
    config: RenderConfig,
    ctx: RenderContext,
    popups: Vec<PopupHandle>,
    selection: Option<Selection>,
    /// Square under the cursor last frame; drives rollover popups.
    rollover: Option<SquareCoord>,
}

impl<R: Renderer> Engine<R> {
    /// Validate `config` and reserve every per-frame pool.
    pub fn new(renderer: R, config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        let ctx = RenderContext::new(&config)?;
        let mut popups = Vec::new();
        popups
            .try_reserve(16)
            .map_err(RenderError::scratch("popup list"))?;
        debug!(
            "engine ready: {}×{} {:?}, far plane {}, {:?} transform",
            config.width,
            config.height,
            renderer.path(),
            config.far_plane,
            config.transform_backend
        );
        Ok(Self {
            renderer,
            config,
            ctx,
            popups,
            selection: None,
            rollover: None,
        })
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Counters of the last rendered frame.
    pub fn stats(&self) -> FrameStats {
        self.ctx.stats
    }

    /// What the cursor was over in the last frame.
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn rollover(&self) -> Option<SquareCoord> {
        self.rollover
    }

    /// Hyperlink behind the current selection, if any.
    pub fn selected_exit<'s>(&self, spot: &'s Spot) -> Option<&'s Exit> {
        match self.selection?.target {
            PickTarget::Square((c, r, l)) => spot.map.get_square(c, r, l)?.exit.as_ref(),
            PickTarget::Popup(h) => spot.popups.get(h)?.template.exit.as_ref(),
            PickTarget::Movable(_) | PickTarget::Player => None,
        }
    }

    /// Draw one frame of `spot` seen through `camera` and hand the finished
    /// buffer to `submit`.
    ///
    /// Sprites are re-oriented towards the eye before anything is drawn,
    /// which is the only change made to the spot.
    pub fn render_frame<F>(&mut self, spot: &mut Spot, camera: &Camera, input: FrameInput, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        let ctx = &mut self.ctx;
        ctx.begin(camera, self.renderer.path(), &input);

        let eye = ctx.viewer.eye;
        pipeline::orient_sprites(spot.map.blocks_mut(), eye, input.elapsed_ms);
        pipeline::orient_sprites(spot.map.movables_mut().map(|(_, b)| b), eye, input.elapsed_ms);
        pipeline::orient_sprites(spot.player.iter_mut(), eye, input.elapsed_ms);
        let spot = &*spot;

        // popups sit on top of everything, so they are offered first
        pipeline::visible_popups(&spot.popups, camera.pos(), self.rollover, &mut self.popups);
        for &h in self.popups.iter().rev() {
            if let Some(p) = spot.popups.get(h).filter(|p| p.is_pickable()) {
                let rect = pipeline::popup_rect(ctx, p, input.mouse);
                ctx.picker.offer_rect(rect, PickTarget::Popup(h));
            }
        }

        let bank = &spot.textures;
        self.renderer.begin_frame(ctx.screen.w, ctx.screen.h);
        if let Some(sky) = &spot.sky {
            pipeline::render_sky(ctx, &mut self.renderer, sky, camera, bank);
        }
        if let Some(orb) = &spot.orb {
            pipeline::render_orb(ctx, &mut self.renderer, orb, camera, bank);
        }

        let env = FrameEnv {
            lighting: Lighting {
                ambient: spot.ambient,
                master: self.config.master_brightness,
                orb: spot.orb.as_ref(),
                lights: &spot.lights,
            },
            bank,
        };
        pipeline::render_blocks_on_map(ctx, &env, &spot.map);
        pipeline::render_movables(ctx, &env, &spot.map);
        if let Some(player) = &spot.player {
            let tag = BlockTag {
                layer: Layer::Late,
                target: PickTarget::Player,
                interactive: false,
            };
            pipeline::render_block(ctx, &env, player, tag);
        }

        pipeline::flush(ctx, &mut self.renderer, bank);
        for &h in &self.popups {
            if let Some(p) = spot.popups.get(h) {
                pipeline::render_popup(ctx, &mut self.renderer, p, input.mouse, bank);
                ctx.stats.popups_drawn += 1;
            }
        }

        self.selection = ctx.picker.selection();
        self.rollover = match self.selection.map(|s| s.target) {
            Some(PickTarget::Square(sq)) => Some(sq),
            // hovering a rollover popup keeps its square rolled over
            Some(PickTarget::Popup(h)) => spot
                .popups
                .get(h)
                .filter(|p| p.template.trigger == PopupTrigger::Rollover)
                .and_then(|p| p.square),
            _ => None,
        };

        self.renderer.end_frame(submit);
        trace!("frame {:?}", ctx.stats);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec3;

    use super::*;
    use crate::{
        renderer::software::Software,
        world::{
            Map, Part, Placement, PopupTemplate, PopupTrigger, TextureBank, shapes,
        },
    };

    fn config() -> RenderConfig {
        RenderConfig {
            width: 160,
            height: 100,
            fov_deg: 90.0,
            ..RenderConfig::default()
        }
    }

    fn corridor() -> Spot {
        let mut spot = Spot::new(Map::new(3, 6, 1).unwrap(), TextureBank::default_with_checker());
        let def = Arc::new(shapes::cube("wall", Part::coloured("stone", [200, 200, 200])));
        spot.place_block(&def, (1, 3, 0), false).unwrap();
        spot.finish_load();
        spot
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = RenderConfig {
            width: 0,
            ..config()
        };
        assert!(matches!(
            Engine::new(Software::<crate::renderer::Argb8888>::default(), cfg),
            Err(RenderError::Config(_))
        ));
    }

    #[test]
    fn renders_and_picks_the_block_ahead() {
        let mut spot = corridor();
        let mut engine = Engine::new(Software::<crate::renderer::Argb8888>::default(), config()).unwrap();
        let cam = Camera::new(Vec3::new(384.0, 128.0, 128.0), 0.0, 90.0);
        let input = FrameInput {
            elapsed_ms: 0,
            mouse: Some((80, 50)),
        };
        let mut centre = 0;
        engine.render_frame(&mut spot, &cam, input, |fb, w, h| {
            centre = fb[h / 2 * w + w / 2];
        });
        assert_ne!(centre, 0xFF_202020);
        let stats = engine.stats();
        assert_eq!(stats.blocks_visited, 1);
        assert_eq!(stats.polygons_drawn, 1);
        assert_eq!(
            engine.selection().map(|s| s.target),
            Some(PickTarget::Square((1, 3, 0)))
        );
        assert_eq!(engine.rollover(), Some((1, 3, 0)));
    }

    #[test]
    fn popups_are_drawn_and_win_the_pick() {
        let mut spot = corridor();
        let h = spot.add_popup(PopupTemplate {
            placement: Placement::TopLeft,
            w: 20,
            h: 10,
            texture: None,
            colour: [0, 255, 0],
            trigger: PopupTrigger::Always,
            exit: Some(Exit {
                url: "http://example.org/".into(),
                target: None,
            }),
        });
        let mut engine = Engine::new(Software::<crate::renderer::Argb8888>::default(), config()).unwrap();
        let cam = Camera::new(Vec3::new(384.0, 128.0, 128.0), 0.0, 90.0);
        let input = FrameInput {
            elapsed_ms: 0,
            mouse: Some((5, 5)),
        };
        let mut corner = 0;
        engine.render_frame(&mut spot, &cam, input, |fb, _, _| corner = fb[0]);
        assert_eq!(corner, 0xFF_00FF00);
        assert_eq!(engine.stats().popups_drawn, 1);
        assert_eq!(engine.selection().map(|s| s.target), Some(PickTarget::Popup(h)));
        assert_eq!(
            engine.selected_exit(&spot).map(|e| e.url.as_str()),
            Some("http://example.org/")
        );
    }
}
