//! End-to-end frames through the public API: one spot, one camera, one
//! renderer, then look at the pixels and the frame counters.

use std::sync::Arc;

use glam::Vec3;

use blockspot::{
    RenderConfig,
    engine::{Engine, FrameInput, PickTarget, lighting::Lighting},
    renderer::{
        Argb8888,
        hardware::{GpuDevice, Hardware, HwVertex},
        software::Software,
    },
    world::{
        Camera, Exit, Light, LightList, Map, Part, Pixmap, Placement, PopupTemplate, PopupTrigger, Spot,
        TextureBank, shapes,
    },
};

const CLEAR: u32 = 0xFF_000000;
const WHITE: u32 = 0xFF_FFFFFF;

fn config() -> RenderConfig {
    RenderConfig {
        width: 160,
        height: 100,
        fov_deg: 90.0,
        far_plane: 4096.0,
        ..RenderConfig::default()
    }
}

fn software() -> Engine<Software<Argb8888>> {
    Engine::new(Software::new(CLEAR), config()).unwrap()
}

fn white_cube() -> Arc<blockspot::world::BlockDef> {
    Arc::new(shapes::cube("cube", Part::coloured("white", [255, 255, 255])))
}

fn lit_spot(columns: u32, rows: u32) -> Spot {
    let mut spot = Spot::new(
        Map::new(columns, rows, 1).unwrap(),
        TextureBank::default_with_checker(),
    );
    spot.ambient = Vec3::splat(255.0);
    spot
}

/// `(y, first, last)` of the non-clear run on every covered row; panics on
/// a row with a gap.
fn covered_rows(fb: &[u32], w: usize, h: usize) -> Vec<(usize, usize, usize)> {
    let mut rows = Vec::new();
    for y in 0..h {
        let row = &fb[y * w..(y + 1) * w];
        let lit: Vec<usize> = (0..w).filter(|&x| row[x] != CLEAR).collect();
        if let (Some(&a), Some(&b)) = (lit.first(), lit.last()) {
            assert_eq!(b - a + 1, lit.len(), "row {y} has a gap");
            rows.push((y, a, b));
        }
    }
    rows
}

#[test]
fn single_cube_fills_one_run_per_row() {
    let mut spot = lit_spot(1, 1);
    spot.place_block(&white_cube(), (0, 0, 0), true).unwrap();
    let cam = Camera::new(Vec3::new(128.0, 128.0, -384.0), 0.0, 90.0);
    let mut engine = software();

    let mut rows = Vec::new();
    let mut centre = 0;
    engine.render_frame(&mut spot, &cam, FrameInput::default(), |fb, w, h| {
        rows = covered_rows(fb, w, h);
        centre = fb[h / 2 * w + w / 2];
    });
    assert_eq!(centre, WHITE);

    // the south face spans 80 ± 26.7 pixels both ways
    assert_eq!(rows.len(), 54);
    assert_eq!(rows.first().map(|r| r.0), Some(23));
    assert_eq!(rows.last().map(|r| r.0), Some(76));
    assert!(rows.iter().all(|&(_, a, b)| (a, b) == (53, 106)));

    let stats = engine.stats();
    assert_eq!(stats.polygons_drawn, 1);
    assert_eq!(stats.spans_emitted, 54);
}

#[test]
fn adjacent_blocks_drop_their_shared_faces() {
    let cube = white_cube();
    let cam = Camera::new(Vec3::new(256.0, 128.0, -512.0), 0.0, 90.0);

    let mut separate = lit_spot(2, 1);
    separate.place_block(&cube, (0, 0, 0), false).unwrap();
    separate.place_block(&cube, (1, 0, 0), false).unwrap();

    let mut merged = lit_spot(2, 1);
    merged.place_block(&cube, (0, 0, 0), false).unwrap();
    merged.place_block(&cube, (1, 0, 0), false).unwrap();
    assert_eq!(merged.finish_load(), 2);

    let active = |s: &Spot| s.map.blocks().map(|(_, b)| b.active_polygons()).sum::<usize>();
    assert_eq!(active(&separate) - active(&merged), 2);

    let mut engine = software();
    let mut frames = Vec::new();
    for spot in [&mut separate, &mut merged] {
        let mut rows = Vec::new();
        engine.render_frame(spot, &cam, FrameInput::default(), |fb, w, h| {
            rows = covered_rows(fb, w, h);
        });
        frames.push((rows, engine.stats()));
    }
    let (sep_rows, sep_stats) = &frames[0];
    let (rows, stats) = &frames[1];

    assert_eq!(sep_stats.polygons_submitted, 12);
    assert_eq!(stats.polygons_submitted, 10);
    // two south faces, no seam between them
    assert_eq!(stats.polygons_drawn, 2);
    assert!(!rows.is_empty());
    assert_eq!(rows, sep_rows);
}

#[test]
fn blocks_past_the_far_plane_are_culled() {
    let mut spot = lit_spot(1, 30);
    spot.place_block(&white_cube(), (0, 2, 0), true).unwrap();
    spot.place_block(&white_cube(), (0, 25, 0), true).unwrap();
    let cam = Camera::new(Vec3::new(128.0, 128.0, 0.0), 0.0, 90.0);
    let mut engine = software();
    engine.render_frame(&mut spot, &cam, FrameInput::default(), |_, _, _| {});

    let stats = engine.stats();
    assert_eq!(stats.blocks_visited, 2);
    assert_eq!(stats.blocks_culled, 1);
    assert_eq!(stats.polygons_drawn, 1);
}

#[test]
fn point_light_fades_out_at_its_radius() {
    let mut lights = LightList::new();
    lights.add(Light::point(Vec3::ZERO, Vec3::splat(255.0), 512.0));
    let lighting = Lighting {
        ambient: Vec3::ZERO,
        master: 0.0,
        orb: None,
        lights: &lights,
    };
    let at_radius = lighting.light_point(Vec3::new(512.0, 0.0, 0.0), Vec3::NEG_X);
    assert!(at_radius.max_element() < 0.1, "{at_radius:?}");
    let beyond = lighting.light_point(Vec3::new(0.0, 600.0, 0.0), Vec3::NEG_Y);
    assert_eq!(beyond, Vec3::ZERO);
    let halfway = lighting.light_point(Vec3::new(256.0, 0.0, 0.0), Vec3::NEG_X);
    assert!((halfway.x - 127.5).abs() < 1.0, "{halfway:?}");
    // facing away from the light
    let away = lighting.light_point(Vec3::new(256.0, 0.0, 0.0), Vec3::X);
    assert_eq!(away, Vec3::ZERO);
}

#[test]
fn rollover_popup_follows_the_cursor() {
    let mut def = shapes::cube("kiosk", Part::coloured("white", [255, 255, 255]));
    def.popup = Some(PopupTemplate {
        placement: Placement::TopLeft,
        w: 10,
        h: 10,
        texture: None,
        colour: [255, 0, 0],
        trigger: PopupTrigger::Rollover,
        exit: None,
    });
    let mut spot = lit_spot(1, 3);
    spot.place_block(&Arc::new(def), (0, 2, 0), true).unwrap();
    let cam = Camera::new(Vec3::new(128.0, 128.0, 0.0), 0.0, 90.0);
    let mut engine = software();
    let hover = FrameInput {
        elapsed_ms: 0,
        mouse: Some((80, 50)),
    };

    engine.render_frame(&mut spot, &cam, hover, |_, _, _| {});
    assert_eq!(engine.stats().popups_drawn, 0);
    assert_eq!(
        engine.selection().map(|s| s.target),
        Some(PickTarget::Square((0, 2, 0)))
    );

    let mut corner = 0;
    engine.render_frame(&mut spot, &cam, hover, |fb, _, _| corner = fb[0]);
    assert_eq!(engine.stats().popups_drawn, 1);
    assert_eq!(corner, 0xFF_FF0000);

    // cursor leaves: the popup goes one frame later
    let away = FrameInput {
        elapsed_ms: 0,
        mouse: None,
    };
    engine.render_frame(&mut spot, &cam, away, |_, _, _| {});
    engine.render_frame(&mut spot, &cam, away, |_, _, _| {});
    assert_eq!(engine.stats().popups_drawn, 0);
}

fn kiosk_spot(placement: Placement, exit: Option<Exit>) -> Spot {
    let mut def = shapes::cube("kiosk", Part::coloured("white", [255, 255, 255]));
    def.popup = Some(PopupTemplate {
        placement,
        w: 10,
        h: 10,
        texture: None,
        colour: [255, 0, 0],
        trigger: PopupTrigger::Rollover,
        exit,
    });
    let mut spot = lit_spot(1, 3);
    spot.place_block(&Arc::new(def), (0, 2, 0), true).unwrap();
    spot
}

#[test]
fn rollover_popup_at_the_cursor_stays_up() {
    let mut spot = kiosk_spot(Placement::Mouse, None);
    let cam = Camera::new(Vec3::new(128.0, 128.0, 0.0), 0.0, 90.0);
    let mut engine = software();
    let hover = FrameInput {
        elapsed_ms: 0,
        mouse: Some((80, 50)),
    };
    let mut drawn = Vec::new();
    let mut at_cursor = 0;
    for _ in 0..6 {
        engine.render_frame(&mut spot, &cam, hover, |fb, w, _| at_cursor = fb[50 * w + 80]);
        drawn.push(engine.stats().popups_drawn);
    }
    assert_eq!(drawn, vec![0, 1, 1, 1, 1, 1]);
    assert_eq!(at_cursor, 0xFF_FF0000);
    assert_eq!(
        engine.selection().map(|s| s.target),
        Some(PickTarget::Square((0, 2, 0)))
    );
}

#[test]
fn hovering_a_linked_rollover_popup_keeps_it_open() {
    let exit = Exit {
        url: "http://example.org/kiosk".into(),
        target: None,
    };
    let mut spot = kiosk_spot(Placement::TopLeft, Some(exit));
    let cam = Camera::new(Vec3::new(128.0, 128.0, 0.0), 0.0, 90.0);
    let mut engine = software();
    let at = |x, y| FrameInput {
        elapsed_ms: 0,
        mouse: Some((x, y)),
    };

    engine.render_frame(&mut spot, &cam, at(80, 50), |_, _, _| {});
    engine.render_frame(&mut spot, &cam, at(80, 50), |_, _, _| {});
    assert_eq!(engine.stats().popups_drawn, 1);

    // the cursor moves off the block onto the popup itself
    for _ in 0..3 {
        engine.render_frame(&mut spot, &cam, at(5, 5), |_, _, _| {});
        assert_eq!(engine.stats().popups_drawn, 1);
        assert!(matches!(
            engine.selection().map(|s| s.target),
            Some(PickTarget::Popup(_))
        ));
    }
    assert_eq!(engine.rollover(), Some((0, 2, 0)));
    assert_eq!(
        engine.selected_exit(&spot).map(|e| e.url.as_str()),
        Some("http://example.org/kiosk")
    );
}

#[test]
fn see_through_texels_show_what_is_behind() {
    let mut bank = TextureBank::default_with_checker();
    // clear vertical band through the middle, opaque white either side
    let px = (0..16 * 16)
        .map(|i| if (4..12).contains(&(i % 16)) { 0 } else { 0xFF_FFFFFF })
        .collect();
    let tex = bank
        .insert(blockspot::world::Texture::still("half", Pixmap::new(16, 16, px).unwrap()))
        .unwrap();
    let mut spot = Spot::new(Map::new(1, 4, 1).unwrap(), bank);
    spot.ambient = Vec3::splat(255.0);
    spot.place_block(
        &Arc::new(shapes::cube("screen", Part::textured("half", tex))),
        (0, 1, 0),
        true,
    )
    .unwrap();
    spot.place_block(
        &Arc::new(shapes::cube("back", Part::coloured("blue", [0, 0, 255]))),
        (0, 3, 0),
        true,
    )
    .unwrap();
    let cam = Camera::new(Vec3::new(128.0, 128.0, -256.0), 0.0, 90.0);
    let mut engine = software();
    let mut row = Vec::new();
    engine.render_frame(&mut spot, &cam, FrameInput::default(), |fb, w, h| {
        row = fb[h / 2 * w..(h / 2 + 1) * w].to_vec();
    });
    // front face covers x 60..100, back face 67..93, blue block 70..90
    // the blue block through the clear band of both the front and back faces
    assert_eq!(row[80], 0xFF_0000FF);
    // opaque border of the front face
    assert_eq!(row[62], WHITE);
    assert_eq!(row[97], WHITE);
    // clear on the front face, opaque border of the back face
    assert_eq!(row[72], WHITE);
    assert_eq!(row[5], CLEAR);
}

#[derive(Default)]
struct CountingDevice {
    polygons: usize,
    quads: usize,
    uploads: usize,
    frames: usize,
}

impl GpuDevice for CountingDevice {
    type Texture = u32;

    fn begin_frame(&mut self, _width: usize, _height: usize) {}
    fn upload_texture(&mut self, _pixmap: &Pixmap) -> u32 {
        self.uploads += 1;
        self.uploads as u32
    }
    fn upload_vertices(&mut self, verts: &[HwVertex]) {
        assert!(verts.len() >= 3);
    }
    fn bind_texture(&mut self, _texture: Option<u32>) {}
    fn draw_polygon(&mut self, _blend: bool) {
        self.polygons += 1;
    }
    fn draw_2d_quad(&mut self, _corners: [HwVertex; 4]) {
        self.quads += 1;
    }
    fn end_frame(&mut self) {
        self.frames += 1;
    }
}

#[test]
fn hardware_path_issues_draw_calls() {
    let mut spot = lit_spot(1, 1);
    spot.place_block(&white_cube(), (0, 0, 0), true).unwrap();
    let cam = Camera::new(Vec3::new(128.0, 128.0, -384.0), 0.0, 90.0);
    let mut engine = Engine::new(Hardware::new(CountingDevice::default()), config()).unwrap();
    let mut buffer_len = None;
    engine.render_frame(&mut spot, &cam, FrameInput::default(), |fb, _, _| {
        buffer_len = Some(fb.len());
    });
    assert_eq!(buffer_len, Some(0));
    let dev = engine.renderer().device();
    assert_eq!(dev.polygons, 1);
    assert_eq!(dev.quads, 0);
    assert_eq!(dev.frames, 1);
    assert_eq!(engine.stats().polygons_drawn, 1);
}
