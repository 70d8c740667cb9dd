//! Walk through a procedurally built demo spot with the software renderer.
//!
//! Controls  ↑/↓ or W/S move · ←/→ turn · A/D strafe · PgUp/PgDn look
//!           Space/C rise/sink · Esc quit
//!
//! ```bash
//! cargo run --release --bin view_sw -- --config view.toml --width 800
//! ```

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use glam::Vec3;
use log::info;
use minifb::{Key, Window, WindowOptions};

use blockspot::{
    RenderConfig,
    engine::{Engine, FrameInput},
    renderer::software::Software,
    world::{
        BlockDef, BlockFlags, Camera, Exit, LightKind, LightStyle, LightTemplate, Map, Orb, Part,
        Pixmap, Placement, PopupTemplate, PopupTrigger, Sky, SpriteKind, Spot, Texture,
        TextureBank, TextureError, TextureId, Trigger, TriggerKind, UNITS_PER_BLOCK, shapes,
    },
};

const MOVE_SPEED: f32 = 12.0;
const TURN_SPEED: f32 = 2.5;
const EYE_HEIGHT: f32 = 160.0;

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    /// Renderer settings (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Window width override
    #[arg(long)]
    width: Option<usize>,

    /// Window height override
    #[arg(long)]
    height: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let mut cfg = match &opts.config {
        Some(path) => RenderConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RenderConfig::default(),
    };
    cfg.width = opts.width.unwrap_or(cfg.width);
    cfg.height = opts.height.unwrap_or(cfg.height);
    let [r, g, b] = cfg.clear_color;
    let clear = 0xFF00_0000 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);

    let mut spot = demo_spot()?;
    let mut camera = Camera::new(
        Vec3::new(6.5 * UNITS_PER_BLOCK, UNITS_PER_BLOCK + EYE_HEIGHT, 1.5 * UNITS_PER_BLOCK),
        0.0,
        cfg.fov_deg,
    );
    let (w, h) = (cfg.width, cfg.height);
    let mut engine = Engine::new(Software::<blockspot::renderer::Argb8888>::new(clear), cfg)?;

    let mut win = Window::new("blockspot", w, h, WindowOptions::default())?;
    win.set_target_fps(60);

    // ────────────────── benchmarking state ──────────────────────────────
    let start = Instant::now();
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();
    let mut last_title = String::new();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let t0 = Instant::now();

        /* movement --------------------------------------------------------- */
        let mut forward = 0.0;
        let mut side = 0.0;
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += MOVE_SPEED;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= MOVE_SPEED;
        }
        if win.is_key_down(Key::A) {
            side -= MOVE_SPEED;
        }
        if win.is_key_down(Key::D) {
            side += MOVE_SPEED;
        }
        if win.is_key_down(Key::Left) {
            camera.turn(-TURN_SPEED);
        }
        if win.is_key_down(Key::Right) {
            camera.turn(TURN_SPEED);
        }
        if win.is_key_down(Key::PageUp) {
            camera.look(TURN_SPEED);
        }
        if win.is_key_down(Key::PageDown) {
            camera.look(-TURN_SPEED);
        }
        if win.is_key_down(Key::Space) {
            camera.rise(MOVE_SPEED);
        }
        if win.is_key_down(Key::C) {
            camera.rise(-MOVE_SPEED);
        }
        camera.step(forward, side);

        /* draw ------------------------------------------------------------- */
        let elapsed_ms = start.elapsed().as_millis() as u64;
        spot.animate(elapsed_ms);
        let input = FrameInput {
            elapsed_ms,
            mouse: win
                .get_mouse_pos(minifb::MouseMode::Discard)
                .map(|(x, y)| (x as i32, y as i32)),
        };
        let mut shown = Ok(());
        engine.render_frame(&mut spot, &camera, input, |fb, w, h| {
            shown = win.update_with_buffer(fb, w, h);
        });
        shown?;
        camera.commit();

        let title = match (engine.selected_exit(&spot), engine.selection()) {
            (Some(exit), _) => format!("blockspot · {}", exit.url),
            (None, Some(sel)) => format!("blockspot · {:?}", sel.target),
            (None, None) => "blockspot".to_string(),
        };
        if title != last_title {
            win.set_title(&title);
            last_title = title;
        }

        // ─────────── accumulate & report every ~3 s ────────────────────
        acc_time += t0.elapsed();
        acc_frames += 1;
        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames as f64;
            info!(
                "avg frame: {:.2} ms ({:.1} FPS) {:?}",
                avg_ms,
                1000.0 / avg_ms,
                engine.stats()
            );
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}

/*────────────────────────── demo content ──────────────────────────────*/

fn demo_spot() -> anyhow::Result<Spot> {
    let mut bank = TextureBank::default_with_checker();
    let brick = bank.insert(Texture::still("brick", brick_pixmap()?))?;
    let grass = bank.insert(Texture::still("grass", noise_pixmap(0xFF_3A7D2C, 32)?))?;
    let fence = bank.insert(Texture::still("fence", fence_pixmap()?))?;
    let sky = bank.insert(Texture::still("sky", sky_pixmap()?))?;
    let lava = bank.insert(Texture::animated(
        "lava",
        (0..4)
            .map(|i| noise_pixmap(0xFF_C04010 + i * 0x0000_1000, 16))
            .collect::<Result<Vec<_>, _>>()?,
        250,
    )?)?;

    let (cols, rows) = (14, 14);
    let mut spot = Spot::new(Map::new(cols, rows, 3)?, bank);
    spot.sky = Some(Sky {
        texture: Some(sky),
        colour: [90, 140, 220],
    });
    spot.orb = Some(Orb::from_angles(135.0, 40.0, Vec3::new(140.0, 130.0, 110.0)));
    spot.ambient = Vec3::splat(70.0);

    let floor = Arc::new(textured_cube("floor", grass));
    let wall = Arc::new(textured_cube("wall", brick));
    let pool = Arc::new(textured_cube("lava", lava));

    let mut glass = Part::coloured("glass", [120, 200, 255]);
    glass.alpha = 0.4;
    let glass = Arc::new(shapes::cube("glass", glass));

    let mut grille = Part::textured("grille", fence);
    grille.faces = blockspot::world::FaceMode::Double;
    let grille = Arc::new(shapes::cube("grille", grille));

    let tree = Arc::new(shapes::sprite(
        "tree",
        Part::coloured("leaves", [40, 140, 40]),
        SpriteKind::Facing,
    ));
    let mut spinner = shapes::sprite(
        "spinner",
        Part::coloured("sign", [230, 200, 40]),
        SpriteKind::Revolving { deg_per_sec: 45.0 },
    );
    spinner.exit = Some(Exit {
        url: "https://www.rust-lang.org/".into(),
        target: None,
    });
    let spinner = Arc::new(spinner);

    let mut lamp = shapes::cube("lamp", Part::coloured("brass", [255, 220, 120]));
    lamp.light = Some(LightTemplate {
        kind: LightKind::Point,
        style: LightStyle::Pulsating {
            min: 0.6,
            max: 1.0,
            period_ms: 2000,
        },
        colour: Vec3::new(255.0, 200.0, 120.0),
        intensity: 1.0,
        radius: 4.0 * UNITS_PER_BLOCK,
        flood: false,
        offset: Vec3::new(128.0, 300.0, 128.0),
    });
    lamp.trigger = Some(Trigger {
        kind: TriggerKind::Click,
        action: "toggle".into(),
    });
    lamp.popup = Some(PopupTemplate {
        placement: Placement::BottomLeft,
        w: 160,
        h: 24,
        texture: None,
        colour: [30, 30, 30],
        trigger: PopupTrigger::Proximity {
            radius: 3.0 * UNITS_PER_BLOCK,
        },
        exit: None,
    });
    let lamp = Arc::new(lamp);

    let mut drone = shapes::cube("drone", Part::coloured("steel", [150, 150, 170]));
    drone.flags |= BlockFlags::MOVABLE;
    let drone = Arc::new(drone);

    let (cols, rows) = (cols as i32, rows as i32);
    for r in 0..rows {
        for c in 0..cols {
            let def = if (5..8).contains(&c) && (9..11).contains(&r) {
                &pool
            } else {
                &floor
            };
            spot.place_block(def, (c, r, 0), false)?;
            if r == 0 || c == 0 || r == rows - 1 || c == cols - 1 {
                spot.place_block(&wall, (c, r, 1), false)?;
            }
        }
    }
    // adjacent pairs and a stack: their touching faces are switched off
    for at in [(3, 5, 1), (4, 5, 1), (3, 6, 1), (10, 4, 1), (10, 4, 2)] {
        spot.place_block(&wall, at, false)?;
    }
    spot.place_block(&glass, (8, 6, 1), false)?;
    spot.place_block(&grille, (5, 7, 1), false)?;
    spot.place_block(&lamp, (9, 9, 1), false)?;
    for at in [(2, 10, 1), (11, 11, 1), (12, 2, 1)] {
        spot.place_block(&tree, at, false)?;
    }
    spot.place_block(&spinner, (6, 4, 1), false)?;
    spot.add_movable(
        &drone,
        Vec3::new(4.0 * UNITS_PER_BLOCK, 2.0 * UNITS_PER_BLOCK, 8.0 * UNITS_PER_BLOCK),
    );
    spot.add_popup(PopupTemplate {
        placement: Placement::TopRight,
        w: 120,
        h: 16,
        texture: None,
        colour: [20, 40, 80],
        trigger: PopupTrigger::Always,
        exit: None,
    });

    let off = spot.finish_load();
    info!("demo spot built, {off} hidden faces skipped");
    Ok(spot)
}

fn textured_cube(name: &str, texture: TextureId) -> BlockDef {
    shapes::cube(name, Part::textured(name, texture))
}

fn brick_pixmap() -> Result<Pixmap, TextureError> {
    let (w, h) = (64, 64);
    let mut px = vec![0xFF_9C4A32; w * h];
    for y in 0..h {
        for x in 0..w {
            let row = y / 16;
            let shift = if row % 2 == 0 { 0 } else { 16 };
            if y % 16 == 0 || (x + shift) % 32 == 0 {
                px[y * w + x] = 0xFF_B0A898;
            }
        }
    }
    Pixmap::new(w, h, px)
}

/// Cheap hash noise around `base`.
fn noise_pixmap(base: u32, size: usize) -> Result<Pixmap, TextureError> {
    let px = (0..size * size)
        .map(|i| {
            let n = (i as u32).wrapping_mul(2_654_435_761) >> 28;
            let ch = |shift: u32| (((base >> shift) & 0xFF) + n * 3).min(255) << shift;
            0xFF00_0000 | ch(16) | ch(8) | ch(0)
        })
        .collect();
    Pixmap::new(size, size, px)
}

/// Bars with see-through gaps.
fn fence_pixmap() -> Result<Pixmap, TextureError> {
    let (w, h) = (32, 32);
    let px = (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            if x % 8 < 2 || y % 16 < 2 {
                0xFF_505050
            } else {
                0x00_000000
            }
        })
        .collect();
    Pixmap::new(w, h, px)
}

/// Vertical gradient, horizon in the middle.
fn sky_pixmap() -> Result<Pixmap, TextureError> {
    let (w, h) = (256, 128);
    let mut px = Vec::with_capacity(w * h);
    for y in 0..h {
        let t = y as u32 * 255 / (h as u32 - 1);
        let (r, g, b) = (40 + t * 120 / 255, 80 + t * 120 / 255, 200 + t * 40 / 255);
        px.extend(std::iter::repeat_n(0xFF00_0000 | r << 16 | g << 8 | b, w));
    }
    Pixmap::new(w, h, px)
}
