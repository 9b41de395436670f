// What you SEE:
// • The camera image, mirrored like a looking glass.
// • Letters of a poem falling from the top; they stop on anything dark and
//   ride along its upper edge as you move.
// • D toggles the obstacle mask (debug), Up/Down change the threshold. ESC quits.
// • FPS is printed to the terminal once per second. Everything else goes through
//   the `log` facade and is only visible when a logger backend is linked in.

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

use text_rain::app::{self, FrameState, THRESHOLD_STEP};
use text_rain::camera::{CameraSource, StillSource, VideoSource};
use text_rain::config::{Args, Config};
use text_rain::draw::{Drawer, draw_particles, draw_text_5x7};
use text_rain::error::Error;
use text_rain::glyph::GlyphAtlas;
use text_rain::rain::Rain;
use text_rain::types::FrameBuffer;

/// Camera first; on failure fall back to the configured still image if there is one.
fn open_source(args: &Args, config: &Config) -> Result<Box<dyn VideoSource>, Error> {
    if let Some(path) = &args.image {
        return Ok(Box::new(StillSource::load(path)?));
    }
    match CameraSource::open(&config.camera) {
        Ok(cam) => Ok(Box::new(cam)),
        Err(e) => match &config.camera.fallback_image {
            Some(path) => {
                log::warn!("{e}; using {}", path.display());
                Ok(Box::new(StillSource::load(path)?))
            }
            None => Err(e),
        },
    }
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let mut settings = config.settings();
    let mut rng = match config.rain.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    /* --- Video source + window ---
       Visual: window opens sized to the source. */
    let mut source = open_source(&args, &config)?;
    log::info!("video source: {}", source.describe());
    let (w, h) = source.size();
    let mut drawer = Drawer::new("Text Rain", w, h)?;

    let mut state = FrameState::new(Rain::new(config.spawn_text()?));
    let mut atlas = GlyphAtlas::new();
    let mut screen = FrameBuffer::default();

    /* --- HUD / FPS --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut hud_fps_text = String::from("FPS: 0.0");
    let mut last_frame_time = Instant::now();

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();
        let dt = (now - last_frame_time).as_secs_f32();
        last_frame_time = now;

        /* 1) Settings surface, polled by value. */
        if drawer.d_pressed_once() {
            settings.toggle_debug();
        }
        if drawer.up_pressed() {
            settings.nudge_threshold(THRESHOLD_STEP);
        }
        if drawer.down_pressed() {
            settings.nudge_threshold(-THRESHOLD_STEP);
        }

        /* 2) Transform the newest frame and advance the rain.
           Visual: nothing changes on screen when the camera has nothing yet. */
        let shown = app::update(&mut state, source.latest_frame(), settings, dt, &mut rng)?;
        let Some(shown) = shown else {
            drawer.pump();
            continue;
        };

        /* 3) Background, letters, HUD, present. */
        screen.fill_from(shown);
        draw_particles(&mut screen, state.rain.drops(), &mut atlas);

        let status = if settings.debug { "DEBUG" } else { "LIVE" };
        let hud = format!(
            "{} | THRESHOLD {:.2} | LETTERS {} | {}",
            status,
            settings.threshold,
            state.rain.len(),
            hud_fps_text
        );
        draw_text_5x7(&mut screen, 8, 8, &hud, 0x00_FF_FF_FF);

        drawer.present(&screen)?;

        /* 4) FPS counter (terminal + HUD once per second) */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            println!("FPS: {:.1}", fps);
            hud_fps_text = format!("FPS: {:.1}", fps);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    Ok(())
}
