//! Per-tick orchestration: frame in, transformed buffers and advanced particles out.

use rand::Rng;

use crate::error::Error;
use crate::rain::Rain;
use crate::types::PixelBuffer;
use crate::vision::{grayscale, mirror, select_presented, threshold};

pub const DEFAULT_THRESHOLD: f32 = 0.6;
pub const THRESHOLD_STEP: f32 = 0.05;

/// Values the user can change while running. Read by value every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub debug: bool,
    pub threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Settings {
    pub fn toggle_debug(&mut self) {
        self.debug = !self.debug;
        log::info!("debug view {}", if self.debug { "on" } else { "off" });
    }

    /// Move the threshold by `delta`, staying inside `[0, 1]`.
    pub fn nudge_threshold(&mut self, delta: f32) {
        self.threshold = (self.threshold + delta).clamp(0.0, 1.0);
        log::info!("threshold {:.2}", self.threshold);
    }
}

/// Everything that survives from one tick to the next.
pub struct FrameState {
    pub display: Option<PixelBuffer>,
    pub gray: Option<PixelBuffer>,
    pub obstacle: Option<PixelBuffer>,
    pub rain: Rain,
}

impl FrameState {
    pub fn new(rain: Rain) -> Self {
        Self {
            display: None,
            gray: None,
            obstacle: None,
            rain,
        }
    }
}

/// Run one tick. Returns the buffer to put on screen, or `None` when no frame was available
/// (in which case nothing in `state` changes).
pub fn update<'a, R: Rng + ?Sized>(
    state: &'a mut FrameState,
    frame: Option<&PixelBuffer>,
    settings: Settings,
    dt: f32,
    rng: &mut R,
) -> Result<Option<&'a PixelBuffer>, Error> {
    let Some(frame) = frame else {
        return Ok(None);
    };
    let (w, h) = (frame.width(), frame.height());

    if PixelBuffer::resize_if_needed(&mut state.display, w, h) {
        log::info!("frame size is now {w}x{h}, reallocating buffers");
    }
    PixelBuffer::resize_if_needed(&mut state.gray, w, h);
    PixelBuffer::resize_if_needed(&mut state.obstacle, w, h);

    let (Some(display), Some(gray), Some(obstacle)) =
        (&mut state.display, &mut state.gray, &mut state.obstacle)
    else {
        return Ok(None);
    };

    mirror(frame, display)?;
    grayscale(display, gray)?;
    threshold(gray, obstacle, settings.threshold)?;

    state.rain.tick(obstacle, dt, rng);

    Ok(Some(select_presented(settings.debug, display, obstacle)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rain::{DropState, Particle, SpawnText};
    use crate::vision::WHITE;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bright(w: usize, h: usize) -> PixelBuffer {
        PixelBuffer::from_rgba(w, h, vec![255; w * h * 4]).unwrap()
    }

    #[test]
    fn missing_frame_skips_the_tick() {
        let mut state = FrameState::new(Rain::new(SpawnText::default()));
        state.rain.push(Particle::new('q', 0.0));
        let mut rng = StdRng::seed_from_u64(3);
        let out = update(&mut state, None, Settings::default(), 0.5, &mut rng).unwrap();
        assert!(out.is_none());
        assert!(state.display.is_none());
        assert_eq!(state.rain.drops()[0].y, 1.0);
    }

    #[test]
    fn buffers_follow_frame_size() {
        let mut state = FrameState::new(Rain::new(SpawnText::default()));
        let mut rng = StdRng::seed_from_u64(3);
        update(&mut state, Some(&bright(4, 3)), Settings::default(), 0.0, &mut rng).unwrap();
        update(&mut state, Some(&bright(8, 2)), Settings::default(), 0.0, &mut rng).unwrap();
        for b in [&state.display, &state.gray, &state.obstacle] {
            let b = b.as_ref().unwrap();
            assert_eq!((b.width(), b.height()), (8, 2));
        }
    }

    #[test]
    fn display_is_mirrored_and_keeps_color() {
        let mut frame = PixelBuffer::blank(2, 1);
        frame.set_pixel(0, 0, [200, 10, 10, 255]);
        let mut state = FrameState::new(Rain::new(SpawnText::default()));
        let mut rng = StdRng::seed_from_u64(3);
        let shown = update(&mut state, Some(&frame), Settings::default(), 0.0, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(shown.pixel(1, 0), Some([200, 10, 10, 255]));
        assert_eq!(shown.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn debug_presents_the_mask() {
        let mut state = FrameState::new(Rain::new(SpawnText::default()));
        let mut rng = StdRng::seed_from_u64(3);
        let settings = Settings {
            debug: true,
            threshold: 0.5,
        };
        let shown = update(&mut state, Some(&bright(2, 2)), settings, 0.0, &mut rng)
            .unwrap()
            .unwrap();
        assert!(shown.data().chunks_exact(4).all(|px| px == WHITE));
    }

    #[test]
    fn dark_frame_blocks_letters() {
        let mut state = FrameState::new(Rain::new(SpawnText::default()));
        state.rain.push(Particle::new('q', 0.0));
        let mut rng = StdRng::seed_from_u64(3);
        let dark = PixelBuffer::blank(20, 20);
        update(&mut state, Some(&dark), Settings::default(), 0.1, &mut rng).unwrap();
        let p = &state.rain.drops()[0];
        assert_eq!(p.state, DropState::Blocked);
        assert_eq!(p.y, 1.0);
    }

    #[test]
    fn nudging_threshold_clamps() {
        let mut s = Settings::default();
        for _ in 0..40 {
            s.nudge_threshold(THRESHOLD_STEP);
        }
        assert_eq!(s.threshold, 1.0);
        for _ in 0..40 {
            s.nudge_threshold(-THRESHOLD_STEP);
        }
        assert_eq!(s.threshold, 0.0);
        s.toggle_debug();
        assert!(s.debug);
    }
}
