// Video sources for the rain: a live camera, or a still image standing in for it.
// Visual expectation: `latest_frame()` hands back the newest RGBA picture without
// ever making the window wait for the camera.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::CameraConfig;
use crate::error::Error;
use crate::types::PixelBuffer;

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

/// Anything that can hand the orchestrator a picture each tick.
pub trait VideoSource {
    /// The most recent completed frame, or `None` if nothing has arrived yet.
    fn latest_frame(&mut self) -> Option<&PixelBuffer>;

    /// Frame size the source delivers, known before the first frame arrives.
    fn size(&self) -> (usize, usize);

    fn describe(&self) -> String;
}

/* ------------------------------ still image ------------------------------ */

/// A fixed picture, e.g. when no camera is present.
pub struct StillSource {
    image: PixelBuffer,
    label: String,
}

impl StillSource {
    pub fn new(image: PixelBuffer, label: impl Into<String>) -> Self {
        Self { image, label: label.into() }
    }

    /// Decode any format the `image` crate understands into an RGBA buffer.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let rgba = image::open(path)
            .map_err(|source| Error::ImageLoad { path: path.to_path_buf(), source })?
            .to_rgba8();
        let (w, h) = rgba.dimensions();
        let image = still_buffer(path, w, h, rgba.into_raw())?;
        Ok(Self::new(image, path.display().to_string()))
    }
}

/// Wrap decoded bytes from `path`; a length mismatch is blamed on the file, not the camera.
fn still_buffer(path: &Path, w: u32, h: u32, rgba: Vec<u8>) -> Result<PixelBuffer, Error> {
    PixelBuffer::from_rgba(w as usize, h as usize, rgba).ok_or_else(|| {
        Error::InvalidSetting(format!(
            "image '{}': pixel data is not {w}x{h} RGBA",
            path.display()
        ))
    })
}

impl VideoSource for StillSource {
    fn latest_frame(&mut self) -> Option<&PixelBuffer> {
        Some(&self.image)
    }

    fn size(&self) -> (usize, usize) {
        (self.image.width(), self.image.height())
    }

    fn describe(&self) -> String {
        format!("image {} ({}x{})", self.label, self.image.width(), self.image.height())
    }
}

/* ------------------------------ live camera ------------------------------ */

/// A camera streaming on a background thread into a shared latest-frame slot.
pub struct CameraSource {
    slot: Arc<Mutex<Option<PixelBuffer>>>,
    current: Option<PixelBuffer>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    width: u32,
    height: u32,
}

impl CameraSource {
    /// Open the camera and start streaming. Returns once the stream is running
    /// (or has failed to start).
    pub fn open(settings: &CameraConfig) -> Result<Self, Error> {
        let slot = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (info_tx, info_rx) = mpsc::channel();

        // nokhwa cameras are opened on the thread that reads them.
        let thread = {
            let slot = Arc::clone(&slot);
            let stop = Arc::clone(&stop);
            let settings = settings.clone();
            thread::Builder::new()
                .name("camera".into())
                .spawn(move || capture_loop(settings, slot, stop, info_tx))
                .map_err(|e| Error::CameraInit(format!("Spawn capture thread: {e}")))?
        };

        let (width, height) = info_rx
            .recv()
            .map_err(|_| Error::CameraInit("Capture thread exited before reporting".into()))??;

        Ok(Self {
            slot,
            current: None,
            stop,
            thread: Some(thread),
            width,
            height,
        })
    }
}

impl VideoSource for CameraSource {
    fn latest_frame(&mut self) -> Option<&PixelBuffer> {
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(frame) = slot.take() {
                self.current = Some(frame);
            }
        }
        self.current.as_ref()
    }

    /// The resolution the stream actually negotiated, which may differ from the request.
    fn size(&self) -> (usize, usize) {
        (self.width as usize, self.height as usize)
    }

    fn describe(&self) -> String {
        format!("camera ({}x{})", self.width, self.height)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn open_camera(settings: &CameraConfig) -> Result<Camera, Error> {
    let idx = CameraIndex::Index(settings.device);
    let fmt = CameraFormat::new(
        Resolution::new(settings.width, settings.height),
        FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
        settings.fps,
    );
    let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

    let mut cam = Camera::new(idx, req).map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;
    cam.open_stream()
        .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;
    Ok(cam)
}

/// Grab one frame and expand it to RGBA.
fn grab(cam: &mut Camera) -> Result<PixelBuffer, Error> {
    let frame = cam
        .frame()
        .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;
    let rgb = frame
        .decode_image::<RgbFormat>()
        .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;
    let (w, h) = rgb.dimensions();
    PixelBuffer::from_rgb(w as usize, h as usize, rgb.as_raw())
        .ok_or_else(|| Error::CameraFrame(format!("Decoded frame is not {w}x{h} RGB")))
}

fn capture_loop(
    settings: CameraConfig,
    slot: Arc<Mutex<Option<PixelBuffer>>>,
    stop: Arc<AtomicBool>,
    info_tx: Sender<Result<(u32, u32), Error>>,
) {
    let mut cam = match open_camera(&settings) {
        Ok(cam) => cam,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    // The actual stream might choose a slightly different resolution.
    let actual = cam.resolution();
    let _ = info_tx.send(Ok((actual.width(), actual.height())));

    let mut failures = 0u32;
    while !stop.load(Ordering::Relaxed) {
        match grab(&mut cam) {
            Ok(frame) => {
                failures = 0;
                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(frame);
                }
            }
            Err(e) => {
                failures += 1;
                if failures == 1 || failures % 100 == 0 {
                    log::warn!("{e} ({failures} in a row)");
                }
                thread::sleep(Duration::from_millis(5));
            }
        }
    }

    let _ = cam.stop_stream();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_source_always_has_a_frame() {
        let mut src = StillSource::new(PixelBuffer::blank(4, 3), "test");
        assert!(src.latest_frame().is_some());
        assert!(src.latest_frame().is_some());
        assert_eq!(src.size(), (4, 3));
        assert_eq!(src.describe(), "image test (4x3)");
    }

    #[test]
    fn still_source_loads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        let mut src = StillSource::load(&path).unwrap();
        let frame = src.latest_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(frame.pixel(2, 1), Some([10, 20, 30, 255]));
        assert_eq!(src.size(), (3, 2));
    }

    #[test]
    fn short_still_data_names_the_file() {
        let err = still_buffer(Path::new("poster.png"), 2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::InvalidSetting(_)));
        let msg = err.to_string();
        assert!(msg.contains("poster.png"));
        assert!(!msg.contains("Camera"));
    }

    #[test]
    fn missing_image_reports_path() {
        let err = StillSource::load(Path::new("/no/such/still.png")).err().unwrap();
        assert!(err.to_string().contains("still.png"));
    }
}
