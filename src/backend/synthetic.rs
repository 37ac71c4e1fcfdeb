//! Built-in test-pattern backend.
//!
//! Generates a moving gradient at the negotiated rate on its own capture
//! thread, exercising the full zero-copy contract: each sample's planes
//! point into a buffer owned by the sample's release hook. It stands in for
//! real hardware in tests, examples, and on machines without a camera.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::backend::{CaptureBackend, DeviceInfo, FormatCaps, RawSample, SampleSink, StreamConfig};
use crate::error::CaptureError;
use crate::format::PixelFormat;
use crate::frame::{NativeRelease, Orientation, MAX_PLANES};

const DEVICE_NAME: &str = "Virtual Test Pattern";

const SIZES: [(u32, u32); 4] = [(320, 240), (640, 480), (1280, 720), (1920, 1080)];

const FORMATS: [PixelFormat; 4] = [
    PixelFormat::NV12V,
    PixelFormat::NV21V,
    PixelFormat::I420V,
    PixelFormat::BGRA32,
];

pub(crate) fn enumerate() -> Vec<DeviceInfo> {
    vec![DeviceInfo {
        id: "synthetic:0".to_string(),
        name: DEVICE_NAME.to_string(),
    }]
}

/// The test-pattern capture device.
pub struct SyntheticBackend {
    config: StreamConfig,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SyntheticBackend {
    pub(crate) fn open(id: &str) -> Result<Self, CaptureError> {
        if id != "0" {
            return Err(CaptureError::DeviceNotFound(format!("synthetic:{id}")));
        }
        Ok(Self {
            config: StreamConfig {
                format: PixelFormat::NV12V,
                ..StreamConfig::default()
            },
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }
}

impl Drop for SyntheticBackend {
    fn drop(&mut self) {
        CaptureBackend::stop(self);
    }
}

impl CaptureBackend for SyntheticBackend {
    fn device_name(&self) -> &str {
        DEVICE_NAME
    }

    fn supported_formats(&self) -> Vec<FormatCaps> {
        let mut caps = Vec::with_capacity(FORMATS.len() * SIZES.len());
        for format in FORMATS {
            for (width, height) in SIZES {
                caps.push(FormatCaps {
                    format,
                    width,
                    height,
                    fps_min: 1.0,
                    fps_max: 60.0,
                });
            }
        }
        caps
    }

    fn configure(&mut self, config: &StreamConfig) -> Result<StreamConfig, CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::InvalidState {
                op: "configure",
                state: "started",
            });
        }
        let mut cfg = *config;
        cfg.fps = cfg.fps.clamp(1.0, 60.0);
        if !FORMATS.contains(&cfg.format) {
            return Err(CaptureError::FormatUnsupported(cfg.format));
        }
        if !SIZES.contains(&(cfg.width, cfg.height)) {
            // Snap to the closest advertised geometry by total pixel count.
            let req = u64::from(cfg.width) * u64::from(cfg.height);
            let (w, h) = SIZES
                .iter()
                .copied()
                .min_by_key(|(w, h)| (u64::from(*w) * u64::from(*h)).abs_diff(req))
                .unwrap_or(SIZES[1]);
            cfg.width = w;
            cfg.height = h;
        }
        self.config = cfg;
        Ok(cfg)
    }

    fn start(&mut self, mut sink: SampleSink) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::InvalidState {
                op: "start",
                state: "started",
            });
        }
        self.stop_flag.store(false, Ordering::Release);
        let stop = self.stop_flag.clone();
        let cfg = self.config;
        let worker = thread::Builder::new()
            .name("camcap-synthetic".to_string())
            .spawn(move || {
                let epoch = Instant::now();
                let interval = Duration::from_secs_f64(1.0 / cfg.fps);
                let mut tick = 0u64;
                while !stop.load(Ordering::Acquire) {
                    sink(make_sample(&cfg, tick, epoch.elapsed()));
                    tick += 1;
                    thread::sleep(interval);
                }
            })
            .map_err(|e| CaptureError::InitializationFailed(e.to_string()))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn close(&mut self) {
        CaptureBackend::stop(self);
    }
}

fn make_sample(cfg: &StreamConfig, tick: u64, elapsed: Duration) -> RawSample {
    let w = cfg.width as usize;
    let h = cfg.height as usize;
    let format = cfg.format;
    let shift = (tick * 4) as usize;

    let mut planes = [std::ptr::null::<u8>(); MAX_PLANES];
    let mut strides = [0usize; MAX_PLANES];

    let buf: Box<[u8]> = if format.is_rgb() {
        let bpp = format.bytes_per_pixel();
        let mut buf = vec![0u8; w * h * bpp];
        for row in 0..h {
            for x in 0..w {
                let p = (row * w + x) * bpp;
                // Moving diagonal gradient, B-first for the BGRA family.
                buf[p] = ((x + shift) & 0xFF) as u8;
                buf[p + 1] = (row & 0xFF) as u8;
                buf[p + 2] = ((x + row + shift) & 0xFF) as u8;
                if bpp == 4 {
                    buf[p + 3] = 0xFF;
                }
            }
        }
        strides[0] = w * bpp;
        buf.into_boxed_slice()
    } else {
        let y_size = w * h;
        let chroma = y_size / 2;
        let mut buf = vec![128u8; y_size + chroma];
        for (i, byte) in buf[..y_size].iter_mut().enumerate() {
            let (row, x) = (i / w, i % w);
            *byte = (((x + row + shift) % 220) + 16) as u8;
        }
        if format.plane_count() == 3 {
            strides[0] = w;
            strides[1] = w / 2;
            strides[2] = w / 2;
        } else {
            strides[0] = w;
            strides[1] = w;
        }
        buf.into_boxed_slice()
    };

    let base = buf.as_ptr();
    planes[0] = base;
    if format.is_yuv() {
        let y_size = w * h;
        // Safety: offsets stay inside the buffer laid out above.
        unsafe {
            planes[1] = base.add(y_size);
            if format.plane_count() == 3 {
                planes[2] = base.add(y_size + y_size / 4);
            }
        }
    }

    let release = NativeRelease::new(move || drop(buf));

    RawSample {
        planes,
        strides,
        width: cfg.width,
        height: cfg.height,
        format,
        timestamp_ns: elapsed.as_nanos() as u64,
        orientation: Orientation::TopDown,
        release: Some(release),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn delivers_nv12_samples() {
        let mut backend = SyntheticBackend::open("0").expect("open");
        let effective = backend
            .configure(&StreamConfig {
                width: 320,
                height: 240,
                fps: 60.0,
                format: PixelFormat::NV12V,
            })
            .expect("configure");
        assert_eq!((effective.width, effective.height), (320, 240));

        let (tx, rx) = mpsc::channel();
        backend
            .start(Box::new(move |sample: RawSample| {
                let _ = tx.send((sample.width, sample.height, sample.format));
                // Sample (and its buffer) released on drop.
            }))
            .expect("start");
        let (w, h, format) = rx.recv_timeout(Duration::from_secs(2)).expect("sample");
        backend.stop();
        assert_eq!((w, h), (320, 240));
        assert_eq!(format, PixelFormat::NV12V);
    }

    #[test]
    fn snaps_unknown_geometry() {
        let mut backend = SyntheticBackend::open("0").expect("open");
        let effective = backend
            .configure(&StreamConfig {
                width: 600,
                height: 400,
                fps: 30.0,
                format: PixelFormat::I420V,
            })
            .expect("configure");
        assert_eq!((effective.width, effective.height), (640, 480));
    }

    #[test]
    fn unknown_id_is_not_found() {
        assert!(matches!(
            SyntheticBackend::open("7"),
            Err(CaptureError::DeviceNotFound(_))
        ));
    }
}
