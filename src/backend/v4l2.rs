//! Linux capture backend over Video4Linux2.
//!
//! Enabled with the `camera-v4l2` feature. The device is leaked to satisfy
//! the stream's `'static` borrow; a V4L2 device node is a process-lifetime
//! resource here, matching how the mmap stream API wants to be used.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use v4l::buffer::Type;
use v4l::framesize::FrameSizeEnum;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::backend::{
    CaptureBackend, DeviceInfo, DisconnectHook, FormatCaps, RawSample, SampleSink, StreamConfig,
};
use crate::error::CaptureError;
use crate::format::PixelFormat;
use crate::frame::{NativeRelease, Orientation, MAX_PLANES};
use crate::log::{log_error, log_warn};

/// FourCC pairs the engine can consume directly.
const FOURCC_MAP: [(&[u8; 4], PixelFormat); 6] = [
    (b"NV12", PixelFormat::NV12V),
    (b"NV21", PixelFormat::NV21V),
    (b"YU12", PixelFormat::I420V),
    (b"RGB3", PixelFormat::RGB24),
    (b"BGR3", PixelFormat::BGR24),
    (b"AR24", PixelFormat::BGRA32),
];

fn fourcc_to_format(fourcc: FourCC) -> Option<PixelFormat> {
    FOURCC_MAP
        .iter()
        .find(|(cc, _)| fourcc == FourCC::new(cc))
        .map(|(_, f)| *f)
}

fn format_to_fourcc(format: PixelFormat) -> Option<FourCC> {
    FOURCC_MAP
        .iter()
        .find(|(_, f)| *f == format)
        .map(|(cc, _)| FourCC::new(cc))
}

/// Scan `/dev/video*` nodes, keeping the ones that answer QUERYCAP.
pub(crate) fn enumerate() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return devices;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with("video") || name[5..].parse::<u32>().is_err() {
            continue;
        }
        let Ok(device) = Device::with_path(&path) else {
            continue;
        };
        let card = device
            .query_caps()
            .map(|caps| caps.card)
            .unwrap_or_else(|_| format!("Camera {}", &name[5..]));
        devices.push(DeviceInfo {
            id: path.to_string_lossy().into_owned(),
            name: card,
        });
    }
    devices.sort_by(|a, b| a.id.cmp(&b.id));
    devices
}

/// A V4L2 capture device.
pub struct V4l2Backend {
    device: &'static Device,
    name: String,
    config: StreamConfig,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    disconnect: Option<DisconnectHook>,
}

impl V4l2Backend {
    pub(crate) fn open(path: &str) -> Result<Self, CaptureError> {
        let device = Device::with_path(path).map_err(|e| CaptureError::OpenFailed {
            device: path.to_string(),
            reason: e.to_string(),
        })?;
        let name = device
            .query_caps()
            .map(|caps| caps.card)
            .unwrap_or_else(|_| path.to_string());
        Ok(Self {
            // The mmap stream borrows the device for 'static.
            device: Box::leak(Box::new(device)),
            name,
            config: StreamConfig::default(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
            disconnect: None,
        })
    }

    /// Whether VIDIOC_ENUM_FRAMESIZES advertises `width`x`height` for
    /// `fourcc`. Enumeration failures count as supported, deferring to
    /// `set_format`.
    fn supports_resolution(&self, fourcc: FourCC, width: u32, height: u32) -> bool {
        let Ok(sizes) = self.device.enum_framesizes(fourcc) else {
            return true;
        };
        if sizes.is_empty() {
            return true;
        }
        for fs in sizes {
            match fs.size {
                FrameSizeEnum::Discrete(d) => {
                    if d.width == width && d.height == height {
                        return true;
                    }
                }
                FrameSizeEnum::Stepwise(s) => {
                    let w_ok = width >= s.min_width
                        && width <= s.max_width
                        && (s.step_width == 0 || (width - s.min_width) % s.step_width == 0);
                    let h_ok = height >= s.min_height
                        && height <= s.max_height
                        && (s.step_height == 0 || (height - s.min_height) % s.step_height == 0);
                    if w_ok && h_ok {
                        return true;
                    }
                }
            }
        }
        false
    }
}

impl CaptureBackend for V4l2Backend {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn supported_formats(&self) -> Vec<FormatCaps> {
        let mut caps = Vec::new();
        let Ok(descriptions) = self.device.enum_formats() else {
            return caps;
        };
        for desc in descriptions {
            let Some(format) = fourcc_to_format(desc.fourcc) else {
                continue;
            };
            let Ok(sizes) = self.device.enum_framesizes(desc.fourcc) else {
                continue;
            };
            for fs in sizes {
                match fs.size {
                    FrameSizeEnum::Discrete(d) => caps.push(FormatCaps {
                        format,
                        width: d.width,
                        height: d.height,
                        fps_min: 1.0,
                        fps_max: 60.0,
                    }),
                    FrameSizeEnum::Stepwise(s) => {
                        // Advertise the corners of the stepwise range.
                        for (w, h) in [(s.min_width, s.min_height), (s.max_width, s.max_height)] {
                            caps.push(FormatCaps {
                                format,
                                width: w,
                                height: h,
                                fps_min: 1.0,
                                fps_max: 60.0,
                            });
                        }
                    }
                }
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
        let Some(fourcc) = format_to_fourcc(config.format) else {
            return Err(CaptureError::FormatUnsupported(config.format));
        };
        if !self.supports_resolution(fourcc, config.width, config.height) {
            log_warn!(
                width = config.width,
                height = config.height,
                "resolution not advertised, letting the driver adjust"
            );
        }
        let mut fmt = self
            .device
            .format()
            .map_err(|e| CaptureError::FrameCaptureFailed(e.to_string()))?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = fourcc;
        let applied = self
            .device
            .set_format(&fmt)
            .map_err(|e| CaptureError::FrameCaptureFailed(e.to_string()))?;
        if applied.fourcc != fourcc {
            return Err(CaptureError::FormatUnsupported(config.format));
        }
        let effective = StreamConfig {
            width: applied.width,
            height: applied.height,
            // Frame interval control is driver-dependent; report the request.
            fps: config.fps,
            format: config.format,
        };
        self.config = effective;
        Ok(effective)
    }

    fn start(&mut self, mut sink: SampleSink) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::InvalidState {
                op: "start",
                state: "started",
            });
        }
        let mut stream = Stream::with_buffers(self.device, Type::VideoCapture, 4)
            .map_err(|e| CaptureError::InitializationFailed(e.to_string()))?;
        self.stop_flag.store(false, Ordering::Release);
        let stop = self.stop_flag.clone();
        let cfg = self.config;
        let mut disconnect = self.disconnect.take();
        let worker = thread::Builder::new()
            .name("camcap-v4l2".to_string())
            .spawn(move || {
                let epoch = Instant::now();
                let mut failures = 0u32;
                while !stop.load(Ordering::Acquire) {
                    let (buf, _meta) = match stream.next() {
                        Ok(next) => next,
                        Err(e) => {
                            failures += 1;
                            log_warn!("V4L2 dequeue failed: {e}");
                            if failures >= 5 {
                                log_error!("V4L2 stream lost, treating as disconnect");
                                if let Some(hook) = disconnect.take() {
                                    hook();
                                }
                                break;
                            }
                            continue;
                        }
                    };
                    failures = 0;
                    sink(make_sample(
                        &cfg,
                        buf,
                        epoch.elapsed().as_nanos() as u64,
                    ));
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

    fn on_disconnect(&mut self, hook: DisconnectHook) {
        self.disconnect = Some(hook);
    }
}

impl Drop for V4l2Backend {
    fn drop(&mut self) {
        CaptureBackend::stop(self);
    }
}

/// Copy one dequeued buffer and describe its planes. The mmap buffer is
/// requeued on the next `stream.next()`, so it cannot be aliased past this
/// call.
fn make_sample(cfg: &StreamConfig, buf: &[u8], timestamp_ns: u64) -> RawSample {
    let w = cfg.width as usize;
    let h = cfg.height as usize;
    let format = cfg.format;
    let data: Box<[u8]> = buf.to_vec().into_boxed_slice();

    let mut planes = [std::ptr::null::<u8>(); MAX_PLANES];
    let mut strides = [0usize; MAX_PLANES];
    let base = data.as_ptr();
    planes[0] = base;
    if format.is_rgb() {
        strides[0] = w * format.bytes_per_pixel();
    } else {
        let y_size = w * h;
        strides[0] = w;
        // Safety: V4L2 single-plane buffers pack the chroma right after luma.
        unsafe {
            if format.plane_count() == 2 {
                planes[1] = base.add(y_size);
                strides[1] = w;
            } else {
                planes[1] = base.add(y_size);
                planes[2] = base.add(y_size + y_size / 4);
                strides[1] = w / 2;
                strides[2] = w / 2;
            }
        }
    }

    let release = NativeRelease::new(move || drop(data));
    RawSample {
        planes,
        strides,
        width: cfg.width,
        height: cfg.height,
        format,
        timestamp_ns,
        orientation: Orientation::TopDown,
        release: Some(release),
    }
}
