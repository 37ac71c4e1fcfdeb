//! The contract between the orchestrator and the platform capture shims.
//!
//! A backend owns its native handles and its capture thread. The orchestrator
//! configures it, installs a sample sink, and drives start/stop/close; the
//! sink runs on the backend's thread and must make no assumptions about
//! thread identity.

use crate::error::CaptureError;
use crate::format::PixelFormat;
use crate::frame::{NativeRelease, Orientation, MAX_PLANES};

pub mod synthetic;

#[cfg(all(target_os = "linux", feature = "camera-v4l2"))]
pub mod v4l2;

/// One enumerable capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Backend-specific identifier, e.g. `/dev/video0` or `synthetic:0`.
    pub id: String,
    /// Human-readable device name.
    pub name: String,
}

/// Heuristic for virtual cameras (OBS, loopback devices, test sources).
#[must_use]
pub fn is_virtual_device(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["obs", "virtual", "fake"]
        .iter()
        .any(|kw| lower.contains(kw))
}

/// Order devices with real cameras first, virtual ones last. Stable.
pub fn order_devices(devices: &mut Vec<DeviceInfo>) {
    devices.sort_by_key(|d| is_virtual_device(&d.name));
}

/// One capability entry advertised by a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatCaps {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub fps_min: f64,
    pub fps_max: f64,
}

/// A negotiated (or requested) stream configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub format: PixelFormat,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30.0,
            format: PixelFormat::NV12,
        }
    }
}

/// One delivered capture sample, as raw as the platform hands it over.
///
/// Plane pointers stay valid until `release` runs; the receiver either runs
/// it immediately after copying/converting, or parks it on the frame control
/// block to extend the native buffer's lifetime (zero-copy).
pub struct RawSample {
    pub planes: [*const u8; MAX_PLANES],
    pub strides: [usize; MAX_PLANES],
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub timestamp_ns: u64,
    pub orientation: Orientation,
    pub release: Option<NativeRelease>,
}

// Safety: the pointed-to memory is pinned until `release` runs, and the
// sample is handed to exactly one receiver.
unsafe impl Send for RawSample {}

/// Receives samples on the backend's capture thread.
pub type SampleSink = Box<dyn FnMut(RawSample) + Send>;

/// Invoked (once) when the device disappears at runtime.
pub type DisconnectHook = Box<dyn FnOnce() + Send>;

/// A platform capture shim.
pub trait CaptureBackend: Send {
    /// Name of the opened device.
    fn device_name(&self) -> &str;

    /// Every (format, resolution, fps range) combination the device offers.
    fn supported_formats(&self) -> Vec<FormatCaps>;

    /// Apply a configuration; returns what the hardware actually accepted.
    fn configure(&mut self, config: &StreamConfig) -> Result<StreamConfig, CaptureError>;

    /// Start the native stream, delivering samples into `sink`.
    fn start(&mut self, sink: SampleSink) -> Result<(), CaptureError>;

    /// Stop the native stream and join the capture thread. Idempotent.
    fn stop(&mut self);

    /// Release native handles. Implies `stop`. Idempotent.
    fn close(&mut self);

    /// Install the disconnect notification hook.
    fn on_disconnect(&mut self, _hook: DisconnectHook) {}
}

/// Enumerate devices across all compiled backends, real cameras first.
#[must_use]
pub fn enumerate() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    #[cfg(all(target_os = "linux", feature = "camera-v4l2"))]
    devices.extend(v4l2::enumerate());

    devices.extend(synthetic::enumerate());
    order_devices(&mut devices);
    devices
}

/// Open a device by its enumeration id.
pub(crate) fn open_by_id(id: &str) -> Result<Box<dyn CaptureBackend>, CaptureError> {
    if let Some(rest) = id.strip_prefix("synthetic:") {
        return Ok(Box::new(synthetic::SyntheticBackend::open(rest)?));
    }

    #[cfg(all(target_os = "linux", feature = "camera-v4l2"))]
    if id.starts_with("/dev/video") {
        return Ok(Box::new(v4l2::V4l2Backend::open(id)?));
    }

    Err(CaptureError::DeviceNotFound(id.to_string()))
}

/// Resolve a user-supplied name (or the empty string for the default
/// device) to an enumeration entry.
pub(crate) fn resolve_name(name: &str) -> Result<DeviceInfo, CaptureError> {
    let devices = enumerate();
    if devices.is_empty() {
        return Err(CaptureError::DeviceNotFound(name.to_string()));
    }
    if name.is_empty() {
        return Ok(devices[0].clone());
    }
    devices
        .iter()
        .find(|d| d.name == name || d.id == name)
        .cloned()
        .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))
}

/// Resolve an index; negative selects the default, out-of-range clamps.
pub(crate) fn resolve_index(index: i32) -> Result<DeviceInfo, CaptureError> {
    let devices = enumerate();
    if devices.is_empty() {
        return Err(CaptureError::DeviceNotFound(format!("index {index}")));
    }
    let idx = if index < 0 {
        0
    } else {
        (index as usize).min(devices.len() - 1)
    };
    Ok(devices[idx].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_devices_sort_last() {
        let mut devices = vec![
            DeviceInfo {
                id: "0".into(),
                name: "Integrated Camera".into(),
            },
            DeviceInfo {
                id: "1".into(),
                name: "OBS Virtual Camera".into(),
            },
            DeviceInfo {
                id: "2".into(),
                name: "FaceTime HD".into(),
            },
        ];
        order_devices(&mut devices);
        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Integrated Camera", "FaceTime HD", "OBS Virtual Camera"]);
    }

    #[test]
    fn virtual_heuristic() {
        assert!(is_virtual_device("OBS Virtual Camera"));
        assert!(is_virtual_device("My Fake Cam"));
        assert!(is_virtual_device("v4l2 Virtual device"));
        assert!(!is_virtual_device("Integrated Camera"));
    }

    #[test]
    fn index_resolution_clamps() {
        let devices = enumerate();
        assert!(!devices.is_empty());
        assert_eq!(resolve_index(-3).expect("default").id, devices[0].id);
        let last = resolve_index(i32::MAX).expect("clamped");
        assert_eq!(last.id, devices[devices.len() - 1].id);
    }
}
