//! The capture orchestrator and public provider API.
//!
//! State machine `Closed → Opened → Started`, format/resolution negotiation,
//! the capture-thread sample sink, and the optional delivery thread feeding
//! a registered frame callback.
//!
//! Lifecycle state lives under one control mutex; `grab` reads only the
//! ready queue and atomics, so `stop`/`close` from another thread always
//! unblocks a pending grab instead of deadlocking behind it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use crate::backend::{
    self, CaptureBackend, DeviceInfo, FormatCaps, RawSample, SampleSink, StreamConfig,
};
use crate::convert::{convert_in_place, ConversionPlan};
use crate::error::CaptureError;
use crate::format::PixelFormat;
use crate::frame::{Frame, FrameAllocator, HeapAllocator};
use crate::log::{log_error, log_info, log_verbose, log_warn};
use crate::pool::{FramePool, DEFAULT_MAX_CACHE};
use crate::queue::{ReadyQueue, DEFAULT_MAX_AVAILABLE};

/// Sentinel timeout: block `grab` until a frame arrives or capture stops.
pub const GRAB_TIMEOUT_INFINITE: u64 = u64::MAX;

/// Stream properties accessible through [`CaptureProvider::set`] /
/// [`CaptureProvider::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureProperty {
    Width,
    Height,
    FrameRate,
    PixelFormat,
}

/// Frame callback. Return `true` to consume the frame, `false` to leave it
/// in the ready queue for the next `grab`.
pub type FrameCallback = Box<dyn FnMut(&Frame) -> bool + Send>;

type AllocatorFactoryBox = Box<dyn Fn() -> Box<dyn FrameAllocator> + Send + Sync>;

struct Shared {
    queue: ReadyQueue,
    is_opened: AtomicBool,
    is_started: AtomicBool,
    frame_counter: AtomicU64,
    callback: Mutex<Option<FrameCallback>>,
    delivery_id: Mutex<Option<ThreadId>>,
    disconnect: Mutex<Option<Box<dyn FnMut() + Send>>>,
}

struct Control {
    backend: Option<Box<dyn CaptureBackend>>,
    device: Option<DeviceInfo>,
    desired: StreamConfig,
    effective: Option<StreamConfig>,
    plan: Option<ConversionPlan>,
    pool: Option<Arc<FramePool>>,
    pool_max: usize,
    allocator_factory: Option<AllocatorFactoryBox>,
    delivery: Option<JoinHandle<()>>,
}

/// A camera capture provider.
///
/// Lifecycle: [`open`](Self::open) a device, [`start`](Self::start) the
/// stream, then pull frames with [`grab`](Self::grab) or push them through a
/// registered callback. Frames handed out stay valid after `stop`, `close`,
/// and even after the provider is dropped.
///
/// All methods take `&self`; `stop`/`close` from one thread unblock a
/// `grab` pending on another. Concurrent `grab` calls are serialized but
/// receive frames in unspecified order, so avoid them.
pub struct CaptureProvider {
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl Default for CaptureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureProvider {
    /// Create a provider in the `Closed` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: ReadyQueue::new(DEFAULT_MAX_AVAILABLE),
                is_opened: AtomicBool::new(false),
                is_started: AtomicBool::new(false),
                frame_counter: AtomicU64::new(0),
                callback: Mutex::new(None),
                delivery_id: Mutex::new(None),
                disconnect: Mutex::new(None),
            }),
            control: Mutex::new(Control {
                backend: None,
                device: None,
                desired: StreamConfig::default(),
                effective: None,
                plan: None,
                pool: None,
                pool_max: DEFAULT_MAX_CACHE,
                allocator_factory: None,
                delivery: None,
            }),
        }
    }

    /// Wrap an externally constructed backend (custom hardware, tests).
    /// The provider starts in the `Opened` state.
    #[must_use]
    pub fn from_backend(backend: Box<dyn CaptureBackend>) -> Self {
        let provider = Self::new();
        let name = backend.device_name().to_string();
        let info = DeviceInfo {
            id: format!("custom:{name}"),
            name,
        };
        provider.install_backend(&mut provider.control.lock(), backend, info);
        provider
    }

    /// Names of all attached capture devices, real cameras before virtual
    /// ones.
    #[must_use]
    pub fn find_device_names() -> Vec<String> {
        backend::enumerate().into_iter().map(|d| d.name).collect()
    }

    /// Open a device by name (or id). The empty string selects the default
    /// device. An already-open provider is closed and re-opened.
    pub fn open(&self, name: &str) -> Result<(), CaptureError> {
        let info = backend::resolve_name(name)?;
        let new_backend = backend::open_by_id(&info.id)?;
        let mut control = self.control.lock();
        if self.is_opened() {
            log_info!(device = %info.name, "re-opening provider on a new device");
            self.close_locked(&mut control);
        }
        self.install_backend(&mut control, new_backend, info);
        Ok(())
    }

    /// Open a device by enumeration index. Negative selects the default;
    /// past-the-end clamps to the last device.
    pub fn open_index(&self, index: i32) -> Result<(), CaptureError> {
        let info = backend::resolve_index(index)?;
        let new_backend = backend::open_by_id(&info.id)?;
        let mut control = self.control.lock();
        if self.is_opened() {
            self.close_locked(&mut control);
        }
        self.install_backend(&mut control, new_backend, info);
        Ok(())
    }

    fn install_backend(
        &self,
        control: &mut Control,
        mut backend: Box<dyn CaptureBackend>,
        info: DeviceInfo,
    ) {
        let weak = Arc::downgrade(&self.shared);
        backend.on_disconnect(Box::new(move || {
            let Some(shared) = weak.upgrade() else { return };
            log_error!("capture device disconnected");
            shared.is_started.store(false, Ordering::Release);
            shared.queue.set_stopped(true);
            if let Some(cb) = shared.disconnect.lock().as_mut() {
                cb();
            };
        }));
        control.backend = Some(backend);
        control.device = Some(info);
        self.shared.is_opened.store(true, Ordering::Release);
    }

    /// Whether a device is currently open.
    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.shared.is_opened.load(Ordering::Acquire)
    }

    /// Whether the stream is running. Turns false on device disconnect.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.is_started.load(Ordering::Acquire)
    }

    /// Name of the opened device, if any.
    #[must_use]
    pub fn device_name(&self) -> Option<String> {
        self.control.lock().device.as_ref().map(|d| d.name.clone())
    }

    /// Start capturing. Negotiates format and geometry with the device,
    /// installs the conversion step when the requested format carries the
    /// force bit, and brings up the native stream.
    pub fn start(&self) -> Result<(), CaptureError> {
        let mut control = self.control.lock();
        if !self.is_opened() {
            return Err(CaptureError::InvalidState {
                op: "start",
                state: "closed",
            });
        }
        if self.is_started() {
            log_warn!("start() called while already started");
            return Err(CaptureError::InvalidState {
                op: "start",
                state: "started",
            });
        }

        let desired = control.desired;
        let Some(backend) = control.backend.as_mut() else {
            return Err(CaptureError::InvalidState {
                op: "start",
                state: "closed",
            });
        };
        let caps = backend.supported_formats();
        let (request, plan_target) = negotiate(&caps, &desired)?;
        let effective = backend.configure(&request)?;
        let plan = plan_target.map(|target| ConversionPlan {
            source: effective.format,
            target,
        });

        if control.pool.is_none() {
            let factory = control
                .allocator_factory
                .take()
                .unwrap_or_else(|| Box::new(|| Box::<HeapAllocator>::default()));
            control.pool = Some(Arc::new(FramePool::new(control.pool_max, factory)));
        }
        let Some(pool) = control.pool.clone() else {
            unreachable!("pool initialized above");
        };

        self.shared.queue.set_stopped(false);
        let sink = make_sink(self.shared.clone(), pool, plan);
        if let Some(backend) = control.backend.as_mut() {
            backend.start(sink)?;
        }

        control.plan = plan;
        control.effective = Some(effective);
        self.shared.is_started.store(true, Ordering::Release);
        log_info!(
            width = effective.width,
            height = effective.height,
            fps = effective.fps,
            native = %effective.format,
            converted = plan.is_some(),
            "capture started"
        );

        if self.shared.callback.lock().is_some() {
            self.spawn_delivery(&mut control);
        }
        Ok(())
    }

    /// Stop capturing. Unblocks pending `grab` calls, joins the delivery
    /// thread and flushes the ready queue. Frames already handed out stay
    /// valid. Idempotent.
    pub fn stop(&self) {
        self.stop_locked(&mut self.control.lock());
    }

    fn stop_locked(&self, control: &mut Control) {
        if !self.is_started() {
            log_verbose!("stop() while not started");
            // Still reap a delivery thread left over from a disconnect.
        }
        self.shared.is_started.store(false, Ordering::Release);
        // Wake grab waiters and the delivery thread before joining anything.
        self.shared.queue.set_stopped(true);
        if let Some(backend) = control.backend.as_mut() {
            backend.stop();
        }
        if let Some(delivery) = control.delivery.take() {
            let _ = delivery.join();
        }
        self.shared.queue.flush();
    }

    /// Close the device. Implies `stop`. Idempotent.
    pub fn close(&self) {
        self.close_locked(&mut self.control.lock());
    }

    fn close_locked(&self, control: &mut Control) {
        self.stop_locked(control);
        if let Some(mut backend) = control.backend.take() {
            backend.close();
        }
        control.device = None;
        control.effective = None;
        control.plan = None;
        self.shared.is_opened.store(false, Ordering::Release);
    }

    /// Pop the next ready frame.
    ///
    /// `timeout_ms == 0` is non-blocking; [`GRAB_TIMEOUT_INFINITE`] blocks
    /// until a frame arrives or the session leaves `Started`. Returns `None`
    /// on timeout, stop, disconnect, or when called from inside the frame
    /// callback (self-deadlock guard).
    #[must_use]
    pub fn grab(&self, timeout_ms: u64) -> Option<Frame> {
        if !self.is_started() {
            log_warn!("grab() while not started");
            return None;
        }
        if *self.shared.delivery_id.lock() == Some(thread::current().id()) {
            log_warn!("grab() called from inside the frame callback; returning None");
            return None;
        }
        let timeout = if timeout_ms == GRAB_TIMEOUT_INFINITE {
            None
        } else {
            Some(Duration::from_millis(timeout_ms))
        };
        self.shared.queue.pop(timeout)
    }

    /// Register a frame callback, invoked on an internal delivery thread.
    ///
    /// The return value decides whether the frame is consumed (`true`) or
    /// left in the queue for `grab` (`false`). The callback must not call
    /// `stop` or `close` (self-deadlock); `grab` from inside it returns
    /// `None`.
    pub fn set_new_frame_callback(&self, callback: impl FnMut(&Frame) -> bool + Send + 'static) {
        *self.shared.callback.lock() = Some(Box::new(callback));
        if self.is_started() {
            self.spawn_delivery(&mut self.control.lock());
        }
    }

    /// Remove the frame callback. Frames flow to `grab` again.
    pub fn clear_new_frame_callback(&self) {
        *self.shared.callback.lock() = None;
    }

    /// Register a hook invoked when the device disconnects at runtime.
    pub fn set_disconnect_callback(&self, callback: impl FnMut() + Send + 'static) {
        *self.shared.disconnect.lock() = Some(Box::new(callback));
    }

    /// Install a custom allocator factory for frame backing memory. Only
    /// effective before `start`; returns false while started.
    pub fn set_frame_allocator(
        &self,
        factory: impl Fn() -> Box<dyn FrameAllocator> + Send + Sync + 'static,
    ) -> bool {
        let mut control = self.control.lock();
        if self.is_started() {
            log_warn!("set_frame_allocator() requires stop()");
            return false;
        }
        control.allocator_factory = Some(Box::new(factory));
        control.pool = None;
        true
    }

    /// Bound on the ready queue (default 3, minimum 1).
    pub fn set_max_available_frame_size(&self, frames: usize) {
        self.shared.queue.set_max_available(frames);
    }

    /// Bound on the pool of cached frame slots (default 15; at least 3
    /// recommended). Lowering it does not reclaim outstanding frames; the
    /// surplus retires as they are released.
    pub fn set_max_cache_frame_size(&self, slots: usize) {
        let mut control = self.control.lock();
        control.pool_max = slots.max(1);
        if let Some(pool) = &control.pool {
            pool.set_max_cache_size(slots);
        }
    }

    /// Set a stream property. Refused (with a warning) while started.
    pub fn set(&self, prop: CaptureProperty, value: f64) -> bool {
        let mut control = self.control.lock();
        if self.is_started() {
            log_warn!(?prop, "property changes require stop()");
            return false;
        }
        match prop {
            CaptureProperty::Width => {
                if !(value.is_finite() && value >= 1.0) {
                    return false;
                }
                control.desired.width = value as u32;
            }
            CaptureProperty::Height => {
                if !(value.is_finite() && value >= 1.0) {
                    return false;
                }
                control.desired.height = value as u32;
            }
            CaptureProperty::FrameRate => {
                if !(value.is_finite() && value > 0.0) {
                    return false;
                }
                control.desired.fps = value;
            }
            CaptureProperty::PixelFormat => {
                if !value.is_finite() || value < 0.0 {
                    return false;
                }
                control.desired.format = PixelFormat::from_bits(value as u32);
            }
        }
        control.effective = None;
        true
    }

    /// Read back a stream property. After `start` this is the effective
    /// (post-negotiation) value; `NaN` when unknown.
    #[must_use]
    pub fn get(&self, prop: CaptureProperty) -> f64 {
        let control = self.control.lock();
        let cfg = control.effective.unwrap_or(control.desired);
        match prop {
            CaptureProperty::Width => {
                if cfg.width == 0 {
                    f64::NAN
                } else {
                    f64::from(cfg.width)
                }
            }
            CaptureProperty::Height => {
                if cfg.height == 0 {
                    f64::NAN
                } else {
                    f64::from(cfg.height)
                }
            }
            CaptureProperty::FrameRate => cfg.fps,
            CaptureProperty::PixelFormat => {
                let format = Self::visible_format(&control);
                if format == PixelFormat::UNKNOWN {
                    f64::NAN
                } else {
                    f64::from(format.bits())
                }
            }
        }
    }

    /// Convenience setter for width and height together.
    pub fn set_resolution(&self, width: u32, height: u32) -> bool {
        self.set(CaptureProperty::Width, f64::from(width))
            && self.set(CaptureProperty::Height, f64::from(height))
    }

    /// Convenience setter for the frame rate.
    pub fn set_frame_rate(&self, fps: f64) -> bool {
        self.set(CaptureProperty::FrameRate, fps)
    }

    /// Convenience setter for the pixel format.
    pub fn set_pixel_format(&self, format: PixelFormat) -> bool {
        let mut control = self.control.lock();
        if self.is_started() {
            log_warn!("property changes require stop()");
            return false;
        }
        control.desired.format = format;
        control.effective = None;
        true
    }

    /// The pixel format frames actually carry: the conversion target when a
    /// converter is installed, otherwise the negotiated native format.
    #[must_use]
    pub fn current_format(&self) -> PixelFormat {
        Self::visible_format(&self.control.lock())
    }

    fn visible_format(control: &Control) -> PixelFormat {
        match (&control.plan, &control.effective) {
            (Some(plan), Some(_)) => plan.target.unforced(),
            (None, Some(cfg)) => cfg.format,
            _ => control.desired.format.unforced(),
        }
    }

    fn spawn_delivery(&self, control: &mut Control) {
        if control.delivery.is_some() {
            return;
        }
        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name("camcap-delivery".to_string())
            .spawn(move || {
                *shared.delivery_id.lock() = Some(thread::current().id());
                let mut last = None;
                loop {
                    let Some(frame) = shared.queue.take_after(last) else {
                        break;
                    };
                    last = Some(frame.frame_index());
                    let consumed = match shared.callback.lock().as_mut() {
                        Some(cb) => cb(&frame),
                        None => false,
                    };
                    if !consumed {
                        shared.queue.reinstate(frame);
                    }
                }
                *shared.delivery_id.lock() = None;
            });
        match spawned {
            Ok(handle) => control.delivery = Some(handle),
            Err(e) => log_error!("failed to spawn delivery thread: {e}"),
        }
    }
}

impl Drop for CaptureProvider {
    fn drop(&mut self) {
        self.close();
        // Give in-flight frames a bounded window to come home so their
        // release hooks run against a live pool.
        let pool = self.control.lock().pool.clone();
        if let Some(pool) = pool {
            if !pool.wait_idle(Duration::from_millis(500)) {
                log_warn!(
                    outstanding = pool.outstanding(),
                    "frames still outstanding at provider drop"
                );
            }
        }
    }
}

fn make_sink(shared: Arc<Shared>, pool: Arc<FramePool>, plan: Option<ConversionPlan>) -> SampleSink {
    Box::new(move |mut sample: RawSample| {
        if !shared.is_started.load(Ordering::Acquire) {
            // Late sample after stop; its release hook runs on drop.
            return;
        }
        let Some(mut slot) = pool.acquire() else {
            log_warn!("frame pool exhausted, dropping sample");
            return;
        };

        slot.planes = sample.planes;
        slot.strides = sample.strides;
        slot.width = sample.width;
        slot.height = sample.height;
        slot.format = sample.format;
        slot.timestamp_ns = sample.timestamp_ns;
        slot.orientation = sample.orientation;
        slot.size_in_bytes = sample.format.frame_size(sample.width, sample.height);
        slot.zero_copy = true;
        slot.frame_index = shared.frame_counter.fetch_add(1, Ordering::Relaxed);

        let mut release = sample.release.take();
        if let Some(plan) = &plan {
            match convert_in_place(&mut slot, plan) {
                Ok(()) => {
                    // The converter copied out of the native buffer; release
                    // it right away instead of pinning it to the frame.
                    if let Some(release) = release.take() {
                        release.run();
                    }
                }
                Err(err) => {
                    log_warn!("dropping sample, conversion failed: {err}");
                    pool.recycle(slot);
                    return;
                }
            }
        }

        shared.queue.push(Frame::publish(slot, release, pool.downgrade()));
    })
}

fn negotiate(
    caps: &[FormatCaps],
    desired: &StreamConfig,
) -> Result<(StreamConfig, Option<PixelFormat>), CaptureError> {
    if caps.is_empty() {
        return Err(CaptureError::FormatUnsupported(desired.format));
    }
    let mut native_formats: Vec<PixelFormat> = Vec::new();
    for cap in caps {
        if !native_formats.contains(&cap.format) {
            native_formats.push(cap.format);
        }
    }

    let want = desired.format.unforced();
    let exact = native_formats.iter().copied().find(|f| f.contains(want));
    let (native, plan_target) = match exact {
        Some(format) => (format, None),
        None if desired.format.is_forced() => {
            let source = closest_native(want, &native_formats);
            if !ConversionPlan::supported(source, want) {
                return Err(CaptureError::FormatUnsupported(desired.format));
            }
            log_info!(
                native = %source,
                requested = %desired.format,
                "installing pixel converter for forced format"
            );
            (source, Some(want))
        }
        None => {
            // No force bit: downgrade and deliver the native family as-is.
            let source = closest_native(want, &native_formats);
            log_info!(native = %source, requested = %want, "downgrading to native format");
            (source, None)
        }
    };

    let (width, height) = snap_resolution(caps, native, desired.width, desired.height);
    let fps = caps
        .iter()
        .find(|c| c.format == native && c.width == width && c.height == height)
        .map_or(desired.fps, |c| desired.fps.clamp(c.fps_min, c.fps_max));

    Ok((
        StreamConfig {
            width,
            height,
            fps,
            format: native,
        },
        plan_target,
    ))
}

fn closest_native(want: PixelFormat, formats: &[PixelFormat]) -> PixelFormat {
    if let Some(f) = formats.iter().find(|f| f.same_family(want)) {
        return *f;
    }
    for pref in [
        PixelFormat::NV12F,
        PixelFormat::NV12V,
        PixelFormat::NV12,
        PixelFormat::BGRA32,
        PixelFormat::BGR24,
    ] {
        if let Some(f) = formats.iter().find(|f| f.contains(pref)) {
            return *f;
        }
    }
    formats[0]
}

fn snap_resolution(caps: &[FormatCaps], format: PixelFormat, width: u32, height: u32) -> (u32, u32) {
    let options: Vec<(u32, u32)> = caps
        .iter()
        .filter(|c| c.format == format)
        .map(|c| (c.width, c.height))
        .collect();
    if options.is_empty() || options.contains(&(width, height)) {
        return (width, height);
    }
    // Prefer geometries covering the request; among those, the smallest.
    let covering = options
        .iter()
        .copied()
        .filter(|(w, h)| *w >= width && *h >= height)
        .min_by_key(|(w, h)| u64::from(*w) * u64::from(*h));
    if let Some(best) = covering {
        return best;
    }
    let requested = u64::from(width) * u64::from(height);
    options
        .into_iter()
        .min_by_key(|(w, h)| (u64::from(*w) * u64::from(*h)).abs_diff(requested))
        .unwrap_or((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(format: PixelFormat, width: u32, height: u32) -> FormatCaps {
        FormatCaps {
            format,
            width,
            height,
            fps_min: 1.0,
            fps_max: 30.0,
        }
    }

    #[test]
    fn native_format_needs_no_plan() {
        let caps = [cap(PixelFormat::NV12V, 640, 480)];
        let desired = StreamConfig {
            format: PixelFormat::NV12,
            ..StreamConfig::default()
        };
        let (cfg, plan) = negotiate(&caps, &desired).expect("negotiate");
        assert_eq!(cfg.format, PixelFormat::NV12V);
        assert!(plan.is_none());
    }

    #[test]
    fn forced_format_installs_plan() {
        let caps = [cap(PixelFormat::NV12V, 640, 480)];
        let desired = StreamConfig {
            format: PixelFormat::BGRA32.forced(),
            ..StreamConfig::default()
        };
        let (cfg, plan) = negotiate(&caps, &desired).expect("negotiate");
        assert_eq!(cfg.format, PixelFormat::NV12V);
        assert_eq!(plan, Some(PixelFormat::BGRA32));
    }

    #[test]
    fn unforced_mismatch_downgrades() {
        let caps = [cap(PixelFormat::NV12V, 640, 480)];
        let desired = StreamConfig {
            format: PixelFormat::BGRA32,
            ..StreamConfig::default()
        };
        let (cfg, plan) = negotiate(&caps, &desired).expect("negotiate");
        assert_eq!(cfg.format, PixelFormat::NV12V);
        assert!(plan.is_none());
    }

    #[test]
    fn forced_yuv_from_rgb_only_device_is_unsupported() {
        let caps = [cap(PixelFormat::BGRA32, 640, 480)];
        let desired = StreamConfig {
            format: PixelFormat::NV12V.forced(),
            ..StreamConfig::default()
        };
        assert!(matches!(
            negotiate(&caps, &desired),
            Err(CaptureError::FormatUnsupported(_))
        ));
    }

    #[test]
    fn snapping_prefers_covering_then_smallest() {
        let caps = [
            cap(PixelFormat::NV12V, 320, 240),
            cap(PixelFormat::NV12V, 800, 600),
            cap(PixelFormat::NV12V, 1920, 1080),
        ];
        assert_eq!(snap_resolution(&caps, PixelFormat::NV12V, 640, 480), (800, 600));
        // Nothing covers the request: closest total pixel count wins.
        assert_eq!(
            snap_resolution(&caps, PixelFormat::NV12V, 4000, 3000),
            (1920, 1080)
        );
        // Exact matches pass through.
        assert_eq!(snap_resolution(&caps, PixelFormat::NV12V, 320, 240), (320, 240));
    }

    #[test]
    fn grab_before_start_returns_none() {
        let provider = CaptureProvider::new();
        assert!(provider.grab(0).is_none());
        assert!(!provider.is_opened());
        assert!(!provider.is_started());
    }

    #[test]
    fn start_while_closed_is_invalid() {
        let provider = CaptureProvider::new();
        assert!(matches!(
            provider.start(),
            Err(CaptureError::InvalidState { op: "start", .. })
        ));
    }

    #[test]
    fn properties_round_trip_before_start() {
        let provider = CaptureProvider::new();
        assert!(provider.set(CaptureProperty::Width, 1280.0));
        assert!(provider.set(CaptureProperty::Height, 720.0));
        assert!(provider.set(CaptureProperty::FrameRate, 25.0));
        assert!(provider.set_pixel_format(PixelFormat::I420F));
        assert_eq!(provider.get(CaptureProperty::Width), 1280.0);
        assert_eq!(provider.get(CaptureProperty::Height), 720.0);
        assert_eq!(provider.get(CaptureProperty::FrameRate), 25.0);
        assert_eq!(
            provider.get(CaptureProperty::PixelFormat) as u32,
            PixelFormat::I420F.bits()
        );
        assert!(!provider.set(CaptureProperty::Width, 0.0));
        assert!(!provider.set(CaptureProperty::FrameRate, f64::NAN));
    }
}
