//! Cross-platform camera capture with a pooled frame pipeline.
//!
//! camcap opens an OS-native camera, negotiates resolution, frame rate and
//! pixel format, and delivers decoded frames either by pull
//! ([`CaptureProvider::grab`]) or by push (a registered frame callback).
//! Between the platform capture thread and the application sits a
//! fixed-capacity pool of reusable frame slots and a bounded ready queue
//! with drop-oldest backpressure, so a slow consumer costs frames, never
//! memory.
//!
//! # Quick start
//!
//! ```no_run
//! use camcap::{CaptureProvider, PixelFormat, GRAB_TIMEOUT_INFINITE};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut provider = CaptureProvider::new();
//! provider.open("")?; // empty name: default device
//! provider.set_resolution(640, 480);
//! provider.set_pixel_format(PixelFormat::NV12);
//! provider.start()?;
//!
//! if let Some(frame) = provider.grab(1000) {
//!     println!(
//!         "frame {}: {}x{} {}",
//!         frame.frame_index(),
//!         frame.width(),
//!         frame.height(),
//!         frame.pixel_format()
//!     );
//! }
//! provider.stop();
//! # Ok(())
//! # }
//! ```
//!
//! # Forced formats
//!
//! Requesting `PixelFormat::BGRA32.forced()` guarantees BGRA frames even on
//! hardware that only produces YUV: the provider installs an in-place
//! converter (AVX2-accelerated where available) on the capture path. Without
//! the force bit the provider downgrades to whatever family the device
//! offers and reports it through the frame's `pixel_format()`.
//!
//! # Zero copy
//!
//! When the device delivers the requested format natively, frame planes
//! alias the native capture buffer: no copy happens on the delivery path,
//! and the buffer stays pinned until the last [`Frame`] handle drops.
//!
//! # Feature flags
//!
//! - `simd` (default): AVX2 conversion kernels with runtime dispatch.
//! - `camera-v4l2`: the Linux Video4Linux2 backend.
//!
//! A synthetic test-pattern device is always compiled in and doubles as the
//! default device on machines without a camera.

mod convert;
mod dump;
mod error;
mod format;
mod frame;
mod log;
mod pool;
mod provider;
mod queue;

pub mod backend;

pub use camcap_convert::{simd_active, RgbLayout, YuvRange};
pub use dump::dump_frame;
pub use error::CaptureError;
pub use format::PixelFormat;
pub use frame::{Frame, FrameAllocator, HeapAllocator, NativeRelease, Orientation, MAX_PLANES};
pub use log::{log_level, set_log_level, LogLevel};
pub use pool::DEFAULT_MAX_CACHE;
pub use provider::{CaptureProperty, CaptureProvider, FrameCallback, GRAB_TIMEOUT_INFINITE};
pub use queue::DEFAULT_MAX_AVAILABLE;
