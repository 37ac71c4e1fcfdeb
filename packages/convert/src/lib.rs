//! Pixel-format conversion engine for camcap.
//!
//! Stateless conversions between packed RGB layouts and from 4:2:0 YUV
//! (NV12/NV21/I420, video or full range) to packed RGB, with runtime-detected
//! AVX2 kernels and bit-identical scalar fallbacks.
//!
//! # Quick start
//!
//! ```
//! use camcap_convert::{nv12_to_rgb, RgbLayout, YuvRange};
//!
//! let (w, h) = (4usize, 2usize);
//! let y = vec![126u8; w * h];
//! let uv = vec![128u8; w * h / 2];
//! let mut rgb = vec![0u8; w * h * 3];
//!
//! nv12_to_rgb(
//!     &y, w, &uv, w, false, YuvRange::Full,
//!     &mut rgb, w * 3, RgbLayout::Rgb,
//!     w, h as i32,
//! ).unwrap();
//! assert_eq!(rgb[0], 126);
//! ```
//!
//! # Vertical flip
//!
//! Every entry point accepts a signed `height`; a negative value writes the
//! output bottom-up (row 0 of the source lands on the last output row).
//!
//! # Feature flags
//!
//! - `simd` (default): compile the AVX2 kernels on x86_64. The choice
//!   between AVX2 and scalar is still made once at runtime; see
//!   [`active`](dispatch::active).

mod dispatch;
mod error;
mod layout;
mod scalar;

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
mod avx2;

pub use dispatch::{active, Backend};
pub use error::ConvertError;
pub use layout::{RgbLayout, YuvRange};

use layout::ChromaRow;

/// True when the AVX2 kernels are selected for this process.
#[must_use]
pub fn simd_active() -> bool {
    active() == Backend::Avx2
}

fn check_dims(width: usize, height: i32) -> Result<usize, ConvertError> {
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidDimensions { width, height });
    }
    Ok(height.unsigned_abs() as usize)
}

fn check_plane(
    plane: &'static str,
    len: usize,
    stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<(), ConvertError> {
    if stride < row_bytes {
        return Err(ConvertError::StrideTooSmall {
            plane,
            stride,
            min: row_bytes,
        });
    }
    let needed = (rows - 1) * stride + row_bytes;
    if len < needed {
        return Err(ConvertError::BufferTooSmall { plane, len, needed });
    }
    Ok(())
}

/// Reorder packed RGB channels, optionally adding (opaque) or dropping alpha.
///
/// `height < 0` flips the image vertically.
#[allow(clippy::too_many_arguments)]
pub fn shuffle(
    src: &[u8],
    src_stride: usize,
    src_layout: RgbLayout,
    dst: &mut [u8],
    dst_stride: usize,
    dst_layout: RgbLayout,
    width: usize,
    height: i32,
) -> Result<(), ConvertError> {
    let rows = check_dims(width, height)?;
    let spp = src_layout.bytes_per_pixel();
    let dpp = dst_layout.bytes_per_pixel();
    check_plane("source", src.len(), src_stride, width * spp, rows)?;
    check_plane("destination", dst.len(), dst_stride, width * dpp, rows)?;
    let flip = height < 0;

    #[cfg(all(target_arch = "x86_64", feature = "simd"))]
    if active() == Backend::Avx2 {
        let geom = avx2::shuffle_geom(src_layout, dst_layout);
        for r in 0..rows {
            let s = r * src_stride;
            let d = row_base(r, rows, flip) * dst_stride;
            // Safety: AVX2 support was verified by the dispatcher.
            unsafe {
                avx2::shuffle_row(
                    &src[s..s + width * spp],
                    &mut dst[d..d + width * dpp],
                    width,
                    src_layout,
                    dst_layout,
                    &geom,
                );
            }
        }
        return Ok(());
    }

    for r in 0..rows {
        let s = r * src_stride;
        let d = row_base(r, rows, flip) * dst_stride;
        scalar::shuffle_row(
            &src[s..s + width * spp],
            &mut dst[d..d + width * dpp],
            width,
            src_layout,
            dst_layout,
        );
    }
    Ok(())
}

/// Convert biplanar 4:2:0 YUV (NV12, or NV21 with `swap_uv`) to packed RGB.
///
/// `height < 0` flips the image vertically.
#[allow(clippy::too_many_arguments)]
pub fn nv12_to_rgb(
    y: &[u8],
    y_stride: usize,
    uv: &[u8],
    uv_stride: usize,
    swap_uv: bool,
    range: YuvRange,
    dst: &mut [u8],
    dst_stride: usize,
    dst_layout: RgbLayout,
    width: usize,
    height: i32,
) -> Result<(), ConvertError> {
    let rows = check_dims(width, height)?;
    if width % 2 != 0 || rows % 2 != 0 {
        return Err(ConvertError::OddDimensions {
            width,
            height: rows,
        });
    }
    check_plane("Y", y.len(), y_stride, width, rows)?;
    check_plane("UV", uv.len(), uv_stride, width, rows / 2)?;
    let dpp = dst_layout.bytes_per_pixel();
    check_plane("destination", dst.len(), dst_stride, width * dpp, rows)?;

    yuv_rows(
        y,
        y_stride,
        |r| ChromaRow::Interleaved {
            uv: &uv[r / 2 * uv_stride..r / 2 * uv_stride + width],
            swap: swap_uv,
        },
        range,
        dst,
        dst_stride,
        dst_layout,
        width,
        rows,
        height < 0,
    );
    Ok(())
}

/// Convert triplanar 4:2:0 YUV (I420) to packed RGB.
///
/// `height < 0` flips the image vertically.
#[allow(clippy::too_many_arguments)]
pub fn i420_to_rgb(
    y: &[u8],
    y_stride: usize,
    u: &[u8],
    u_stride: usize,
    v: &[u8],
    v_stride: usize,
    range: YuvRange,
    dst: &mut [u8],
    dst_stride: usize,
    dst_layout: RgbLayout,
    width: usize,
    height: i32,
) -> Result<(), ConvertError> {
    let rows = check_dims(width, height)?;
    if width % 2 != 0 || rows % 2 != 0 {
        return Err(ConvertError::OddDimensions {
            width,
            height: rows,
        });
    }
    check_plane("Y", y.len(), y_stride, width, rows)?;
    check_plane("U", u.len(), u_stride, width / 2, rows / 2)?;
    check_plane("V", v.len(), v_stride, width / 2, rows / 2)?;
    let dpp = dst_layout.bytes_per_pixel();
    check_plane("destination", dst.len(), dst_stride, width * dpp, rows)?;

    yuv_rows(
        y,
        y_stride,
        |r| ChromaRow::Planar {
            u: &u[r / 2 * u_stride..r / 2 * u_stride + width / 2],
            v: &v[r / 2 * v_stride..r / 2 * v_stride + width / 2],
        },
        range,
        dst,
        dst_stride,
        dst_layout,
        width,
        rows,
        height < 0,
    );
    Ok(())
}

#[inline]
fn row_base(r: usize, rows: usize, flip: bool) -> usize {
    if flip {
        rows - 1 - r
    } else {
        r
    }
}

#[allow(clippy::too_many_arguments)]
fn yuv_rows<'a, F>(
    y: &'a [u8],
    y_stride: usize,
    chroma: F,
    range: YuvRange,
    dst: &mut [u8],
    dst_stride: usize,
    dst_layout: RgbLayout,
    width: usize,
    rows: usize,
    flip: bool,
) where
    F: Fn(usize) -> ChromaRow<'a>,
{
    let dpp = dst_layout.bytes_per_pixel();

    #[cfg(all(target_arch = "x86_64", feature = "simd"))]
    if active() == Backend::Avx2 {
        for r in 0..rows {
            let s = r * y_stride;
            let d = row_base(r, rows, flip) * dst_stride;
            // Safety: AVX2 support was verified by the dispatcher.
            unsafe {
                avx2::yuv_row(
                    &y[s..s + width],
                    chroma(r),
                    range,
                    &mut dst[d..d + width * dpp],
                    dst_layout,
                    width,
                );
            }
        }
        return;
    }

    for r in 0..rows {
        let s = r * y_stride;
        let d = row_base(r, rows, flip) * dst_stride;
        scalar::yuv_row(
            &y[s..s + width],
            chroma(r),
            range,
            &mut dst[d..d + width * dpp],
            dst_layout,
            width,
        );
    }
}
