//! Scalar reference kernels.
//!
//! These are the semantics; the AVX2 kernels must match them bit-for-bit.
//! They also run the tail pixels the vector kernels leave behind.

use crate::layout::{ChromaRow, RgbLayout, YuvRange};

/// BT.601 integer coefficients, scaled by 256.
pub(crate) const COEF_Y: i32 = 298;
pub(crate) const COEF_RV: i32 = 409;
pub(crate) const COEF_GU: i32 = 100;
pub(crate) const COEF_GV: i32 = 208;
pub(crate) const COEF_BU: i32 = 516;

#[inline]
fn clip(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// One YUV pixel to (R, G, B).
///
/// Rounding is add-128-then-arithmetic-shift-right-8. Video-range Y below 16
/// underflows through the clamp; that is the contract.
#[inline]
pub(crate) fn yuv_to_rgb_px(y: i32, u: i32, v: i32, range: YuvRange) -> (u8, u8, u8) {
    let c = match range {
        YuvRange::Video => COEF_Y * (y - 16),
        // Unit luma gain keeps full-range conversion the identity on
        // pure-luma input.
        YuvRange::Full => y << 8,
    };
    let d = u - 128;
    let e = v - 128;
    let r = clip((c + COEF_RV * e + 128) >> 8);
    let g = clip((c - COEF_GU * d - COEF_GV * e + 128) >> 8);
    let b = clip((c + COEF_BU * d + 128) >> 8);
    (r, g, b)
}

/// Channel-shuffle `width` pixels starting at the head of both spans.
pub(crate) fn shuffle_span(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    src_layout: RgbLayout,
    dst_layout: RgbLayout,
) {
    let (sr, sg, sb, sa) = src_layout.offsets();
    let (dr, dg, db, da) = dst_layout.offsets();
    let spp = src_layout.bytes_per_pixel();
    let dpp = dst_layout.bytes_per_pixel();

    for p in 0..width {
        let s = p * spp;
        let d = p * dpp;
        dst[d + dr] = src[s + sr];
        dst[d + dg] = src[s + sg];
        dst[d + db] = src[s + sb];
        if let Some(da) = da {
            dst[d + da] = sa.map_or(0xFF, |sa| src[s + sa]);
        }
    }
}

/// Convert `width` 4:2:0 pixels of one row into a packed RGB row.
///
/// `chroma` is the chroma row covering this luma row; the pixel at `x`
/// samples chroma column `x / 2`.
pub(crate) fn yuv_span(
    y_row: &[u8],
    chroma: ChromaRow<'_>,
    range: YuvRange,
    dst: &mut [u8],
    layout: RgbLayout,
    x0: usize,
    width: usize,
) {
    let (ro, go, bo, ao) = layout.offsets();
    let bpp = layout.bytes_per_pixel();

    for x in x0..width {
        let (u, v) = match chroma {
            ChromaRow::Interleaved { uv, swap } => {
                let i = (x / 2) * 2;
                if swap {
                    (uv[i + 1], uv[i])
                } else {
                    (uv[i], uv[i + 1])
                }
            }
            ChromaRow::Planar { u, v } => (u[x / 2], v[x / 2]),
        };
        let (r, g, b) = yuv_to_rgb_px(i32::from(y_row[x]), i32::from(u), i32::from(v), range);
        let d = x * bpp;
        dst[d + ro] = r;
        dst[d + go] = g;
        dst[d + bo] = b;
        if let Some(ao) = ao {
            dst[d + ao] = 0xFF;
        }
    }
}

/// Full scalar shuffle of one row.
pub(crate) fn shuffle_row(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    src_layout: RgbLayout,
    dst_layout: RgbLayout,
) {
    shuffle_span(src, dst, width, src_layout, dst_layout);
}

/// Full scalar conversion of one row.
pub(crate) fn yuv_row(
    y_row: &[u8],
    chroma: ChromaRow<'_>,
    range: YuvRange,
    dst: &mut [u8],
    layout: RgbLayout,
    width: usize,
) {
    yuv_span(y_row, chroma, range, dst, layout, 0, width);
}
