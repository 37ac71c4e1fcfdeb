//! AVX2 kernels.
//!
//! Same math as `scalar`, eight (YUV) or up to ten (3-channel shuffles)
//! pixels per iteration. The byte-shuffle paths use a precomputed 32-byte
//! permutation mask applied per 128-bit lane; lanes are loaded and stored at
//! independent offsets so 3-byte-per-pixel rows stay packed.
//!
//! Stores on 3-channel targets overlap by a few bytes. The loop bounds
//! guarantee every overrun byte lands inside the row and strictly before the
//! scalar tail, which rewrites it. The final full-vector store therefore
//! never owns bytes past its 30-byte (shuffle) or 24-byte (YUV) payload.

use core::arch::x86_64::*;

use crate::layout::{ChromaRow, RgbLayout, YuvRange};
use crate::scalar::{self, COEF_BU, COEF_GU, COEF_GV, COEF_RV, COEF_Y};

/// Lane geometry and permutation mask for one packed-to-packed shuffle.
pub(crate) struct ShuffleGeom {
    lane_src: usize,
    lane_dst: usize,
    step: usize,
    or_alpha: bool,
    mask: [u8; 32],
}

pub(crate) fn shuffle_geom(src_layout: RgbLayout, dst_layout: RgbLayout) -> ShuffleGeom {
    let spp = src_layout.bytes_per_pixel();
    let dpp = dst_layout.bytes_per_pixel();
    // Pixels per 128-bit lane, limited by whichever side is wider.
    let per_lane = 16 / spp.max(dpp);
    let (sr, sg, sb, sa) = src_layout.offsets();
    let (dr, dg, db, da) = dst_layout.offsets();

    let mut mask = [0x80u8; 32];
    for lane in 0..2 {
        for p in 0..per_lane {
            let out = lane * 16 + p * dpp;
            let s = p * spp;
            mask[out + dr] = (s + sr) as u8;
            mask[out + dg] = (s + sg) as u8;
            mask[out + db] = (s + sb) as u8;
            if let (Some(da), Some(sa)) = (da, sa) {
                mask[out + da] = (s + sa) as u8;
            }
        }
    }

    ShuffleGeom {
        lane_src: per_lane * spp,
        lane_dst: per_lane * dpp,
        step: per_lane * 2,
        or_alpha: da.is_some() && sa.is_none(),
        mask,
    }
}

/// Shuffle one row. `src` and `dst` are exactly `width * bpp` bytes.
///
/// # Safety
///
/// Caller must have verified AVX2 support.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn shuffle_row(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    src_layout: RgbLayout,
    dst_layout: RgbLayout,
    geom: &ShuffleGeom,
) {
    let spp = src_layout.bytes_per_pixel();
    let dpp = dst_layout.bytes_per_pixel();
    let mask = _mm256_loadu_si256(geom.mask.as_ptr().cast());
    let alpha = _mm256_set1_epi32(0xFF00_0000u32 as i32);

    let mut x = 0usize;
    loop {
        let s = x * spp;
        let d = x * dpp;
        if s + geom.lane_src + 16 > src.len() || d + geom.lane_dst + 16 > dst.len() {
            break;
        }
        let lo = _mm_loadu_si128(src.as_ptr().add(s).cast());
        let hi = _mm_loadu_si128(src.as_ptr().add(s + geom.lane_src).cast());
        let mut v = _mm256_shuffle_epi8(_mm256_set_m128i(hi, lo), mask);
        if geom.or_alpha {
            v = _mm256_or_si256(v, alpha);
        }
        _mm_storeu_si128(
            dst.as_mut_ptr().add(d).cast(),
            _mm256_castsi256_si128(v),
        );
        _mm_storeu_si128(
            dst.as_mut_ptr().add(d + geom.lane_dst).cast(),
            _mm256_extracti128_si256::<1>(v),
        );
        x += geom.step;
    }

    scalar::shuffle_span(&src[x * spp..], &mut dst[x * dpp..], width - x, src_layout, dst_layout);
}

// Duplicate every even source byte (U of interleaved UV) into pairs.
const DUP_EVEN: [u8; 16] = [0, 0, 2, 2, 4, 4, 6, 6, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80];
// Duplicate every odd source byte (V of interleaved UV) into pairs.
const DUP_ODD: [u8; 16] = [1, 1, 3, 3, 5, 5, 7, 7, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80];
// Duplicate four sequential bytes (planar chroma) into pairs.
const DUP_SEQ: [u8; 16] = [0, 0, 1, 1, 2, 2, 3, 3, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80];
// Drop the fourth byte of each dword, compacting 4 pixels to 12 bytes per lane.
const SHUF_DROP4: [u8; 32] = [
    0, 1, 2, 4, 5, 6, 8, 9, 10, 12, 13, 14, 0x80, 0x80, 0x80, 0x80,
    0, 1, 2, 4, 5, 6, 8, 9, 10, 12, 13, 14, 0x80, 0x80, 0x80, 0x80,
];

/// Convert one 4:2:0 row to packed RGB. `dst` is exactly `width * bpp` bytes.
///
/// # Safety
///
/// Caller must have verified AVX2 support.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn yuv_row(
    y_row: &[u8],
    chroma: ChromaRow<'_>,
    range: YuvRange,
    dst: &mut [u8],
    layout: RgbLayout,
    width: usize,
) {
    let bpp = layout.bytes_per_pixel();
    let swap_rb = matches!(layout, RgbLayout::Bgr | RgbLayout::Bgra);

    let zero = _mm256_setzero_si256();
    let max = _mm256_set1_epi32(255);
    let round = _mm256_set1_epi32(128);
    let bias = _mm256_set1_epi32(128);
    let alpha = _mm256_set1_epi32(0xFF00_0000u32 as i32);
    let dup_even = _mm_loadu_si128(DUP_EVEN.as_ptr().cast());
    let dup_odd = _mm_loadu_si128(DUP_ODD.as_ptr().cast());
    let dup_seq = _mm_loadu_si128(DUP_SEQ.as_ptr().cast());
    let drop4 = _mm256_loadu_si256(SHUF_DROP4.as_ptr().cast());

    // 3-channel stores overlap by 4 bytes; keep the last vector 10 pixels
    // clear of the row end so the tail rewrites the overrun.
    let guard = if bpp == 4 { 8 } else { 10 };

    let mut x = 0usize;
    while x + guard <= width {
        let y8 = _mm_loadl_epi64(y_row.as_ptr().add(x).cast());
        let y32 = _mm256_cvtepu8_epi32(y8);

        let (u8v, v8v) = match chroma {
            ChromaRow::Interleaved { uv, swap } => {
                let pairs = _mm_loadl_epi64(uv.as_ptr().add(x).cast());
                let even = _mm_shuffle_epi8(pairs, dup_even);
                let odd = _mm_shuffle_epi8(pairs, dup_odd);
                if swap {
                    (odd, even)
                } else {
                    (even, odd)
                }
            }
            ChromaRow::Planar { u, v } => {
                let uq = _mm_cvtsi32_si128(core::ptr::read_unaligned(
                    u.as_ptr().add(x / 2).cast::<i32>(),
                ));
                let vq = _mm_cvtsi32_si128(core::ptr::read_unaligned(
                    v.as_ptr().add(x / 2).cast::<i32>(),
                ));
                (_mm_shuffle_epi8(uq, dup_seq), _mm_shuffle_epi8(vq, dup_seq))
            }
        };

        let c = match range {
            YuvRange::Video => _mm256_mullo_epi32(
                _mm256_sub_epi32(y32, _mm256_set1_epi32(16)),
                _mm256_set1_epi32(COEF_Y),
            ),
            YuvRange::Full => _mm256_slli_epi32::<8>(y32),
        };
        let d = _mm256_sub_epi32(_mm256_cvtepu8_epi32(u8v), bias);
        let e = _mm256_sub_epi32(_mm256_cvtepu8_epi32(v8v), bias);

        let r = _mm256_srai_epi32::<8>(_mm256_add_epi32(
            _mm256_add_epi32(c, _mm256_mullo_epi32(e, _mm256_set1_epi32(COEF_RV))),
            round,
        ));
        let g = _mm256_srai_epi32::<8>(_mm256_add_epi32(
            _mm256_sub_epi32(
                _mm256_sub_epi32(c, _mm256_mullo_epi32(d, _mm256_set1_epi32(COEF_GU))),
                _mm256_mullo_epi32(e, _mm256_set1_epi32(COEF_GV)),
            ),
            round,
        ));
        let b = _mm256_srai_epi32::<8>(_mm256_add_epi32(
            _mm256_add_epi32(c, _mm256_mullo_epi32(d, _mm256_set1_epi32(COEF_BU))),
            round,
        ));

        let r = _mm256_min_epi32(_mm256_max_epi32(r, zero), max);
        let g = _mm256_min_epi32(_mm256_max_epi32(g, zero), max);
        let b = _mm256_min_epi32(_mm256_max_epi32(b, zero), max);

        let (c0, c2) = if swap_rb { (b, r) } else { (r, b) };
        let mut px = _mm256_or_si256(
            _mm256_or_si256(c0, _mm256_slli_epi32::<8>(g)),
            _mm256_slli_epi32::<16>(c2),
        );
        if layout.has_alpha() {
            px = _mm256_or_si256(px, alpha);
        }

        if bpp == 4 {
            _mm256_storeu_si256(dst.as_mut_ptr().add(x * 4).cast(), px);
        } else {
            let packed = _mm256_shuffle_epi8(px, drop4);
            _mm_storeu_si128(
                dst.as_mut_ptr().add(x * 3).cast(),
                _mm256_castsi256_si128(packed),
            );
            _mm_storeu_si128(
                dst.as_mut_ptr().add(x * 3 + 12).cast(),
                _mm256_extracti128_si256::<1>(packed),
            );
        }
        x += 8;
    }

    scalar::yuv_span(y_row, chroma, range, dst, layout, x, width);
}
