//! The 32-bit tagged pixel-format value.
//!
//! A format is a family discriminant in the low nibble plus orthogonal flag
//! bits (YUV/RGB class, YUV range, alpha, channel order, force). Equality and
//! containment are plain bit tests, so `NV12V.contains(NV12)` holds while
//! `NV12V == NV12` does not.

use camcap_convert::{RgbLayout, YuvRange};
use std::fmt;

/// Pixel format of a captured frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PixelFormat(u32);

impl PixelFormat {
    const FAMILY_MASK: u32 = 0x0000_000F;
    const FAMILY_NV12: u32 = 0x0000_0001;
    const FAMILY_NV21: u32 = 0x0000_0002;
    const FAMILY_I420: u32 = 0x0000_0003;
    const FAMILY_RGB: u32 = 0x0000_0004;
    const FAMILY_BGR: u32 = 0x0000_0005;

    const YUV_BIT: u32 = 0x0000_0010;
    const RANGE_VIDEO: u32 = 0x0000_0020;
    const RANGE_FULL: u32 = 0x0000_0040;
    const RGB_BIT: u32 = 0x0000_0080;
    const ALPHA_BIT: u32 = 0x0000_0100;
    const BGR_ORDER_BIT: u32 = 0x0000_0200;
    const FORCE_BIT: u32 = 0x0000_8000;

    /// No format selected.
    pub const UNKNOWN: Self = Self(0);

    /// NV12, range unspecified.
    pub const NV12: Self = Self(Self::FAMILY_NV12 | Self::YUV_BIT);
    /// NV12, video range.
    pub const NV12V: Self = Self(Self::NV12.0 | Self::RANGE_VIDEO);
    /// NV12, full range.
    pub const NV12F: Self = Self(Self::NV12.0 | Self::RANGE_FULL);
    /// NV21, range unspecified.
    pub const NV21: Self = Self(Self::FAMILY_NV21 | Self::YUV_BIT);
    /// NV21, video range.
    pub const NV21V: Self = Self(Self::NV21.0 | Self::RANGE_VIDEO);
    /// NV21, full range.
    pub const NV21F: Self = Self(Self::NV21.0 | Self::RANGE_FULL);
    /// I420, range unspecified.
    pub const I420: Self = Self(Self::FAMILY_I420 | Self::YUV_BIT);
    /// I420, video range.
    pub const I420V: Self = Self(Self::I420.0 | Self::RANGE_VIDEO);
    /// I420, full range.
    pub const I420F: Self = Self(Self::I420.0 | Self::RANGE_FULL);

    /// Packed R, G, B.
    pub const RGB24: Self = Self(Self::FAMILY_RGB | Self::RGB_BIT);
    /// Packed B, G, R.
    pub const BGR24: Self = Self(Self::FAMILY_BGR | Self::RGB_BIT | Self::BGR_ORDER_BIT);
    /// Packed R, G, B, A.
    pub const RGBA32: Self = Self(Self::RGB24.0 | Self::ALPHA_BIT);
    /// Packed B, G, R, A.
    pub const BGRA32: Self = Self(Self::BGR24.0 | Self::ALPHA_BIT);

    /// Raw bit value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reconstruct from a raw bit value.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// This format with the force bit set: the caller requires it exactly,
    /// enabling conversion when the hardware cannot deliver it.
    #[must_use]
    pub const fn forced(self) -> Self {
        Self(self.0 | Self::FORCE_BIT)
    }

    /// This format with the force bit cleared.
    #[must_use]
    pub const fn unforced(self) -> Self {
        Self(self.0 & !Self::FORCE_BIT)
    }

    /// Whether the force bit is set.
    #[must_use]
    pub const fn is_forced(self) -> bool {
        self.0 & Self::FORCE_BIT != 0
    }

    /// Bitwise containment: every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Same low-nibble family discriminant.
    #[must_use]
    pub const fn same_family(self, other: Self) -> bool {
        self.0 & Self::FAMILY_MASK == other.0 & Self::FAMILY_MASK
    }

    /// Any 4:2:0 YUV family.
    #[must_use]
    pub const fn is_yuv(self) -> bool {
        self.0 & Self::YUV_BIT != 0
    }

    /// Any packed RGB/BGR family.
    #[must_use]
    pub const fn is_rgb(self) -> bool {
        self.0 & Self::RGB_BIT != 0
    }

    /// Packed format with an alpha channel.
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        self.0 & Self::ALPHA_BIT != 0
    }

    /// Packed format in B-first channel order.
    #[must_use]
    pub const fn is_bgr_order(self) -> bool {
        self.0 & Self::BGR_ORDER_BIT != 0
    }

    /// Biplanar YUV with V before U (NV21).
    #[must_use]
    pub const fn is_vu_order(self) -> bool {
        self.0 & Self::FAMILY_MASK == Self::FAMILY_NV21
    }

    /// YUV range, if the format specifies one.
    #[must_use]
    pub fn yuv_range(self) -> Option<YuvRange> {
        if self.0 & Self::RANGE_FULL != 0 {
            Some(YuvRange::Full)
        } else if self.0 & Self::RANGE_VIDEO != 0 {
            Some(YuvRange::Video)
        } else {
            None
        }
    }

    /// Packed-RGB channel layout, for RGB-class formats.
    #[must_use]
    pub fn rgb_layout(self) -> Option<RgbLayout> {
        if !self.is_rgb() {
            return None;
        }
        Some(match (self.is_bgr_order(), self.has_alpha()) {
            (false, false) => RgbLayout::Rgb,
            (true, false) => RgbLayout::Bgr,
            (false, true) => RgbLayout::Rgba,
            (true, true) => RgbLayout::Bgra,
        })
    }

    /// Number of planes this format carries.
    #[must_use]
    pub fn plane_count(self) -> usize {
        match self.0 & Self::FAMILY_MASK {
            Self::FAMILY_NV12 | Self::FAMILY_NV21 => 2,
            Self::FAMILY_I420 => 3,
            Self::FAMILY_RGB | Self::FAMILY_BGR => 1,
            _ => 0,
        }
    }

    /// Bytes per pixel of plane 0 (1 for YUV luma, 3 or 4 for packed).
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        if self.is_yuv() {
            1
        } else if self.has_alpha() {
            4
        } else {
            3
        }
    }

    /// Rows of the given plane for an image `height` rows tall.
    #[must_use]
    pub fn plane_rows(self, plane: usize, height: u32) -> usize {
        let h = height as usize;
        match plane {
            0 => h,
            _ if plane < self.plane_count() => h / 2,
            _ => 0,
        }
    }

    /// Payload bytes of one row of the given plane at `width` pixels.
    #[must_use]
    pub fn plane_row_bytes(self, plane: usize, width: u32) -> usize {
        let w = width as usize;
        match (self.0 & Self::FAMILY_MASK, plane) {
            (Self::FAMILY_RGB | Self::FAMILY_BGR, 0) => w * self.bytes_per_pixel(),
            (Self::FAMILY_NV12 | Self::FAMILY_NV21 | Self::FAMILY_I420, 0) => w,
            // Interleaved UV covers the full width.
            (Self::FAMILY_NV12 | Self::FAMILY_NV21, 1) => w,
            (Self::FAMILY_I420, 1 | 2) => w / 2,
            _ => 0,
        }
    }

    /// Total payload bytes of a tightly packed image.
    #[must_use]
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        (0..self.plane_count())
            .map(|p| self.plane_rows(p, height) * self.plane_row_bytes(p, width))
            .sum()
    }

    /// Short name, e.g. `NV12v` or `BGRA32`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self.unforced() {
            Self::NV12 => "NV12",
            Self::NV12V => "NV12v",
            Self::NV12F => "NV12f",
            Self::NV21 => "NV21",
            Self::NV21V => "NV21v",
            Self::NV21F => "NV21f",
            Self::I420 => "I420",
            Self::I420V => "I420v",
            Self::I420F => "I420f",
            Self::RGB24 => "RGB24",
            Self::BGR24 => "BGR24",
            Self::RGBA32 => "RGBA32",
            Self::BGRA32 => "BGRA32",
            Self::UNKNOWN => "unknown",
            _ => "invalid",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        if self.is_forced() {
            f.write_str("+force")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelFormat({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_bitwise() {
        assert!(PixelFormat::NV12V.contains(PixelFormat::NV12));
        assert!(!PixelFormat::NV12.contains(PixelFormat::NV12V));
        assert_ne!(PixelFormat::NV12, PixelFormat::NV12V);
        assert!(PixelFormat::BGRA32.contains(PixelFormat::BGR24));
        assert!(!PixelFormat::NV12.contains(PixelFormat::NV21));
    }

    #[test]
    fn force_round_trips() {
        let f = PixelFormat::BGRA32.forced();
        assert!(f.is_forced());
        assert_eq!(f.unforced(), PixelFormat::BGRA32);
        assert!(f.contains(PixelFormat::BGRA32));
        assert_eq!(f.to_string(), "BGRA32+force");
    }

    #[test]
    fn class_bits() {
        for f in [PixelFormat::NV12, PixelFormat::NV21F, PixelFormat::I420V] {
            assert!(f.is_yuv() && !f.is_rgb());
        }
        for f in [PixelFormat::RGB24, PixelFormat::BGRA32] {
            assert!(f.is_rgb() && !f.is_yuv());
        }
        assert!(PixelFormat::BGR24.is_bgr_order());
        assert!(!PixelFormat::RGBA32.is_bgr_order());
        assert!(PixelFormat::NV21.is_vu_order());
        assert!(!PixelFormat::NV12.is_vu_order());
    }

    #[test]
    fn sizes() {
        assert_eq!(PixelFormat::NV12.frame_size(640, 480), 640 * 480 * 3 / 2);
        assert_eq!(PixelFormat::I420F.frame_size(640, 480), 640 * 480 * 3 / 2);
        assert_eq!(PixelFormat::RGB24.frame_size(640, 480), 640 * 480 * 3);
        assert_eq!(PixelFormat::BGRA32.frame_size(640, 480), 640 * 480 * 4);
        assert_eq!(PixelFormat::NV12.plane_count(), 2);
        assert_eq!(PixelFormat::I420.plane_count(), 3);
        assert_eq!(PixelFormat::BGRA32.plane_count(), 1);
    }

    #[test]
    fn yuv_ranges() {
        assert_eq!(PixelFormat::NV12.yuv_range(), None);
        assert_eq!(PixelFormat::NV12V.yuv_range(), Some(YuvRange::Video));
        assert_eq!(PixelFormat::I420F.yuv_range(), Some(YuvRange::Full));
    }
}
