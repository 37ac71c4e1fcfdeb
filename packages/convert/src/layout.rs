//! Packed RGB layouts and YUV numeric ranges.

/// Channel order of a packed RGB image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RgbLayout {
    /// R, G, B at 3 bytes per pixel.
    Rgb,
    /// B, G, R at 3 bytes per pixel.
    Bgr,
    /// R, G, B, A at 4 bytes per pixel.
    Rgba,
    /// B, G, R, A at 4 bytes per pixel.
    Bgra,
}

impl RgbLayout {
    /// Bytes per pixel for this layout.
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /// Whether the layout carries an alpha channel.
    #[must_use]
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba | Self::Bgra)
    }

    /// Byte offsets of (R, G, B, alpha) within one pixel.
    pub(crate) fn offsets(self) -> (usize, usize, usize, Option<usize>) {
        match self {
            Self::Rgb => (0, 1, 2, None),
            Self::Bgr => (2, 1, 0, None),
            Self::Rgba => (0, 1, 2, Some(3)),
            Self::Bgra => (2, 1, 0, Some(3)),
        }
    }
}

/// Numeric range of a BT.601 YUV image.
///
/// Video range keeps Y in [16, 235]; full range uses the whole byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YuvRange {
    /// Limited ("TV") range.
    Video,
    /// Full ("PC") range.
    Full,
}

/// Borrowed chroma plane(s) of a 4:2:0 source row pair.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ChromaRow<'a> {
    /// Interleaved UV (NV12) or VU (`swap` set, NV21).
    Interleaved { uv: &'a [u8], swap: bool },
    /// Separate half-width U and V rows (I420).
    Planar { u: &'a [u8], v: &'a [u8] },
}
