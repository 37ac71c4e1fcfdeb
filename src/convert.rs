//! In-place conversion of a frame slot into allocator-owned packed RGB.
//!
//! Precondition: the slot's plane pointers reference *external* memory (the
//! native capture buffer), never the slot's own allocator. The converter
//! sizes the allocator, computes into it, then repoints the planes; after
//! which the native buffer may be released. Running it twice on one frame is
//! a programmer error: debug builds assert, release builds log and skip.

use camcap_convert::YuvRange;

use crate::error::CaptureError;
use crate::format::PixelFormat;
use crate::frame::{FrameSlot, Orientation, MAX_PLANES};
use crate::log::log_error;

/// A negotiated conversion, fixed for the duration of a session.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConversionPlan {
    pub(crate) source: PixelFormat,
    pub(crate) target: PixelFormat,
}

impl ConversionPlan {
    /// Whether the engine can convert `source` into `target`.
    pub(crate) fn supported(source: PixelFormat, target: PixelFormat) -> bool {
        target.is_rgb() && (source.is_yuv() || source.is_rgb())
    }
}

fn plane_slice(slot: &FrameSlot, plane: usize) -> Result<&[u8], CaptureError> {
    let ptr = slot.planes[plane];
    if ptr.is_null() {
        return Err(CaptureError::ConversionMisuse("missing source plane"));
    }
    let rows = slot.format.plane_rows(plane, slot.height);
    let row_bytes = slot.format.plane_row_bytes(plane, slot.width);
    let len = (rows.max(1) - 1) * slot.strides[plane] + row_bytes;
    // Safety: the capture backend pins `len` bytes behind the plane pointer
    // until the sample's release hook runs, which is after conversion.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Convert the slot's pixels into its allocator and repoint the planes.
pub(crate) fn convert_in_place(
    slot: &mut FrameSlot,
    plan: &ConversionPlan,
) -> Result<(), CaptureError> {
    debug_assert!(
        slot.zero_copy,
        "in-place conversion requires external plane data"
    );
    if !slot.zero_copy {
        log_error!("in-place conversion invoked twice on one frame, skipping");
        return Err(CaptureError::ConversionMisuse(
            "frame data already owned by its allocator",
        ));
    }

    let target = plan.target.unforced();
    let Some(dst_layout) = target.rgb_layout() else {
        return Err(CaptureError::ConversionMisuse(
            "conversion target must be a packed RGB format",
        ));
    };

    let width = slot.width;
    let height = slot.height;
    let dst_size = target.frame_size(width, height);
    let dst_stride = target.plane_row_bytes(0, width);
    slot.allocator.resize(dst_size);
    let dst_ptr = slot.allocator.data();
    // Safety: just resized to `dst_size`; external source planes and the
    // allocator buffer are disjoint by the zero-copy precondition.
    let dst = unsafe { std::slice::from_raw_parts_mut(dst_ptr, dst_size) };

    // A bottom-up source is normalized while converting.
    let signed_height = match slot.orientation {
        Orientation::TopDown => height as i32,
        Orientation::BottomUp => -(height as i32),
    };

    let source = slot.format;
    if source.is_yuv() {
        let range = source.yuv_range().unwrap_or(YuvRange::Video);
        let y = plane_slice(slot, 0)?;
        if source.plane_count() == 2 {
            let uv = plane_slice(slot, 1)?;
            camcap_convert::nv12_to_rgb(
                y,
                slot.strides[0],
                uv,
                slot.strides[1],
                source.is_vu_order(),
                range,
                dst,
                dst_stride,
                dst_layout,
                width as usize,
                signed_height,
            )?;
        } else {
            let u = plane_slice(slot, 1)?;
            let v = plane_slice(slot, 2)?;
            camcap_convert::i420_to_rgb(
                y,
                slot.strides[0],
                u,
                slot.strides[1],
                v,
                slot.strides[2],
                range,
                dst,
                dst_stride,
                dst_layout,
                width as usize,
                signed_height,
            )?;
        }
    } else if let Some(src_layout) = source.rgb_layout() {
        let src = plane_slice(slot, 0)?;
        camcap_convert::shuffle(
            src,
            slot.strides[0],
            src_layout,
            dst,
            dst_stride,
            dst_layout,
            width as usize,
            signed_height,
        )?;
    } else {
        return Err(CaptureError::ConversionMisuse(
            "source format is not convertible",
        ));
    }

    slot.planes = [std::ptr::null(); MAX_PLANES];
    slot.planes[0] = dst_ptr.cast_const();
    slot.strides = [dst_stride, 0, 0];
    slot.format = target;
    slot.size_in_bytes = dst_size;
    slot.orientation = Orientation::TopDown;
    slot.zero_copy = false;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::HeapAllocator;

    fn nv12_slot(width: u32, height: u32, buf: &[u8]) -> FrameSlot {
        let mut slot = FrameSlot::new(Box::<HeapAllocator>::default());
        let y_size = (width * height) as usize;
        slot.planes[0] = buf.as_ptr();
        slot.planes[1] = buf[y_size..].as_ptr();
        slot.strides = [width as usize, width as usize, 0];
        slot.format = PixelFormat::NV12F;
        slot.width = width;
        slot.height = height;
        slot.size_in_bytes = buf.len();
        slot.zero_copy = true;
        slot
    }

    #[test]
    fn converts_nv12_into_allocator() {
        let (w, h) = (16u32, 4u32);
        let mut native = vec![128u8; (w * h * 3 / 2) as usize];
        native[..(w * h) as usize].fill(100);
        let mut slot = nv12_slot(w, h, &native);

        let plan = ConversionPlan {
            source: PixelFormat::NV12F,
            target: PixelFormat::BGRA32,
        };
        convert_in_place(&mut slot, &plan).expect("convert");

        assert_eq!(slot.format, PixelFormat::BGRA32);
        assert!(!slot.zero_copy);
        assert_eq!(slot.planes[0], slot.allocator.data().cast_const());
        assert!(slot.planes[1].is_null() && slot.planes[2].is_null());
        assert_eq!(slot.strides[0], (w * 4) as usize);
        assert_eq!(slot.size_in_bytes, (w * h * 4) as usize);

        // Full-range gray luma survives as gray pixels with opaque alpha.
        let out = unsafe { std::slice::from_raw_parts(slot.planes[0], slot.size_in_bytes) };
        for px in out.chunks_exact(4) {
            assert_eq!(px, [100, 100, 100, 255]);
        }
    }

    #[test]
    #[cfg_attr(
        debug_assertions,
        should_panic(expected = "in-place conversion requires external plane data")
    )]
    fn second_conversion_is_rejected() {
        let (w, h) = (8u32, 2u32);
        let native = vec![128u8; (w * h * 3 / 2) as usize];
        let mut slot = nv12_slot(w, h, &native);
        let plan = ConversionPlan {
            source: PixelFormat::NV12F,
            target: PixelFormat::RGB24,
        };
        convert_in_place(&mut slot, &plan).expect("first conversion");
        let second = convert_in_place(&mut slot, &plan);
        assert!(matches!(second, Err(CaptureError::ConversionMisuse(_))));
    }

    #[test]
    fn bottom_up_source_is_flipped() {
        let (w, h) = (4u32, 2u32);
        let mut buf = vec![0u8; (w * h * 3) as usize];
        // Row 0 red-ish, row 1 blue-ish, stored bottom-up.
        buf[..(w * 3) as usize].fill(10);
        buf[(w * 3) as usize..].fill(200);
        let mut slot = FrameSlot::new(Box::<HeapAllocator>::default());
        slot.planes[0] = buf.as_ptr();
        slot.strides[0] = (w * 3) as usize;
        slot.format = PixelFormat::RGB24;
        slot.width = w;
        slot.height = h;
        slot.orientation = Orientation::BottomUp;
        slot.zero_copy = true;

        let plan = ConversionPlan {
            source: PixelFormat::RGB24,
            target: PixelFormat::RGB24,
        };
        convert_in_place(&mut slot, &plan).expect("convert");
        assert_eq!(slot.orientation, Orientation::TopDown);
        let out = unsafe { std::slice::from_raw_parts(slot.planes[0], slot.size_in_bytes) };
        assert!(out[..(w * 3) as usize].iter().all(|&b| b == 200));
        assert!(out[(w * 3) as usize..].iter().all(|&b| b == 10));
    }
}
