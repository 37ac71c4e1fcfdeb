//! Dump frames to disk: BMP for packed RGB, raw planar files for YUV.
//!
//! RGB frames without alpha become 24bpp BMPs with a classic
//! `BITMAPINFOHEADER`; frames with alpha become 32bpp `BITMAPV4HEADER` BMPs
//! with BI_BITFIELDS channel masks. YUV frames are written as raw planes
//! (Y, then U/UV, then V) with the family as the file extension.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::CaptureError;
use crate::frame::{Frame, Orientation};
use crate::log::log_info;

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const V4_HEADER_SIZE: u32 = 108;
const BI_BITFIELDS: u32 = 3;
const LCS_SRGB: u32 = 0x7352_4742;
// 72 dpi.
const PELS_PER_METER: i32 = 2835;

/// Write `frame` into `dir` as `{stem}_{width}x{height}.{ext}`, where `ext`
/// is `bmp` for RGB-family frames and the YUV family name otherwise.
/// Returns the written path.
pub fn dump_frame(frame: &Frame, dir: impl AsRef<Path>, stem: &str) -> Result<PathBuf, CaptureError> {
    let format = frame.pixel_format();
    let ext = if format.is_rgb() {
        "bmp".to_string()
    } else if format.is_vu_order() {
        "nv21".to_string()
    } else if format.plane_count() == 2 {
        "nv12".to_string()
    } else {
        "i420".to_string()
    };
    let path = dir.as_ref().join(format!(
        "{stem}_{}x{}.{ext}",
        frame.width(),
        frame.height()
    ));

    let mut out = BufWriter::new(File::create(&path)?);
    if format.is_rgb() {
        write_bmp(frame, &mut out)?;
    } else {
        write_planar(frame, &mut out)?;
    }
    out.flush()?;
    log_info!(path = %path.display(), "frame dumped");
    Ok(path)
}

fn write_bmp(frame: &Frame, out: &mut impl Write) -> Result<(), CaptureError> {
    let format = frame.pixel_format();
    let Some(layout) = format.rgb_layout() else {
        return Err(CaptureError::ConversionMisuse("BMP dump needs an RGB frame"));
    };
    let plane = frame
        .plane(0)
        .ok_or(CaptureError::ConversionMisuse("frame has no pixel data"))?;
    let stride = frame.stride(0);
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let src_bpp = layout.bytes_per_pixel();
    let alpha = layout.has_alpha();

    let out_bpp: usize = if alpha { 4 } else { 3 };
    // BMP rows are padded to 4 bytes; 32bpp rows already are.
    let row_size = (w * out_bpp + 3) & !3;
    let image_size = (row_size * h) as u32;
    let header_size = if alpha { V4_HEADER_SIZE } else { INFO_HEADER_SIZE };
    let data_offset = FILE_HEADER_SIZE + header_size;

    // BITMAPFILEHEADER
    out.write_all(b"BM")?;
    out.write_all(&(data_offset + image_size).to_le_bytes())?;
    out.write_all(&0u16.to_le_bytes())?;
    out.write_all(&0u16.to_le_bytes())?;
    out.write_all(&data_offset.to_le_bytes())?;

    // Info header. Positive height: rows stored bottom-up.
    out.write_all(&header_size.to_le_bytes())?;
    out.write_all(&(w as i32).to_le_bytes())?;
    out.write_all(&(h as i32).to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?;
    out.write_all(&((out_bpp * 8) as u16).to_le_bytes())?;
    let compression = if alpha { BI_BITFIELDS } else { 0u32 };
    out.write_all(&compression.to_le_bytes())?;
    out.write_all(&image_size.to_le_bytes())?;
    out.write_all(&PELS_PER_METER.to_le_bytes())?;
    out.write_all(&PELS_PER_METER.to_le_bytes())?;
    out.write_all(&0u32.to_le_bytes())?;
    out.write_all(&0u32.to_le_bytes())?;
    if alpha {
        // BITMAPV4HEADER tail: channel masks for the B,G,R,A byte order,
        // sRGB color space, zeroed endpoints and gamma.
        out.write_all(&0x00FF_0000u32.to_le_bytes())?; // red
        out.write_all(&0x0000_FF00u32.to_le_bytes())?; // green
        out.write_all(&0x0000_00FFu32.to_le_bytes())?; // blue
        out.write_all(&0xFF00_0000u32.to_le_bytes())?; // alpha
        out.write_all(&LCS_SRGB.to_le_bytes())?;
        out.write_all(&[0u8; 36])?; // CIEXYZTRIPLE endpoints
        out.write_all(&[0u8; 12])?; // gamma
    }

    let (ro, go, bo, ao) = match layout {
        camcap_convert::RgbLayout::Rgb => (0, 1, 2, None),
        camcap_convert::RgbLayout::Bgr => (2, 1, 0, None),
        camcap_convert::RgbLayout::Rgba => (0, 1, 2, Some(3)),
        camcap_convert::RgbLayout::Bgra => (2, 1, 0, Some(3)),
    };

    let mut row = vec![0u8; row_size];
    for file_row in 0..h {
        // The file stores the bottom row first.
        let src_row = match frame.orientation() {
            Orientation::TopDown => h - 1 - file_row,
            Orientation::BottomUp => file_row,
        };
        let src = &plane[src_row * stride..src_row * stride + w * src_bpp];
        for x in 0..w {
            let s = x * src_bpp;
            let d = x * out_bpp;
            row[d] = src[s + bo];
            row[d + 1] = src[s + go];
            row[d + 2] = src[s + ro];
            if out_bpp == 4 {
                row[d + 3] = ao.map_or(0xFF, |ao| src[s + ao]);
            }
        }
        out.write_all(&row)?;
    }
    Ok(())
}

fn write_planar(frame: &Frame, out: &mut impl Write) -> Result<(), CaptureError> {
    let format = frame.pixel_format();
    for p in 0..format.plane_count() {
        let plane = frame
            .plane(p)
            .ok_or(CaptureError::ConversionMisuse("frame is missing a plane"))?;
        let stride = frame.stride(p);
        let rows = format.plane_rows(p, frame.height());
        let row_bytes = format.plane_row_bytes(p, frame.width());
        for r in 0..rows {
            out.write_all(&plane[r * stride..r * stride + row_bytes])?;
        }
    }
    Ok(())
}
