//! Binary transport of images and rectangles between pipeline stages.
//!
//! Image layout: `rows`, `cols`, `pixel_type`, `data_len` as big-endian `i32`,
//! then `data_len` raw row-major bytes. Rect layout: `x`, `y`, `width`,
//! `height` as big-endian `i32`, no framing.
//!
//! `data_len` is not checked against `rows * cols * elem_size(pixel_type)`;
//! producer and consumer agree on pixel type semantics out of band.

use std::io::{Read, Write};

use crate::error::{LogoError, LogoResult};
use crate::types::{ImageMat, Rect};

const IMAGE_HEADER_LEN: usize = 16;

/// Fails only when the pixel buffer does not fit the `i32` length field.
pub fn encode_image(image: &ImageMat) -> LogoResult<Vec<u8>> {
    let mut out = Vec::with_capacity(IMAGE_HEADER_LEN + image.data.len());
    write_image(&mut out, image)?;
    Ok(out)
}

/// Value of the `data_len` header field for a buffer of `len` bytes.
pub fn data_len_field(len: usize) -> LogoResult<i32> {
    i32::try_from(len).map_err(|_| LogoError::LengthOverflow { length: len })
}

/// Decodes one image from the front of `bytes`; trailing bytes are ignored.
pub fn decode_image(bytes: &[u8]) -> LogoResult<ImageMat> {
    let mut cursor = bytes;
    read_image(&mut cursor)
}

pub fn encode_rect(rect: &Rect) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    let _ = write_rect(&mut out, rect);
    out
}

pub fn decode_rect(bytes: &[u8]) -> LogoResult<Rect> {
    let mut cursor = bytes;
    read_rect(&mut cursor)
}

pub fn write_image<W: Write>(writer: &mut W, image: &ImageMat) -> LogoResult<()> {
    let data_len = data_len_field(image.data.len())?;
    writer.write_all(&image.rows.to_be_bytes())?;
    writer.write_all(&image.cols.to_be_bytes())?;
    writer.write_all(&image.pixel_type.to_be_bytes())?;
    writer.write_all(&data_len.to_be_bytes())?;
    writer.write_all(&image.data)?;
    Ok(())
}

/// Reads one image; a short payload is an error, never a partial image.
pub fn read_image<R: Read>(reader: &mut R) -> LogoResult<ImageMat> {
    let rows = read_i32(reader, 0)?;
    let cols = read_i32(reader, 4)?;
    let pixel_type = read_i32(reader, 8)?;
    let data_len = read_i32(reader, 12)?;
    if data_len < 0 {
        return Err(LogoError::NegativeLength { length: data_len });
    }
    let data_len = data_len as usize;

    let mut data = Vec::with_capacity(data_len.min(1 << 24));
    let read = (&mut *reader).take(data_len as u64).read_to_end(&mut data)?;
    if read < data_len {
        return Err(LogoError::Truncated {
            needed: IMAGE_HEADER_LEN + data_len,
            available: IMAGE_HEADER_LEN + read,
        });
    }
    Ok(ImageMat {
        rows,
        cols,
        pixel_type,
        data,
    })
}

pub fn write_rect<W: Write>(writer: &mut W, rect: &Rect) -> LogoResult<()> {
    for v in [rect.x, rect.y, rect.width, rect.height] {
        writer.write_all(&v.to_be_bytes())?;
    }
    Ok(())
}

pub fn read_rect<R: Read>(reader: &mut R) -> LogoResult<Rect> {
    Ok(Rect {
        x: read_i32(reader, 0)?,
        y: read_i32(reader, 4)?,
        width: read_i32(reader, 8)?,
        height: read_i32(reader, 12)?,
    })
}

/// `consumed` is the number of record bytes already read, for error reporting.
fn read_i32<R: Read>(reader: &mut R, consumed: usize) -> LogoResult<i32> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(LogoError::Truncated {
                needed: consumed + 4,
                available: consumed + filled,
            });
        }
        filled += n;
    }
    Ok(i32::from_be_bytes(buf))
}
