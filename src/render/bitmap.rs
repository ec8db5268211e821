// SPDX-License-Identifier: GPL-3.0-or-later
//! Uncompressed 8-bit grayscale Windows bitmaps (BMP v3).
//!
//! The layout is a 14 byte file header, a 40 byte `BITMAPINFOHEADER`, a 256 entry gray palette,
//! then the pixel rows stored bottom-up, each padded to a multiple of 4 bytes.
use std::convert::TryFrom;

use anyhow::Context as _;
use bytes::{BufMut, Bytes};

use crate::image_buffer::GrayImage;

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: usize = 40;
const PALETTE_LEN: usize = 256 * 4;

/// Offset from the start of the file to the pixel array.
pub(crate) const PIXEL_OFFSET: usize = FILE_HEADER_LEN + INFO_HEADER_LEN + PALETTE_LEN;

/// The number of bytes each row of pixels takes up, including padding.
pub(crate) fn row_stride(width: u32) -> usize {
    (width as usize + 3) & !3
}

/// The total size of an encoded bitmap with the given dimensions.
pub(crate) fn encoded_len(width: u32, height: u32) -> usize {
    PIXEL_OFFSET + row_stride(width) * height as usize
}

/// A complete bitmap file.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Bitmap(Bytes);

impl Bitmap {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get a cheap, shared copy of the encoded bytes.
    pub(crate) fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

/// Encode a grayscale image as a bitmap.
///
/// The only way this can fail is if the buffer for the file can't be allocated.
pub(crate) fn encode_bitmap(image: &GrayImage) -> anyhow::Result<Bitmap> {
    let (width, height) = image.dimensions();
    let stride = row_stride(width);
    let pixel_array_len = stride * height as usize;
    let file_len = encoded_len(width, height);
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(file_len)
        .with_context(|| format!("Unable to allocate {} bytes for a bitmap", file_len))?;
    let file_len_field = u32::try_from(file_len).context("Bitmap too large for a BMP file")?;
    let pixel_array_len_field =
        u32::try_from(pixel_array_len).context("Bitmap too large for a BMP file")?;
    let width_field = i32::try_from(width).context("Bitmap too wide for a BMP file")?;
    let height_field = i32::try_from(height).context("Bitmap too tall for a BMP file")?;

    // BITMAPFILEHEADER
    buf.put_slice(b"BM");
    buf.put_u32_le(file_len_field);
    // Two reserved u16s
    buf.put_u32_le(0);
    buf.put_u32_le(PIXEL_OFFSET as u32);

    // BITMAPINFOHEADER
    buf.put_u32_le(INFO_HEADER_LEN as u32);
    buf.put_i32_le(width_field);
    // Positive height means the rows are stored bottom-up.
    buf.put_i32_le(height_field);
    // Planes
    buf.put_u16_le(1);
    // Bits per pixel
    buf.put_u16_le(8);
    // BI_RGB (uncompressed)
    buf.put_u32_le(0);
    buf.put_u32_le(pixel_array_len_field);
    // Horizontal and vertical resolution, colors used (0 means all 256), important colors.
    buf.put_u32_le(0);
    buf.put_u32_le(0);
    buf.put_u32_le(0);
    buf.put_u32_le(0);

    // The palette entries are stored as blue, green, red, reserved.
    for level in 0..=u8::MAX {
        buf.put_slice(&[level, level, level, 0]);
    }

    let padding = stride - width as usize;
    if width > 0 {
        for row in image.as_raw().chunks_exact(width as usize).rev() {
            buf.put_slice(row);
            buf.resize(buf.len() + padding, 0);
        }
    }
    debug_assert_eq!(buf.len(), file_len);
    Ok(Bitmap(Bytes::from(buf)))
}

#[cfg(test)]
mod test {
    use std::convert::TryInto;

    use image::{GrayImage, ImageFormat, Luma};

    use crate::image_buffer::{FRAME_HEIGHT, FRAME_WIDTH};

    use super::{encode_bitmap, encoded_len, row_stride, PIXEL_OFFSET};

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn gradient_frame() -> GrayImage {
        GrayImage::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, y| {
            Luma([((x + y * FRAME_WIDTH) % 256) as u8])
        })
    }

    #[test]
    fn frame_size() {
        assert_eq!(row_stride(FRAME_WIDTH), 32);
        assert_eq!(encoded_len(FRAME_WIDTH, FRAME_HEIGHT), 1846);
        for image in &[GrayImage::new(FRAME_WIDTH, FRAME_HEIGHT), gradient_frame()] {
            let bitmap = encode_bitmap(image).unwrap();
            assert_eq!(bitmap.len(), 14 + 40 + 1024 + 32 * 24);
        }
    }

    #[test]
    fn header_fields() {
        let bitmap = encode_bitmap(&gradient_frame()).unwrap();
        let bytes = bitmap.as_bytes();
        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(read_u32(bytes, 2), 1846);
        assert_eq!(read_u32(bytes, 6), 0);
        assert_eq!(read_u32(bytes, 10), 1078);
        assert_eq!(read_u32(bytes, 14), 40);
        assert_eq!(read_u32(bytes, 18), FRAME_WIDTH);
        assert_eq!(read_u32(bytes, 22), FRAME_HEIGHT);
        assert_eq!(bytes[26], 1);
        assert_eq!(bytes[27], 0);
        assert_eq!(bytes[28], 8);
        assert_eq!(bytes[29], 0);
        assert_eq!(read_u32(bytes, 30), 0);
        assert_eq!(read_u32(bytes, 34), 32 * 24);
        assert!(bytes[38..54].iter().all(|b| *b == 0));
    }

    #[test]
    fn gray_palette() {
        let bitmap = encode_bitmap(&gradient_frame()).unwrap();
        let bytes = bitmap.as_bytes();
        for i in 0..256usize {
            let offset = 54 + 4 * i;
            let level = i as u8;
            assert_eq!(
                &bytes[offset..offset + 4],
                &[level, level, level, 0],
                "palette entry {}",
                i
            );
        }
    }

    #[test]
    fn rows_bottom_up() {
        let image = gradient_frame();
        let bitmap = encode_bitmap(&image).unwrap();
        let bytes = bitmap.as_bytes();
        let stride = row_stride(FRAME_WIDTH);
        let first_stored = &bytes[PIXEL_OFFSET..PIXEL_OFFSET + stride];
        let last_stored = &bytes[bytes.len() - stride..];
        // The top left pixel ends up at the start of the last stored row.
        assert_eq!(last_stored[0], image.get_pixel(0, 0)[0]);
        assert_eq!(last_stored[0], 0);
        // The bottom row is stored first.
        assert_eq!(first_stored[0], image.get_pixel(0, FRAME_HEIGHT - 1)[0]);
        for x in 0..FRAME_WIDTH {
            assert_eq!(
                first_stored[x as usize],
                image.get_pixel(x, FRAME_HEIGHT - 1)[0]
            );
        }
    }

    #[test]
    fn padded_rows() {
        let image = GrayImage::from_fn(5, 3, |x, y| Luma([(10 * y + x + 1) as u8]));
        let bitmap = encode_bitmap(&image).unwrap();
        let bytes = bitmap.as_bytes();
        assert_eq!(row_stride(5), 8);
        assert_eq!(bitmap.len(), PIXEL_OFFSET + 8 * 3);
        assert_eq!(read_u32(bytes, 34), 24);
        let pixels = &bytes[PIXEL_OFFSET..];
        assert_eq!(&pixels[0..8], &[21, 22, 23, 24, 25, 0, 0, 0]);
        assert_eq!(&pixels[8..16], &[11, 12, 13, 14, 15, 0, 0, 0]);
        assert_eq!(&pixels[16..24], &[1, 2, 3, 4, 5, 0, 0, 0]);
    }

    #[test]
    fn empty_image() {
        let bitmap = encode_bitmap(&GrayImage::new(0, 0)).unwrap();
        assert_eq!(bitmap.len(), PIXEL_OFFSET);
    }

    #[test]
    fn readable_by_bmp_decoder() {
        let image = gradient_frame();
        let bitmap = encode_bitmap(&image).unwrap();
        let decoded = image::load_from_memory_with_format(bitmap.as_bytes(), ImageFormat::Bmp)
            .expect("the encoded bitmap to be decodable")
            .to_rgb8();
        assert_eq!(decoded.dimensions(), image.dimensions());
        for (x, y, pixel) in image.enumerate_pixels() {
            let level = pixel[0];
            assert_eq!(decoded.get_pixel(x, y).0, [level, level, level]);
        }
    }
}
