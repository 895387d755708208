//! PNG encoding for RGBA image data.
//!
//! Writes truecolor-with-alpha PNGs (color type 6) directly with flate2, and
//! can embed `tEXt` chunks so plots carry their geographic extent.

use std::io::Write;

use crate::error::{RenderError, RenderResult};

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Create a PNG image from RGBA pixel data (color type 6).
///
/// # Arguments
/// - `pixels`: RGBA pixel data (4 bytes per pixel)
/// - `width`: Image width in pixels
/// - `height`: Image height in pixels
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    create_png_with_text(pixels, width, height, &[])
}

/// Create an RGBA PNG with `tEXt` metadata chunks.
///
/// Keywords must be 1-79 bytes of Latin-1 without NUL.
pub fn create_png_with_text(
    pixels: &[u8],
    width: usize,
    height: usize,
    text: &[(&str, &str)],
) -> RenderResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions(format!(
            "{}x{} image",
            width, height
        )));
    }
    if pixels.len() != width * height * 4 {
        return Err(RenderError::InvalidDimensions(format!(
            "{} bytes for {}x{} RGBA image",
            pixels.len(),
            width,
            height
        )));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    for (keyword, value) in text {
        if keyword.is_empty() || keyword.len() > 79 || keyword.contains('\0') {
            return Err(RenderError::Encode(format!(
                "invalid tEXt keyword {:?}",
                keyword
            )));
        }
        let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
        data.extend_from_slice(keyword.as_bytes());
        data.push(0);
        data.extend_from_slice(value.as_bytes());
        write_chunk(&mut png, b"tEXt", &data);
    }

    // IDAT chunk (image data)
    let idat_data = deflate_idat_rgba(pixels, width, height)
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    // IEND chunk
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Read back the `tEXt` chunks of a PNG as `(keyword, text)` pairs.
///
/// Stops at the first malformed chunk.
pub fn read_text_chunks(png: &[u8]) -> Vec<(String, String)> {
    let mut chunks = Vec::new();
    if png.len() < PNG_SIGNATURE.len() || png[..8] != PNG_SIGNATURE {
        return chunks;
    }

    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let chunk_type = &png[pos + 4..pos + 8];
        let data_start = pos + 8;
        let data_end = data_start + len;
        if data_end + 4 > png.len() {
            break;
        }

        if chunk_type == b"tEXt" {
            let data = &png[data_start..data_end];
            if let Some(sep) = data.iter().position(|&b| b == 0) {
                chunks.push((
                    String::from_utf8_lossy(&data[..sep]).into_owned(),
                    String::from_utf8_lossy(&data[sep + 1..]).into_owned(),
                ));
            }
        } else if chunk_type == b"IEND" {
            break;
        }
        pos = data_end + 4;
    }

    chunks
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    // Write length
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());

    // Write chunk type
    png.extend_from_slice(chunk_type);

    // Write data
    png.extend_from_slice(data);

    // CRC covers type and data
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate RGBA image data for IDAT chunk.
fn deflate_idat_rgba(
    pixels: &[u8],
    width: usize,
    height: usize,
) -> Result<Vec<u8>, std::io::Error> {
    // Add filter byte (0 = no filter) to each scanline
    let mut uncompressed = Vec::with_capacity(height * (1 + width * 4));
    for row in pixels.chunks_exact(width * 4).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_decodes() {
        let pixels = [
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            0, 0, 255, 255, // blue
            255, 255, 255, 0, // transparent white
        ];
        let png = create_png(&pixels, 2, 2).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 0, 255]);
        assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255, 0]);
    }

    #[test]
    fn test_text_chunks_round_trip() {
        let pixels = [0u8; 4 * 3];
        let png = create_png_with_text(&pixels, 3, 1, &[("extent", "70,90,5,25"), ("Software", "tcc")])
            .unwrap();
        let text = read_text_chunks(&png);
        assert_eq!(text.len(), 2);
        assert_eq!(text[0], ("extent".to_string(), "70,90,5,25".to_string()));

        // Still a valid PNG for decoders
        assert!(image::load_from_memory(&png).is_ok());
    }

    #[test]
    fn test_rejects_bad_buffer() {
        assert!(matches!(
            create_png(&[0u8; 7], 2, 1),
            Err(RenderError::InvalidDimensions(_))
        ));
        assert!(create_png(&[], 0, 0).is_err());
    }

    #[test]
    fn test_rejects_bad_keyword() {
        let pixels = [0u8; 4];
        assert!(create_png_with_text(&pixels, 1, 1, &[("", "x")]).is_err());
    }
}
