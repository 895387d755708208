//! Thumbnail generation for plot previews.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::RenderResult;

pub const THUMBNAIL_WIDTH: u32 = 300;
pub const THUMBNAIL_HEIGHT: u32 = 200;

/// Shrink a PNG to fit within `max_width` x `max_height`, preserving aspect
/// ratio. Images that already fit are re-encoded unchanged in size.
pub fn make_thumbnail(png_data: &[u8], max_width: u32, max_height: u32) -> RenderResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(png_data, ImageFormat::Png)?;
    let (width, height) = img.dimensions();

    let thumb: DynamicImage = if width <= max_width && height <= max_height {
        img
    } else {
        img.thumbnail(max_width, max_height)
    };

    let mut out = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

/// [`make_thumbnail`] with the default 300x200 box.
pub fn default_thumbnail(png_data: &[u8]) -> RenderResult<Vec<u8>> {
    make_thumbnail(png_data, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::create_png;

    fn blank_png(width: usize, height: usize) -> Vec<u8> {
        create_png(&vec![128u8; width * height * 4], width, height).unwrap()
    }

    #[test]
    fn test_wide_image_fits_box() {
        let thumb = default_thumbnail(&blank_png(1200, 400)).unwrap();
        let img = image::load_from_memory(&thumb).unwrap();
        assert_eq!(img.dimensions(), (300, 100));
    }

    #[test]
    fn test_tall_image_fits_box() {
        let thumb = default_thumbnail(&blank_png(100, 400)).unwrap();
        let (w, h) = image::load_from_memory(&thumb).unwrap().dimensions();
        assert_eq!(h, 200);
        assert_eq!(w, 50);
    }

    #[test]
    fn test_small_image_not_enlarged() {
        let thumb = default_thumbnail(&blank_png(30, 20)).unwrap();
        let img = image::load_from_memory(&thumb).unwrap();
        assert_eq!(img.dimensions(), (30, 20));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(default_thumbnail(b"not a png").is_err());
    }
}
