//! Locally generated stand-in for a missing MODIS frame.

use std::io::Cursor;

use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};

use terra_shared::layers::ImageryLayer;

pub const PLACEHOLDER_WIDTH: u32 = 800;
pub const PLACEHOLDER_HEIGHT: u32 = 400;
const FRAME_PX: u32 = 4;
const FRAME_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// 800x400 PNG in the layer's color with a white frame.
pub fn render_png(layer: ImageryLayer) -> Result<Bytes, image::ImageError> {
    let (r, g, b) = layer.placeholder_rgb();
    let fill = Rgb([r, g, b]);

    let img = RgbImage::from_fn(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, |x, y| {
        let on_frame = x < FRAME_PX
            || y < FRAME_PX
            || x >= PLACEHOLDER_WIDTH - FRAME_PX
            || y >= PLACEHOLDER_HEIGHT - FRAME_PX;
        if on_frame { FRAME_COLOR } else { fill }
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(Bytes::from(buf.into_inner()))
}
