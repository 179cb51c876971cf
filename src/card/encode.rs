use anyhow::{Context, Result, anyhow};
use std::io::Cursor;
use tiny_skia::Pixmap;

/// Flattens the canvas to RGB and writes it as PNG.
pub fn encode_png(pixmap: Pixmap) -> Result<Vec<u8>> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgb.extend_from_slice(&[color.red(), color.green(), color.blue()]);
    }
    let image = image::RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| anyhow!("failed to build image buffer from canvas"))?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .with_context(|| "failed to encode card as PNG")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    #[test]
    fn encodes_lossless_rgb_png() {
        let mut pixmap = Pixmap::new(4, 3).expect("pixmap");
        pixmap.fill(Color::from_rgba8(0x12, 0x34, 0x56, 255));
        let bytes = encode_png(pixmap).expect("encode");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).expect("decode").to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(3, 2).0, [0x12, 0x34, 0x56]);
    }
}
