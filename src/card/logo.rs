use anyhow::{Context, Result, anyhow};
use image::imageops::FilterType;
use std::path::Path;
use tiny_skia::{ColorU8, Pixmap, Transform};
use usvg::{Options, Tree};

/// Loads the footer icon and fits it into a `size`x`size` square, keeping its
/// aspect ratio. SVG files are rasterized; everything else goes through the
/// `image` decoders.
pub fn load_logo(path: &Path, size: u32) -> Result<Pixmap> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read logo: {}", path.display()))?;
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);
    if is_svg {
        rasterize_svg(&bytes, size)
    } else {
        decode_raster(&bytes, size)
    }
    .with_context(|| format!("failed to load logo: {}", path.display()))
}

fn rasterize_svg(bytes: &[u8], size: u32) -> Result<Pixmap> {
    let tree = Tree::from_data(bytes, &Options::default()).with_context(|| "failed to parse SVG")?;
    let tree_size = tree.size();
    let scale = (size as f32 / tree_size.width()).min(size as f32 / tree_size.height());
    let width = (tree_size.width() * scale).round().max(1.0) as u32;
    let height = (tree_size.height() * scale).round().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| anyhow!("empty SVG size"))?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    Ok(pixmap)
}

fn decode_raster(bytes: &[u8], size: u32) -> Result<Pixmap> {
    let image = image::load_from_memory(bytes).with_context(|| "failed to decode image")?;
    let rgba = image.resize(size, size, FilterType::Lanczos3).to_rgba8();
    let mut pixmap = Pixmap::new(rgba.width(), rgba.height())
        .ok_or_else(|| anyhow!("empty logo image"))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}
