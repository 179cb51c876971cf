use anyhow::{Result, anyhow};
use tiny_skia::{
    FillRule, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

use super::font::{FontRole, FontSet};
use super::highlight::Emphasis;
use super::layout::{LayoutPlan, Region, RegionContent, place_example_lines};
use super::theme::{CardTheme, Rgb};

/// Paints `plan` onto a fresh opaque pixmap.
pub fn paint(
    plan: &LayoutPlan,
    fonts: &FontSet,
    theme: &CardTheme,
    logo: Option<&Pixmap>,
) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(plan.width, plan.height)
        .ok_or_else(|| anyhow!("invalid card size {}x{}", plan.width, plan.height))?;
    pixmap.fill(theme.colors.background.to_color());

    let mut canvas = Canvas {
        pixmap: &mut pixmap,
        fonts,
        theme,
    };
    for region in &plan.regions {
        if region.height < 0.0 {
            return Err(anyhow!(
                "region {:?} has negative height {}",
                region.kind,
                region.height
            ));
        }
        canvas.region(region, logo);
    }
    Ok(pixmap)
}

struct Canvas<'a> {
    pixmap: &'a mut Pixmap,
    fonts: &'a FontSet,
    theme: &'a CardTheme,
}

impl Canvas<'_> {
    fn region(&mut self, region: &Region, logo: Option<&Pixmap>) {
        let theme = self.theme;
        let colors = theme.colors;
        match &region.content {
            RegionContent::Header {
                title,
                pos,
                pos_x,
                pos_y,
            } => {
                self.text(FontRole::Title, title, theme.margin_x, region.top_y, colors.primary);
                self.text(FontRole::PosLabel, pos, *pos_x, *pos_y, colors.muted);
            }
            RegionContent::Definition { lines } => {
                for (index, line) in lines.iter().enumerate() {
                    let y = region.top_y + index as f32 * theme.definition_line_height;
                    self.text(FontRole::Body, line, theme.margin_x, y, colors.text);
                }
            }
            RegionContent::Divider => {
                self.rect(
                    theme.margin_x,
                    region.top_y,
                    theme.content_width(),
                    region.height,
                    colors.divider,
                );
            }
            RegionContent::Columns {
                header_height,
                derivatives,
                synonyms,
            } => {
                let left_x = theme.margin_x;
                let right_x = theme.right_column_x();
                let header_role = FontRole::SectionHeader;
                self.text(
                    header_role,
                    &theme.texts.derivatives_header,
                    left_x,
                    region.top_y,
                    colors.primary,
                );
                self.text(
                    header_role,
                    &theme.texts.synonyms_header,
                    right_x,
                    region.top_y,
                    colors.primary,
                );

                let first_y = region.top_y + header_height + theme.column_header_gap;
                let fonts = self.fonts;
                let body = fonts.font(FontRole::Body);
                let small = fonts.font(FontRole::PosLabelSmall);
                let space = body.measure(" ").width;
                for (index, entry) in derivatives.iter().enumerate() {
                    let y = first_y + index as f32 * theme.column_line_height;
                    self.text(FontRole::Body, &entry.word, left_x, y, colors.text);
                    let label_x = left_x + body.measure(&entry.word).width + space;
                    let label_y = y + body.ascent() - small.ascent();
                    let label = format!("({})", entry.short_pos);
                    self.text(FontRole::PosLabelSmall, &label, label_x, label_y, colors.muted);
                }
                let bullet_center = body.line_height() / 2.0;
                for (index, synonym) in synonyms.iter().enumerate() {
                    let y = first_y + index as f32 * theme.column_line_height;
                    self.circle(
                        right_x + theme.bullet_radius,
                        y + bullet_center,
                        theme.bullet_radius,
                        colors.accent,
                    );
                    self.text(
                        FontRole::Body,
                        synonym,
                        right_x + theme.bullet_indent,
                        y,
                        colors.text,
                    );
                }
            }
            RegionContent::Examples {
                term,
                sentences,
                line_limit,
                ..
            } => {
                self.rounded_rect(
                    theme.margin_x,
                    region.top_y,
                    theme.content_width(),
                    region.height,
                    theme.box_radius,
                    colors.box_fill,
                );
                let inner_x = theme.margin_x + theme.box_padding;
                self.text(
                    FontRole::SectionHeader,
                    &theme.texts.examples_header,
                    inner_x,
                    region.top_y + theme.box_padding,
                    colors.primary,
                );
                let placed = place_example_lines(
                    sentences,
                    term,
                    self.fonts,
                    theme,
                    region.top_y,
                    *line_limit,
                );
                for placed_line in &placed.lines {
                    for word in &placed_line.line.words {
                        let color = match word.emphasis {
                            Emphasis::Emphasis => colors.emphasis,
                            Emphasis::Plain => colors.text,
                        };
                        self.text(
                            word.emphasis.font_role(),
                            &word.text,
                            inner_x + word.x,
                            placed_line.y,
                            color,
                        );
                    }
                }
            }
            RegionContent::CallToAction { lines } => {
                for (index, line) in lines.iter().enumerate() {
                    let width = self.fonts.measure(line, FontRole::CallToAction).width;
                    let x = ((theme.width as f32 - width) / 2.0).max(theme.margin_x);
                    let y = region.top_y + index as f32 * theme.cta_line_height;
                    self.text(FontRole::CallToAction, line, x, y, colors.accent);
                }
            }
            RegionContent::Footer {
                label,
                label_x,
                icon_x,
                icon_size,
            } => {
                let caption = self.fonts.font(FontRole::Caption);
                let label_y = region.top_y + (region.height - caption.line_height()) / 2.0;
                self.text(FontRole::Caption, label, *label_x, label_y, colors.muted);
                let icon_y = region.top_y + (region.height - icon_size) / 2.0;
                match logo {
                    Some(logo) => self.image(logo, *icon_x, icon_y, *icon_size),
                    None => self.badge(*icon_x, icon_y, *icon_size),
                }
            }
        }
    }

    fn text(&mut self, role: FontRole, text: &str, x: f32, top: f32, color: Rgb) {
        let paint = solid(color);
        self.fonts.font(role).draw(self.pixmap, text, x, top, &paint);
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            self.pixmap
                .fill_rect(rect, &solid(color), Transform::identity(), None);
        }
    }

    fn circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            self.fill(&path, color);
        }
    }

    fn rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32, color: Rgb) {
        if let Some(path) = rounded_rect_path(x, y, w, h, radius) {
            self.fill(&path, color);
        }
    }

    fn fill(&mut self, path: &Path, color: Rgb) {
        self.pixmap.fill_path(
            path,
            &solid(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn image(&mut self, image: &Pixmap, x: f32, y: f32, size: f32) {
        let offset_x = (size - image.width() as f32).max(0.0) / 2.0;
        let offset_y = (size - image.height() as f32).max(0.0) / 2.0;
        self.pixmap.draw_pixmap(
            (x + offset_x).round() as i32,
            (y + offset_y).round() as i32,
            image.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    /// Stand-in icon when no logo asset is available.
    fn badge(&mut self, x: f32, y: f32, size: f32) {
        let radius = size / 2.0;
        self.circle(x + radius, y + radius, radius, self.theme.colors.accent);
        self.circle(
            x + radius,
            y + radius,
            radius * 0.45,
            self.theme.colors.background,
        );
    }
}

fn solid(color: Rgb) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_color());
    paint.anti_alias = true;
    paint
}

fn rounded_rect_path(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Option<Path> {
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::layout::{RegionKind, plan_layout};
    use crate::record::WordRecord;

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8) {
        let color = pixmap.pixel(x, y).expect("pixel").demultiply();
        (color.red(), color.green(), color.blue())
    }

    fn record() -> WordRecord {
        WordRecord {
            term: "resilient".to_string(),
            part_of_speech: "adjective".to_string(),
            meaning: "able to recover quickly".to_string(),
            derivatives: Vec::new(),
            synonyms: vec!["tough".to_string(), "hardy".to_string()],
            examples: vec!["The resilient team recovered fast.".to_string()],
        }
    }

    #[test]
    fn paints_box_fill_and_background() {
        let theme = CardTheme::default();
        let fonts = FontSet::builtin(&theme);
        let plan = plan_layout(&record(), &fonts, &theme);
        let pixmap = paint(&plan, &fonts, &theme, None).expect("paint");
        assert_eq!((pixmap.width(), pixmap.height()), (theme.width, theme.height));

        let bg = theme.colors.background;
        assert_eq!(pixel(&pixmap, 2, 2), (bg.r, bg.g, bg.b));

        let examples = plan.region(RegionKind::Examples).expect("examples");
        let fill = theme.colors.box_fill;
        let inside_y = (examples.bottom_y() - theme.box_padding / 2.0) as u32;
        let inside_x = (theme.width as f32 - theme.margin_x - theme.box_radius - 4.0) as u32;
        assert_eq!(pixel(&pixmap, inside_x, inside_y), (fill.r, fill.g, fill.b));
    }

    #[test]
    fn title_ink_lands_in_header() {
        let theme = CardTheme::default();
        let fonts = FontSet::builtin(&theme);
        let plan = plan_layout(&record(), &fonts, &theme);
        let pixmap = paint(&plan, &fonts, &theme, None).expect("paint");
        let header = plan.region(RegionKind::Header).expect("header");
        let primary = theme.colors.primary;
        let mut inked = 0;
        for y in header.top_y as u32..header.bottom_y() as u32 {
            for x in theme.margin_x as u32..(theme.margin_x as u32 + 300) {
                if pixel(&pixmap, x, y) == (primary.r, primary.g, primary.b) {
                    inked += 1;
                }
            }
        }
        assert!(inked > 0);
    }

    #[test]
    fn rounded_rect_rejects_empty_boxes() {
        assert!(rounded_rect_path(0.0, 0.0, 0.0, 10.0, 4.0).is_none());
        assert!(rounded_rect_path(0.0, 0.0, 10.0, 10.0, 40.0).is_some());
    }

    #[test]
    fn zero_sized_plan_is_an_error() {
        let theme = CardTheme::default();
        let fonts = FontSet::builtin(&theme);
        let plan = LayoutPlan {
            width: 0,
            height: 0,
            regions: Vec::new(),
        };
        assert!(paint(&plan, &fonts, &theme, None).is_err());
    }
}
