use anyhow::{Result, anyhow};
use tiny_skia::Color;

use super::font::FontRole;

/// Fixed geometry, palette and texts of the card. Lengths are in output
/// pixels; `CardTheme::scaled` multiplies the base design (1200x1400) by an
/// integer factor.
#[derive(Debug, Clone, PartialEq)]
pub struct CardTheme {
    pub width: u32,
    pub height: u32,
    pub margin_x: f32,
    pub top: f32,
    pub header_gap: f32,
    pub pos_gap_x: f32,
    /// Offset of the POS label from the title's own top.
    pub pos_offset_y: f32,
    pub definition_wrap_chars: usize,
    pub definition_line_height: f32,
    pub section_gap: f32,
    pub divider_thickness: f32,
    pub column_gap: f32,
    pub column_header_gap: f32,
    pub column_line_height: f32,
    pub bullet_radius: f32,
    pub bullet_indent: f32,
    pub box_gap: f32,
    pub box_padding: f32,
    pub box_radius: f32,
    pub box_min_height: f32,
    pub box_header_gap: f32,
    pub example_line_height: f32,
    pub example_gap: f32,
    pub cta_line_height: f32,
    pub footer_offset: f32,
    pub footer_icon_size: f32,
    pub footer_gap: f32,
    pub font_sizes: FontSizes,
    pub colors: Palette,
    pub texts: CardTexts,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub title: f32,
    pub body: f32,
    pub pos_label: f32,
    pub pos_label_small: f32,
    pub section_header: f32,
    pub caption: f32,
    pub call_to_action: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Rgb,
    pub primary: Rgb,
    pub text: Rgb,
    pub muted: Rgb,
    pub accent: Rgb,
    pub divider: Rgb,
    pub box_fill: Rgb,
    pub emphasis: Rgb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTexts {
    pub derivatives_header: String,
    pub synonyms_header: String,
    pub examples_header: String,
    pub call_to_action: String,
    pub footer_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `#rgb`.
    pub fn parse(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(anyhow!("invalid color '{}'", value));
        }
        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|ch| [ch, ch]).collect::<String>(),
            6 => hex.to_string(),
            _ => return Err(anyhow!("invalid color '{}'", value)),
        };
        let channel = |index: usize| {
            u8::from_str_radix(&expanded[index..index + 2], 16)
                .map_err(|_| anyhow!("invalid color '{}'", value))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_color(self) -> Color {
        Color::from_rgba8(self.r, self.g, self.b, 255)
    }
}

impl Default for CardTheme {
    fn default() -> Self {
        Self::scaled(1)
    }
}

impl Default for CardTexts {
    fn default() -> Self {
        Self {
            derivatives_header: "Derivatives".to_string(),
            synonyms_header: "Synonyms".to_string(),
            examples_header: "Usage examples".to_string(),
            call_to_action: "Follow r/Vocabdaily for a new word every hour!".to_string(),
            footer_label: "r/Vocabdaily".to_string(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb::new(0xff, 0xff, 0xff),
            primary: Rgb::new(0x11, 0x11, 0x11),
            text: Rgb::new(0x22, 0x22, 0x22),
            muted: Rgb::new(0x80, 0x80, 0x80),
            accent: Rgb::new(0xff, 0x45, 0x00),
            divider: Rgb::new(0xdd, 0xdd, 0xdd),
            box_fill: Rgb::new(0xf3, 0xf4, 0xf6),
            emphasis: Rgb::new(0x11, 0x11, 0x11),
        }
    }
}

impl CardTheme {
    pub fn scaled(scale: u32) -> Self {
        let s = scale.max(1) as f32;
        Self {
            width: 1200 * scale.max(1),
            height: 1400 * scale.max(1),
            margin_x: 80.0 * s,
            top: 50.0 * s,
            header_gap: 30.0 * s,
            pos_gap_x: 24.0 * s,
            pos_offset_y: 62.0 * s,
            definition_wrap_chars: 44,
            definition_line_height: 55.0 * s,
            section_gap: 30.0 * s,
            divider_thickness: 2.0 * s,
            column_gap: 40.0 * s,
            column_header_gap: 14.0 * s,
            column_line_height: 48.0 * s,
            bullet_radius: 7.0 * s,
            bullet_indent: 28.0 * s,
            box_gap: 30.0 * s,
            box_padding: 28.0 * s,
            box_radius: 24.0 * s,
            box_min_height: 120.0 * s,
            box_header_gap: 14.0 * s,
            example_line_height: 46.0 * s,
            example_gap: 18.0 * s,
            cta_line_height: 44.0 * s,
            footer_offset: 110.0 * s,
            footer_icon_size: 44.0 * s,
            footer_gap: 14.0 * s,
            font_sizes: FontSizes {
                title: 110.0 * s,
                body: 40.0 * s,
                pos_label: 48.0 * s,
                pos_label_small: 30.0 * s,
                section_header: 34.0 * s,
                caption: 28.0 * s,
                call_to_action: 34.0 * s,
            },
            colors: Palette::default(),
            texts: CardTexts::default(),
        }
    }

    pub fn font_size(&self, role: FontRole) -> f32 {
        let sizes = &self.font_sizes;
        match role {
            FontRole::Title => sizes.title,
            FontRole::Body | FontRole::BodyEmphasis => sizes.body,
            FontRole::PosLabel => sizes.pos_label,
            FontRole::PosLabelSmall => sizes.pos_label_small,
            FontRole::SectionHeader => sizes.section_header,
            FontRole::Caption => sizes.caption,
            FontRole::CallToAction => sizes.call_to_action,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.width as f32 - self.margin_x * 2.0).max(1.0)
    }

    pub fn column_width(&self) -> f32 {
        ((self.content_width() - self.column_gap) / 2.0).max(1.0)
    }

    pub fn right_column_x(&self) -> f32 {
        self.margin_x + self.column_width() + self.column_gap
    }

    /// Text width available inside the examples box.
    pub fn box_inner_width(&self) -> f32 {
        (self.content_width() - self.box_padding * 2.0).max(1.0)
    }
}
