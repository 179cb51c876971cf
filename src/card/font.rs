use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};
use tracing::{debug, warn};
use ttf_parser::{Face, OutlineBuilder, name_id};
use usvg::fontdb;

use super::bitmap;
use super::theme::CardTheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontRole {
    Title,
    Body,
    BodyEmphasis,
    PosLabel,
    PosLabelSmall,
    SectionHeader,
    Caption,
    CallToAction,
}

impl FontRole {
    pub const ALL: [FontRole; 8] = [
        FontRole::Title,
        FontRole::Body,
        FontRole::BodyEmphasis,
        FontRole::PosLabel,
        FontRole::PosLabelSmall,
        FontRole::SectionHeader,
        FontRole::Caption,
        FontRole::CallToAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontRole::Title => "title",
            FontRole::Body => "body",
            FontRole::BodyEmphasis => "body_emphasis",
            FontRole::PosLabel => "pos_label",
            FontRole::PosLabelSmall => "pos_label_small",
            FontRole::SectionHeader => "section_header",
            FontRole::Caption => "caption",
            FontRole::CallToAction => "call_to_action",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        FontRole::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
    }

    fn is_bold(self) -> bool {
        matches!(
            self,
            FontRole::Title
                | FontRole::BodyEmphasis
                | FontRole::SectionHeader
                | FontRole::CallToAction
        )
    }

    fn is_italic(self) -> bool {
        matches!(self, FontRole::PosLabel | FontRole::PosLabelSmall)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Pixel box occupied by a run of text set on a single line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub width: f32,
    pub height: f32,
}

/// A face at one pixel size.
#[derive(Clone)]
pub struct CardFont {
    face: FaceSource,
    size: f32,
}

#[derive(Clone)]
enum FaceSource {
    Outline(OutlineFace),
    Bitmap { bold: bool },
}

#[derive(Clone)]
struct OutlineFace {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    space_advance: u16,
    family: Option<String>,
}

impl CardFont {
    pub fn builtin(size: f32, bold: bool) -> Self {
        Self {
            face: FaceSource::Bitmap { bold },
            size,
        }
    }

    pub fn from_path(path: &Path, size: f32) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        Self::from_data(data, 0, size)
            .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
    }

    pub fn from_data(data: Vec<u8>, face_index: u32, size: f32) -> Result<Self> {
        let face = Face::parse(&data, face_index).map_err(|err| anyhow!("{}", err))?;
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        let ascender = face.ascender();
        let descender = face.descender();
        let family = extract_family_name(&face);
        Ok(Self {
            face: FaceSource::Outline(OutlineFace {
                data: Arc::new(data),
                face_index,
                units_per_em,
                ascender,
                descender,
                space_advance,
                family,
            }),
            size,
        })
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.face, FaceSource::Bitmap { .. })
    }

    pub fn family(&self) -> Option<&str> {
        match &self.face {
            FaceSource::Outline(face) => face.family.as_deref(),
            FaceSource::Bitmap { .. } => None,
        }
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascent(&self) -> f32 {
        match &self.face {
            FaceSource::Outline(face) => face.ascender.max(0) as f32 * face.scale(self.size),
            FaceSource::Bitmap { .. } => {
                (bitmap::BASELINE_ROW * bitmap::unit_for_size(self.size)) as f32
            }
        }
    }

    pub fn line_height(&self) -> f32 {
        match &self.face {
            FaceSource::Outline(face) => {
                let units = (face.ascender as i32 - face.descender as i32).max(0);
                units as f32 * face.scale(self.size)
            }
            FaceSource::Bitmap { .. } => {
                (bitmap::CELL_HEIGHT * bitmap::unit_for_size(self.size)) as f32
            }
        }
    }

    pub fn measure(&self, text: &str) -> TextBox {
        TextBox {
            width: self.text_width(text),
            height: self.line_height(),
        }
    }

    fn text_width(&self, text: &str) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        match &self.face {
            FaceSource::Outline(face) => {
                let Ok(parsed) = Face::parse(&face.data, face.face_index) else {
                    return 0.0;
                };
                let mut advance = 0u32;
                for ch in text.chars() {
                    advance = advance.saturating_add(face.advance(&parsed, ch) as u32);
                }
                advance as f32 * face.scale(self.size)
            }
            FaceSource::Bitmap { bold } => {
                let count = text.chars().filter(|ch| *ch != '\n').count() as u32;
                (count * bitmap::advance_units(*bold) * bitmap::unit_for_size(self.size)) as f32
            }
        }
    }

    /// Paints `text` with the line box's top-left corner at `(x, top)`.
    pub(crate) fn draw(&self, pixmap: &mut Pixmap, text: &str, x: f32, top: f32, paint: &Paint) {
        if text.is_empty() {
            return;
        }
        let path = match &self.face {
            FaceSource::Outline(face) => {
                let Ok(parsed) = Face::parse(&face.data, face.face_index) else {
                    return;
                };
                let scale = face.scale(self.size);
                let mut sink = GlyphSink {
                    builder: PathBuilder::new(),
                    origin_x: x,
                    baseline: top + self.ascent(),
                    scale,
                };
                for ch in text.chars() {
                    if let Some(glyph) = parsed.glyph_index(ch) {
                        parsed.outline_glyph(glyph, &mut sink);
                    }
                    sink.origin_x += face.advance(&parsed, ch) as f32 * scale;
                }
                sink.builder.finish()
            }
            FaceSource::Bitmap { bold } => {
                let unit = bitmap::unit_for_size(self.size) as f32;
                let mut builder = PathBuilder::new();
                let mut pen = x.round();
                let top = top.round();
                for ch in text.chars() {
                    for (col, row) in bitmap::lit_cells(ch, *bold) {
                        if let Some(rect) = Rect::from_xywh(
                            pen + col as f32 * unit,
                            top + row as f32 * unit,
                            unit,
                            unit,
                        ) {
                            builder.push_rect(rect);
                        }
                    }
                    pen += (bitmap::advance_units(*bold) as f32) * unit;
                }
                builder.finish()
            }
        };
        if let Some(path) = path {
            let mut paint = paint.clone();
            paint.anti_alias = !self.is_builtin();
            pixmap.fill_path(
                &path,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }
}

impl OutlineFace {
    fn scale(&self, size: f32) -> f32 {
        size / self.units_per_em.max(1) as f32
    }

    fn advance(&self, parsed: &Face<'_>, ch: char) -> u16 {
        if ch == '\n' {
            return 0;
        }
        if ch == ' ' {
            return self.space_advance;
        }
        parsed
            .glyph_index(ch)
            .and_then(|glyph| parsed.glyph_hor_advance(glyph))
            .unwrap_or(self.space_advance)
    }
}

/// Collects glyph outlines into one path, advancing by the same ttf-parser
/// advances `measure` sums.
struct GlyphSink {
    builder: PathBuilder,
    origin_x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphSink {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Where each role's font comes from: a file (relative to `dir` or absolute)
/// or an installed family name.
#[derive(Debug, Clone, Default)]
pub struct FontSources {
    pub dir: Option<PathBuf>,
    pub roles: HashMap<FontRole, String>,
}

/// Fonts for every role of one render call.
#[derive(Clone)]
pub struct FontSet {
    fonts: Vec<CardFont>,
}

impl FontSet {
    /// Every role set in the built-in bitmap font.
    pub fn builtin(theme: &CardTheme) -> Self {
        let fonts = FontRole::ALL
            .iter()
            .map(|role| CardFont::builtin(theme.font_size(*role), role.is_bold()))
            .collect();
        Self { fonts }
    }

    /// Resolves every role from `sources`. A role that cannot be loaded is
    /// logged and falls back to the bitmap font; loading never fails.
    pub fn load(sources: &FontSources, theme: &CardTheme) -> Self {
        let mut system_db: Option<fontdb::Database> = None;
        let mut set = Self::builtin(theme);
        for role in FontRole::ALL {
            let Some(font_name) = sources.roles.get(&role) else {
                warn!(
                    "no font configured for role {}; using built-in bitmap font",
                    role.as_str()
                );
                continue;
            };
            let size = theme.font_size(role);
            match resolve_role_font(font_name, sources.dir.as_deref(), role, size, &mut system_db) {
                Ok(font) => {
                    debug!(
                        "font role {} -> {} ({}px)",
                        role.as_str(),
                        font.family().unwrap_or(font_name),
                        size
                    );
                    set.fonts[role.index()] = font;
                }
                Err(err) => {
                    warn!(
                        "font for role {} unavailable ({:#}); using built-in bitmap font",
                        role.as_str(),
                        err
                    );
                }
            }
        }
        set
    }

    pub fn with_font(mut self, role: FontRole, font: CardFont) -> Self {
        self.fonts[role.index()] = font;
        self
    }

    pub fn font(&self, role: FontRole) -> &CardFont {
        &self.fonts[role.index()]
    }

    pub fn measure(&self, text: &str, role: FontRole) -> TextBox {
        self.font(role).measure(text)
    }
}

fn resolve_role_font(
    font_name: &str,
    dir: Option<&Path>,
    role: FontRole,
    size: f32,
    system_db: &mut Option<fontdb::Database>,
) -> Result<CardFont> {
    let font_name = font_name.trim();
    if font_name.is_empty() {
        return Err(anyhow!("font name is empty"));
    }
    let direct = Path::new(font_name);
    let candidate = match dir {
        Some(dir) if direct.is_relative() => dir.join(direct),
        _ => direct.to_path_buf(),
    };
    if candidate.is_file() {
        return CardFont::from_path(&candidate, size);
    }
    if looks_like_font_file(font_name) {
        return Err(anyhow!("font file not found: {}", candidate.display()));
    }
    let db = system_db.get_or_insert_with(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        db
    });
    load_font_from_family(db, font_name, role, size)
}

fn looks_like_font_file(font_name: &str) -> bool {
    let lower = font_name.to_ascii_lowercase();
    [".ttf", ".otf", ".ttc", ".otc"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn load_font_from_family(
    db: &fontdb::Database,
    family: &str,
    role: FontRole,
    size: f32,
) -> Result<CardFont> {
    let is_sans =
        family.eq_ignore_ascii_case("sans-serif") || family.eq_ignore_ascii_case("sans");
    let families = if is_sans {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        weight: if role.is_bold() {
            fontdb::Weight::BOLD
        } else {
            fontdb::Weight::NORMAL
        },
        style: if role.is_italic() {
            fontdb::Style::Italic
        } else {
            fontdb::Style::Normal
        },
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    CardFont::from_data(data, face_index, size)
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
