//! Vocabulary card rendering: metrics, wrapping, region layout and painting.

mod bitmap;
mod canvas;
mod encode;
mod font;
mod highlight;
mod layout;
mod logo;
mod theme;
mod wrap;

use anyhow::Result;
use std::path::PathBuf;
use tiny_skia::Pixmap;
use tracing::{debug, warn};

use crate::record::WordRecord;

pub use canvas::paint;
pub use encode::encode_png;
pub use font::{CardFont, FontRole, FontSet, FontSources, TextBox};
pub use highlight::{Emphasis, classify};
pub use layout::{
    DerivativeEntry, ExamplePlacement, LayoutPlan, PlacedExampleLine, Region, RegionContent,
    RegionKind, place_example_lines, plan_layout, short_pos,
};
pub use logo::load_logo;
pub use theme::{CardTexts, CardTheme, FontSizes, Palette, Rgb};
pub use wrap::{StyledLine, StyledWord, fit_width, wrap_chars, wrap_highlighted, wrap_text};

/// Renders `record` to PNG bytes. The badge stands in for the footer logo.
pub fn render_card(record: &WordRecord, fonts: &FontSet, theme: &CardTheme) -> Result<Vec<u8>> {
    render_card_with_logo(record, fonts, theme, None)
}

pub fn render_card_with_logo(
    record: &WordRecord,
    fonts: &FontSet,
    theme: &CardTheme,
    logo: Option<&Pixmap>,
) -> Result<Vec<u8>> {
    let plan = plan_layout(record, fonts, theme);
    debug!(
        "card plan for '{}': {}",
        record.term,
        plan.regions
            .iter()
            .map(|region| format!("{:?}@{:.0}+{:.0}", region.kind, region.top_y, region.height))
            .collect::<Vec<_>>()
            .join(" ")
    );
    let pixmap = paint(&plan, fonts, theme, logo)?;
    encode_png(pixmap)
}

/// Everything a render needs besides the record, as read from settings.
/// Fonts and the logo are loaded for each call and released with it.
#[derive(Debug, Clone, Default)]
pub struct CardResources {
    pub theme: CardTheme,
    pub fonts: FontSources,
    pub logo_path: Option<PathBuf>,
}

impl CardResources {
    /// Resources that need nothing from disk: bitmap font and badge icon.
    pub fn builtin(theme: CardTheme) -> Self {
        Self {
            theme,
            fonts: FontSources::default(),
            logo_path: None,
        }
    }

    pub fn render(&self, record: &WordRecord) -> Result<Vec<u8>> {
        let fonts = if self.fonts.roles.is_empty() {
            FontSet::builtin(&self.theme)
        } else {
            FontSet::load(&self.fonts, &self.theme)
        };
        let logo = self.load_logo();
        render_card_with_logo(record, &fonts, &self.theme, logo.as_ref())
    }

    fn load_logo(&self) -> Option<Pixmap> {
        let path = self.logo_path.as_ref()?;
        let size = self.theme.footer_icon_size.round().max(1.0) as u32;
        match load_logo(path, size) {
            Ok(logo) => Some(logo),
            Err(err) => {
                warn!("logo unavailable ({:#}); drawing badge instead", err);
                None
            }
        }
    }
}
