use tracing::warn;

use super::font::{FontRole, FontSet};
use super::theme::CardTheme;
use super::wrap::{StyledLine, fit_width, wrap_chars, wrap_highlighted, wrap_text};
use crate::record::WordRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Header,
    Definition,
    Divider,
    Columns,
    Examples,
    CallToAction,
    Footer,
}

/// One vertical slice of the card.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub kind: RegionKind,
    pub top_y: f32,
    pub height: f32,
    pub content: RegionContent,
}

impl Region {
    pub fn bottom_y(&self) -> f32 {
        self.top_y + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionContent {
    Header {
        title: String,
        pos: String,
        pos_x: f32,
        pos_y: f32,
    },
    Definition {
        lines: Vec<String>,
    },
    Divider,
    Columns {
        header_height: f32,
        derivatives: Vec<DerivativeEntry>,
        synonyms: Vec<String>,
    },
    Examples {
        term: String,
        sentences: Vec<String>,
        content_height: f32,
        available_height: f32,
        /// Cutoff for example line bottoms, set only when the box is shorter
        /// than its content.
        line_limit: Option<f32>,
    },
    CallToAction {
        lines: Vec<String>,
    },
    Footer {
        label: String,
        label_x: f32,
        icon_x: f32,
        icon_size: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeEntry {
    pub word: String,
    pub short_pos: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub width: u32,
    pub height: u32,
    pub regions: Vec<Region>,
}

impl LayoutPlan {
    pub fn region(&self, kind: RegionKind) -> Option<&Region> {
        self.regions.iter().find(|region| region.kind == kind)
    }
}

/// A wrapped example line and the top of its line box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedExampleLine {
    pub sentence: usize,
    pub y: f32,
    pub line: StyledLine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExamplePlacement {
    pub lines: Vec<PlacedExampleLine>,
    /// Bottom of the last line placed (or of the header when none were).
    pub bottom: f32,
    pub truncated: bool,
}

/// Lays out every region of the card top to bottom.
pub fn plan_layout(record: &WordRecord, fonts: &FontSet, theme: &CardTheme) -> LayoutPlan {
    let mut regions = Vec::with_capacity(8);
    let mut y = theme.top;

    let header = plan_header(record, fonts, theme, y);
    y = header.bottom_y() + theme.header_gap;
    regions.push(header);

    let definition_lines = wrap_chars(&record.meaning, theme.definition_wrap_chars);
    let definition_height = definition_lines.len() as f32 * theme.definition_line_height;
    regions.push(Region {
        kind: RegionKind::Definition,
        top_y: y,
        height: definition_height,
        content: RegionContent::Definition {
            lines: definition_lines,
        },
    });
    y += definition_height + theme.section_gap;

    regions.push(divider(y, theme));
    y += theme.divider_thickness + theme.section_gap;

    let columns = plan_columns(record, fonts, theme, y);
    y = columns.bottom_y() + theme.section_gap;
    regions.push(columns);

    regions.push(divider(y, theme));
    y += theme.divider_thickness + theme.section_gap;

    // The CTA is anchored above the footer and caps the examples box, so it
    // is wrapped before the box is sized.
    let cta_lines = wrap_text(
        &theme.texts.call_to_action,
        fonts.font(FontRole::CallToAction),
        theme.content_width(),
    );
    let cta_height = cta_lines.len() as f32 * theme.cta_line_height;
    let footer_top = theme.height as f32 - theme.footer_offset;
    let cta_top = footer_top - cta_height;

    let examples = plan_examples(record, fonts, theme, y, cta_top);
    if examples.bottom_y() > cta_top {
        warn!(
            "card content for '{}' reaches {:.0}px, past the call-to-action at {:.0}px",
            record.term,
            examples.bottom_y(),
            cta_top
        );
    }
    regions.push(examples);

    regions.push(Region {
        kind: RegionKind::CallToAction,
        top_y: cta_top,
        height: cta_height,
        content: RegionContent::CallToAction { lines: cta_lines },
    });

    regions.push(plan_footer(fonts, theme, footer_top));

    debug_assert!(regions.iter().all(|region| region.height >= 0.0));
    LayoutPlan {
        width: theme.width,
        height: theme.height,
        regions,
    }
}

fn plan_header(record: &WordRecord, fonts: &FontSet, theme: &CardTheme, top: f32) -> Region {
    let title = record.display_term();
    let title_box = fonts.measure(&title, FontRole::Title);
    let pos = record.part_of_speech.clone();
    let pos_box = fonts.measure(&pos, FontRole::PosLabel);

    // A title too wide to share its line pushes the label below it.
    let beside_x = theme.margin_x + title_box.width + theme.pos_gap_x;
    let fits_beside = beside_x + pos_box.width <= theme.width as f32 - theme.margin_x;
    let (pos_x, pos_y) = if fits_beside {
        (beside_x, top + theme.pos_offset_y)
    } else {
        (theme.margin_x, top + title_box.height)
    };
    let height = title_box.height.max(pos_y + pos_box.height - top);
    Region {
        kind: RegionKind::Header,
        top_y: top,
        height,
        content: RegionContent::Header {
            title,
            pos,
            pos_x,
            pos_y,
        },
    }
}

fn plan_columns(record: &WordRecord, fonts: &FontSet, theme: &CardTheme, top: f32) -> Region {
    let header_height = fonts
        .measure(&theme.texts.derivatives_header, FontRole::SectionHeader)
        .height
        .max(
            fonts
                .measure(&theme.texts.synonyms_header, FontRole::SectionHeader)
                .height,
        );
    let column_height = |items: usize| {
        if items == 0 {
            header_height
        } else {
            header_height + theme.column_header_gap + items as f32 * theme.column_line_height
        }
    };
    let height = column_height(record.derivatives.len()).max(column_height(record.synonyms.len()));

    // Entries are cut to their column so the left list never runs into the
    // right one.
    let body = fonts.font(FontRole::Body);
    let small = fonts.font(FontRole::PosLabelSmall);
    let space = body.measure(" ").width;
    let column_width = theme.column_width();
    let derivatives = record
        .derivatives
        .iter()
        .map(|derivative| {
            let short_pos = short_pos(&derivative.part_of_speech);
            let label_width = small.measure(&format!("({})", short_pos)).width;
            let budget = column_width - space - label_width;
            DerivativeEntry {
                word: fit_width(&derivative.word, body, budget),
                short_pos,
            }
        })
        .collect();
    let synonyms = record
        .synonyms
        .iter()
        .map(|synonym| fit_width(synonym, body, column_width - theme.bullet_indent))
        .collect();
    Region {
        kind: RegionKind::Columns,
        top_y: top,
        height,
        content: RegionContent::Columns {
            header_height,
            derivatives,
            synonyms,
        },
    }
}

fn plan_examples(
    record: &WordRecord,
    fonts: &FontSet,
    theme: &CardTheme,
    top: f32,
    cta_top: f32,
) -> Region {
    let available_height = (cta_top - top - theme.box_gap).max(0.0);
    let dry_run = place_example_lines(&record.examples, &record.term, fonts, theme, top, None);
    let content_height = dry_run.bottom - top + theme.box_padding;
    let height = content_height
        .min(available_height)
        .max(theme.box_min_height);
    // Rebuilding the cutoff from `top + height` loses bits in f32, so a box
    // that holds all of its content carries no cutoff at all.
    let line_limit = (height < content_height).then(|| top + height - theme.box_padding);
    Region {
        kind: RegionKind::Examples,
        top_y: top,
        height,
        content: RegionContent::Examples {
            term: record.term.clone(),
            sentences: record.examples.clone(),
            content_height,
            available_height,
            line_limit,
        },
    }
}

/// Positions the example lines of a box whose top edge is `box_top`.
///
/// With `limit` set, placement stops at the first line whose box would cross
/// it and every later line is dropped. Both the sizing pass (no limit) and
/// the render pass (limit at the box's bottom inset) call this.
pub fn place_example_lines(
    sentences: &[String],
    term: &str,
    fonts: &FontSet,
    theme: &CardTheme,
    box_top: f32,
    limit: Option<f32>,
) -> ExamplePlacement {
    let header_height = fonts
        .measure(&theme.texts.examples_header, FontRole::SectionHeader)
        .height;
    let mut bottom = box_top + theme.box_padding + header_height;
    let mut y = bottom + theme.box_header_gap;
    let mut lines = Vec::new();
    let mut truncated = false;

    'sentences: for (index, sentence) in sentences.iter().enumerate() {
        if index > 0 {
            y += theme.example_gap;
        }
        for line in wrap_highlighted(sentence, term, fonts, theme.box_inner_width()) {
            let line_bottom = y + theme.example_line_height;
            if limit.is_some_and(|limit| line_bottom > limit) {
                truncated = true;
                break 'sentences;
            }
            lines.push(PlacedExampleLine {
                sentence: index,
                y,
                line,
            });
            bottom = line_bottom;
            y = line_bottom;
        }
    }

    ExamplePlacement {
        lines,
        bottom,
        truncated,
    }
}

fn plan_footer(fonts: &FontSet, theme: &CardTheme, top: f32) -> Region {
    let label = theme.texts.footer_label.clone();
    let label_width = fonts.measure(&label, FontRole::Caption).width;
    let icon_size = theme.footer_icon_size;
    let icon_x = theme.width as f32 - theme.margin_x - icon_size;
    let label_x = icon_x - theme.footer_gap - label_width;
    Region {
        kind: RegionKind::Footer,
        top_y: top,
        height: theme.footer_offset,
        content: RegionContent::Footer {
            label,
            label_x,
            icon_x,
            icon_size,
        },
    }
}

fn divider(top: f32, theme: &CardTheme) -> Region {
    Region {
        kind: RegionKind::Divider,
        top_y: top,
        height: theme.divider_thickness,
        content: RegionContent::Divider,
    }
}

/// Dictionary-style abbreviation of a part of speech.
pub fn short_pos(pos: &str) -> String {
    let lower = pos.trim().to_lowercase();
    let short = match lower.as_str() {
        "noun" => "n.",
        "verb" => "v.",
        "adjective" => "adj.",
        "adverb" => "adv.",
        "pronoun" => "pron.",
        "preposition" => "prep.",
        "conjunction" => "conj.",
        "interjection" => "interj.",
        _ => "",
    };
    if !short.is_empty() {
        return short.to_string();
    }
    if lower.chars().count() <= 4 {
        return lower;
    }
    let head = lower.chars().take(3).collect::<String>();
    format!("{}.", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::highlight::Emphasis;
    use crate::record::Derivative;

    fn theme() -> CardTheme {
        CardTheme::default()
    }

    fn fonts(theme: &CardTheme) -> FontSet {
        FontSet::builtin(theme)
    }

    fn resilient() -> WordRecord {
        WordRecord {
            term: "resilient".to_string(),
            part_of_speech: "adjective".to_string(),
            meaning: "able to recover quickly".to_string(),
            derivatives: Vec::new(),
            synonyms: vec!["tough".to_string(), "hardy".to_string()],
            examples: vec!["The resilient team recovered fast.".to_string()],
        }
    }

    fn examples_box(plan: &LayoutPlan) -> (f32, f32, f32, f32) {
        let region = plan.region(RegionKind::Examples).expect("examples");
        let RegionContent::Examples {
            content_height,
            available_height,
            ..
        } = &region.content
        else {
            panic!("unexpected content");
        };
        (region.top_y, region.height, *content_height, *available_height)
    }

    fn example_limit(plan: &LayoutPlan) -> Option<f32> {
        let region = plan.region(RegionKind::Examples).expect("examples");
        let RegionContent::Examples { line_limit, .. } = &region.content else {
            panic!("unexpected content");
        };
        *line_limit
    }

    #[test]
    fn regions_are_ordered_and_disjoint() {
        let theme = theme();
        let plan = plan_layout(&resilient(), &fonts(&theme), &theme);
        let kinds = plan.regions.iter().map(|region| region.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                RegionKind::Header,
                RegionKind::Definition,
                RegionKind::Divider,
                RegionKind::Columns,
                RegionKind::Divider,
                RegionKind::Examples,
                RegionKind::CallToAction,
                RegionKind::Footer,
            ]
        );
        for pair in plan.regions.windows(2) {
            assert!(pair[0].bottom_y() <= pair[1].top_y, "{:?}", pair);
        }
        let footer = plan.region(RegionKind::Footer).expect("footer");
        assert_eq!(footer.bottom_y(), theme.height as f32);
    }

    #[test]
    fn header_places_pos_from_title_top() {
        let theme = theme();
        let plan = plan_layout(&resilient(), &fonts(&theme), &theme);
        let header = plan.region(RegionKind::Header).expect("header");
        let RegionContent::Header {
            title, pos, pos_y, ..
        } = &header.content
        else {
            panic!("unexpected content");
        };
        assert_eq!(title, "Resilient");
        assert_eq!(pos, "adjective");
        assert_eq!(*pos_y, header.top_y + theme.pos_offset_y);
    }

    #[test]
    fn wide_title_drops_pos_below() {
        let theme = theme();
        let fonts = fonts(&theme);
        let record = WordRecord {
            term: "pneumonoultramicroscopicsilicovolcanoconiosis".to_string(),
            part_of_speech: "noun".to_string(),
            ..resilient()
        };
        let plan = plan_layout(&record, &fonts, &theme);
        let header = plan.region(RegionKind::Header).expect("header");
        let RegionContent::Header { pos_x, pos_y, .. } = &header.content else {
            panic!("unexpected content");
        };
        let title_height = fonts.measure(&record.display_term(), FontRole::Title).height;
        let pos_height = fonts.measure("noun", FontRole::PosLabel).height;
        assert_eq!(*pos_x, theme.margin_x);
        assert_eq!(*pos_y, header.top_y + title_height);
        assert_eq!(header.height, title_height + pos_height);

        let definition = plan.region(RegionKind::Definition).expect("definition");
        assert_eq!(definition.top_y, header.bottom_y() + theme.header_gap);
    }

    #[test]
    fn long_column_entries_stay_in_their_column() {
        let theme = theme();
        let fonts = fonts(&theme);
        let record = WordRecord {
            derivatives: vec![Derivative {
                word: "counterrevolutionaries-in-waiting".to_string(),
                part_of_speech: "adjective".to_string(),
            }],
            synonyms: vec!["indefatigably-unshakeable-and-steadfast".to_string()],
            ..resilient()
        };
        let plan = plan_layout(&record, &fonts, &theme);
        let columns = plan.region(RegionKind::Columns).expect("columns");
        let RegionContent::Columns {
            derivatives,
            synonyms,
            ..
        } = &columns.content
        else {
            panic!("unexpected content");
        };

        let entry = &derivatives[0];
        assert!(entry.word.ends_with("..."), "{}", entry.word);
        let label = format!("({})", entry.short_pos);
        let used = fonts.measure(&entry.word, FontRole::Body).width
            + fonts.measure(" ", FontRole::Body).width
            + fonts.measure(&label, FontRole::PosLabelSmall).width;
        assert!(used <= theme.column_width());

        assert!(synonyms[0].ends_with("..."), "{}", synonyms[0]);
        let synonym_width = fonts.measure(&synonyms[0], FontRole::Body).width;
        assert!(theme.bullet_indent + synonym_width <= theme.column_width());
    }

    #[test]
    fn empty_columns_advance_by_header_height_only() {
        let theme = theme();
        let record = WordRecord {
            synonyms: Vec::new(),
            ..resilient()
        };
        let plan = plan_layout(&record, &fonts(&theme), &theme);
        let columns = plan.region(RegionKind::Columns).expect("columns");
        let RegionContent::Columns { header_height, .. } = &columns.content else {
            panic!("unexpected content");
        };
        assert_eq!(columns.height, *header_height);
    }

    #[test]
    fn uneven_columns_use_the_longer_side() {
        let theme = theme();
        let record = WordRecord {
            derivatives: vec![
                Derivative {
                    word: "resilience".to_string(),
                    part_of_speech: "noun".to_string(),
                },
                Derivative {
                    word: "resiliently".to_string(),
                    part_of_speech: "adverb".to_string(),
                },
                Derivative {
                    word: "resiliency".to_string(),
                    part_of_speech: "noun".to_string(),
                },
            ],
            ..resilient()
        };
        let plan = plan_layout(&record, &fonts(&theme), &theme);
        let columns = plan.region(RegionKind::Columns).expect("columns");
        let RegionContent::Columns {
            header_height,
            derivatives,
            ..
        } = &columns.content
        else {
            panic!("unexpected content");
        };
        assert_eq!(derivatives[1].short_pos, "adv.");
        assert_eq!(
            columns.height,
            header_height + theme.column_header_gap + 3.0 * theme.column_line_height
        );
    }

    #[test]
    fn examples_box_is_content_sized_within_bounds() {
        let theme = theme();
        let plan = plan_layout(&resilient(), &fonts(&theme), &theme);
        let (_, height, content, available) = examples_box(&plan);
        assert!(height >= theme.box_min_height);
        assert!(height <= available);
        assert_eq!(height, content.max(theme.box_min_height));
    }

    #[test]
    fn empty_examples_render_minimum_box() {
        let theme = theme();
        let record = WordRecord {
            examples: Vec::new(),
            ..resilient()
        };
        let plan = plan_layout(&record, &fonts(&theme), &theme);
        let (_, height, _, _) = examples_box(&plan);
        assert_eq!(height, theme.box_min_height);
    }

    #[test]
    fn crowded_examples_are_capped_and_truncated() {
        let theme = theme();
        let sentence = "A resilient plan survives every storm, every drought and every \
                        long winter that follows the harvest season."
            .to_string();
        let record = WordRecord {
            examples: vec![sentence; 12],
            ..resilient()
        };
        let fonts = fonts(&theme);
        let plan = plan_layout(&record, &fonts, &theme);
        let (top, height, content, available) = examples_box(&plan);
        assert!(content > available);
        assert_eq!(height, available.max(theme.box_min_height));

        let limit = example_limit(&plan).expect("capped box has a cutoff");
        assert_eq!(limit, top + height - theme.box_padding);
        let placed =
            place_example_lines(&record.examples, "resilient", &fonts, &theme, top, Some(limit));
        assert!(placed.truncated);
        assert!(placed.bottom <= limit);
        for line in &placed.lines {
            assert!(line.y + theme.example_line_height <= limit);
        }
    }

    #[test]
    fn squeezed_box_never_goes_negative() {
        let mut theme = theme();
        theme.height = 500;
        let record = WordRecord {
            meaning: "word ".repeat(80),
            ..resilient()
        };
        let plan = plan_layout(&record, &fonts(&theme), &theme);
        let (_, height, _, available) = examples_box(&plan);
        assert_eq!(available, 0.0);
        assert_eq!(height, theme.box_min_height);
    }

    #[test]
    fn dry_run_and_render_pass_agree() {
        let theme = theme();
        let fonts = fonts(&theme);
        let record = resilient();
        let plan = plan_layout(&record, &fonts, &theme);
        let (top, _, content, _) = examples_box(&plan);
        assert_eq!(example_limit(&plan), None);
        let placed = place_example_lines(
            &record.examples,
            &record.term,
            &fonts,
            &theme,
            top,
            example_limit(&plan),
        );
        assert!(!placed.truncated);
        assert_eq!(placed.bottom - top + theme.box_padding, content);
        let words = placed
            .lines
            .iter()
            .flat_map(|line| line.line.words.iter())
            .collect::<Vec<_>>();
        for word in words {
            let expected = if word.text == "resilient" {
                Emphasis::Emphasis
            } else {
                Emphasis::Plain
            };
            assert_eq!(word.emphasis, expected, "{}", word.text);
        }
    }

    #[test]
    fn fractional_geometry_keeps_every_line_of_an_uncapped_box() {
        let record = WordRecord {
            examples: vec![
                "The resilient team recovered fast.".to_string(),
                "Resilient cities plan for floods before the rain arrives.".to_string(),
            ],
            ..resilient()
        };
        for step in 0..20 {
            for padding_step in 1..10 {
                let mut theme = theme();
                theme.top += step as f32 * 0.037;
                theme.box_padding = padding_step as f32 * 0.13 + 20.0;
                let fonts = fonts(&theme);
                let plan = plan_layout(&record, &fonts, &theme);
                let (top, height, content, _) = examples_box(&plan);
                if height < content {
                    continue;
                }
                let sized =
                    place_example_lines(&record.examples, &record.term, &fonts, &theme, top, None);
                let painted = place_example_lines(
                    &record.examples,
                    &record.term,
                    &fonts,
                    &theme,
                    top,
                    example_limit(&plan),
                );
                assert!(
                    !painted.truncated,
                    "top {} padding {}",
                    theme.top,
                    theme.box_padding
                );
                assert_eq!(painted.lines.len(), sized.lines.len());
            }
        }
    }

    #[test]
    fn footer_is_right_aligned() {
        let theme = theme();
        let fonts = fonts(&theme);
        let plan = plan_layout(&resilient(), &fonts, &theme);
        let footer = plan.region(RegionKind::Footer).expect("footer");
        let RegionContent::Footer {
            label,
            label_x,
            icon_x,
            icon_size,
        } = &footer.content
        else {
            panic!("unexpected content");
        };
        assert_eq!(icon_x + icon_size, theme.width as f32 - theme.margin_x);
        let label_width = fonts.measure(label, FontRole::Caption).width;
        assert_eq!(label_x + label_width + theme.footer_gap, *icon_x);
    }

    #[test]
    fn short_pos_abbreviates() {
        assert_eq!(short_pos("Noun"), "n.");
        assert_eq!(short_pos("adjective"), "adj.");
        assert_eq!(short_pos("participle"), "par.");
        assert_eq!(short_pos("idm"), "idm");
    }
}
