use super::font::{CardFont, FontRole, FontSet};
use super::highlight::{Emphasis, classify};

/// Greedy word wrap under a pixel budget. Words are never split: a word wider
/// than `max_width` is placed alone on its own line.
pub fn wrap_text(text: &str, font: &CardFont, max_width: f32) -> Vec<String> {
    wrap_greedy(text, |candidate| font.measure(candidate).width <= max_width)
}

/// Greedy word wrap under a character budget.
///
/// Used for the definition, where a character count stands in for the pixel
/// width. This is an approximation, not pixel-exact layout.
pub fn wrap_chars(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    wrap_greedy(text, |candidate| candidate.chars().count() <= max_chars)
}

fn wrap_greedy(text: &str, fits: impl Fn(&str) -> bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for token in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(token);
            continue;
        }
        let candidate = format!("{} {}", current, token);
        if fits(&candidate) {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, token.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

const ELLIPSIS: &str = "...";

/// Shortens `text` from the end, marking the cut with an ellipsis, until it
/// fits `max_width`. Returns an empty string when not even the ellipsis fits.
pub fn fit_width(text: &str, font: &CardFont, max_width: f32) -> String {
    if font.measure(text).width <= max_width {
        return text.to_string();
    }
    let mut kept = text.chars().collect::<Vec<_>>();
    while kept.pop().is_some() {
        let head = kept.iter().collect::<String>();
        let candidate = format!("{}{}", head.trim_end(), ELLIPSIS);
        if font.measure(&candidate).width <= max_width {
            return candidate;
        }
    }
    String::new()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledWord {
    pub text: String,
    pub emphasis: Emphasis,
    /// Offset from the line's left edge.
    pub x: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledLine {
    pub words: Vec<StyledWord>,
    pub width: f32,
}

/// Wraps one example sentence word by word, measuring each word in the font
/// its emphasis selects. The dry run that sizes the examples box and the
/// render pass that paints it both go through here.
pub fn wrap_highlighted(
    sentence: &str,
    term: &str,
    fonts: &FontSet,
    max_width: f32,
) -> Vec<StyledLine> {
    let space = fonts.measure(" ", FontRole::Body).width;
    let mut lines = Vec::new();
    let mut current = StyledLine {
        words: Vec::new(),
        width: 0.0,
    };
    for token in sentence.split_whitespace() {
        let emphasis = classify(token, term);
        let width = fonts.measure(token, emphasis.font_role()).width;
        if !current.words.is_empty() {
            if current.width + space + width <= max_width {
                current.width += space;
            } else {
                lines.push(std::mem::replace(
                    &mut current,
                    StyledLine {
                        words: Vec::new(),
                        width: 0.0,
                    },
                ));
            }
        }
        current.words.push(StyledWord {
            text: token.to_string(),
            emphasis,
            x: current.width,
            width,
        });
        current.width += width;
    }
    if !current.words.is_empty() {
        lines.push(current);
    }
    lines
}
