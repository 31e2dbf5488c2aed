//! Fitting a node label into its box.
//!
//! Runs on every redraw, so it is a pure function of its inputs and keeps
//! no state between calls. Text width comes from a [`TextMeasure`] supplied
//! by the renderer (a canvas context, a font atlas).

/// Measures the rendered width of a piece of text.
pub trait TextMeasure {
    fn width(&self, text: &str, font_size: f64) -> f64;
}

/// Fixed advance per character, proportional to the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasure {
    pub advance_ratio: f64,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self { advance_ratio: 0.6 }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * self.advance_ratio
    }
}

impl<F> TextMeasure for F
where
    F: Fn(&str, f64) -> f64,
{
    fn width(&self, text: &str, font_size: f64) -> f64 {
        self(text, font_size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelFit {
    pub lines: Vec<String>,
    pub font_size: f64,
    pub line_height: f64,
}

/// Wrap `text` character by character: a character that would overflow
/// `max_width` starts a new line, unless the line is still empty.
pub fn wrap_text(text: &str, max_width: f64, font_size: f64, measure: &impl TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for ch in text.chars() {
        let mut candidate = line.clone();
        candidate.push(ch);
        if measure.width(&candidate, font_size) > max_width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            line.push(ch);
        } else {
            line = candidate;
        }
    }
    lines.push(line);
    lines
}

/// Largest font size `fit_label` starts from.
pub const MAX_FONT_SIZE: f64 = 256.0;

/// Shrink the font one pixel at a time until the wrapped text fits the box.
///
/// The starting size is clamped to `[1, MAX_FONT_SIZE]` (NaN counts as 1).
/// The font never goes below 1px; at that size the result is returned even
/// if it still overflows.
pub fn fit_label(
    text: &str,
    max_width: f64,
    max_height: f64,
    initial_font_size: f64,
    line_height_ratio: f64,
    measure: &impl TextMeasure,
) -> LabelFit {
    let mut font_size = if initial_font_size.is_nan() {
        1.0
    } else {
        initial_font_size.clamp(1.0, MAX_FONT_SIZE)
    };

    loop {
        let lines = wrap_text(text, max_width, font_size, measure);
        let line_height = font_size * line_height_ratio;
        let widest = lines
            .iter()
            .map(|line| measure.width(line, font_size))
            .fold(0.0, f64::max);
        let overflows = lines.len() as f64 * line_height > max_height || widest > max_width;

        if !overflows || font_size <= 1.0 {
            return LabelFit {
                lines,
                font_size,
                line_height,
            };
        }
        font_size = (font_size - 1.0).max(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// 1px per character per font pixel.
    fn unit(text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size
    }

    #[test]
    fn short_text_keeps_font() {
        let fit = fit_label("abc", 100.0, 100.0, 6.0, 1.2, &unit);
        assert_eq!(fit.lines, vec!["abc".to_owned()]);
        assert_eq!(fit.font_size, 6.0);
        assert!((fit.line_height - 7.2).abs() < 1e-9);
    }

    #[test]
    fn wraps_on_overflow() {
        let lines = wrap_text("abcdef", 4.0, 1.0, &unit);
        assert_eq!(lines, vec!["abcd".to_owned(), "ef".to_owned()]);
    }

    #[test]
    fn oversized_character_gets_its_own_line() {
        let lines = wrap_text("ab", 1.0, 5.0, &unit);
        assert_eq!(lines, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn shrinks_until_it_fits() {
        // 12 chars in a 12x12 box: fits at 3px (4 chars per line, 3 lines of 3.6px).
        let fit = fit_label("abcdefghijkl", 12.0, 12.0, 6.0, 1.2, &unit);
        assert_eq!(fit.font_size, 3.0);
        assert_eq!(fit.lines.len(), 3);
    }

    #[test]
    fn floors_at_one_pixel() {
        let fit = fit_label(&"x".repeat(500), 5.0, 5.0, 6.0, 1.2, &unit);
        assert_eq!(fit.font_size, 1.0);
    }

    #[test]
    fn non_finite_start_sizes_terminate() {
        // Starts at the cap; "ab" + "c" at 4px is the first fit.
        let fit = fit_label("abc", 10.0, 10.0, f64::INFINITY, 1.2, &unit);
        assert_eq!(fit.font_size, 4.0);

        let fit = fit_label("abc", 10.0, 10.0, f64::NAN, 1.2, &unit);
        assert_eq!(fit.font_size, 1.0);

        let fit = fit_label("abc", 1e6, 1e6, 1e12, 1.2, &unit);
        assert_eq!(fit.font_size, MAX_FONT_SIZE);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let fit = fit_label("", 10.0, 10.0, 6.0, 1.2, &MonospaceMeasure::default());
        assert_eq!(fit.lines, vec![String::new()]);
        assert_eq!(fit.font_size, 6.0);
    }

    proptest! {
        #[test]
        fn wrapping_loses_no_characters(text in "[a-z ]{0,60}", width in 1.0f64..40.0) {
            let lines = wrap_text(&text, width, 1.0, &unit);
            prop_assert_eq!(lines.concat(), text);
        }

        #[test]
        fn fit_respects_box_or_hits_floor(text in "[a-z]{1,80}", size in 5.0f64..60.0) {
            let fit = fit_label(&text, size, size, 12.0, 1.2, &unit);
            prop_assert!(fit.font_size >= 1.0 && fit.font_size <= 12.0);
            let height = fit.lines.len() as f64 * fit.line_height;
            let widest = fit.lines.iter().map(|l| unit(l, fit.font_size)).fold(0.0, f64::max);
            prop_assert!(fit.font_size == 1.0 || (height <= size && widest <= size));
        }

        #[test]
        fn any_start_size_is_bounded(text in "[a-z]{0,40}", start in proptest::num::f64::ANY) {
            let fit = fit_label(&text, 20.0, 20.0, start, 1.2, &unit);
            prop_assert!(fit.font_size >= 1.0 && fit.font_size <= MAX_FONT_SIZE);
        }
    }
}
