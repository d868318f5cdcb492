//! Percent-change → terminal color mapping (§4.F), in the inclusive-at-
//! extreme / exclusive-at-interior convention §9 resolves the source's
//! boundary inconsistency with. Mirrors the teacher's `ColorSchemeId`
//! pattern of one small enum/table driving terminal presentation, but
//! against `crossterm::style::Color` rather than `ratatui::style::Color`
//! since the renderer draws directly with crossterm primitives.

use crossterm::style::Color;

/// A cell's foreground, and background only for the two extreme buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellColor {
    pub foreground: Color,
    pub background: Option<Color>,
}

fn plain(foreground: Color) -> CellColor {
    CellColor { foreground, background: None }
}

fn inverted(background: Color) -> CellColor {
    CellColor { foreground: Color::White, background: Some(background) }
}

/// Map one percent-change value to its cell color per the §4.F table.
pub fn color_for_percent_change(change: f64) -> CellColor {
    if change <= -1.0 {
        inverted(Color::Blue)
    } else if change < -0.25 {
        plain(Color::Blue)
    } else if change < -0.01 {
        plain(Color::Cyan)
    } else if change < 0.0 {
        plain(Color::Green)
    } else if change == 0.0 {
        plain(Color::White)
    } else if change < 0.01 {
        plain(Color::Yellow)
    } else if change < 0.25 {
        plain(Color::Magenta)
    } else if change < 1.0 {
        plain(Color::Red)
    } else {
        inverted(Color::Red)
    }
}

/// Detail rows color their sample count green when the connection gained
/// samples this tick, and leave it uncolored otherwise.
pub fn color_for_sample_count(samples_change: f64) -> Option<Color> {
    if samples_change > 0.0 {
        Some(Color::Green)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_boundaries_are_inclusive() {
        assert_eq!(color_for_percent_change(-1.0), inverted(Color::Blue));
        assert_eq!(color_for_percent_change(1.0), inverted(Color::Red));
    }

    #[test]
    fn interior_boundaries_are_exclusive_on_the_low_side() {
        assert_eq!(color_for_percent_change(-0.25), plain(Color::Cyan));
        assert_eq!(color_for_percent_change(0.25), plain(Color::Red));
        assert_eq!(color_for_percent_change(0.01), plain(Color::Magenta));
        assert_eq!(color_for_percent_change(-0.01), plain(Color::Green));
    }

    #[test]
    fn exact_zero_is_plain_white() {
        assert_eq!(color_for_percent_change(0.0), plain(Color::White));
    }

    #[test]
    fn just_above_and_below_zero_are_yellow_and_green() {
        assert_eq!(color_for_percent_change(0.0001), plain(Color::Yellow));
        assert_eq!(color_for_percent_change(-0.0001), plain(Color::Green));
    }

    #[test]
    fn sample_count_color_only_on_gain() {
        assert_eq!(color_for_sample_count(1.0), Some(Color::Green));
        assert_eq!(color_for_sample_count(0.0), None);
        assert_eq!(color_for_sample_count(-1.0), None);
    }
}
