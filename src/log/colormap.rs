//! Level name to display style.
//!
//! `color_for` is the fixed table used by [`WindowSink`](super::WindowSink).
//! `parse_style` reads style descriptions such as `"red bold"` or
//! `"<blue><italic><WHITE>"` for applications defining their own levels:
//! lowercase color words set the foreground, uppercase ones the background.

use tracing::Level;

use crate::types::{Attr, Color, Style};

/// Style for a log level name. Unknown names get the default style.
pub fn color_for(level: &str) -> Style {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Style::new().fg(Color::Cyan),
        "DEBUG" => Style::new().fg(Color::Blue),
        "INFO" => Style::new().attrs(Attr::BOLD),
        "SUCCESS" => Style::new().fg(Color::Green),
        "WARN" | "WARNING" => Style::new().fg(Color::Yellow),
        "ERROR" => Style::new().fg(Color::Red),
        "CRITICAL" => Style::new().bg(Color::Red).attrs(Attr::BOLD),
        _ => Style::new(),
    }
}

/// `color_for` keyed by a `tracing` level.
pub fn color_for_level(level: &Level) -> Style {
    color_for(level.as_str())
}

fn color_word(word: &str) -> Option<Color> {
    Some(match word {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        _ => return None,
    })
}

fn attr_word(word: &str) -> Option<Attr> {
    Some(match word {
        "bold" => Attr::BOLD,
        "dim" => Attr::DIM,
        "normal" => Attr::empty(),
        "hide" => Attr::HIDDEN,
        "italic" => Attr::ITALIC,
        "blink" => Attr::BLINK,
        "strike" => Attr::STRIKE,
        "underline" => Attr::UNDERLINE,
        "reverse" => Attr::REVERSE,
        _ => return None,
    })
}

/// Parse a style description. Unrecognized words are ignored.
pub fn parse_style(description: &str) -> Style {
    description
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|word| !word.is_empty())
        .fold(Style::new(), |style, word| {
            let lower = word.to_ascii_lowercase();
            if word.chars().all(|c| c.is_ascii_lowercase()) {
                if let Some(color) = color_word(word) {
                    return style.fg(color);
                }
            } else if word.chars().all(|c| c.is_ascii_uppercase()) {
                if let Some(color) = color_word(&lower) {
                    return style.bg(color);
                }
            }
            match attr_word(&lower) {
                Some(attr) => style.attrs(style.attrs | attr),
                None => style,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_table() {
        assert_eq!(color_for("TRACE").fg, Color::Cyan);
        assert_eq!(color_for("DEBUG").fg, Color::Blue);
        assert_eq!(color_for("INFO"), Style::new().attrs(Attr::BOLD));
        assert_eq!(color_for("SUCCESS").fg, Color::Green);
        assert_eq!(color_for("WARN"), color_for("WARNING"));
        assert_eq!(color_for("WARNING").fg, Color::Yellow);
        assert_eq!(color_for("ERROR").fg, Color::Red);

        let critical = color_for("CRITICAL");
        assert_eq!(critical.bg, Color::Red);
        assert!(critical.attrs.contains(Attr::BOLD));
    }

    #[test]
    fn test_unknown_level_is_default() {
        assert_eq!(color_for("NOTICE"), Style::new());
        assert_eq!(color_for(""), Style::new());
    }

    #[test]
    fn test_level_names_are_padded_and_case_insensitive() {
        assert_eq!(color_for(" warn "), color_for("WARN"));
        assert_eq!(color_for_level(&Level::ERROR), color_for("ERROR"));
    }

    #[test]
    fn test_parse_style_words() {
        assert_eq!(
            parse_style("red bold"),
            Style::new().fg(Color::Red).attrs(Attr::BOLD)
        );
        assert_eq!(
            parse_style("<blue><italic><WHITE>"),
            Style::new()
                .fg(Color::Blue)
                .bg(Color::White)
                .attrs(Attr::ITALIC)
        );
        assert_eq!(parse_style("green, reverse").attrs, Attr::REVERSE);
    }

    #[test]
    fn test_parse_style_ignores_unknown_words() {
        assert_eq!(parse_style("glittery"), Style::new());
        assert_eq!(parse_style("Red"), Style::new());
    }
}
