//! Text helpers shared by the page parsers

use scraper::{ElementRef, Selector};

use crate::parser::error::ParseError;

/// Descendant text nodes, each trimmed, empties dropped, joined by one space
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse every whitespace run to a single space and trim
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css)
        .map_err(|e| ParseError::Selector(format!("Failed to parse selector '{}': {}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_element_text_joins_nodes() {
        let html = Html::parse_fragment("<span>#1  <b>I was</b>\n flying <span>[over water]</span> </span>");
        let span = html.select(&selector("span").unwrap()).next().unwrap();
        assert_eq!(element_text(span), "#1 I was flying [over water]");
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  a \n\t b  c "), "a b c");
        assert_eq!(normalize_ws(" \n "), "");
    }
}
