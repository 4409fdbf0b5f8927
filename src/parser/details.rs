//! Sections of the further-analyses page
//!
//! The page has no fixed layout. Headings split it into sections, tables and
//! `Label: value` lines carry demographic fields, and everything else is
//! kept as paragraphs; list items are paragraphs even when they read like
//! fields. Headings at the shallowest level present open top-level
//! sections; any deeper heading opens a second-level subsection.

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use tracing::{debug, instrument};

use crate::dataset::{DetailField, DetailSection};
use crate::parser::error::ParseError;
use crate::parser::text::{element_text, normalize_ws, selector};

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";

/// Lines that are navigation, not content
const NAVIGATION: &[&str] = &["[Back to search form]", "For the further analyses, click here."];

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^:.]{1,40}):\s+(\S.*)$").expect("valid field pattern")
});

/// Parse the further-analyses page into sections
#[instrument(skip(html), fields(bytes = html.len()))]
pub fn parse_details(html: &str) -> Result<Vec<DetailSection>, ParseError> {
    let document = Html::parse_document(html);
    let top_level = document
        .select(&selector(HEADINGS)?)
        .filter_map(|h| heading_level(h.value().name()))
        .min();

    let body = document
        .select(&selector("body")?)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut walker = Walker::new(top_level);
    walker.walk(body);
    let sections = walker.finish();
    debug!("Parsed {} detail sections", sections.len());
    Ok(sections)
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "ul" | "ol" | "dl" | "dt" | "dd" | "table" | "tbody" | "thead"
            | "blockquote" | "center" | "hr" | "form" | "pre"
    )
}

/// Document-order walk that groups text into sections
struct Walker {
    top_level: Option<u8>,
    sections: Vec<DetailSection>,
    current: DetailSection,
    in_subsection: bool,
    /// Nesting depth of `<li>` elements around the current line
    list_depth: usize,
    line: String,
}

impl Walker {
    fn new(top_level: Option<u8>) -> Self {
        Self {
            top_level,
            sections: Vec::new(),
            current: DetailSection::default(),
            in_subsection: false,
            list_depth: 0,
            line: String::new(),
        }
    }

    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.line.push_str(text),
                Node::Element(el) => {
                    let Some(child) = ElementRef::wrap(child) else {
                        continue;
                    };
                    let name = el.name();
                    if let Some(level) = heading_level(name) {
                        self.flush_line();
                        self.open_heading(level, element_text(child));
                    } else if name == "br" {
                        self.flush_line();
                    } else if name == "tr" {
                        self.flush_line();
                        self.push_row(child);
                    } else if matches!(name, "script" | "style" | "head" | "title") {
                        continue;
                    } else if name == "li" {
                        self.flush_line();
                        self.list_depth += 1;
                        self.walk(child);
                        self.flush_line();
                        self.list_depth -= 1;
                    } else if is_block(name) {
                        self.flush_line();
                        self.walk(child);
                        self.flush_line();
                    } else {
                        self.walk(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn open_heading(&mut self, level: u8, title: String) {
        if title.is_empty() {
            return;
        }
        let is_top = self.top_level.is_none_or(|top| level <= top);
        if is_top {
            let previous = std::mem::replace(&mut self.current, DetailSection::titled(title));
            self.close(previous);
            self.in_subsection = false;
        } else {
            self.current.subsections.push(DetailSection::titled(title));
            self.in_subsection = true;
        }
    }

    /// Section that content currently belongs to
    fn target(&mut self) -> &mut DetailSection {
        if self.in_subsection && !self.current.subsections.is_empty() {
            let last = self.current.subsections.len() - 1;
            return &mut self.current.subsections[last];
        }
        &mut self.current
    }

    fn flush_line(&mut self) {
        let line = normalize_ws(&std::mem::take(&mut self.line));
        if line.is_empty() || NAVIGATION.contains(&line.as_str()) {
            return;
        }
        let field = if self.list_depth == 0 {
            FIELD
                .captures(&line)
                .map(|caps| DetailField::new(caps[1].trim(), caps[2].trim()))
        } else {
            None
        };
        match field {
            Some(field) => self.target().fields.push(field),
            None => self.target().paragraphs.push(line),
        }
    }

    fn push_row(&mut self, row: ElementRef<'_>) {
        let cells: Vec<String> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();

        match cells.as_slice() {
            [] => {}
            [single] => {
                self.line.push_str(single);
                self.flush_line();
            }
            [name, rest @ ..] => {
                let field = DetailField::new(name.trim_end_matches(':').trim(), rest.join(" "));
                self.target().fields.push(field);
            }
        }
    }

    fn close(&mut self, mut section: DetailSection) {
        section.subsections.retain(|s| !s.is_empty());
        if !section.is_empty() {
            self.sections.push(section);
        }
    }

    fn finish(mut self) -> Vec<DetailSection> {
        self.flush_line();
        let last = std::mem::take(&mut self.current);
        self.close(last);
        self.sections
    }
}
