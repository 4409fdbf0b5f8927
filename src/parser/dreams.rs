//! Dream reports from a series listing page
//!
//! Each dream is rendered as a `<span>` whose text reads
//!
//! ```text
//! #12 (1985-03-02) I was standing on a bridge ... (143 words)
//! ```
//!
//! The date is optional and kept with its parentheses, as published
//! tables store it. Editorial comments sit in nested
//! `<span class="comment">` elements and stay part of the dream text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, instrument};

use crate::dataset::{DreamRecord, DreamTable};
use crate::parser::error::ParseError;
use crate::parser::text::{element_text, selector};

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(\S+) (?:(\(\S*\)) )?").expect("valid header pattern"));

static WORD_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \n]?\([0-9]+ words?\)$").expect("valid word count pattern"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid number pattern"));

/// Parse every dream on a listing page
///
/// The page states how many dreams the series holds and how many it
/// displays; both must equal the number of dreams extracted.
#[instrument(skip(html), fields(bytes = html.len()))]
pub fn parse_dreams(dataset_id: &str, html: &str) -> Result<DreamTable, ParseError> {
    let document = Html::parse_document(html);
    let spans = selector("span")?;

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for (index, span) in document.select(&spans).filter(is_dream_span).enumerate() {
        let record = parse_dream(dataset_id, index, &element_text(span))?;
        if !seen.insert(record.n.clone()) {
            return Err(ParseError::DuplicateDream {
                dataset: dataset_id.to_string(),
                n: record.n,
            });
        }
        records.push(record);
    }

    let (total, displayed) = stated_counts(dataset_id, &document)?;
    if total != records.len() || displayed != records.len() {
        return Err(ParseError::CountMismatch {
            dataset: dataset_id.to_string(),
            total,
            displayed,
            extracted: records.len(),
        });
    }

    debug!("Parsed {} dreams for {}", records.len(), dataset_id);
    Ok(DreamTable::new(dataset_id, records))
}

/// Spans without inline style that are not editorial comments
fn is_dream_span(span: &ElementRef<'_>) -> bool {
    let element = span.value();
    element.attr("style").is_none() && !element.classes().any(|class| class == "comment")
}

/// Split one span's text into number, date and report
fn parse_dream(dataset_id: &str, index: usize, text: &str) -> Result<DreamRecord, ParseError> {
    let header = HEADER
        .captures(text)
        .ok_or_else(|| ParseError::MissingDreamNumber {
            dataset: dataset_id.to_string(),
            index,
            snippet: text.chars().take(40).collect(),
        })?;
    let n = header[1].to_string();
    let date = header.get(2).map(|m| m.as_str().to_string());
    let body = &text[header[0].len()..];

    let word_count = WORD_COUNT
        .find(body)
        .ok_or_else(|| ParseError::MissingWordCount {
            dataset: dataset_id.to_string(),
            n: n.clone(),
        })?;

    Ok(DreamRecord {
        n,
        date,
        dream: body[..word_count.start()].trim_end().to_string(),
    })
}

/// Series total and displayed count from the element following the first
/// `<h4>` in document order
fn stated_counts(dataset_id: &str, document: &Html) -> Result<(usize, usize), ParseError> {
    let missing = || ParseError::MissingCount {
        dataset: dataset_id.to_string(),
    };

    let heading = document
        .select(&selector("h4")?)
        .next()
        .ok_or_else(missing)?;
    let statement = next_element(heading)
        .map(element_text)
        .ok_or_else(missing)?;

    let mut numbers = NUMBER
        .find_iter(&statement)
        .filter_map(|m| m.as_str().parse::<usize>().ok());
    match (numbers.next(), numbers.next()) {
        (Some(total), Some(displayed)) => Ok((total, displayed)),
        _ => Err(missing()),
    }
}

/// First element after the start tag of `element`: its first child element,
/// or else the next element sibling of it or of its nearest ancestor
fn next_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if let Some(child) = element.descendants().skip(1).find_map(ElementRef::wrap) {
        return Some(child);
    }
    let node = *element;
    std::iter::once(node)
        .chain(node.ancestors())
        .find_map(|n| n.next_siblings().find_map(ElementRef::wrap))
}
