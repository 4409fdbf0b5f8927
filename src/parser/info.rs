//! Series metadata from the info page
//!
//! The info page is a run of labelled values followed by a free-form
//! description:
//!
//! ```text
//! Dream series: Alta: a detailed dreamer
//! Number of dreams: 422
//! Year: 1985-1997
//! Sex of the dreamer(s): female
//!
//! Alta is an adult woman who wrote down her dreams ...
//!
//! For the further analyses, click here.
//! [Back to search form]
//! ```

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::instrument;

use crate::dataset::DatasetInfo;
use crate::parser::error::ParseError;
use crate::parser::text::selector;

const LONG_NAME: &str = "Dream series:";
const N_DREAMS: &str = "Number of dreams:";
const TIMEFRAME: &str = "Year:";
const SEX: &str = "Sex of the dreamer(s):";

/// Parse the info page of a series
#[instrument(skip(html), fields(bytes = html.len()))]
pub fn parse_info(dataset_id: &str, html: &str) -> Result<DatasetInfo, ParseError> {
    let document = Html::parse_document(html);
    let body = document
        .select(&selector("body")?)
        .next()
        .unwrap_or_else(|| document.root_element());

    let nodes: Vec<&str> = body.text().collect();
    let value = |label: &str| {
        labelled_value(&nodes, label).ok_or_else(|| ParseError::MissingLabel {
            dataset: dataset_id.to_string(),
            label: label.to_string(),
        })
    };

    let long_name = value(LONG_NAME)?;
    let n_dreams_text = value(N_DREAMS)?;
    let timeframe = value(TIMEFRAME)?;
    let sex = value(SEX)?;

    let n_dreams = n_dreams_text
        .replace(',', "")
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidNumber {
            dataset: dataset_id.to_string(),
            label: N_DREAMS.to_string(),
            value: n_dreams_text.clone(),
        })?;

    let description = description(body, &sex).ok_or_else(|| ParseError::MissingDescription {
        dataset: dataset_id.to_string(),
    })?;

    Ok(DatasetInfo {
        short_name: dataset_id.to_string(),
        long_name,
        n_dreams,
        timeframe,
        sex,
        description,
        details: Vec::new(),
    })
}

/// Parse the info page and attach the sections of the further-analyses page
pub fn parse_info_with_details(
    dataset_id: &str,
    info_html: &str,
    more_info_html: &str,
) -> Result<DatasetInfo, ParseError> {
    let mut info = parse_info(dataset_id, info_html)?;
    info.details = super::details::parse_details(more_info_html)?;
    Ok(info)
}

/// Whether the info page links to a further-analyses page
pub fn has_further_analyses(html: &str) -> bool {
    html.contains("For the further analyses")
}

/// First non-empty text node after the node holding `label`
///
/// Labels usually sit in their own bold element. When a label shares its
/// node with the value, the remainder of that node is the value.
fn labelled_value(nodes: &[&str], label: &str) -> Option<String> {
    let position = nodes
        .iter()
        .position(|node| node.trim().starts_with(label))?;

    let inline = nodes[position].trim()[label.len()..].trim();
    if !inline.is_empty() {
        return Some(inline.to_string());
    }

    nodes[position + 1..]
        .iter()
        .map(|node| node.trim())
        .find(|node| !node.is_empty())
        .map(str::to_string)
}

/// Text between the sex value and the trailing navigation links
fn description(body: ElementRef<'_>, sex: &str) -> Option<String> {
    let text: String = body.text().collect();
    let pattern = format!(
        r"(?s){}\s*{}\s*(.*?)\s*(?:For the further analyses, click here\.\s*)?\[Back to search form\]\s*$",
        regex::escape(SEX),
        regex::escape(sex),
    );
    let re = Regex::new(&pattern).ok()?;
    let captures = re.captures(&text)?;
    Some(captures[1].trim().to_string())
}
