//! Series identifiers from the DreamBank grid page

use std::collections::BTreeSet;

use scraper::{Html, Selector};

use crate::source::error::FetchError;

/// Extract every series identifier from the grid page
///
/// The grid renders one checkbox per series whose `value` is the series
/// identifier. Identifiers come back sorted; a repeated identifier means the
/// page changed shape and is reported as an error.
pub fn parse_dataset_ids(html: &str) -> Result<Vec<String>, FetchError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"input[type="checkbox"]"#)
        .map_err(|e| FetchError::Other(format!("Failed to parse checkbox selector: {}", e)))?;

    let mut ids = BTreeSet::new();
    for value in document
        .select(&selector)
        .filter_map(|input| input.value().attr("value"))
    {
        if !ids.insert(value.to_string()) {
            return Err(FetchError::DuplicateDataset(value.to_string()));
        }
    }
    Ok(ids.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = r#"
        <html><body><form action="search.cgi">
        <table>
          <tr><td><input type="checkbox" name="series" value="zurich"> Zurich</td></tr>
          <tr><td><input type="checkbox" name="series" value="alta"> Alta</td></tr>
          <tr><td><input type="checkbox" name="series" value="b-baseline"> Baseline</td></tr>
          <tr><td><input type="text" name="query" value="flying"></td></tr>
        </table>
        </form></body></html>
    "#;

    #[test]
    fn test_parse_dataset_ids_sorted() {
        let ids = parse_dataset_ids(GRID).unwrap();
        assert_eq!(ids, vec!["alta", "b-baseline", "zurich"]);
    }

    #[test]
    fn test_duplicate_dataset_is_error() {
        let html = r#"<input type="checkbox" value="alta"><input type="checkbox" value="alta">"#;
        match parse_dataset_ids(html) {
            Err(FetchError::DuplicateDataset(id)) => assert_eq!(id, "alta"),
            other => panic!("Expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_grid() {
        assert!(parse_dataset_ids("<html></html>").unwrap().is_empty());
    }
}
