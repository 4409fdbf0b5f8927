//! Records produced by the parsers and served by the access API

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, de};

/// Date layouts seen in dream headers, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// A single dream report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamRecord {
    /// Position of the dream in its series. Not always numeric (`111a`).
    pub n: String,

    /// Date as printed by the source; published tables keep the parentheses
    pub date: Option<String>,

    /// Report text, including any bracketed annotations
    pub dream: String,
}

impl DreamRecord {
    /// Best-effort conversion of the printed date
    ///
    /// Surrounding parentheses are ignored. A bare four digit year maps to
    /// the first of January. Anything else that does not fit a known layout
    /// yields `None`.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let raw = strip_parens(self.date.as_deref()?);
        if let Some(date) = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        {
            return Some(date);
        }
        if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
            return raw
                .parse::<i32>()
                .ok()
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
        }
        None
    }
}

/// Printed date without surrounding whitespace and parentheses
pub fn strip_parens(date: &str) -> &str {
    let date = date.trim();
    date.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .map_or(date, str::trim)
}

/// All dreams of one series
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DreamTable {
    /// Series identifier, e.g. `alta`
    pub dataset_id: String,

    /// Dreams in page order
    pub records: Vec<DreamRecord>,
}

impl DreamTable {
    pub fn new(dataset_id: impl Into<String>, records: Vec<DreamRecord>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DreamRecord> {
        self.records.iter()
    }

    /// Whether any dream carries a date; tables without dates drop the column
    pub fn has_dates(&self) -> bool {
        self.records.iter().any(|r| r.date.is_some())
    }

    /// Look up a dream by its series number
    pub fn get(&self, n: &str) -> Option<&DreamRecord> {
        self.records.iter().find(|r| r.n == n)
    }
}

impl<'a> IntoIterator for &'a DreamTable {
    type Item = &'a DreamRecord;
    type IntoIter = std::slice::Iter<'a, DreamRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Descriptive metadata for a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Series identifier
    pub short_name: String,

    /// Series title
    pub long_name: String,

    /// Number of dreams the source reports for the series
    ///
    /// Published snapshots store it as text, so both `422` and `"422"` read.
    #[serde(deserialize_with = "deserialize_count")]
    pub n_dreams: u32,

    /// Year or span of years the dreams were collected
    pub timeframe: String,

    /// Sex of the dreamer(s)
    pub sex: String,

    /// Free-form description
    pub description: String,

    /// Sections of the further-analyses page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DetailSection>,
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u32),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(text) => text
            .trim()
            .replace(',', "")
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid dream count: {:?}", text))),
    }
}

/// A titled block of the further-analyses page
///
/// Top-level sections may hold second-level subsections; subsections never
/// nest further.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetailSection {
    /// Heading text. Content preceding the first heading has no title.
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DetailField>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraphs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<DetailSection>,
}

impl DetailSection {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// True when the section holds neither content nor subsections
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.paragraphs.is_empty() && self.subsections.is_empty()
    }

    /// Value of the first field with this name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// A labelled value, e.g. `Age: 25`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailField {
    pub name: String,
    pub value: String,
}

impl DetailField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: &str, date: Option<&str>) -> DreamRecord {
        DreamRecord {
            n: n.to_string(),
            date: date.map(str::to_string),
            dream: "I was flying.".to_string(),
        }
    }

    #[test]
    fn test_parsed_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1985, 3, 2).unwrap();
        assert_eq!(record("1", Some("1985-03-02")).parsed_date(), Some(expected));
        assert_eq!(record("1", Some("03/02/1985")).parsed_date(), Some(expected));
        assert_eq!(record("1", Some("03/02/85")).parsed_date(), Some(expected));
        assert_eq!(record("1", Some("02.03.1985")).parsed_date(), Some(expected));
        assert_eq!(
            record("1", Some("1999")).parsed_date(),
            NaiveDate::from_ymd_opt(1999, 1, 1)
        );
    }

    #[test]
    fn test_parsed_date_in_parentheses() {
        let expected = NaiveDate::from_ymd_opt(1985, 3, 2);
        assert_eq!(record("1", Some("(1985-03-02)")).parsed_date(), expected);
        assert_eq!(record("1", Some(" (03/02/85) ")).parsed_date(), expected);
        assert_eq!(record("1", Some("()")).parsed_date(), None);
        assert_eq!(strip_parens("(1999)"), "1999");
        assert_eq!(strip_parens("(1999"), "(1999");
    }

    #[test]
    fn test_parsed_date_unknown() {
        assert_eq!(record("1", None).parsed_date(), None);
        assert_eq!(record("1", Some("spring-1970")).parsed_date(), None);
        assert_eq!(record("1", Some("?")).parsed_date(), None);
    }

    #[test]
    fn test_table_lookup_and_dates() {
        let table = DreamTable::new(
            "alta",
            vec![record("1", None), record("111a", Some("1985-03-02"))],
        );
        assert_eq!(table.len(), 2);
        assert!(table.has_dates());
        assert_eq!(table.get("111a").unwrap().date.as_deref(), Some("1985-03-02"));
        assert!(table.get("2").is_none());

        let undated = DreamTable::new("b", vec![record("1", None)]);
        assert!(!undated.has_dates());
    }

    #[test]
    fn test_info_json_omits_empty_details() {
        let info = DatasetInfo {
            short_name: "alta".to_string(),
            long_name: "Alta: a detailed dreamer".to_string(),
            n_dreams: 422,
            timeframe: "1985-1997".to_string(),
            sex: "female".to_string(),
            description: "Dreams of an adult woman.".to_string(),
            details: Vec::new(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["n_dreams"], 422);

        let back: DatasetInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_info_json_count_as_text() {
        let json = r#"{"short_name": "alta", "long_name": "Alta", "n_dreams": "1,422",
            "timeframe": "1985-1997", "sex": "female", "description": "An adult woman."}"#;
        let info: DatasetInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.n_dreams, 1422);

        let bad = json.replace("1,422", "many");
        let err = serde_json::from_str::<DatasetInfo>(&bad).unwrap_err();
        assert!(err.to_string().contains("dream count"));
    }

    #[test]
    fn test_detail_section_field_lookup() {
        let mut section = DetailSection::titled("Demographics");
        assert!(section.is_empty());
        section.fields.push(DetailField::new("Age", "25"));
        assert_eq!(section.field("Age"), Some("25"));
        assert_eq!(section.field("Sex"), None);
        assert!(!section.is_empty());
    }
}
