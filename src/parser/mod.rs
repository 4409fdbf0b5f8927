//! # Parser Module
//!
//! Turns the HTML pages of a series into records. Parsing is strict where
//! the source is regular (dream numbering, word counts, stated totals) so
//! that a silently changed page layout fails curation instead of producing
//! a truncated table, and best-effort where it is not (the further-analyses
//! page, dream dates).
//!
//! ## Key Components
//!
//! - `parse_dreams`: dream reports from a listing page
//! - `parse_info`: labelled metadata and description from the info page
//! - `parse_details`: sections and subsections of the further-analyses page

mod details;
mod dreams;
mod error;
mod info;
mod text;

pub use details::parse_details;
pub use dreams::parse_dreams;
pub use error::ParseError;
pub use info::{has_further_analyses, parse_info, parse_info_with_details};
pub use text::{element_text, normalize_ws};
