//! # Source Module
//!
//! Everything that talks to the DreamBank site itself: enumerating the
//! available series from the grid page and downloading the three HTML pages
//! each series has. Downloads land in a local cache and are verified against
//! known sha256 hashes, so a curated snapshot can always be traced back to
//! the exact pages it was built from.
//!
//! ## Key Components
//!
//! - `SourceConfig`: site root, cache directory and request pacing
//! - `SourceClient`: cached, hash-verified page downloads
//! - `Component`: the three pages published per series
//! - `parse_dataset_ids`: series identifiers from the grid page

mod client;
mod config;
mod error;
mod lister;

pub use client::{SourceClient, decode_latin1};
pub use config::{DEFAULT_BASE_URL, GRID_HASH, SourceConfig, SourceConfigBuilder};
pub use error::FetchError;
pub use lister::parse_dataset_ids;

use std::fmt;
use std::str::FromStr;

/// A page published for every series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Dream reports of the series
    Dreams,
    /// General description of the series
    Info,
    /// Further analyses of the series
    MoreInfo,
}

impl Component {
    /// All components in registry order
    pub const ALL: [Component; 3] = [Component::Dreams, Component::Info, Component::MoreInfo];

    /// Short name used in file names and on the command line
    pub fn name(self) -> &'static str {
        match self {
            Component::Dreams => "dreams",
            Component::Info => "info",
            Component::MoreInfo => "moreinfo",
        }
    }

    /// Cache file name, e.g. `alta/dreams.html`
    pub fn fname(self, dataset: &str) -> String {
        format!("{}/{}.html", dataset, self.name())
    }

    /// Path and query below the site root
    pub fn path(self, dataset: &str) -> String {
        match self {
            Component::Dreams => format!("random_sample.cgi?series={}", dataset),
            Component::Info => format!("more_info.cgi?series={}", dataset),
            Component::MoreInfo => format!("more_info.cgi?series={}&further=1", dataset),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Component {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| FetchError::UnknownComponent(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_names_and_paths() {
        assert_eq!(Component::Dreams.fname("alta"), "alta/dreams.html");
        assert_eq!(Component::MoreInfo.fname("alta"), "alta/moreinfo.html");
        assert_eq!(
            Component::Dreams.path("alta"),
            "random_sample.cgi?series=alta"
        );
        assert_eq!(Component::Info.path("alta"), "more_info.cgi?series=alta");
        assert_eq!(
            Component::MoreInfo.path("alta"),
            "more_info.cgi?series=alta&further=1"
        );
    }

    #[test]
    fn test_component_from_str() {
        assert_eq!("info".parse::<Component>().unwrap(), Component::Info);
        assert_eq!("moreinfo".parse::<Component>().unwrap(), Component::MoreInfo);
        assert!(matches!(
            "summary".parse::<Component>(),
            Err(FetchError::UnknownComponent(name)) if name == "summary"
        ));
    }
}
