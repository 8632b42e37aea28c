//! Catalogued outlet leans.
//!
//! Coarse host-substring tables for widely catalogued outlets. The
//! catalogue only nudges verdict confidence when the model's label agrees
//! with it; it never picks or changes a label, and unknown outlets simply
//! get no nudge.

use serde::{Deserialize, Serialize};
use url::Url;

/// Catalogued editorial lean of an outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLean {
    Left,
    Center,
    Right,
}

impl SourceLean {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLean::Left => "left",
            SourceLean::Center => "center",
            SourceLean::Right => "right",
        }
    }
}

impl std::fmt::Display for SourceLean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const RIGHT_OUTLETS: &[&str] = &[
    "foxnews",
    "dailywire",
    "breitbart",
    "newsmax",
    "washingtontimes",
    "theblaze",
];

const LEFT_OUTLETS: &[&str] = &["msnbc", "huffpost", "vox", "motherjones", "slate", "salon"];

const CENTER_OUTLETS: &[&str] = &["reuters", "apnews", "bbc", "npr", "axios", "usatoday"];

/// Look up the catalogued lean for a URL's host, if any.
pub fn source_lean(url: &str) -> Option<SourceLean> {
    let host = Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();

    if RIGHT_OUTLETS.iter().any(|s| host.contains(s)) {
        return Some(SourceLean::Right);
    }
    if LEFT_OUTLETS.iter().any(|s| host.contains(s)) {
        return Some(SourceLean::Left);
    }
    if CENTER_OUTLETS.iter().any(|s| host.contains(s)) {
        return Some(SourceLean::Center);
    }
    None
}
