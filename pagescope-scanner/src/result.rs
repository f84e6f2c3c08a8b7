use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code recorded for a link whose probe never produced an HTTP
/// response (DNS, connect, TLS, timeout, redirect loop).
pub const UNREACHABLE_STATUS: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HtmlVersion {
    #[serde(rename = "HTML 4.01")]
    Html401,
    #[serde(rename = "XHTML 1.0")]
    Xhtml10,
    #[serde(rename = "XHTML 1.1")]
    Xhtml11,
    #[serde(rename = "HTML5")]
    Html5,
    Unknown,
}

impl HtmlVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HtmlVersion::Html401 => "HTML 4.01",
            HtmlVersion::Xhtml10 => "XHTML 1.0",
            HtmlVersion::Xhtml11 => "XHTML 1.1",
            HtmlVersion::Html5 => "HTML5",
            HtmlVersion::Unknown => "Unknown",
        }
    }

    /// Inverse of [`HtmlVersion::as_str`]; unrecognised strings map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "HTML 4.01" => HtmlVersion::Html401,
            "XHTML 1.0" => HtmlVersion::Xhtml10,
            "XHTML 1.1" => HtmlVersion::Xhtml11,
            "HTML5" => HtmlVersion::Html5,
            _ => HtmlVersion::Unknown,
        }
    }
}

impl fmt::Display for HtmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-level heading tag counts (`h1`..`h6`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingProfile {
    pub h1: u32,
    pub h2: u32,
    pub h3: u32,
    pub h4: u32,
    pub h5: u32,
    pub h6: u32,
}

impl HeadingProfile {
    /// Bump the counter for `tag` if it names a heading. Returns whether it did.
    pub fn record(&mut self, tag: &str) -> bool {
        let counter = match tag {
            "h1" => &mut self.h1,
            "h2" => &mut self.h2,
            "h3" => &mut self.h3,
            "h4" => &mut self.h4,
            "h5" => &mut self.h5,
            "h6" => &mut self.h6,
            _ => return false,
        };
        *counter += 1;
        true
    }

    pub fn as_array(&self) -> [u32; 6] {
        [self.h1, self.h2, self.h3, self.h4, self.h5, self.h6]
    }

    pub fn total(&self) -> u32 {
        self.as_array().iter().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkProfile {
    pub internal_links: u32,
    pub external_links: u32,
    pub has_login_form: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    pub url: String,
    pub status_code: u16,
}

impl BrokenLink {
    pub fn is_unreachable(&self) -> bool {
        self.status_code == UNREACHABLE_STATUS
    }
}

/// Everything one analysis run learns about a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub url: String,
    pub title: String,
    pub html_version: HtmlVersion,
    pub headings: HeadingProfile,
    pub links: LinkProfile,
    pub broken_links: Vec<BrokenLink>,
}
