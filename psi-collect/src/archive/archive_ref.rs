//! Reference to a remote `.tar` archive

use super::UNKNOWN;
use crate::error::{CollectError, CollectResult};
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A downloadable archive listed on a storm page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRef {
    pub url: String,
    /// Date the imagery was taken, `Unknown` if not published
    pub date: String,
    /// Publisher's label (usually `TIF` or `RAW JPEG`), `Unknown` if absent
    pub label: String,
    /// Last URL path segment without the `.tar` extension
    pub file_name: String,
}

impl ArchiveRef {
    /// # Errors
    /// [`CollectError::MalformedUrl`] if `url` does not end in a `.tar` file.
    pub fn new(url: &str, date: Option<String>, label: Option<String>) -> CollectResult<Self> {
        Ok(Self {
            url: url.to_string(),
            date: date.unwrap_or_else(|| UNKNOWN.to_string()),
            label: label.unwrap_or_else(|| UNKNOWN.to_string()),
            file_name: file_name_from_url(url)?,
        })
    }

    /// File name on disk, e.g. `20180915a_RGB.tar`
    pub fn tar_name(&self) -> String {
        format!("{}.tar", self.file_name)
    }

    /// Whether the date, file name or label matches `filter`
    pub fn matches(&self, filter: &Regex) -> bool {
        filter.is_match(&self.date) || filter.is_match(&self.file_name) || filter.is_match(&self.label)
    }
}

impl fmt::Display for ArchiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.date == UNKNOWN && self.label == UNKNOWN {
            write!(f, "{}", self.tar_name())
        } else {
            write!(f, "({}) {} [{}]", self.date, self.tar_name(), self.label)
        }
    }
}

fn file_name_from_url(url: &str) -> CollectResult<String> {
    let malformed = || CollectError::MalformedUrl(url.to_string());

    let parsed = Url::parse(url).map_err(|_| malformed())?;
    let last = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .ok_or_else(malformed)?;

    match last.strip_suffix(".tar") {
        Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://storms.ngs.noaa.gov/storms/florence/downloads/20180915a_RGB.tar";

    #[test]
    fn test_file_name_from_url() {
        let archive = ArchiveRef::new(URL, None, None).unwrap();
        assert_eq!(archive.file_name, "20180915a_RGB");
        assert_eq!(archive.tar_name(), "20180915a_RGB.tar");
    }

    #[test]
    fn test_malformed_urls() {
        for url in [
            "https://storms.ngs.noaa.gov/storms/florence/index.html",
            "https://storms.ngs.noaa.gov/.tar",
            "not a url",
        ] {
            let err = ArchiveRef::new(url, None, None).unwrap_err();
            assert!(matches!(err, CollectError::MalformedUrl(_)), "{}", url);
        }
    }

    #[test]
    fn test_display() {
        let plain = ArchiveRef::new(URL, None, None).unwrap();
        assert_eq!(plain.to_string(), "20180915a_RGB.tar");

        let labelled =
            ArchiveRef::new(URL, Some("2018/09/15".into()), Some("TIF".into())).unwrap();
        assert_eq!(labelled.to_string(), "(2018/09/15) 20180915a_RGB.tar [TIF]");

        let date_only = ArchiveRef::new(URL, Some("2018/09/15".into()), None).unwrap();
        assert_eq!(date_only.to_string(), "(2018/09/15) 20180915a_RGB.tar [Unknown]");
    }

    #[test]
    fn test_matches_any_field() {
        let archive = ArchiveRef::new(URL, Some("2018/09/15".into()), Some("RAW JPEG".into())).unwrap();
        let re = |p: &str| regex::RegexBuilder::new(p).case_insensitive(true).build().unwrap();

        assert!(archive.matches(&re("raw jpeg")));
        assert!(archive.matches(&re("09/15")));
        assert!(archive.matches(&re("_rgb$")));
        assert!(!archive.matches(&re("tif")));
    }
}
