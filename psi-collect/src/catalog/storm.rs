//! Storm entries and listing-page parsing
//!
//! The storm index and each storm's page are scraped with regular
//! expressions. Anchors that do not fully match, or whose URL cannot be
//! resolved, are left out of the listing.

use crate::archive::ArchiveRef;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `<a href="…/storms/ID/index.html">TITLE (YEAR)</a>`
static STORM_LINK: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r#"<a href="([^"]*storms/([^/"]+)/index\.html)">([^(<]+)\(([^)<]+)\)</a>"#)
});

/// `<a href="….tar" …>LABEL</a>`
static ARCHIVE_LINK: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r#"<a href="([^"]+\.tar)"[^>]*>([^<]*)</a>"#));

/// Eight-digit `YYYYMMDD` stamp inside an archive file name
static DATE_STAMP: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?:^|\D)(\d{8})(?:\D|$)"));

/// One storm listed on the index page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storm {
    /// Absolute URL of the storm's own page
    pub url: String,
    /// Short id from the URL path, e.g. `florence`
    pub storm_id: String,
    /// Display title, e.g. `Hurricane Florence`
    pub title: String,
    /// Year or season label
    pub year: String,
}

impl Storm {
    /// Whether the id, title or year matches `filter`
    pub fn matches(&self, filter: &Regex) -> bool {
        filter.is_match(&self.storm_id) || filter.is_match(&self.title) || filter.is_match(&self.year)
    }

    /// Folder name used for this storm's downloads
    pub fn folder_name(&self) -> String {
        title_case(&self.storm_id)
    }
}

impl fmt::Display for Storm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.year)
    }
}

/// Extract every storm link from the index page
pub fn parse_storm_index(html: &str, base: &Url) -> Vec<Storm> {
    let re = match STORM_LINK.as_ref() {
        Ok(re) => re,
        Err(e) => {
            tracing::error!("Storm link pattern failed to compile: {}", e);
            return Vec::new();
        }
    };

    re.captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str();
            let url = match base.join(href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(href, error = %e, "Skipping storm link");
                    return None;
                }
            };
            Some(Storm {
                url: url.to_string(),
                storm_id: caps.get(2)?.as_str().to_string(),
                title: caps.get(3)?.as_str().trim().to_string(),
                year: caps.get(4)?.as_str().trim().to_string(),
            })
        })
        .collect()
}

/// Extract every `.tar` link from a storm page
///
/// The anchor text becomes the label and an eight-digit stamp in the file
/// name becomes the date; either falls back to `Unknown`.
pub fn parse_archive_links(html: &str, page_url: &Url) -> Vec<ArchiveRef> {
    let re = match ARCHIVE_LINK.as_ref() {
        Ok(re) => re,
        Err(e) => {
            tracing::error!("Archive link pattern failed to compile: {}", e);
            return Vec::new();
        }
    };

    re.captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str();
            let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

            let url = page_url.join(href).ok()?;
            let mut archive = match ArchiveRef::new(url.as_str(), None, None) {
                Ok(archive) => archive,
                Err(e) => {
                    tracing::debug!(href, error = %e, "Skipping archive link");
                    return None;
                }
            };

            if !text.is_empty() && text != archive.tar_name() && text != archive.file_name {
                archive.label = text.to_string();
            }
            if let Some(date) = date_from_file_name(&archive.file_name) {
                archive.date = date;
            }
            Some(archive)
        })
        .collect()
}

/// `20180915a_RGB` → `2018/09/15`
fn date_from_file_name(file_name: &str) -> Option<String> {
    let re = DATE_STAMP.as_ref().ok()?;
    let stamp = re.captures(file_name)?.get(1)?.as_str();
    psi_common::time::format_date_stamp(stamp)
}

/// Capitalize the first letter of every alphabetic run: `michael-2018` →
/// `Michael-2018`
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
