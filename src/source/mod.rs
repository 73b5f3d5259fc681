//! Outlook data collaborators.
//!
//! - **spc**: `SpcClient`, the HTTP-backed [`OutlookSource`]
//! - **image**: [`ImageRenderer`] implementations turning map images into
//!   something a panel can display (inline escapes or half-block text)
//!
//! The viewer only needs three things from the outside world: the list of
//! outlooks issued on a day, one outlook's text and map URL, and the map
//! image bytes. Everything else is rendering.

pub mod image;
pub mod spc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

pub use self::image::{ImageRenderer, MapDisplay};
pub use self::spc::SpcClient;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("invalid URL: {0}")]
    Url(String),

    #[error("no data: {0}")]
    DataUnavailable(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// One convective outlook document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outlook {
    /// Text discussion
    pub text: String,
    /// Absolute URL of the categorical outlook map, empty if the page has none
    pub image_url: String,
}

/// Where outlooks come from
#[async_trait]
pub trait OutlookSource: Send + Sync {
    /// Identifiers of every outlook issued on `date`, oldest first
    async fn list_outlooks(&self, date: NaiveDate) -> Result<Vec<String>>;

    /// Fetch one outlook by identifier
    async fn fetch_outlook(&self, id: &str) -> Result<Outlook>;

    /// Fetch raw image bytes
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// File name part of an identifier
fn file_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Category key: the file name up to its first `_` (`day1otlk`)
pub fn category(id: &str) -> &str {
    let name = file_name(id);
    name.split('_').next().unwrap_or(name)
}

/// Keep the last identifier of each run of same-category identifiers.
///
/// Listings are ordered by issue time within a day, so this leaves the most
/// recent issuance per outlook day.
pub fn latest_per_category(ids: &[String]) -> Vec<String> {
    let mut latest: Vec<String> = Vec::new();
    for id in ids {
        if let Some(last) = latest.last_mut() {
            if category(last) == category(id) {
                *last = id.clone();
                continue;
            }
        }
        latest.push(id.clone());
    }
    latest
}

/// Menu label for an identifier: `day1otlk_0100.html` → `day 1`
pub fn menu_label(id: &str) -> String {
    category(id).replacen("day", "day ", 1).replacen("otlk", "", 1)
}

/// Day menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub id: String,
    pub label: String,
}

/// Collapse a listing to one entry per day, dropping unlabeled ones
pub fn menu_entries(ids: &[String]) -> Vec<MenuEntry> {
    latest_per_category(ids)
        .into_iter()
        .map(|id| MenuEntry {
            label: menu_label(&id),
            id,
        })
        .filter(|entry| !entry.label.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_latest_per_category() {
        let listing = ids(&["day1_a", "day1_b", "day2_a"]);
        assert_eq!(latest_per_category(&listing), ids(&["day1_b", "day2_a"]));
    }

    #[test]
    fn test_latest_per_category_runs() {
        // Only consecutive duplicates collapse
        let listing = ids(&["day1_a", "day2_a", "day1_b"]);
        assert_eq!(latest_per_category(&listing), listing);
        assert!(latest_per_category(&[]).is_empty());
    }

    #[test]
    fn test_category_uses_file_name() {
        let id = "/products/outlook/archive/2024/day1otlk_20240501_0100.html";
        assert_eq!(category(id), "day1otlk");
        assert_eq!(category("day3otlk"), "day3otlk");
    }

    #[test]
    fn test_menu_label() {
        assert_eq!(menu_label("archive/2024/day1otlk_20240501_1300.html"), "day 1");
        assert_eq!(menu_label("day4-8_20240501.html"), "day 4-8");
        assert_eq!(menu_label("_20240501.html"), "");
    }

    #[test]
    fn test_menu_entries() {
        let listing = ids(&[
            "a/day1otlk_20240501_0100.html",
            "a/day1otlk_20240501_1300.html",
            "a/day2otlk_20240501_0600.html",
            "a/_orphan.html",
        ]);
        let entries = menu_entries(&listing);
        assert_eq!(
            entries,
            vec![
                MenuEntry {
                    id: "a/day1otlk_20240501_1300.html".to_string(),
                    label: "day 1".to_string(),
                },
                MenuEntry {
                    id: "a/day2otlk_20240501_0600.html".to_string(),
                    label: "day 2".to_string(),
                },
            ]
        );
    }
}
