//! Content, catalog, hand and watch-progress types.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: i64,
    pub catalog_id: String,
    pub catalog_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    pub file_id: i64,
    pub duration_sec: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub hand_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetail {
    #[serde(flatten)]
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub hands: Vec<Hand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_contents: Option<Vec<ContentPreview>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPreview {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub duration_sec: u32,
}

/// Hand quality grade, `S` best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum HandGrade {
    S,
    A,
    B,
    C,
}

impl HandGrade {
    pub fn label(self) -> &'static str {
        match self {
            HandGrade::S => "Legend",
            HandGrade::A => "Highlight",
            HandGrade::B => "Standard",
            HandGrade::C => "Basic",
        }
    }

    /// Display color as a hex string.
    pub fn color(self) -> &'static str {
        match self {
            HandGrade::S => "#f59e0b",
            HandGrade::A => "#3b82f6",
            HandGrade::B => "#22c55e",
            HandGrade::C => "#64748b",
        }
    }

    /// S and A hands are highlights.
    pub fn is_highlight(self) -> bool {
        matches!(self, HandGrade::S | HandGrade::A)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hand {
    pub id: i64,
    pub content_id: i64,
    pub hand_number: u32,
    pub grade: HandGrade,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pot_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: i64,
    pub catalog_id: String,
    pub episode: u32,
    pub title: String,
    pub content_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub episode_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContentSortOption {
    Recent,
    Episode,
    Popular,
    Hands,
}

/// Filters and paging for the content list.
///
/// Field order is part of the cache key (`contents:<json>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<ContentSortOption>,
}

impl ContentQuery {
    pub fn cache_key(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("contents:{json}")
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentListResult {
    pub items: Vec<Content>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgress {
    pub content_id: i64,
    pub user_id: i64,
    pub progress_sec: f64,
    pub duration_sec: f64,
    pub completed: bool,
    pub last_watched_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgressUpdate {
    pub content_id: i64,
    pub progress_sec: f64,
    pub duration_sec: f64,
}

/// Observable content-browsing state.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentState {
    pub contents: Vec<Content>,
    pub selected_content: Option<ContentDetail>,
    pub hands: Vec<Hand>,
    pub catalogs: Vec<Catalog>,
    pub selected_catalog: Option<Catalog>,
    pub is_loading: bool,
    pub is_detail_loading: bool,
    pub error: Option<ApiError>,
    pub page: u32,
    pub has_more: bool,
    pub query: ContentQuery,
}

impl Default for ContentState {
    fn default() -> Self {
        Self {
            contents: Vec::new(),
            selected_content: None,
            hands: Vec::new(),
            catalogs: Vec::new(),
            selected_catalog: None,
            is_loading: false,
            is_detail_loading: false,
            error: None,
            page: 1,
            has_more: true,
            query: ContentQuery::default(),
        }
    }
}
