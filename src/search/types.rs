//! Search query, result and suggestion types.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::content::HandGrade;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOption {
    Relevance,
    Date,
    Episode,
    Popular,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_grade: Option<Vec<HandGrade>>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_hands: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u32>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self == &SearchFilters::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[builder(into)]
    pub q: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOption>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self::builder().q(q).build()
    }

    /// Flat `GET /search` parameters. Zero pages, limits and durations are
    /// omitted; grades are comma-joined.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.q.clone())];
        if let Some(page) = self.page.filter(|page| *page > 0) {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("sort", sort.to_string()));
        }
        let Some(filters) = &self.filters else {
            return params;
        };
        if let Some(catalog_id) = filters.catalog_id.as_ref().filter(|id| !id.is_empty()) {
            params.push(("catalogId", catalog_id.clone()));
        }
        if let Some(grades) = &filters.hand_grade {
            let joined = grades
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("handGrade", joined));
        }
        if let Some(season) = filters.season.as_ref().filter(|season| !season.is_empty()) {
            params.push(("season", season.clone()));
        }
        if let Some(has_hands) = filters.has_hands {
            params.push(("hasHands", has_hands.to_string()));
        }
        if let Some(min) = filters.min_duration.filter(|min| *min > 0) {
            params.push(("minDuration", min.to_string()));
        }
        if let Some(max) = filters.max_duration.filter(|max| *max > 0) {
            params.push(("maxDuration", max.to_string()));
        }
        params
    }

    /// Key under which the last good result is kept.
    pub fn cache_key(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("search:{json}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHighlight {
    pub field: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
    pub catalog_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub duration_sec: u32,
    pub hand_count: u32,
    #[serde(default)]
    pub highlights: Vec<SearchHighlight>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub label: String,
    pub count: u64,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub field: String,
    pub label: String,
    pub values: Vec<FacetValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    pub total_hits: u64,
    pub page: u32,
    pub total_pages: u32,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub facets: Vec<Facet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestQuery {
    pub q: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SuggestionType {
    Query,
    Player,
    Content,
    Catalog,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub highlight: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SuggestionMetadata>,
}

/// Observable search state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub filters: SearchFilters,
    pub results: Vec<SearchHit>,
    pub facets: Vec<Facet>,
    pub suggestions: Vec<Suggestion>,
    pub total_hits: u64,
    pub page: u32,
    pub is_loading: bool,
    pub is_suggest_loading: bool,
    pub error: Option<ApiError>,
    pub recent_searches: Vec<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            results: Vec::new(),
            facets: Vec::new(),
            suggestions: Vec::new(),
            total_hits: 0,
            page: 1,
            is_loading: false,
            is_suggest_loading: false,
            error: None,
            recent_searches: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn params_flatten_filters() {
        let query = SearchQuery::builder()
            .q("phil ivey")
            .page(2)
            .limit(0)
            .sort(SortOption::Date)
            .filters(
                SearchFilters::builder()
                    .catalog_id("wsop")
                    .hand_grade(vec![HandGrade::S, HandGrade::A])
                    .has_hands(false)
                    .min_duration(0)
                    .build(),
            )
            .build();

        let expected: Vec<(&str, String)> = [
            ("q", "phil ivey"),
            ("page", "2"),
            ("sort", "date"),
            ("catalogId", "wsop"),
            ("handGrade", "S,A"),
            ("hasHands", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect();
        assert_eq!(query.to_params(), expected);
    }

    #[test]
    fn suggestion_wire_shape() {
        let suggestion: Suggestion = serde_json::from_str(
            r#"{"text":"Phil Ivey","type":"player","highlight":"<mark>Phil</mark> Ivey","metadata":{"contentId":3}}"#,
        )
        .unwrap();
        assert_eq!(suggestion.suggestion_type, SuggestionType::Player);
        assert_eq!(suggestion.metadata.and_then(|m| m.content_id), Some(3));
    }
}
