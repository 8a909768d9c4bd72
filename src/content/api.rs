//! Content, catalog and watch-progress endpoints.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{
    Catalog, ContentDetail, ContentListResult, ContentQuery, Hand, HandGrade, WatchProgress,
    WatchProgressUpdate,
};
use crate::client::ApiClient;
use crate::error::{ApiError, Domain};

/// Backend operations the content store depends on.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn fetch_contents(&self, query: &ContentQuery) -> Result<ContentListResult, ApiError>;
    async fn fetch_content_detail(&self, id: i64) -> Result<ContentDetail, ApiError>;
    /// Hands for a content, optionally restricted to `grades`.
    async fn fetch_hands(&self, content_id: i64, grades: &[HandGrade]) -> Result<Vec<Hand>, ApiError>;
    async fn fetch_catalogs(&self) -> Result<Vec<Catalog>, ApiError>;
    async fn fetch_catalog(&self, id: &str) -> Result<Catalog, ApiError>;
    /// `None` when signed out or when nothing has been watched yet.
    async fn fetch_watch_progress(&self, content_id: i64) -> Result<Option<WatchProgress>, ApiError>;
    async fn save_watch_progress(&self, update: &WatchProgressUpdate) -> Result<WatchProgress, ApiError>;
    /// Empty when signed out.
    async fn fetch_all_watch_progress(&self) -> Result<Vec<WatchProgress>, ApiError>;
}

/// [`ContentApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    client: Arc<ApiClient>,
}

impl HttpContentApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    fn signed_in(&self) -> bool {
        self.client.tokens().access_token().is_some()
    }
}

/// `S,A` style grade list for the `grades` query parameter.
pub fn grades_param(grades: &[HandGrade]) -> Option<String> {
    if grades.is_empty() {
        return None;
    }
    Some(
        grades
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    )
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn fetch_contents(&self, query: &ContentQuery) -> Result<ContentListResult, ApiError> {
        self.client
            .get_with_query(Domain::Content, "/contents", Some(query))
            .await
    }

    async fn fetch_content_detail(&self, id: i64) -> Result<ContentDetail, ApiError> {
        self.client
            .get(Domain::Content, &format!("/contents/{id}"))
            .await
    }

    async fn fetch_hands(&self, content_id: i64, grades: &[HandGrade]) -> Result<Vec<Hand>, ApiError> {
        let endpoint = format!("/contents/{content_id}/hands");
        match grades_param(grades) {
            Some(grades) => {
                self.client
                    .get_with_query(Domain::Content, &endpoint, Some(&[("grades", grades)]))
                    .await
            }
            None => self.client.get(Domain::Content, &endpoint).await,
        }
    }

    async fn fetch_catalogs(&self) -> Result<Vec<Catalog>, ApiError> {
        self.client.get(Domain::Content, "/catalogs").await
    }

    async fn fetch_catalog(&self, id: &str) -> Result<Catalog, ApiError> {
        self.client
            .get(Domain::Content, &format!("/catalogs/{id}"))
            .await
    }

    async fn fetch_watch_progress(&self, content_id: i64) -> Result<Option<WatchProgress>, ApiError> {
        if !self.signed_in() {
            return Ok(None);
        }
        match self
            .client
            .get(Domain::Content, &format!("/progress/{content_id}"))
            .await
        {
            Ok(progress) => Ok(Some(progress)),
            Err(error) if error.status() == Some(404) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn save_watch_progress(&self, update: &WatchProgressUpdate) -> Result<WatchProgress, ApiError> {
        self.client.post(Domain::Content, "/progress", update).await
    }

    async fn fetch_all_watch_progress(&self) -> Result<Vec<WatchProgress>, ApiError> {
        if !self.signed_in() {
            return Ok(Vec::new());
        }
        self.client.get(Domain::Content, "/progress").await
    }
}
