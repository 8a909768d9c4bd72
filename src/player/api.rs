use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::types::{PlayerAnalyticsEvent, QualityOption, TimelineSegment};
use crate::client::ApiClient;
use crate::error::{ApiError, Domain};

/// Stream resolution, quality and timeline endpoints.
#[async_trait]
pub trait StreamApi: Send + Sync {
    /// HLS master URL for a content.
    async fn stream_url(&self, content_id: i64) -> Result<String, ApiError>;
    async fn quality_options(&self, content_id: i64) -> Result<Vec<QualityOption>, ApiError>;
    async fn timeline_segments(&self, content_id: i64) -> Result<Vec<TimelineSegment>, ApiError>;
    /// Direct playlist URL; no request is made.
    fn playlist_url(&self, content_id: i64) -> String;
    /// Best-effort analytics. Never fails.
    async fn track_event(&self, event: &PlayerAnalyticsEvent);
}

#[derive(Debug, Deserialize)]
struct StreamUrl {
    url: String,
}

#[derive(Debug, Clone)]
pub struct HttpStreamApi {
    client: Arc<ApiClient>,
}

impl HttpStreamApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamApi for HttpStreamApi {
    async fn stream_url(&self, content_id: i64) -> Result<String, ApiError> {
        let body: StreamUrl = self
            .client
            .get(Domain::Stream, &format!("/stream/{content_id}"))
            .await?;
        Ok(body.url)
    }

    async fn quality_options(&self, content_id: i64) -> Result<Vec<QualityOption>, ApiError> {
        self.client
            .get(Domain::Stream, &format!("/stream/{content_id}/qualities"))
            .await
    }

    async fn timeline_segments(&self, content_id: i64) -> Result<Vec<TimelineSegment>, ApiError> {
        self.client
            .get(Domain::Stream, &format!("/contents/{content_id}/timeline"))
            .await
    }

    fn playlist_url(&self, content_id: i64) -> String {
        self.client
            .url(&format!("/stream/{content_id}/playlist.m3u8"))
    }

    async fn track_event(&self, event: &PlayerAnalyticsEvent) {
        if self.client.tokens().access_token().is_none() {
            return;
        }
        if let Err(error) = self
            .client
            .post_unit(Domain::Stream, "/analytics/player", Some(event))
            .await
        {
            tracing::warn!(content_id = event.content_id, error = %error, "Dropped player analytics event");
        }
    }
}
