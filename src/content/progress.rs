//! Watch-progress autosave for a single content.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::api::ContentApi;
use super::types::{WatchProgress, WatchProgressUpdate};
use crate::util::Debouncer;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
    pub progress: Option<WatchProgress>,
    pub is_saving: bool,
}

/// Loads and persists playback position for one content.
///
/// [`save`](Self::save) is debounced: while playback keeps reporting
/// positions only the last one within the quiet interval reaches the server.
#[derive(Clone)]
pub struct WatchProgressTracker {
    api: Arc<dyn ContentApi>,
    content_id: i64,
    debouncer: Debouncer,
    state: Arc<watch::Sender<ProgressState>>,
}

impl std::fmt::Debug for WatchProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchProgressTracker")
            .field("content_id", &self.content_id)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

impl WatchProgressTracker {
    pub fn new(api: Arc<dyn ContentApi>, content_id: i64, debounce: Duration) -> Self {
        let (state, _) = watch::channel(ProgressState::default());
        Self {
            api,
            content_id,
            debouncer: Debouncer::new(debounce),
            state: Arc::new(state),
        }
    }

    pub fn content_id(&self) -> i64 {
        self.content_id
    }

    pub fn state(&self) -> ProgressState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ProgressState> {
        self.state.subscribe()
    }

    /// Fetch the stored position. Signed-out users, unwatched content and
    /// failures all read as `None`.
    pub async fn load(&self) -> Option<WatchProgress> {
        let progress = match self.api.fetch_watch_progress(self.content_id).await {
            Ok(progress) => progress,
            Err(error) => {
                tracing::warn!(content_id = self.content_id, error = %error, "Failed to load watch progress");
                None
            }
        };
        self.state
            .send_modify(|state| state.progress = progress.clone());
        progress
    }

    /// Schedule a save once playback has been quiet for the debounce interval.
    ///
    /// The handle resolves to whether this particular call was the one saved.
    pub fn save(&self, progress_sec: f64, duration_sec: f64) -> JoinHandle<bool> {
        let update = self.update(progress_sec, duration_sec);
        let api = self.api.clone();
        let state = self.state.clone();
        self.debouncer
            .call(async move { persist(api.as_ref(), &state, update).await })
    }

    /// Cancel any pending save and write now, e.g. when leaving the player.
    pub async fn save_immediately(&self, progress_sec: f64, duration_sec: f64) {
        self.debouncer.cancel();
        let update = self.update(progress_sec, duration_sec);
        persist(self.api.as_ref(), &self.state, update).await;
    }

    /// Position to resume from, `0` when nothing is stored.
    pub fn resume_position(&self) -> f64 {
        self.state
            .borrow()
            .progress
            .as_ref()
            .map_or(0.0, |progress| progress.progress_sec)
    }

    pub fn is_completed(&self) -> bool {
        self.state
            .borrow()
            .progress
            .as_ref()
            .is_some_and(|progress| progress.completed)
    }

    fn update(&self, progress_sec: f64, duration_sec: f64) -> WatchProgressUpdate {
        WatchProgressUpdate {
            content_id: self.content_id,
            progress_sec,
            duration_sec,
        }
    }
}

async fn persist(api: &dyn ContentApi, state: &watch::Sender<ProgressState>, update: WatchProgressUpdate) {
    state.send_modify(|state| state.is_saving = true);
    let saved = match api.save_watch_progress(&update).await {
        Ok(progress) => Some(progress),
        Err(error) => {
            tracing::warn!(content_id = update.content_id, error = %error, "Failed to save watch progress");
            None
        }
    };
    state.send_modify(|state| {
        state.is_saving = false;
        if saved.is_some() {
            state.progress = saved;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::content::types::{
        Catalog, ContentDetail, ContentListResult, ContentQuery, Hand, HandGrade,
    };
    use crate::error::{ApiError, Domain};

    #[derive(Default)]
    struct RecordingApi {
        saved: Mutex<Vec<f64>>,
        stored: Option<WatchProgress>,
    }

    fn unsupported<T>() -> Result<T, ApiError> {
        Err(ApiError::from_response(Domain::Content, 501, ""))
    }

    #[async_trait]
    impl ContentApi for RecordingApi {
        async fn fetch_contents(&self, _query: &ContentQuery) -> Result<ContentListResult, ApiError> {
            unsupported()
        }
        async fn fetch_content_detail(&self, _id: i64) -> Result<ContentDetail, ApiError> {
            unsupported()
        }
        async fn fetch_hands(&self, _id: i64, _grades: &[HandGrade]) -> Result<Vec<Hand>, ApiError> {
            unsupported()
        }
        async fn fetch_catalogs(&self) -> Result<Vec<Catalog>, ApiError> {
            unsupported()
        }
        async fn fetch_catalog(&self, _id: &str) -> Result<Catalog, ApiError> {
            unsupported()
        }
        async fn fetch_watch_progress(&self, _id: i64) -> Result<Option<WatchProgress>, ApiError> {
            Ok(self.stored.clone())
        }
        async fn save_watch_progress(&self, update: &WatchProgressUpdate) -> Result<WatchProgress, ApiError> {
            self.saved.lock().unwrap().push(update.progress_sec);
            Ok(WatchProgress {
                content_id: update.content_id,
                user_id: 1,
                progress_sec: update.progress_sec,
                duration_sec: update.duration_sec,
                completed: update.progress_sec >= update.duration_sec,
                last_watched_at: "2024-01-01T00:00:00Z".to_string(),
            })
        }
        async fn fetch_all_watch_progress(&self) -> Result<Vec<WatchProgress>, ApiError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_saves_collapse_to_the_last_position() {
        let api = Arc::new(RecordingApi::default());
        let tracker = WatchProgressTracker::new(api.clone(), 9, Duration::from_secs(5));

        let handles: Vec<_> = [10.0, 20.0, 30.0]
            .into_iter()
            .map(|position| tracker.save(position, 100.0))
            .collect();
        let mut ran = Vec::new();
        for handle in handles {
            ran.push(handle.await.unwrap());
        }

        assert_eq!(ran, vec![false, false, true]);
        assert_eq!(*api.saved.lock().unwrap(), vec![30.0]);
        assert_eq!(tracker.resume_position(), 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn save_immediately_cancels_the_pending_save() {
        let api = Arc::new(RecordingApi::default());
        let tracker = WatchProgressTracker::new(api.clone(), 9, Duration::from_secs(5));

        let pending = tracker.save(10.0, 100.0);
        tracker.save_immediately(100.0, 100.0).await;

        assert!(!pending.await.unwrap());
        assert_eq!(*api.saved.lock().unwrap(), vec![100.0]);
        assert!(tracker.is_completed());
    }

    #[tokio::test]
    async fn missing_progress_resumes_from_start() {
        let tracker = WatchProgressTracker::new(Arc::new(RecordingApi::default()), 9, Duration::from_secs(5));
        assert!(tracker.load().await.is_none());
        assert_eq!(tracker.resume_position(), 0.0);
        assert!(!tracker.is_completed());
    }
}
