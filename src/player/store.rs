use std::sync::Arc;

use serde_json::json;
use tokio::sync::{broadcast, watch};

use super::api::StreamApi;
use super::types::{
    HlsConfig, PlayerAnalyticsEvent, PlayerError, PlayerEvent, PlayerEventType, PlayerState, QualityLevel,
    TimelineSegment, TimelineState,
};
use crate::blocks::ids;
use crate::error::{ApiError, Domain};
use crate::recovery::Resilience;

/// Playback state and hand-by-hand timeline navigation for one player.
///
/// Segment transitions driven by [`set_current_time`](Self::set_current_time)
/// are published as [`PlayerEvent`]s.
pub struct PlayerStore {
    api: Arc<dyn StreamApi>,
    resilience: Arc<Resilience>,
    state: watch::Sender<PlayerState>,
    events: broadcast::Sender<PlayerEvent>,
    hls: HlsConfig,
}

impl std::fmt::Debug for PlayerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerStore")
            .field("state", &*self.state.borrow())
            .field("hls", &self.hls)
            .finish_non_exhaustive()
    }
}

impl PlayerStore {
    pub fn new(api: Arc<dyn StreamApi>, resilience: Arc<Resilience>) -> Self {
        let (state, _) = watch::channel(PlayerState::default());
        let (events, _) = broadcast::channel(64);
        Self {
            api,
            resilience,
            state,
            events,
            hls: HlsConfig::default(),
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<PlayerState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn hls_config(&self) -> HlsConfig {
        self.hls
    }

    pub fn playlist_url(&self, content_id: i64) -> String {
        self.api.playlist_url(content_id)
    }

    /// Resolve the stream, qualities and timeline for a content.
    ///
    /// Only the stream URL is required; missing qualities or timeline are
    /// logged and leave those parts empty.
    pub async fn load(&self, content_id: i64) -> Result<(), ApiError> {
        self.state.send_modify(|state| {
            *state = PlayerState {
                content_id: Some(content_id),
                is_loading: true,
                volume: state.volume,
                is_muted: state.is_muted,
                quality: state.quality,
                ..PlayerState::default()
            };
        });

        let (url, qualities, segments) = tokio::join!(
            self.resilience
                .run(Domain::Stream, ids::STREAM_RESOLVE, || self.api.stream_url(content_id)),
            self.resilience
                .run(Domain::Stream, ids::STREAM_DELIVER, || self.api.quality_options(content_id)),
            self.resilience
                .run(Domain::Stream, ids::CONTENT_TIMELINE, || self.api.timeline_segments(content_id)),
        );

        let url = match url {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(content_id, error = %error, "Failed to resolve stream");
                self.set_error(Some(PlayerError::from(&error)));
                self.set_loading(false);
                return Err(error);
            }
        };
        let qualities = qualities.unwrap_or_else(|error| {
            tracing::warn!(content_id, error = %error, "Quality options unavailable");
            Vec::new()
        });
        let segments = segments.unwrap_or_else(|error| {
            tracing::warn!(content_id, error = %error, "Timeline unavailable");
            Vec::new()
        });

        tracing::debug!(content_id, segments = segments.len(), "Stream ready");
        self.state.send_modify(|state| {
            state.stream_url = Some(url);
            state.qualities = qualities;
            state.segments = segments;
            state.is_loading = false;
        });
        let now = self.state.borrow().current_time;
        self.update_current_segment(now);
        Ok(())
    }

    pub fn play(&self) {
        self.state.send_modify(|state| {
            state.is_playing = true;
            state.is_paused = false;
        });
    }

    pub fn pause(&self) {
        self.state.send_modify(|state| {
            state.is_playing = false;
            state.is_paused = true;
        });
    }

    /// Jump to `time`, clamped to `[0, duration]`.
    pub fn seek(&self, time: f64) {
        let duration = self.state.borrow().duration;
        self.set_current_time(time.max(0.0).min(duration));
    }

    /// Playback position report; updates the current segment and hand.
    pub fn set_current_time(&self, time: f64) {
        self.state.send_modify(|state| state.current_time = time);
        self.update_current_segment(time);
    }

    pub fn set_duration(&self, duration: f64) {
        self.state
            .send_modify(|state| state.duration = duration.max(0.0));
    }

    pub fn set_buffered(&self, buffered: f64) {
        self.state.send_modify(|state| state.buffered = buffered);
    }

    /// Clamp to `[0, 1]`; any audible volume un-mutes.
    pub fn set_volume(&self, volume: f64) {
        let volume = volume.max(0.0).min(1.0);
        self.state.send_modify(|state| {
            state.volume = volume;
            if volume > 0.0 {
                state.is_muted = false;
            }
        });
    }

    pub fn toggle_mute(&self) {
        self.state.send_modify(|state| state.is_muted = !state.is_muted);
    }

    pub fn set_quality(&self, quality: QualityLevel) {
        let changed = self.state.send_if_modified(|state| {
            let changed = state.quality != quality;
            state.quality = quality;
            changed
        });
        if changed {
            self.emit(PlayerEventType::QualityChange, Some(json!({ "quality": quality })));
        }
    }

    pub fn toggle_fullscreen(&self) {
        self.state
            .send_modify(|state| state.is_fullscreen = !state.is_fullscreen);
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.send_modify(|state| state.is_loading = loading);
    }

    pub fn set_error(&self, error: Option<PlayerError>) {
        if let Some(error) = &error {
            self.emit(
                PlayerEventType::Error,
                Some(json!({ "code": error.code, "message": error.message })),
            );
        }
        self.state.send_modify(|state| state.error = error);
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    pub fn set_segments(&self, segments: Vec<TimelineSegment>) {
        self.state.send_modify(|state| state.segments = segments);
        let now = self.state.borrow().current_time;
        self.update_current_segment(now);
    }

    pub fn hand_segments(&self) -> Vec<TimelineSegment> {
        self.state
            .borrow()
            .segments
            .iter()
            .filter(|segment| segment.is_hand())
            .cloned()
            .collect()
    }

    /// First hand starting strictly after `from`.
    pub fn find_next_hand(&self, from: f64) -> Option<TimelineSegment> {
        self.hand_segments()
            .into_iter()
            .find(|segment| segment.start_sec > from)
    }

    /// The hand before the one playing at `from`, or the last hand that
    /// ended at or before `from` when no later hand is playing.
    pub fn find_prev_hand(&self, from: f64) -> Option<TimelineSegment> {
        let hands = self.hand_segments();
        match hands.iter().position(|segment| segment.contains(from)) {
            Some(index) if index > 0 => Some(hands[index - 1].clone()),
            _ => hands
                .into_iter()
                .filter(|segment| segment.end_sec <= from)
                .last(),
        }
    }

    pub fn skip_to_next_hand(&self) -> Option<TimelineSegment> {
        let now = self.state.borrow().current_time;
        let next = self.find_next_hand(now)?;
        self.skip_to(&next);
        Some(next)
    }

    pub fn skip_to_prev_hand(&self) -> Option<TimelineSegment> {
        let now = self.state.borrow().current_time;
        let prev = self.find_prev_hand(now)?;
        self.skip_to(&prev);
        Some(prev)
    }

    /// S and A hands, announcing a highlights-only session.
    pub fn highlights_only(&self) -> Vec<TimelineSegment> {
        let highlights = self.timeline_state().highlight_hands;
        self.emit(
            PlayerEventType::HighlightsOnly,
            Some(json!({ "count": highlights.len() })),
        );
        highlights
    }

    pub fn timeline_state(&self) -> TimelineState {
        let state = self.state.borrow();
        TimelineState {
            segments: state.segments.clone(),
            current_segment: state.current_segment.clone(),
            current_hand: state.current_hand.clone(),
            total_hands: state.segments.iter().filter(|s| s.is_hand()).count(),
            highlight_hands: state
                .segments
                .iter()
                .filter(|s| s.is_highlight())
                .cloned()
                .collect(),
        }
    }

    /// Report a player event for analytics; dropped when signed out.
    pub async fn track(&self, event: PlayerEventType, error: Option<String>) {
        let payload = {
            let state = self.state.borrow();
            let Some(content_id) = state.content_id else {
                return;
            };
            PlayerAnalyticsEvent {
                content_id,
                event,
                position: Some(state.current_time),
                quality: Some(state.quality),
                error,
                timestamp: chrono::Utc::now().timestamp_millis(),
            }
        };
        self.api.track_event(&payload).await;
    }

    /// Back to an idle player. Volume and mute survive.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            *state = PlayerState {
                volume: state.volume,
                is_muted: state.is_muted,
                ..PlayerState::default()
            };
        });
    }

    fn skip_to(&self, segment: &TimelineSegment) {
        self.emit(
            PlayerEventType::SkipToHand,
            segment
                .hand
                .as_ref()
                .map(|hand| json!({ "handId": hand.id, "handNumber": hand.hand_number })),
        );
        self.seek(segment.start_sec);
    }

    fn update_current_segment(&self, time: f64) {
        let (previous, current) = {
            let state = self.state.borrow();
            let current = state
                .segments
                .iter()
                .find(|segment| segment.contains(time))
                .cloned();
            (state.current_segment.clone(), current)
        };
        if previous == current {
            return;
        }

        if let Some(hand) = previous.as_ref().and_then(|s| s.hand.as_ref().filter(|_| s.is_hand())) {
            self.emit(PlayerEventType::HandLeave, Some(json!({ "handId": hand.id })));
        }
        match &current {
            Some(segment) if segment.is_hand() => {
                let data = segment
                    .hand
                    .as_ref()
                    .map(|hand| json!({ "handId": hand.id, "grade": hand.grade }));
                self.emit(PlayerEventType::HandEnter, data);
            }
            Some(segment) => {
                self.emit(
                    PlayerEventType::NonHandSegment,
                    Some(json!({ "type": segment.segment_type })),
                );
            }
            None => {}
        }

        self.state.send_modify(|state| {
            state.current_hand = current
                .as_ref()
                .filter(|segment| segment.is_hand())
                .and_then(|segment| segment.hand.clone());
            state.current_segment = current;
        });
    }

    fn emit(&self, event_type: PlayerEventType, data: Option<serde_json::Value>) {
        // No subscribers is fine.
        let _ = self.events.send(PlayerEvent::now(event_type, data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::content::HandGrade;
    use crate::error::ErrorCode;
    use crate::player::types::{HandInfo, QualityOption, SegmentType};
    use crate::recovery::{CircuitBreakerConfig, RetrySettings};

    fn hand(start: f64, end: f64, id: i64, grade: HandGrade) -> TimelineSegment {
        TimelineSegment {
            segment_type: SegmentType::Hand,
            start_sec: start,
            end_sec: end,
            hand: Some(HandInfo {
                id,
                hand_number: id as u32,
                grade,
                players: Vec::new(),
                pot_size: None,
            }),
        }
    }

    fn gap(segment_type: SegmentType, start: f64, end: f64) -> TimelineSegment {
        TimelineSegment {
            segment_type,
            start_sec: start,
            end_sec: end,
            hand: None,
        }
    }

    fn timeline() -> Vec<TimelineSegment> {
        vec![
            gap(SegmentType::Intro, 0.0, 10.0),
            hand(10.0, 20.0, 1, HandGrade::S),
            gap(SegmentType::Shuffle, 20.0, 30.0),
            hand(30.0, 40.0, 2, HandGrade::C),
            hand(40.0, 50.0, 3, HandGrade::A),
        ]
    }

    #[derive(Default)]
    struct StubStreamApi {
        fail_url: bool,
        tracked: Mutex<Vec<PlayerAnalyticsEvent>>,
    }

    #[async_trait]
    impl StreamApi for StubStreamApi {
        async fn stream_url(&self, content_id: i64) -> Result<String, ApiError> {
            if self.fail_url {
                return Err(ApiError::from_response(Domain::Stream, 404, ""));
            }
            Ok(format!("https://cdn.example/{content_id}/master.m3u8"))
        }

        async fn quality_options(&self, _content_id: i64) -> Result<Vec<QualityOption>, ApiError> {
            Err(ApiError::from_response(Domain::Stream, 403, ""))
        }

        async fn timeline_segments(&self, _content_id: i64) -> Result<Vec<TimelineSegment>, ApiError> {
            Ok(timeline())
        }

        fn playlist_url(&self, content_id: i64) -> String {
            format!("/api/v1/stream/{content_id}/playlist.m3u8")
        }

        async fn track_event(&self, event: &PlayerAnalyticsEvent) {
            self.tracked.lock().unwrap().push(event.clone());
        }
    }

    fn store(api: StubStreamApi) -> (PlayerStore, Arc<StubStreamApi>) {
        let api = Arc::new(api);
        let resilience = Arc::new(Resilience::new(
            CircuitBreakerConfig::default(),
            RetrySettings {
                enabled: false,
                ..RetrySettings::default()
            },
        ));
        (PlayerStore::new(api.clone(), resilience), api)
    }

    fn hand_id(segment: Option<TimelineSegment>) -> Option<i64> {
        segment.and_then(|s| s.hand).map(|h| h.id)
    }

    #[tokio::test]
    async fn load_tolerates_missing_qualities() {
        let (store, _) = store(StubStreamApi::default());
        store.load(5).await.unwrap();
        let state = store.state();
        assert_eq!(state.stream_url.as_deref(), Some("https://cdn.example/5/master.m3u8"));
        assert!(state.qualities.is_empty());
        assert_eq!(state.segments.len(), 5);
        assert_eq!(state.current_segment.map(|s| s.segment_type), Some(SegmentType::Intro));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn unresolvable_stream_sets_player_error() {
        let (store, _) = store(StubStreamApi {
            fail_url: true,
            ..StubStreamApi::default()
        });
        let mut events = store.subscribe();
        let err = store.load(5).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PlayerSourceError);
        let state = store.state();
        assert_eq!(state.error.map(|e| e.code), Some(ErrorCode::PlayerSourceError));
        assert!(!state.is_loading);
        assert_eq!(events.try_recv().unwrap().event_type, PlayerEventType::Error);
    }

    #[test]
    fn seek_and_volume_are_clamped() {
        let (store, _) = store(StubStreamApi::default());
        store.set_duration(100.0);
        store.seek(150.0);
        assert_eq!(store.state().current_time, 100.0);
        store.seek(-5.0);
        assert_eq!(store.state().current_time, 0.0);

        store.toggle_mute();
        store.set_volume(1.7);
        let state = store.state();
        assert_eq!(state.volume, 1.0);
        assert!(!state.is_muted);

        store.toggle_mute();
        store.set_volume(0.0);
        assert!(store.state().is_muted);
    }

    #[test]
    fn current_time_tracks_segments_and_emits_transitions() {
        let (store, _) = store(StubStreamApi::default());
        store.set_segments(timeline());
        let mut events = store.subscribe();

        store.set_current_time(12.0);
        assert_eq!(store.state().current_hand.map(|h| h.id), Some(1));
        store.set_current_time(15.0);
        store.set_current_time(25.0);
        assert!(store.state().current_hand.is_none());

        let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|event| event.event_type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                PlayerEventType::HandEnter,
                PlayerEventType::HandLeave,
                PlayerEventType::NonHandSegment,
            ]
        );
    }

    #[test]
    fn hand_navigation() {
        let (store, _) = store(StubStreamApi::default());
        store.set_segments(timeline());
        store.set_duration(60.0);

        assert_eq!(hand_id(store.find_next_hand(0.0)), Some(1));
        assert_eq!(hand_id(store.find_next_hand(10.0)), Some(2));
        assert_eq!(hand_id(store.find_prev_hand(45.0)), Some(2));
        assert_eq!(hand_id(store.find_prev_hand(25.0)), Some(1));
        assert_eq!(hand_id(store.find_prev_hand(15.0)), None);
        assert_eq!(hand_id(store.find_next_hand(45.0)), None);

        store.set_current_time(22.0);
        assert_eq!(hand_id(store.skip_to_next_hand()), Some(2));
        assert_eq!(store.state().current_time, 30.0);
        assert_eq!(hand_id(store.skip_to_prev_hand()), Some(1));
        assert_eq!(store.state().current_time, 10.0);
    }

    #[test]
    fn timeline_counts_hands_and_highlights() {
        let (store, _) = store(StubStreamApi::default());
        store.set_segments(timeline());
        let timeline = store.timeline_state();
        assert_eq!(timeline.total_hands, 3);
        assert_eq!(
            timeline.highlight_hands.iter().filter_map(|s| s.hand.as_ref()).map(|h| h.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn reset_keeps_volume_and_mute() {
        let (store, _) = store(StubStreamApi::default());
        store.set_volume(0.4);
        store.toggle_mute();
        store.set_quality(QualityLevel::P720);
        store.play();
        store.reset();

        let state = store.state();
        assert_eq!(state.volume, 0.4);
        assert!(state.is_muted);
        assert_eq!(state.quality, QualityLevel::Auto);
        assert!(state.is_paused);
    }

    #[tokio::test]
    async fn track_requires_a_loaded_content() {
        let (store, api) = store(StubStreamApi::default());
        store.track(PlayerEventType::QualityChange, None).await;
        assert!(api.tracked.lock().unwrap().is_empty());

        store.load(8).await.unwrap();
        store.track(PlayerEventType::QualityChange, None).await;
        assert_eq!(api.tracked.lock().unwrap()[0].content_id, 8);
    }
}
