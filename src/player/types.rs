//! Playback, quality and timeline types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::content::HandGrade;
use crate::error::{ApiError, ErrorCode};
use crate::recovery;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum QualityLevel {
    #[default]
    #[serde(rename = "auto")]
    #[strum(serialize = "auto")]
    Auto,
    #[serde(rename = "1080p")]
    #[strum(serialize = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    #[strum(serialize = "720p")]
    P720,
    #[serde(rename = "480p")]
    #[strum(serialize = "480p")]
    P480,
    #[serde(rename = "360p")]
    #[strum(serialize = "360p")]
    P360,
}

impl QualityLevel {
    pub fn label(self) -> &'static str {
        match self {
            QualityLevel::Auto => "Auto",
            QualityLevel::P1080 => "1080p HD",
            QualityLevel::P720 => "720p HD",
            QualityLevel::P480 => "480p",
            QualityLevel::P360 => "360p",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityOption {
    pub level: QualityLevel,
    pub label: String,
    pub bitrate: u64,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SegmentType {
    Hand,
    Shuffle,
    Break,
    Intro,
    Outro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandInfo {
    pub id: i64,
    pub hand_number: u32,
    pub grade: HandGrade,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pot_size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSegment {
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<HandInfo>,
}

impl TimelineSegment {
    pub fn is_hand(&self) -> bool {
        self.segment_type == SegmentType::Hand
    }

    /// Half-open: `start <= time < end`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_sec && time < self.end_sec
    }

    /// A hand segment graded S or A.
    pub fn is_highlight(&self) -> bool {
        self.is_hand()
            && self
                .hand
                .as_ref()
                .is_some_and(|hand| hand.grade.is_highlight())
    }
}

/// Derived view of the loaded timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineState {
    pub segments: Vec<TimelineSegment>,
    pub current_segment: Option<TimelineSegment>,
    pub current_hand: Option<HandInfo>,
    pub total_hands: usize,
    pub highlight_hands: Vec<TimelineSegment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlayerEventType {
    HandEnter,
    HandLeave,
    NonHandSegment,
    SkipToHand,
    HighlightsOnly,
    QualityChange,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvent {
    #[serde(rename = "type")]
    pub event_type: PlayerEventType,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl PlayerEvent {
    pub fn now(event_type: PlayerEventType, data: Option<serde_json::Value>) -> Self {
        Self {
            event_type,
            timestamp: chrono::Utc::now().timestamp_millis(),
            data,
        }
    }
}

/// Body of `POST /analytics/player`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnalyticsEvent {
    pub content_id: i64,
    pub event: PlayerEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
}

/// hls.js tuning handed to the video element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HlsConfig {
    pub max_buffer_length: u32,
    pub max_max_buffer_length: u32,
    /// `-1` lets the player choose.
    pub start_level: i32,
    pub cap_level_to_player_size: bool,
    pub progressive: bool,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            max_buffer_length: 30,
            max_max_buffer_length: 60,
            start_level: -1,
            cap_level_to_player_size: true,
            progressive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl From<&ApiError> for PlayerError {
    fn from(error: &ApiError) -> Self {
        Self {
            code: error.code,
            message: error.message.clone(),
            recoverable: recovery::lookup(error.code).recoverable,
        }
    }
}

/// Observable playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub content_id: Option<i64>,
    pub stream_url: Option<String>,
    pub qualities: Vec<QualityOption>,
    pub is_playing: bool,
    pub is_paused: bool,
    pub current_time: f64,
    pub duration: f64,
    pub buffered: f64,
    pub volume: f64,
    pub is_muted: bool,
    pub quality: QualityLevel,
    pub is_fullscreen: bool,
    pub is_loading: bool,
    pub error: Option<PlayerError>,
    pub segments: Vec<TimelineSegment>,
    pub current_segment: Option<TimelineSegment>,
    pub current_hand: Option<HandInfo>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            content_id: None,
            stream_url: None,
            qualities: Vec::new(),
            is_playing: false,
            is_paused: true,
            current_time: 0.0,
            duration: 0.0,
            buffered: 0.0,
            volume: 1.0,
            is_muted: false,
            quality: QualityLevel::Auto,
            is_fullscreen: false,
            is_loading: false,
            error: None,
            segments: Vec::new(),
            current_segment: None,
            current_hand: None,
        }
    }
}

/// Starting quality for a connection (`4g`, `3g`, ...) and data-saver flag.
pub fn initial_quality(connection_type: Option<&str>, save_data: bool) -> QualityLevel {
    if save_data {
        return QualityLevel::P480;
    }
    match connection_type {
        Some("3g" | "2g" | "slow-2g") => QualityLevel::P480,
        _ => QualityLevel::Auto,
    }
}
