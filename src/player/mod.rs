//! Stream resolution, playback state and timeline navigation.

pub mod api;
pub mod store;
pub mod types;

pub use api::{HttpStreamApi, StreamApi};
pub use store::PlayerStore;
pub use types::{
    initial_quality, HandInfo, HlsConfig, PlayerAnalyticsEvent, PlayerError, PlayerEvent, PlayerEventType,
    PlayerState, QualityLevel, QualityOption, SegmentType, TimelineSegment, TimelineState,
};
