//! Content catalog browsing, hands and watch progress.

pub mod api;
pub mod helpers;
pub mod progress;
pub mod store;
pub mod types;

pub use api::{ContentApi, HttpContentApi};
pub use helpers::{filter_by_grade, sort_contents};
pub use progress::{ProgressState, WatchProgressTracker};
pub use store::ContentStore;
pub use types::{
    Catalog, Content, ContentDetail, ContentListResult, ContentPreview, ContentQuery, ContentSortOption,
    ContentState, Episode, Hand, HandGrade, WatchProgress, WatchProgressUpdate,
};
