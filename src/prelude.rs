//! Convenience re-exports for common use.

pub use crate::app::AppContext;
pub use crate::auth::{AuthState, LoginRequest, RegisterRequest, User, UserRole, UserStatus};
pub use crate::client::{ApiClient, SessionEvent};
pub use crate::config::ClientConfig;
pub use crate::content::{Content, ContentDetail, ContentQuery, ContentSortOption, Hand, HandGrade};
pub use crate::error::{ApiError, Domain, ErrorCode, Result, WsoptvError};
pub use crate::player::{PlayerEvent, PlayerEventType, QualityLevel, TimelineSegment};
pub use crate::recovery::{CircuitState, FallbackStrategy, Resilience};
pub use crate::search::{SearchFilters, SearchQuery, SortOption};
pub use crate::storage::{FileStorage, LocalStorage, MemoryStorage};
