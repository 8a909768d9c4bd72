//! Search-as-you-type, suggestions and recent queries.

pub mod api;
pub mod highlight;
pub mod recent;
pub mod store;
pub mod types;

pub use api::{HttpSearchApi, SearchApi, MIN_SUGGEST_CHARS};
pub use highlight::highlight_text;
pub use recent::{RecentSearches, MAX_RECENT_SEARCHES, RECENT_SEARCHES_KEY};
pub use store::SearchStore;
pub use types::{
    Facet, FacetValue, SearchFilters, SearchHighlight, SearchHit, SearchQuery, SearchResult, SearchState,
    SortOption, SuggestQuery, Suggestion, SuggestionMetadata, SuggestionType,
};
