//! Utility modules: response cache, retry backoff, debounce, request de-duplication.

pub mod cache;
pub mod debounce;
pub mod retry;
pub mod single_flight;

pub use cache::ResponseCache;
pub use debounce::Debouncer;
pub use retry::RetryPolicy;
pub use single_flight::SingleFlight;
