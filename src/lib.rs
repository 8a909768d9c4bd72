//! WSOPTV client SDK
//!
//! Typed, resilient access to the WSOPTV streaming backend: a shared HTTP
//! client, a normalized error taxonomy with a recovery matrix that is
//! actually executed (retry with backoff, per-block circuit breakers), a
//! short-lived response cache, and observable stores for auth, content,
//! playback and search.
//!
//! # Quick Start
//!
//! ```no_run
//! use wsoptv::prelude::*;
//!
//! # async fn example() -> wsoptv::error::Result<()> {
//! let app = AppContext::new(ClientConfig::load(None)?);
//! app.auth().login(LoginRequest::new("player1", "Secret123")).await?;
//! app.content().fetch_contents(ContentQuery::default()).await?;
//! for content in app.content().state().contents {
//!     println!("{}", content.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod auth;
pub mod blocks;
pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod player;
pub mod prelude;
pub mod recovery;
pub mod search;
pub mod storage;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
