//! Sign-in, registration and session restoration.

pub mod api;
pub mod store;
pub mod token;
pub mod types;
pub mod validation;

pub use api::{AuthApi, HttpAuthApi};
pub use store::AuthStore;
pub use token::{TokenPair, TokenVault, TOKEN_KEY};
pub use types::{AuthResponse, AuthState, LoginRequest, RegisterRequest, User, UserRole, UserStatus};
