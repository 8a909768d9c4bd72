//! Credential checks applied before any request leaves the client.

use std::sync::OnceLock;

use regex::Regex;

use super::types::{LoginRequest, RegisterRequest};
use crate::error::{ApiError, Domain};

static USERNAME_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn username_pattern() -> Option<&'static Regex> {
    USERNAME_PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").ok())
        .as_ref()
}

fn invalid(message: &str) -> ApiError {
    ApiError::validation(Domain::Auth, message)
}

pub fn validate_login(request: &LoginRequest) -> Result<(), ApiError> {
    if request.username.is_empty() {
        return Err(invalid("Username is required"));
    }
    if request.password.is_empty() {
        return Err(invalid("Password is required"));
    }
    Ok(())
}

pub fn validate_register(request: &RegisterRequest) -> Result<(), ApiError> {
    let username_len = request.username.chars().count();
    if username_len < 4 {
        return Err(invalid("Username must be at least 4 characters"));
    }
    if username_len > 50 {
        return Err(invalid("Username must be at most 50 characters"));
    }
    let username_ok = match username_pattern() {
        Some(pattern) => pattern.is_match(&request.username),
        None => request
            .username
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_'),
    };
    if !username_ok {
        return Err(invalid("Username may only contain letters, digits and underscores"));
    }

    let password = &request.password;
    let password_len = password.chars().count();
    if password_len < 8 {
        return Err(invalid("Password must be at least 8 characters"));
    }
    if password_len > 128 {
        return Err(invalid("Password must be at most 128 characters"));
    }
    if !password.chars().any(|ch| ch.is_ascii_uppercase()) {
        return Err(invalid("Password must contain an upper-case letter"));
    }
    if !password.chars().any(|ch| ch.is_ascii_lowercase()) {
        return Err(invalid("Password must contain a lower-case letter"));
    }
    if !password.chars().any(|ch| ch.is_ascii_digit()) {
        return Err(invalid("Password must contain a digit"));
    }

    if let Some(display_name) = &request.display_name {
        let len = display_name.chars().count();
        if !(2..=100).contains(&len) {
            return Err(invalid("Display name must be 2 to 100 characters"));
        }
    }
    Ok(())
}
