//! Authentication utility functions.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::errors::{Error, Result};

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Returns `Ok(None)` when the header is missing, uses another scheme, or carries an
/// empty token. A header value that is not visible ASCII is an error.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|source| Error::InvalidHeader {
        name: "authorization",
        source,
    })?;

    let Some((scheme, token)) = value.trim().split_once(char::is_whitespace) else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    let token = token.trim();
    Ok((!token.is_empty()).then_some(token))
}
