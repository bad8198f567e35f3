use crate::session::SessionError;
use serde::Deserialize;
use std::path::Path;

/// One browser cookie as exported by the refresh step
///
/// Extra attributes (domain, path, expiry, ...) are accepted and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
}

/// Joins cookie records into a single `name=value; name2=value2` header
pub fn cookie_header(cookies: &[CookieRecord]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parses the credential file into cookie records
///
/// The file must hold a non-empty JSON array of `{name, value}` objects.
pub fn parse_cookie_file(path: &Path, content: &str) -> Result<Vec<CookieRecord>, SessionError> {
    let cookies: Vec<CookieRecord> =
        serde_json::from_str(content).map_err(|e| SessionError::InvalidCredentials {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if cookies.is_empty() {
        return Err(SessionError::InvalidCredentials {
            path: path.to_path_buf(),
            reason: "no cookies in file".to_string(),
        });
    }

    if cookies.iter().any(|c| c.name.trim().is_empty()) {
        return Err(SessionError::InvalidCredentials {
            path: path.to_path_buf(),
            reason: "cookie with an empty name".to_string(),
        });
    }

    Ok(cookies)
}
