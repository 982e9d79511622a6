use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::{GatewayError, Result};
use crate::session::SessionSnapshot;

/// Sets `Authorization: Bearer <token>` when the snapshot holds a token and
/// removes any caller-supplied `Authorization` otherwise.
pub fn attach_credentials(headers: &mut HeaderMap, snapshot: &SessionSnapshot) -> Result<()> {
    let Some(token) = snapshot.token.as_deref() else {
        headers.remove(AUTHORIZATION);
        return Ok(());
    };

    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| GatewayError::InvalidRequest("stored token is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);

    log::trace!("Attached bearer token {}", mask_token(token));
    Ok(())
}

/// Token prefix safe to put in logs.
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    if prefix.len() < token.len() {
        format!("{}...", prefix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header_attached() {
        let mut headers = HeaderMap::new();
        let snapshot = SessionSnapshot {
            generation: 1,
            token: Some("abc".to_string()),
        };

        attach_credentials(&mut headers, &snapshot).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_no_token_strips_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));

        attach_credentials(
            &mut headers,
            &SessionSnapshot {
                generation: 0,
                token: None,
            },
        )
        .unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let mut headers = HeaderMap::new();
        let snapshot = SessionSnapshot {
            generation: 1,
            token: Some("abc\ndef".to_string()),
        };
        assert!(attach_credentials(&mut headers, &snapshot).is_err());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9"), "eyJhbG...");
        assert_eq!(mask_token("short"), "***");
    }
}
