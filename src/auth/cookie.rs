//! Session cookie handling
//!
//! The session token travels in a single `HttpOnly` cookie named `token`.
//! The server only ever sets or clears it; identity is always re-derived by
//! verifying the token it carries.

use crate::error::{Error, Result};
use axum::{
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the session cookie
pub const TOKEN_COOKIE: &str = "token";

/// `SameSite` attribute of the session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    /// Needed when the frontend is served from another site
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Binds session tokens to the `token` cookie
#[derive(Debug, Clone)]
pub struct SessionCookie {
    secure: bool,
    same_site: SameSite,
    max_age_secs: i64,
}

impl SessionCookie {
    pub fn new(secure: bool, same_site: SameSite, max_age_secs: i64) -> Self {
        if same_site == SameSite::None && !secure {
            tracing::warn!("SameSite=None without Secure: browsers will drop the session cookie");
        }
        Self {
            secure,
            same_site,
            max_age_secs,
        }
    }

    fn render(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
            TOKEN_COOKIE, value, self.same_site, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Set the session cookie on `response`
    pub fn attach(&self, response: &mut Response, token: &str) -> Result<()> {
        let value = HeaderValue::from_str(&self.render(token, self.max_age_secs))
            .map_err(|e| Error::Other(format!("Invalid cookie value: {}", e)))?;
        response.headers_mut().append(SET_COOKIE, value);
        Ok(())
    }

    /// Expire the session cookie. Safe to call when no cookie was ever set.
    pub fn clear(&self, response: &mut Response) {
        if let Ok(value) = HeaderValue::from_str(&self.render("", 0)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    /// Read the session token from the request's `Cookie` headers
    pub fn extract(headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|header| header.split(';'))
            .find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name.trim() == TOKEN_COOKIE).then(|| value.trim().to_string())
            })
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_attach_sets_http_only_cookie() {
        let cookie = SessionCookie::new(false, SameSite::Lax, 3600);
        let mut response = Response::new(Body::empty());
        cookie.attach(&mut response, "abc.def.ghi").unwrap();

        let headers = set_cookies(&response);
        assert_eq!(
            headers,
            vec!["token=abc.def.ghi; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600"]
        );
    }

    #[test]
    fn test_secure_cross_site_cookie() {
        let cookie = SessionCookie::new(true, SameSite::None, 60);
        let mut response = Response::new(Body::empty());
        cookie.attach(&mut response, "t").unwrap();

        let header = &set_cookies(&response)[0];
        assert!(header.contains("SameSite=None"));
        assert!(header.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_expires_cookie() {
        let cookie = SessionCookie::new(false, SameSite::Strict, 3600);
        let mut response = Response::new(Body::empty());
        cookie.clear(&mut response);

        let header = &set_cookies(&response)[0];
        assert!(header.starts_with("token=;"));
        assert!(header.contains("Max-Age=0"));
    }

    #[test]
    fn test_extract_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=abc; lang=en"));
        assert_eq!(SessionCookie::extract(&headers), Some("abc".to_string()));
    }

    #[test]
    fn test_extract_absent_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(SessionCookie::extract(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("token="));
        assert_eq!(SessionCookie::extract(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("tokenish=abc"));
        assert_eq!(SessionCookie::extract(&headers), None);
    }
}
