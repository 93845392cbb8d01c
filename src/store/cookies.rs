//! Request and response cookies.
//!
//! Request cookies are read-only `name=value` pairs from the `cookie` header. Cookies an
//! action sets are kept as [`ResponseCookie`]s with their attribute suffix intact, so the
//! `set-cookie` headers written later are exactly what the action asked for.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

/// Parse every `cookie` header into ordered `(name, value)` pairs.
pub fn parse_cookie_header(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                None
            } else {
                Some((name.to_string(), value.trim().to_string()))
            }
        })
        .collect()
}

/// A cookie mutation recorded during an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCookie {
    name: String,
    value: String,
    attributes: Option<String>,
}

impl ResponseCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            attributes: None,
        }
    }

    /// Attach an attribute suffix such as `Path=/; HttpOnly`.
    pub fn with_attributes(mut self, attributes: impl Into<String>) -> Self {
        let attributes = attributes.into();
        let attributes = attributes.trim().trim_start_matches(';').trim();
        self.attributes = (!attributes.is_empty()).then(|| attributes.to_string());
        self
    }

    /// Parse a full `set-cookie` value.
    pub fn parse(set_cookie: &str) -> Option<Self> {
        let (pair, attributes) = match set_cookie.split_once(';') {
            Some((pair, rest)) => (pair, Some(rest)),
            None => (set_cookie, None),
        };
        let (name, value) = pair.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let cookie = Self::new(name, value.trim());
        Some(match attributes {
            Some(attributes) => cookie.with_attributes(attributes),
            None => cookie,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The bare `name=value` pair, without attributes.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// The full `set-cookie` header value.
    pub fn to_header_value(&self) -> String {
        match &self.attributes {
            Some(attributes) => format!("{}; {}", self.pair(), attributes),
            None => self.pair(),
        }
    }
}

/// Cookies mutated during the current request, in mutation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutableCookies {
    cookies: Vec<ResponseCookie>,
}

impl MutableCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie, replacing an earlier mutation of the same name.
    pub fn set(&mut self, cookie: ResponseCookie) {
        match self.cookies.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    /// Expire a cookie on the client.
    pub fn delete(&mut self, name: &str) {
        self.set(ResponseCookie::new(name, "").with_attributes("Path=/; Max-Age=0"));
    }

    pub fn get(&self, name: &str) -> Option<&ResponseCookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResponseCookie> {
        self.cookies.iter()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Append one `set-cookie` header per mutation. Returns whether anything was written.
    pub fn append_to(&self, headers: &mut HeaderMap) -> bool {
        let mut appended = false;
        for cookie in &self.cookies {
            match HeaderValue::from_str(&cookie.to_header_value()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                    appended = true;
                }
                Err(_) => {
                    tracing::warn!(cookie = %cookie.name, "Dropping cookie with invalid header characters");
                }
            }
        }
        appended
    }
}
