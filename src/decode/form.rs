//! Ordered form-data representation shared by both body encodings.

use axum::body::Bytes;
use serde_json::{Map, Value as JsonValue};

/// An uploaded file field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A single form field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FormFile),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File(_) => None,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            FormValue::Text(text) => JsonValue::String(text.clone()),
            FormValue::File(file) => serde_json::json!({
                "filename": file.filename,
                "contentType": file.content_type,
                "size": file.data.len(),
            }),
        }
    }
}

/// Ordered multi-map of form fields. Repeated names are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let entries = form_urlencoded::parse(body)
            .map(|(name, value)| (name.into_owned(), FormValue::Text(value.into_owned())))
            .collect();
        Self { entries }
    }

    pub fn append(&mut self, name: impl Into<String>, value: FormValue) {
        self.entries.push((name.into(), value));
    }

    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.append(name, FormValue::Text(value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FormValue::as_text)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.entries.iter().filter(move |(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fields whose names start with `prefix`, with the prefix removed.
    pub fn strip_prefix(&self, prefix: &str) -> FormData {
        let entries = self
            .entries
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(prefix)
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect();
        FormData { entries }
    }

    /// Fields for which `keep` returns true.
    pub fn filter(&self, mut keep: impl FnMut(&str) -> bool) -> FormData {
        let entries = self
            .entries
            .iter()
            .filter(|(name, _)| keep(name))
            .cloned()
            .collect();
        FormData { entries }
    }

    /// JSON object view; repeated names become arrays.
    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::new();
        for (name, value) in &self.entries {
            let value = value.to_json();
            match object.get_mut(name) {
                Some(JsonValue::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = JsonValue::Array(vec![first, value]);
                }
                None => {
                    object.insert(name.clone(), value);
                }
            }
        }
        JsonValue::Object(object)
    }
}
