//! # Content Model
//!
//! A content collection is one named set of flat JSON records of a single
//! type. Each collection maps to one API segment, one MySQL table and one
//! client cache slot. Records are identified by a string `id` and are stored
//! as opaque JSON blobs; the typed views in [`records`] are only lenses over
//! that JSON and never drop unknown fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bundled fallback data for each collection.
pub mod defaults;
/// Typed views over the stored JSON records.
pub mod records;

pub use defaults::{default_records, default_settings};
pub use records::*;

/// Fixed id of the single site-settings record.
pub const SETTINGS_ID: &str = "global";

/// Errors raised while interpreting content records.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Unknown content collection: {0}")]
    UnknownCollection(String),

    #[error("Record must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Record id must be a string")]
    InvalidId,
}

/// # Collection
///
/// The closed set of content collections exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Services,
    Packages,
    Cases,
    Blog,
    Team,
    Testimonials,
    Popups,
    Leads,
    Seo,
    Media,
    Settings,
}

impl Collection {
    /// Every collection, in the order the admin tool lists them.
    pub const ALL: [Collection; 11] = [
        Collection::Services,
        Collection::Packages,
        Collection::Cases,
        Collection::Blog,
        Collection::Team,
        Collection::Testimonials,
        Collection::Popups,
        Collection::Leads,
        Collection::Seo,
        Collection::Media,
        Collection::Settings,
    ];

    /// The URL segment under `/api/`.
    pub fn segment(&self) -> &'static str {
        match self {
            Collection::Services => "services",
            Collection::Packages => "packages",
            Collection::Cases => "cases",
            Collection::Blog => "blog",
            Collection::Team => "team",
            Collection::Testimonials => "testimonials",
            Collection::Popups => "popups",
            Collection::Leads => "leads",
            Collection::Seo => "seo",
            Collection::Media => "media",
            Collection::Settings => "settings",
        }
    }

    /// The backing MySQL table. Only ever interpolated from this fixed list.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Blog => "blog_posts",
            other => other.segment(),
        }
    }

    /// Settings hold exactly one record with id [`SETTINGS_ID`].
    pub fn is_singleton(&self) -> bool {
        matches!(self, Collection::Settings)
    }

    /// Leads carry personal data and are only listed to the admin.
    pub fn is_private(&self) -> bool {
        matches!(self, Collection::Leads)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl FromStr for Collection {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        // "case-studies" and "blog_posts" are accepted as aliases.
        let wanted = match wanted.as_str() {
            "case-studies" | "case_studies" => "cases",
            "blog_posts" | "posts" => "blog",
            other => other,
        };
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.segment() == wanted)
            .ok_or_else(|| ContentError::UnknownCollection(s.to_string()))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Borrows the record as a JSON object or explains what it was instead.
pub fn as_object_mut(record: &mut Value) -> Result<&mut Map<String, Value>, ContentError> {
    let kind = kind_of(record);
    record.as_object_mut().ok_or(ContentError::NotAnObject(kind))
}

/// Returns the record id, assigning a fresh UUID when it is missing or blank.
pub fn ensure_id(record: &mut Value) -> Result<String, ContentError> {
    let object = as_object_mut(record)?;
    match object.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => return Ok(id.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => {}
        // Numeric ids from older exports are kept, as strings.
        Some(Value::Number(n)) => {
            let id = n.to_string();
            object.insert("id".to_string(), Value::String(id.clone()));
            return Ok(id);
        }
        Some(_) => return Err(ContentError::InvalidId),
    }
    let id = uuid::Uuid::new_v4().to_string();
    object.insert("id".to_string(), Value::String(id.clone()));
    Ok(id)
}

/// Overwrites the record id, e.g. with the id taken from a URL path.
pub fn set_id(record: &mut Value, id: &str) -> Result<(), ContentError> {
    as_object_mut(record)?.insert("id".to_string(), Value::String(id.to_string()));
    Ok(())
}

/// Reads the string id of a stored record, if it has one.
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_segments_parse_back() {
        for collection in Collection::ALL {
            assert_eq!(collection.segment().parse::<Collection>().unwrap(), collection);
        }
        assert_eq!("case-studies".parse::<Collection>().unwrap(), Collection::Cases);
        assert_eq!(" Blog ".parse::<Collection>().unwrap(), Collection::Blog);
        assert!(matches!(
            "invoices".parse::<Collection>(),
            Err(ContentError::UnknownCollection(s)) if s == "invoices"
        ));
    }

    #[test]
    fn blog_lives_in_its_own_table_name() {
        assert_eq!(Collection::Blog.table(), "blog_posts");
        assert_eq!(Collection::Cases.table(), "cases");
    }

    #[test]
    fn ensure_id_keeps_existing_and_fills_blank() {
        let mut kept = json!({"id": "seo-audit", "title": "SEO Audit"});
        assert_eq!(ensure_id(&mut kept).unwrap(), "seo-audit");

        let mut blank = json!({"id": "  ", "title": "New"});
        let id = ensure_id(&mut blank).unwrap();
        assert_eq!(id.len(), 36);
        assert_eq!(blank["id"], json!(id));

        let mut missing = json!({"title": "New"});
        assert!(!ensure_id(&mut missing).unwrap().is_empty());

        let mut numeric = json!({"id": 7});
        assert_eq!(ensure_id(&mut numeric).unwrap(), "7");
        assert_eq!(numeric["id"], json!("7"));
    }

    #[test]
    fn ensure_id_rejects_non_objects() {
        let mut list = json!([1, 2]);
        assert!(matches!(ensure_id(&mut list), Err(ContentError::NotAnObject("an array"))));

        let mut bad_id = json!({"id": {"nested": true}});
        assert!(matches!(ensure_id(&mut bad_id), Err(ContentError::InvalidId)));
    }
}
