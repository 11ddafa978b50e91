#![forbid(unsafe_code)]

//! Inventory records and the field parser.
//!
//! The data source delivers [`RawRecord`]s exactly as the upstream table
//! stores them: a stable id plus a bag of optional, loosely typed fields.
//! [`parse_record`] turns one into a strict [`InventoryRecord`]; list items
//! use [`DisplayRecord::from_raw`], which never fails and degrades a
//! malformed record to "no date, not new" instead.
//!
//! # Wire shape
//!
//! ```json
//! {
//!   "id": "rec42",
//!   "fields": {
//!     "Product Name": "Barcode scanner",
//!     "Product Image": "file:///srv/img/scanner.png",
//!     "Posted": "2024-03-01T10:20:00.000Z",
//!     "Product Categories": "Hardware, Scanning"
//!   }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ParseError;
use crate::recency;

/// Separator between category names in the upstream categories field.
pub const CATEGORY_SEPARATOR: &str = ", ";

/// Opaque, stable record identifier.
///
/// Used as the render key for list items and as the key for per-item state.
/// Upstream ids may be strings or integers; both normalize to text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(i64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Self(text),
            Repr::Number(n) => Self(n.to_string()),
        })
    }
}

/// Upstream fields of one inventory row. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFields {
    #[serde(rename = "Product Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Product Image", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "Posted", default, skip_serializing_if = "Option::is_none")]
    pub posted: Option<String>,
    #[serde(
        rename = "Product Categories",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub categories: Option<String>,
}

/// A record exactly as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: RecordId,
    #[serde(default)]
    pub fields: RawFields,
}

impl RawRecord {
    /// Create a record with empty fields.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: RawFields::default(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.fields.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, uri: impl Into<String>) -> Self {
        self.fields.image = Some(uri.into());
        self
    }

    #[must_use]
    pub fn with_posted(mut self, posted: impl Into<String>) -> Self {
        self.fields.posted = Some(posted.into());
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: impl Into<String>) -> Self {
        self.fields.categories = Some(categories.into());
        self
    }
}

/// Ordered records in source fetch order. Replaced wholesale, never patched.
pub type InventoryCollection = Arc<[RawRecord]>;

/// A fully parsed inventory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    pub id: RecordId,
    pub name: String,
    pub image_url: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub categories: Vec<String>,
}

/// Parse a raw record.
///
/// A missing or unparseable `Posted` field fails with
/// [`ParseError::MalformedRecord`]; everything else has a safe default.
pub fn parse_record(raw: &RawRecord) -> Result<InventoryRecord, ParseError> {
    let posted = raw
        .fields
        .posted
        .as_deref()
        .ok_or_else(|| ParseError::malformed(&raw.id, "Posted", "is missing"))?;
    let posted_at = parse_posted(posted)
        .ok_or_else(|| ParseError::malformed(&raw.id, "Posted", format!("`{posted}` is not a date")))?;

    Ok(InventoryRecord {
        id: raw.id.clone(),
        name: raw.fields.name.clone().unwrap_or_default(),
        image_url: image_url(&raw.fields),
        posted_at,
        categories: split_categories(raw.fields.categories.as_deref()),
    })
}

/// Split the categories field on the exact `", "` separator.
///
/// Absent or empty input yields no categories. Pieces are not trimmed, and
/// duplicates are kept in source order.
pub fn split_categories(field: Option<&str>) -> Vec<String> {
    match field {
        None | Some("") => Vec::new(),
        Some(text) => text.split(CATEGORY_SEPARATOR).map(str::to_owned).collect(),
    }
}

fn image_url(fields: &RawFields) -> Option<String> {
    // An empty string is treated the same as no image at all.
    fields.image.clone().filter(|uri| !uri.is_empty())
}

/// Parse an upstream `Posted` value.
///
/// Accepts RFC 3339 timestamps, naive date-times (taken as UTC) and bare
/// dates (midnight UTC).
fn parse_posted(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// What a list item shows for one record.
///
/// Unlike [`InventoryRecord`] the posting instant is optional: a malformed
/// record still renders, with its date suppressed and never marked new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRecord {
    pub id: RecordId,
    pub name: String,
    pub image_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
}

impl DisplayRecord {
    /// Normalize a raw record for display. Never fails.
    pub fn from_raw(raw: &RawRecord) -> Self {
        match parse_record(raw) {
            Ok(record) => record.into(),
            Err(err) => {
                tracing::warn!(record_id = %raw.id, error = %err, "rendering degraded record");
                Self {
                    id: raw.id.clone(),
                    name: raw.fields.name.clone().unwrap_or_default(),
                    image_url: image_url(&raw.fields),
                    posted_at: None,
                    categories: split_categories(raw.fields.categories.as_deref()),
                }
            }
        }
    }

    /// Whether the "new" badge applies at `now`. Always false without a date.
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        self.posted_at
            .is_some_and(|posted| recency::is_recent(posted, now))
    }

    /// Short date label (`M/D/YYYY`), or `None` when the date is suppressed.
    pub fn date_label(&self) -> Option<String> {
        self.posted_at
            .map(|posted| posted.format("%-m/%-d/%Y").to_string())
    }
}

impl From<InventoryRecord> for DisplayRecord {
    fn from(record: InventoryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            image_url: record.image_url,
            posted_at: Some(record.posted_at),
            categories: record.categories,
        }
    }
}
