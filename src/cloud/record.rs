use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Owner name the record store uses for the signed-in account.
pub const CURRENT_USER_OWNER: &str = "__defaultOwner__";

// ============================================================================
// Identifiers
// ============================================================================

/// A named, account-scoped partition in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ZoneId {
    pub name: String,
    pub owner: String,
}

impl ZoneId {
    /// A zone private to the currently signed-in account.
    pub fn current_user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: CURRENT_USER_OWNER.to_string(),
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.name)
    }
}

/// Identifier of one record, scoped to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId {
    pub zone: ZoneId,
    pub name: String,
}

impl RecordId {
    pub fn new(name: impl Into<String>, zone: &ZoneId) -> Self {
        Self {
            zone: zone.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone, self.name)
    }
}

// ============================================================================
// Field values
// ============================================================================

/// What happens to the referencing record when its target is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferenceAction {
    /// The link is informational only.
    None,
    /// The referencing record is deleted along with its target.
    DeleteSelf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReference {
    pub target: RecordId,
    pub action: ReferenceAction,
}

/// A typed field value as understood by the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    String(String),
    StringList(Vec<String>),
    Date(DateTime<Utc>),
    Reference(RecordReference),
}

// ============================================================================
// Records
// ============================================================================

/// An opaque record: a type name plus a bag of named fields.
///
/// Fields are kept in a `BTreeMap` so serialized output and comparisons are
/// stable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub record_type: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(record_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            id,
            record_type: record_type.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: FieldValue) {
        self.fields.insert(key.to_string(), value);
    }

    /// Set a string field, leaving the field absent when `value` is `None`.
    pub fn set_string(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set(key, FieldValue::String(value.to_string()));
        }
    }

    /// Set a date field, leaving the field absent when `value` is `None`.
    pub fn set_date(&mut self, key: &str, value: Option<DateTime<Utc>>) {
        if let Some(value) = value {
            self.set(key, FieldValue::Date(value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn date(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(key) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn string_list(&self, key: &str) -> Option<&[String]> {
        match self.fields.get(key) {
            Some(FieldValue::StringList(list)) => Some(list),
            _ => None,
        }
    }

    pub fn reference(&self, key: &str) -> Option<&RecordReference> {
        match self.fields.get(key) {
            Some(FieldValue::Reference(r)) => Some(r),
            _ => None,
        }
    }

    /// All references held by this record.
    pub fn references(&self) -> impl Iterator<Item = &RecordReference> {
        self.fields.values().filter_map(|v| match v {
            FieldValue::Reference(r) => Some(r),
            _ => None,
        })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Equality match on one string field of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub record_type: String,
    pub field: String,
    pub equals: String,
}

impl RecordQuery {
    pub fn new(
        record_type: impl Into<String>,
        field: impl Into<String>,
        equals: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            field: field.into(),
            equals: equals.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.record_type == self.record_type
            && record.string(&self.field) == Some(self.equals.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted() {
        let zone = ZoneId::current_user("Articles");
        let mut record = Record::new("Article", RecordId::new("a|1", &zone));
        record.set_string("title", None);
        record.set_date("datePublished", None);
        record.set_string("url", Some("https://example.com"));

        assert!(!record.contains("title"));
        assert!(!record.contains("datePublished"));
        assert_eq!(record.string("url"), Some("https://example.com"));
        assert_eq!(record.field_names().count(), 1);
    }

    #[test]
    fn test_query_matches_type_and_field() {
        let zone = ZoneId::current_user("Articles");
        let mut record = Record::new("ArticleStatus", RecordId::new("s|1", &zone));
        record.set_string("webFeedExternalID", Some("feed-1"));

        assert!(RecordQuery::new("ArticleStatus", "webFeedExternalID", "feed-1").matches(&record));
        assert!(!RecordQuery::new("ArticleStatus", "webFeedExternalID", "feed-2").matches(&record));
        assert!(!RecordQuery::new("Article", "webFeedExternalID", "feed-1").matches(&record));
    }

    #[test]
    fn test_typed_getters_reject_other_types() {
        let zone = ZoneId::current_user("Articles");
        let mut record = Record::new("Article", RecordId::new("a|1", &zone));
        record.set("parsedAuthors", FieldValue::StringList(vec!["{}".to_string()]));

        assert!(record.string("parsedAuthors").is_none());
        assert_eq!(record.string_list("parsedAuthors").map(<[String]>::len), Some(1));
    }
}
