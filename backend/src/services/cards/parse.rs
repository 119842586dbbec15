//! # Card Parser
//!
//! Turns the opaque JSON objects returned by `GET /api/card` into
//! `CardRecord`s. Only field presence and type are checked.
//!
//! Required fields (`id`, `name`, `database_id`, `created_at`, `updated_at`,
//! `archived`, `creator.common_name`) missing from any card abort the parse and
//! name the offending card. Optional fields (`collection_id`, `last_used_at`,
//! `dataset_query.native.query`, `last-edit-info.email`) become `None` when
//! absent or null at any level of their path.

use crate::error::AuditError;
use chrono::{DateTime, Utc};
use common::model::card::CardRecord;
use serde_json::Value;

/// Follows a dot-separated key path through nested objects.
///
/// Yields `None` as soon as a key is missing, an intermediate value is not an
/// object, or the final value is JSON `null`.
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .filter(|found| !found.is_null())
}

pub fn parse(raw_cards: &[Value]) -> Result<Vec<CardRecord>, AuditError> {
    raw_cards
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_card(index, raw))
        .collect()
}

fn parse_card(index: usize, raw: &Value) -> Result<CardRecord, AuditError> {
    let mut fields = Fields {
        raw,
        index,
        card_id: None,
    };
    let card_id = fields.int("id")?;
    fields.card_id = Some(card_id);

    Ok(CardRecord {
        card_id,
        collection_id: fields.optional_int("collection_id")?,
        card_name: fields.string("name")?,
        card_sql: fields.optional_string("dataset_query.native.query")?,
        db_id: fields.int("database_id")?,
        created_at: fields.timestamp("created_at")?,
        created_by: fields.string("creator.common_name")?,
        last_updated_at: fields.timestamp("updated_at")?,
        last_updated_by: fields.optional_string("last-edit-info.email")?,
        last_used_at: fields.optional_timestamp("last_used_at")?,
        archived: fields.boolean("archived")?,
    })
}

/// Typed accessors over one raw card that report which card and field failed.
struct Fields<'a> {
    raw: &'a Value,
    index: usize,
    card_id: Option<i64>,
}

impl<'a> Fields<'a> {
    fn required(&self, field: &'static str) -> Result<&'a Value, AuditError> {
        lookup(self.raw, field).ok_or_else(|| AuditError::MissingField {
            index: self.index,
            card_id: self.card_id,
            field,
        })
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> AuditError {
        AuditError::InvalidField {
            index: self.index,
            card_id: self.card_id,
            field,
            reason: reason.into(),
        }
    }

    fn as_int(&self, field: &'static str, value: &Value) -> Result<i64, AuditError> {
        value
            .as_i64()
            .ok_or_else(|| self.invalid(field, format!("expected an integer, got {value}")))
    }

    fn as_str(&self, field: &'static str, value: &'a Value) -> Result<&'a str, AuditError> {
        value
            .as_str()
            .ok_or_else(|| self.invalid(field, format!("expected a string, got {value}")))
    }

    fn as_timestamp(&self, field: &'static str, value: &'a Value) -> Result<DateTime<Utc>, AuditError> {
        let raw = self.as_str(field, value)?;
        DateTime::parse_from_rfc3339(raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|e| self.invalid(field, format!("'{raw}' is not an RFC 3339 timestamp: {e}")))
    }

    fn int(&self, field: &'static str) -> Result<i64, AuditError> {
        self.as_int(field, self.required(field)?)
    }

    fn optional_int(&self, field: &'static str) -> Result<Option<i64>, AuditError> {
        lookup(self.raw, field)
            .map(|value| self.as_int(field, value))
            .transpose()
    }

    fn string(&self, field: &'static str) -> Result<String, AuditError> {
        self.as_str(field, self.required(field)?).map(str::to_string)
    }

    fn optional_string(&self, field: &'static str) -> Result<Option<String>, AuditError> {
        lookup(self.raw, field)
            .map(|value| self.as_str(field, value).map(str::to_string))
            .transpose()
    }

    fn timestamp(&self, field: &'static str) -> Result<DateTime<Utc>, AuditError> {
        self.as_timestamp(field, self.required(field)?)
    }

    fn optional_timestamp(&self, field: &'static str) -> Result<Option<DateTime<Utc>>, AuditError> {
        lookup(self.raw, field)
            .map(|value| self.as_timestamp(field, value))
            .transpose()
    }

    fn boolean(&self, field: &'static str) -> Result<bool, AuditError> {
        let value = self.required(field)?;
        value
            .as_bool()
            .ok_or_else(|| self.invalid(field, format!("expected a boolean, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw_card() -> Value {
        json!({
            "id": 42,
            "collection_id": 7,
            "name": "Weekly revenue",
            "database_id": 35,
            "created_at": "2024-01-02T03:04:05.678Z",
            "updated_at": "2024-03-01T00:00:00Z",
            "last_used_at": "2024-04-01T12:00:00+02:00",
            "archived": false,
            "creator": { "common_name": "Ada Lovelace", "email": "ada@example.com" },
            "last-edit-info": { "email": "grace@example.com" },
            "dataset_query": { "native": { "query": "select * from raw_hex.orders" } }
        })
    }

    #[test]
    fn parses_every_field() {
        let cards = parse(&[raw_card()]).unwrap();
        assert_eq!(cards.len(), 1);
        let card = &cards[0];
        assert_eq!(card.card_id, 42);
        assert_eq!(card.collection_id, Some(7));
        assert_eq!(card.card_name, "Weekly revenue");
        assert_eq!(card.card_sql.as_deref(), Some("select * from raw_hex.orders"));
        assert_eq!(card.db_id, 35);
        assert_eq!(card.created_by, "Ada Lovelace");
        assert_eq!(card.last_updated_by.as_deref(), Some("grace@example.com"));
        assert_eq!(
            card.last_used_at,
            Some(Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap())
        );
        assert!(!card.archived);
    }

    #[test]
    fn gui_question_without_native_query_has_no_sql() {
        let mut raw = raw_card();
        raw["dataset_query"] = json!({ "type": "query", "query": { "source-table": 3 } });
        let cards = parse(&[raw]).unwrap();
        assert_eq!(cards[0].card_sql, None);

        let mut raw = raw_card();
        raw.as_object_mut().unwrap().remove("dataset_query");
        let cards = parse(&[raw]).unwrap();
        assert_eq!(cards[0].card_sql, None);
    }

    #[test]
    fn missing_edit_history_is_not_an_error() {
        let mut raw = raw_card();
        raw.as_object_mut().unwrap().remove("last-edit-info");
        assert_eq!(parse(&[raw]).unwrap()[0].last_updated_by, None);

        let mut raw = raw_card();
        raw["last-edit-info"] = Value::Null;
        assert_eq!(parse(&[raw]).unwrap()[0].last_updated_by, None);

        let mut raw = raw_card();
        raw["last-edit-info"] = json!({});
        assert_eq!(parse(&[raw]).unwrap()[0].last_updated_by, None);
    }

    #[test]
    fn never_used_card_and_root_collection_are_null() {
        let mut raw = raw_card();
        raw["last_used_at"] = Value::Null;
        raw["collection_id"] = Value::Null;
        let card = &parse(&[raw]).unwrap()[0];
        assert_eq!(card.last_used_at, None);
        assert_eq!(card.collection_id, None);
    }

    #[test]
    fn missing_required_field_names_the_card() {
        let mut broken = raw_card();
        broken["id"] = json!(43);
        broken.as_object_mut().unwrap().remove("name");

        let err = parse(&[raw_card(), broken]).unwrap_err();
        match err {
            AuditError::MissingField {
                index,
                card_id,
                field,
            } => {
                assert_eq!(index, 1);
                assert_eq!(card_id, Some(43));
                assert_eq!(field, "name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_id_has_no_card_id() {
        let mut raw = raw_card();
        raw.as_object_mut().unwrap().remove("id");
        assert!(matches!(
            parse(&[raw]).unwrap_err(),
            AuditError::MissingField {
                index: 0,
                card_id: None,
                field: "id"
            }
        ));
    }

    #[test]
    fn malformed_timestamp_is_invalid() {
        let mut raw = raw_card();
        raw["updated_at"] = json!("yesterday");
        assert!(matches!(
            parse(&[raw]).unwrap_err(),
            AuditError::InvalidField {
                field: "updated_at",
                ..
            }
        ));
    }

    #[test]
    fn lookup_stops_at_first_absent_level() {
        let value = json!({ "a": { "b": null, "c": "x" }, "s": "text" });
        assert_eq!(lookup(&value, "a.c"), Some(&json!("x")));
        assert_eq!(lookup(&value, "a.b"), None);
        assert_eq!(lookup(&value, "a.b.c"), None);
        assert_eq!(lookup(&value, "missing.c"), None);
        assert_eq!(lookup(&value, "s.inner"), None);
    }
}
