use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
}

/// Stamps audit columns on a payload about to be written.
///
/// Inserts keep a caller-supplied `created_at` and always refresh
/// `updated_at`. Updates refresh `updated_at` and drop `created_at` so the
/// creation time is never rewritten. Arrays are stamped row by row.
pub fn apply_audit_timestamps(payload: &mut Value, kind: WriteKind, now: DateTime<Utc>) {
    match payload {
        Value::Array(rows) => {
            for row in rows.iter_mut() {
                apply_audit_timestamps(row, kind, now);
            }
        }
        Value::Object(row) => {
            let stamp = json!(now.to_rfc3339());
            match kind {
                WriteKind::Insert => {
                    let missing = row.get(CREATED_AT).map_or(true, Value::is_null);
                    if missing {
                        row.insert(CREATED_AT.to_string(), stamp.clone());
                    }
                    row.insert(UPDATED_AT.to_string(), stamp);
                }
                WriteKind::Update => {
                    row.remove(CREATED_AT);
                    row.insert(UPDATED_AT.to_string(), stamp);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 7, 12, 28, 31).unwrap()
    }

    #[test]
    fn insert_sets_both_stamps_when_absent() {
        let mut row = json!({ "last_name": "Alami", "created_at": null });
        apply_audit_timestamps(&mut row, WriteKind::Insert, now());

        assert_eq!(row[CREATED_AT], json!(now().to_rfc3339()));
        assert_eq!(row[UPDATED_AT], json!(now().to_rfc3339()));
    }

    #[test]
    fn insert_keeps_supplied_creation_time() {
        let mut row = json!({ "created_at": "2025-01-01T00:00:00+00:00" });
        apply_audit_timestamps(&mut row, WriteKind::Insert, now());

        assert_eq!(row[CREATED_AT], "2025-01-01T00:00:00+00:00");
        assert_eq!(row[UPDATED_AT], json!(now().to_rfc3339()));
    }

    #[test]
    fn update_never_touches_creation_time() {
        let mut row = json!({ "quantity": 4, "created_at": "2020-01-01T00:00:00+00:00" });
        apply_audit_timestamps(&mut row, WriteKind::Update, now());

        assert!(row.get(CREATED_AT).is_none());
        assert_eq!(row[UPDATED_AT], json!(now().to_rfc3339()));
        assert_eq!(row["quantity"], 4);
    }

    #[test]
    fn bulk_inserts_are_stamped_per_row() {
        let mut rows = json!([{ "a": 1 }, { "a": 2 }]);
        apply_audit_timestamps(&mut rows, WriteKind::Insert, now());

        for row in rows.as_array().unwrap() {
            assert!(row.get(CREATED_AT).is_some());
            assert!(row.get(UPDATED_AT).is_some());
        }
    }
}
