//! Row population
//!
//! Turns one raw fetched row into one typed record by walking the view's
//! column table: read the raw value, decrypt it when the column is
//! encrypted, and write it through the column's setter. On the encrypted
//! path the same walk also evaluates the free-text filter against the
//! decrypted values, so a row is decrypted at most once.

use crate::domain::view::{FieldValue, ViewColumn};
use crate::error::{Error, Result};
use crate::infrastructure::crypto::{CipherError, FieldCipher};
use crate::infrastructure::executor::RawRow;

/// Populate a typed record from `row`, with no filter evaluation
pub fn populate_record<R: Default>(
    row: &RawRow,
    columns: &[ViewColumn<R>],
    cipher: &dyn FieldCipher,
) -> Result<R> {
    let mut record = R::default();
    for column in columns {
        let value = read_value(row, column, cipher)?;
        (column.set)(&mut record, value);
    }
    Ok(record)
}

/// Populate a typed record and evaluate the free-text filter against it
///
/// Returns `Ok(None)` when a filter is present and no filterable column's
/// rendered value contains it (case-insensitive). A record with no filter
/// always matches.
pub fn populate_and_filter<R: Default>(
    row: &RawRow,
    columns: &[ViewColumn<R>],
    cipher: &dyn FieldCipher,
    filter: Option<&str>,
) -> Result<Option<R>> {
    let needle = filter.map(|f| f.to_lowercase());
    let mut matched = needle.is_none();
    let mut record = R::default();

    for column in columns {
        let value = read_value(row, column, cipher)?;
        if column.filterable && !matched {
            if let (Some(needle), Some(rendered)) = (needle.as_deref(), value.render()) {
                matched = rendered.to_lowercase().contains(needle);
            }
        }
        (column.set)(&mut record, value);
    }

    Ok(matched.then_some(record))
}

fn read_value<R>(
    row: &RawRow,
    column: &ViewColumn<R>,
    cipher: &dyn FieldCipher,
) -> Result<FieldValue> {
    let raw = row.get(column.column);
    if !column.encrypted || raw.is_null() {
        return Ok(raw);
    }
    match raw {
        FieldValue::Text(ciphertext) => {
            let plaintext = cipher.decrypt(&ciphertext).map_err(|source| Error::Decrypt {
                column: column.column.to_string(),
                source,
            })?;
            Ok(FieldValue::Text(plaintext))
        }
        other => Err(Error::Decrypt {
            column: column.column.to_string(),
            source: CipherError::MalformedCiphertext(format!(
                "expected text ciphertext, got {:?}",
                other
            )),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::view::{ValueKind, ViewRecord};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        uuid: String,
        name: Option<String>,
        ssn: Option<String>,
        age: Option<i64>,
    }

    impl ViewRecord for Person {
        fn uuid(&self) -> &str {
            &self.uuid
        }
    }

    /// Cipher that tags values instead of encrypting, so tests can observe
    /// exactly which columns went through decryption.
    struct TagCipher;

    impl FieldCipher for TagCipher {
        fn encrypt(&self, plaintext: &str) -> std::result::Result<String, CipherError> {
            Ok(format!("enc:{plaintext}"))
        }

        fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, CipherError> {
            match ciphertext.strip_prefix("enc:") {
                Some(rest) => Ok(rest.to_string()),
                None => Err(CipherError::MalformedCiphertext(ciphertext.to_string())),
            }
        }
    }

    fn columns() -> Vec<ViewColumn<Person>> {
        vec![
            ViewColumn::new(
                "uuid",
                "uuid",
                ValueKind::Text,
                |r: &Person| FieldValue::Text(r.uuid.clone()),
                |r, v| r.uuid = v.into_text().unwrap_or_default(),
            ),
            ViewColumn::new(
                "name",
                "name",
                ValueKind::Text,
                |r: &Person| r.name.clone().into(),
                |r, v| r.name = v.into_text(),
            )
            .filterable(),
            ViewColumn::new(
                "ssn",
                "ssn",
                ValueKind::Text,
                |r: &Person| r.ssn.clone().into(),
                |r, v| r.ssn = v.into_text(),
            )
            .encrypted()
            .filterable(),
            ViewColumn::new(
                "age",
                "age",
                ValueKind::BigInt,
                |r: &Person| r.age.into(),
                |r, v| r.age = v.into_big_int(),
            ),
        ]
    }

    fn row(uuid: &str, name: &str, ssn: &str, age: i64) -> RawRow {
        RawRow::new()
            .with("uuid", FieldValue::Text(uuid.to_string()))
            .with("name", FieldValue::Text(name.to_string()))
            .with("ssn", FieldValue::Text(format!("enc:{ssn}")))
            .with("age", FieldValue::BigInt(age))
    }

    #[test]
    fn test_populate_decrypts_encrypted_columns_only() {
        let person =
            populate_record(&row("u1", "Ada", "111-22-3333", 36), &columns(), &TagCipher)
                .expect("populate");
        assert_eq!(person.uuid, "u1");
        assert_eq!(person.name.as_deref(), Some("Ada"));
        assert_eq!(person.ssn.as_deref(), Some("111-22-3333"));
        assert_eq!(person.age, Some(36));
    }

    #[test]
    fn test_populate_leaves_null_encrypted_value_null() {
        let raw = RawRow::new()
            .with("uuid", FieldValue::Text("u1".to_string()))
            .with("name", FieldValue::Null)
            .with("ssn", FieldValue::Null)
            .with("age", FieldValue::Null);
        let person = populate_record(&raw, &columns(), &TagCipher).expect("populate");
        assert_eq!(person.ssn, None);
        assert_eq!(person.name, None);
    }

    #[test]
    fn test_missing_column_reads_as_null() {
        let raw = RawRow::new().with("uuid", FieldValue::Text("u1".to_string()));
        let person = populate_record(&raw, &columns(), &TagCipher).expect("populate");
        assert_eq!(person.name, None);
        assert_eq!(person.age, None);
    }

    #[test]
    fn test_filter_matches_decrypted_value() {
        let matched = populate_and_filter(
            &row("u1", "Ada", "111-22-3333", 36),
            &columns(),
            &TagCipher,
            Some("22-33"),
        )
        .expect("populate");
        assert!(matched.is_some());
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let matched = populate_and_filter(
            &row("u1", "Ada Lovelace", "111", 36),
            &columns(),
            &TagCipher,
            Some("LOVELACE"),
        )
        .expect("populate");
        assert!(matched.is_some());
    }

    #[test]
    fn test_filter_ignores_non_filterable_columns() {
        // Age is not filterable, so its value must not satisfy the filter.
        let matched = populate_and_filter(
            &row("u1", "Ada", "111", 36),
            &columns(),
            &TagCipher,
            Some("36"),
        )
        .expect("populate");
        assert!(matched.is_none());
    }

    #[test]
    fn test_no_filter_matches_everything() {
        let matched =
            populate_and_filter(&row("u1", "Ada", "111", 36), &columns(), &TagCipher, None)
                .expect("populate");
        assert!(matched.is_some());
    }

    #[test]
    fn test_filtered_out_record_is_still_fully_populated_before_drop() {
        let matched = populate_and_filter(
            &row("u1", "Ada", "111", 36),
            &columns(),
            &TagCipher,
            Some("zzz"),
        )
        .expect("populate");
        assert_eq!(matched, None);
    }

    #[test]
    fn test_decrypt_failure_names_the_column() {
        let raw = row("u1", "Ada", "111", 36)
            .with("ssn", FieldValue::Text("garbage".to_string()));
        let err = populate_record(&raw, &columns(), &TagCipher).expect_err("must fail");
        match err {
            Error::Decrypt { column, .. } => assert_eq!(column, "ssn"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_text_ciphertext_is_rejected() {
        let raw = row("u1", "Ada", "111", 36).with("ssn", FieldValue::BigInt(7));
        let err = populate_record(&raw, &columns(), &TagCipher).expect_err("must fail");
        assert!(matches!(err, Error::Decrypt { .. }));
    }
}
