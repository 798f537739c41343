//! Contacts import module

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::PgPool;

use crate::import::ImportModule;
use crate::models::{FieldMap, ImportRecord};

/// Type id for contact imports.
pub const CONTACTS_TYPE_ID: i16 = 1;

/// Imports contact rows into the `contacts` table.
pub struct ContactsModule {
    pool: PgPool,
}

impl ContactsModule {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportModule for ContactsModule {
    fn type_id(&self) -> i16 {
        CONTACTS_TYPE_ID
    }

    fn name(&self) -> &str {
        "contacts"
    }

    fn expected_columns(&self) -> &[&str] {
        &["first_name", "email"]
    }

    fn validate(&self, fields: &FieldMap) -> Vec<String> {
        let mut errors = Vec::new();

        if field_str(fields, "first_name").is_none() {
            errors.push("The first name field is required.".to_string());
        }

        match field_str(fields, "email") {
            None => errors.push("The email field is required.".to_string()),
            Some(email) if !is_email(&email) => {
                errors.push("The email field must be a valid email address.".to_string());
            },
            Some(_) => {},
        }

        errors
    }

    async fn save(&self, fields: &FieldMap, record: &ImportRecord) -> anyhow::Result<()> {
        let first_name = field_str(fields, "first_name")
            .ok_or_else(|| anyhow::anyhow!("first_name missing after validation"))?;
        let email = field_str(fields, "email")
            .ok_or_else(|| anyhow::anyhow!("email missing after validation"))?;

        sqlx::query(
            r#"
            INSERT INTO contacts
                (import_record_id, first_name, last_name, email, phone, original_created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(&first_name)
        .bind(field_str(fields, "last_name"))
        .bind(&email)
        .bind(field_str(fields, "phone"))
        .bind(field_datetime(fields, "original_created_at"))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Non-blank string reading of a field.
fn field_str(fields: &FieldMap, key: &str) -> Option<String> {
    match fields.get(key)? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        },
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Calendar timestamp reading of a field, in the pipeline's
/// `YYYY-MM-DD HH:MM:SS` rendering.
fn field_datetime(fields: &FieldMap, key: &str) -> Option<DateTime<Utc>> {
    let raw = field_str(fields, key)?;
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        let mut map = FieldMap::new();
        for (key, value) in pairs {
            map.insert(key.to_string(), Value::from(*value));
        }
        map
    }

    fn module() -> ContactsModule {
        ContactsModule::new(PgPool::connect_lazy("postgresql://localhost/test").unwrap())
    }

    #[test]
    fn test_validate_accepts_complete_row() {
        let errors = module().validate(&fields(&[
            ("first_name", "Ada"),
            ("email", "ada@example.com"),
        ]));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_requires_first_name_and_email() {
        let errors = module().validate(&FieldMap::new());
        assert_eq!(
            errors,
            vec![
                "The first name field is required.".to_string(),
                "The email field is required.".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_malformed_email() {
        let errors = module().validate(&fields(&[
            ("first_name", "Ada"),
            ("email", "not-an-email"),
        ]));
        assert_eq!(
            errors,
            vec!["The email field must be a valid email address.".to_string()]
        );
    }

    #[test]
    fn test_field_datetime_parses_pipeline_rendering() {
        let map = fields(&[("original_created_at", "2024-01-01 12:00:00")]);
        let parsed = field_datetime(&map, "original_created_at").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_field_datetime_rejects_other_formats() {
        let map = fields(&[("original_created_at", "01/02/2024")]);
        assert!(field_datetime(&map, "original_created_at").is_none());
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("ada@example.com"));
        assert!(!is_email("ada"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("ada@example"));
    }
}
