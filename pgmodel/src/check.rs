//! Verifies a model's mapping against the live table.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
    model::{metadata, ModelMetadata},
    schema::ColumnSchema,
    Database, Error, Model,
};

/// Result of comparing a model with the table it maps to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelCheck {
    pub model: String,
    pub table: String,
    pub table_found: bool,
    /// Columns the model maps that the table lacks.
    pub missing_in_db: Vec<String>,
    /// Table columns with no property; selecting `*` into the model will fail.
    pub extra_in_db: Vec<String>,
    /// NULL-able columns mapped to non-`Option` properties.
    pub nullable_mismatches: Vec<String>,
}

impl ModelCheck {
    /// True when rows of the table can be hydrated into the model.
    pub fn is_valid(&self) -> bool {
        self.table_found
            && self.missing_in_db.is_empty()
            && self.extra_in_db.is_empty()
            && self.nullable_mismatches.is_empty()
    }

    pub(crate) fn compare(meta: &ModelMetadata, columns: &[ColumnSchema]) -> Self {
        let mut check = ModelCheck {
            model: meta.model.to_string(),
            table: meta.table.clone(),
            table_found: !columns.is_empty(),
            ..Default::default()
        };
        if !check.table_found {
            return check;
        }

        let db_columns: BTreeSet<&str> = columns.iter().map(|c| c.column_name.as_str()).collect();

        for mapping in &meta.columns {
            if !db_columns.contains(mapping.column.as_str()) {
                check.missing_in_db.push(mapping.column.clone());
            }
        }

        for column in columns {
            if meta.properties_for(&column.column_name).is_none() {
                check.extra_in_db.push(column.column_name.clone());
            }
        }

        for property in &meta.properties {
            let nullable_in_db = columns
                .iter()
                .any(|c| c.column_name == property.column_name() && c.is_nullable);
            if nullable_in_db && !property.is_nullable {
                check.nullable_mismatches.push(property.name.to_string());
            }
        }

        check
    }
}

impl Database {
    /// Compares the mapping of `T` with its table's columns.
    pub async fn check_model<T: Model>() -> Result<ModelCheck, Error> {
        let meta = metadata::<T>()?;
        let columns = Self::columns(&meta.table).await?;
        Ok(ModelCheck::compare(&meta, &columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PropertyInfo;

    #[derive(Default)]
    struct Client {
        client_id: i32,
        name: String,
    }

    impl Model for Client {
        fn type_name() -> &'static str {
            "Client"
        }

        fn properties() -> Vec<PropertyInfo> {
            let property = |name| PropertyInfo {
                name,
                column: None,
                is_primary_key: false,
                is_nullable: false,
                foreign_table: None,
                foreign_key: None,
            };
            vec![property("client_id"), property("name"), property("nickname")]
        }

        fn set_property(&mut self, property: &str, value: &crate::Value) -> Result<(), Error> {
            match property {
                "client_id" => self.client_id = crate::model::decode_property("Client", property, value)?,
                "name" => self.name = crate::model::decode_property("Client", property, value)?,
                _ => {}
            }
            Ok(())
        }
    }

    fn column(name: &str, nullable: bool) -> ColumnSchema {
        ColumnSchema {
            column_name: name.to_string(),
            data_type: "text".to_string(),
            udt_name: "text".to_string(),
            is_nullable: nullable,
            column_default: None,
            ordinal_position: 0,
        }
    }

    #[test]
    fn reports_every_kind_of_drift() {
        let meta = metadata::<Client>().unwrap();
        let check = ModelCheck::compare(
            &meta,
            &[column("client_id", false), column("name", true), column("created_at", false)],
        );

        assert!(check.table_found);
        assert_eq!(check.table, "client");
        assert_eq!(check.missing_in_db, vec!["nickname".to_string()]);
        assert_eq!(check.extra_in_db, vec!["created_at".to_string()]);
        assert_eq!(check.nullable_mismatches, vec!["name".to_string()]);
        assert!(!check.is_valid());
    }

    #[test]
    fn missing_table_is_invalid() {
        let meta = metadata::<Client>().unwrap();
        let check = ModelCheck::compare(&meta, &[]);

        assert!(!check.table_found);
        assert!(check.missing_in_db.is_empty());
        assert!(!check.is_valid());
    }
}
