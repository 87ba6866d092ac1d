use chrono::{DateTime, Utc};
use pgmodel::{Error, Model, Record, Value};
use serde_json::json;

#[derive(Debug, Default, Model, PartialEq)]
#[orm(table = "option")]
struct AppOption {
    #[orm(column = "option_id", primary_key)]
    id: i32,
    code: String,
    value: Option<String>,
}

#[derive(Debug, Default, Model, PartialEq)]
struct UserGroup {
    #[orm(column = "group_id")]
    group_id: i32,
    name: String,
}

#[derive(Debug, Default, Model, PartialEq)]
struct General {
    general_id: i32,
    code: String,
    // Both fields receive the "value" column.
    value: Option<String>,
    #[orm(column = "value")]
    raw_value: Option<String>,
    #[orm(skip)]
    cached: bool,
}

#[derive(Debug, Default, Model, PartialEq)]
#[orm(table = "user")]
struct User {
    #[orm(column = "user_id", primary_key)]
    user_id: i32,
    #[orm(foreign_key = "user_group::group_id")]
    group_id: Option<i32>,
    r#type: String,
    created_at: DateTime<Utc>,
    backup_codes: Vec<String>,
    settings: Value,
}

#[derive(Debug, Default, Model)]
struct Empty {
    #[orm(skip)]
    ignored: i32,
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn table_names_come_from_annotation_or_struct_name() {
    assert_eq!(AppOption::table_name().unwrap(), "option");
    assert_eq!(User::table_name().unwrap(), "user");
    assert_eq!(UserGroup::table_name().unwrap(), "user_group");
    assert_eq!(General::table_name().unwrap(), "general");
}

#[test]
fn generated_properties_describe_fields() {
    let properties = User::properties();
    let names: Vec<_> = properties.iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["user_id", "group_id", "type", "created_at", "backup_codes", "settings"]);

    assert!(properties[0].is_primary_key);
    assert_eq!(properties[0].column, Some("user_id"));
    assert!(properties[1].is_nullable);
    assert_eq!(properties[1].foreign_table, Some("user_group"));
    assert_eq!(properties[1].foreign_key, Some("group_id"));
    assert!(!properties[2].is_nullable);

    assert_eq!(General::properties().len(), 4);
}

#[test]
fn column_names_resolve_from_columns_or_properties() {
    assert_eq!(AppOption::column_name("option_id").unwrap().as_deref(), Some("option_id"));
    assert_eq!(AppOption::column_name("id").unwrap().as_deref(), Some("option_id"));
    assert_eq!(AppOption::column_name("code").unwrap().as_deref(), Some("code"));
    assert_eq!(General::column_name("raw_value").unwrap().as_deref(), Some("value"));
    assert_eq!(AppOption::column_name("missing").unwrap(), None);
}

#[test]
fn hydrates_models_from_records() {
    let option = AppOption::from_record(&record(json!({
        "option_id": 7,
        "code": "SITE_NAME",
        "value": "UCRM",
    })))
    .unwrap();

    assert_eq!(option, AppOption { id: 7, code: "SITE_NAME".into(), value: Some("UCRM".into()) });
}

#[test]
fn null_and_absent_columns_keep_defaults() {
    let option = AppOption::from_record(&record(json!({ "option_id": 1, "value": null }))).unwrap();
    assert_eq!(option, AppOption { id: 1, code: String::new(), value: None });
}

#[test]
fn one_column_populates_every_mapped_property() {
    let general = General::from_record(&record(json!({
        "general_id": 3,
        "code": "APP_LOCALE",
        "value": "en_US",
    })))
    .unwrap();

    assert_eq!(general.value.as_deref(), Some("en_US"));
    assert_eq!(general.raw_value.as_deref(), Some("en_US"));
    assert!(!general.cached);
}

#[test]
fn decodes_rich_column_types() {
    let user = User::from_record(&record(json!({
        "user_id": 1,
        "group_id": 2,
        "type": "admin",
        "created_at": "2018-06-01T12:30:00Z",
        "backup_codes": ["a", "b"],
        "settings": { "theme": "dark" },
    })))
    .unwrap();

    assert_eq!(user.group_id, Some(2));
    assert_eq!(user.r#type, "admin");
    assert_eq!(user.created_at.to_rfc3339(), "2018-06-01T12:30:00+00:00");
    assert_eq!(user.backup_codes, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(user.settings["theme"], "dark");
}

#[test]
fn unmapped_column_is_a_missing_property() {
    let err = UserGroup::from_record(&record(json!({ "group_id": 1, "name": "Admins", "role": "x" }))).unwrap_err();

    match err {
        Error::MissingProperty { model, name } => {
            assert_eq!(model, "UserGroup");
            assert_eq!(name, "role");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn skipped_fields_are_not_columns() {
    let err = General::from_record(&record(json!({ "cached": true }))).unwrap_err();
    assert!(matches!(err, Error::MissingProperty { name, .. } if name == "cached"));
}

#[test]
fn mistyped_values_report_the_property() {
    let err = UserGroup::from_record(&record(json!({ "group_id": "one" }))).unwrap_err();

    match err {
        Error::PropertyDecode { model, property, .. } => {
            assert_eq!(model, "UserGroup");
            assert_eq!(property, "group_id");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn models_without_properties_cannot_be_used() {
    assert!(matches!(Empty::table_name(), Err(Error::ModelClass(_))));
    assert!(matches!(Empty::from_record(&Record::new()), Err(Error::ModelClass(_))));
    assert_eq!(Empty::default().ignored, 0);
}

#[tokio::test]
async fn unknown_where_column_fails_before_connecting() {
    let err = UserGroup::select_where("nope", pgmodel::Op::Eq, 1).await.unwrap_err();
    assert!(matches!(err, Error::MissingProperty { name, .. } if name == "nope"));
}
