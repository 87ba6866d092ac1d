use pgmodel::{Database, DatabaseConfig, Error};

// Nothing in this test binary ever connects successfully, so the shared state
// never holds remembered parameters.

fn connection_message(err: Error) -> String {
    match err {
        Error::Connection(msg) => msg,
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn connect_without_parameters_fails() {
    let err = Database::connect().await.unwrap_err();
    assert_eq!(connection_message(err), "A valid host name was not provided!");
}

#[tokio::test]
async fn facade_queries_require_a_connection() {
    let err = Database::select("option", &[], None).await.unwrap_err();
    assert_eq!(connection_message(err), "A valid host name was not provided!");

    let err = Database::select_where("option", "code = 'SITE_NAME'", &["code"], None).await.unwrap_err();
    assert_eq!(connection_message(err), "A valid host name was not provided!");
}

#[tokio::test]
async fn builder_reports_the_first_missing_parameter() {
    let err = Database::builder().host("localhost").connect().await.unwrap_err();
    assert_eq!(connection_message(err), "A valid port number was not provided!");

    let err = Database::builder()
        .host("localhost")
        .port(5432)
        .dbname("ucrm")
        .user("ucrm")
        .connect()
        .await
        .unwrap_err();
    assert_eq!(connection_message(err), "A valid password was not provided!");
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let config = DatabaseConfig {
        host: Some("pgmodel.invalid".to_string()),
        port: Some(5432),
        dbname: Some("ucrm".to_string()),
        user: Some("ucrm".to_string()),
        password: Some("secret".to_string()),
    };

    let err = pgmodel::DatabaseBuilder::from_config(config).connect().await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}
