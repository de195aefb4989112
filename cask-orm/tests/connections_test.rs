use cask_orm::{ConnectionManager, ConnectionsConfig, Database, Error, Model, attributes};

#[derive(Debug, Model)]
#[orm(connection = "reports", timestamps = false)]
struct Report {
    #[orm(primary_key)]
    id: Option<i64>,
    name: String,
}

#[derive(Debug, Model)]
#[orm(table = "app_settings", timestamps = false)]
struct Setting {
    #[orm(primary_key)]
    id: Option<i64>,
    key: String,
}

async fn memory(name: &str) -> Result<Database, Error> {
    Database::builder().max_connections(1).name(name).connect("sqlite::memory:").await
}

#[tokio::test]
async fn test_models_use_their_named_connection() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();

    let primary = memory("primary").await?;
    let reports = memory("reports").await?;
    primary.raw("CREATE TABLE app_settings (id INTEGER PRIMARY KEY AUTOINCREMENT, key TEXT NOT NULL)").execute().await?;
    reports.raw("CREATE TABLE reports (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)").execute().await?;

    let manager = ConnectionManager::new(primary).with(reports);
    assert_eq!(manager.for_model::<Report>()?.name(), "reports");
    assert_eq!(manager.for_model::<Setting>()?.name(), "primary");

    manager.model::<Report>()?.create(attributes! { "name" => "q1" }).await?;
    manager.model::<Setting>()?.create(attributes! { "key" => "theme" }).await?;

    assert_eq!(manager.get("reports")?.model::<Report>().count().await?, 1);
    assert_eq!(manager.default_database().model::<Setting>().count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_missing_connection_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConnectionManager::new(memory("primary").await?);

    assert!(matches!(manager.model::<Report>(), Err(Error::UnknownConnection(ref name)) if name == "reports"));
    assert!(manager.get("archive").is_err());
    Ok(())
}

#[tokio::test]
async fn test_connect_from_json_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConnectionsConfig::from_json(
        r#"{
            "default": "primary",
            "connections": {
                "primary": { "url": "sqlite::memory:", "max_connections": 1 },
                "reports": { "url": "sqlite::memory:", "max_connections": 1 }
            }
        }"#,
    )?;

    let manager = ConnectionManager::connect(&config).await?;
    assert_eq!(manager.default_database().name(), "primary");
    assert_eq!(manager.for_model::<Report>()?.name(), "reports");
    Ok(())
}
