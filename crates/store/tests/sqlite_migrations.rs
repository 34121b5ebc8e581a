use aisthesis_store::model::StoreResult;
use aisthesis_store::SensorStore;
use sea_orm::DatabaseBackend;
use tempfile::tempdir;

#[tokio::test]
async fn migrations_apply_and_are_idempotent() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("aisthesis.sqlite");
    let store = SensorStore::connect_sqlite(&path).await?;
    assert_eq!(store.backend(), DatabaseBackend::Sqlite);
    drop(store);

    // Reconnecting runs the migration again against the same file.
    let store = SensorStore::connect_sqlite(&path).await?;
    assert_eq!(store.backend(), DatabaseBackend::Sqlite);
    Ok(())
}
