use aisthesis_model::{IdKind, StoreResult};
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;

mod m20260101_000001_init;

pub struct Migrator;

impl Migrator {
    /// Applies the schema for the configured id representation. The id kind
    /// shapes the key columns, so migrations run through this entry point
    /// instead of the static migrator list.
    pub async fn up(conn: &DatabaseConnection, kind: IdKind) -> StoreResult<()> {
        let manager = SchemaManager::new(conn);
        let init = m20260101_000001_init::Migration { kind };
        init.up(&manager).await?;
        Ok(())
    }

    pub async fn down(conn: &DatabaseConnection, kind: IdKind) -> StoreResult<()> {
        let manager = SchemaManager::new(conn);
        let init = m20260101_000001_init::Migration { kind };
        init.down(&manager).await?;
        Ok(())
    }
}
