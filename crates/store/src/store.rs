use std::path::Path;
use std::time::Duration;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, TransactionTrait,
};

use aisthesis_model::{
    check_complete, ChangeDescription, Entity, EntityType, Id, IdCodec, Observation, StoreError,
    StoreResult, WriteContext,
};

use crate::config::{DatabaseConfig, StoreConfig};
use crate::db::Observations;
use crate::expression::observation_field;
use crate::factories::{
    datastream, feature, multi_datastream, observation, observed_property, query_all, query_one,
    sensor, thing, EntityFactories, EntityFactory,
};
use crate::migration::Migrator;
use crate::query::EntityQuery;

/// A stream reference for filtering observation reads.
#[derive(Clone, Copy, Debug)]
pub enum StreamRef<'a> {
    Datastream(&'a Id),
    MultiDatastream(&'a Id),
}

/// The persistence handle: one connection pool, the backend it talks to,
/// and the factory registry bound to the deployment's id codec.
#[derive(Clone)]
pub struct SensorStore {
    conn: DatabaseConnection,
    backend: DatabaseBackend,
    factories: EntityFactories,
}

impl SensorStore {
    pub async fn connect(config: &StoreConfig, base_dir: &Path) -> StoreResult<Self> {
        let url = build_connection_url(config, base_dir)?;
        let mut options = ConnectOptions::new(url);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        let conn = Database::connect(options).await.map_err(StoreError::from)?;
        let backend = conn.get_database_backend();
        let factories = EntityFactories::new(backend, IdCodec::new(config.id_kind));
        let store = Self {
            conn,
            backend,
            factories,
        };
        Migrator::up(&store.conn, config.id_kind).await?;
        Ok(store)
    }

    pub async fn connect_sqlite(path: &Path) -> StoreResult<Self> {
        let config = StoreConfig::default_sqlite(path.to_string_lossy());
        Self::connect(&config, path.parent().unwrap_or_else(|| Path::new("."))).await
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn factories(&self) -> &EntityFactories {
        &self.factories
    }

    pub fn id_codec(&self) -> IdCodec {
        self.factories.ids()
    }

    /// Gates the write through the completeness validator, resolves
    /// references, writes inside one transaction, and assigns the generated
    /// id back onto the entity.
    pub async fn insert_entity(
        &self,
        entity: &mut Entity,
        context: &WriteContext,
    ) -> StoreResult<Id> {
        check_complete(entity, context, false)?;
        let tx = self.conn.begin().await?;
        let id = self.insert_in_tx(&tx, entity).await?;
        tx.commit().await?;
        Ok(id)
    }

    pub async fn insert_in_tx(
        &self,
        tx: &DatabaseTransaction,
        entity: &mut Entity,
    ) -> StoreResult<Id> {
        let f = &self.factories;
        match entity {
            Entity::Thing(entity) => f.things().insert(tx, entity).await,
            Entity::Sensor(entity) => f.sensors().insert(tx, entity).await,
            Entity::ObservedProperty(entity) => f.observed_properties().insert(tx, entity).await,
            Entity::FeatureOfInterest(entity) => f.features().insert(tx, entity).await,
            Entity::Datastream(entity) => f.datastreams().insert(tx, entity).await,
            Entity::MultiDatastream(entity) => f.multi_datastreams().insert(tx, entity).await,
            Entity::Observation(entity) => f.observations().insert(tx, entity).await,
        }
    }

    /// Applies the explicitly set fields of `entity` to the stored row and
    /// reports what changed for the caller's notification transport.
    pub async fn update_entity(
        &self,
        entity: &Entity,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let tx = self.conn.begin().await?;
        let change = self.update_in_tx(&tx, entity, id).await?;
        tx.commit().await?;
        Ok(change)
    }

    pub async fn update_in_tx(
        &self,
        tx: &DatabaseTransaction,
        entity: &Entity,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let f = &self.factories;
        match entity {
            Entity::Thing(entity) => f.things().update(tx, entity, id).await,
            Entity::Sensor(entity) => f.sensors().update(tx, entity, id).await,
            Entity::ObservedProperty(entity) => {
                f.observed_properties().update(tx, entity, id).await
            }
            Entity::FeatureOfInterest(entity) => f.features().update(tx, entity, id).await,
            Entity::Datastream(entity) => f.datastreams().update(tx, entity, id).await,
            Entity::MultiDatastream(entity) => {
                f.multi_datastreams().update(tx, entity, id).await
            }
            Entity::Observation(entity) => f.observations().update(tx, entity, id).await,
        }
    }

    pub async fn delete_entity(&self, entity_type: EntityType, id: &Id) -> StoreResult<()> {
        let tx = self.conn.begin().await?;
        self.delete_in_tx(&tx, entity_type, id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_in_tx(
        &self,
        tx: &DatabaseTransaction,
        entity_type: EntityType,
        id: &Id,
    ) -> StoreResult<()> {
        let f = &self.factories;
        match entity_type {
            EntityType::Thing => f.things().delete(tx, id).await,
            EntityType::Sensor => f.sensors().delete(tx, id).await,
            EntityType::ObservedProperty => f.observed_properties().delete(tx, id).await,
            EntityType::FeatureOfInterest => f.features().delete(tx, id).await,
            EntityType::Datastream => f.datastreams().delete(tx, id).await,
            EntityType::MultiDatastream => f.multi_datastreams().delete(tx, id).await,
            EntityType::Observation => f.observations().delete(tx, id).await,
        }
    }

    /// Fetches one entity by primary key, populating the properties the
    /// query selects.
    pub async fn get_entity(
        &self,
        entity_type: EntityType,
        id: &Id,
        query: &EntityQuery,
    ) -> StoreResult<Option<Entity>> {
        let f = &self.factories;
        let id = f.id_value(id);
        match entity_type {
            EntityType::Thing => {
                let mut stmt = thing::base_select();
                stmt.and_where(Expr::col(crate::db::Things::Id).eq(id));
                match query_one(&self.conn, &stmt).await? {
                    Some(row) => Ok(Some(Entity::Thing(f.things().from_row(&row, query)?))),
                    None => Ok(None),
                }
            }
            EntityType::Sensor => {
                let mut stmt = sensor::base_select();
                stmt.and_where(Expr::col(crate::db::Sensors::Id).eq(id));
                match query_one(&self.conn, &stmt).await? {
                    Some(row) => Ok(Some(Entity::Sensor(f.sensors().from_row(&row, query)?))),
                    None => Ok(None),
                }
            }
            EntityType::ObservedProperty => {
                let mut stmt = observed_property::base_select();
                stmt.and_where(Expr::col(crate::db::ObsProperties::Id).eq(id));
                match query_one(&self.conn, &stmt).await? {
                    Some(row) => Ok(Some(Entity::ObservedProperty(
                        f.observed_properties().from_row(&row, query)?,
                    ))),
                    None => Ok(None),
                }
            }
            EntityType::FeatureOfInterest => {
                let mut stmt = feature::base_select();
                stmt.and_where(Expr::col(crate::db::Features::Id).eq(id));
                match query_one(&self.conn, &stmt).await? {
                    Some(row) => Ok(Some(Entity::FeatureOfInterest(
                        f.features().from_row(&row, query)?,
                    ))),
                    None => Ok(None),
                }
            }
            EntityType::Datastream => {
                let mut stmt = datastream::base_select();
                stmt.and_where(Expr::col(crate::db::Datastreams::Id).eq(id));
                match query_one(&self.conn, &stmt).await? {
                    Some(row) => Ok(Some(Entity::Datastream(
                        f.datastreams().from_row(&row, query)?,
                    ))),
                    None => Ok(None),
                }
            }
            EntityType::MultiDatastream => {
                let mut stmt = multi_datastream::base_select();
                stmt.and_where(Expr::col(crate::db::MultiDatastreams::Id).eq(id));
                match query_one(&self.conn, &stmt).await? {
                    Some(row) => Ok(Some(Entity::MultiDatastream(
                        f.multi_datastreams().from_row(&row, query)?,
                    ))),
                    None => Ok(None),
                }
            }
            EntityType::Observation => {
                let mut stmt = observation::base_select();
                stmt.and_where(Expr::col(Observations::Id).eq(id));
                match query_one(&self.conn, &stmt).await? {
                    Some(row) => Ok(Some(Entity::Observation(
                        f.observations().from_row(&row, query)?,
                    ))),
                    None => Ok(None),
                }
            }
        }
    }

    /// Observations of one stream (or all), ordered by the query's logical
    /// properties through the field-wrapper layer, with the primary key as
    /// the stable tail.
    pub async fn list_observations(
        &self,
        stream: Option<StreamRef<'_>>,
        query: &EntityQuery,
    ) -> StoreResult<Vec<Observation>> {
        let f = &self.factories;
        let mut stmt = observation::base_select();
        match stream {
            Some(StreamRef::Datastream(id)) => {
                stmt.and_where(Expr::col(Observations::DatastreamId).eq(f.id_value(id)));
            }
            Some(StreamRef::MultiDatastream(id)) => {
                stmt.and_where(Expr::col(Observations::MultiDatastreamId).eq(f.id_value(id)));
            }
            None => {}
        }
        for order in &query.order_by {
            let wrapper = observation_field(order.property).ok_or_else(|| {
                StoreError::invalid_argument(format!(
                    "cannot order observations by {}",
                    order.property.json_name()
                ))
            })?;
            stmt.order_by_expr(wrapper.default_expr(), order.order.into());
        }
        stmt.order_by(Observations::Id, sea_orm::sea_query::Order::Asc);
        let rows = query_all(&self.conn, &stmt).await?;
        let factory = f.observations();
        rows.iter().map(|row| factory.from_row(row, query)).collect()
    }
}

fn build_connection_url(config: &StoreConfig, base_dir: &Path) -> StoreResult<String> {
    match &config.database {
        DatabaseConfig::Sqlite { .. } => {
            let path = config.sqlite_path(base_dir)?;
            Ok(format!("sqlite://{}?mode=rwc", path.display()))
        }
        DatabaseConfig::Postgres { url } => Ok(url.clone()),
        DatabaseConfig::Mysql { url } => Ok(url.clone()),
    }
}
