use async_trait::async_trait;
use sea_orm::sea_query;
use sea_orm::sea_query::{
    Alias, Expr, Func, MysqlQueryBuilder, Order, PostgresQueryBuilder, Query,
    QueryStatementWriter, SelectStatement, SqliteQueryBuilder, Value as SeaValue,
};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseTransaction, ExecResult, QueryResult, Statement,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use aisthesis_model::{
    check_complete, ChangeDescription, Datastream, Entity, EntityType, FeatureOfInterest, Id,
    IdCodec, IdKind, MultiDatastream, Observation, ObservedProperty, Sensor, StoreError,
    StoreResult, Thing, WriteContext,
};

use crate::db::*;
use crate::query::EntityQuery;

pub(crate) mod datastream;
pub(crate) mod feature;
pub(crate) mod multi_datastream;
pub(crate) mod observation;
pub(crate) mod observed_property;
pub(crate) mod sensor;
pub(crate) mod thing;

pub use datastream::DatastreamFactory;
pub use feature::FeatureFactory;
pub use multi_datastream::MultiDatastreamFactory;
pub use observation::ObservationFactory;
pub use observed_property::ObservedPropertyFactory;
pub use sensor::SensorFactory;
pub use thing::ThingFactory;

/// Converts fetched rows to entities and entities to column assignments,
/// one implementation per entity kind.
#[async_trait]
pub trait EntityFactory {
    type Entity;

    fn entity_type(&self) -> EntityType;

    /// Maps a row onto an entity, honoring the query's select list. Null
    /// related-entity ids leave the navigation property absent.
    fn from_row(&self, row: &QueryResult, query: &EntityQuery) -> StoreResult<Self::Entity>;

    /// Resolves or creates every referenced entity, writes the row, and
    /// assigns the generated id back onto the entity.
    async fn insert(&self, tx: &DatabaseTransaction, entity: &mut Self::Entity) -> StoreResult<Id>;

    /// Stages a column assignment for every explicitly set field and writes
    /// the row once, only if anything was staged.
    async fn update(
        &self,
        tx: &DatabaseTransaction,
        entity: &Self::Entity,
        id: &Id,
    ) -> StoreResult<ChangeDescription>;

    async fn delete(&self, tx: &DatabaseTransaction, id: &Id) -> StoreResult<()>;
}

/// The factory registry and referential resolver: cross-entity existence
/// checks, resolve-or-create, id encoding, and FeatureOfInterest
/// derivation all live here.
#[derive(Clone, Copy, Debug)]
pub struct EntityFactories {
    backend: DatabaseBackend,
    ids: IdCodec,
}

impl EntityFactories {
    pub fn new(backend: DatabaseBackend, ids: IdCodec) -> Self {
        Self { backend, ids }
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn ids(&self) -> IdCodec {
        self.ids
    }

    pub fn things(&self) -> ThingFactory<'_> {
        ThingFactory { factories: self }
    }

    pub fn sensors(&self) -> SensorFactory<'_> {
        SensorFactory { factories: self }
    }

    pub fn observed_properties(&self) -> ObservedPropertyFactory<'_> {
        ObservedPropertyFactory { factories: self }
    }

    pub fn features(&self) -> FeatureFactory<'_> {
        FeatureFactory { factories: self }
    }

    pub fn datastreams(&self) -> DatastreamFactory<'_> {
        DatastreamFactory { factories: self }
    }

    pub fn multi_datastreams(&self) -> MultiDatastreamFactory<'_> {
        MultiDatastreamFactory { factories: self }
    }

    pub fn observations(&self) -> ObservationFactory<'_> {
        ObservationFactory { factories: self }
    }

    /// True only when the reference carries an id and a row with that id
    /// exists.
    pub async fn entity_exists<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_type: EntityType,
        id: Option<&Id>,
    ) -> StoreResult<bool> {
        let Some(id) = id else {
            return Ok(false);
        };
        let id = self.id_value(id);
        let stmt = match entity_type {
            EntityType::Thing => exists_stmt(Things::Table, Things::Id, id),
            EntityType::Sensor => exists_stmt(Sensors::Table, Sensors::Id, id),
            EntityType::ObservedProperty => {
                exists_stmt(ObsProperties::Table, ObsProperties::Id, id)
            }
            EntityType::FeatureOfInterest => exists_stmt(Features::Table, Features::Id, id),
            EntityType::Datastream => exists_stmt(Datastreams::Table, Datastreams::Id, id),
            EntityType::MultiDatastream => {
                exists_stmt(MultiDatastreams::Table, MultiDatastreams::Id, id)
            }
            EntityType::Observation => exists_stmt(Observations::Table, Observations::Id, id),
        };
        Ok(query_one(conn, &stmt).await?.is_some())
    }

    pub async fn thing_exists_or_create(
        &self,
        tx: &DatabaseTransaction,
        thing: &mut Thing,
    ) -> StoreResult<Id> {
        match &thing.id {
            Some(id) => {
                if !self.entity_exists(tx, EntityType::Thing, Some(id)).await? {
                    return Err(StoreError::no_such_entity(format!("Thing {id} not found")));
                }
                Ok(id.clone())
            }
            None => {
                check_complete(
                    &Entity::Thing(thing.clone()),
                    &WriteContext::collection(EntityType::Thing),
                    false,
                )?;
                self.things().insert(tx, thing).await
            }
        }
    }

    pub async fn sensor_exists_or_create(
        &self,
        tx: &DatabaseTransaction,
        sensor: &mut Sensor,
    ) -> StoreResult<Id> {
        match &sensor.id {
            Some(id) => {
                if !self.entity_exists(tx, EntityType::Sensor, Some(id)).await? {
                    return Err(StoreError::no_such_entity(format!("Sensor {id} not found")));
                }
                Ok(id.clone())
            }
            None => {
                check_complete(
                    &Entity::Sensor(sensor.clone()),
                    &WriteContext::collection(EntityType::Sensor),
                    false,
                )?;
                self.sensors().insert(tx, sensor).await
            }
        }
    }

    pub async fn observed_property_exists_or_create(
        &self,
        tx: &DatabaseTransaction,
        property: &mut ObservedProperty,
    ) -> StoreResult<Id> {
        match &property.id {
            Some(id) => {
                if !self
                    .entity_exists(tx, EntityType::ObservedProperty, Some(id))
                    .await?
                {
                    return Err(StoreError::no_such_entity(format!(
                        "ObservedProperty {id} not found"
                    )));
                }
                Ok(id.clone())
            }
            None => {
                check_complete(
                    &Entity::ObservedProperty(property.clone()),
                    &WriteContext::collection(EntityType::ObservedProperty),
                    false,
                )?;
                self.observed_properties().insert(tx, property).await
            }
        }
    }

    pub async fn feature_exists_or_create(
        &self,
        tx: &DatabaseTransaction,
        feature: &mut FeatureOfInterest,
    ) -> StoreResult<Id> {
        match &feature.id {
            Some(id) => {
                if !self
                    .entity_exists(tx, EntityType::FeatureOfInterest, Some(id))
                    .await?
                {
                    return Err(StoreError::no_such_entity(format!(
                        "FeatureOfInterest {id} not found"
                    )));
                }
                Ok(id.clone())
            }
            None => {
                check_complete(
                    &Entity::FeatureOfInterest(feature.clone()),
                    &WriteContext::collection(EntityType::FeatureOfInterest),
                    false,
                )?;
                self.features().insert(tx, feature).await
            }
        }
    }

    pub async fn datastream_exists_or_create(
        &self,
        tx: &DatabaseTransaction,
        stream: &mut Datastream,
    ) -> StoreResult<Id> {
        match &stream.id {
            Some(id) => {
                if !self
                    .entity_exists(tx, EntityType::Datastream, Some(id))
                    .await?
                {
                    return Err(StoreError::no_such_entity(format!(
                        "Datastream {id} not found"
                    )));
                }
                Ok(id.clone())
            }
            None => {
                check_complete(
                    &Entity::Datastream(stream.clone()),
                    &WriteContext::collection(EntityType::Datastream),
                    false,
                )?;
                self.datastreams().insert(tx, stream).await
            }
        }
    }

    pub async fn multi_datastream_exists_or_create(
        &self,
        tx: &DatabaseTransaction,
        stream: &mut MultiDatastream,
    ) -> StoreResult<Id> {
        match &stream.id {
            Some(id) => {
                if !self
                    .entity_exists(tx, EntityType::MultiDatastream, Some(id))
                    .await?
                {
                    return Err(StoreError::no_such_entity(format!(
                        "MultiDatastream {id} not found"
                    )));
                }
                Ok(id.clone())
            }
            None => {
                check_complete(
                    &Entity::MultiDatastream(stream.clone()),
                    &WriteContext::collection(EntityType::MultiDatastream),
                    false,
                )?;
                self.multi_datastreams().insert(tx, stream).await
            }
        }
    }

    /// Derives a FeatureOfInterest for an observation that omitted one by
    /// reusing the feature of the stream's most recent observation. No
    /// other fallback exists; absence is an incomplete-entity failure.
    pub async fn generate_feature_of_interest<C: ConnectionTrait>(
        &self,
        conn: &C,
        stream_id: &Id,
        is_multi: bool,
    ) -> StoreResult<Id> {
        let stream_col = if is_multi {
            Observations::MultiDatastreamId
        } else {
            Observations::DatastreamId
        };
        let stmt = Query::select()
            .from(Observations::Table)
            .column(Observations::FeatureId)
            .and_where(Expr::col(stream_col).eq(self.id_value(stream_id)))
            .order_by(Observations::PhenomenonTimeStart, Order::Desc)
            .order_by(Observations::Id, Order::Desc)
            .limit(1)
            .to_owned();
        match query_one(conn, &stmt).await? {
            Some(row) => self.read_id(&row, Observations::FeatureId),
            None => Err(StoreError::incomplete(
                "no FeatureOfInterest provided and none can be derived from earlier observations",
            )),
        }
    }

    /// Number of ObservedProperty rows linked to a MultiDatastream.
    pub async fn count_observed_properties<C: ConnectionTrait>(
        &self,
        conn: &C,
        stream_id: &Id,
    ) -> StoreResult<i64> {
        let stmt = Query::select()
            .from(MultiDatastreamsObsProperties::Table)
            .expr_as(
                Func::count(Expr::col(MultiDatastreamsObsProperties::ObsPropertyId)),
                Alias::new("cnt"),
            )
            .and_where(
                Expr::col(MultiDatastreamsObsProperties::MultiDatastreamId)
                    .eq(self.id_value(stream_id)),
            )
            .to_owned();
        match query_one(conn, &stmt).await? {
            Some(row) => Ok(row.try_get::<i64>("", "cnt")?),
            None => Ok(0),
        }
    }

    pub async fn get_observation<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &Id,
    ) -> StoreResult<Option<Observation>> {
        let mut stmt = observation::base_select();
        stmt.and_where(Expr::col(Observations::Id).eq(self.id_value(id)));
        match query_one(conn, &stmt).await? {
            Some(row) => Ok(Some(
                self.observations().from_row(&row, &EntityQuery::default())?,
            )),
            None => Ok(None),
        }
    }

    pub async fn get_multi_datastream<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &Id,
    ) -> StoreResult<Option<MultiDatastream>> {
        let mut stmt = multi_datastream::base_select();
        stmt.and_where(Expr::col(MultiDatastreams::Id).eq(self.id_value(id)));
        match query_one(conn, &stmt).await? {
            Some(row) => Ok(Some(
                self.multi_datastreams()
                    .from_row(&row, &EntityQuery::default())?,
            )),
            None => Ok(None),
        }
    }

    pub(crate) fn id_value(&self, id: &Id) -> SeaValue {
        match id {
            Id::Long(value) => (*value).into(),
            Id::Uuid(value) => match self.backend {
                DatabaseBackend::Postgres => (*value).into(),
                _ => value.to_string().into(),
            },
            Id::Text(value) => value.clone().into(),
        }
    }

    pub(crate) fn none_id_value(&self) -> SeaValue {
        match self.ids.kind() {
            IdKind::Long => Option::<i64>::None.into(),
            IdKind::Uuid => match self.backend {
                DatabaseBackend::Postgres => Option::<Uuid>::None.into(),
                _ => Option::<String>::None.into(),
            },
            IdKind::Text => Option::<String>::None.into(),
        }
    }

    pub(crate) fn read_opt_id(
        &self,
        row: &QueryResult,
        column: impl sea_query::Iden,
    ) -> StoreResult<Option<Id>> {
        let name = col_name(column);
        match self.ids.kind() {
            IdKind::Long => Ok(row.try_get::<Option<i64>>("", &name)?.map(Id::Long)),
            IdKind::Uuid => {
                if let Ok(value) = row.try_get::<Option<Uuid>>("", &name) {
                    return Ok(value.map(Id::Uuid));
                }
                row.try_get::<Option<String>>("", &name)?
                    .map(|raw| {
                        Uuid::parse_str(&raw).map(Id::Uuid).map_err(|err| {
                            StoreError::storage(format!("invalid uuid in column {name}: {err}"))
                        })
                    })
                    .transpose()
            }
            IdKind::Text => Ok(row.try_get::<Option<String>>("", &name)?.map(Id::Text)),
        }
    }

    pub(crate) fn read_id(
        &self,
        row: &QueryResult,
        column: impl sea_query::Iden + Copy,
    ) -> StoreResult<Id> {
        self.read_opt_id(row, column)?.ok_or_else(|| {
            StoreError::storage(format!("missing id in column {}", col_name(column)))
        })
    }

    /// Stages the id column for an insert: a client-supplied id wins,
    /// otherwise the codec may generate one. `None` defers to the store's
    /// auto-increment key.
    pub(crate) fn stage_insert_id<C>(
        &self,
        id_col: C,
        user_id: Option<&Id>,
        columns: &mut Vec<C>,
        values: &mut Vec<sea_query::SimpleExpr>,
    ) -> StoreResult<Option<Id>> {
        if let Some(id) = user_id {
            if !self.ids.accepts(id) {
                return Err(StoreError::invalid_id(format!(
                    "id {id} does not match the configured id representation"
                )));
            }
        }
        let id = user_id.cloned().or_else(|| self.ids.generate());
        if let Some(id) = &id {
            columns.push(id_col);
            values.push(self.id_value(id).into());
        }
        Ok(id)
    }

    pub(crate) fn finish_insert_id(&self, staged: Option<Id>, result: &ExecResult) -> Id {
        match staged {
            Some(id) => id,
            None => Id::Long(result.last_insert_id() as i64),
        }
    }
}

fn exists_stmt<T, C>(table: T, column: C, id: SeaValue) -> SelectStatement
where
    T: sea_query::IntoTableRef,
    C: sea_query::IntoColumnRef + Copy,
{
    Query::select()
        .from(table)
        .column(column)
        .and_where(Expr::col(column).eq(id))
        .limit(1)
        .to_owned()
}

pub(crate) fn col_name(column: impl sea_query::Iden) -> String {
    column.to_string()
}

pub(crate) fn json_or_empty(value: Option<&JsonValue>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string())
}

pub(crate) fn parse_json(raw: Option<String>) -> Option<JsonValue> {
    raw.and_then(|raw| serde_json::from_str(&raw).ok())
}

pub(crate) fn read_string(
    row: &QueryResult,
    column: impl sea_query::Iden,
) -> StoreResult<Option<String>> {
    Ok(row.try_get("", &col_name(column))?)
}

pub(crate) fn read_i64(
    row: &QueryResult,
    column: impl sea_query::Iden,
) -> StoreResult<Option<i64>> {
    Ok(row.try_get("", &col_name(column))?)
}

pub(crate) fn read_i16(
    row: &QueryResult,
    column: impl sea_query::Iden,
) -> StoreResult<Option<i16>> {
    Ok(row.try_get("", &col_name(column))?)
}

pub(crate) fn read_f64(
    row: &QueryResult,
    column: impl sea_query::Iden,
) -> StoreResult<Option<f64>> {
    Ok(row.try_get("", &col_name(column))?)
}

pub(crate) fn read_bool(
    row: &QueryResult,
    column: impl sea_query::Iden,
) -> StoreResult<Option<bool>> {
    Ok(row.try_get("", &col_name(column))?)
}

fn build_stmt<S: QueryStatementWriter>(
    backend: DatabaseBackend,
    stmt: &S,
) -> (String, sea_orm::sea_query::Values) {
    match backend {
        DatabaseBackend::Sqlite => stmt.build(SqliteQueryBuilder),
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        DatabaseBackend::MySql => stmt.build(MysqlQueryBuilder),
        _ => stmt.build(SqliteQueryBuilder),
    }
}

pub(crate) async fn exec<C, S>(conn: &C, stmt: &S) -> StoreResult<ExecResult>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let result = conn
        .execute(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(result)
}

pub(crate) async fn query_all<C, S>(conn: &C, stmt: &S) -> StoreResult<Vec<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let rows = conn
        .query_all(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(rows)
}

pub(crate) async fn query_one<C, S>(conn: &C, stmt: &S) -> StoreResult<Option<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let row = conn
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(row)
}
