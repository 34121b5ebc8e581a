use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query, SelectStatement, SimpleExpr};
use sea_orm::{DatabaseTransaction, QueryResult};

use aisthesis_model::{
    Assigned, ChangeDescription, EntityProperty, EntityType, Id, Sensor, StoreError, StoreResult,
};

use crate::db::Sensors;
use crate::factories::{exec, read_string, EntityFactories, EntityFactory};
use crate::query::EntityQuery;

pub struct SensorFactory<'a> {
    pub(crate) factories: &'a EntityFactories,
}

pub(crate) fn base_select() -> SelectStatement {
    Query::select()
        .from(Sensors::Table)
        .columns([
            Sensors::Id,
            Sensors::Name,
            Sensors::Description,
            Sensors::EncodingType,
            Sensors::Metadata,
        ])
        .to_owned()
}

#[async_trait]
impl EntityFactory for SensorFactory<'_> {
    type Entity = Sensor;

    fn entity_type(&self) -> EntityType {
        EntityType::Sensor
    }

    fn from_row(&self, row: &QueryResult, query: &EntityQuery) -> StoreResult<Sensor> {
        let mut entity = Sensor::default();
        entity.id = self.factories.read_opt_id(row, Sensors::Id)?;
        if let Some(name) = read_string(row, Sensors::Name)? {
            entity.name = Assigned::some(name);
        }
        if let Some(description) = read_string(row, Sensors::Description)? {
            entity.description = Assigned::some(description);
        }
        if let Some(encoding_type) = read_string(row, Sensors::EncodingType)? {
            entity.encoding_type = Assigned::some(encoding_type);
        }
        if query.wants(EntityProperty::Metadata) {
            if let Some(metadata) = read_string(row, Sensors::Metadata)? {
                entity.metadata = Assigned::some(metadata);
            }
        }
        Ok(entity)
    }

    async fn insert(&self, tx: &DatabaseTransaction, entity: &mut Sensor) -> StoreResult<Id> {
        let f = self.factories;
        let name = entity
            .name
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("name must be set"))?;
        let description = entity
            .description
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("description must be set"))?;
        let encoding_type = entity
            .encoding_type
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("encodingType must be set"))?;
        let metadata = entity
            .metadata
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("metadata must be set"))?;

        let mut columns = vec![
            Sensors::Name,
            Sensors::Description,
            Sensors::EncodingType,
            Sensors::Metadata,
        ];
        let mut values: Vec<SimpleExpr> = vec![
            name.into(),
            description.into(),
            encoding_type.into(),
            metadata.into(),
        ];
        let staged_id =
            f.stage_insert_id(Sensors::Id, entity.id.as_ref(), &mut columns, &mut values)?;
        let stmt = Query::insert()
            .into_table(Sensors::Table)
            .columns(columns)
            .values_panic(values)
            .to_owned();
        let result = exec(tx, &stmt).await?;
        let id = f.finish_insert_id(staged_id, &result);
        log::debug!("inserted Sensor {id}");
        entity.id = Some(id.clone());
        Ok(id)
    }

    async fn update(
        &self,
        tx: &DatabaseTransaction,
        entity: &Sensor,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let f = self.factories;
        let mut change = ChangeDescription::default();
        let mut staged: Vec<(Sensors, SimpleExpr)> = Vec::new();
        if entity.name.is_set() {
            let name = entity
                .name
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("name must not be null"))?;
            staged.push((Sensors::Name, name.into()));
            change.add_property(EntityProperty::Name);
        }
        if entity.description.is_set() {
            let description = entity
                .description
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("description must not be null"))?;
            staged.push((Sensors::Description, description.into()));
            change.add_property(EntityProperty::Description);
        }
        if entity.encoding_type.is_set() {
            let encoding_type = entity
                .encoding_type
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("encodingType must not be null"))?;
            staged.push((Sensors::EncodingType, encoding_type.into()));
            change.add_property(EntityProperty::EncodingType);
        }
        if entity.metadata.is_set() {
            let metadata = entity
                .metadata
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("metadata must not be null"))?;
            staged.push((Sensors::Metadata, metadata.into()));
            change.add_property(EntityProperty::Metadata);
        }
        if !staged.is_empty() {
            let stmt = Query::update()
                .table(Sensors::Table)
                .values(staged)
                .and_where(Expr::col(Sensors::Id).eq(f.id_value(id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count != 1 {
                log::error!("updating Sensor {id} touched {count} rows");
                return Err(StoreError::illegal_state(
                    "update changed an unexpected number of rows",
                ));
            }
        }
        log::debug!("updated Sensor {id}");
        Ok(change)
    }

    async fn delete(&self, tx: &DatabaseTransaction, id: &Id) -> StoreResult<()> {
        let stmt = Query::delete()
            .from_table(Sensors::Table)
            .and_where(Expr::col(Sensors::Id).eq(self.factories.id_value(id)))
            .to_owned();
        let count = exec(tx, &stmt).await?.rows_affected();
        if count == 0 {
            return Err(StoreError::no_such_entity(format!("Sensor {id} not found")));
        }
        Ok(())
    }
}
