use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query, SelectStatement, SimpleExpr};
use sea_orm::{DatabaseTransaction, QueryResult};

use aisthesis_model::{
    Assigned, ChangeDescription, EntityProperty, EntityType, Id, StoreError, StoreResult, Thing,
};

use crate::db::Things;
use crate::factories::{
    exec, json_or_empty, parse_json, read_string, EntityFactories, EntityFactory,
};
use crate::query::EntityQuery;

pub struct ThingFactory<'a> {
    pub(crate) factories: &'a EntityFactories,
}

pub(crate) fn base_select() -> SelectStatement {
    Query::select()
        .from(Things::Table)
        .columns([
            Things::Id,
            Things::Name,
            Things::Description,
            Things::Properties,
        ])
        .to_owned()
}

#[async_trait]
impl EntityFactory for ThingFactory<'_> {
    type Entity = Thing;

    fn entity_type(&self) -> EntityType {
        EntityType::Thing
    }

    fn from_row(&self, row: &QueryResult, query: &EntityQuery) -> StoreResult<Thing> {
        let mut entity = Thing::default();
        entity.id = self.factories.read_opt_id(row, Things::Id)?;
        if let Some(name) = read_string(row, Things::Name)? {
            entity.name = Assigned::some(name);
        }
        if let Some(description) = read_string(row, Things::Description)? {
            entity.description = Assigned::some(description);
        }
        if query.wants(EntityProperty::Properties) {
            if let Some(properties) = parse_json(read_string(row, Things::Properties)?) {
                entity.properties = Assigned::some(properties);
            }
        }
        Ok(entity)
    }

    async fn insert(&self, tx: &DatabaseTransaction, entity: &mut Thing) -> StoreResult<Id> {
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

        let mut columns = vec![Things::Name, Things::Description, Things::Properties];
        let mut values: Vec<SimpleExpr> = vec![
            name.into(),
            description.into(),
            json_or_empty(entity.properties.as_some()).into(),
        ];
        let staged_id =
            f.stage_insert_id(Things::Id, entity.id.as_ref(), &mut columns, &mut values)?;
        let stmt = Query::insert()
            .into_table(Things::Table)
            .columns(columns)
            .values_panic(values)
            .to_owned();
        let result = exec(tx, &stmt).await?;
        let id = f.finish_insert_id(staged_id, &result);
        log::debug!("inserted Thing {id}");
        entity.id = Some(id.clone());
        Ok(id)
    }

    async fn update(
        &self,
        tx: &DatabaseTransaction,
        entity: &Thing,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let f = self.factories;
        let mut change = ChangeDescription::default();
        let mut staged: Vec<(Things, SimpleExpr)> = Vec::new();
        if entity.name.is_set() {
            let name = entity
                .name
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("name must not be null"))?;
            staged.push((Things::Name, name.into()));
            change.add_property(EntityProperty::Name);
        }
        if entity.description.is_set() {
            let description = entity
                .description
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("description must not be null"))?;
            staged.push((Things::Description, description.into()));
            change.add_property(EntityProperty::Description);
        }
        if entity.properties.is_set() {
            staged.push((
                Things::Properties,
                json_or_empty(entity.properties.as_some()).into(),
            ));
            change.add_property(EntityProperty::Properties);
        }
        if !staged.is_empty() {
            let stmt = Query::update()
                .table(Things::Table)
                .values(staged)
                .and_where(Expr::col(Things::Id).eq(f.id_value(id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count != 1 {
                log::error!("updating Thing {id} touched {count} rows");
                return Err(StoreError::illegal_state(
                    "update changed an unexpected number of rows",
                ));
            }
        }
        log::debug!("updated Thing {id}");
        Ok(change)
    }

    async fn delete(&self, tx: &DatabaseTransaction, id: &Id) -> StoreResult<()> {
        let stmt = Query::delete()
            .from_table(Things::Table)
            .and_where(Expr::col(Things::Id).eq(self.factories.id_value(id)))
            .to_owned();
        let count = exec(tx, &stmt).await?.rows_affected();
        if count == 0 {
            return Err(StoreError::no_such_entity(format!("Thing {id} not found")));
        }
        Ok(())
    }
}
