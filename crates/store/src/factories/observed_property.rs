use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query, SelectStatement, SimpleExpr};
use sea_orm::{DatabaseTransaction, QueryResult};

use aisthesis_model::{
    Assigned, ChangeDescription, EntityProperty, EntityType, Id, ObservedProperty, StoreError,
    StoreResult,
};

use crate::db::ObsProperties;
use crate::factories::{exec, read_string, EntityFactories, EntityFactory};
use crate::query::EntityQuery;

pub struct ObservedPropertyFactory<'a> {
    pub(crate) factories: &'a EntityFactories,
}

pub(crate) fn base_select() -> SelectStatement {
    Query::select()
        .from(ObsProperties::Table)
        .columns([
            ObsProperties::Id,
            ObsProperties::Name,
            ObsProperties::Definition,
            ObsProperties::Description,
        ])
        .to_owned()
}

#[async_trait]
impl EntityFactory for ObservedPropertyFactory<'_> {
    type Entity = ObservedProperty;

    fn entity_type(&self) -> EntityType {
        EntityType::ObservedProperty
    }

    fn from_row(&self, row: &QueryResult, _query: &EntityQuery) -> StoreResult<ObservedProperty> {
        let mut entity = ObservedProperty::default();
        entity.id = self.factories.read_opt_id(row, ObsProperties::Id)?;
        if let Some(name) = read_string(row, ObsProperties::Name)? {
            entity.name = Assigned::some(name);
        }
        if let Some(definition) = read_string(row, ObsProperties::Definition)? {
            entity.definition = Assigned::some(definition);
        }
        if let Some(description) = read_string(row, ObsProperties::Description)? {
            entity.description = Assigned::some(description);
        }
        Ok(entity)
    }

    async fn insert(
        &self,
        tx: &DatabaseTransaction,
        entity: &mut ObservedProperty,
    ) -> StoreResult<Id> {
        let f = self.factories;
        let name = entity
            .name
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("name must be set"))?;
        let definition = entity
            .definition
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("definition must be set"))?;
        let description = entity
            .description
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("description must be set"))?;

        let mut columns = vec![
            ObsProperties::Name,
            ObsProperties::Definition,
            ObsProperties::Description,
        ];
        let mut values: Vec<SimpleExpr> =
            vec![name.into(), definition.into(), description.into()];
        let staged_id = f.stage_insert_id(
            ObsProperties::Id,
            entity.id.as_ref(),
            &mut columns,
            &mut values,
        )?;
        let stmt = Query::insert()
            .into_table(ObsProperties::Table)
            .columns(columns)
            .values_panic(values)
            .to_owned();
        let result = exec(tx, &stmt).await?;
        let id = f.finish_insert_id(staged_id, &result);
        log::debug!("inserted ObservedProperty {id}");
        entity.id = Some(id.clone());
        Ok(id)
    }

    async fn update(
        &self,
        tx: &DatabaseTransaction,
        entity: &ObservedProperty,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let f = self.factories;
        let mut change = ChangeDescription::default();
        let mut staged: Vec<(ObsProperties, SimpleExpr)> = Vec::new();
        if entity.name.is_set() {
            let name = entity
                .name
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("name must not be null"))?;
            staged.push((ObsProperties::Name, name.into()));
            change.add_property(EntityProperty::Name);
        }
        if entity.definition.is_set() {
            let definition = entity
                .definition
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("definition must not be null"))?;
            staged.push((ObsProperties::Definition, definition.into()));
            change.add_property(EntityProperty::Definition);
        }
        if entity.description.is_set() {
            let description = entity
                .description
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("description must not be null"))?;
            staged.push((ObsProperties::Description, description.into()));
            change.add_property(EntityProperty::Description);
        }
        if !staged.is_empty() {
            let stmt = Query::update()
                .table(ObsProperties::Table)
                .values(staged)
                .and_where(Expr::col(ObsProperties::Id).eq(f.id_value(id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count != 1 {
                log::error!("updating ObservedProperty {id} touched {count} rows");
                return Err(StoreError::illegal_state(
                    "update changed an unexpected number of rows",
                ));
            }
        }
        log::debug!("updated ObservedProperty {id}");
        Ok(change)
    }

    async fn delete(&self, tx: &DatabaseTransaction, id: &Id) -> StoreResult<()> {
        let stmt = Query::delete()
            .from_table(ObsProperties::Table)
            .and_where(Expr::col(ObsProperties::Id).eq(self.factories.id_value(id)))
            .to_owned();
        let count = exec(tx, &stmt).await?.rows_affected();
        if count == 0 {
            return Err(StoreError::no_such_entity(format!(
                "ObservedProperty {id} not found"
            )));
        }
        Ok(())
    }
}
