use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query, SelectStatement, SimpleExpr};
use sea_orm::{DatabaseTransaction, QueryResult};

use aisthesis_model::{
    Assigned, ChangeDescription, EntityProperty, EntityType, FeatureOfInterest, Id, StoreError,
    StoreResult,
};

use crate::db::Features;
use crate::factories::{
    exec, json_or_empty, parse_json, read_string, EntityFactories, EntityFactory,
};
use crate::query::EntityQuery;

pub struct FeatureFactory<'a> {
    pub(crate) factories: &'a EntityFactories,
}

pub(crate) fn base_select() -> SelectStatement {
    Query::select()
        .from(Features::Table)
        .columns([
            Features::Id,
            Features::Name,
            Features::Description,
            Features::EncodingType,
            Features::Feature,
            Features::Properties,
        ])
        .to_owned()
}

#[async_trait]
impl EntityFactory for FeatureFactory<'_> {
    type Entity = FeatureOfInterest;

    fn entity_type(&self) -> EntityType {
        EntityType::FeatureOfInterest
    }

    fn from_row(&self, row: &QueryResult, query: &EntityQuery) -> StoreResult<FeatureOfInterest> {
        let mut entity = FeatureOfInterest::default();
        entity.id = self.factories.read_opt_id(row, Features::Id)?;
        if let Some(name) = read_string(row, Features::Name)? {
            entity.name = Assigned::some(name);
        }
        if let Some(description) = read_string(row, Features::Description)? {
            entity.description = Assigned::some(description);
        }
        if let Some(encoding_type) = read_string(row, Features::EncodingType)? {
            entity.encoding_type = Assigned::some(encoding_type);
        }
        if query.wants(EntityProperty::Feature) {
            if let Some(feature) = parse_json(read_string(row, Features::Feature)?) {
                entity.feature = Assigned::some(feature);
            }
        }
        if query.wants(EntityProperty::Properties) {
            if let Some(properties) = parse_json(read_string(row, Features::Properties)?) {
                entity.properties = Assigned::some(properties);
            }
        }
        Ok(entity)
    }

    async fn insert(
        &self,
        tx: &DatabaseTransaction,
        entity: &mut FeatureOfInterest,
    ) -> StoreResult<Id> {
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
        let feature = entity
            .feature
            .as_some()
            .ok_or_else(|| StoreError::incomplete("feature must be set"))?;

        let mut columns = vec![
            Features::Name,
            Features::Description,
            Features::EncodingType,
            Features::Feature,
            Features::Properties,
        ];
        let mut values: Vec<SimpleExpr> = vec![
            name.into(),
            description.into(),
            encoding_type.into(),
            feature.to_string().into(),
            json_or_empty(entity.properties.as_some()).into(),
        ];
        let staged_id =
            f.stage_insert_id(Features::Id, entity.id.as_ref(), &mut columns, &mut values)?;
        let stmt = Query::insert()
            .into_table(Features::Table)
            .columns(columns)
            .values_panic(values)
            .to_owned();
        let result = exec(tx, &stmt).await?;
        let id = f.finish_insert_id(staged_id, &result);
        log::debug!("inserted FeatureOfInterest {id}");
        entity.id = Some(id.clone());
        Ok(id)
    }

    async fn update(
        &self,
        tx: &DatabaseTransaction,
        entity: &FeatureOfInterest,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let f = self.factories;
        let mut change = ChangeDescription::default();
        let mut staged: Vec<(Features, SimpleExpr)> = Vec::new();
        if entity.name.is_set() {
            let name = entity
                .name
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("name must not be null"))?;
            staged.push((Features::Name, name.into()));
            change.add_property(EntityProperty::Name);
        }
        if entity.description.is_set() {
            let description = entity
                .description
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("description must not be null"))?;
            staged.push((Features::Description, description.into()));
            change.add_property(EntityProperty::Description);
        }
        if entity.encoding_type.is_set() {
            let encoding_type = entity
                .encoding_type
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("encodingType must not be null"))?;
            staged.push((Features::EncodingType, encoding_type.into()));
            change.add_property(EntityProperty::EncodingType);
        }
        if entity.feature.is_set() {
            let feature = entity
                .feature
                .as_some()
                .ok_or_else(|| StoreError::incomplete("feature must not be null"))?;
            staged.push((Features::Feature, feature.to_string().into()));
            change.add_property(EntityProperty::Feature);
        }
        if entity.properties.is_set() {
            staged.push((
                Features::Properties,
                json_or_empty(entity.properties.as_some()).into(),
            ));
            change.add_property(EntityProperty::Properties);
        }
        if !staged.is_empty() {
            let stmt = Query::update()
                .table(Features::Table)
                .values(staged)
                .and_where(Expr::col(Features::Id).eq(f.id_value(id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count != 1 {
                log::error!("updating FeatureOfInterest {id} touched {count} rows");
                return Err(StoreError::illegal_state(
                    "update changed an unexpected number of rows",
                ));
            }
        }
        log::debug!("updated FeatureOfInterest {id}");
        Ok(change)
    }

    async fn delete(&self, tx: &DatabaseTransaction, id: &Id) -> StoreResult<()> {
        let stmt = Query::delete()
            .from_table(Features::Table)
            .and_where(Expr::col(Features::Id).eq(self.factories.id_value(id)))
            .to_owned();
        let count = exec(tx, &stmt).await?.rows_affected();
        if count == 0 {
            return Err(StoreError::no_such_entity(format!(
                "FeatureOfInterest {id} not found"
            )));
        }
        Ok(())
    }
}
