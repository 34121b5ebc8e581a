use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query, SelectStatement, SimpleExpr};
use sea_orm::{DatabaseTransaction, QueryResult};

use aisthesis_model::{
    check_complete, Assigned, ChangeDescription, Datastream, Entity, EntityProperty, EntityType,
    Id, NavigationProperty, ObservedProperty, Sensor, StoreError, StoreResult, Thing, TimeValue,
    UnitOfMeasurement, WriteContext, TIME_MAX, TIME_MIN,
};

use crate::db::{Datastreams, Observations};
use crate::factories::{
    exec, json_or_empty, parse_json, read_i64, read_string, EntityFactories, EntityFactory,
};
use crate::query::EntityQuery;

pub struct DatastreamFactory<'a> {
    pub(crate) factories: &'a EntityFactories,
}

pub(crate) fn base_select() -> SelectStatement {
    Query::select()
        .from(Datastreams::Table)
        .columns([
            Datastreams::Id,
            Datastreams::Name,
            Datastreams::Description,
            Datastreams::ObservationType,
            Datastreams::PhenomenonTimeStart,
            Datastreams::PhenomenonTimeEnd,
            Datastreams::ResultTimeStart,
            Datastreams::ResultTimeEnd,
            Datastreams::UnitName,
            Datastreams::UnitSymbol,
            Datastreams::UnitDefinition,
            Datastreams::Properties,
            Datastreams::SensorId,
            Datastreams::ObsPropertyId,
            Datastreams::ThingId,
        ])
        .to_owned()
}

/// An aggregate range whose start is past its end is the empty sentinel
/// written at insert time; it reads back as absent.
fn range_from_row(start: Option<i64>, end: Option<i64>) -> Option<TimeValue> {
    match (start, end) {
        (Some(start), Some(end)) if start <= end => TimeValue::from_bounds(Some(start), Some(end)),
        _ => None,
    }
}

#[async_trait]
impl EntityFactory for DatastreamFactory<'_> {
    type Entity = Datastream;

    fn entity_type(&self) -> EntityType {
        EntityType::Datastream
    }

    fn from_row(&self, row: &QueryResult, query: &EntityQuery) -> StoreResult<Datastream> {
        let f = self.factories;
        let mut entity = Datastream::default();
        entity.id = f.read_opt_id(row, Datastreams::Id)?;
        if let Some(name) = read_string(row, Datastreams::Name)? {
            entity.name = Assigned::some(name);
        }
        if let Some(description) = read_string(row, Datastreams::Description)? {
            entity.description = Assigned::some(description);
        }
        if let Some(observation_type) = read_string(row, Datastreams::ObservationType)? {
            entity.observation_type = Assigned::some(observation_type);
        }
        if let Some(range) = range_from_row(
            read_i64(row, Datastreams::PhenomenonTimeStart)?,
            read_i64(row, Datastreams::PhenomenonTimeEnd)?,
        ) {
            entity.phenomenon_time = Assigned::some(range);
        }
        if let Some(range) = range_from_row(
            read_i64(row, Datastreams::ResultTimeStart)?,
            read_i64(row, Datastreams::ResultTimeEnd)?,
        ) {
            entity.result_time = Assigned::some(range);
        }
        entity.unit_of_measurement = Assigned::some(UnitOfMeasurement {
            name: read_string(row, Datastreams::UnitName)?,
            symbol: read_string(row, Datastreams::UnitSymbol)?,
            definition: read_string(row, Datastreams::UnitDefinition)?,
        });
        if query.wants(EntityProperty::Properties) {
            if let Some(properties) = parse_json(read_string(row, Datastreams::Properties)?) {
                entity.properties = Assigned::some(properties);
            }
        }
        if let Some(id) = f.read_opt_id(row, Datastreams::SensorId)? {
            entity.sensor = Assigned::some(Box::new(Sensor::with_id(id)));
        }
        if let Some(id) = f.read_opt_id(row, Datastreams::ObsPropertyId)? {
            entity.observed_property = Assigned::some(Box::new(ObservedProperty::with_id(id)));
        }
        if let Some(id) = f.read_opt_id(row, Datastreams::ThingId)? {
            entity.thing = Assigned::some(Box::new(Thing::with_id(id)));
        }
        Ok(entity)
    }

    async fn insert(&self, tx: &DatabaseTransaction, entity: &mut Datastream) -> StoreResult<Id> {
        let f = self.factories;
        let observed_property = entity
            .observed_property
            .as_some_mut()
            .ok_or_else(|| StoreError::incomplete("ObservedProperty must be set"))?;
        let observed_property_id = f
            .observed_property_exists_or_create(tx, observed_property)
            .await?;
        let sensor = entity
            .sensor
            .as_some_mut()
            .ok_or_else(|| StoreError::incomplete("Sensor must be set"))?;
        let sensor_id = f.sensor_exists_or_create(tx, sensor).await?;
        let thing = entity
            .thing
            .as_some_mut()
            .ok_or_else(|| StoreError::incomplete("Thing must be set"))?;
        let thing_id = f.thing_exists_or_create(tx, thing).await?;

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
        let observation_type = entity
            .observation_type
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("observationType must be set"))?;
        let unit = entity
            .unit_of_measurement
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("unitOfMeasurement must be set"))?;

        let mut columns = vec![
            Datastreams::Name,
            Datastreams::Description,
            Datastreams::ObservationType,
            Datastreams::UnitName,
            Datastreams::UnitSymbol,
            Datastreams::UnitDefinition,
            Datastreams::Properties,
            Datastreams::PhenomenonTimeStart,
            Datastreams::PhenomenonTimeEnd,
            Datastreams::ResultTimeStart,
            Datastreams::ResultTimeEnd,
            Datastreams::SensorId,
            Datastreams::ObsPropertyId,
            Datastreams::ThingId,
        ];
        let mut values: Vec<SimpleExpr> = vec![
            name.into(),
            description.into(),
            observation_type.into(),
            unit.name.into(),
            unit.symbol.into(),
            unit.definition.into(),
            json_or_empty(entity.properties.as_some()).into(),
            TIME_MAX.as_micros().into(),
            TIME_MIN.as_micros().into(),
            TIME_MAX.as_micros().into(),
            TIME_MIN.as_micros().into(),
            f.id_value(&sensor_id).into(),
            f.id_value(&observed_property_id).into(),
            f.id_value(&thing_id).into(),
        ];
        let staged_id = f.stage_insert_id(
            Datastreams::Id,
            entity.id.as_ref(),
            &mut columns,
            &mut values,
        )?;
        let stmt = Query::insert()
            .into_table(Datastreams::Table)
            .columns(columns)
            .values_panic(values)
            .to_owned();
        let result = exec(tx, &stmt).await?;
        let id = f.finish_insert_id(staged_id, &result);
        log::debug!("inserted Datastream {id}");
        entity.id = Some(id.clone());

        // Observations embedded at creation time are created pointing at the
        // just-created stream.
        for observation in &mut entity.observations {
            observation.datastream = Assigned::some(Box::new(Datastream::with_id(id.clone())));
            check_complete(
                &Entity::Observation(observation.clone()),
                &WriteContext::collection(EntityType::Observation),
                false,
            )?;
            f.observations().insert(tx, observation).await?;
        }

        Ok(id)
    }

    async fn update(
        &self,
        tx: &DatabaseTransaction,
        entity: &Datastream,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let f = self.factories;
        let mut change = ChangeDescription::default();
        let mut staged: Vec<(Datastreams, SimpleExpr)> = Vec::new();
        if entity.name.is_set() {
            let name = entity
                .name
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("name must not be null"))?;
            staged.push((Datastreams::Name, name.into()));
            change.add_property(EntityProperty::Name);
        }
        if entity.description.is_set() {
            let description = entity
                .description
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("description must not be null"))?;
            staged.push((Datastreams::Description, description.into()));
            change.add_property(EntityProperty::Description);
        }
        if entity.observation_type.is_set() {
            let observation_type = entity
                .observation_type
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("observationType must not be null"))?;
            staged.push((Datastreams::ObservationType, observation_type.into()));
            change.add_property(EntityProperty::ObservationType);
        }
        if entity.unit_of_measurement.is_set() {
            let unit = entity
                .unit_of_measurement
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("unitOfMeasurement must not be null"))?;
            staged.push((Datastreams::UnitName, unit.name.into()));
            staged.push((Datastreams::UnitSymbol, unit.symbol.into()));
            staged.push((Datastreams::UnitDefinition, unit.definition.into()));
            change.add_property(EntityProperty::UnitOfMeasurement);
        }
        if entity.properties.is_set() {
            staged.push((
                Datastreams::Properties,
                json_or_empty(entity.properties.as_some()).into(),
            ));
            change.add_property(EntityProperty::Properties);
        }
        if entity.observed_property.is_set() {
            let target_id = entity
                .observed_property
                .as_some()
                .and_then(|target| target.id.clone());
            if !f
                .entity_exists(tx, EntityType::ObservedProperty, target_id.as_ref())
                .await?
            {
                return Err(StoreError::no_such_entity(
                    "ObservedProperty with no id or not found",
                ));
            }
            if let Some(target_id) = target_id {
                staged.push((Datastreams::ObsPropertyId, f.id_value(&target_id).into()));
            }
            change.add_navigation(NavigationProperty::ObservedProperty);
        }
        if entity.sensor.is_set() {
            let target_id = entity.sensor.as_some().and_then(|target| target.id.clone());
            if !f
                .entity_exists(tx, EntityType::Sensor, target_id.as_ref())
                .await?
            {
                return Err(StoreError::no_such_entity("Sensor with no id or not found"));
            }
            if let Some(target_id) = target_id {
                staged.push((Datastreams::SensorId, f.id_value(&target_id).into()));
            }
            change.add_navigation(NavigationProperty::Sensor);
        }
        if entity.thing.is_set() {
            let target_id = entity.thing.as_some().and_then(|target| target.id.clone());
            if !f
                .entity_exists(tx, EntityType::Thing, target_id.as_ref())
                .await?
            {
                return Err(StoreError::no_such_entity("Thing with no id or not found"));
            }
            if let Some(target_id) = target_id {
                staged.push((Datastreams::ThingId, f.id_value(&target_id).into()));
            }
            change.add_navigation(NavigationProperty::Thing);
        }
        if !staged.is_empty() {
            let stmt = Query::update()
                .table(Datastreams::Table)
                .values(staged)
                .and_where(Expr::col(Datastreams::Id).eq(f.id_value(id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count != 1 {
                log::error!("updating Datastream {id} touched {count} rows");
                return Err(StoreError::illegal_state(
                    "update changed an unexpected number of rows",
                ));
            }
        }

        // Pre-existing observations supplied on the update are re-linked to
        // this stream.
        for observation in &entity.observations {
            let observation_id = observation.id.as_ref().ok_or_else(|| {
                StoreError::no_such_entity("Observation with no id or not found")
            })?;
            if !f
                .entity_exists(tx, EntityType::Observation, Some(observation_id))
                .await?
            {
                return Err(StoreError::no_such_entity(format!(
                    "Observation {observation_id} not found"
                )));
            }
            let stmt = Query::update()
                .table(Observations::Table)
                .values([(Observations::DatastreamId, f.id_value(id).into())])
                .and_where(Expr::col(Observations::Id).eq(f.id_value(observation_id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count > 0 {
                log::debug!("assigned Datastream {id} to Observation {observation_id}");
            }
        }

        log::debug!("updated Datastream {id}");
        Ok(change)
    }

    async fn delete(&self, tx: &DatabaseTransaction, id: &Id) -> StoreResult<()> {
        let stmt = Query::delete()
            .from_table(Datastreams::Table)
            .and_where(Expr::col(Datastreams::Id).eq(self.factories.id_value(id)))
            .to_owned();
        let count = exec(tx, &stmt).await?.rows_affected();
        if count == 0 {
            return Err(StoreError::no_such_entity(format!(
                "Datastream {id} not found"
            )));
        }
        Ok(())
    }
}
