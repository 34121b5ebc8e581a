use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query, SelectStatement, SimpleExpr};
use sea_orm::{DatabaseTransaction, QueryResult};

use aisthesis_model::{
    check_complete, Assigned, ChangeDescription, Entity, EntityProperty, EntityType, Id,
    MultiDatastream, NavigationProperty, Sensor, StoreError, StoreResult, Thing,
    UnitOfMeasurement, WriteContext, COMPLEX_OBSERVATION_TYPE, TIME_MAX, TIME_MIN,
};

use crate::db::{MultiDatastreams, MultiDatastreamsObsProperties, Observations};
use crate::factories::{
    exec, json_or_empty, parse_json, query_one, read_i64, read_string, EntityFactories,
    EntityFactory,
};
use crate::query::EntityQuery;

pub struct MultiDatastreamFactory<'a> {
    pub(crate) factories: &'a EntityFactories,
}

pub(crate) fn base_select() -> SelectStatement {
    Query::select()
        .from(MultiDatastreams::Table)
        .columns([
            MultiDatastreams::Id,
            MultiDatastreams::Name,
            MultiDatastreams::Description,
            MultiDatastreams::ObservationTypes,
            MultiDatastreams::PhenomenonTimeStart,
            MultiDatastreams::PhenomenonTimeEnd,
            MultiDatastreams::ResultTimeStart,
            MultiDatastreams::ResultTimeEnd,
            MultiDatastreams::UnitOfMeasurements,
            MultiDatastreams::Properties,
            MultiDatastreams::SensorId,
            MultiDatastreams::ThingId,
        ])
        .to_owned()
}

fn range_from_row(start: Option<i64>, end: Option<i64>) -> Option<aisthesis_model::TimeValue> {
    match (start, end) {
        (Some(start), Some(end)) if start <= end => {
            aisthesis_model::TimeValue::from_bounds(Some(start), Some(end))
        }
        _ => None,
    }
}

impl MultiDatastreamFactory<'_> {
    async fn link_observed_property(
        &self,
        tx: &DatabaseTransaction,
        stream_id: &Id,
        property_id: &Id,
        rank: i32,
    ) -> StoreResult<bool> {
        let f = self.factories;
        let existing = Query::select()
            .from(MultiDatastreamsObsProperties::Table)
            .column(MultiDatastreamsObsProperties::Rank)
            .and_where(
                Expr::col(MultiDatastreamsObsProperties::MultiDatastreamId)
                    .eq(f.id_value(stream_id)),
            )
            .and_where(
                Expr::col(MultiDatastreamsObsProperties::ObsPropertyId)
                    .eq(f.id_value(property_id)),
            )
            .limit(1)
            .to_owned();
        if query_one(tx, &existing).await?.is_some() {
            return Ok(false);
        }
        let stmt = Query::insert()
            .into_table(MultiDatastreamsObsProperties::Table)
            .columns([
                MultiDatastreamsObsProperties::MultiDatastreamId,
                MultiDatastreamsObsProperties::ObsPropertyId,
                MultiDatastreamsObsProperties::Rank,
            ])
            .values_panic([
                f.id_value(stream_id).into(),
                f.id_value(property_id).into(),
                rank.into(),
            ])
            .to_owned();
        exec(tx, &stmt).await?;
        Ok(true)
    }
}

#[async_trait]
impl EntityFactory for MultiDatastreamFactory<'_> {
    type Entity = MultiDatastream;

    fn entity_type(&self) -> EntityType {
        EntityType::MultiDatastream
    }

    fn from_row(&self, row: &QueryResult, query: &EntityQuery) -> StoreResult<MultiDatastream> {
        let f = self.factories;
        let mut entity = MultiDatastream::default();
        entity.id = f.read_opt_id(row, MultiDatastreams::Id)?;
        if let Some(name) = read_string(row, MultiDatastreams::Name)? {
            entity.name = Assigned::some(name);
        }
        if let Some(description) = read_string(row, MultiDatastreams::Description)? {
            entity.description = Assigned::some(description);
        }
        entity.observation_type = Assigned::some(COMPLEX_OBSERVATION_TYPE.to_string());
        if let Some(raw) = read_string(row, MultiDatastreams::ObservationTypes)? {
            let data_types: Vec<String> = serde_json::from_str(&raw)
                .map_err(|err| StoreError::storage(format!("invalid observation types: {err}")))?;
            entity.multi_observation_data_types = Assigned::some(data_types);
        }
        if let Some(raw) = read_string(row, MultiDatastreams::UnitOfMeasurements)? {
            let units: Vec<UnitOfMeasurement> = serde_json::from_str(&raw).map_err(|err| {
                StoreError::storage(format!("invalid units of measurement: {err}"))
            })?;
            entity.unit_of_measurements = Assigned::some(units);
        }
        if let Some(range) = range_from_row(
            read_i64(row, MultiDatastreams::PhenomenonTimeStart)?,
            read_i64(row, MultiDatastreams::PhenomenonTimeEnd)?,
        ) {
            entity.phenomenon_time = Assigned::some(range);
        }
        if let Some(range) = range_from_row(
            read_i64(row, MultiDatastreams::ResultTimeStart)?,
            read_i64(row, MultiDatastreams::ResultTimeEnd)?,
        ) {
            entity.result_time = Assigned::some(range);
        }
        if query.wants(EntityProperty::Properties) {
            if let Some(properties) = parse_json(read_string(row, MultiDatastreams::Properties)?) {
                entity.properties = Assigned::some(properties);
            }
        }
        if let Some(id) = f.read_opt_id(row, MultiDatastreams::SensorId)? {
            entity.sensor = Assigned::some(Box::new(Sensor::with_id(id)));
        }
        if let Some(id) = f.read_opt_id(row, MultiDatastreams::ThingId)? {
            entity.thing = Assigned::some(Box::new(Thing::with_id(id)));
        }
        Ok(entity)
    }

    async fn insert(
        &self,
        tx: &DatabaseTransaction,
        entity: &mut MultiDatastream,
    ) -> StoreResult<Id> {
        let f = self.factories;
        let units = entity
            .unit_of_measurements
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("unitOfMeasurements must be set"))?;
        let data_types = entity
            .multi_observation_data_types
            .as_some()
            .cloned()
            .ok_or_else(|| StoreError::incomplete("multiObservationDataTypes must be set"))?;
        if units.len() != data_types.len() {
            return Err(StoreError::invalid_argument(format!(
                "unitOfMeasurements count ({}) does not match multiObservationDataTypes count ({})",
                units.len(),
                data_types.len(),
            )));
        }
        if let Some(observation_type) = entity.observation_type.as_some() {
            if !observation_type.eq_ignore_ascii_case(COMPLEX_OBSERVATION_TYPE) {
                return Err(StoreError::invalid_argument(format!(
                    "observationType must be {COMPLEX_OBSERVATION_TYPE}"
                )));
            }
        }

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

        let mut property_ids = Vec::with_capacity(entity.observed_properties.len());
        for property in &mut entity.observed_properties {
            property_ids.push(f.observed_property_exists_or_create(tx, property).await?);
        }
        if property_ids.len() != data_types.len() {
            return Err(StoreError::invalid_argument(format!(
                "ObservedProperties count ({}) does not match multiObservationDataTypes count ({})",
                property_ids.len(),
                data_types.len(),
            )));
        }

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
        let data_types_json = serde_json::to_string(&data_types)
            .map_err(|err| StoreError::storage(err.to_string()))?;
        let units_json =
            serde_json::to_string(&units).map_err(|err| StoreError::storage(err.to_string()))?;

        let mut columns = vec![
            MultiDatastreams::Name,
            MultiDatastreams::Description,
            MultiDatastreams::ObservationTypes,
            MultiDatastreams::UnitOfMeasurements,
            MultiDatastreams::Properties,
            MultiDatastreams::PhenomenonTimeStart,
            MultiDatastreams::PhenomenonTimeEnd,
            MultiDatastreams::ResultTimeStart,
            MultiDatastreams::ResultTimeEnd,
            MultiDatastreams::SensorId,
            MultiDatastreams::ThingId,
        ];
        let mut values: Vec<SimpleExpr> = vec![
            name.into(),
            description.into(),
            data_types_json.into(),
            units_json.into(),
            json_or_empty(entity.properties.as_some()).into(),
            TIME_MAX.as_micros().into(),
            TIME_MIN.as_micros().into(),
            TIME_MAX.as_micros().into(),
            TIME_MIN.as_micros().into(),
            f.id_value(&sensor_id).into(),
            f.id_value(&thing_id).into(),
        ];
        let staged_id = f.stage_insert_id(
            MultiDatastreams::Id,
            entity.id.as_ref(),
            &mut columns,
            &mut values,
        )?;
        let stmt = Query::insert()
            .into_table(MultiDatastreams::Table)
            .columns(columns)
            .values_panic(values)
            .to_owned();
        let result = exec(tx, &stmt).await?;
        let id = f.finish_insert_id(staged_id, &result);
        log::debug!("inserted MultiDatastream {id}");
        entity.id = Some(id.clone());

        for (rank, property_id) in property_ids.iter().enumerate() {
            self.link_observed_property(tx, &id, property_id, rank as i32)
                .await?;
        }

        for observation in &mut entity.observations {
            observation.multi_datastream =
                Assigned::some(Box::new(MultiDatastream::with_id(id.clone())));
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
        entity: &MultiDatastream,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let f = self.factories;
        let old = f
            .get_multi_datastream(tx, id)
            .await?
            .ok_or_else(|| StoreError::no_such_entity(format!("MultiDatastream {id} not found")))?;

        let mut change = ChangeDescription::default();
        let mut staged: Vec<(MultiDatastreams, SimpleExpr)> = Vec::new();
        if entity.name.is_set() {
            let name = entity
                .name
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("name must not be null"))?;
            staged.push((MultiDatastreams::Name, name.into()));
            change.add_property(EntityProperty::Name);
        }
        if entity.description.is_set() {
            let description = entity
                .description
                .as_some()
                .cloned()
                .ok_or_else(|| StoreError::incomplete("description must not be null"))?;
            staged.push((MultiDatastreams::Description, description.into()));
            change.add_property(EntityProperty::Description);
        }
        if entity.observation_type.is_set() {
            let observation_type = entity
                .observation_type
                .as_some()
                .ok_or_else(|| StoreError::incomplete("observationType must not be null"))?;
            if !observation_type.eq_ignore_ascii_case(COMPLEX_OBSERVATION_TYPE) {
                return Err(StoreError::invalid_argument(format!(
                    "observationType must be {COMPLEX_OBSERVATION_TYPE}"
                )));
            }
        }
        if entity.unit_of_measurements.is_set() {
            let units = entity
                .unit_of_measurements
                .as_some()
                .ok_or_else(|| StoreError::incomplete("unitOfMeasurements must not be null"))?;
            let units_json = serde_json::to_string(units)
                .map_err(|err| StoreError::storage(err.to_string()))?;
            staged.push((MultiDatastreams::UnitOfMeasurements, units_json.into()));
            change.add_property(EntityProperty::UnitOfMeasurements);
        }
        if entity.multi_observation_data_types.is_set() {
            let data_types = entity.multi_observation_data_types.as_some().ok_or_else(|| {
                StoreError::incomplete("multiObservationDataTypes must not be null")
            })?;
            let data_types_json = serde_json::to_string(data_types)
                .map_err(|err| StoreError::storage(err.to_string()))?;
            staged.push((MultiDatastreams::ObservationTypes, data_types_json.into()));
            change.add_property(EntityProperty::MultiObservationDataTypes);
        }
        if entity.properties.is_set() {
            staged.push((
                MultiDatastreams::Properties,
                json_or_empty(entity.properties.as_some()).into(),
            ));
            change.add_property(EntityProperty::Properties);
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
                staged.push((MultiDatastreams::SensorId, f.id_value(&target_id).into()));
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
                staged.push((MultiDatastreams::ThingId, f.id_value(&target_id).into()));
            }
            change.add_navigation(NavigationProperty::Thing);
        }

        // The list invariant is checked against the state the update leaves
        // behind, not incrementally per staged field.
        let unit_count = entity
            .unit_of_measurements
            .as_some()
            .or_else(|| old.unit_of_measurements.as_some())
            .map(Vec::len)
            .unwrap_or(0);
        let data_type_count = entity
            .multi_observation_data_types
            .as_some()
            .or_else(|| old.multi_observation_data_types.as_some())
            .map(Vec::len)
            .unwrap_or(0);
        if unit_count != data_type_count {
            return Err(StoreError::invalid_argument(format!(
                "unitOfMeasurements count ({unit_count}) does not match multiObservationDataTypes count ({data_type_count})",
            )));
        }

        if !staged.is_empty() {
            let stmt = Query::update()
                .table(MultiDatastreams::Table)
                .values(staged)
                .and_where(Expr::col(MultiDatastreams::Id).eq(f.id_value(id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count != 1 {
                log::error!("updating MultiDatastream {id} touched {count} rows");
                return Err(StoreError::illegal_state(
                    "update changed an unexpected number of rows",
                ));
            }
        }

        // Newly supplied observed properties must pre-exist and are linked
        // after the currently ranked ones.
        if !entity.observed_properties.is_empty() {
            let mut next_rank = f.count_observed_properties(tx, id).await? as i32;
            for property in &entity.observed_properties {
                let property_id = property.id.as_ref().ok_or_else(|| {
                    StoreError::no_such_entity("ObservedProperty with no id or not found")
                })?;
                if !f
                    .entity_exists(tx, EntityType::ObservedProperty, Some(property_id))
                    .await?
                {
                    return Err(StoreError::no_such_entity(format!(
                        "ObservedProperty {property_id} not found"
                    )));
                }
                if self
                    .link_observed_property(tx, id, property_id, next_rank)
                    .await?
                {
                    next_rank += 1;
                    change.add_navigation(NavigationProperty::ObservedProperties);
                }
            }
        }

        if entity.unit_of_measurements.is_set()
            || entity.multi_observation_data_types.is_set()
            || !entity.observed_properties.is_empty()
        {
            let linked = f.count_observed_properties(tx, id).await?;
            if linked != data_type_count as i64 {
                return Err(StoreError::invalid_argument(format!(
                    "ObservedProperties count ({linked}) does not match multiObservationDataTypes count ({data_type_count})",
                )));
            }
        }

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
                .values([(Observations::MultiDatastreamId, f.id_value(id).into())])
                .and_where(Expr::col(Observations::Id).eq(f.id_value(observation_id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count > 0 {
                log::debug!("assigned MultiDatastream {id} to Observation {observation_id}");
            }
        }

        log::debug!("updated MultiDatastream {id}");
        Ok(change)
    }

    async fn delete(&self, tx: &DatabaseTransaction, id: &Id) -> StoreResult<()> {
        let f = self.factories;
        let links = Query::delete()
            .from_table(MultiDatastreamsObsProperties::Table)
            .and_where(
                Expr::col(MultiDatastreamsObsProperties::MultiDatastreamId).eq(f.id_value(id)),
            )
            .to_owned();
        exec(tx, &links).await?;
        let stmt = Query::delete()
            .from_table(MultiDatastreams::Table)
            .and_where(Expr::col(MultiDatastreams::Id).eq(f.id_value(id)))
            .to_owned();
        let count = exec(tx, &stmt).await?.rows_affected();
        if count == 0 {
            return Err(StoreError::no_such_entity(format!(
                "MultiDatastream {id} not found"
            )));
        }
        Ok(())
    }
}
