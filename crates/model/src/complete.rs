use serde_json::Value as JsonValue;

use crate::{
    Assigned, Datastream, Entity, EntityType, FeatureOfInterest, Id, MultiDatastream, Observation,
    ObservedProperty, ResultValue, Sensor, StoreError, StoreResult, Thing,
    COMPLEX_OBSERVATION_TYPE,
};

/// The path element a nested write hangs under, e.g. `Datastreams(5)` in
/// `Datastreams(5)/Observations`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParentRef {
    pub entity_type: EntityType,
    pub id: Id,
}

/// Containment context for a write: the target collection plus the optional
/// parent whose navigation link is implied by the path.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteContext {
    pub collection: EntityType,
    pub parent: Option<ParentRef>,
}

impl WriteContext {
    pub fn collection(collection: EntityType) -> Self {
        Self {
            collection,
            parent: None,
        }
    }

    pub fn under(collection: EntityType, parent_type: EntityType, parent_id: Id) -> Self {
        Self {
            collection,
            parent: Some(ParentRef {
                entity_type: parent_type,
                id: parent_id,
            }),
        }
    }

    fn parent_is(&self, entity_type: EntityType) -> bool {
        self.parent
            .as_ref()
            .map(|parent| parent.entity_type == entity_type)
            .unwrap_or(false)
    }
}

/// Structural completeness gate run before any write touches a row. Pure:
/// everything it needs arrives through the entity and the context.
pub fn check_complete(
    entity: &Entity,
    context: &WriteContext,
    entity_properties_only: bool,
) -> StoreResult<()> {
    if context.collection != entity.entity_type() {
        return Err(StoreError::invalid_argument(format!(
            "cannot insert a {} into a {} collection",
            entity.entity_type().entity_name(),
            context.collection.collection_name(),
        )));
    }
    match entity {
        Entity::Thing(thing) => thing_complete(thing),
        Entity::Sensor(sensor) => sensor_complete(sensor),
        Entity::ObservedProperty(property) => observed_property_complete(property),
        Entity::FeatureOfInterest(feature) => feature_complete(feature),
        Entity::Datastream(stream) => datastream_complete(stream, context, entity_properties_only),
        Entity::MultiDatastream(stream) => {
            multi_datastream_complete(stream, context, entity_properties_only)
        }
        Entity::Observation(observation) => {
            observation_complete(observation, context, entity_properties_only)
        }
    }
}

fn require<T>(value: &Assigned<Option<T>>, name: &str) -> StoreResult<()> {
    if value.as_some().is_some() {
        Ok(())
    } else {
        Err(StoreError::incomplete(format!("{name} must be set")))
    }
}

fn require_link<T>(
    link: &Assigned<Option<Box<T>>>,
    context: &WriteContext,
    target: EntityType,
) -> StoreResult<()> {
    if link.as_some().is_some() || context.parent_is(target) {
        Ok(())
    } else {
        Err(StoreError::incomplete(format!(
            "{} must be set",
            target.entity_name()
        )))
    }
}

fn thing_complete(thing: &Thing) -> StoreResult<()> {
    require(&thing.name, "name")?;
    require(&thing.description, "description")
}

fn sensor_complete(sensor: &Sensor) -> StoreResult<()> {
    require(&sensor.name, "name")?;
    require(&sensor.description, "description")?;
    require(&sensor.encoding_type, "encodingType")?;
    require(&sensor.metadata, "metadata")
}

fn observed_property_complete(property: &ObservedProperty) -> StoreResult<()> {
    require(&property.name, "name")?;
    require(&property.definition, "definition")?;
    require(&property.description, "description")
}

fn feature_complete(feature: &FeatureOfInterest) -> StoreResult<()> {
    require(&feature.name, "name")?;
    require(&feature.description, "description")?;
    require(&feature.encoding_type, "encodingType")?;
    require(&feature.feature, "feature")
}

fn datastream_complete(
    stream: &Datastream,
    context: &WriteContext,
    entity_properties_only: bool,
) -> StoreResult<()> {
    require(&stream.name, "name")?;
    require(&stream.description, "description")?;
    require(&stream.observation_type, "observationType")?;
    require(&stream.unit_of_measurement, "unitOfMeasurement")?;
    if entity_properties_only {
        return Ok(());
    }
    require_link(&stream.thing, context, EntityType::Thing)?;
    require_link(&stream.sensor, context, EntityType::Sensor)?;
    require_link(
        &stream.observed_property,
        context,
        EntityType::ObservedProperty,
    )
}

fn multi_datastream_complete(
    stream: &MultiDatastream,
    context: &WriteContext,
    entity_properties_only: bool,
) -> StoreResult<()> {
    require(&stream.name, "name")?;
    require(&stream.description, "description")?;
    let units = stream
        .unit_of_measurements
        .as_some()
        .ok_or_else(|| StoreError::incomplete("unitOfMeasurements must be set"))?;
    let data_types = stream
        .multi_observation_data_types
        .as_some()
        .ok_or_else(|| StoreError::incomplete("multiObservationDataTypes must be set"))?;
    if units.len() != data_types.len() {
        return Err(StoreError::incomplete(format!(
            "unitOfMeasurements count ({}) does not match multiObservationDataTypes count ({})",
            units.len(),
            data_types.len(),
        )));
    }
    let observation_type = stream
        .observation_type
        .as_some()
        .ok_or_else(|| StoreError::incomplete("observationType must be set"))?;
    if !observation_type.eq_ignore_ascii_case(COMPLEX_OBSERVATION_TYPE) {
        return Err(StoreError::incomplete(format!(
            "observationType must be {COMPLEX_OBSERVATION_TYPE}"
        )));
    }
    if entity_properties_only {
        return Ok(());
    }
    if stream.observed_properties.len() != data_types.len() {
        return Err(StoreError::incomplete(format!(
            "ObservedProperties count ({}) does not match multiObservationDataTypes count ({})",
            stream.observed_properties.len(),
            data_types.len(),
        )));
    }
    require_link(&stream.thing, context, EntityType::Thing)?;
    require_link(&stream.sensor, context, EntityType::Sensor)
}

fn observation_complete(
    observation: &Observation,
    context: &WriteContext,
    entity_properties_only: bool,
) -> StoreResult<()> {
    require(&observation.result, "result")?;
    if entity_properties_only {
        return Ok(());
    }
    let has_datastream = observation.datastream.as_some().is_some()
        || context.parent_is(EntityType::Datastream);
    let has_multi = observation.multi_datastream.as_some().is_some()
        || context.parent_is(EntityType::MultiDatastream);
    match (has_datastream, has_multi) {
        (false, false) => Err(StoreError::incomplete(
            "missing Datastream or MultiDatastream",
        )),
        (true, true) => Err(StoreError::invalid_argument(
            "an Observation must link either a Datastream or a MultiDatastream, not both",
        )),
        (_, multi) => {
            if multi {
                let is_array = matches!(
                    observation.result.as_some(),
                    Some(ResultValue::Json(JsonValue::Array(_)))
                );
                if !is_array {
                    return Err(StoreError::invalid_argument(
                        "a MultiDatastream only accepts array results",
                    ));
                }
            }
            Ok(())
        }
    }
}
