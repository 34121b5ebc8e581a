use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{Id, Instant, ResultValue, TimeValue};

/// Observation type URI every MultiDatastream must declare.
pub const COMPLEX_OBSERVATION_TYPE: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_ComplexObservation";

/// Tracks whether a field was explicitly assigned in the current operation.
/// `Set(None)` clears a nullable field; `Unset` leaves the column untouched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Assigned<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> Assigned<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Assigned::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Assigned::Set(value) => Some(value),
            Assigned::Unset => None,
        }
    }
}

impl<T> Assigned<Option<T>> {
    pub fn some(value: T) -> Self {
        Assigned::Set(Some(value))
    }

    pub fn null() -> Self {
        Assigned::Set(None)
    }

    /// The value when the field is both set and non-null.
    pub fn as_some(&self) -> Option<&T> {
        match self {
            Assigned::Set(Some(value)) => Some(value),
            _ => None,
        }
    }

    pub fn as_some_mut(&mut self) -> Option<&mut T> {
        match self {
            Assigned::Set(Some(value)) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<T> for Assigned<Option<T>> {
    fn from(value: T) -> Self {
        Assigned::Set(Some(value))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Thing,
    Sensor,
    ObservedProperty,
    FeatureOfInterest,
    Datastream,
    MultiDatastream,
    Observation,
}

impl EntityType {
    pub fn entity_name(&self) -> &'static str {
        match self {
            EntityType::Thing => "Thing",
            EntityType::Sensor => "Sensor",
            EntityType::ObservedProperty => "ObservedProperty",
            EntityType::FeatureOfInterest => "FeatureOfInterest",
            EntityType::Datastream => "Datastream",
            EntityType::MultiDatastream => "MultiDatastream",
            EntityType::Observation => "Observation",
        }
    }

    pub fn collection_name(&self) -> &'static str {
        match self {
            EntityType::Thing => "Things",
            EntityType::Sensor => "Sensors",
            EntityType::ObservedProperty => "ObservedProperties",
            EntityType::FeatureOfInterest => "FeaturesOfInterest",
            EntityType::Datastream => "Datastreams",
            EntityType::MultiDatastream => "MultiDatastreams",
            EntityType::Observation => "Observations",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct UnitOfMeasurement {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub definition: Option<String>,
}

impl UnitOfMeasurement {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            symbol: Some(symbol.into()),
            definition: Some(definition.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: Option<Id>,
    pub name: Assigned<Option<String>>,
    pub description: Assigned<Option<String>>,
    pub properties: Assigned<Option<JsonValue>>,
}

impl Thing {
    pub fn with_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: Option<Id>,
    pub name: Assigned<Option<String>>,
    pub description: Assigned<Option<String>>,
    pub encoding_type: Assigned<Option<String>>,
    pub metadata: Assigned<Option<String>>,
}

impl Sensor {
    pub fn with_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedProperty {
    pub id: Option<Id>,
    pub name: Assigned<Option<String>>,
    pub definition: Assigned<Option<String>>,
    pub description: Assigned<Option<String>>,
}

impl ObservedProperty {
    pub fn with_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureOfInterest {
    pub id: Option<Id>,
    pub name: Assigned<Option<String>>,
    pub description: Assigned<Option<String>>,
    pub encoding_type: Assigned<Option<String>>,
    pub feature: Assigned<Option<JsonValue>>,
    pub properties: Assigned<Option<JsonValue>>,
}

impl FeatureOfInterest {
    pub fn with_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Datastream {
    pub id: Option<Id>,
    pub name: Assigned<Option<String>>,
    pub description: Assigned<Option<String>>,
    pub observation_type: Assigned<Option<String>>,
    pub unit_of_measurement: Assigned<Option<UnitOfMeasurement>>,
    pub properties: Assigned<Option<JsonValue>>,
    /// Aggregate ranges maintained by the store; read-only on the entity.
    pub phenomenon_time: Assigned<Option<TimeValue>>,
    pub result_time: Assigned<Option<TimeValue>>,
    pub thing: Assigned<Option<Box<Thing>>>,
    pub sensor: Assigned<Option<Box<Sensor>>>,
    pub observed_property: Assigned<Option<Box<ObservedProperty>>>,
    /// Embedded observations: created alongside the stream on insert,
    /// re-linked by id on update.
    pub observations: Vec<Observation>,
}

impl Datastream {
    pub fn with_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiDatastream {
    pub id: Option<Id>,
    pub name: Assigned<Option<String>>,
    pub description: Assigned<Option<String>>,
    pub observation_type: Assigned<Option<String>>,
    pub multi_observation_data_types: Assigned<Option<Vec<String>>>,
    pub unit_of_measurements: Assigned<Option<Vec<UnitOfMeasurement>>>,
    pub properties: Assigned<Option<JsonValue>>,
    pub phenomenon_time: Assigned<Option<TimeValue>>,
    pub result_time: Assigned<Option<TimeValue>>,
    pub thing: Assigned<Option<Box<Thing>>>,
    pub sensor: Assigned<Option<Box<Sensor>>>,
    /// Ordered; position matches the data-type and unit lists.
    pub observed_properties: Vec<ObservedProperty>,
    pub observations: Vec<Observation>,
}

impl MultiDatastream {
    pub fn with_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Option<Id>,
    pub phenomenon_time: Assigned<Option<TimeValue>>,
    pub result_time: Assigned<Option<Instant>>,
    pub result: Assigned<Option<ResultValue>>,
    pub result_quality: Assigned<Option<JsonValue>>,
    pub valid_time: Assigned<Option<TimeValue>>,
    pub parameters: Assigned<Option<JsonValue>>,
    pub datastream: Assigned<Option<Box<Datastream>>>,
    pub multi_datastream: Assigned<Option<Box<MultiDatastream>>>,
    pub feature_of_interest: Assigned<Option<Box<FeatureOfInterest>>>,
}

impl Observation {
    pub fn with_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

/// A typed node of the navigation graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    Thing(Thing),
    Sensor(Sensor),
    ObservedProperty(ObservedProperty),
    FeatureOfInterest(FeatureOfInterest),
    Datastream(Datastream),
    MultiDatastream(MultiDatastream),
    Observation(Observation),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Thing(_) => EntityType::Thing,
            Entity::Sensor(_) => EntityType::Sensor,
            Entity::ObservedProperty(_) => EntityType::ObservedProperty,
            Entity::FeatureOfInterest(_) => EntityType::FeatureOfInterest,
            Entity::Datastream(_) => EntityType::Datastream,
            Entity::MultiDatastream(_) => EntityType::MultiDatastream,
            Entity::Observation(_) => EntityType::Observation,
        }
    }

    pub fn id(&self) -> Option<&Id> {
        match self {
            Entity::Thing(entity) => entity.id.as_ref(),
            Entity::Sensor(entity) => entity.id.as_ref(),
            Entity::ObservedProperty(entity) => entity.id.as_ref(),
            Entity::FeatureOfInterest(entity) => entity.id.as_ref(),
            Entity::Datastream(entity) => entity.id.as_ref(),
            Entity::MultiDatastream(entity) => entity.id.as_ref(),
            Entity::Observation(entity) => entity.id.as_ref(),
        }
    }

    pub fn set_id(&mut self, id: Id) {
        match self {
            Entity::Thing(entity) => entity.id = Some(id),
            Entity::Sensor(entity) => entity.id = Some(id),
            Entity::ObservedProperty(entity) => entity.id = Some(id),
            Entity::FeatureOfInterest(entity) => entity.id = Some(id),
            Entity::Datastream(entity) => entity.id = Some(id),
            Entity::MultiDatastream(entity) => entity.id = Some(id),
            Entity::Observation(entity) => entity.id = Some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Assigned, Entity, EntityType, Thing};
    use crate::Id;

    #[test]
    fn assigned_distinguishes_unset_null_and_value() {
        let unset: Assigned<Option<String>> = Assigned::Unset;
        assert!(!unset.is_set());
        assert!(unset.as_some().is_none());

        let cleared: Assigned<Option<String>> = Assigned::null();
        assert!(cleared.is_set());
        assert!(cleared.as_some().is_none());

        let named = Assigned::some("pump".to_string());
        assert!(named.is_set());
        assert_eq!(named.as_some().map(String::as_str), Some("pump"));
    }

    #[test]
    fn entity_wraps_id_access() {
        let mut entity = Entity::Thing(Thing::default());
        assert_eq!(entity.entity_type(), EntityType::Thing);
        assert!(entity.id().is_none());
        entity.set_id(Id::Long(9));
        assert_eq!(entity.id(), Some(&Id::Long(9)));
    }
}
