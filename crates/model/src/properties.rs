use serde::{Deserialize, Serialize};

/// Scalar or structured attributes addressable on an entity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum EntityProperty {
    Name,
    Description,
    Definition,
    EncodingType,
    Metadata,
    Feature,
    Properties,
    Parameters,
    ObservationType,
    MultiObservationDataTypes,
    UnitOfMeasurement,
    UnitOfMeasurements,
    Result,
    ResultQuality,
    PhenomenonTime,
    ResultTime,
    ValidTime,
}

impl EntityProperty {
    pub fn json_name(&self) -> &'static str {
        match self {
            EntityProperty::Name => "name",
            EntityProperty::Description => "description",
            EntityProperty::Definition => "definition",
            EntityProperty::EncodingType => "encodingType",
            EntityProperty::Metadata => "metadata",
            EntityProperty::Feature => "feature",
            EntityProperty::Properties => "properties",
            EntityProperty::Parameters => "parameters",
            EntityProperty::ObservationType => "observationType",
            EntityProperty::MultiObservationDataTypes => "multiObservationDataTypes",
            EntityProperty::UnitOfMeasurement => "unitOfMeasurement",
            EntityProperty::UnitOfMeasurements => "unitOfMeasurements",
            EntityProperty::Result => "result",
            EntityProperty::ResultQuality => "resultQuality",
            EntityProperty::PhenomenonTime => "phenomenonTime",
            EntityProperty::ResultTime => "resultTime",
            EntityProperty::ValidTime => "validTime",
        }
    }
}

/// Links to related entities or entity collections.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum NavigationProperty {
    Thing,
    Sensor,
    ObservedProperty,
    ObservedProperties,
    Datastream,
    MultiDatastream,
    FeatureOfInterest,
    Observations,
}

impl NavigationProperty {
    pub fn json_name(&self) -> &'static str {
        match self {
            NavigationProperty::Thing => "Thing",
            NavigationProperty::Sensor => "Sensor",
            NavigationProperty::ObservedProperty => "ObservedProperty",
            NavigationProperty::ObservedProperties => "ObservedProperties",
            NavigationProperty::Datastream => "Datastream",
            NavigationProperty::MultiDatastream => "MultiDatastream",
            NavigationProperty::FeatureOfInterest => "FeatureOfInterest",
            NavigationProperty::Observations => "Observations",
        }
    }
}
