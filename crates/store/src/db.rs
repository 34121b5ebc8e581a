use sea_orm::sea_query;
use sea_orm_migration::prelude::Iden;

#[derive(Iden, Clone, Copy)]
pub enum Things {
    Table,
    Id,
    Name,
    Description,
    Properties,
}

#[derive(Iden, Clone, Copy)]
pub enum Sensors {
    Table,
    Id,
    Name,
    Description,
    EncodingType,
    Metadata,
}

#[derive(Iden, Clone, Copy)]
pub enum ObsProperties {
    Table,
    Id,
    Name,
    Definition,
    Description,
}

#[derive(Iden, Clone, Copy)]
pub enum Features {
    Table,
    Id,
    Name,
    Description,
    EncodingType,
    Feature,
    Properties,
}

#[derive(Iden, Clone, Copy)]
pub enum Datastreams {
    Table,
    Id,
    Name,
    Description,
    ObservationType,
    PhenomenonTimeStart,
    PhenomenonTimeEnd,
    ResultTimeStart,
    ResultTimeEnd,
    UnitName,
    UnitSymbol,
    UnitDefinition,
    Properties,
    SensorId,
    ObsPropertyId,
    ThingId,
}

#[derive(Iden, Clone, Copy)]
pub enum MultiDatastreams {
    Table,
    Id,
    Name,
    Description,
    ObservationTypes,
    PhenomenonTimeStart,
    PhenomenonTimeEnd,
    ResultTimeStart,
    ResultTimeEnd,
    UnitOfMeasurements,
    Properties,
    SensorId,
    ThingId,
}

#[derive(Iden, Clone, Copy)]
pub enum MultiDatastreamsObsProperties {
    Table,
    MultiDatastreamId,
    ObsPropertyId,
    Rank,
}

#[derive(Iden, Clone, Copy)]
pub enum Observations {
    Table,
    Id,
    PhenomenonTimeStart,
    PhenomenonTimeEnd,
    ResultTime,
    ResultType,
    ResultNumber,
    ResultString,
    ResultBoolean,
    ResultJson,
    ResultQuality,
    ValidTimeStart,
    ValidTimeEnd,
    Parameters,
    DatastreamId,
    MultiDatastreamId,
    FeatureId,
}
