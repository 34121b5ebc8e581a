pub mod config;
pub mod db;
pub mod expression;
pub mod factories;
pub mod migration;
pub mod query;
pub mod store;

pub use aisthesis_model as model;

pub use config::{DatabaseConfig, PoolConfig, StoreConfig};
pub use expression::{observation_field, observation_result, FieldType, FieldWrapper, TypedColumn};
pub use factories::{
    DatastreamFactory, EntityFactories, EntityFactory, FeatureFactory, MultiDatastreamFactory,
    ObservationFactory, ObservedPropertyFactory, SensorFactory, ThingFactory,
};
pub use migration::Migrator;
pub use query::{EntityQuery, OrderBy, SortOrder};
pub use store::{SensorStore, StreamRef};
