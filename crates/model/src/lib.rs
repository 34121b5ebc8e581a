pub mod change;
pub mod complete;
pub mod entity;
pub mod error;
pub mod ids;
pub mod properties;
pub mod time;
pub mod value;

pub use change::ChangeDescription;
pub use complete::{check_complete, ParentRef, WriteContext};
pub use entity::{
    Assigned, Datastream, Entity, EntityType, FeatureOfInterest, MultiDatastream, Observation,
    ObservedProperty, Sensor, Thing, UnitOfMeasurement, COMPLEX_OBSERVATION_TYPE,
};
pub use error::{StoreError, StoreResult};
pub use ids::{Id, IdCodec, IdKind};
pub use properties::{EntityProperty, NavigationProperty};
pub use time::{Instant, TimeValue, TIME_MAX, TIME_MIN};
pub use value::{decode_result, encode_result, EncodedResult, ResultKind, ResultValue};
