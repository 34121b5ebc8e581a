use aisthesis_store::db::MultiDatastreamsObsProperties;
use aisthesis_store::model::{
    Assigned, Entity, EntityType, FeatureOfInterest, MultiDatastream, Observation,
    ObservedProperty, ResultValue, Sensor, StoreError, StoreResult, Thing, UnitOfMeasurement,
    WriteContext, COMPLEX_OBSERVATION_TYPE,
};
use aisthesis_store::SensorStore;
use sea_orm::sea_query::{Expr, Order, Query, QueryStatementWriter, SqliteQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use serde_json::json;
use tempfile::tempdir;

fn new_thing() -> Thing {
    Thing {
        name: Assigned::some("river gauge".to_string()),
        description: Assigned::some("gauge at the bridge".to_string()),
        ..Default::default()
    }
}

fn new_sensor() -> Sensor {
    Sensor {
        name: Assigned::some("multi probe".to_string()),
        description: Assigned::some("combined probe".to_string()),
        encoding_type: Assigned::some("text/html".to_string()),
        metadata: Assigned::some("https://example.org/probe".to_string()),
        ..Default::default()
    }
}

fn observed_property(name: &str) -> ObservedProperty {
    ObservedProperty {
        name: Assigned::some(name.to_string()),
        definition: Assigned::some(format!("http://example.org/{name}")),
        description: Assigned::some(format!("{name} of the river")),
        ..Default::default()
    }
}

fn new_multi_datastream(property_names: &[&str]) -> MultiDatastream {
    let measurement =
        "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement".to_string();
    MultiDatastream {
        name: Assigned::some("river conditions".to_string()),
        description: Assigned::some("level and temperature".to_string()),
        observation_type: Assigned::some(COMPLEX_OBSERVATION_TYPE.to_string()),
        multi_observation_data_types: Assigned::some(vec![measurement; property_names.len()]),
        unit_of_measurements: Assigned::some(vec![
            UnitOfMeasurement::new("metre", "m", "ucum:m");
            property_names.len()
        ]),
        thing: Assigned::some(Box::new(new_thing())),
        sensor: Assigned::some(Box::new(new_sensor())),
        observed_properties: property_names
            .iter()
            .map(|name| observed_property(name))
            .collect(),
        ..Default::default()
    }
}

fn new_feature() -> FeatureOfInterest {
    FeatureOfInterest {
        name: Assigned::some("bridge pier".to_string()),
        description: Assigned::some("the pier the gauge hangs from".to_string()),
        encoding_type: Assigned::some("application/geo+json".to_string()),
        feature: Assigned::some(json!({"type": "Point", "coordinates": [10.0, 53.5]})),
        ..Default::default()
    }
}

#[tokio::test]
async fn insert_links_observed_properties_in_rank_order() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    let mut entity = Entity::MultiDatastream(new_multi_datastream(&["level", "temperature"]));
    let stream_id = store
        .insert_entity(
            &mut entity,
            &WriteContext::collection(EntityType::MultiDatastream),
        )
        .await?;

    let (sql, values) = Query::select()
        .from(MultiDatastreamsObsProperties::Table)
        .columns([
            MultiDatastreamsObsProperties::ObsPropertyId,
            MultiDatastreamsObsProperties::Rank,
        ])
        .and_where(
            Expr::col(MultiDatastreamsObsProperties::MultiDatastreamId)
                .eq(stream_id.as_long().expect("long id")),
        )
        .order_by(MultiDatastreamsObsProperties::Rank, Order::Asc)
        .build(SqliteQueryBuilder);
    let rows = store
        .connection()
        .query_all(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            sql,
            values,
        ))
        .await?;
    assert_eq!(rows.len(), 2);
    for (rank, row) in rows.iter().enumerate() {
        assert_eq!(row.try_get::<i32>("", "rank")?, rank as i32);
    }
    Ok(())
}

#[tokio::test]
async fn mismatched_list_lengths_never_reach_the_store() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    let mut stream = new_multi_datastream(&["level", "temperature"]);
    stream.unit_of_measurements =
        Assigned::some(vec![UnitOfMeasurement::new("metre", "m", "ucum:m")]);
    let err = store
        .insert_entity(
            &mut Entity::MultiDatastream(stream),
            &WriteContext::collection(EntityType::MultiDatastream),
        )
        .await
        .expect_err("one unit for two data types");
    assert!(matches!(err, StoreError::Incomplete { .. }));

    let mut stream = new_multi_datastream(&["level", "temperature"]);
    stream.observation_type = Assigned::some("http://example.org/not-complex".to_string());
    let err = store
        .insert_entity(
            &mut Entity::MultiDatastream(stream),
            &WriteContext::collection(EntityType::MultiDatastream),
        )
        .await
        .expect_err("wrong observation type");
    assert!(matches!(err, StoreError::Incomplete { .. }));
    Ok(())
}

#[tokio::test]
async fn result_arity_must_match_observed_properties() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    let mut entity = Entity::MultiDatastream(new_multi_datastream(&["level", "temperature"]));
    let stream_id = store
        .insert_entity(
            &mut entity,
            &WriteContext::collection(EntityType::MultiDatastream),
        )
        .await?;

    let mut fits = Entity::Observation(Observation {
        result: Assigned::some(ResultValue::Json(json!(["a", "b"]))),
        multi_datastream: Assigned::some(Box::new(MultiDatastream::with_id(stream_id.clone()))),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    });
    store
        .insert_entity(&mut fits, &WriteContext::collection(EntityType::Observation))
        .await?;

    let mut wrong_arity = Entity::Observation(Observation {
        result: Assigned::some(ResultValue::Json(json!(["a", "b", "c"]))),
        multi_datastream: Assigned::some(Box::new(MultiDatastream::with_id(stream_id.clone()))),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    });
    let err = store
        .insert_entity(
            &mut wrong_arity,
            &WriteContext::collection(EntityType::Observation),
        )
        .await
        .expect_err("three results for two observed properties");
    assert!(matches!(err, StoreError::InvalidArgument { .. }));

    let mut scalar = Entity::Observation(Observation {
        result: Assigned::some(ResultValue::from(3i64)),
        multi_datastream: Assigned::some(Box::new(MultiDatastream::with_id(stream_id))),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    });
    let err = store
        .insert_entity(
            &mut scalar,
            &WriteContext::collection(EntityType::Observation),
        )
        .await
        .expect_err("scalar result for a MultiDatastream");
    assert!(matches!(err, StoreError::InvalidArgument { .. }));
    Ok(())
}

#[tokio::test]
async fn update_keeps_the_list_invariant() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    let mut entity = Entity::MultiDatastream(new_multi_datastream(&["level", "temperature"]));
    let stream_id = store
        .insert_entity(
            &mut entity,
            &WriteContext::collection(EntityType::MultiDatastream),
        )
        .await?;

    // Growing the data-type list alone breaks both the unit and the linked
    // observed-property cardinality.
    let measurement =
        "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement".to_string();
    let patch = MultiDatastream {
        multi_observation_data_types: Assigned::some(vec![measurement.clone(); 3]),
        ..Default::default()
    };
    let err = store
        .update_entity(&Entity::MultiDatastream(patch), &stream_id)
        .await
        .expect_err("three data types, two units");
    assert!(matches!(err, StoreError::InvalidArgument { .. }));

    // Growing every list together, with the third observed property linked,
    // keeps the invariant.
    let mut third = Entity::ObservedProperty(observed_property("turbidity"));
    let third_id = store
        .insert_entity(
            &mut third,
            &WriteContext::collection(EntityType::ObservedProperty),
        )
        .await?;
    let patch = MultiDatastream {
        multi_observation_data_types: Assigned::some(vec![measurement; 3]),
        unit_of_measurements: Assigned::some(vec![
            UnitOfMeasurement::new("metre", "m", "ucum:m");
            3
        ]),
        observed_properties: vec![ObservedProperty::with_id(third_id)],
        ..Default::default()
    };
    let change = store
        .update_entity(&Entity::MultiDatastream(patch), &stream_id)
        .await?;
    assert!(!change.is_empty());
    Ok(())
}
