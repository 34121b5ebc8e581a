use aisthesis_store::db::{Datastreams, Things};
use aisthesis_store::model::{
    Assigned, Datastream, Entity, EntityType, FeatureOfInterest, Id, Observation,
    ObservedProperty, ResultValue, Sensor, StoreError, StoreResult, Thing, UnitOfMeasurement,
    WriteContext,
};
use aisthesis_store::{EntityQuery, SensorStore, StreamRef};
use sea_orm::sea_query::{Alias, Expr, Func, Query, QueryStatementWriter, SqliteQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use serde_json::json;
use tempfile::tempdir;

fn new_thing() -> Thing {
    Thing {
        name: Assigned::some("greenhouse".to_string()),
        description: Assigned::some("the greenhouse out back".to_string()),
        ..Default::default()
    }
}

fn new_sensor() -> Sensor {
    Sensor {
        name: Assigned::some("SHT31".to_string()),
        description: Assigned::some("humidity sensor".to_string()),
        encoding_type: Assigned::some("application/pdf".to_string()),
        metadata: Assigned::some("https://example.org/sht31.pdf".to_string()),
        ..Default::default()
    }
}

fn new_observed_property() -> ObservedProperty {
    ObservedProperty {
        name: Assigned::some("humidity".to_string()),
        definition: Assigned::some("http://example.org/humidity".to_string()),
        description: Assigned::some("relative humidity".to_string()),
        ..Default::default()
    }
}

fn new_datastream() -> Datastream {
    Datastream {
        name: Assigned::some("humidity".to_string()),
        description: Assigned::some("humidity in the greenhouse".to_string()),
        observation_type: Assigned::some(
            "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement".to_string(),
        ),
        unit_of_measurement: Assigned::some(UnitOfMeasurement::new("percent", "%", "ucum:%")),
        thing: Assigned::some(Box::new(new_thing())),
        sensor: Assigned::some(Box::new(new_sensor())),
        observed_property: Assigned::some(Box::new(new_observed_property())),
        ..Default::default()
    }
}

fn new_feature() -> FeatureOfInterest {
    FeatureOfInterest {
        name: Assigned::some("bench 3".to_string()),
        description: Assigned::some("third bench from the door".to_string()),
        encoding_type: Assigned::some("application/geo+json".to_string()),
        feature: Assigned::some(json!({"type": "Point", "coordinates": [1.0, 2.0]})),
        ..Default::default()
    }
}

async fn count_rows(
    store: &SensorStore,
    table: impl sea_orm::sea_query::Iden + 'static,
    column: impl sea_orm::sea_query::Iden + 'static,
) -> StoreResult<i64> {
    let (sql, values) = Query::select()
        .from(table)
        .expr_as(Func::count(Expr::col(column)), Alias::new("cnt"))
        .build(SqliteQueryBuilder);
    let row = store
        .connection()
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            sql,
            values,
        ))
        .await?
        .expect("count row");
    Ok(row.try_get::<i64>("", "cnt")?)
}

#[tokio::test]
async fn embedded_entities_are_created_bottom_up() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    // A new observation referencing a new datastream referencing a new
    // thing, sensor, and observed property resolves bottom-up in one go.
    let observation = Observation {
        result: Assigned::some(ResultValue::from(55i64)),
        datastream: Assigned::some(Box::new(new_datastream())),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    };
    let mut entity = Entity::Observation(observation);
    store
        .insert_entity(&mut entity, &WriteContext::collection(EntityType::Observation))
        .await?;

    assert_eq!(count_rows(&store, Things::Table, Things::Id).await?, 1);
    assert_eq!(
        count_rows(&store, Datastreams::Table, Datastreams::Id).await?,
        1
    );

    // The generated ids were assigned back onto the embedded entities.
    match &entity {
        Entity::Observation(observation) => {
            let stream = observation.datastream.as_some().expect("datastream");
            assert!(stream.id.is_some());
            assert!(stream.thing.as_some().expect("thing").id.is_some());
        }
        other => panic!("expected observation, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn referencing_an_existing_stream_reuses_it() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    let mut stream = Entity::Datastream(new_datastream());
    let stream_id = store
        .insert_entity(&mut stream, &WriteContext::collection(EntityType::Datastream))
        .await?;

    for value in [40i64, 41] {
        let observation = Observation {
            result: Assigned::some(ResultValue::from(value)),
            datastream: Assigned::some(Box::new(Datastream::with_id(stream_id.clone()))),
            feature_of_interest: Assigned::some(Box::new(new_feature())),
            ..Default::default()
        };
        let mut entity = Entity::Observation(observation);
        store
            .insert_entity(&mut entity, &WriteContext::collection(EntityType::Observation))
            .await?;
    }

    assert_eq!(
        count_rows(&store, Datastreams::Table, Datastreams::Id).await?,
        1
    );
    let observations = store
        .list_observations(Some(StreamRef::Datastream(&stream_id)), &EntityQuery::default())
        .await?;
    assert_eq!(observations.len(), 2);
    Ok(())
}

#[tokio::test]
async fn dangling_reference_fails_and_writes_nothing() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    let observation = Observation {
        result: Assigned::some(ResultValue::from(12i64)),
        datastream: Assigned::some(Box::new(Datastream::with_id(Id::Long(404)))),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    };
    let mut entity = Entity::Observation(observation);
    let err = store
        .insert_entity(&mut entity, &WriteContext::collection(EntityType::Observation))
        .await
        .expect_err("dangling datastream id");
    assert!(matches!(err, StoreError::NoSuchEntity { .. }));

    let observations = store.list_observations(None, &EntityQuery::default()).await?;
    assert!(observations.is_empty());
    Ok(())
}

#[tokio::test]
async fn datastream_insert_cascades_embedded_observations() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    let mut stream = new_datastream();
    stream.observations = vec![
        Observation {
            result: Assigned::some(ResultValue::from(50i64)),
            feature_of_interest: Assigned::some(Box::new(new_feature())),
            ..Default::default()
        },
        Observation {
            result: Assigned::some(ResultValue::from(51i64)),
            feature_of_interest: Assigned::some(Box::new(new_feature())),
            ..Default::default()
        },
    ];
    let mut entity = Entity::Datastream(stream);
    let stream_id = store
        .insert_entity(&mut entity, &WriteContext::collection(EntityType::Datastream))
        .await?;

    let observations = store
        .list_observations(Some(StreamRef::Datastream(&stream_id)), &EntityQuery::default())
        .await?;
    assert_eq!(observations.len(), 2);
    for observation in &observations {
        let stream = observation.datastream.as_some().expect("stream link");
        assert_eq!(stream.id.as_ref(), Some(&stream_id));
    }
    Ok(())
}

#[tokio::test]
async fn update_relinks_existing_observations() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;

    let mut first = Entity::Datastream(new_datastream());
    let first_id = store
        .insert_entity(&mut first, &WriteContext::collection(EntityType::Datastream))
        .await?;
    let mut second = Entity::Datastream(new_datastream());
    let second_id = store
        .insert_entity(&mut second, &WriteContext::collection(EntityType::Datastream))
        .await?;

    let observation = Observation {
        result: Assigned::some(ResultValue::from(9i64)),
        datastream: Assigned::some(Box::new(Datastream::with_id(first_id))),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    };
    let mut entity = Entity::Observation(observation);
    let observation_id = store
        .insert_entity(&mut entity, &WriteContext::collection(EntityType::Observation))
        .await?;

    let patch = Datastream {
        observations: vec![Observation::with_id(observation_id.clone())],
        ..Default::default()
    };
    store
        .update_entity(&Entity::Datastream(patch), &second_id)
        .await?;

    let moved = store
        .list_observations(Some(StreamRef::Datastream(&second_id)), &EntityQuery::default())
        .await?;
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].id.as_ref(), Some(&observation_id));

    // Re-linking an unknown observation fails.
    let patch = Datastream {
        observations: vec![Observation::with_id(Id::Long(12_345))],
        ..Default::default()
    };
    let err = store
        .update_entity(&Entity::Datastream(patch), &second_id)
        .await
        .expect_err("unknown observation");
    assert!(matches!(err, StoreError::NoSuchEntity { .. }));
    Ok(())
}
