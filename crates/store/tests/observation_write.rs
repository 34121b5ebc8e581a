use aisthesis_store::db::Observations;
use aisthesis_store::model::{
    Assigned, Datastream, Entity, EntityProperty, EntityType, FeatureOfInterest, Id, Observation,
    ObservedProperty, ResultValue, Sensor, StoreResult, Thing, UnitOfMeasurement, WriteContext,
};
use aisthesis_store::{EntityQuery, SensorStore};
use sea_orm::sea_query::{Expr, Query, QueryStatementWriter, SqliteQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use serde_json::json;
use tempfile::tempdir;

fn new_thing() -> Thing {
    Thing {
        name: Assigned::some("weather station".to_string()),
        description: Assigned::some("rooftop weather station".to_string()),
        ..Default::default()
    }
}

fn new_sensor() -> Sensor {
    Sensor {
        name: Assigned::some("DHT22".to_string()),
        description: Assigned::some("temperature and humidity sensor".to_string()),
        encoding_type: Assigned::some("application/pdf".to_string()),
        metadata: Assigned::some("https://example.org/dht22.pdf".to_string()),
        ..Default::default()
    }
}

fn new_observed_property() -> ObservedProperty {
    ObservedProperty {
        name: Assigned::some("temperature".to_string()),
        definition: Assigned::some("http://example.org/temperature".to_string()),
        description: Assigned::some("air temperature".to_string()),
        ..Default::default()
    }
}

fn new_datastream() -> Datastream {
    Datastream {
        name: Assigned::some("air temperature".to_string()),
        description: Assigned::some("air temperature on the roof".to_string()),
        observation_type: Assigned::some(
            "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement".to_string(),
        ),
        unit_of_measurement: Assigned::some(UnitOfMeasurement::new(
            "degree celsius",
            "C",
            "ucum:Cel",
        )),
        thing: Assigned::some(Box::new(new_thing())),
        sensor: Assigned::some(Box::new(new_sensor())),
        observed_property: Assigned::some(Box::new(new_observed_property())),
        ..Default::default()
    }
}

fn new_feature() -> FeatureOfInterest {
    FeatureOfInterest {
        name: Assigned::some("roof".to_string()),
        description: Assigned::some("the roof the station sits on".to_string()),
        encoding_type: Assigned::some("application/geo+json".to_string()),
        feature: Assigned::some(json!({"type": "Point", "coordinates": [8.4, 49.0]})),
        ..Default::default()
    }
}

async fn insert_datastream(store: &SensorStore) -> StoreResult<Id> {
    let mut entity = Entity::Datastream(new_datastream());
    store
        .insert_entity(&mut entity, &WriteContext::collection(EntityType::Datastream))
        .await
}

#[tokio::test]
async fn number_result_stores_discriminator_and_mirror() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;
    let stream_id = insert_datastream(&store).await?;

    let observation = Observation {
        result: Assigned::some(ResultValue::from(42i64)),
        datastream: Assigned::some(Box::new(Datastream::with_id(stream_id))),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    };
    let mut entity = Entity::Observation(observation);
    let id = store
        .insert_entity(&mut entity, &WriteContext::collection(EntityType::Observation))
        .await?;

    let (sql, values) = Query::select()
        .from(Observations::Table)
        .columns([
            Observations::ResultType,
            Observations::ResultString,
            Observations::ResultNumber,
            Observations::ResultBoolean,
            Observations::ResultJson,
        ])
        .and_where(Expr::col(Observations::Id).eq(id.as_long().expect("long id")))
        .build(SqliteQueryBuilder);
    let row = store
        .connection()
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            sql,
            values,
        ))
        .await?
        .expect("stored row");
    assert_eq!(row.try_get::<Option<i16>>("", "result_type")?, Some(0));
    assert_eq!(
        row.try_get::<Option<String>>("", "result_string")?,
        Some("42".to_string())
    );
    assert_eq!(row.try_get::<Option<f64>>("", "result_number")?, Some(42.0));
    assert_eq!(row.try_get::<Option<bool>>("", "result_boolean")?, None);
    assert_eq!(row.try_get::<Option<String>>("", "result_json")?, None);
    Ok(())
}

#[tokio::test]
async fn results_round_trip_through_the_store() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;
    let stream_id = insert_datastream(&store).await?;

    let cases = vec![
        ResultValue::from(true),
        ResultValue::from(42i64),
        ResultValue::from("dry"),
        ResultValue::Json(json!({"levels": [1, 2, 3]})),
    ];
    for result in cases {
        let observation = Observation {
            result: Assigned::some(result.clone()),
            datastream: Assigned::some(Box::new(Datastream::with_id(stream_id.clone()))),
            feature_of_interest: Assigned::some(Box::new(new_feature())),
            ..Default::default()
        };
        let mut entity = Entity::Observation(observation);
        let id = store
            .insert_entity(&mut entity, &WriteContext::collection(EntityType::Observation))
            .await?;
        let fetched = store
            .get_entity(EntityType::Observation, &id, &EntityQuery::default())
            .await?
            .expect("observation");
        match fetched {
            Entity::Observation(fetched) => {
                assert_eq!(fetched.result.as_some(), Some(&result));
                assert!(fetched.phenomenon_time.is_set());
            }
            other => panic!("expected observation, got {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn select_list_gates_expensive_fields() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;
    let stream_id = insert_datastream(&store).await?;

    let observation = Observation {
        result: Assigned::some(ResultValue::from(1i64)),
        parameters: Assigned::some(json!({"probe": 4})),
        datastream: Assigned::some(Box::new(Datastream::with_id(stream_id))),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    };
    let mut entity = Entity::Observation(observation);
    let id = store
        .insert_entity(&mut entity, &WriteContext::collection(EntityType::Observation))
        .await?;

    let query = EntityQuery::selecting([EntityProperty::PhenomenonTime]);
    let fetched = store
        .get_entity(EntityType::Observation, &id, &query)
        .await?
        .expect("observation");
    match fetched {
        Entity::Observation(fetched) => {
            assert!(!fetched.result.is_set());
            assert!(!fetched.parameters.is_set());
            assert!(fetched.phenomenon_time.is_set());
            // Navigation ids are always populated.
            assert!(fetched.datastream.as_some().is_some());
        }
        other => panic!("expected observation, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn insert_under_stream_context_needs_no_explicit_link() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;
    let stream_id = insert_datastream(&store).await?;

    // The path Datastreams(id)/Observations fixes the link; the entity only
    // carries the result. The factory still needs the link, so the caller
    // materializes the context parent onto the entity.
    let observation = Observation {
        result: Assigned::some(ResultValue::from(5i64)),
        datastream: Assigned::some(Box::new(Datastream::with_id(stream_id.clone()))),
        feature_of_interest: Assigned::some(Box::new(new_feature())),
        ..Default::default()
    };
    let context = WriteContext::under(
        EntityType::Observation,
        EntityType::Datastream,
        stream_id.clone(),
    );
    let mut entity = Entity::Observation(observation);
    store.insert_entity(&mut entity, &context).await?;
    Ok(())
}
