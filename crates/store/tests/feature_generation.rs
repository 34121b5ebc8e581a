use aisthesis_store::model::{
    Assigned, Datastream, Entity, EntityType, FeatureOfInterest, Observation, ObservedProperty,
    ResultValue, Sensor, StoreError, StoreResult, Thing, TimeValue, UnitOfMeasurement,
    WriteContext,
};
use aisthesis_store::SensorStore;
use serde_json::json;
use tempfile::tempdir;

fn new_datastream(name: &str) -> Datastream {
    Datastream {
        name: Assigned::some(name.to_string()),
        description: Assigned::some(format!("{name} readings")),
        observation_type: Assigned::some(
            "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement".to_string(),
        ),
        unit_of_measurement: Assigned::some(UnitOfMeasurement::new("lux", "lx", "ucum:lx")),
        thing: Assigned::some(Box::new(Thing {
            name: Assigned::some("mast".to_string()),
            description: Assigned::some("the sensor mast".to_string()),
            ..Default::default()
        })),
        sensor: Assigned::some(Box::new(Sensor {
            name: Assigned::some("photometer".to_string()),
            description: Assigned::some("light sensor".to_string()),
            encoding_type: Assigned::some("text/html".to_string()),
            metadata: Assigned::some("https://example.org/photometer".to_string()),
            ..Default::default()
        })),
        observed_property: Assigned::some(Box::new(ObservedProperty {
            name: Assigned::some("illuminance".to_string()),
            definition: Assigned::some("http://example.org/illuminance".to_string()),
            description: Assigned::some("ambient light level".to_string()),
            ..Default::default()
        })),
        ..Default::default()
    }
}

fn feature(name: &str) -> FeatureOfInterest {
    FeatureOfInterest {
        name: Assigned::some(name.to_string()),
        description: Assigned::some(format!("{name} feature")),
        encoding_type: Assigned::some("application/geo+json".to_string()),
        feature: Assigned::some(json!({"type": "Point", "coordinates": [0.0, 0.0]})),
        ..Default::default()
    }
}

#[tokio::test]
async fn omitted_feature_reuses_most_recent_one() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;
    let mut stream = Entity::Datastream(new_datastream("illuminance"));
    let stream_id = store
        .insert_entity(&mut stream, &WriteContext::collection(EntityType::Datastream))
        .await?;

    // First observation fixes the feature explicitly.
    let mut first = Entity::Observation(Observation {
        result: Assigned::some(ResultValue::from(800i64)),
        phenomenon_time: Assigned::some(TimeValue::instant(100)),
        datastream: Assigned::some(Box::new(Datastream::with_id(stream_id.clone()))),
        feature_of_interest: Assigned::some(Box::new(feature("north face"))),
        ..Default::default()
    });
    store
        .insert_entity(&mut first, &WriteContext::collection(EntityType::Observation))
        .await?;
    let first_feature_id = match &first {
        Entity::Observation(observation) => observation
            .feature_of_interest
            .as_some()
            .and_then(|feature| feature.id.clone())
            .expect("feature id"),
        other => panic!("expected observation, got {other:?}"),
    };

    // A later explicit feature becomes the most recent one.
    let mut second = Entity::Observation(Observation {
        result: Assigned::some(ResultValue::from(650i64)),
        phenomenon_time: Assigned::some(TimeValue::instant(200)),
        datastream: Assigned::some(Box::new(Datastream::with_id(stream_id.clone()))),
        feature_of_interest: Assigned::some(Box::new(feature("south face"))),
        ..Default::default()
    });
    store
        .insert_entity(&mut second, &WriteContext::collection(EntityType::Observation))
        .await?;
    let second_feature_id = match &second {
        Entity::Observation(observation) => observation
            .feature_of_interest
            .as_some()
            .and_then(|feature| feature.id.clone())
            .expect("feature id"),
        other => panic!("expected observation, got {other:?}"),
    };
    assert_ne!(first_feature_id, second_feature_id);

    // An observation without a feature inherits the most recent one.
    let mut third = Entity::Observation(Observation {
        result: Assigned::some(ResultValue::from(700i64)),
        phenomenon_time: Assigned::some(TimeValue::instant(300)),
        datastream: Assigned::some(Box::new(Datastream::with_id(stream_id.clone()))),
        ..Default::default()
    });
    store
        .insert_entity(&mut third, &WriteContext::collection(EntityType::Observation))
        .await?;
    match &third {
        Entity::Observation(observation) => {
            let derived = observation
                .feature_of_interest
                .as_some()
                .and_then(|feature| feature.id.clone());
            assert_eq!(derived, Some(second_feature_id));
        }
        other => panic!("expected observation, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn omitted_feature_with_no_history_is_incomplete() -> StoreResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = SensorStore::connect_sqlite(&dir.path().join("db.sqlite")).await?;
    let mut stream = Entity::Datastream(new_datastream("illuminance"));
    let stream_id = store
        .insert_entity(&mut stream, &WriteContext::collection(EntityType::Datastream))
        .await?;

    let mut entity = Entity::Observation(Observation {
        result: Assigned::some(ResultValue::from(1i64)),
        datastream: Assigned::some(Box::new(Datastream::with_id(stream_id))),
        ..Default::default()
    });
    let err = store
        .insert_entity(&mut entity, &WriteContext::collection(EntityType::Observation))
        .await
        .expect_err("no feature to derive");
    assert!(matches!(err, StoreError::Incomplete { .. }));
    Ok(())
}
