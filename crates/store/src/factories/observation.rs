use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Query, SelectStatement, SimpleExpr};
use sea_orm::{DatabaseTransaction, QueryResult};

use aisthesis_model::{
    decode_result, encode_result, Assigned, ChangeDescription, Datastream, EncodedResult,
    EntityProperty, EntityType, FeatureOfInterest, Id, Instant, MultiDatastream,
    NavigationProperty, Observation, ResultKind, ResultValue, StoreError, StoreResult, TimeValue,
};

use crate::db::Observations;
use crate::factories::{
    exec, json_or_empty, parse_json, read_bool, read_f64, read_i16, read_i64, read_string,
    EntityFactories, EntityFactory,
};
use crate::query::EntityQuery;

pub struct ObservationFactory<'a> {
    pub(crate) factories: &'a EntityFactories,
}

pub(crate) fn base_select() -> SelectStatement {
    Query::select()
        .from(Observations::Table)
        .columns([
            Observations::Id,
            Observations::PhenomenonTimeStart,
            Observations::PhenomenonTimeEnd,
            Observations::ResultTime,
            Observations::ResultType,
            Observations::ResultNumber,
            Observations::ResultString,
            Observations::ResultBoolean,
            Observations::ResultJson,
            Observations::ResultQuality,
            Observations::ValidTimeStart,
            Observations::ValidTimeEnd,
            Observations::Parameters,
            Observations::DatastreamId,
            Observations::MultiDatastreamId,
            Observations::FeatureId,
        ])
        .to_owned()
}

impl ObservationFactory<'_> {
    /// Column assignments for a result value. When the observation belongs
    /// to a MultiDatastream the result must be an array whose length equals
    /// the stream's observed-property count.
    async fn result_assignments(
        &self,
        tx: &DatabaseTransaction,
        result: &ResultValue,
        multi_stream: Option<&Id>,
    ) -> StoreResult<Vec<(Observations, SimpleExpr)>> {
        if let Some(stream_id) = multi_stream {
            let expected = self
                .factories
                .count_observed_properties(tx, stream_id)
                .await?;
            let actual = result.array_len().ok_or_else(|| {
                StoreError::invalid_argument("a MultiDatastream only accepts array results")
            })? as i64;
            if actual != expected {
                return Err(StoreError::invalid_argument(format!(
                    "size of result array ({actual}) must match the number of observed properties ({expected}) in the MultiDatastream",
                )));
            }
        }
        let encoded = encode_result(result);
        Ok(vec![
            (
                Observations::ResultType,
                encoded.kind.map(ResultKind::as_i16).into(),
            ),
            (Observations::ResultBoolean, encoded.boolean.into()),
            (Observations::ResultNumber, encoded.number.into()),
            (Observations::ResultString, encoded.string.into()),
            (Observations::ResultJson, encoded.json.into()),
        ])
    }
}

#[async_trait]
impl EntityFactory for ObservationFactory<'_> {
    type Entity = Observation;

    fn entity_type(&self) -> EntityType {
        EntityType::Observation
    }

    fn from_row(&self, row: &QueryResult, query: &EntityQuery) -> StoreResult<Observation> {
        let f = self.factories;
        let mut entity = Observation::default();
        entity.id = f.read_opt_id(row, Observations::Id)?;
        if let Some(id) = f.read_opt_id(row, Observations::DatastreamId)? {
            entity.datastream = Assigned::some(Box::new(Datastream::with_id(id)));
        }
        if let Some(id) = f.read_opt_id(row, Observations::MultiDatastreamId)? {
            entity.multi_datastream = Assigned::some(Box::new(MultiDatastream::with_id(id)));
        }
        if let Some(id) = f.read_opt_id(row, Observations::FeatureId)? {
            entity.feature_of_interest = Assigned::some(Box::new(FeatureOfInterest::with_id(id)));
        }
        if let Some(value) = TimeValue::from_bounds(
            read_i64(row, Observations::PhenomenonTimeStart)?,
            read_i64(row, Observations::PhenomenonTimeEnd)?,
        ) {
            entity.phenomenon_time = Assigned::some(value);
        }
        if let Some(at) = read_i64(row, Observations::ResultTime)? {
            entity.result_time = Assigned::some(Instant(at));
        }
        if let Some(value) = TimeValue::from_bounds(
            read_i64(row, Observations::ValidTimeStart)?,
            read_i64(row, Observations::ValidTimeEnd)?,
        ) {
            entity.valid_time = Assigned::some(value);
        }
        if query.wants(EntityProperty::Parameters) {
            if let Some(parameters) = parse_json(read_string(row, Observations::Parameters)?) {
                entity.parameters = Assigned::some(parameters);
            }
        }
        if query.wants(EntityProperty::Result) {
            let encoded = EncodedResult {
                kind: read_i16(row, Observations::ResultType)?.and_then(ResultKind::from_i16),
                boolean: read_bool(row, Observations::ResultBoolean)?,
                number: read_f64(row, Observations::ResultNumber)?,
                string: read_string(row, Observations::ResultString)?,
                json: read_string(row, Observations::ResultJson)?,
            };
            if let Some(result) = decode_result(&encoded) {
                entity.result = Assigned::some(result);
            }
        }
        if query.wants(EntityProperty::ResultQuality) {
            if let Some(quality) = parse_json(read_string(row, Observations::ResultQuality)?) {
                entity.result_quality = Assigned::some(quality);
            }
        }
        Ok(entity)
    }

    async fn insert(&self, tx: &DatabaseTransaction, entity: &mut Observation) -> StoreResult<Id> {
        let f = self.factories;
        let mut is_multi = false;
        let stream_id = if let Some(stream) = entity.datastream.as_some_mut() {
            f.datastream_exists_or_create(tx, stream).await?
        } else if let Some(stream) = entity.multi_datastream.as_some_mut() {
            is_multi = true;
            f.multi_datastream_exists_or_create(tx, stream).await?
        } else {
            return Err(StoreError::incomplete("missing Datastream or MultiDatastream"));
        };

        let feature_id = match entity.feature_of_interest.as_some_mut() {
            Some(feature) => f.feature_exists_or_create(tx, feature).await?,
            None => {
                let derived = f
                    .generate_feature_of_interest(tx, &stream_id, is_multi)
                    .await?;
                entity.feature_of_interest =
                    Assigned::some(Box::new(FeatureOfInterest::with_id(derived.clone())));
                derived
            }
        };

        let mut columns: Vec<Observations> = Vec::new();
        let mut values: Vec<SimpleExpr> = Vec::new();
        if is_multi {
            columns.push(Observations::MultiDatastreamId);
        } else {
            columns.push(Observations::DatastreamId);
        }
        values.push(f.id_value(&stream_id).into());

        let phenomenon_time = entity
            .phenomenon_time
            .as_some()
            .copied()
            .unwrap_or_else(|| TimeValue::Instant(Instant::now_micros()));
        let (start, end) = phenomenon_time.to_bounds();
        columns.push(Observations::PhenomenonTimeStart);
        values.push(start.into());
        columns.push(Observations::PhenomenonTimeEnd);
        values.push(end.into());

        if let Some(at) = entity.result_time.as_some() {
            columns.push(Observations::ResultTime);
            values.push(at.as_micros().into());
        }
        if let Some(valid_time) = entity.valid_time.as_some() {
            let (start, end) = valid_time.to_bounds();
            columns.push(Observations::ValidTimeStart);
            values.push(start.into());
            columns.push(Observations::ValidTimeEnd);
            values.push(end.into());
        }

        let result = entity
            .result
            .as_some()
            .ok_or_else(|| StoreError::incomplete("result must be set"))?;
        let multi_stream = if is_multi { Some(&stream_id) } else { None };
        for (column, value) in self.result_assignments(tx, result, multi_stream).await? {
            columns.push(column);
            values.push(value);
        }

        if let Some(quality) = entity.result_quality.as_some() {
            columns.push(Observations::ResultQuality);
            values.push(quality.to_string().into());
        }
        columns.push(Observations::Parameters);
        values.push(json_or_empty(entity.parameters.as_some()).into());
        columns.push(Observations::FeatureId);
        values.push(f.id_value(&feature_id).into());

        let staged_id = f.stage_insert_id(
            Observations::Id,
            entity.id.as_ref(),
            &mut columns,
            &mut values,
        )?;
        let stmt = Query::insert()
            .into_table(Observations::Table)
            .columns(columns)
            .values_panic(values)
            .to_owned();
        let result = exec(tx, &stmt).await?;
        let id = f.finish_insert_id(staged_id, &result);
        log::debug!("inserted Observation {id}");
        entity.id = Some(id.clone());
        Ok(id)
    }

    async fn update(
        &self,
        tx: &DatabaseTransaction,
        entity: &Observation,
        id: &Id,
    ) -> StoreResult<ChangeDescription> {
        let f = self.factories;
        let old = f
            .get_observation(tx, id)
            .await?
            .ok_or_else(|| StoreError::no_such_entity(format!("Observation {id} not found")))?;

        let mut change = ChangeDescription::default();
        let mut staged: Vec<(Observations, SimpleExpr)> = Vec::new();

        let mut has_datastream = old.datastream.as_some().is_some();
        if entity.datastream.is_set() {
            match entity.datastream.as_some() {
                None => {
                    staged.push((Observations::DatastreamId, f.none_id_value().into()));
                    has_datastream = false;
                }
                Some(stream) => {
                    if !f
                        .entity_exists(tx, EntityType::Datastream, stream.id.as_ref())
                        .await?
                    {
                        return Err(StoreError::incomplete("Datastream not found"));
                    }
                    if let Some(stream_id) = &stream.id {
                        staged.push((Observations::DatastreamId, f.id_value(stream_id).into()));
                    }
                    has_datastream = true;
                }
            }
            change.add_navigation(NavigationProperty::Datastream);
        }

        let mut has_multi = old.multi_datastream.as_some().is_some();
        if entity.multi_datastream.is_set() {
            match entity.multi_datastream.as_some() {
                None => {
                    staged.push((Observations::MultiDatastreamId, f.none_id_value().into()));
                    has_multi = false;
                }
                Some(stream) => {
                    if !f
                        .entity_exists(tx, EntityType::MultiDatastream, stream.id.as_ref())
                        .await?
                    {
                        return Err(StoreError::incomplete("MultiDatastream not found"));
                    }
                    if let Some(stream_id) = &stream.id {
                        staged
                            .push((Observations::MultiDatastreamId, f.id_value(stream_id).into()));
                    }
                    has_multi = true;
                }
            }
            change.add_navigation(NavigationProperty::MultiDatastream);
        }

        // Exactly one stream link, judged after all staged changes.
        if has_datastream == has_multi {
            return Err(StoreError::invalid_argument(
                "an Observation must have either a Datastream or a MultiDatastream",
            ));
        }

        if entity.feature_of_interest.is_set() {
            let feature = entity.feature_of_interest.as_some();
            let feature_id = feature.and_then(|feature| feature.id.clone());
            if !f
                .entity_exists(tx, EntityType::FeatureOfInterest, feature_id.as_ref())
                .await?
            {
                return Err(StoreError::incomplete("FeatureOfInterest not found"));
            }
            if let Some(feature_id) = feature_id {
                staged.push((Observations::FeatureId, f.id_value(&feature_id).into()));
            }
            change.add_navigation(NavigationProperty::FeatureOfInterest);
        }

        if entity.parameters.is_set() {
            staged.push((
                Observations::Parameters,
                json_or_empty(entity.parameters.as_some()).into(),
            ));
            change.add_property(EntityProperty::Parameters);
        }

        if entity.phenomenon_time.is_set() {
            let phenomenon_time = entity
                .phenomenon_time
                .as_some()
                .ok_or_else(|| StoreError::incomplete("phenomenonTime must not be null"))?;
            let (start, end) = phenomenon_time.to_bounds();
            staged.push((Observations::PhenomenonTimeStart, start.into()));
            staged.push((Observations::PhenomenonTimeEnd, end.into()));
            change.add_property(EntityProperty::PhenomenonTime);
        }

        if entity.result.is_set() {
            let result = entity
                .result
                .as_some()
                .ok_or_else(|| StoreError::incomplete("result must not be null"))?;
            let multi_stream = if has_multi {
                entity
                    .multi_datastream
                    .as_some()
                    .and_then(|stream| stream.id.clone())
                    .or_else(|| {
                        old.multi_datastream
                            .as_some()
                            .and_then(|stream| stream.id.clone())
                    })
            } else {
                None
            };
            staged.extend(
                self.result_assignments(tx, result, multi_stream.as_ref())
                    .await?,
            );
            change.add_property(EntityProperty::Result);
        }

        if entity.result_quality.is_set() {
            staged.push((
                Observations::ResultQuality,
                entity
                    .result_quality
                    .as_some()
                    .map(|quality| quality.to_string())
                    .into(),
            ));
            change.add_property(EntityProperty::ResultQuality);
        }

        if entity.result_time.is_set() {
            staged.push((
                Observations::ResultTime,
                entity.result_time.as_some().map(|at| at.as_micros()).into(),
            ));
            change.add_property(EntityProperty::ResultTime);
        }

        if entity.valid_time.is_set() {
            let bounds = entity.valid_time.as_some().map(TimeValue::to_bounds);
            staged.push((
                Observations::ValidTimeStart,
                bounds.map(|(start, _)| start).into(),
            ));
            staged.push((
                Observations::ValidTimeEnd,
                bounds.map(|(_, end)| end).into(),
            ));
            change.add_property(EntityProperty::ValidTime);
        }

        if !staged.is_empty() {
            let stmt = Query::update()
                .table(Observations::Table)
                .values(staged)
                .and_where(Expr::col(Observations::Id).eq(f.id_value(id)))
                .to_owned();
            let count = exec(tx, &stmt).await?.rows_affected();
            if count != 1 {
                log::error!("updating Observation {id} touched {count} rows");
                return Err(StoreError::illegal_state(
                    "update changed an unexpected number of rows",
                ));
            }
        }
        log::debug!("updated Observation {id}");
        Ok(change)
    }

    async fn delete(&self, tx: &DatabaseTransaction, id: &Id) -> StoreResult<()> {
        let stmt = Query::delete()
            .from_table(Observations::Table)
            .and_where(Expr::col(Observations::Id).eq(self.factories.id_value(id)))
            .to_owned();
        let count = exec(tx, &stmt).await?.rows_affected();
        if count == 0 {
            return Err(StoreError::no_such_entity(format!(
                "Observation {id} not found"
            )));
        }
        Ok(())
    }
}
