use aisthesis_model::IdKind;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

use crate::db::*;

#[derive(DeriveMigrationName)]
pub struct Migration {
    pub kind: IdKind,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let kind = self.kind;

        manager
            .create_table(
                Table::create()
                    .table(Things::Table)
                    .if_not_exists()
                    .col(pk_col(kind, backend, Things::Id))
                    .col(ColumnDef::new(Things::Name).string().not_null())
                    .col(ColumnDef::new(Things::Description).text().not_null())
                    .col(ColumnDef::new(Things::Properties).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sensors::Table)
                    .if_not_exists()
                    .col(pk_col(kind, backend, Sensors::Id))
                    .col(ColumnDef::new(Sensors::Name).string().not_null())
                    .col(ColumnDef::new(Sensors::Description).text().not_null())
                    .col(ColumnDef::new(Sensors::EncodingType).string().not_null())
                    .col(ColumnDef::new(Sensors::Metadata).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ObsProperties::Table)
                    .if_not_exists()
                    .col(pk_col(kind, backend, ObsProperties::Id))
                    .col(ColumnDef::new(ObsProperties::Name).string().not_null())
                    .col(ColumnDef::new(ObsProperties::Definition).string().not_null())
                    .col(
                        ColumnDef::new(ObsProperties::Description)
                            .text()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Features::Table)
                    .if_not_exists()
                    .col(pk_col(kind, backend, Features::Id))
                    .col(ColumnDef::new(Features::Name).string().not_null())
                    .col(ColumnDef::new(Features::Description).text().not_null())
                    .col(ColumnDef::new(Features::EncodingType).string().not_null())
                    .col(ColumnDef::new(Features::Feature).text().not_null())
                    .col(ColumnDef::new(Features::Properties).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Datastreams::Table)
                    .if_not_exists()
                    .col(pk_col(kind, backend, Datastreams::Id))
                    .col(ColumnDef::new(Datastreams::Name).string().not_null())
                    .col(ColumnDef::new(Datastreams::Description).text().not_null())
                    .col(
                        ColumnDef::new(Datastreams::ObservationType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Datastreams::PhenomenonTimeStart)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Datastreams::PhenomenonTimeEnd)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Datastreams::ResultTimeStart)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Datastreams::ResultTimeEnd)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Datastreams::UnitName).string())
                    .col(ColumnDef::new(Datastreams::UnitSymbol).string())
                    .col(ColumnDef::new(Datastreams::UnitDefinition).string())
                    .col(ColumnDef::new(Datastreams::Properties).text())
                    .col(id_col(kind, backend, Datastreams::SensorId, false))
                    .col(id_col(kind, backend, Datastreams::ObsPropertyId, false))
                    .col(id_col(kind, backend, Datastreams::ThingId, false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MultiDatastreams::Table)
                    .if_not_exists()
                    .col(pk_col(kind, backend, MultiDatastreams::Id))
                    .col(ColumnDef::new(MultiDatastreams::Name).string().not_null())
                    .col(
                        ColumnDef::new(MultiDatastreams::Description)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MultiDatastreams::ObservationTypes)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MultiDatastreams::PhenomenonTimeStart)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MultiDatastreams::PhenomenonTimeEnd)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MultiDatastreams::ResultTimeStart)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MultiDatastreams::ResultTimeEnd)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MultiDatastreams::UnitOfMeasurements)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MultiDatastreams::Properties).text())
                    .col(id_col(kind, backend, MultiDatastreams::SensorId, false))
                    .col(id_col(kind, backend, MultiDatastreams::ThingId, false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MultiDatastreamsObsProperties::Table)
                    .if_not_exists()
                    .col(id_col(
                        kind,
                        backend,
                        MultiDatastreamsObsProperties::MultiDatastreamId,
                        false,
                    ))
                    .col(id_col(
                        kind,
                        backend,
                        MultiDatastreamsObsProperties::ObsPropertyId,
                        false,
                    ))
                    .col(
                        ColumnDef::new(MultiDatastreamsObsProperties::Rank)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_multi_datastreams_obs_properties")
                            .col(MultiDatastreamsObsProperties::MultiDatastreamId)
                            .col(MultiDatastreamsObsProperties::ObsPropertyId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Observations::Table)
                    .if_not_exists()
                    .col(pk_col(kind, backend, Observations::Id))
                    .col(
                        ColumnDef::new(Observations::PhenomenonTimeStart)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Observations::PhenomenonTimeEnd)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Observations::ResultTime).big_integer())
                    .col(ColumnDef::new(Observations::ResultType).small_integer())
                    .col(ColumnDef::new(Observations::ResultNumber).double())
                    .col(ColumnDef::new(Observations::ResultString).text())
                    .col(ColumnDef::new(Observations::ResultBoolean).boolean())
                    .col(ColumnDef::new(Observations::ResultJson).text())
                    .col(ColumnDef::new(Observations::ResultQuality).text())
                    .col(ColumnDef::new(Observations::ValidTimeStart).big_integer())
                    .col(ColumnDef::new(Observations::ValidTimeEnd).big_integer())
                    .col(ColumnDef::new(Observations::Parameters).text())
                    .col(id_col(kind, backend, Observations::DatastreamId, true))
                    .col(id_col(kind, backend, Observations::MultiDatastreamId, true))
                    .col(id_col(kind, backend, Observations::FeatureId, false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_observations_datastream")
                    .if_not_exists()
                    .table(Observations::Table)
                    .col(Observations::DatastreamId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_observations_multi_datastream")
                    .if_not_exists()
                    .table(Observations::Table)
                    .col(Observations::MultiDatastreamId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Observations::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(MultiDatastreamsObsProperties::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(MultiDatastreams::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Datastreams::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Features::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(ObsProperties::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Sensors::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Things::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn id_col(kind: IdKind, backend: DatabaseBackend, col: impl Iden + 'static, nullable: bool) -> ColumnDef {
    let mut col_def = ColumnDef::new(col);
    match kind {
        IdKind::Long => {
            col_def.big_integer();
        }
        IdKind::Uuid => match backend {
            DatabaseBackend::Postgres => {
                col_def.uuid();
            }
            _ => {
                col_def.string_len(36);
            }
        },
        IdKind::Text => {
            col_def.string();
        }
    }
    if nullable {
        col_def.null();
    } else {
        col_def.not_null();
    }
    col_def.to_owned()
}

fn pk_col(kind: IdKind, backend: DatabaseBackend, col: impl Iden + 'static) -> ColumnDef {
    let mut col_def = id_col(kind, backend, col, false);
    if kind == IdKind::Long {
        col_def.auto_increment();
    }
    col_def.primary_key();
    col_def.to_owned()
}
