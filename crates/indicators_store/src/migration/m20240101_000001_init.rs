use sea_orm_migration::prelude::*;

use crate::db::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Units::Table)
                    .if_not_exists()
                    .col(pk_col(Units::Id))
                    .col(ColumnDef::new(Units::UnitName).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Indicators::Table)
                    .if_not_exists()
                    .col(pk_col(Indicators::Id))
                    .col(ColumnDef::new(Indicators::Name).string().not_null())
                    .col(ColumnDef::new(Indicators::UnitId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_indicators_unit")
                            .from(Indicators::Table, Indicators::UnitId)
                            .to(Units::Table, Units::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AggregatedIndicatorValues::Table)
                    .if_not_exists()
                    .col(pk_col(AggregatedIndicatorValues::Id))
                    .col(
                        ColumnDef::new(AggregatedIndicatorValues::IndicatorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AggregatedIndicatorValues::TerritoryId).big_integer())
                    .col(ColumnDef::new(AggregatedIndicatorValues::Oktmo).big_integer())
                    .col(
                        ColumnDef::new(AggregatedIndicatorValues::Year)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AggregatedIndicatorValues::Value)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AggregatedIndicatorValues::Source)
                            .text()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_aggregated_values_indicator")
                            .from(
                                AggregatedIndicatorValues::Table,
                                AggregatedIndicatorValues::IndicatorId,
                            )
                            .to(Indicators::Table, Indicators::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DetailedIndicatorValues::Table)
                    .if_not_exists()
                    .col(pk_col(DetailedIndicatorValues::Id))
                    .col(
                        ColumnDef::new(DetailedIndicatorValues::IndicatorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DetailedIndicatorValues::TerritoryId).big_integer())
                    .col(ColumnDef::new(DetailedIndicatorValues::Oktmo).big_integer())
                    .col(
                        ColumnDef::new(DetailedIndicatorValues::Year)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DetailedIndicatorValues::Source)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DetailedIndicatorValues::AgeStart).integer())
                    .col(ColumnDef::new(DetailedIndicatorValues::AgeEnd).integer())
                    .col(ColumnDef::new(DetailedIndicatorValues::Male).double())
                    .col(ColumnDef::new(DetailedIndicatorValues::Female).double())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_detailed_values_indicator")
                            .from(
                                DetailedIndicatorValues::Table,
                                DetailedIndicatorValues::IndicatorId,
                            )
                            .to(Indicators::Table, Indicators::Id),
                    )
                    .to_owned(),
            )
            .await?;

        create_indexes(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(DetailedIndicatorValues::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(AggregatedIndicatorValues::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Indicators::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Units::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

async fn create_indexes(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_index(
            Index::create()
                .name("units_unit_name_uidx")
                .table(Units::Table)
                .col(Units::UnitName)
                .unique()
                .if_not_exists()
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("indicators_name_unit_uidx")
                .table(Indicators::Table)
                .col(Indicators::Name)
                .col(Indicators::UnitId)
                .unique()
                .if_not_exists()
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("aggregated_values_indicator_year_idx")
                .table(AggregatedIndicatorValues::Table)
                .col(AggregatedIndicatorValues::IndicatorId)
                .col(AggregatedIndicatorValues::Year)
                .if_not_exists()
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name("detailed_values_indicator_year_idx")
                .table(DetailedIndicatorValues::Table)
                .col(DetailedIndicatorValues::IndicatorId)
                .col(DetailedIndicatorValues::Year)
                .if_not_exists()
                .to_owned(),
        )
        .await?;
    Ok(())
}

fn pk_col(col: impl Iden) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}
