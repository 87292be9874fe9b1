use sea_orm::sea_query;
use sea_orm_migration::prelude::Iden;

#[derive(Iden, Clone, Copy)]
pub enum Units {
    Table,
    Id,
    UnitName,
}

#[derive(Iden, Clone, Copy)]
pub enum Indicators {
    Table,
    Id,
    Name,
    UnitId,
}

#[derive(Iden, Clone, Copy)]
pub enum AggregatedIndicatorValues {
    Table,
    Id,
    IndicatorId,
    TerritoryId,
    Oktmo,
    Year,
    Value,
    Source,
}

#[derive(Iden, Clone, Copy)]
pub enum DetailedIndicatorValues {
    Table,
    Id,
    IndicatorId,
    TerritoryId,
    Oktmo,
    Year,
    Source,
    AgeStart,
    AgeEnd,
    Male,
    Female,
}
