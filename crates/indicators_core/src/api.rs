use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    AggregatedItem, AggregatedValue, DetailedDatum, DetailedGroup, Indicator,
    IndicatorAvailability, IndicatorDetails, IndicatorsResult, ScopeRequest, Unit,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
        }
    }
}

#[async_trait]
pub trait UnitRegistryApi {
    /// Returns the unit with this exact name, creating it on first use.
    async fn resolve_or_create_unit(&self, unit_name: &str) -> IndicatorsResult<Unit>;
    async fn get_unit(&self, unit_id: i64) -> IndicatorsResult<Option<Unit>>;
    async fn list_units(&self, page: Page) -> IndicatorsResult<Vec<Unit>>;
}

#[async_trait]
pub trait IndicatorRegistryApi {
    /// Find-or-insert on `(name, unit_id)`. The unit is not checked here.
    async fn resolve_or_create_indicator(
        &self,
        name: &str,
        unit_id: i64,
    ) -> IndicatorsResult<Indicator>;

    /// Write-path entry: fails with `UnitNotFound` before touching the
    /// indicator table when the unit does not exist.
    async fn create_indicator(&self, name: &str, unit_id: i64) -> IndicatorsResult<Indicator>;

    async fn get_indicator(&self, indicator_id: i64) -> IndicatorsResult<Option<Indicator>>;
    async fn list_indicators(&self, page: Page) -> IndicatorsResult<Vec<Indicator>>;
    async fn indicator_availability(
        &self,
        indicator_id: i64,
    ) -> IndicatorsResult<IndicatorAvailability>;
    async fn describe_indicator(&self, indicator_id: i64) -> IndicatorsResult<IndicatorDetails>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpsertAggregatedInput {
    pub indicator_id: i64,
    #[serde(flatten)]
    pub scope: ScopeRequest,
    pub items: Vec<AggregatedItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuesQuery {
    pub indicator_id: i64,
    #[serde(flatten)]
    pub scope: ScopeRequest,
    #[serde(default)]
    pub year: Option<i32>,
}

#[async_trait]
pub trait AggregatedValuesApi {
    /// Applies the batch atomically and returns every row of the scope.
    async fn upsert_aggregated_values(
        &self,
        input: UpsertAggregatedInput,
    ) -> IndicatorsResult<Vec<AggregatedValue>>;

    async fn query_aggregated_values(
        &self,
        query: ValuesQuery,
    ) -> IndicatorsResult<Vec<AggregatedValue>>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpsertDetailedInput {
    pub indicator_id: i64,
    #[serde(flatten)]
    pub scope: ScopeRequest,
    pub year: i32,
    pub source: String,
    pub data: Vec<DetailedDatum>,
}

#[async_trait]
pub trait DetailedValuesApi {
    /// Applies the batch atomically and returns the grouped view of the
    /// written year.
    async fn upsert_detailed_values(
        &self,
        input: UpsertDetailedInput,
    ) -> IndicatorsResult<Vec<DetailedGroup>>;

    /// `None` when no row matches; `Some` is never empty.
    async fn query_detailed_values(
        &self,
        query: ValuesQuery,
    ) -> IndicatorsResult<Option<Vec<DetailedGroup>>>;
}
