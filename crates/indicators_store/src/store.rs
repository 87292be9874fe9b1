use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use sea_orm::sea_query::{
    Alias, Condition, ConditionalStatement, Expr, ExprTrait, OnConflict, Order,
    PostgresQueryBuilder, Query, QueryStatementWriter, SelectStatement, SqliteQueryBuilder,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult,
    Statement, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use crate::db::*;
use crate::migration::Migrator;
use crate::{DetailedSourcePolicy, IndicatorsConfig};
use indicators_core::{
    AggregatedValue, AggregatedValuesApi, AvailabilityEntry, DetailedDatum, DetailedGroup,
    DetailedRow, DetailedValuesApi, Indicator, IndicatorAvailability, IndicatorDetails,
    IndicatorRegistryApi, IndicatorsError, IndicatorsResult, Page, ScopeKey, Unit,
    UnitRegistryApi, UpsertAggregatedInput, UpsertDetailedInput, ValuesQuery,
    group_detailed_rows,
};

const INDICATOR_NAME_ALIAS: &str = "indicator_name";

#[derive(Clone)]
pub struct IndicatorStore {
    conn: DatabaseConnection,
    backend: DatabaseBackend,
    limits: StoreLimits,
    source_policy: DetailedSourcePolicy,
}

#[derive(Clone, Copy, Debug)]
struct StoreLimits {
    max_batch_items: usize,
    max_page_size: u64,
}

impl StoreLimits {
    fn from_config(config: &IndicatorsConfig) -> Self {
        let limits = config.limits();
        Self {
            max_batch_items: limits.max_batch_items(),
            max_page_size: limits.max_page_size(),
        }
    }
}

impl IndicatorStore {
    pub async fn connect(config: &IndicatorsConfig, base_dir: &Path) -> IndicatorsResult<Self> {
        let url = config.connection_url(base_dir)?;
        let mut options = ConnectOptions::new(url);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        options.sqlx_logging(false);
        let conn = Database::connect(options)
            .await
            .map_err(IndicatorsError::from)?;
        let backend = conn.get_database_backend();
        let store = Self {
            conn,
            backend,
            limits: StoreLimits::from_config(config),
            source_policy: config.source_policy(),
        };
        Migrator::up(&store.conn, None)
            .await
            .map_err(IndicatorsError::from)?;
        info!(
            "indicator store ready backend={} source_policy={:?}",
            config.backend_name(),
            store.source_policy
        );
        Ok(store)
    }

    pub async fn connect_sqlite(path: &Path) -> IndicatorsResult<Self> {
        let config = IndicatorsConfig::default_sqlite(path.to_string_lossy());
        Self::connect(&config, Path::new(".")).await
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn source_policy(&self) -> DetailedSourcePolicy {
        self.source_policy
    }

    fn check_batch(&self, len: usize) -> IndicatorsResult<()> {
        if len > self.limits.max_batch_items {
            return Err(IndicatorsError::validation(format!(
                "batch of {len} items exceeds limit {}",
                self.limits.max_batch_items
            )));
        }
        Ok(())
    }

    fn page_limit(&self, page: Page) -> u64 {
        Ord::min(page.limit, self.limits.max_page_size)
    }

    async fn find_unit_by_name<C: ConnectionTrait>(
        &self,
        conn: &C,
        unit_name: &str,
    ) -> IndicatorsResult<Option<Unit>> {
        let select = Query::select()
            .from(Units::Table)
            .columns([Units::Id, Units::UnitName])
            .and_where(Expr::col(Units::UnitName).eq(unit_name))
            .limit(1)
            .to_owned();
        query_one(conn, &select)
            .await?
            .map(|row| read_unit(&row))
            .transpose()
    }

    async fn find_indicator_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
        unit_id: i64,
    ) -> IndicatorsResult<Option<i64>> {
        let select = Query::select()
            .from(Indicators::Table)
            .column(Indicators::Id)
            .and_where(Expr::col(Indicators::Name).eq(name))
            .and_where(Expr::col(Indicators::UnitId).eq(unit_id))
            .limit(1)
            .to_owned();
        query_one(conn, &select)
            .await?
            .map(|row| read_i64(&row, &col_name(Indicators::Id)))
            .transpose()
    }

    async fn fetch_indicator<C: ConnectionTrait>(
        &self,
        conn: &C,
        indicator_id: i64,
    ) -> IndicatorsResult<Option<Indicator>> {
        let select = indicator_select()
            .and_where(Expr::col((Indicators::Table, Indicators::Id)).eq(indicator_id))
            .limit(1)
            .to_owned();
        query_one(conn, &select)
            .await?
            .map(|row| read_indicator(&row))
            .transpose()
    }

    async fn ensure_indicator<C: ConnectionTrait>(
        &self,
        conn: &C,
        indicator_id: i64,
    ) -> IndicatorsResult<()> {
        let select = Query::select()
            .from(Indicators::Table)
            .column(Indicators::Id)
            .and_where(Expr::col(Indicators::Id).eq(indicator_id))
            .limit(1)
            .to_owned();
        if query_one(conn, &select).await?.is_none() {
            return Err(IndicatorsError::IndicatorNotFound { indicator_id });
        }
        Ok(())
    }

    async fn aggregated_availability<C: ConnectionTrait>(
        &self,
        conn: &C,
        indicator_id: i64,
    ) -> IndicatorsResult<Vec<AvailabilityEntry>> {
        let select = Query::select()
            .from(AggregatedIndicatorValues::Table)
            .columns([
                AggregatedIndicatorValues::Year,
                AggregatedIndicatorValues::TerritoryId,
                AggregatedIndicatorValues::Oktmo,
                AggregatedIndicatorValues::Source,
            ])
            .and_where(Expr::col(AggregatedIndicatorValues::IndicatorId).eq(indicator_id))
            .order_by(AggregatedIndicatorValues::Id, Order::Asc)
            .to_owned();
        let rows = query_all(conn, &select).await?;
        rows.iter().map(read_availability).collect()
    }

    async fn detailed_availability<C: ConnectionTrait>(
        &self,
        conn: &C,
        indicator_id: i64,
    ) -> IndicatorsResult<Vec<AvailabilityEntry>> {
        let select = Query::select()
            .from(DetailedIndicatorValues::Table)
            .columns([
                DetailedIndicatorValues::Year,
                DetailedIndicatorValues::TerritoryId,
                DetailedIndicatorValues::Oktmo,
                DetailedIndicatorValues::Source,
            ])
            .and_where(Expr::col(DetailedIndicatorValues::IndicatorId).eq(indicator_id))
            .order_by(DetailedIndicatorValues::Id, Order::Asc)
            .to_owned();
        let rows = query_all(conn, &select).await?;
        rows.iter().map(read_availability).collect()
    }

    async fn select_aggregated<C: ConnectionTrait>(
        &self,
        conn: &C,
        indicator_id: i64,
        key: ScopeKey,
        year: Option<i32>,
    ) -> IndicatorsResult<Vec<AggregatedValue>> {
        let mut condition = aggregated_scope_condition(indicator_id, key);
        if let Some(year) = year {
            condition = condition.add(Expr::col(AggregatedIndicatorValues::Year).eq(year));
        }
        let select = Query::select()
            .from(AggregatedIndicatorValues::Table)
            .inner_join(
                Indicators::Table,
                Expr::col((Indicators::Table, Indicators::Id)).equals((
                    AggregatedIndicatorValues::Table,
                    AggregatedIndicatorValues::IndicatorId,
                )),
            )
            .inner_join(
                Units::Table,
                Expr::col((Units::Table, Units::Id))
                    .equals((Indicators::Table, Indicators::UnitId)),
            )
            .columns([
                (AggregatedIndicatorValues::Table, AggregatedIndicatorValues::Id),
                (
                    AggregatedIndicatorValues::Table,
                    AggregatedIndicatorValues::IndicatorId,
                ),
                (
                    AggregatedIndicatorValues::Table,
                    AggregatedIndicatorValues::TerritoryId,
                ),
                (AggregatedIndicatorValues::Table, AggregatedIndicatorValues::Oktmo),
                (AggregatedIndicatorValues::Table, AggregatedIndicatorValues::Year),
                (AggregatedIndicatorValues::Table, AggregatedIndicatorValues::Value),
                (AggregatedIndicatorValues::Table, AggregatedIndicatorValues::Source),
            ])
            .expr_as(
                Expr::col((Indicators::Table, Indicators::Name)),
                Alias::new(INDICATOR_NAME_ALIAS),
            )
            .column((Units::Table, Units::UnitName))
            .cond_where(condition)
            .order_by(
                (AggregatedIndicatorValues::Table, AggregatedIndicatorValues::Year),
                Order::Asc,
            )
            .order_by(
                (AggregatedIndicatorValues::Table, AggregatedIndicatorValues::Id),
                Order::Asc,
            )
            .to_owned();
        let rows = query_all(conn, &select).await?;
        rows.iter().map(read_aggregated_value).collect()
    }

    async fn select_detailed_rows<C: ConnectionTrait>(
        &self,
        conn: &C,
        indicator_id: i64,
        key: ScopeKey,
        year: Option<i32>,
    ) -> IndicatorsResult<Vec<DetailedRow>> {
        let mut condition = detailed_scope_condition(indicator_id, key);
        if let Some(year) = year {
            condition = condition.add(Expr::col(DetailedIndicatorValues::Year).eq(year));
        }
        let select = Query::select()
            .from(DetailedIndicatorValues::Table)
            .inner_join(
                Indicators::Table,
                Expr::col((Indicators::Table, Indicators::Id)).equals((
                    DetailedIndicatorValues::Table,
                    DetailedIndicatorValues::IndicatorId,
                )),
            )
            .inner_join(
                Units::Table,
                Expr::col((Units::Table, Units::Id))
                    .equals((Indicators::Table, Indicators::UnitId)),
            )
            .columns([
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::Id),
                (
                    DetailedIndicatorValues::Table,
                    DetailedIndicatorValues::IndicatorId,
                ),
                (
                    DetailedIndicatorValues::Table,
                    DetailedIndicatorValues::TerritoryId,
                ),
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::Oktmo),
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::Year),
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::Source),
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::AgeStart),
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::AgeEnd),
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::Male),
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::Female),
            ])
            .column((Units::Table, Units::UnitName))
            .cond_where(condition)
            .order_by(
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::AgeStart),
                Order::Asc,
            )
            .order_by(
                (DetailedIndicatorValues::Table, DetailedIndicatorValues::Id),
                Order::Asc,
            )
            .to_owned();
        let rows = query_all(conn, &select).await?;
        rows.iter().map(read_detailed_row).collect()
    }

    async fn upsert_detailed_datum<C: ConnectionTrait>(
        &self,
        conn: &C,
        input: &UpsertDetailedInput,
        key: ScopeKey,
        territory_id: Option<i64>,
        oktmo: Option<i64>,
        datum: &DetailedDatum,
    ) -> IndicatorsResult<bool> {
        let condition = detailed_key_condition(input.indicator_id, key, input.year, datum);
        let select = Query::select()
            .from(DetailedIndicatorValues::Table)
            .column(DetailedIndicatorValues::Id)
            .cond_where(condition.clone())
            .limit(1)
            .to_owned();
        if query_one(conn, &select).await?.is_some() {
            let mut update = Query::update();
            update
                .table(DetailedIndicatorValues::Table)
                .value(DetailedIndicatorValues::Male, datum.male)
                .value(DetailedIndicatorValues::Female, datum.female);
            if self.source_policy == DetailedSourcePolicy::Overwrite {
                update.value(DetailedIndicatorValues::Source, input.source.as_str());
            }
            update.cond_where(condition);
            exec(conn, &update).await?;
            return Ok(false);
        }
        let insert = Query::insert()
            .into_table(DetailedIndicatorValues::Table)
            .columns([
                DetailedIndicatorValues::IndicatorId,
                DetailedIndicatorValues::TerritoryId,
                DetailedIndicatorValues::Oktmo,
                DetailedIndicatorValues::Year,
                DetailedIndicatorValues::Source,
                DetailedIndicatorValues::AgeStart,
                DetailedIndicatorValues::AgeEnd,
                DetailedIndicatorValues::Male,
                DetailedIndicatorValues::Female,
            ])
            .values_panic([
                input.indicator_id.into(),
                territory_id.into(),
                oktmo.into(),
                input.year.into(),
                input.source.as_str().into(),
                datum.age_start.into(),
                datum.age_end.into(),
                datum.male.into(),
                datum.female.into(),
            ])
            .to_owned();
        exec(conn, &insert).await?;
        Ok(true)
    }
}

#[async_trait]
impl UnitRegistryApi for IndicatorStore {
    async fn resolve_or_create_unit(&self, unit_name: &str) -> IndicatorsResult<Unit> {
        require_name("unit_name", unit_name)?;
        if let Some(unit) = self.find_unit_by_name(&self.conn, unit_name).await? {
            return Ok(unit);
        }
        let insert = Query::insert()
            .into_table(Units::Table)
            .columns([Units::UnitName])
            .values_panic([unit_name.into()])
            .on_conflict(OnConflict::column(Units::UnitName).do_nothing().to_owned())
            .to_owned();
        exec(&self.conn, &insert).await?;
        let unit = self
            .find_unit_by_name(&self.conn, unit_name)
            .await?
            .ok_or_else(|| IndicatorsError::storage("unit missing after insert"))?;
        info!("unit registered id={} name={}", unit.id, unit.unit_name);
        Ok(unit)
    }

    async fn get_unit(&self, unit_id: i64) -> IndicatorsResult<Option<Unit>> {
        let select = Query::select()
            .from(Units::Table)
            .columns([Units::Id, Units::UnitName])
            .and_where(Expr::col(Units::Id).eq(unit_id))
            .limit(1)
            .to_owned();
        query_one(&self.conn, &select)
            .await?
            .map(|row| read_unit(&row))
            .transpose()
    }

    async fn list_units(&self, page: Page) -> IndicatorsResult<Vec<Unit>> {
        let select = Query::select()
            .from(Units::Table)
            .columns([Units::Id, Units::UnitName])
            .order_by(Units::Id, Order::Asc)
            .limit(self.page_limit(page))
            .offset(page.offset)
            .to_owned();
        let rows = query_all(&self.conn, &select).await?;
        rows.iter().map(read_unit).collect()
    }
}

#[async_trait]
impl IndicatorRegistryApi for IndicatorStore {
    async fn resolve_or_create_indicator(
        &self,
        name: &str,
        unit_id: i64,
    ) -> IndicatorsResult<Indicator> {
        require_name("name", name)?;
        let existing = self.find_indicator_id(&self.conn, name, unit_id).await?;
        let indicator_id = match existing {
            Some(indicator_id) => indicator_id,
            None => {
                let insert = Query::insert()
                    .into_table(Indicators::Table)
                    .columns([Indicators::Name, Indicators::UnitId])
                    .values_panic([name.into(), unit_id.into()])
                    .on_conflict(
                        OnConflict::columns([Indicators::Name, Indicators::UnitId])
                            .do_nothing()
                            .to_owned(),
                    )
                    .to_owned();
                exec(&self.conn, &insert).await?;
                let indicator_id = self
                    .find_indicator_id(&self.conn, name, unit_id)
                    .await?
                    .ok_or_else(|| IndicatorsError::storage("indicator missing after insert"))?;
                info!("indicator registered id={indicator_id} name={name} unit_id={unit_id}");
                indicator_id
            }
        };
        self.fetch_indicator(&self.conn, indicator_id)
            .await?
            .ok_or(IndicatorsError::IndicatorNotFound { indicator_id })
    }

    async fn create_indicator(&self, name: &str, unit_id: i64) -> IndicatorsResult<Indicator> {
        if self.get_unit(unit_id).await?.is_none() {
            return Err(IndicatorsError::UnitNotFound { unit_id });
        }
        self.resolve_or_create_indicator(name, unit_id).await
    }

    async fn get_indicator(&self, indicator_id: i64) -> IndicatorsResult<Option<Indicator>> {
        self.fetch_indicator(&self.conn, indicator_id).await
    }

    async fn list_indicators(&self, page: Page) -> IndicatorsResult<Vec<Indicator>> {
        let select = indicator_select()
            .order_by((Indicators::Table, Indicators::Id), Order::Asc)
            .limit(self.page_limit(page))
            .offset(page.offset)
            .to_owned();
        let rows = query_all(&self.conn, &select).await?;
        rows.iter().map(read_indicator).collect()
    }

    async fn indicator_availability(
        &self,
        indicator_id: i64,
    ) -> IndicatorsResult<IndicatorAvailability> {
        Ok(IndicatorAvailability {
            aggregated: self.aggregated_availability(&self.conn, indicator_id).await?,
            detailed: self.detailed_availability(&self.conn, indicator_id).await?,
        })
    }

    async fn describe_indicator(&self, indicator_id: i64) -> IndicatorsResult<IndicatorDetails> {
        let indicator = self
            .fetch_indicator(&self.conn, indicator_id)
            .await?
            .ok_or(IndicatorsError::IndicatorNotFound { indicator_id })?;
        let availability = self.indicator_availability(indicator_id).await?;
        Ok(IndicatorDetails {
            id: indicator.id,
            name: indicator.name,
            unit: indicator.unit_name,
            aggregated_availability: availability.aggregated,
            detailed_availability: availability.detailed,
        })
    }
}

#[async_trait]
impl AggregatedValuesApi for IndicatorStore {
    async fn upsert_aggregated_values(
        &self,
        input: UpsertAggregatedInput,
    ) -> IndicatorsResult<Vec<AggregatedValue>> {
        let scope = input.scope.resolve()?;
        self.check_batch(input.items.len())?;
        for item in &input.items {
            item.validate()?;
        }
        info!(
            "aggregated upsert indicator={} {} items={}",
            input.indicator_id,
            scope.key,
            input.items.len()
        );
        let tx = self.conn.begin().await?;
        self.ensure_indicator(&tx, input.indicator_id).await?;
        let (mut inserted, mut updated) = (0usize, 0usize);
        for item in &input.items {
            let condition = aggregated_scope_condition(input.indicator_id, scope.key)
                .add(Expr::col(AggregatedIndicatorValues::Year).eq(item.year));
            let select = Query::select()
                .from(AggregatedIndicatorValues::Table)
                .column(AggregatedIndicatorValues::Id)
                .cond_where(condition.clone())
                .limit(1)
                .to_owned();
            if query_one(&tx, &select).await?.is_some() {
                let update = Query::update()
                    .table(AggregatedIndicatorValues::Table)
                    .value(AggregatedIndicatorValues::Value, item.value)
                    .value(AggregatedIndicatorValues::Source, item.source.as_str())
                    .cond_where(condition)
                    .to_owned();
                exec(&tx, &update).await?;
                updated += 1;
            } else {
                let insert = Query::insert()
                    .into_table(AggregatedIndicatorValues::Table)
                    .columns([
                        AggregatedIndicatorValues::IndicatorId,
                        AggregatedIndicatorValues::TerritoryId,
                        AggregatedIndicatorValues::Oktmo,
                        AggregatedIndicatorValues::Year,
                        AggregatedIndicatorValues::Value,
                        AggregatedIndicatorValues::Source,
                    ])
                    .values_panic([
                        input.indicator_id.into(),
                        scope.territory_id.into(),
                        scope.oktmo.into(),
                        item.year.into(),
                        item.value.into(),
                        item.source.as_str().into(),
                    ])
                    .to_owned();
                exec(&tx, &insert).await?;
                inserted += 1;
            }
        }
        tx.commit().await?;
        debug!(
            "aggregated upsert committed indicator={} inserted={inserted} updated={updated}",
            input.indicator_id
        );
        self.select_aggregated(&self.conn, input.indicator_id, scope.key, None)
            .await
    }

    async fn query_aggregated_values(
        &self,
        query: ValuesQuery,
    ) -> IndicatorsResult<Vec<AggregatedValue>> {
        let scope = query.scope.resolve()?;
        debug!(
            "aggregated query indicator={} {} year={:?}",
            query.indicator_id, scope.key, query.year
        );
        self.select_aggregated(&self.conn, query.indicator_id, scope.key, query.year)
            .await
    }
}

#[async_trait]
impl DetailedValuesApi for IndicatorStore {
    async fn upsert_detailed_values(
        &self,
        input: UpsertDetailedInput,
    ) -> IndicatorsResult<Vec<DetailedGroup>> {
        let scope = input.scope.resolve()?;
        self.check_batch(input.data.len())?;
        for datum in &input.data {
            datum.validate()?;
        }
        info!(
            "detailed upsert indicator={} {} year={} source={} bands={}",
            input.indicator_id,
            scope.key,
            input.year,
            input.source,
            input.data.len()
        );
        let tx = self.conn.begin().await?;
        self.ensure_indicator(&tx, input.indicator_id).await?;
        let (mut inserted, mut updated) = (0usize, 0usize);
        for datum in &input.data {
            let was_inserted = self
                .upsert_detailed_datum(
                    &tx,
                    &input,
                    scope.key,
                    scope.territory_id,
                    scope.oktmo,
                    datum,
                )
                .await?;
            if was_inserted {
                inserted += 1;
            } else {
                updated += 1;
            }
        }
        tx.commit().await?;
        debug!(
            "detailed upsert committed indicator={} inserted={inserted} updated={updated}",
            input.indicator_id
        );
        let rows = self
            .select_detailed_rows(&self.conn, input.indicator_id, scope.key, Some(input.year))
            .await?;
        Ok(group_detailed_rows(rows))
    }

    async fn query_detailed_values(
        &self,
        query: ValuesQuery,
    ) -> IndicatorsResult<Option<Vec<DetailedGroup>>> {
        let scope = query.scope.resolve()?;
        let rows = self
            .select_detailed_rows(&self.conn, query.indicator_id, scope.key, query.year)
            .await?;
        if rows.is_empty() {
            debug!(
                "detailed query found no rows indicator={} {} year={:?}",
                query.indicator_id, scope.key, query.year
            );
            return Ok(None);
        }
        Ok(Some(group_detailed_rows(rows)))
    }
}

fn require_name(field: &str, value: &str) -> IndicatorsResult<()> {
    if value.trim().is_empty() {
        return Err(IndicatorsError::validation(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn indicator_select() -> SelectStatement {
    Query::select()
        .from(Indicators::Table)
        .inner_join(
            Units::Table,
            Expr::col((Units::Table, Units::Id)).equals((Indicators::Table, Indicators::UnitId)),
        )
        .columns([
            (Indicators::Table, Indicators::Id),
            (Indicators::Table, Indicators::Name),
            (Indicators::Table, Indicators::UnitId),
        ])
        .column((Units::Table, Units::UnitName))
        .to_owned()
}

fn aggregated_scope_condition(indicator_id: i64, key: ScopeKey) -> Condition {
    let (column, value) = match key {
        ScopeKey::Territory(id) => (AggregatedIndicatorValues::TerritoryId, id),
        ScopeKey::Oktmo(code) => (AggregatedIndicatorValues::Oktmo, code),
    };
    Condition::all()
        .add(Expr::col(AggregatedIndicatorValues::IndicatorId).eq(indicator_id))
        .add(Expr::col(column).eq(value))
}

fn detailed_scope_condition(indicator_id: i64, key: ScopeKey) -> Condition {
    let (column, value) = match key {
        ScopeKey::Territory(id) => (DetailedIndicatorValues::TerritoryId, id),
        ScopeKey::Oktmo(code) => (DetailedIndicatorValues::Oktmo, code),
    };
    Condition::all()
        .add(Expr::col(DetailedIndicatorValues::IndicatorId).eq(indicator_id))
        .add(Expr::col(column).eq(value))
}

fn detailed_key_condition(
    indicator_id: i64,
    key: ScopeKey,
    year: i32,
    datum: &DetailedDatum,
) -> Condition {
    let condition = detailed_scope_condition(indicator_id, key)
        .add(Expr::col(DetailedIndicatorValues::Year).eq(year));
    let condition = match datum.age_start {
        Some(age) => condition.add(Expr::col(DetailedIndicatorValues::AgeStart).eq(age)),
        None => condition.add(Expr::col(DetailedIndicatorValues::AgeStart).is_null()),
    };
    match datum.age_end {
        Some(age) => condition.add(Expr::col(DetailedIndicatorValues::AgeEnd).eq(age)),
        None => condition.add(Expr::col(DetailedIndicatorValues::AgeEnd).is_null()),
    }
}

fn read_unit(row: &QueryResult) -> IndicatorsResult<Unit> {
    Ok(Unit {
        id: read_i64(row, &col_name(Units::Id))?,
        unit_name: row.try_get("", &col_name(Units::UnitName))?,
    })
}

fn read_indicator(row: &QueryResult) -> IndicatorsResult<Indicator> {
    Ok(Indicator {
        id: read_i64(row, &col_name(Indicators::Id))?,
        name: row.try_get("", &col_name(Indicators::Name))?,
        unit_id: read_i64(row, &col_name(Indicators::UnitId))?,
        unit_name: row.try_get("", &col_name(Units::UnitName))?,
    })
}

fn read_availability(row: &QueryResult) -> IndicatorsResult<AvailabilityEntry> {
    // Column names are shared by both value tables.
    Ok(AvailabilityEntry {
        year: row.try_get("", &col_name(AggregatedIndicatorValues::Year))?,
        territory_id: read_opt_i64(row, &col_name(AggregatedIndicatorValues::TerritoryId))?,
        oktmo: read_opt_i64(row, &col_name(AggregatedIndicatorValues::Oktmo))?,
        source: row.try_get("", &col_name(AggregatedIndicatorValues::Source))?,
    })
}

fn read_aggregated_value(row: &QueryResult) -> IndicatorsResult<AggregatedValue> {
    Ok(AggregatedValue {
        id: read_i64(row, &col_name(AggregatedIndicatorValues::Id))?,
        indicator_id: read_i64(row, &col_name(AggregatedIndicatorValues::IndicatorId))?,
        name: row.try_get("", INDICATOR_NAME_ALIAS)?,
        unit: row.try_get("", &col_name(Units::UnitName))?,
        territory_id: read_opt_i64(row, &col_name(AggregatedIndicatorValues::TerritoryId))?,
        oktmo: read_opt_i64(row, &col_name(AggregatedIndicatorValues::Oktmo))?,
        year: row.try_get("", &col_name(AggregatedIndicatorValues::Year))?,
        source: row.try_get("", &col_name(AggregatedIndicatorValues::Source))?,
        value: row.try_get("", &col_name(AggregatedIndicatorValues::Value))?,
    })
}

fn read_detailed_row(row: &QueryResult) -> IndicatorsResult<DetailedRow> {
    Ok(DetailedRow {
        id: read_i64(row, &col_name(DetailedIndicatorValues::Id))?,
        indicator_id: read_i64(row, &col_name(DetailedIndicatorValues::IndicatorId))?,
        territory_id: read_opt_i64(row, &col_name(DetailedIndicatorValues::TerritoryId))?,
        oktmo: read_opt_i64(row, &col_name(DetailedIndicatorValues::Oktmo))?,
        unit: row.try_get("", &col_name(Units::UnitName))?,
        year: row.try_get("", &col_name(DetailedIndicatorValues::Year))?,
        source: row.try_get("", &col_name(DetailedIndicatorValues::Source))?,
        datum: DetailedDatum {
            age_start: row.try_get("", &col_name(DetailedIndicatorValues::AgeStart))?,
            age_end: row.try_get("", &col_name(DetailedIndicatorValues::AgeEnd))?,
            male: row.try_get("", &col_name(DetailedIndicatorValues::Male))?,
            female: row.try_get("", &col_name(DetailedIndicatorValues::Female))?,
        },
    })
}

// Serial keys are int4 on Postgres and int8 on SQLite.
fn read_i64(row: &QueryResult, column: &str) -> IndicatorsResult<i64> {
    if let Ok(value) = row.try_get::<i64>("", column) {
        return Ok(value);
    }
    let value: i32 = row.try_get("", column)?;
    Ok(i64::from(value))
}

fn read_opt_i64(row: &QueryResult, column: &str) -> IndicatorsResult<Option<i64>> {
    if let Ok(value) = row.try_get::<Option<i64>>("", column) {
        return Ok(value);
    }
    let value: Option<i32> = row.try_get("", column)?;
    Ok(value.map(i64::from))
}

fn col_name(column: impl sea_orm::sea_query::Iden) -> String {
    column.to_string()
}

fn build_stmt<S: QueryStatementWriter>(
    backend: DatabaseBackend,
    stmt: &S,
) -> (String, sea_orm::sea_query::Values) {
    match backend {
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        _ => stmt.build(SqliteQueryBuilder),
    }
}

async fn exec<C, S>(conn: &C, stmt: &S) -> IndicatorsResult<()>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    conn.execute_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(())
}

async fn query_all<C, S>(conn: &C, stmt: &S) -> IndicatorsResult<Vec<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let rows = conn
        .query_all_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(rows)
}

async fn query_one<C, S>(conn: &C, stmt: &S) -> IndicatorsResult<Option<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let row = conn
        .query_one_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(row)
}
