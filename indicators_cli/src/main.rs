use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicators_store::{
    AggregatedValuesApi, DetailedValuesApi, IndicatorRegistryApi, IndicatorStore, Page,
    ScopeRequest, UnitRegistryApi, UpsertAggregatedInput, UpsertDetailedInput, ValuesQuery,
    load_or_init_config, open_store,
};
use log::{info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Migrate => migrate(&cli.base).await,
        Command::Unit(command) => run_unit(&cli.base, command).await,
        Command::Indicator(command) => run_indicator(&cli.base, command).await,
        Command::Aggregated(command) => run_aggregated(&cli.base, command).await,
        Command::Detailed(command) => run_detailed(&cli.base, command).await,
    }
}

#[derive(Parser)]
#[command(author, version, about = "Operator utilities for the indicator store")]
struct Cli {
    /// Directory holding `indicators.json` and the default SQLite file.
    #[arg(long, global = true, default_value = ".indicators")]
    base: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or upgrade the schema and print the resolved backend.
    Migrate,
    #[command(subcommand)]
    Unit(UnitCommand),
    #[command(subcommand)]
    Indicator(IndicatorCommand),
    #[command(subcommand)]
    Aggregated(ValuesCommand),
    #[command(subcommand)]
    Detailed(ValuesCommand),
}

#[derive(Subcommand)]
enum UnitCommand {
    /// Return the unit with this name, creating it if needed.
    Create {
        #[arg(long)]
        name: String,
    },
    Get {
        #[arg(long)]
        id: i64,
    },
    List(PageArgs),
}

#[derive(Subcommand)]
enum IndicatorCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        unit_id: i64,
    },
    Get {
        #[arg(long)]
        id: i64,
    },
    List(PageArgs),
    /// Print the indicator with its aggregated and detailed availability.
    Describe {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum ValuesCommand {
    /// Upsert a batch read from a JSON payload file.
    Load {
        #[arg(long)]
        input: PathBuf,
    },
    Query(QueryArgs),
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 0)]
    offset: u64,
    #[arg(long, default_value_t = 10)]
    limit: u64,
}

impl From<PageArgs> for Page {
    fn from(args: PageArgs) -> Self {
        Page {
            offset: args.offset,
            limit: args.limit,
        }
    }
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long)]
    indicator_id: i64,
    #[arg(long)]
    territory_id: Option<i64>,
    #[arg(long)]
    oktmo: Option<i64>,
    #[arg(long)]
    year: Option<i32>,
}

impl From<QueryArgs> for ValuesQuery {
    fn from(args: QueryArgs) -> Self {
        ValuesQuery {
            indicator_id: args.indicator_id,
            scope: ScopeRequest::new(args.territory_id, args.oktmo),
            year: args.year,
        }
    }
}

async fn connect(base: &Path) -> Result<IndicatorStore> {
    open_store(base)
        .await
        .with_context(|| format!("failed to open store under {}", base.display()))
}

fn read_payload<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

async fn migrate(base: &Path) -> Result<()> {
    let config = load_or_init_config(base)
        .with_context(|| format!("failed to load config under {}", base.display()))?;
    connect(base).await?;
    info!(
        "schema is current backend={} base={}",
        config.backend_name(),
        base.display()
    );
    Ok(())
}

async fn run_unit(base: &Path, command: UnitCommand) -> Result<()> {
    let store = connect(base).await?;
    match command {
        UnitCommand::Create { name } => print_json(&store.resolve_or_create_unit(&name).await?),
        UnitCommand::Get { id } => print_json(&store.get_unit(id).await?),
        UnitCommand::List(page) => print_json(&store.list_units(page.into()).await?),
    }
}

async fn run_indicator(base: &Path, command: IndicatorCommand) -> Result<()> {
    let store = connect(base).await?;
    match command {
        IndicatorCommand::Create { name, unit_id } => {
            print_json(&store.create_indicator(&name, unit_id).await?)
        }
        IndicatorCommand::Get { id } => print_json(&store.get_indicator(id).await?),
        IndicatorCommand::List(page) => print_json(&store.list_indicators(page.into()).await?),
        IndicatorCommand::Describe { id } => print_json(&store.describe_indicator(id).await?),
    }
}

async fn run_aggregated(base: &Path, command: ValuesCommand) -> Result<()> {
    let store = connect(base).await?;
    match command {
        ValuesCommand::Load { input } => {
            let payload: UpsertAggregatedInput = read_payload(&input)?;
            print_json(&store.upsert_aggregated_values(payload).await?)
        }
        ValuesCommand::Query(args) => {
            print_json(&store.query_aggregated_values(args.into()).await?)
        }
    }
}

async fn run_detailed(base: &Path, command: ValuesCommand) -> Result<()> {
    let store = connect(base).await?;
    match command {
        ValuesCommand::Load { input } => {
            let payload: UpsertDetailedInput = read_payload(&input)?;
            print_json(&store.upsert_detailed_values(payload).await?)
        }
        ValuesCommand::Query(args) => {
            let query: ValuesQuery = args.into();
            match store.query_detailed_values(query).await? {
                Some(groups) => print_json(&groups),
                None => {
                    warn!(
                        "no detailed data for indicator={} year={:?}",
                        query.indicator_id, query.year
                    );
                    print_json(&serde_json::Value::Null)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_base_after_subcommand() {
        let cli = Cli::parse_from(["indicators", "unit", "list", "--base", "/tmp/ind"]);
        assert_eq!(cli.base, PathBuf::from("/tmp/ind"));
        match cli.command {
            Command::Unit(UnitCommand::List(page)) => {
                assert_eq!(page.offset, 0);
                assert_eq!(page.limit, 10);
            }
            _ => panic!("expected unit list"),
        }
    }

    #[test]
    fn cli_parses_detailed_query_scope() {
        let cli = Cli::parse_from([
            "indicators",
            "detailed",
            "query",
            "--indicator-id",
            "3",
            "--oktmo",
            "45000000000",
            "--year",
            "2021",
        ]);
        assert_eq!(cli.base, PathBuf::from(".indicators"));
        match cli.command {
            Command::Detailed(ValuesCommand::Query(args)) => {
                let query: ValuesQuery = args.into();
                assert_eq!(query.indicator_id, 3);
                assert_eq!(query.scope.oktmo, Some(45_000_000_000));
                assert_eq!(query.scope.territory_id, None);
                assert_eq!(query.year, Some(2021));
            }
            _ => panic!("expected detailed query"),
        }
    }

    #[test]
    fn aggregated_payload_accepts_flat_scope() {
        let payload: UpsertAggregatedInput = serde_json::from_str(
            r#"{"indicator_id":1,"territory_id":5,"items":[{"year":2020,"value":1.5,"source":"census"}]}"#,
        )
        .expect("payload");
        assert_eq!(payload.scope, ScopeRequest::territory(5));
        assert_eq!(payload.items.len(), 1);
    }

    #[test]
    fn indicator_create_requires_unit() {
        let parsed = Cli::try_parse_from(["indicators", "indicator", "create", "--name", "x"]);
        assert!(parsed.is_err());
    }
}
