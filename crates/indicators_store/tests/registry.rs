use indicators_store::{
    AggregatedItem, AggregatedValuesApi, DetailedDatum, DetailedValuesApi, IndicatorRegistryApi,
    IndicatorStore, IndicatorsConfig, IndicatorsError, IndicatorsResult, LimitsConfig, Page,
    ScopeRequest, UnitRegistryApi, UpsertAggregatedInput, UpsertDetailedInput,
};
use tempfile::{TempDir, tempdir};

async fn open(name: &str) -> IndicatorsResult<(TempDir, IndicatorStore)> {
    let dir = tempdir().expect("tempdir");
    let config =
        IndicatorsConfig::default_sqlite(dir.path().join(name).to_string_lossy());
    let store = IndicatorStore::connect(&config, dir.path()).await?;
    Ok((dir, store))
}

#[tokio::test]
async fn unit_creation_is_idempotent() -> IndicatorsResult<()> {
    let (_dir, store) = open("units.sqlite").await?;
    let first = store.resolve_or_create_unit("people").await?;
    let second = store.resolve_or_create_unit("people").await?;
    assert_eq!(first, second);
    assert_eq!(first.unit_name, "people");

    let other = store.resolve_or_create_unit("rubles").await?;
    assert_ne!(other.id, first.id);

    let fetched = store.get_unit(first.id).await?.expect("unit");
    assert_eq!(fetched.unit_name, "people");
    assert!(store.get_unit(9_999).await?.is_none());

    let units = store.list_units(Page::default()).await?;
    let names: Vec<_> = units.iter().map(|unit| unit.unit_name.as_str()).collect();
    assert_eq!(names, vec!["people", "rubles"]);
    Ok(())
}

#[tokio::test]
async fn blank_names_are_rejected() -> IndicatorsResult<()> {
    let (_dir, store) = open("blank.sqlite").await?;
    let err = store.resolve_or_create_unit("   ").await.unwrap_err();
    assert!(matches!(err, IndicatorsError::Validation { .. }));
    let unit = store.resolve_or_create_unit("people").await?;
    let err = store.create_indicator("", unit.id).await.unwrap_err();
    assert!(matches!(err, IndicatorsError::Validation { .. }));
    Ok(())
}

#[tokio::test]
async fn indicator_creation_checks_unit_and_dedupes() -> IndicatorsResult<()> {
    let (_dir, store) = open("indicators.sqlite").await?;
    let err = store.create_indicator("Population", 42).await.unwrap_err();
    assert!(matches!(err, IndicatorsError::UnitNotFound { unit_id: 42 }));
    assert!(store.list_indicators(Page::default()).await?.is_empty());

    let unit = store.resolve_or_create_unit("people").await?;
    let first = store.create_indicator("Population", unit.id).await?;
    let second = store
        .resolve_or_create_indicator("Population", unit.id)
        .await?;
    assert_eq!(first, second);
    assert_eq!(first.unit_id, unit.id);
    assert_eq!(first.unit_name, "people");

    let other_unit = store.resolve_or_create_unit("thousand people").await?;
    let same_name = store.create_indicator("Population", other_unit.id).await?;
    assert_ne!(same_name.id, first.id);

    let listed = store.list_indicators(Page::default()).await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[1].unit_name, "thousand people");

    let fetched = store.get_indicator(first.id).await?.expect("indicator");
    assert_eq!(fetched.name, "Population");
    assert!(store.get_indicator(9_999).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn list_pages_are_clamped() -> IndicatorsResult<()> {
    let dir = tempdir().expect("tempdir");
    let mut config =
        IndicatorsConfig::default_sqlite(dir.path().join("pages.sqlite").to_string_lossy());
    config.limits = Some(LimitsConfig {
        max_batch_items: None,
        max_page_size: Some(2),
    });
    let store = IndicatorStore::connect(&config, dir.path()).await?;
    for name in ["a", "b", "c", "d"] {
        store.resolve_or_create_unit(name).await?;
    }
    let page = store
        .list_units(Page {
            offset: 0,
            limit: 100,
        })
        .await?;
    assert_eq!(page.len(), 2);
    let tail = store.list_units(Page { offset: 3, limit: 2 }).await?;
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].unit_name, "d");
    Ok(())
}

#[tokio::test]
async fn availability_and_description_cover_both_tables() -> IndicatorsResult<()> {
    let (_dir, store) = open("describe.sqlite").await?;
    let unit = store.resolve_or_create_unit("people").await?;
    let indicator = store.create_indicator("Population", unit.id).await?;

    let empty = store.describe_indicator(indicator.id).await?;
    assert_eq!(empty.unit, "people");
    assert!(empty.aggregated_availability.is_empty());
    assert!(empty.detailed_availability.is_empty());

    store
        .upsert_aggregated_values(UpsertAggregatedInput {
            indicator_id: indicator.id,
            scope: ScopeRequest::new(Some(5), Some(7701)),
            items: vec![
                AggregatedItem {
                    year: 2020,
                    value: 10.0,
                    source: "census".to_string(),
                },
                AggregatedItem {
                    year: 2021,
                    value: 11.0,
                    source: "estimate".to_string(),
                },
            ],
        })
        .await?;
    store
        .upsert_detailed_values(UpsertDetailedInput {
            indicator_id: indicator.id,
            scope: ScopeRequest::territory(5),
            year: 2020,
            source: "census".to_string(),
            data: vec![DetailedDatum::band(0, Some(4)).with_values(Some(1.0), Some(2.0))],
        })
        .await?;

    let availability = store.indicator_availability(indicator.id).await?;
    assert_eq!(availability.aggregated.len(), 2);
    assert_eq!(availability.aggregated[0].year, 2020);
    assert_eq!(availability.aggregated[0].oktmo, Some(7701));
    assert_eq!(availability.aggregated[0].territory_id, Some(5));
    assert_eq!(availability.aggregated[1].source, "estimate");
    assert_eq!(availability.detailed.len(), 1);
    assert_eq!(availability.detailed[0].territory_id, Some(5));
    assert_eq!(availability.detailed[0].oktmo, None);

    let details = store.describe_indicator(indicator.id).await?;
    assert_eq!(details.name, "Population");
    assert_eq!(details.aggregated_availability, availability.aggregated);
    assert_eq!(details.detailed_availability, availability.detailed);

    let missing = store.describe_indicator(9_999).await.unwrap_err();
    assert!(matches!(
        missing,
        IndicatorsError::IndicatorNotFound { indicator_id: 9_999 }
    ));
    assert!(missing.is_not_found());
    Ok(())
}

#[tokio::test]
async fn data_survives_reconnect() -> IndicatorsResult<()> {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("reopen.sqlite");
    let unit_id = {
        let store = IndicatorStore::connect_sqlite(&path).await?;
        store.resolve_or_create_unit("people").await?.id
    };
    let store = IndicatorStore::connect_sqlite(&path).await?;
    let unit = store.get_unit(unit_id).await?.expect("unit");
    assert_eq!(unit.unit_name, "people");
    Ok(())
}
