use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// Each value row is unique on the identifier that addresses it: OKTMO when
// the row carries one, territory id otherwise. Absent age bounds compare
// equal through COALESCE.
const NATURAL_KEY_INDEXES: &[(&str, &str)] = &[
    (
        "aggregated_values_oktmo_uidx",
        "CREATE UNIQUE INDEX IF NOT EXISTS aggregated_values_oktmo_uidx \
         ON aggregated_indicator_values (indicator_id, year, oktmo) \
         WHERE oktmo IS NOT NULL",
    ),
    (
        "aggregated_values_territory_uidx",
        "CREATE UNIQUE INDEX IF NOT EXISTS aggregated_values_territory_uidx \
         ON aggregated_indicator_values (indicator_id, year, territory_id) \
         WHERE oktmo IS NULL",
    ),
    (
        "detailed_values_oktmo_uidx",
        "CREATE UNIQUE INDEX IF NOT EXISTS detailed_values_oktmo_uidx \
         ON detailed_indicator_values \
         (indicator_id, year, oktmo, COALESCE(age_start, -1), COALESCE(age_end, -1)) \
         WHERE oktmo IS NOT NULL",
    ),
    (
        "detailed_values_territory_uidx",
        "CREATE UNIQUE INDEX IF NOT EXISTS detailed_values_territory_uidx \
         ON detailed_indicator_values \
         (indicator_id, year, territory_id, COALESCE(age_start, -1), COALESCE(age_end, -1)) \
         WHERE oktmo IS NULL",
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for (_, sql) in NATURAL_KEY_INDEXES {
            db.execute_unprepared(sql).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for (name, _) in NATURAL_KEY_INDEXES {
            db.execute_unprepared(&format!("DROP INDEX IF EXISTS {name}"))
                .await?;
        }
        Ok(())
    }
}
