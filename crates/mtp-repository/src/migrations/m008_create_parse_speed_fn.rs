use sea_orm_migration::{
    async_trait::async_trait,
    prelude::{DbErr, DeriveMigrationName, MigrationTrait, SchemaManager},
    sea_orm::ConnectionTrait,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Parses benchmark speed strings like "812 MiB/s" into bytes per second.
/// The rating formula and the disk-speed search filters both depend on this
/// function, so its behavior is part of the API and must not drift.
const CREATE_FN: &str = r#"
CREATE OR REPLACE FUNCTION parse_speed_to_int(speed text) RETURNS bigint AS $$
DECLARE
    num numeric;
    unit text;
BEGIN
    IF speed IS NULL OR speed = '' THEN
        RETURN 0;
    END IF;

    num := (regexp_match(speed, '([0-9]+\.?[0-9]*)'))[1]::numeric;
    unit := lower((regexp_match(speed, '([KMGTkmgt]i?[Bb])'))[1]);

    RETURN CASE unit
        WHEN 'kib' THEN (num * 1024)::bigint
        WHEN 'kb'  THEN (num * 1024)::bigint
        WHEN 'mib' THEN (num * 1024 * 1024)::bigint
        WHEN 'mb'  THEN (num * 1024 * 1024)::bigint
        WHEN 'gib' THEN (num * 1024 * 1024 * 1024)::bigint
        WHEN 'gb'  THEN (num * 1024 * 1024 * 1024)::bigint
        WHEN 'tib' THEN (num * 1099511627776)::bigint
        WHEN 'tb'  THEN (num * 1099511627776)::bigint
        ELSE num::bigint
    END;
EXCEPTION WHEN OTHERS THEN
    RETURN 0;
END;
$$ LANGUAGE plpgsql IMMUTABLE;
"#;

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(CREATE_FN)
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP FUNCTION IF EXISTS parse_speed_to_int(text);")
            .await?;
        Ok(())
    }
}
