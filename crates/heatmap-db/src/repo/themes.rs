//! EntityDailyTheme persistence.

use heatmap_core::metrics_types::EntityDailyTheme;
use sqlx::PgPool;

pub async fn insert_themes(pool: &PgPool, themes: &[EntityDailyTheme]) -> Result<(), sqlx::Error> {
    for theme in themes {
        sqlx::query(
            r#"
            INSERT INTO entity_daily_themes (run_id, entity_id, theme_id, label, keywords, volume, sentiment_mix)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(theme.run_id)
        .bind(theme.entity_id)
        .bind(theme.theme_id)
        .bind(&theme.label)
        .bind(serde_json::to_value(&theme.keywords).unwrap_or_default())
        .bind(theme.volume as i64)
        .bind(serde_json::to_value(theme.sentiment_mix).unwrap_or_default())
        .execute(pool)
        .await?;
    }
    Ok(())
}
