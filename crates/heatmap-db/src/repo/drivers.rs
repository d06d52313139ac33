//! EntityDailyDriver persistence.

use heatmap_core::metrics_types::EntityDailyDriver;
use sqlx::PgPool;

pub async fn insert_drivers(pool: &PgPool, drivers: &[EntityDailyDriver]) -> Result<(), sqlx::Error> {
    for driver in drivers {
        sqlx::query(
            r#"
            INSERT INTO entity_daily_drivers (run_id, entity_id, rank, item_id, impact_score, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(driver.run_id)
        .bind(driver.entity_id)
        .bind(driver.rank as i32)
        .bind(&driver.item_id)
        .bind(driver.impact_score)
        .bind(&driver.reason)
        .execute(pool)
        .await?;
    }
    Ok(())
}
