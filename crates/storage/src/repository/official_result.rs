use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::Result;
use crate::models::OfficialResult;

/// Repository for OfficialResult rows
pub struct OfficialResultRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> OfficialResultRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    pub async fn list_by_event(&mut self, event_id: Uuid) -> Result<Vec<OfficialResult>> {
        let results = sqlx::query_as::<_, OfficialResult>(
            r#"
            SELECT official_result_id, event_id, category_code, athlete_id, organization_id,
                   placement, fight_points_total, created_at
            FROM official_results
            WHERE event_id = $1
            ORDER BY category_code, placement, athlete_id
            "#,
        )
        .bind(event_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(results)
    }

    pub async fn delete_by_event(&mut self, event_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM official_results WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn insert_many(&mut self, results: &[OfficialResult]) -> Result<()> {
        for r in results {
            sqlx::query(
                r#"
                INSERT INTO official_results (
                    official_result_id, event_id, category_code, athlete_id, organization_id,
                    placement, fight_points_total, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(r.official_result_id)
            .bind(r.event_id)
            .bind(&r.category_code)
            .bind(r.athlete_id)
            .bind(r.organization_id)
            .bind(r.placement)
            .bind(r.fight_points_total)
            .bind(r.created_at)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(())
    }
}
