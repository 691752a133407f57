use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OfficialResult {
    pub official_result_id: Uuid,
    pub event_id: Uuid,
    pub category_code: String,
    pub athlete_id: Uuid,
    pub organization_id: Uuid,
    pub placement: i32,
    pub fight_points_total: i32,
    pub created_at: DateTime<Utc>,
}
