use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An eligible athlete entering a bracket. Immutable once generation starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub athlete_id: Uuid,
    pub organization_id: Uuid,
    pub seed: i32,
}
