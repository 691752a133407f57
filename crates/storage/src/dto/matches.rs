use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::WinMethod;

/// An official's result entry. Missing winner or method is rejected by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordResultRequest {
    pub winner: Option<Uuid>,

    pub win_method: Option<WinMethod>,

    pub officiant: Option<Uuid>,

    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VoidMatchRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Reason must be between 1 and 500 characters"
    ))]
    pub reason: String,

    pub officiant: Option<Uuid>,
}
