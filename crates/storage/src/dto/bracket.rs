use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::BracketFormat;

/// Payload for generating every bracket of an event in one call.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateBracketsRequest {
    #[validate(length(min = 1, message = "At least one entry group is required"))]
    #[validate(nested)]
    pub groups: Vec<EntryGroup>,

    /// Category code → forced format.
    #[serde(default)]
    pub format_overrides: HashMap<String, BracketFormat>,
}

/// Registrants sharing a category, class and sex, before belt-group split.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EntryGroup {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Category code must be between 1 and 50 characters"
    ))]
    pub category_code: String,

    #[validate(length(
        min = 1,
        max = 20,
        message = "Class code must be between 1 and 20 characters"
    ))]
    pub class_code: String,

    #[validate(custom(function = "validate_sex"))]
    pub sex: String,

    #[validate(length(min = 1, message = "An entry group needs at least one registrant"))]
    pub registrants: Vec<Registrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    pub athlete_id: Uuid,
    pub organization_id: Uuid,
    /// Defaults to registration order.
    #[serde(default)]
    pub seed: Option<i32>,
    #[serde(default)]
    pub belt: String,
}

fn validate_sex(sex: &str) -> Result<(), validator::ValidationError> {
    if matches!(sex.trim().to_uppercase().as_str(), "M" | "F") {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_sex"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(sex: &str, registrants: usize) -> EntryGroup {
        EntryGroup {
            category_code: "M-60".to_string(),
            class_code: "SUB-15".to_string(),
            sex: sex.to_string(),
            registrants: (0..registrants)
                .map(|_| Registrant {
                    athlete_id: Uuid::new_v4(),
                    organization_id: Uuid::new_v4(),
                    seed: None,
                    belt: "VERDE".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_valid_request() {
        let request = GenerateBracketsRequest {
            groups: vec![group("m", 3)],
            format_overrides: HashMap::new(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_nested_groups_are_validated() {
        let request = GenerateBracketsRequest {
            groups: vec![group("X", 3)],
            format_overrides: HashMap::new(),
        };
        assert!(request.validate().is_err());

        let request = GenerateBracketsRequest {
            groups: vec![group("F", 0)],
            format_overrides: HashMap::new(),
        };
        assert!(request.validate().is_err());

        let request = GenerateBracketsRequest {
            groups: Vec::new(),
            format_overrides: HashMap::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_overrides() {
        let raw = r#"{
            "groups": [{
                "category_code": "F-48",
                "class_code": "SUB-13",
                "sex": "F",
                "registrants": [
                    {"athlete_id": "6f1c1d2e-9a52-4f43-9a86-2b1d0f3a7c11",
                     "organization_id": "0e7d4a3b-1f7a-4c51-8d2e-5b6a9c0d1e22",
                     "belt": "AZUL"}
                ]
            }],
            "format_overrides": {"F-48": "SINGLE_ELIMINATION"}
        }"#;

        let request: GenerateBracketsRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.groups[0].registrants[0].seed, None);
        assert_eq!(
            request.format_overrides.get("F-48"),
            Some(&BracketFormat::SingleElimination)
        );
    }
}
