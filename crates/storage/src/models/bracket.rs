use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownVariant;

/// Competition format of a bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketFormat {
    #[serde(rename = "SINGLE_ELIMINATION")]
    SingleElimination,
    #[serde(rename = "ROUND_ROBIN")]
    RoundRobin,
    #[serde(rename = "BEST_OF_3")]
    BestOfThree,
    #[serde(rename = "ELIMINATION_WITH_REPECHAGE")]
    EliminationWithRepechage,
}

impl BracketFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            BracketFormat::SingleElimination => "SINGLE_ELIMINATION",
            BracketFormat::RoundRobin => "ROUND_ROBIN",
            BracketFormat::BestOfThree => "BEST_OF_3",
            BracketFormat::EliminationWithRepechage => "ELIMINATION_WITH_REPECHAGE",
        }
    }
}

impl FromStr for BracketFormat {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "SINGLE_ELIMINATION" => Ok(BracketFormat::SingleElimination),
            "ROUND_ROBIN" => Ok(BracketFormat::RoundRobin),
            "BEST_OF_3" | "BEST_OF_THREE" => Ok(BracketFormat::BestOfThree),
            "ELIMINATION_WITH_REPECHAGE" => Ok(BracketFormat::EliminationWithRepechage),
            _ => Err(UnknownVariant {
                kind: "bracket format",
                value: s.to_string(),
            }),
        }
    }
}

text_column!(BracketFormat);

/// The tuple a bracket is unique on within an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupingKey {
    pub event_id: Uuid,
    pub category_code: String,
    pub class_code: String,
    pub sex: String,
    pub belt_group: Option<i16>,
}

impl std::fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let belt_group = self
            .belt_group
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string());

        write!(
            f,
            "{}/{}/{}/{}",
            self.category_code, self.class_code, self.sex, belt_group
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Bracket {
    pub bracket_id: Uuid,
    pub event_id: Uuid,
    pub category_code: String,
    pub class_code: String,
    pub sex: String,
    pub belt_group: Option<i16>,
    pub format: BracketFormat,
    pub is_generated: bool,
    pub created_at: DateTime<Utc>,
}

impl Bracket {
    /// A not-yet-persisted bracket for `key`.
    pub fn draft(key: &GroupingKey, format: BracketFormat) -> Self {
        Self {
            bracket_id: Uuid::new_v4(),
            event_id: key.event_id,
            category_code: key.category_code.clone(),
            class_code: key.class_code.clone(),
            sex: key.sex.clone(),
            belt_group: key.belt_group,
            format,
            is_generated: false,
            created_at: Utc::now(),
        }
    }

    pub fn grouping_key(&self) -> GroupingKey {
        GroupingKey {
            event_id: self.event_id,
            category_code: self.category_code.clone(),
            class_code: self.class_code.clone(),
            sex: self.sex.clone(),
            belt_group: self.belt_group,
        }
    }
}
