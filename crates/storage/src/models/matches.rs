use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchPhase {
    Main,
    Repechage,
    Bronze,
    Final,
}

impl MatchPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchPhase::Main => "MAIN",
            MatchPhase::Repechage => "REPECHAGE",
            MatchPhase::Bronze => "BRONZE",
            MatchPhase::Final => "FINAL",
        }
    }

    /// MAIN and FINAL matches form the knockout tree.
    pub fn is_main_tree(self) -> bool {
        matches!(self, MatchPhase::Main | MatchPhase::Final)
    }
}

impl FromStr for MatchPhase {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAIN" => Ok(MatchPhase::Main),
            "REPECHAGE" => Ok(MatchPhase::Repechage),
            "BRONZE" => Ok(MatchPhase::Bronze),
            "FINAL" => Ok(MatchPhase::Final),
            _ => Err(UnknownVariant {
                kind: "match phase",
                value: s.to_string(),
            }),
        }
    }
}

text_column!(MatchPhase);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Finished,
    Walkover,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Walkover => "WALKOVER",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, MatchStatus::Scheduled)
    }
}

impl FromStr for MatchStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(MatchStatus::Scheduled),
            "FINISHED" => Ok(MatchStatus::Finished),
            "WALKOVER" => Ok(MatchStatus::Walkover),
            _ => Err(UnknownVariant {
                kind: "match status",
                value: s.to_string(),
            }),
        }
    }
}

text_column!(MatchStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WinMethod {
    Ippon,
    WazaAri,
    Yuko,
    Hansokumake,
    Wo,
}

impl WinMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            WinMethod::Ippon => "IPPON",
            WinMethod::WazaAri => "WAZA_ARI",
            WinMethod::Yuko => "YUKO",
            WinMethod::Hansokumake => "HANSOKUMAKE",
            WinMethod::Wo => "WO",
        }
    }
}

impl FromStr for WinMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "IPPON" => Ok(WinMethod::Ippon),
            "WAZA_ARI" | "WAZARI" => Ok(WinMethod::WazaAri),
            "YUKO" => Ok(WinMethod::Yuko),
            "HANSOKUMAKE" => Ok(WinMethod::Hansokumake),
            "WO" | "WALKOVER" => Ok(WinMethod::Wo),
            _ => Err(UnknownVariant {
                kind: "win method",
                value: s.to_string(),
            }),
        }
    }
}

text_column!(WinMethod);

/// Blue or white side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Blue,
    White,
}

impl Corner {
    /// Odd match numbers feed the blue slot of their parent, even ones the white slot.
    pub fn for_match_number(match_number: i16) -> Self {
        if match_number % 2 == 1 {
            Corner::Blue
        } else {
            Corner::White
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub match_id: Uuid,
    pub bracket_id: Uuid,
    pub round_number: i16,
    pub match_number: i16,
    pub phase: MatchPhase,
    pub source_blue_match_id: Option<Uuid>,
    pub source_white_match_id: Option<Uuid>,
    pub blue_athlete_id: Option<Uuid>,
    pub white_athlete_id: Option<Uuid>,
    pub status: MatchStatus,
    pub winner_athlete_id: Option<Uuid>,
    pub win_method: Option<WinMethod>,
    pub fight_points_winner: i32,
    pub fight_points_loser: i32,
    pub finished_at: Option<DateTime<Utc>>,
    pub finished_by: Option<Uuid>,
    pub notes: String,
}

impl Match {
    /// An empty scheduled match.
    pub fn scheduled(bracket_id: Uuid, round_number: i16, match_number: i16, phase: MatchPhase) -> Self {
        Self {
            match_id: Uuid::new_v4(),
            bracket_id,
            round_number,
            match_number,
            phase,
            source_blue_match_id: None,
            source_white_match_id: None,
            blue_athlete_id: None,
            white_athlete_id: None,
            status: MatchStatus::Scheduled,
            winner_athlete_id: None,
            win_method: None,
            fight_points_winner: 0,
            fight_points_loser: 0,
            finished_at: None,
            finished_by: None,
            notes: String::new(),
        }
    }

    pub fn with_contestants(mut self, blue: Option<Uuid>, white: Option<Uuid>) -> Self {
        self.blue_athlete_id = blue;
        self.white_athlete_id = white;
        self
    }

    pub fn with_sources(mut self, blue: Option<Uuid>, white: Option<Uuid>) -> Self {
        self.source_blue_match_id = blue;
        self.source_white_match_id = white;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn occupant(&self, corner: Corner) -> Option<Uuid> {
        match corner {
            Corner::Blue => self.blue_athlete_id,
            Corner::White => self.white_athlete_id,
        }
    }

    pub fn set_occupant(&mut self, corner: Corner, athlete_id: Option<Uuid>) {
        match corner {
            Corner::Blue => self.blue_athlete_id = athlete_id,
            Corner::White => self.white_athlete_id = athlete_id,
        }
    }

    pub fn source(&self, corner: Corner) -> Option<Uuid> {
        match corner {
            Corner::Blue => self.source_blue_match_id,
            Corner::White => self.source_white_match_id,
        }
    }

    pub fn contestants(&self) -> impl Iterator<Item = Uuid> {
        self.blue_athlete_id.into_iter().chain(self.white_athlete_id)
    }

    pub fn holds(&self, athlete_id: Uuid) -> bool {
        self.contestants().any(|a| a == athlete_id)
    }

    /// The contestant who did not win, once both slots and a winner are known.
    pub fn loser(&self) -> Option<Uuid> {
        let winner = self.winner_athlete_id?;
        match (self.blue_athlete_id, self.white_athlete_id) {
            (Some(blue), Some(white)) if winner == blue => Some(white),
            (Some(blue), Some(white)) if winner == white => Some(blue),
            _ => None,
        }
    }

    pub fn involves_pair(&self, a: Uuid, b: Uuid) -> bool {
        matches!(
            (self.blue_athlete_id, self.white_athlete_id),
            (Some(x), Some(y)) if (x == a && y == b) || (x == b && y == a)
        )
    }
}
