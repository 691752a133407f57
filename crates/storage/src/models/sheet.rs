use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Bracket, Match, MatchPhase, Participant};
use crate::error::{Result, StorageError};

/// One bracket with its roster and every match it owns.
///
/// Matches are addressed by id or by `(round_number, match_number)`; topology
/// between them is either implied by the knockout numbering (MAIN/FINAL) or
/// carried explicitly by source pointers (REPECHAGE/BRONZE).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketSheet {
    pub bracket: Bracket,
    pub participants: Vec<Participant>,
    pub matches: Vec<Match>,
}

impl BracketSheet {
    pub fn bracket_id(&self) -> Uuid {
        self.bracket.bracket_id
    }

    pub fn position(&self, match_id: Uuid) -> Option<usize> {
        self.matches.iter().position(|m| m.match_id == match_id)
    }

    pub fn require_position(&self, match_id: Uuid) -> Result<usize> {
        self.position(match_id)
            .ok_or_else(|| StorageError::NotFound(format!("match {}", match_id)))
    }

    /// Position of the knockout-tree match at `(round, number)`.
    pub fn main_position(&self, round_number: i16, match_number: i16) -> Option<usize> {
        self.matches.iter().position(|m| {
            m.phase.is_main_tree()
                && m.round_number == round_number
                && m.match_number == match_number
        })
    }

    pub fn final_match(&self) -> Option<&Match> {
        self.matches.iter().find(|m| m.phase == MatchPhase::Final)
    }

    /// Semifinals in top-to-bottom order; empty unless the tree has at least two rounds.
    pub fn semifinals(&self) -> Vec<&Match> {
        let Some(final_match) = self.final_match() else {
            return Vec::new();
        };
        (1..=2)
            .filter_map(|n| self.main_position(final_match.round_number - 1, n))
            .map(|idx| &self.matches[idx])
            .collect()
    }

    pub fn in_phase(&self, phase: MatchPhase) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.phase == phase)
    }

    pub fn pending_count(&self) -> usize {
        self.matches.iter().filter(|m| !m.is_terminal()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn participant(&self, athlete_id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.athlete_id == athlete_id)
    }

    /// Moves the sheet onto an already-persisted bracket row.
    pub fn rebind(&mut self, bracket: Bracket) {
        for m in &mut self.matches {
            m.bracket_id = bracket.bracket_id;
        }
        self.bracket = Bracket {
            format: self.bracket.format,
            is_generated: self.bracket.is_generated,
            ..bracket
        };
    }
}
