use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{FightPointsTable, Match, MatchStatus, WinMethod};

/// Records official outcomes on scheduled matches.
#[derive(Debug, Clone, Default)]
pub struct MatchRegistry {
    fight_points: FightPointsTable,
}

impl MatchRegistry {
    pub fn new(fight_points: FightPointsTable) -> Self {
        Self { fight_points }
    }

    pub fn fight_points(&self) -> &FightPointsTable {
        &self.fight_points
    }

    /// Stamps a result onto `bout`. Once terminal a match never takes another result.
    pub fn record_result(
        &self,
        bout: &mut Match,
        winner: Option<Uuid>,
        win_method: Option<WinMethod>,
        officiant: Option<Uuid>,
        notes: Option<&str>,
    ) -> Result<()> {
        ensure_scheduled(bout)?;
        ensure_contested(bout)?;

        let winner = winner.ok_or_else(|| StorageError::validation("winner is required"))?;
        let win_method =
            win_method.ok_or_else(|| StorageError::validation("win method is required"))?;

        if !bout.holds(winner) {
            return Err(StorageError::validation(format!(
                "athlete {} is not a contestant of match {}",
                winner, bout.match_id
            )));
        }

        let points = self.fight_points.points_for(win_method);

        bout.winner_athlete_id = Some(winner);
        bout.win_method = Some(win_method);
        bout.fight_points_winner = points.winner;
        bout.fight_points_loser = points.loser;
        bout.status = if win_method == WinMethod::Wo {
            MatchStatus::Walkover
        } else {
            MatchStatus::Finished
        };
        bout.finished_at = Some(Utc::now());
        bout.finished_by = officiant;
        if let Some(notes) = notes {
            bout.notes = notes.to_string();
        }

        info!(
            match_id = %bout.match_id,
            winner = %winner,
            method = %win_method,
            status = %bout.status,
            "Match result recorded"
        );

        Ok(())
    }

    /// Administrative close without a winner (no-show, disqualification of both).
    pub fn void_match(&self, bout: &mut Match, reason: &str, officiant: Option<Uuid>) -> Result<()> {
        ensure_scheduled(bout)?;
        ensure_contested(bout)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(StorageError::validation("a reason is required to void a match"));
        }

        bout.status = MatchStatus::Walkover;
        bout.winner_athlete_id = None;
        bout.win_method = None;
        bout.finished_at = Some(Utc::now());
        bout.finished_by = officiant;
        bout.notes = reason.to_string();

        info!(match_id = %bout.match_id, reason, "Match voided");

        Ok(())
    }
}

fn ensure_scheduled(bout: &Match) -> Result<()> {
    if bout.status == MatchStatus::Scheduled {
        Ok(())
    } else {
        Err(StorageError::validation(format!(
            "match {} is already {}",
            bout.match_id, bout.status
        )))
    }
}

/// Both slots must be filled; an open slot is still waiting on advancement.
fn ensure_contested(bout: &Match) -> Result<()> {
    if bout.contestants().count() == 2 {
        Ok(())
    } else {
        Err(StorageError::validation(format!(
            "match {} is still waiting for a contestant",
            bout.match_id
        )))
    }
}
