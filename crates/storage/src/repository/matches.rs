use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::Match;

/// Repository for Match rows
pub struct MatchRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> MatchRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Get a match by ID
    pub async fn find_by_id(&mut self, match_id: Uuid) -> Result<Match> {
        sqlx::query_as::<_, Match>(
            r#"
            SELECT match_id, bracket_id, round_number, match_number, phase,
                   source_blue_match_id, source_white_match_id,
                   blue_athlete_id, white_athlete_id, status, winner_athlete_id, win_method,
                   fight_points_winner, fight_points_loser, finished_at, finished_by, notes
            FROM matches
            WHERE match_id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("match {}", match_id)))
    }

    /// All matches of a bracket in play order
    pub async fn list_by_bracket(&mut self, bracket_id: Uuid) -> Result<Vec<Match>> {
        let matches = sqlx::query_as::<_, Match>(
            r#"
            SELECT match_id, bracket_id, round_number, match_number, phase,
                   source_blue_match_id, source_white_match_id,
                   blue_athlete_id, white_athlete_id, status, winner_athlete_id, win_method,
                   fight_points_winner, fight_points_loser, finished_at, finished_by, notes
            FROM matches
            WHERE bracket_id = $1
            ORDER BY round_number, match_number
            "#,
        )
        .bind(bracket_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(matches)
    }

    /// Same as `list_by_bracket`, row-locking every match until the transaction ends
    pub async fn lock_by_bracket(&mut self, bracket_id: Uuid) -> Result<Vec<Match>> {
        let matches = sqlx::query_as::<_, Match>(
            r#"
            SELECT match_id, bracket_id, round_number, match_number, phase,
                   source_blue_match_id, source_white_match_id,
                   blue_athlete_id, white_athlete_id, status, winner_athlete_id, win_method,
                   fight_points_winner, fight_points_loser, finished_at, finished_by, notes
            FROM matches
            WHERE bracket_id = $1
            ORDER BY round_number, match_number
            FOR UPDATE
            "#,
        )
        .bind(bracket_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(matches)
    }

    /// Insert matches; sources must precede the matches pointing at them.
    pub async fn insert_many(&mut self, matches: &[Match]) -> Result<()> {
        for m in matches {
            sqlx::query(
                r#"
                INSERT INTO matches (
                    match_id, bracket_id, round_number, match_number, phase,
                    source_blue_match_id, source_white_match_id,
                    blue_athlete_id, white_athlete_id, status, winner_athlete_id, win_method,
                    fight_points_winner, fight_points_loser, finished_at, finished_by, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                "#,
            )
            .bind(m.match_id)
            .bind(m.bracket_id)
            .bind(m.round_number)
            .bind(m.match_number)
            .bind(m.phase)
            .bind(m.source_blue_match_id)
            .bind(m.source_white_match_id)
            .bind(m.blue_athlete_id)
            .bind(m.white_athlete_id)
            .bind(m.status)
            .bind(m.winner_athlete_id)
            .bind(m.win_method)
            .bind(m.fight_points_winner)
            .bind(m.fight_points_loser)
            .bind(m.finished_at)
            .bind(m.finished_by)
            .bind(&m.notes)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(())
    }

    /// Write back slot and result columns; topology columns never change after insert.
    pub async fn update(&mut self, m: &Match) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE matches
            SET blue_athlete_id = $2,
                white_athlete_id = $3,
                status = $4,
                winner_athlete_id = $5,
                win_method = $6,
                fight_points_winner = $7,
                fight_points_loser = $8,
                finished_at = $9,
                finished_by = $10,
                notes = $11
            WHERE match_id = $1
            "#,
        )
        .bind(m.match_id)
        .bind(m.blue_athlete_id)
        .bind(m.white_athlete_id)
        .bind(m.status)
        .bind(m.winner_athlete_id)
        .bind(m.win_method)
        .bind(m.fight_points_winner)
        .bind(m.fight_points_loser)
        .bind(m.finished_at)
        .bind(m.finished_by)
        .bind(&m.notes)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("match {}", m.match_id)));
        }

        Ok(())
    }

    pub async fn delete_by_bracket(&mut self, bracket_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM matches WHERE bracket_id = $1")
            .bind(bracket_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }
}
