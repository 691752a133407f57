use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::CompetitionStore;
use crate::error::{Result, StorageError};
use crate::models::{Bracket, BracketSheet, Match, OfficialResult};
use crate::repository::{BracketRepository, MatchRepository, OfficialResultRepository};

/// `CompetitionStore` over PostgreSQL. Each unit of work is one transaction.
#[derive(Debug, Clone)]
pub struct PgCompetitionStore {
    pool: PgPool,
}

impl PgCompetitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn read_sheet(conn: &mut PgConnection, bracket_id: Uuid, lock_matches: bool) -> Result<BracketSheet> {
    let bracket = BracketRepository::new(&mut *conn).find_by_id(bracket_id).await?;
    let participants = BracketRepository::new(&mut *conn)
        .list_participants(bracket_id)
        .await?;

    let mut matches = MatchRepository::new(&mut *conn);
    let matches = if lock_matches {
        matches.lock_by_bracket(bracket_id).await?
    } else {
        matches.list_by_bracket(bracket_id).await?
    };

    Ok(BracketSheet {
        bracket,
        participants,
        matches,
    })
}

#[async_trait::async_trait]
impl CompetitionStore for PgCompetitionStore {
    async fn insert_generated_brackets(&self, sheets: Vec<BracketSheet>) -> Result<Vec<Bracket>> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(sheets.len());

        for mut sheet in sheets {
            let key = sheet.bracket.grouping_key();
            let existing = BracketRepository::new(&mut *tx)
                .get_or_create(&key, sheet.bracket.format)
                .await?;

            if existing.is_generated {
                return Err(StorageError::validation(format!(
                    "bracket {} is already generated, clear it first",
                    key
                )));
            }

            sheet.rebind(existing);
            let bracket_id = sheet.bracket_id();

            let mut brackets = BracketRepository::new(&mut *tx);
            brackets.mark_generated(bracket_id, sheet.bracket.format).await?;
            brackets
                .insert_participants(bracket_id, &sheet.participants)
                .await?;

            let mut ordered: Vec<Match> = sheet.matches.clone();
            ordered.sort_by_key(|m| (m.round_number, m.match_number));
            MatchRepository::new(&mut *tx).insert_many(&ordered).await?;

            debug!(
                bracket_id = %bracket_id,
                bracket = %key,
                matches = ordered.len(),
                "Bracket rows written"
            );
            stored.push(sheet.bracket);
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn find_bracket(&self, bracket_id: Uuid) -> Result<Bracket> {
        let mut conn = self.pool.acquire().await?;
        BracketRepository::new(&mut conn).find_by_id(bracket_id).await
    }

    async fn list_brackets(&self, event_id: Uuid) -> Result<Vec<Bracket>> {
        let mut conn = self.pool.acquire().await?;
        BracketRepository::new(&mut conn).list_by_event(event_id).await
    }

    async fn load_sheet(&self, bracket_id: Uuid) -> Result<BracketSheet> {
        let mut conn = self.pool.acquire().await?;
        read_sheet(&mut conn, bracket_id, false).await
    }

    async fn find_match(&self, match_id: Uuid) -> Result<Match> {
        let mut conn = self.pool.acquire().await?;
        MatchRepository::new(&mut conn).find_by_id(match_id).await
    }

    async fn update_bracket<T, F>(&self, bracket_id: Uuid, apply: F) -> Result<T>
    where
        F: FnOnce(&mut BracketSheet) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut tx = self.pool.begin().await?;
        let mut sheet = read_sheet(&mut tx, bracket_id, true).await?;
        let before = sheet.matches.clone();

        let output = apply(&mut sheet)?;

        if before.len() != sheet.matches.len() {
            return Err(StorageError::conflict(format!(
                "bracket {} gained or lost matches during an update",
                bracket_id
            )));
        }

        let mut matches = MatchRepository::new(&mut *tx);
        let mut written = 0;
        for (old, new) in before.iter().zip(&sheet.matches) {
            if old != new {
                matches.update(new).await?;
                written += 1;
            }
        }

        tx.commit().await?;
        debug!(bracket_id = %bracket_id, written, "Bracket updated");

        Ok(output)
    }

    async fn clear_bracket(&self, bracket_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        BracketRepository::new(&mut *tx).lock(bracket_id).await?;

        let matches = MatchRepository::new(&mut *tx)
            .delete_by_bracket(bracket_id)
            .await?;
        let mut brackets = BracketRepository::new(&mut *tx);
        let participants = brackets.delete_participants(bracket_id).await?;
        brackets.reset(bracket_id).await?;

        tx.commit().await?;
        info!(
            bracket_id = %bracket_id,
            matches,
            participants,
            "Bracket cleared"
        );

        Ok(())
    }

    async fn replace_official_results<F>(&self, event_id: Uuid, compute: F) -> Result<Vec<OfficialResult>>
    where
        F: FnOnce(&[BracketSheet]) -> Result<Vec<OfficialResult>> + Send + 'static,
    {
        let mut tx = self.pool.begin().await?;

        let brackets = BracketRepository::new(&mut *tx).list_by_event(event_id).await?;
        let mut sheets = Vec::with_capacity(brackets.len());
        for bracket in brackets.iter().filter(|b| b.is_generated) {
            sheets.push(read_sheet(&mut tx, bracket.bracket_id, true).await?);
        }

        let results = compute(&sheets)?;

        let mut repo = OfficialResultRepository::new(&mut *tx);
        let removed = repo.delete_by_event(event_id).await?;
        repo.insert_many(&results).await?;

        tx.commit().await?;
        debug!(
            event_id = %event_id,
            removed,
            inserted = results.len(),
            "Official results replaced"
        );

        Ok(results)
    }

    async fn list_official_results(&self, event_id: Uuid) -> Result<Vec<OfficialResult>> {
        let mut conn = self.pool.acquire().await?;
        OfficialResultRepository::new(&mut conn).list_by_event(event_id).await
    }
}
