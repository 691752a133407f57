use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::CompetitionStore;
use crate::error::{Result, StorageError};
use crate::models::{Bracket, BracketSheet, Match, OfficialResult};

#[derive(Debug, Default, Clone)]
struct Tables {
    sheets: HashMap<Uuid, BracketSheet>,
    official_results: Vec<OfficialResult>,
}

impl Tables {
    fn sheet(&self, bracket_id: Uuid) -> Result<&BracketSheet> {
        self.sheets
            .get(&bracket_id)
            .ok_or_else(|| StorageError::NotFound(format!("bracket {}", bracket_id)))
    }

    fn event_sheets(&self, event_id: Uuid) -> Vec<&BracketSheet> {
        let mut sheets: Vec<&BracketSheet> = self
            .sheets
            .values()
            .filter(|s| s.bracket.event_id == event_id)
            .collect();
        sheets.sort_by(|a, b| a.bracket.grouping_key().cmp(&b.bracket.grouping_key()));
        sheets
    }
}

/// `CompetitionStore` held in process memory.
///
/// Units of work run against a copy of the tables that replaces the original only
/// on success, so a failed call leaves nothing behind.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CompetitionStore for MemoryStore {
    async fn insert_generated_brackets(&self, sheets: Vec<BracketSheet>) -> Result<Vec<Bracket>> {
        let mut tables = self.tables.lock().await;
        let mut staged = tables.clone();
        let mut stored = Vec::with_capacity(sheets.len());

        for mut sheet in sheets {
            let key = sheet.bracket.grouping_key();
            let existing = staged
                .sheets
                .values()
                .find(|s| s.bracket.grouping_key() == key)
                .map(|s| s.bracket.clone());

            if let Some(existing) = existing {
                if existing.is_generated {
                    return Err(StorageError::validation(format!(
                        "bracket {} is already generated, clear it first",
                        key
                    )));
                }
                sheet.rebind(existing);
            }

            stored.push(sheet.bracket.clone());
            staged.sheets.insert(sheet.bracket_id(), sheet);
        }

        *tables = staged;
        Ok(stored)
    }

    async fn find_bracket(&self, bracket_id: Uuid) -> Result<Bracket> {
        let tables = self.tables.lock().await;
        Ok(tables.sheet(bracket_id)?.bracket.clone())
    }

    async fn list_brackets(&self, event_id: Uuid) -> Result<Vec<Bracket>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .event_sheets(event_id)
            .into_iter()
            .map(|s| s.bracket.clone())
            .collect())
    }

    async fn load_sheet(&self, bracket_id: Uuid) -> Result<BracketSheet> {
        let tables = self.tables.lock().await;
        tables.sheet(bracket_id).cloned()
    }

    async fn find_match(&self, match_id: Uuid) -> Result<Match> {
        let tables = self.tables.lock().await;
        tables
            .sheets
            .values()
            .flat_map(|s| s.matches.iter())
            .find(|m| m.match_id == match_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("match {}", match_id)))
    }

    async fn update_bracket<T, F>(&self, bracket_id: Uuid, apply: F) -> Result<T>
    where
        F: FnOnce(&mut BracketSheet) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut tables = self.tables.lock().await;
        let mut sheet = tables.sheet(bracket_id)?.clone();
        let count = sheet.matches.len();

        let output = apply(&mut sheet)?;

        if sheet.matches.len() != count {
            return Err(StorageError::conflict(format!(
                "bracket {} gained or lost matches during an update",
                bracket_id
            )));
        }

        tables.sheets.insert(bracket_id, sheet);
        Ok(output)
    }

    async fn clear_bracket(&self, bracket_id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let sheet = tables
            .sheets
            .get_mut(&bracket_id)
            .ok_or_else(|| StorageError::NotFound(format!("bracket {}", bracket_id)))?;

        sheet.matches.clear();
        sheet.participants.clear();
        sheet.bracket.is_generated = false;
        Ok(())
    }

    async fn replace_official_results<F>(&self, event_id: Uuid, compute: F) -> Result<Vec<OfficialResult>>
    where
        F: FnOnce(&[BracketSheet]) -> Result<Vec<OfficialResult>> + Send + 'static,
    {
        let mut tables = self.tables.lock().await;
        let sheets: Vec<BracketSheet> = tables
            .event_sheets(event_id)
            .into_iter()
            .filter(|s| s.bracket.is_generated)
            .cloned()
            .collect();

        let results = compute(&sheets)?;

        tables.official_results.retain(|r| r.event_id != event_id);
        tables.official_results.extend(results.iter().cloned());
        Ok(results)
    }

    async fn list_official_results(&self, event_id: Uuid) -> Result<Vec<OfficialResult>> {
        let tables = self.tables.lock().await;
        let mut results: Vec<OfficialResult> = tables
            .official_results
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            (&a.category_code, a.placement, a.athlete_id).cmp(&(&b.category_code, b.placement, b.athlete_id))
        });
        Ok(results)
    }
}
