use uuid::Uuid;

use crate::error::Result;
use crate::models::{Bracket, BracketSheet, Match, OfficialResult};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgCompetitionStore;

/// Persistence boundary of the competition engine.
///
/// Every mutating method is one unit of work: either all of its writes land or
/// none do.
#[async_trait::async_trait]
pub trait CompetitionStore: Send + Sync {
    /// Get-or-create each bracket row by grouping key, then store its participants
    /// and matches. Fails if any target bracket is already generated.
    async fn insert_generated_brackets(&self, sheets: Vec<BracketSheet>) -> Result<Vec<Bracket>>;

    async fn find_bracket(&self, bracket_id: Uuid) -> Result<Bracket>;

    async fn list_brackets(&self, event_id: Uuid) -> Result<Vec<Bracket>>;

    async fn load_sheet(&self, bracket_id: Uuid) -> Result<BracketSheet>;

    async fn find_match(&self, match_id: Uuid) -> Result<Match>;

    /// Runs `apply` over the bracket with its matches locked and persists the
    /// changed matches. Nothing is written when `apply` fails.
    async fn update_bracket<T, F>(&self, bracket_id: Uuid, apply: F) -> Result<T>
    where
        F: FnOnce(&mut BracketSheet) -> Result<T> + Send + 'static,
        T: Send + 'static;

    /// Drops a bracket's matches and participants so it can be generated again.
    async fn clear_bracket(&self, bracket_id: Uuid) -> Result<()>;

    /// Replaces the event's official results with what `compute` derives from
    /// every bracket sheet. Prior results survive if `compute` fails.
    async fn replace_official_results<F>(&self, event_id: Uuid, compute: F) -> Result<Vec<OfficialResult>>
    where
        F: FnOnce(&[BracketSheet]) -> Result<Vec<OfficialResult>> + Send + 'static;

    async fn list_official_results(&self, event_id: Uuid) -> Result<Vec<OfficialResult>>;
}
