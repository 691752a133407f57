use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod classifier;
pub mod dto;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;

pub use error::{Result, StorageError};
pub use services::competition::CompetitionService;
pub use store::{CompetitionStore, MemoryStore, PgCompetitionStore};

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// A store sharing this database's pool.
    pub fn competition_store(&self) -> PgCompetitionStore {
        PgCompetitionStore::new(self.pool.clone())
    }
}
