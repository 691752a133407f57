use anyhow::{Context, Result};
use std::path::PathBuf;
use storage::classifier::BeltGroupTable;
use storage::models::FightPointsTable;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub max_connections: u32,
    pub fight_points_path: Option<PathBuf>,
    pub belt_groups_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive number")?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            max_connections,
            fight_points_path: std::env::var_os("FIGHT_POINTS_PATH").map(PathBuf::from),
            belt_groups_path: std::env::var_os("BELT_GROUPS_PATH").map(PathBuf::from),
        })
    }

    pub fn fight_points(&self) -> Result<FightPointsTable> {
        let Some(path) = &self.fight_points_path else {
            return Ok(FightPointsTable::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read fight points table {}", path.display()))?;
        FightPointsTable::from_json(&raw)
            .with_context(|| format!("Invalid fight points table {}", path.display()))
    }

    pub fn belt_groups(&self) -> Result<BeltGroupTable> {
        let Some(path) = &self.belt_groups_path else {
            return Ok(BeltGroupTable::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read belt group table {}", path.display()))?;
        BeltGroupTable::from_json(&raw)
            .with_context(|| format!("Invalid belt group table {}", path.display()))
    }
}
