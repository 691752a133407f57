use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::WinMethod;
use crate::error::Result;

/// Points awarded to each side of a bout for one win method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FightPoints {
    pub winner: i32,
    #[serde(default)]
    pub loser: i32,
}

/// Win method → fight points lookup, injected wherever results are scored.
///
/// The canonical table is IPPON 10, WAZA_ARI 7, YUKO 5, HANSOKUMAKE 3, WO 1,
/// with the loser always scoring 0. A method missing from a loaded table
/// scores nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FightPointsTable {
    entries: BTreeMap<WinMethod, FightPoints>,
}

impl FightPointsTable {
    pub fn new(entries: BTreeMap<WinMethod, FightPoints>) -> Self {
        Self { entries }
    }

    /// Parses a JSON object such as `{"IPPON": {"winner": 10}, "WO": {"winner": 1}}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn points_for(&self, method: WinMethod) -> FightPoints {
        self.entries.get(&method).copied().unwrap_or_default()
    }
}

impl Default for FightPointsTable {
    fn default() -> Self {
        let entries = [
            (WinMethod::Ippon, 10),
            (WinMethod::WazaAri, 7),
            (WinMethod::Yuko, 5),
            (WinMethod::Hansokumake, 3),
            (WinMethod::Wo, 1),
        ]
        .into_iter()
        .map(|(method, winner)| (method, FightPoints { winner, loser: 0 }))
        .collect();

        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_table() {
        let table = FightPointsTable::default();
        assert_eq!(table.points_for(WinMethod::Ippon).winner, 10);
        assert_eq!(table.points_for(WinMethod::WazaAri).winner, 7);
        assert_eq!(table.points_for(WinMethod::Yuko).winner, 5);
        assert_eq!(table.points_for(WinMethod::Hansokumake).winner, 3);
        assert_eq!(table.points_for(WinMethod::Wo).winner, 1);
        assert_eq!(table.points_for(WinMethod::Ippon).loser, 0);
    }

    #[test]
    fn test_loaded_table_overrides_values() {
        let table =
            FightPointsTable::from_json(r#"{"IPPON": {"winner": 100, "loser": 1}, "YUKO": {"winner": 1}}"#)
                .unwrap();

        assert_eq!(table.points_for(WinMethod::Ippon), FightPoints { winner: 100, loser: 1 });
        assert_eq!(table.points_for(WinMethod::Yuko).winner, 1);
        assert_eq!(table.points_for(WinMethod::Wo), FightPoints::default());
    }
}
