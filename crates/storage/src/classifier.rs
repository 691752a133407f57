use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, StorageError};

/// Maps a registrant's class, sex and belt to the belt group they compete in.
pub trait BeltGroupClassifier: Send + Sync {
    fn resolve_belt_group(&self, class_code: &str, sex: &str, belt: &str) -> Option<i16>;

    /// Groups a class may be split into. Empty means the class is not restricted.
    fn allowed_groups(&self, class_code: &str) -> BTreeSet<i16>;
}

/// One belt range of one group, for a set of classes and optionally one sex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeltGroupRule {
    pub group: i16,
    pub classes: Vec<String>,
    #[serde(default)]
    pub sexes: Option<Vec<String>>,
    pub min_belt: String,
    pub max_belt: String,
}

/// Table-driven classifier. Rules are tried in order; the first whose class, sex
/// and belt range match decides the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeltGroupTable {
    pub belt_order: Vec<String>,
    #[serde(default)]
    pub class_aliases: BTreeMap<String, String>,
    pub rules: Vec<BeltGroupRule>,
}

impl BeltGroupTable {
    pub fn from_json(raw: &str) -> Result<Self> {
        let table: BeltGroupTable = serde_json::from_str(raw)?;
        table.check()?;
        Ok(table)
    }

    fn check(&self) -> Result<()> {
        for rule in &self.rules {
            for belt in [&rule.min_belt, &rule.max_belt] {
                if self.belt_rank(belt).is_none() {
                    return Err(StorageError::validation(format!(
                        "belt group {} references unknown belt '{}'",
                        rule.group, belt
                    )));
                }
            }
        }
        Ok(())
    }

    fn belt_rank(&self, belt: &str) -> Option<usize> {
        let belt = normalize_belt(belt)?;
        self.belt_order
            .iter()
            .position(|b| normalize_belt(b).as_deref() == Some(belt.as_str()))
    }

    fn canonical_class(&self, class_code: &str) -> Option<String> {
        let class = class_code.trim().to_uppercase();
        if class.is_empty() {
            return None;
        }
        Some(self.class_aliases.get(&class).cloned().unwrap_or(class))
    }
}

fn normalize_belt(belt: &str) -> Option<String> {
    let belt = belt.trim().to_uppercase().replace(['.', ' '], "_");
    if belt.is_empty() { None } else { Some(belt) }
}

impl BeltGroupClassifier for BeltGroupTable {
    fn resolve_belt_group(&self, class_code: &str, sex: &str, belt: &str) -> Option<i16> {
        let rank = self.belt_rank(belt)?;
        let class = self.canonical_class(class_code)?;
        let sex = sex.trim().to_uppercase();
        if sex.is_empty() {
            return None;
        }

        self.rules
            .iter()
            .filter(|rule| rule.classes.iter().any(|c| *c == class))
            .filter(|rule| {
                rule.sexes
                    .as_ref()
                    .is_none_or(|sexes| sexes.iter().any(|s| s.eq_ignore_ascii_case(&sex)))
            })
            .find(|rule| {
                match (self.belt_rank(&rule.min_belt), self.belt_rank(&rule.max_belt)) {
                    (Some(min), Some(max)) => (min..=max).contains(&rank),
                    _ => false,
                }
            })
            .map(|rule| rule.group)
    }

    fn allowed_groups(&self, class_code: &str) -> BTreeSet<i16> {
        let Some(class) = self.canonical_class(class_code) else {
            return BTreeSet::new();
        };

        self.rules
            .iter()
            .filter(|rule| rule.classes.iter().any(|c| *c == class))
            .map(|rule| rule.group)
            .collect()
    }
}

impl Default for BeltGroupTable {
    /// The federation's youth and adult groups 1 through 8.
    fn default() -> Self {
        let belt_order = [
            "BRANCA", "P_CINZA", "CINZA", "P_AZUL", "AZUL", "P_AMARELA", "AMARELA", "P_LARANJA",
            "LARANJA", "VERDE", "ROXA", "MARROM", "PRETA",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let class_aliases = [
            ("FESTIVAL", "AULAO"),
            ("CHUPETINHA", "AULAO"),
            ("ADULTO", "SENIOR"),
            ("SÊNIOR", "SENIOR"),
            ("MASTER", "VETERANO"),
        ]
        .into_iter()
        .map(|(alias, class)| (alias.to_string(), class.to_string()))
        .collect();

        let kids = ["SUB-9", "SUB-10", "SUB-11"];
        let adults = ["SUB-18", "SUB-21", "SENIOR", "VETERANO"];
        fn rule(group: i16, classes: &[&str], sex: Option<&str>, min: &str, max: &str) -> BeltGroupRule {
            BeltGroupRule {
                group,
                classes: classes.iter().map(|c| c.to_string()).collect(),
                sexes: sex.map(|s| vec![s.to_string()]),
                min_belt: min.to_string(),
                max_belt: max.to_string(),
            }
        }

        let rules = vec![
            rule(1, &kids, None, "BRANCA", "P_AZUL"),
            rule(2, &kids, None, "AZUL", "P_LARANJA"),
            rule(1, &["AULAO"], None, "BRANCA", "P_AZUL"),
            rule(3, &["SUB-13"], None, "BRANCA", "AZUL"),
            rule(4, &["SUB-13"], None, "P_AMARELA", "LARANJA"),
            rule(5, &["SUB-15"], None, "BRANCA", "P_AMARELA"),
            rule(6, &["SUB-15"], None, "AMARELA", "VERDE"),
            rule(7, &adults, Some("F"), "BRANCA", "LARANJA"),
            rule(7, &adults, Some("M"), "BRANCA", "VERDE"),
            rule(8, &adults, Some("F"), "VERDE", "PRETA"),
            rule(8, &adults, Some("M"), "ROXA", "PRETA"),
        ];

        Self {
            belt_order,
            class_aliases,
            rules,
        }
    }
}
