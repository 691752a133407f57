use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::advancement::AdvancementEngine;
use super::bracket_builder::BracketBuilder;
use super::match_registry::MatchRegistry;
use super::projection::{BracketProjection, recompute_bracket_projection};
use super::results_aggregator::aggregate_event;
use super::standings::{StandingRow, compute_standings};
use crate::classifier::{BeltGroupClassifier, BeltGroupTable};
use crate::dto::{GenerateBracketsRequest, RecordResultRequest, VoidMatchRequest};
use crate::error::{Result, StorageError};
use crate::models::{Bracket, FightPointsTable, GroupingKey, Match, OfficialResult, Participant};
use crate::store::CompetitionStore;

/// The operation surface officials drive: generation, results, standings and
/// official results, over any `CompetitionStore`.
pub struct CompetitionService<S> {
    store: S,
    registry: MatchRegistry,
    builder: BracketBuilder,
    engine: AdvancementEngine,
    classifier: Arc<dyn BeltGroupClassifier>,
}

impl<S: CompetitionStore> CompetitionService<S> {
    pub fn new(
        store: S,
        fight_points: FightPointsTable,
        classifier: Arc<dyn BeltGroupClassifier>,
    ) -> Self {
        let engine = AdvancementEngine::new();
        Self {
            store,
            registry: MatchRegistry::new(fight_points),
            builder: BracketBuilder::new(engine),
            engine,
            classifier,
        }
    }

    /// Canonical fight points and the default belt-group table.
    pub fn with_defaults(store: S) -> Self {
        Self::new(
            store,
            FightPointsTable::default(),
            Arc::new(BeltGroupTable::default()),
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Splits every entry group by belt group and generates one bracket per
    /// grouping key. All brackets are stored or none are.
    pub async fn generate_brackets(
        &self,
        event_id: Uuid,
        request: GenerateBracketsRequest,
    ) -> Result<Vec<Bracket>> {
        request.validate()?;

        let mut entry_keys = HashSet::new();
        let mut grouped: BTreeMap<GroupingKey, Vec<Participant>> = BTreeMap::new();

        for group in &request.groups {
            let sex = group.sex.trim().to_uppercase();
            if !entry_keys.insert((group.category_code.clone(), group.class_code.clone(), sex.clone())) {
                return Err(StorageError::conflict(format!(
                    "entry group {}/{}/{} appears more than once",
                    group.category_code, group.class_code, sex
                )));
            }

            let allowed = self.classifier.allowed_groups(&group.class_code);

            for (position, registrant) in group.registrants.iter().enumerate() {
                let belt_group =
                    self.classifier
                        .resolve_belt_group(&group.class_code, &sex, &registrant.belt);

                let Some(belt_group) = belt_group else {
                    warn!(
                        athlete_id = %registrant.athlete_id,
                        class_code = %group.class_code,
                        belt = %registrant.belt,
                        "No belt group for registrant, skipped"
                    );
                    continue;
                };

                if !allowed.is_empty() && !allowed.contains(&belt_group) {
                    warn!(
                        athlete_id = %registrant.athlete_id,
                        class_code = %group.class_code,
                        belt_group,
                        "Belt group not allowed for class, skipped"
                    );
                    continue;
                }

                let key = GroupingKey {
                    event_id,
                    category_code: group.category_code.clone(),
                    class_code: group.class_code.clone(),
                    sex: sex.clone(),
                    belt_group: Some(belt_group),
                };

                let participants = grouped.entry(key).or_default();
                if participants
                    .iter()
                    .any(|p| p.athlete_id == registrant.athlete_id)
                {
                    return Err(StorageError::conflict(format!(
                        "athlete {} registered twice in {}",
                        registrant.athlete_id, group.category_code
                    )));
                }

                participants.push(Participant {
                    athlete_id: registrant.athlete_id,
                    organization_id: registrant.organization_id,
                    seed: registrant.seed.unwrap_or(position as i32 + 1),
                });
            }
        }

        let mut sheets = Vec::with_capacity(grouped.len());
        for (key, participants) in grouped {
            let override_format = request.format_overrides.get(&key.category_code).copied();
            sheets.push(self.builder.build(&key, override_format, participants)?);
        }

        let brackets = self.store.insert_generated_brackets(sheets).await?;
        info!(
            event_id = %event_id,
            brackets = brackets.len(),
            "Brackets generated"
        );

        Ok(brackets)
    }

    /// Records a result and advances everyone it moves, in one unit of work.
    pub async fn record_match_result(
        &self,
        match_id: Uuid,
        request: RecordResultRequest,
    ) -> Result<Match> {
        request.validate()?;

        let bout = self.store.find_match(match_id).await?;
        let registry = self.registry.clone();
        let engine = self.engine;

        self.store
            .update_bracket(bout.bracket_id, move |sheet| {
                let idx = sheet.require_position(match_id)?;
                registry.record_result(
                    &mut sheet.matches[idx],
                    request.winner,
                    request.win_method,
                    request.officiant,
                    request.notes.as_deref(),
                )?;
                engine.advance(sheet, match_id)?;
                Ok(sheet.matches[idx].clone())
            })
            .await
    }

    pub async fn void_match(&self, match_id: Uuid, request: VoidMatchRequest) -> Result<Match> {
        request.validate()?;

        let bout = self.store.find_match(match_id).await?;
        let registry = self.registry.clone();
        let engine = self.engine;

        self.store
            .update_bracket(bout.bracket_id, move |sheet| {
                let idx = sheet.require_position(match_id)?;
                registry.void_match(&mut sheet.matches[idx], &request.reason, request.officiant)?;
                engine.advance(sheet, match_id)?;
                Ok(sheet.matches[idx].clone())
            })
            .await
    }

    pub async fn compute_standings(&self, bracket_id: Uuid) -> Result<Vec<StandingRow>> {
        let sheet = self.store.load_sheet(bracket_id).await?;
        compute_standings(&sheet)
    }

    /// Rewrites the event's official results; returns how many were written.
    pub async fn generate_official_results(&self, event_id: Uuid) -> Result<usize> {
        let results = self
            .store
            .replace_official_results(event_id, move |sheets| aggregate_event(event_id, sheets))
            .await?;

        Ok(results.len())
    }

    pub async fn official_results(&self, event_id: Uuid) -> Result<Vec<OfficialResult>> {
        self.store.list_official_results(event_id).await
    }

    pub async fn brackets(&self, event_id: Uuid) -> Result<Vec<Bracket>> {
        self.store.list_brackets(event_id).await
    }

    pub async fn clear_bracket(&self, bracket_id: Uuid) -> Result<()> {
        self.store.clear_bracket(bracket_id).await?;
        info!(bracket_id = %bracket_id, "Bracket cleared for regeneration");
        Ok(())
    }

    /// Read-only replay of the bracket's recorded results.
    pub async fn bracket_projection(&self, bracket_id: Uuid) -> Result<BracketProjection> {
        let sheet = self.store.load_sheet(bracket_id).await?;
        let projection = recompute_bracket_projection(&sheet);

        if !projection.is_consistent() {
            warn!(
                bracket_id = %bracket_id,
                drift = projection.drift.len(),
                "Bracket slots drift from recorded results"
            );
        }

        Ok(projection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{EntryGroup, Registrant};
    use crate::models::{BracketFormat, MatchPhase, MatchStatus, WinMethod};
    use crate::store::MemoryStore;
    use std::collections::HashMap;

    fn registrants(n: usize, belt: &str) -> Vec<Registrant> {
        (0..n)
            .map(|_| Registrant {
                athlete_id: Uuid::new_v4(),
                organization_id: Uuid::new_v4(),
                seed: None,
                belt: belt.to_string(),
            })
            .collect()
    }

    fn request(groups: Vec<EntryGroup>) -> GenerateBracketsRequest {
        GenerateBracketsRequest {
            groups,
            format_overrides: HashMap::new(),
        }
    }

    fn entry(category: &str, class: &str, registrants: Vec<Registrant>) -> EntryGroup {
        EntryGroup {
            category_code: category.to_string(),
            class_code: class.to_string(),
            sex: "m".to_string(),
            registrants,
        }
    }

    #[tokio::test]
    async fn test_entry_group_splits_by_belt_group() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let mut people = registrants(3, "BRANCA");
        people.extend(registrants(2, "VERDE"));

        let brackets = service
            .generate_brackets(Uuid::new_v4(), request(vec![entry("M-55", "SUB-15", people)]))
            .await
            .unwrap();

        let mut formats: Vec<(Option<i16>, BracketFormat)> =
            brackets.iter().map(|b| (b.belt_group, b.format)).collect();
        formats.sort_by_key(|(g, _)| *g);
        assert_eq!(
            formats,
            vec![
                (Some(5), BracketFormat::RoundRobin),
                (Some(6), BracketFormat::BestOfThree)
            ]
        );
        assert!(brackets.iter().all(|b| b.is_generated && b.sex == "M"));
    }

    #[tokio::test]
    async fn test_unclassifiable_registrants_are_skipped() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let mut people = registrants(2, "AZUL");
        people.extend(registrants(1, ""));

        let brackets = service
            .generate_brackets(Uuid::new_v4(), request(vec![entry("M-40", "SUB-13", people)]))
            .await
            .unwrap();

        assert_eq!(brackets.len(), 1);
        let sheet = service.store().load_sheet(brackets[0].bracket_id).await.unwrap();
        assert_eq!(sheet.participants.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_entry_group_conflicts() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let groups = vec![
            entry("M-66", "SENIOR", registrants(2, "PRETA")),
            entry("M-66", "SENIOR", registrants(2, "PRETA")),
        ];

        let err = service
            .generate_brackets(Uuid::new_v4(), request(groups))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_regeneration_requires_clear() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let event_id = Uuid::new_v4();
        let people = registrants(4, "PRETA");

        let first = service
            .generate_brackets(event_id, request(vec![entry("M-90", "SENIOR", people.clone())]))
            .await
            .unwrap();

        let err = service
            .generate_brackets(event_id, request(vec![entry("M-90", "SENIOR", people.clone())]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));

        service.clear_bracket(first[0].bracket_id).await.unwrap();
        let second = service
            .generate_brackets(event_id, request(vec![entry("M-90", "SENIOR", people)]))
            .await
            .unwrap();
        assert_eq!(second[0].bracket_id, first[0].bracket_id);
    }

    #[tokio::test]
    async fn test_failed_record_leaves_bracket_untouched() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let brackets = service
            .generate_brackets(
                Uuid::new_v4(),
                request(vec![entry("M-100", "SENIOR", registrants(3, "ROXA"))]),
            )
            .await
            .unwrap();
        let before = service.store().load_sheet(brackets[0].bracket_id).await.unwrap();
        let match_id = before.matches[0].match_id;

        let err = service
            .record_match_result(
                match_id,
                RecordResultRequest {
                    winner: Some(Uuid::new_v4()),
                    win_method: Some(WinMethod::Ippon),
                    officiant: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));

        let after = service.store().load_sheet(brackets[0].bracket_id).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_void_then_record_is_rejected() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let brackets = service
            .generate_brackets(
                Uuid::new_v4(),
                request(vec![entry("M-100", "SENIOR", registrants(3, "ROXA"))]),
            )
            .await
            .unwrap();
        let sheet = service.store().load_sheet(brackets[0].bracket_id).await.unwrap();
        let bout = sheet.matches[0].clone();

        let voided = service
            .void_match(
                bout.match_id,
                VoidMatchRequest {
                    reason: "both absent".to_string(),
                    officiant: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(voided.status, MatchStatus::Walkover);

        let err = service
            .record_match_result(
                bout.match_id,
                RecordResultRequest {
                    winner: bout.blue_athlete_id,
                    win_method: Some(WinMethod::Ippon),
                    officiant: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_match_is_not_found() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let err = service
            .void_match(
                Uuid::new_v4(),
                VoidMatchRequest {
                    reason: "no show".to_string(),
                    officiant: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    fn ippon(winner: Option<Uuid>) -> RecordResultRequest {
        RecordResultRequest {
            winner,
            win_method: Some(WinMethod::Ippon),
            officiant: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_semifinal_waits_for_its_feeder() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let brackets = service
            .generate_brackets(
                Uuid::new_v4(),
                request(vec![entry("M-73", "SENIOR", registrants(6, "PRETA"))]),
            )
            .await
            .unwrap();
        let bracket_id = brackets[0].bracket_id;
        let sheet = service.store().load_sheet(bracket_id).await.unwrap();

        let semi = sheet.main_position(2, 1).map(|i| sheet.matches[i].clone()).unwrap();
        let feeder = sheet.main_position(1, 2).map(|i| sheet.matches[i].clone()).unwrap();
        assert_eq!(semi.phase, MatchPhase::Main);
        assert!(semi.blue_athlete_id.is_some());
        assert_eq!(semi.white_athlete_id, None);

        let err = service
            .record_match_result(semi.match_id, ippon(semi.blue_athlete_id))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));

        service
            .record_match_result(feeder.match_id, ippon(feeder.white_athlete_id))
            .await
            .unwrap();

        let semi = service.store().find_match(semi.match_id).await.unwrap();
        assert_eq!(semi.status, MatchStatus::Scheduled);
        assert_eq!(semi.white_athlete_id, feeder.white_athlete_id);
    }

    #[tokio::test]
    async fn test_finished_match_cannot_be_voided() {
        let service = CompetitionService::with_defaults(MemoryStore::new());
        let brackets = service
            .generate_brackets(
                Uuid::new_v4(),
                request(vec![entry("M-81", "SENIOR", registrants(3, "ROXA"))]),
            )
            .await
            .unwrap();
        let sheet = service.store().load_sheet(brackets[0].bracket_id).await.unwrap();
        let bout = sheet.matches[0].clone();

        let recorded = service
            .record_match_result(
                bout.match_id,
                RecordResultRequest {
                    notes: Some("golden score".to_string()),
                    ..ippon(bout.white_athlete_id)
                },
            )
            .await
            .unwrap();

        let err = service
            .void_match(
                bout.match_id,
                VoidMatchRequest {
                    reason: "protest".to_string(),
                    officiant: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));

        let stored = service.store().find_match(bout.match_id).await.unwrap();
        assert_eq!(stored, recorded);
        assert_eq!(stored.winner_athlete_id, bout.white_athlete_id);
        assert_eq!(stored.notes, "golden score");
    }
}
