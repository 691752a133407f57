use std::collections::HashMap;
use storage::dto::{EntryGroup, GenerateBracketsRequest, RecordResultRequest, Registrant};
use storage::models::{BracketFormat, MatchPhase, MatchStatus, WinMethod};
use storage::{CompetitionService, CompetitionStore, MemoryStore, StorageError};
use uuid::Uuid;

fn entry(category: &str, belt: &str, n: usize) -> EntryGroup {
    EntryGroup {
        category_code: category.to_string(),
        class_code: "SENIOR".to_string(),
        sex: "F".to_string(),
        registrants: (1..=n)
            .map(|seed| Registrant {
                athlete_id: Uuid::new_v4(),
                organization_id: Uuid::new_v4(),
                seed: Some(seed as i32),
                belt: belt.to_string(),
            })
            .collect(),
    }
}

/// Plays every contestable match until the bracket is done; white always wins.
async fn resolve_all(service: &CompetitionService<MemoryStore>, bracket_id: Uuid) {
    loop {
        let sheet = service.store().load_sheet(bracket_id).await.unwrap();
        let next = sheet
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Scheduled && m.contestants().count() == 2)
            .min_by_key(|m| (m.round_number, m.match_number))
            .cloned();
        let Some(bout) = next else { break };

        service
            .record_match_result(
                bout.match_id,
                RecordResultRequest {
                    winner: bout.white_athlete_id,
                    win_method: Some(WinMethod::WazaAri),
                    officiant: Some(Uuid::new_v4()),
                    notes: None,
                },
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_six_athletes_end_to_end() {
    let service = CompetitionService::with_defaults(MemoryStore::new());
    let event_id = Uuid::new_v4();

    let brackets = service
        .generate_brackets(
            event_id,
            GenerateBracketsRequest {
                groups: vec![entry("F-57", "PRETA", 6)],
                format_overrides: HashMap::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(brackets.len(), 1);
    assert_eq!(brackets[0].format, BracketFormat::EliminationWithRepechage);
    assert_eq!(brackets[0].belt_group, Some(8));

    let bracket_id = brackets[0].bracket_id;
    let sheet = service.store().load_sheet(bracket_id).await.unwrap();
    let main: Vec<_> = sheet
        .matches
        .iter()
        .filter(|m| m.phase.is_main_tree())
        .collect();
    assert_eq!(main.len(), 7);
    assert_eq!(main.iter().map(|m| m.round_number).max(), Some(3));
    assert_eq!(
        main.iter()
            .filter(|m| m.round_number == 1 && m.status == MatchStatus::Walkover)
            .count(),
        2
    );
    assert!(sheet.in_phase(MatchPhase::Repechage).count() >= 2);
    assert_eq!(sheet.in_phase(MatchPhase::Bronze).count(), 2);

    let err = service.generate_official_results(event_id).await.unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));

    resolve_all(&service, bracket_id).await;

    let written = service.generate_official_results(event_id).await.unwrap();
    assert_eq!(written, 4);

    let results = service.official_results(event_id).await.unwrap();
    let placements: Vec<i32> = results.iter().map(|r| r.placement).collect();
    assert_eq!(placements, vec![1, 2, 3, 4]);
    assert!(results.iter().all(|r| r.category_code == "F-57"));

    let projection = service.bracket_projection(bracket_id).await.unwrap();
    assert!(projection.is_consistent(), "{:?}", projection.drift);
}

#[tokio::test]
async fn test_official_results_are_replaced_on_rerun() {
    let service = CompetitionService::with_defaults(MemoryStore::new());
    let event_id = Uuid::new_v4();

    let brackets = service
        .generate_brackets(
            event_id,
            GenerateBracketsRequest {
                groups: vec![entry("F-63", "ROXA", 4), entry("F-70", "ROXA", 1)],
                format_overrides: HashMap::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(brackets.len(), 2);

    for bracket in &brackets {
        resolve_all(&service, bracket.bracket_id).await;
    }

    let first = service.generate_official_results(event_id).await.unwrap();
    let second = service.generate_official_results(event_id).await.unwrap();
    assert_eq!(first, 5);
    assert_eq!(second, 5);
    assert_eq!(service.official_results(event_id).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_format_override_applies_per_category() {
    let service = CompetitionService::with_defaults(MemoryStore::new());
    let event_id = Uuid::new_v4();

    let mut format_overrides = HashMap::new();
    format_overrides.insert("F-78".to_string(), BracketFormat::SingleElimination);

    let brackets = service
        .generate_brackets(
            event_id,
            GenerateBracketsRequest {
                groups: vec![entry("F-78", "MARROM", 5), entry("F+78", "MARROM", 5)],
                format_overrides,
            },
        )
        .await
        .unwrap();

    let format_of = |category: &str| {
        brackets
            .iter()
            .find(|b| b.category_code == category)
            .map(|b| b.format)
    };
    assert_eq!(format_of("F-78"), Some(BracketFormat::SingleElimination));
    assert_eq!(format_of("F+78"), Some(BracketFormat::RoundRobin));

    let bracket_id = brackets
        .iter()
        .find(|b| b.category_code == "F+78")
        .map(|b| b.bracket_id)
        .unwrap();
    resolve_all(&service, bracket_id).await;
    let standings = service.compute_standings(bracket_id).await.unwrap();
    assert_eq!(standings.len(), 5);
    assert_eq!(standings.iter().map(|r| r.wins).sum::<u32>(), 10);

    let knockout = brackets
        .iter()
        .find(|b| b.category_code == "F-78")
        .map(|b| b.bracket_id)
        .unwrap();
    let err = service.compute_standings(knockout).await.unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));
}

#[tokio::test]
async fn test_store_lists_generated_brackets() {
    let store = MemoryStore::new();
    let service = CompetitionService::with_defaults(store);
    let event_id = Uuid::new_v4();

    service
        .generate_brackets(
            event_id,
            GenerateBracketsRequest {
                groups: vec![entry("F-48", "BRANCA", 3)],
                format_overrides: HashMap::new(),
            },
        )
        .await
        .unwrap();

    let listed = service.store().list_brackets(event_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].belt_group, Some(7));
    assert!(service.store().list_brackets(Uuid::new_v4()).await.unwrap().is_empty());
}
