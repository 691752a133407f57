use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

use super::standings::compute_standings;
use crate::error::{Result, StorageError};
use crate::models::{BracketFormat, BracketSheet, MatchPhase, MatchStatus, OfficialResult, WinMethod};

/// Final position of one athlete within one bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub athlete_id: Uuid,
    pub placement: i32,
}

/// Fight points per athlete, FINISHED matches only.
pub fn fight_point_totals(sheet: &BracketSheet) -> HashMap<Uuid, i32> {
    let mut totals: HashMap<Uuid, i32> = HashMap::new();

    for m in sheet
        .matches
        .iter()
        .filter(|m| m.status == MatchStatus::Finished)
    {
        if let Some(winner) = m.winner_athlete_id {
            *totals.entry(winner).or_default() += m.fight_points_winner;
        }
        if let Some(loser) = m.loser() {
            *totals.entry(loser).or_default() += m.fight_points_loser;
        }
    }

    totals
}

/// Placements of a fully terminal bracket.
pub fn bracket_placements(sheet: &BracketSheet) -> Result<Vec<Placement>> {
    if !sheet.is_complete() {
        return Err(StorageError::validation(format!(
            "bracket {} has {} pending matches",
            sheet.bracket_id(),
            sheet.pending_count()
        )));
    }

    if sheet.matches.is_empty() {
        return Ok(sheet
            .participants
            .iter()
            .take(1)
            .map(|p| Placement {
                athlete_id: p.athlete_id,
                placement: 1,
            })
            .collect());
    }

    match sheet.bracket.format {
        BracketFormat::RoundRobin => Ok(compute_standings(sheet)?
            .into_iter()
            .enumerate()
            .map(|(i, row)| Placement {
                athlete_id: row.athlete_id,
                placement: i as i32 + 1,
            })
            .collect()),
        BracketFormat::BestOfThree => Ok(best_of_three_placements(sheet)),
        BracketFormat::SingleElimination | BracketFormat::EliminationWithRepechage => {
            Ok(knockout_placements(sheet))
        }
    }
}

fn best_of_three_placements(sheet: &BracketSheet) -> Vec<Placement> {
    // (non-YUKO wins, wins, fight points)
    let mut tally: HashMap<Uuid, (u32, u32, i32)> = sheet
        .participants
        .iter()
        .map(|p| (p.athlete_id, (0, 0, 0)))
        .collect();
    let totals = fight_point_totals(sheet);

    for m in sheet.matches.iter().filter(|m| m.is_terminal()) {
        if let Some(winner) = m.winner_athlete_id {
            let entry = tally.entry(winner).or_default();
            entry.1 += 1;
            if m.win_method != Some(WinMethod::Yuko) {
                entry.0 += 1;
            }
        }
    }
    for (athlete_id, entry) in tally.iter_mut() {
        entry.2 = totals.get(athlete_id).copied().unwrap_or(0);
    }

    let mut ranked: Vec<(Uuid, (u32, u32, i32))> = tally.into_iter().collect();
    ranked.sort_by(|(a_id, a), (b_id, b)| b.cmp(a).then(a_id.cmp(b_id)));

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (athlete_id, _))| Placement {
            athlete_id,
            placement: i as i32 + 1,
        })
        .collect()
}

fn knockout_placements(sheet: &BracketSheet) -> Vec<Placement> {
    let mut placed = Vec::new();
    let mut seen = HashSet::new();
    let mut place = |athlete_id: Option<Uuid>, placement: i32| {
        if let Some(athlete_id) = athlete_id {
            if seen.insert(athlete_id) {
                placed.push(Placement {
                    athlete_id,
                    placement,
                });
            }
        }
    };

    if let Some(final_match) = sheet.final_match() {
        place(final_match.winner_athlete_id, 1);
        place(final_match.loser(), 2);
    }

    let semifinals = sheet.semifinals();
    let bronzes: Vec<_> = sheet.in_phase(MatchPhase::Bronze).collect();

    if bronzes.is_empty() {
        for semi in &semifinals {
            place(semi.loser(), 3);
        }
    } else {
        for (side, semi) in semifinals.iter().enumerate() {
            let number = side as i16 + 1;
            let athlete = match bronzes.iter().find(|b| b.match_number == number) {
                Some(bronze) => bronze.winner_athlete_id,
                None => semi.loser(),
            };
            place(athlete, 3 + side as i32);
        }
    }

    placed
}

/// Every official result of an event; fails while any match is still scheduled.
pub fn aggregate_event(event_id: Uuid, sheets: &[BracketSheet]) -> Result<Vec<OfficialResult>> {
    let pending: usize = sheets.iter().map(|s| s.pending_count()).sum();
    if pending > 0 {
        return Err(StorageError::validation(format!(
            "event {} has {} pending matches",
            event_id, pending
        )));
    }

    let now = Utc::now();
    let mut results = Vec::new();
    let mut keys = HashSet::new();

    for sheet in sheets {
        let totals = fight_point_totals(sheet);

        for placement in bracket_placements(sheet)? {
            let key = (sheet.bracket.category_code.clone(), placement.athlete_id);
            if !keys.insert(key) {
                return Err(StorageError::conflict(format!(
                    "athlete {} placed twice in category {}",
                    placement.athlete_id, sheet.bracket.category_code
                )));
            }

            let organization_id = sheet
                .participant(placement.athlete_id)
                .map(|p| p.organization_id)
                .unwrap_or_else(Uuid::nil);

            results.push(OfficialResult {
                official_result_id: Uuid::new_v4(),
                event_id,
                category_code: sheet.bracket.category_code.clone(),
                athlete_id: placement.athlete_id,
                organization_id,
                placement: placement.placement,
                fight_points_total: totals.get(&placement.athlete_id).copied().unwrap_or(0),
                created_at: now,
            });
        }
    }

    info!(
        event_id = %event_id,
        brackets = sheets.len(),
        results = results.len(),
        "Official results computed"
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupingKey, Participant};
    use crate::services::advancement::AdvancementEngine;
    use crate::services::bracket_builder::BracketBuilder;
    use crate::services::match_registry::MatchRegistry;

    fn roster(n: usize) -> Vec<Participant> {
        (1..=n)
            .map(|seed| Participant {
                athlete_id: Uuid::new_v4(),
                organization_id: Uuid::new_v4(),
                seed: seed as i32,
            })
            .collect()
    }

    fn build(n: usize, format: Option<BracketFormat>) -> BracketSheet {
        let key = GroupingKey {
            event_id: Uuid::new_v4(),
            category_code: "M-81".to_string(),
            class_code: "SUB-21".to_string(),
            sex: "M".to_string(),
            belt_group: Some(8),
        };
        BracketBuilder::default().build(&key, format, roster(n)).unwrap()
    }

    /// Resolves every open match in order, the blue contestant always winning by ippon.
    fn play_out(sheet: &mut BracketSheet) {
        let registry = MatchRegistry::default();
        let engine = AdvancementEngine::new();

        loop {
            let next = sheet
                .matches
                .iter()
                .filter(|m| m.status == MatchStatus::Scheduled && m.contestants().count() == 2)
                .min_by_key(|m| (m.round_number, m.match_number))
                .map(|m| m.match_id);
            let Some(match_id) = next else { break };

            let idx = sheet.position(match_id).unwrap();
            let blue = sheet.matches[idx].blue_athlete_id;
            registry
                .record_result(&mut sheet.matches[idx], blue, Some(WinMethod::Ippon), None, None)
                .unwrap();
            engine.advance(sheet, match_id).unwrap();
        }
    }

    #[test]
    fn test_pending_matches_block_results() {
        let sheet = build(4, None);
        let err = aggregate_event(sheet.bracket.event_id, &[sheet]).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn test_repechage_bracket_places_four() {
        let mut sheet = build(8, None);
        play_out(&mut sheet);
        assert!(sheet.is_complete());

        let placements = bracket_placements(&sheet).unwrap();
        let ranks: Vec<i32> = placements.iter().map(|p| p.placement).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);

        // Blue always wins, so seed 1 takes gold.
        assert_eq!(placements[0].athlete_id, sheet.participants[0].athlete_id);
    }

    #[test]
    fn test_single_elimination_shares_bronze() {
        let mut sheet = build(4, Some(BracketFormat::SingleElimination));
        play_out(&mut sheet);

        let ranks: Vec<i32> = bracket_placements(&sheet)
            .unwrap()
            .iter()
            .map(|p| p.placement)
            .collect();
        assert_eq!(ranks, vec![1, 2, 3, 3]);
    }

    #[test]
    fn test_round_robin_places_everyone() {
        let mut sheet = build(5, None);
        play_out(&mut sheet);

        let results = aggregate_event(sheet.bracket.event_id, std::slice::from_ref(&sheet)).unwrap();
        assert_eq!(results.len(), 5);
        let total: i32 = results.iter().map(|r| r.fight_points_total).sum();
        assert_eq!(total, 10 * 10);
    }

    #[test]
    fn test_best_of_three_closes_after_two_wins() {
        let mut sheet = build(2, None);
        play_out(&mut sheet);

        let finished = sheet
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Finished)
            .count();
        assert_eq!(finished, 2);

        let placements = bracket_placements(&sheet).unwrap();
        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].placement, 1);
    }

    #[test]
    fn test_lone_participant_is_champion() {
        let sheet = build(1, None);
        let results = aggregate_event(sheet.bracket.event_id, std::slice::from_ref(&sheet)).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].placement, 1);
        assert_eq!(results[0].fight_points_total, 0);
        assert_eq!(results[0].organization_id, sheet.participants[0].organization_id);
    }

    #[test]
    fn test_walkovers_score_nothing() {
        let mut sheet = build(6, None);
        play_out(&mut sheet);

        let totals = fight_point_totals(&sheet);
        let finished = sheet
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Finished)
            .count() as i32;
        assert_eq!(totals.values().sum::<i32>(), finished * 10);
    }
}
