use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{BracketFormat, BracketSheet, MatchStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub athlete_id: Uuid,
    pub organization_id: Uuid,
    pub wins: u32,
    pub losses: u32,
    pub fight_points: i32,
}

impl StandingRow {
    fn tied_with(&self, other: &StandingRow) -> bool {
        self.wins == other.wins && self.fight_points == other.fight_points
    }
}

/// Round-robin ranking from FINISHED matches.
///
/// Ordered by wins, then fight points (both descending), then athlete id. A single
/// pass then swaps adjacent tied rows when the lower one won their head-to-head;
/// three-way cycles keep the base order.
pub fn compute_standings(sheet: &BracketSheet) -> Result<Vec<StandingRow>> {
    if sheet.bracket.format != BracketFormat::RoundRobin {
        return Err(StorageError::validation(format!(
            "standings only apply to {} brackets, bracket {} is {}",
            BracketFormat::RoundRobin,
            sheet.bracket_id(),
            sheet.bracket.format
        )));
    }

    let mut rows: HashMap<Uuid, StandingRow> = sheet
        .participants
        .iter()
        .map(|p| {
            (
                p.athlete_id,
                StandingRow {
                    athlete_id: p.athlete_id,
                    organization_id: p.organization_id,
                    wins: 0,
                    losses: 0,
                    fight_points: 0,
                },
            )
        })
        .collect();

    let finished = sheet
        .matches
        .iter()
        .filter(|m| m.status == MatchStatus::Finished);

    for m in finished {
        let (Some(winner), Some(loser)) = (m.winner_athlete_id, m.loser()) else {
            continue;
        };

        let row = rows.entry(winner).or_insert_with(|| blank(winner));
        row.wins += 1;
        row.fight_points += m.fight_points_winner;

        let row = rows.entry(loser).or_insert_with(|| blank(loser));
        row.losses += 1;
        row.fight_points += m.fight_points_loser;
    }

    let mut ranked: Vec<StandingRow> = rows.into_values().collect();
    ranked.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(b.fight_points.cmp(&a.fight_points))
            .then(a.athlete_id.cmp(&b.athlete_id))
    });

    for i in 0..ranked.len().saturating_sub(1) {
        if !ranked[i].tied_with(&ranked[i + 1]) {
            continue;
        }

        let upper = ranked[i].athlete_id;
        let lower = ranked[i + 1].athlete_id;
        let lower_won = sheet.matches.iter().any(|m| {
            m.status == MatchStatus::Finished
                && m.involves_pair(upper, lower)
                && m.winner_athlete_id == Some(lower)
        });

        if lower_won {
            ranked.swap(i, i + 1);
        }
    }

    Ok(ranked)
}

fn blank(athlete_id: Uuid) -> StandingRow {
    StandingRow {
        athlete_id,
        organization_id: Uuid::nil(),
        wins: 0,
        losses: 0,
        fight_points: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bracket, GroupingKey, Match, MatchPhase, Participant, WinMethod};

    fn sheet(format: BracketFormat, ids: &[Uuid]) -> BracketSheet {
        let key = GroupingKey {
            event_id: Uuid::new_v4(),
            category_code: "M-73".to_string(),
            class_code: "SENIOR".to_string(),
            sex: "M".to_string(),
            belt_group: None,
        };
        let bracket = Bracket::draft(&key, format);
        let participants = ids
            .iter()
            .enumerate()
            .map(|(i, id)| Participant {
                athlete_id: *id,
                organization_id: Uuid::new_v4(),
                seed: i as i32 + 1,
            })
            .collect();
        BracketSheet {
            bracket,
            participants,
            matches: Vec::new(),
        }
    }

    fn won(sheet: &mut BracketSheet, winner: Uuid, loser: Uuid, method: WinMethod, points: i32) {
        let number = sheet.matches.len() as i16 + 1;
        let mut m = Match::scheduled(sheet.bracket_id(), 1, number, MatchPhase::Main)
            .with_contestants(Some(winner), Some(loser));
        m.status = MatchStatus::Finished;
        m.winner_athlete_id = Some(winner);
        m.win_method = Some(method);
        m.fight_points_winner = points;
        sheet.matches.push(m);
    }

    #[test]
    fn test_rejects_knockout_brackets() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let err = compute_standings(&sheet(BracketFormat::BestOfThree, &ids)).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn test_orders_by_wins_then_fight_points() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let mut s = sheet(BracketFormat::RoundRobin, &ids);
        won(&mut s, ids[2], ids[0], WinMethod::Ippon, 10);
        won(&mut s, ids[2], ids[1], WinMethod::Yuko, 5);
        won(&mut s, ids[1], ids[0], WinMethod::Ippon, 10);

        let rows = compute_standings(&s).unwrap();
        let order: Vec<Uuid> = rows.iter().map(|r| r.athlete_id).collect();

        assert_eq!(order, vec![ids[2], ids[1], ids[0]]);
        assert_eq!(rows[0].wins, 2);
        assert_eq!(rows[0].fight_points, 15);
        assert_eq!(rows[2].losses, 2);
    }

    #[test]
    fn test_head_to_head_breaks_two_way_tie() {
        let p = Uuid::from_u128(1);
        let q = Uuid::from_u128(2);
        let r = Uuid::from_u128(3);
        let mut s = sheet(BracketFormat::RoundRobin, &[p, q, r]);
        won(&mut s, p, r, WinMethod::Ippon, 10);
        won(&mut s, q, p, WinMethod::Ippon, 10);

        let rows = compute_standings(&s).unwrap();
        assert_eq!(rows[0].athlete_id, q);
        assert_eq!(rows[1].athlete_id, p);
        assert_eq!(rows[2].athlete_id, r);
    }

    #[test]
    fn test_cyclic_tie_is_deterministic() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let mut s = sheet(BracketFormat::RoundRobin, &ids);
        won(&mut s, ids[0], ids[1], WinMethod::Ippon, 10);
        won(&mut s, ids[1], ids[2], WinMethod::Ippon, 10);
        won(&mut s, ids[2], ids[0], WinMethod::Ippon, 10);

        let first = compute_standings(&s).unwrap();
        let second = compute_standings(&s).unwrap();

        assert_eq!(first, second);
        assert!(first.iter().all(|r| r.wins == 1 && r.losses == 1 && r.fight_points == 10));
    }

    #[test]
    fn test_only_finished_matches_count() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let mut s = sheet(BracketFormat::RoundRobin, &ids);
        won(&mut s, ids[0], ids[1], WinMethod::Ippon, 10);
        s.matches[0].status = MatchStatus::Walkover;

        let rows = compute_standings(&s).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.wins == 0 && r.fight_points == 0));
    }
}
