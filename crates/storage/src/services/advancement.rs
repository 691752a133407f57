use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{
    BracketFormat, BracketSheet, Corner, Match, MatchPhase, MatchStatus, WinMethod,
};

pub const BYE_NOTE: &str = "bye";
pub const NO_CONTESTANTS_NOTE: &str = "no contestants";
pub const DECIDED_NOTE: &str = "decided";

/// Non-YUKO wins needed to take a best-of-3.
const SERIES_WINS: usize = 2;

/// A participant (or nobody) moving out of a terminal match into a slot of a dependent match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flow {
    pub target: usize,
    pub corner: Corner,
    pub occupant: Option<Uuid>,
}

/// Every slot the match at `idx` feeds, with whoever currently flows into it.
///
/// Knockout matches send their winner to `(round + 1, ceil(number / 2))`. Matches
/// named as a source by a REPECHAGE/BRONZE match send their loser when they are
/// MAIN/FINAL and their winner when they are themselves REPECHAGE.
pub fn flows_from(sheet: &BracketSheet, idx: usize) -> Vec<Flow> {
    let source = &sheet.matches[idx];
    let mut flows = Vec::new();

    if source.phase.is_main_tree() {
        let parent_number = (source.match_number + 1) / 2;
        if let Some(target) = sheet.main_position(source.round_number + 1, parent_number) {
            flows.push(Flow {
                target,
                corner: Corner::for_match_number(source.match_number),
                occupant: source.winner_athlete_id,
            });
        }
    }

    let carried = match source.phase {
        MatchPhase::Main | MatchPhase::Final => source.loser(),
        MatchPhase::Repechage => source.winner_athlete_id,
        MatchPhase::Bronze => None,
    };

    for (target, dependent) in sheet.matches.iter().enumerate() {
        for corner in [Corner::Blue, Corner::White] {
            if dependent.source(corner) == Some(source.match_id) {
                flows.push(Flow {
                    target,
                    corner,
                    occupant: carried,
                });
            }
        }
    }

    flows
}

fn feeder_positions(sheet: &BracketSheet, idx: usize) -> Vec<usize> {
    let target = &sheet.matches[idx];

    if target.phase.is_main_tree() {
        if target.round_number <= 1 {
            return Vec::new();
        }
        [
            sheet.main_position(target.round_number - 1, target.match_number * 2 - 1),
            sheet.main_position(target.round_number - 1, target.match_number * 2),
        ]
        .into_iter()
        .flatten()
        .collect()
    } else {
        [target.source_blue_match_id, target.source_white_match_id]
            .into_iter()
            .flatten()
            .filter_map(|id| sheet.position(id))
            .collect()
    }
}

/// True once every match feeding `idx` is terminal (vacuously true for round-1 matches).
pub fn feeders_settled(sheet: &BracketSheet, idx: usize) -> bool {
    feeder_positions(sheet, idx)
        .into_iter()
        .all(|f| sheet.matches[f].is_terminal())
}

/// True once whoever a terminal feeder sends into `idx` already sits in its slot.
fn feeders_delivered(sheet: &BracketSheet, idx: usize) -> bool {
    let target = &sheet.matches[idx];

    feeder_positions(sheet, idx).into_iter().all(|f| {
        flows_from(sheet, f)
            .into_iter()
            .filter(|flow| flow.target == idx)
            .all(|flow| flow.occupant.is_none() || target.occupant(flow.corner) == flow.occupant)
    })
}

/// The participant holding two non-YUKO wins in a best-of-3, if any.
pub fn best_of_three_winner(matches: &[Match]) -> Option<Uuid> {
    let mut wins: HashMap<Uuid, usize> = HashMap::new();

    for m in matches.iter().filter(|m| m.is_terminal()) {
        if m.win_method == Some(WinMethod::Yuko) {
            continue;
        }
        if let Some(winner) = m.winner_athlete_id {
            *wins.entry(winner).or_default() += 1;
        }
    }

    let mut decided: Vec<Uuid> = wins
        .into_iter()
        .filter(|(_, count)| *count >= SERIES_WINS)
        .map(|(athlete, _)| athlete)
        .collect();
    decided.sort();
    decided.into_iter().next()
}

/// Moves finished matches' participants through the bracket topology.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancementEngine;

impl AdvancementEngine {
    pub fn new() -> Self {
        Self
    }

    /// Propagates the terminal match `match_id` into every dependent slot.
    ///
    /// Dependents whose feeders are all terminal but that hold fewer than two
    /// participants are resolved on the spot (walkover or void) and propagated in
    /// turn. Returns the ids of every other match that changed.
    pub fn advance(&self, sheet: &mut BracketSheet, match_id: Uuid) -> Result<Vec<Uuid>> {
        let idx = sheet.require_position(match_id)?;
        if !sheet.matches[idx].is_terminal() {
            return Err(StorageError::validation(format!(
                "match {} has no result to advance",
                match_id
            )));
        }

        let mut touched = Vec::new();
        let mut queue = VecDeque::from([idx]);

        while let Some(current) = queue.pop_front() {
            for flow in flows_from(sheet, current) {
                if let Some(athlete_id) = flow.occupant {
                    if place(sheet, flow, athlete_id)? {
                        remember(&mut touched, sheet.matches[flow.target].match_id);
                    }
                }

                if settle(sheet, flow.target) {
                    remember(&mut touched, sheet.matches[flow.target].match_id);
                    queue.push_back(flow.target);
                }
            }
        }

        if sheet.bracket.format == BracketFormat::BestOfThree {
            for id in close_decided_series(sheet) {
                remember(&mut touched, id);
            }
        }

        Ok(touched)
    }

    /// Resolves every match that can never be contested, in round order.
    ///
    /// Run once after generation so byes walk their participant over without an
    /// official recording anything.
    pub fn settle_all(&self, sheet: &mut BracketSheet) -> Result<Vec<Uuid>> {
        let mut order: Vec<usize> = (0..sheet.matches.len()).collect();
        order.sort_by_key(|&i| (sheet.matches[i].round_number, sheet.matches[i].match_number));

        let mut touched = Vec::new();
        for idx in order {
            if settle(sheet, idx) {
                let match_id = sheet.matches[idx].match_id;
                remember(&mut touched, match_id);
                for id in self.advance(sheet, match_id)? {
                    remember(&mut touched, id);
                }
            }
        }

        Ok(touched)
    }
}

fn remember(touched: &mut Vec<Uuid>, match_id: Uuid) {
    if !touched.contains(&match_id) {
        touched.push(match_id);
    }
}

fn place(sheet: &mut BracketSheet, flow: Flow, athlete_id: Uuid) -> Result<bool> {
    let target = &mut sheet.matches[flow.target];

    match target.occupant(flow.corner) {
        Some(current) if current == athlete_id => Ok(false),
        Some(current) => Err(StorageError::conflict(format!(
            "{:?} slot of match R{} M{} already holds {}, cannot place {}",
            flow.corner, target.round_number, target.match_number, current, athlete_id
        ))),
        None if target.is_terminal() => Err(StorageError::conflict(format!(
            "match R{} M{} is already {}, cannot place {}",
            target.round_number, target.match_number, target.status, athlete_id
        ))),
        None => {
            target.set_occupant(flow.corner, Some(athlete_id));
            debug!(
                match_id = %target.match_id,
                round = target.round_number,
                number = target.match_number,
                corner = ?flow.corner,
                athlete_id = %athlete_id,
                "Slot filled"
            );
            Ok(true)
        }
    }
}

/// Closes a scheduled match that can no longer receive anyone and has no contest.
fn settle(sheet: &mut BracketSheet, idx: usize) -> bool {
    if sheet.matches[idx].status != MatchStatus::Scheduled
        || !feeders_settled(sheet, idx)
        || !feeders_delivered(sheet, idx)
    {
        return false;
    }

    let target = &mut sheet.matches[idx];
    let contestants: Vec<Uuid> = target.contestants().collect();

    match contestants.as_slice() {
        [_, _] => false,
        [only] => {
            target.status = MatchStatus::Walkover;
            target.winner_athlete_id = Some(*only);
            target.win_method = Some(WinMethod::Wo);
            target.fight_points_winner = 0;
            target.fight_points_loser = 0;
            target.finished_at = Some(Utc::now());
            target.notes = BYE_NOTE.to_string();
            info!(
                match_id = %target.match_id,
                phase = %target.phase,
                athlete_id = %only,
                "Bye resolved as walkover"
            );
            true
        }
        _ => {
            target.status = MatchStatus::Walkover;
            target.finished_at = Some(Utc::now());
            target.notes = NO_CONTESTANTS_NOTE.to_string();
            warn!(
                match_id = %target.match_id,
                phase = %target.phase,
                "Match voided, no contestant reached it"
            );
            true
        }
    }
}

fn close_decided_series(sheet: &mut BracketSheet) -> Vec<Uuid> {
    let Some(winner) = best_of_three_winner(&sheet.matches) else {
        return Vec::new();
    };

    let mut closed = Vec::new();
    for m in sheet
        .matches
        .iter_mut()
        .filter(|m| m.status == MatchStatus::Scheduled)
    {
        m.status = MatchStatus::Walkover;
        m.finished_at = Some(Utc::now());
        m.notes = DECIDED_NOTE.to_string();
        closed.push(m.match_id);
    }

    if !closed.is_empty() {
        info!(
            bracket_id = %sheet.bracket.bracket_id,
            athlete_id = %winner,
            remaining = closed.len(),
            "Best-of-3 decided, remaining bouts closed"
        );
    }

    closed
}
