use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::advancement::flows_from;
use crate::models::{BracketSheet, Corner, MatchPhase, MatchStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedMatch {
    pub match_id: Uuid,
    pub round_number: i16,
    pub match_number: i16,
    pub phase: MatchPhase,
    pub status: MatchStatus,
    pub blue_athlete_id: Option<Uuid>,
    pub white_athlete_id: Option<Uuid>,
}

/// A slot whose stored occupant differs from what the recorded results imply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDrift {
    pub match_id: Uuid,
    pub corner: Corner,
    pub recorded: Option<Uuid>,
    pub projected: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketProjection {
    pub bracket_id: Uuid,
    pub matches: Vec<ProjectedMatch>,
    pub drift: Vec<SlotDrift>,
}

impl BracketProjection {
    pub fn is_consistent(&self) -> bool {
        self.drift.is_empty()
    }
}

/// Replays every terminal match over the seeded round-1 slots and reports where
/// the stored slots disagree. Read-only.
pub fn recompute_bracket_projection(sheet: &BracketSheet) -> BracketProjection {
    let mut replay = sheet.clone();
    for m in replay.matches.iter_mut() {
        if m.round_number != 1 || !m.phase.is_main_tree() {
            m.blue_athlete_id = None;
            m.white_athlete_id = None;
        }
    }

    let mut order: Vec<usize> = (0..replay.matches.len())
        .filter(|&i| replay.matches[i].is_terminal())
        .collect();
    order.sort_by_key(|&i| (replay.matches[i].round_number, replay.matches[i].match_number));

    for idx in order {
        for flow in flows_from(&replay, idx) {
            let Some(athlete_id) = flow.occupant else {
                continue;
            };
            let target = &mut replay.matches[flow.target];
            if target.occupant(flow.corner).is_none() {
                target.set_occupant(flow.corner, Some(athlete_id));
            }
        }
    }

    let mut drift = Vec::new();
    for (recorded, projected) in sheet.matches.iter().zip(&replay.matches) {
        for corner in [Corner::Blue, Corner::White] {
            if recorded.occupant(corner) != projected.occupant(corner) {
                drift.push(SlotDrift {
                    match_id: recorded.match_id,
                    corner,
                    recorded: recorded.occupant(corner),
                    projected: projected.occupant(corner),
                });
            }
        }
    }

    let matches = replay
        .matches
        .iter()
        .map(|m| ProjectedMatch {
            match_id: m.match_id,
            round_number: m.round_number,
            match_number: m.match_number,
            phase: m.phase,
            status: m.status,
            blue_athlete_id: m.blue_athlete_id,
            white_athlete_id: m.white_athlete_id,
        })
        .collect();

    BracketProjection {
        bracket_id: sheet.bracket_id(),
        matches,
        drift,
    }
}
