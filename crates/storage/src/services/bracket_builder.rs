use tracing::info;
use uuid::Uuid;

use super::advancement::AdvancementEngine;
use super::format_selector::select_format;
use crate::error::{Result, StorageError};
use crate::models::{Bracket, BracketFormat, BracketSheet, GroupingKey, Match, MatchPhase, Participant};

/// Lays out the matches of one bracket format.
pub trait BracketStrategy: Send + Sync {
    fn format(&self) -> BracketFormat;

    /// Builds every match for participants already in seed order.
    fn build(&self, bracket_id: Uuid, seeded: &[Participant]) -> Result<Vec<Match>>;
}

pub fn strategy_for(format: BracketFormat) -> Box<dyn BracketStrategy> {
    match format {
        BracketFormat::SingleElimination => Box::new(SingleElimination),
        BracketFormat::RoundRobin => Box::new(RoundRobin),
        BracketFormat::BestOfThree => Box::new(BestOfThree),
        BracketFormat::EliminationWithRepechage => Box::new(EliminationWithRepechage),
    }
}

fn require_participants(
    format: BracketFormat,
    seeded: &[Participant],
    accepts: impl Fn(usize) -> bool,
    rule: &str,
) -> Result<()> {
    if accepts(seeded.len()) {
        Ok(())
    } else {
        Err(StorageError::validation(format!(
            "{} requires {} participants, got {}",
            format,
            rule,
            seeded.len()
        )))
    }
}

/// Seed numbers in slot order for a power-of-two bracket: top seeds meet last.
///
/// `[1, 2]` doubles into `[1, 4, 2, 3]`, then `[1, 8, 4, 5, 2, 7, 3, 6]`.
pub fn seeding_layout(size: usize) -> Vec<usize> {
    let mut layout = vec![1];
    while layout.len() < size {
        let doubled = layout.len() * 2;
        layout = layout
            .iter()
            .flat_map(|&seed| [seed, doubled + 1 - seed])
            .collect();
    }
    layout
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SingleElimination;

impl SingleElimination {
    /// The knockout tree; round `R` holds the single FINAL match.
    fn main_tree(bracket_id: Uuid, seeded: &[Participant]) -> Vec<Match> {
        let size = seeded.len().next_power_of_two();
        let rounds = size.trailing_zeros() as i16;
        let layout = seeding_layout(size);
        let slot = |i: usize| seeded.get(layout[i] - 1).map(|p| p.athlete_id);

        let mut matches = Vec::with_capacity(size - 1);
        for round in 1..=rounds {
            let count = (size >> round) as i16;
            let phase = if round == rounds {
                MatchPhase::Final
            } else {
                MatchPhase::Main
            };

            for number in 1..=count {
                let mut bout = Match::scheduled(bracket_id, round, number, phase);
                if round == 1 {
                    let first = (number as usize - 1) * 2;
                    bout = bout.with_contestants(slot(first), slot(first + 1));
                }
                matches.push(bout);
            }
        }

        matches
    }
}

impl BracketStrategy for SingleElimination {
    fn format(&self) -> BracketFormat {
        BracketFormat::SingleElimination
    }

    fn build(&self, bracket_id: Uuid, seeded: &[Participant]) -> Result<Vec<Match>> {
        require_participants(self.format(), seeded, |n| n >= 2, "at least 2")?;
        Ok(Self::main_tree(bracket_id, seeded))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl BracketStrategy for RoundRobin {
    fn format(&self) -> BracketFormat {
        BracketFormat::RoundRobin
    }

    fn build(&self, bracket_id: Uuid, seeded: &[Participant]) -> Result<Vec<Match>> {
        require_participants(self.format(), seeded, |n| n >= 2, "at least 2")?;

        let mut matches = Vec::new();
        let mut number: i16 = 0;
        for (i, blue) in seeded.iter().enumerate() {
            for white in &seeded[i + 1..] {
                number += 1;
                matches.push(
                    Match::scheduled(bracket_id, 1, number, MatchPhase::Main)
                        .with_contestants(Some(blue.athlete_id), Some(white.athlete_id)),
                );
            }
        }

        Ok(matches)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BestOfThree;

impl BracketStrategy for BestOfThree {
    fn format(&self) -> BracketFormat {
        BracketFormat::BestOfThree
    }

    fn build(&self, bracket_id: Uuid, seeded: &[Participant]) -> Result<Vec<Match>> {
        require_participants(self.format(), seeded, |n| n == 2, "exactly 2")?;

        let (blue, white) = (seeded[0].athlete_id, seeded[1].athlete_id);
        Ok((1..=3)
            .map(|number| {
                Match::scheduled(bracket_id, 1, number, MatchPhase::Main)
                    .with_contestants(Some(blue), Some(white))
            })
            .collect())
    }
}

/// Knockout tree plus one repechage ladder and one bronze match per finalist side.
#[derive(Debug, Clone, Copy, Default)]
pub struct EliminationWithRepechage;

impl EliminationWithRepechage {
    /// MAIN matches below the semifinal at `(round, number)`, blue feeder first.
    fn ladder_entries(tree: &[Match], round: i16, number: i16, out: &mut Vec<Uuid>) {
        if round <= 1 {
            return;
        }
        for feeder_number in [number * 2 - 1, number * 2] {
            if let Some(feeder) = tree
                .iter()
                .find(|m| m.round_number == round - 1 && m.match_number == feeder_number)
            {
                out.push(feeder.match_id);
                Self::ladder_entries(tree, round - 1, feeder_number, out);
            }
        }
    }
}

impl BracketStrategy for EliminationWithRepechage {
    fn format(&self) -> BracketFormat {
        BracketFormat::EliminationWithRepechage
    }

    fn build(&self, bracket_id: Uuid, seeded: &[Participant]) -> Result<Vec<Match>> {
        require_participants(self.format(), seeded, |n| n >= 4, "at least 4")?;

        let mut matches = SingleElimination::main_tree(bracket_id, seeded);
        let final_round = matches
            .iter()
            .map(|m| m.round_number)
            .max()
            .unwrap_or(1);
        let semi_round = final_round - 1;

        let semifinals: Vec<Uuid> = (1..=2)
            .filter_map(|number| {
                matches
                    .iter()
                    .find(|m| m.round_number == semi_round && m.match_number == number)
                    .map(|m| m.match_id)
            })
            .collect();

        // Each side's ladder shrinks to a single survivor feeding its bronze match.
        let mut sides: Vec<Vec<Uuid>> = (1..=2)
            .map(|number| {
                let mut entries = Vec::new();
                Self::ladder_entries(&matches, semi_round, number, &mut entries);
                entries
            })
            .collect();

        let mut round = final_round;
        while sides.iter().any(|side| side.len() > 1) {
            round += 1;
            let mut number: i16 = 0;
            for side in sides.iter_mut() {
                let mut next = Vec::with_capacity(side.len() / 2 + 1);
                for pair in side.chunks(2) {
                    match pair {
                        [blue, white] => {
                            number += 1;
                            let rung =
                                Match::scheduled(bracket_id, round, number, MatchPhase::Repechage)
                                    .with_sources(Some(*blue), Some(*white));
                            next.push(rung.match_id);
                            matches.push(rung);
                        }
                        [carried] => next.push(*carried),
                        _ => {}
                    }
                }
                *side = next;
            }
        }

        let bronze_round = round + 1;
        for (number, (side, semi)) in sides.iter().zip(&semifinals).enumerate() {
            if let Some(survivor) = side.first() {
                matches.push(
                    Match::scheduled(bracket_id, bronze_round, number as i16 + 1, MatchPhase::Bronze)
                        .with_sources(Some(*survivor), Some(*semi)),
                );
            }
        }

        Ok(matches)
    }
}

/// Turns one grouping key's participants into a generated bracket sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketBuilder {
    engine: AdvancementEngine,
}

impl BracketBuilder {
    pub fn new(engine: AdvancementEngine) -> Self {
        Self { engine }
    }

    /// Seeds, selects the format, lays out matches and resolves byes.
    ///
    /// A lone participant gets a bracket without matches; its stored format is the
    /// override when given, single elimination otherwise.
    pub fn build(
        &self,
        key: &GroupingKey,
        override_format: Option<BracketFormat>,
        participants: Vec<Participant>,
    ) -> Result<BracketSheet> {
        let mut seeded = participants;
        seeded.sort_by_key(|p| p.seed);

        let selected = if seeded.len() == 1 {
            select_format(1, None)?
        } else {
            select_format(seeded.len(), override_format)?
        };
        let format = selected
            .or(override_format)
            .unwrap_or(BracketFormat::SingleElimination);

        let mut bracket = Bracket::draft(key, format);
        bracket.is_generated = true;

        let matches = match selected {
            Some(format) => strategy_for(format).build(bracket.bracket_id, &seeded)?,
            None => Vec::new(),
        };

        let mut sheet = BracketSheet {
            bracket,
            participants: seeded,
            matches,
        };
        let byes = self.engine.settle_all(&mut sheet)?;

        info!(
            bracket = %key,
            format = %sheet.bracket.format,
            participants = sheet.participants.len(),
            matches = sheet.matches.len(),
            auto_resolved = byes.len(),
            "Bracket generated"
        );

        Ok(sheet)
    }
}
