//! Pure single-elimination bracket rules.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::error::{OrchestrationError, OrchestrationResult};

pub const BRACKET_SIZES: [usize; 3] = [4, 8, 16];

pub fn validate_bracket_size(players: usize) -> OrchestrationResult<()> {
    if BRACKET_SIZES.contains(&players) {
        Ok(())
    } else {
        Err(OrchestrationError::InvalidBracketSize(players))
    }
}

/// Shuffle and cut into ordered pairs. A trailing odd player gets `None` as opponent.
pub fn pair_players<R: Rng + ?Sized>(players: &[Uuid], rng: &mut R) -> Vec<(Uuid, Option<Uuid>)> {
    let mut shuffled = players.to_vec();
    shuffled.shuffle(rng);
    shuffled
        .chunks(2)
        .map(|pair| (pair[0], pair.get(1).copied()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGame {
    pub slot: i32,
    pub first: Uuid,
    pub second: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundPlan {
    Champion(Uuid),
    Games(Vec<PlannedGame>),
}

/// Decide what follows a completed round, given `(slot, winner)` for each of its slots.
///
/// Winners of slots `2k` and `2k + 1` meet in slot `k` of the next round.
pub fn plan_next_round(results: &[(i32, Option<Uuid>)]) -> OrchestrationResult<RoundPlan> {
    let mut ordered = results.to_vec();
    ordered.sort_by_key(|(slot, _)| *slot);

    let mut winners = Vec::with_capacity(ordered.len());
    for (slot, winner) in ordered {
        let winner = winner.ok_or_else(|| {
            OrchestrationError::InvalidState(format!("bracket slot {slot} has no winner"))
        })?;
        winners.push((slot, winner));
    }

    match winners.as_slice() {
        [] => Err(OrchestrationError::InvalidState(
            "round has no results".to_string(),
        )),
        [(_, champion)] => Ok(RoundPlan::Champion(*champion)),
        _ => {
            let mut games = Vec::with_capacity(winners.len() / 2);
            for pair in winners.chunks(2) {
                let [(slot, first), (_, second)] = pair else {
                    return Err(OrchestrationError::InvalidState(format!(
                        "slot {} has no opponent for the next round",
                        pair[0].0
                    )));
                };
                games.push(PlannedGame {
                    slot: slot / 2,
                    first: *first,
                    second: *second,
                });
            }
            Ok(RoundPlan::Games(games))
        }
    }
}
