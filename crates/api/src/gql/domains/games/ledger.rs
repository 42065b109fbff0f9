//! Score bookkeeping for matches and games.
//!
//! Scores and hits only ever move by additive deltas. Winners are derived from the stored
//! score rows, and the per-side summary is rebuilt from match history on every read.

use std::collections::{BTreeMap, HashMap};

use infra::models::{GamePlayerRow, MatchRow, MatchScoreRow};
use infra::repos::PaddleSide;
use uuid::Uuid;

/// Per-player deltas carried by one status update.
#[derive(Debug, Clone, Default)]
pub struct RallyStats {
    pub hits: BTreeMap<Uuid, i32>,
    pub scores: BTreeMap<Uuid, i32>,
}

impl RallyStats {
    pub fn is_empty(&self) -> bool {
        self.hits.values().all(|v| *v == 0) && self.scores.values().all(|v| *v == 0)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (player_id, value) in self.hits.iter().chain(self.scores.iter()) {
            if *value < 0 {
                return Err(format!("negative delta for player {player_id}"));
            }
        }
        Ok(())
    }

    /// `(player, hits, score)` for every player mentioned, in player order.
    pub fn deltas(&self) -> Vec<(Uuid, i32, i32)> {
        let mut merged: BTreeMap<Uuid, (i32, i32)> = BTreeMap::new();
        for (player_id, hits) in &self.hits {
            merged.entry(*player_id).or_default().0 += hits;
        }
        for (player_id, score) in &self.scores {
            merged.entry(*player_id).or_default().1 += score;
        }
        merged
            .into_iter()
            .map(|(player_id, (hits, score))| (player_id, hits, score))
            .collect()
    }
}

/// The player whose total is strictly above everyone else's.
pub fn strict_leader<I>(totals: I) -> Option<Uuid>
where
    I: IntoIterator<Item = (Uuid, i32)>,
{
    let mut best: Option<i32> = None;
    let mut leader = None;
    for (player_id, total) in totals {
        match best {
            Some(current) if total < current => {}
            Some(current) if total == current => leader = None,
            _ => {
                best = Some(total);
                leader = Some(player_id);
            }
        }
    }
    leader
}

/// Strict leader, falling back to `previous` on a tie.
pub fn leader_or_previous<I>(totals: I, previous: Option<Uuid>) -> Option<Uuid>
where
    I: IntoIterator<Item = (Uuid, i32)>,
{
    strict_leader(totals).or(previous)
}

pub fn match_winner(scores: &[MatchScoreRow], previous: Option<Uuid>) -> Option<Uuid> {
    leader_or_previous(scores.iter().map(|s| (s.player_id, s.score)), previous)
}

/// Player who took the set: reached `max_score` and leads everyone else who did.
pub fn set_point_winner(scores: &[MatchScoreRow], max_score: i32) -> Option<Uuid> {
    strict_leader(
        scores
            .iter()
            .filter(|s| s.score >= max_score)
            .map(|s| (s.player_id, s.score)),
    )
}

pub fn cumulative_scores(scores: &[MatchScoreRow]) -> BTreeMap<Uuid, i32> {
    let mut totals = BTreeMap::new();
    for row in scores {
        *totals.entry(row.player_id).or_insert(0) += row.score;
    }
    totals
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerScore {
    pub player_id: Uuid,
    pub score: i32,
    pub hits: i32,
}

#[derive(Debug, Clone)]
pub struct MatchBreakdown {
    pub match_id: Uuid,
    pub number: i32,
    pub completed: bool,
    pub winner_id: Option<Uuid>,
    pub scores: Vec<PlayerScore>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLine {
    pub player_id: Uuid,
    pub side: Option<PaddleSide>,
    pub score: i32,
    pub hits: i32,
    pub set_wins: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideTotals {
    pub side: PaddleSide,
    pub score: i32,
    pub hits: i32,
    pub set_wins: i32,
}

#[derive(Debug, Clone)]
pub struct LedgerSummary {
    pub players: Vec<PlayerLine>,
    pub sides: Vec<SideTotals>,
    pub matches: Vec<MatchBreakdown>,
    pub leader: Option<Uuid>,
}

impl LedgerSummary {
    pub fn side(&self, side: PaddleSide) -> Option<&SideTotals> {
        self.sides.iter().find(|s| s.side == side)
    }

    pub fn player(&self, player_id: Uuid) -> Option<&PlayerLine> {
        self.players.iter().find(|p| p.player_id == player_id)
    }
}

pub fn summarize(
    players: &[GamePlayerRow],
    matches: &[MatchRow],
    scores: &[MatchScoreRow],
) -> LedgerSummary {
    let side_of: HashMap<Uuid, PaddleSide> = players
        .iter()
        .filter_map(|p| p.paddle_side.map(|side| (p.player_id, side)))
        .collect();

    let mut ordered: Vec<&MatchRow> = matches.iter().collect();
    ordered.sort_by_key(|m| m.number);

    let breakdown: Vec<MatchBreakdown> = ordered
        .iter()
        .map(|m| MatchBreakdown {
            match_id: m.id,
            number: m.number,
            completed: m.completed,
            winner_id: m.winner_id,
            scores: scores
                .iter()
                .filter(|s| s.match_id == m.id)
                .map(|s| PlayerScore {
                    player_id: s.player_id,
                    score: s.score,
                    hits: s.hits,
                })
                .collect(),
        })
        .collect();

    let mut set_wins: HashMap<Uuid, i32> = HashMap::new();
    for m in ordered.iter().filter(|m| m.completed) {
        if let Some(winner) = m.winner_id {
            *set_wins.entry(winner).or_insert(0) += 1;
        }
    }

    let mut lines: Vec<PlayerLine> = players
        .iter()
        .map(|p| PlayerLine {
            player_id: p.player_id,
            side: p.paddle_side,
            score: 0,
            hits: 0,
            set_wins: set_wins.get(&p.player_id).copied().unwrap_or(0),
        })
        .collect();
    for row in scores {
        if let Some(line) = lines.iter_mut().find(|l| l.player_id == row.player_id) {
            line.score += row.score;
            line.hits += row.hits;
        }
    }

    let sides = [PaddleSide::Left, PaddleSide::Right]
        .into_iter()
        .map(|side| {
            let members = lines.iter().filter(|l| l.side == Some(side));
            let (score, hits) = members.fold((0, 0), |acc, l| (acc.0 + l.score, acc.1 + l.hits));
            let set_wins = set_wins
                .iter()
                .filter(|(player_id, _)| side_of.get(*player_id) == Some(&side))
                .map(|(_, wins)| *wins)
                .sum();
            SideTotals {
                side,
                score,
                hits,
                set_wins,
            }
        })
        .collect();

    LedgerSummary {
        leader: strict_leader(cumulative_scores(scores)),
        players: lines,
        sides,
        matches: breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use infra::repos::PaddleLocation;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn score(match_id: Uuid, player_id: Uuid, score: i32, hits: i32) -> MatchScoreRow {
        MatchScoreRow {
            id: Uuid::new_v4(),
            match_id,
            player_id,
            score,
            hits,
            updated_at: Utc::now(),
        }
    }

    fn player(game_id: Uuid, player_id: Uuid, location: PaddleLocation) -> GamePlayerRow {
        GamePlayerRow {
            id: Uuid::new_v4(),
            game_id,
            player_id,
            slot: 0,
            paddle_location: Some(location),
            paddle_side: Some(location.side()),
            joined_at: Utc::now(),
        }
    }

    fn game_match(game_id: Uuid, match_id: Uuid, number: i32, winner: Option<Uuid>) -> MatchRow {
        MatchRow {
            id: match_id,
            game_id,
            number,
            started_at: Utc::now(),
            ended_at: None,
            winner_id: winner,
            completed: winner.is_some(),
        }
    }

    #[test]
    fn strict_leader_needs_a_unique_maximum() {
        assert_eq!(strict_leader([(id(1), 3), (id(2), 5)]), Some(id(2)));
        assert_eq!(strict_leader([(id(1), 5), (id(2), 5)]), None);
        assert_eq!(strict_leader([(id(1), 5), (id(2), 5), (id(3), 6)]), Some(id(3)));
        assert_eq!(strict_leader([(id(1), 6), (id(2), 5), (id(3), 6)]), None);
        assert_eq!(strict_leader(Vec::<(Uuid, i32)>::new()), None);
    }

    #[test]
    fn ties_keep_the_previous_winner() {
        let m = id(100);
        let tied = vec![score(m, id(1), 4, 0), score(m, id(2), 4, 0)];
        assert_eq!(match_winner(&tied, Some(id(1))), Some(id(1)));
        assert_eq!(match_winner(&tied, None), None);

        let ahead = vec![score(m, id(1), 4, 0), score(m, id(2), 5, 0)];
        assert_eq!(match_winner(&ahead, Some(id(1))), Some(id(2)));
    }

    #[test]
    fn winner_is_recomputed_over_every_row() {
        // Player 1 scored in an earlier call and is not part of the latest deltas.
        let m = id(100);
        let rows = vec![score(m, id(1), 7, 0), score(m, id(2), 3, 0)];
        assert_eq!(match_winner(&rows, Some(id(2))), Some(id(1)));
    }

    #[test]
    fn set_point_requires_reaching_max_score() {
        let m = id(100);
        assert_eq!(set_point_winner(&[score(m, id(1), 9, 0), score(m, id(2), 3, 0)], 10), None);
        assert_eq!(
            set_point_winner(&[score(m, id(1), 10, 0), score(m, id(2), 3, 0)], 10),
            Some(id(1))
        );
        assert_eq!(
            set_point_winner(&[score(m, id(1), 10, 0), score(m, id(2), 10, 0)], 10),
            None
        );
    }

    #[test]
    fn rally_stats_merge_and_validate() {
        let mut stats = RallyStats::default();
        stats.hits.insert(id(2), 3);
        stats.scores.insert(id(1), 1);
        stats.scores.insert(id(2), 0);

        assert!(!stats.is_empty());
        assert!(stats.validate().is_ok());
        assert_eq!(stats.deltas(), vec![(id(1), 0, 1), (id(2), 3, 0)]);

        stats.scores.insert(id(3), -1);
        assert!(stats.validate().is_err());
        assert!(RallyStats::default().is_empty());
    }

    #[test]
    fn summary_adds_up_sides_and_set_wins() {
        let game = id(50);
        let (a, b) = (id(1), id(2));
        let (m1, m2) = (id(101), id(102));
        let players = vec![
            player(game, a, PaddleLocation::Left),
            player(game, b, PaddleLocation::Right),
        ];
        let matches = vec![game_match(game, m2, 2, None), game_match(game, m1, 1, Some(a))];
        let scores = vec![
            score(m1, a, 10, 14),
            score(m1, b, 6, 12),
            score(m2, a, 2, 3),
            score(m2, b, 4, 5),
        ];

        let summary = summarize(&players, &matches, &scores);

        assert_eq!(summary.matches[0].number, 1);
        assert_eq!(summary.matches[1].scores.len(), 2);
        assert_eq!(
            summary.side(PaddleSide::Left),
            Some(&SideTotals {
                side: PaddleSide::Left,
                score: 12,
                hits: 17,
                set_wins: 1
            })
        );
        assert_eq!(summary.side(PaddleSide::Right).map(|s| s.set_wins), Some(0));
        assert_eq!(summary.player(b).map(|p| p.score), Some(10));
        assert_eq!(summary.leader, Some(a));
    }

    #[test]
    fn summary_of_a_tied_game_has_no_leader() {
        let game = id(50);
        let m1 = id(101);
        let players = vec![
            player(game, id(1), PaddleLocation::Left),
            player(game, id(2), PaddleLocation::Right),
        ];
        let scores = vec![score(m1, id(1), 3, 0), score(m1, id(2), 3, 0)];

        let summary = summarize(&players, &[game_match(game, m1, 1, None)], &scores);
        assert_eq!(summary.leader, None);
    }
}
