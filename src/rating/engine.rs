//! Elo rating computation for duels, team battles and free-for-alls.
//!
//! Pure and deterministic: callers pass pre-match points in, deltas come
//! out. Nothing here touches storage.

use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use crate::rating::outcome::{MatchOutcome, SideResult};

/// Fixed K-factor applied to every match shape.
pub const K_FACTOR: f64 = 32.0;

/// Points a player starts with in a group they have not played in yet.
pub const DEFAULT_POINTS: i32 = 1000;

/// Expected score of a player rated `a` against one rated `b`.
pub fn expected_score(a: i32, b: i32) -> f64 {
    expected(a as f64, b as f64)
}

fn expected(a: f64, b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((b - a) / 400.0))
}

fn mean(points: &[i32]) -> f64 {
    points.iter().map(|&p| p as f64).sum::<f64>() / points.len() as f64
}

/// Deltas for both duelists, computed symmetrically from pre-match points.
pub fn duel_deltas(points_a: i32, points_b: i32, result: SideResult) -> (i32, i32) {
    let (score_a, score_b) = result.scores();
    let expected_a = expected_score(points_a, points_b);
    let delta_a = (K_FACTOR * (score_a - expected_a)).round() as i32;
    let delta_b = (K_FACTOR * (score_b - (1.0 - expected_a))).round() as i32;
    (delta_a, delta_b)
}

/// Per-member deltas for a two-team match.
///
/// Each side plays as its mean rating; the team-level delta `K * (S - E)` is
/// split evenly and rounded per member. The remainder is not redistributed,
/// so member deltas may not sum to the team-level delta exactly.
pub fn team_deltas(side_a: &[i32], side_b: &[i32], result: SideResult) -> (Vec<i32>, Vec<i32>) {
    let expected_a = expected(mean(side_a), mean(side_b));
    let (score_a, score_b) = result.scores();
    let team_delta_a = K_FACTOR * (score_a - expected_a);
    let team_delta_b = K_FACTOR * (score_b - (1.0 - expected_a));

    let split = |team_delta: f64, size: usize| -> Vec<i32> {
        let per_member = (team_delta / size as f64).round() as i32;
        vec![per_member; size]
    };
    (
        split(team_delta_a, side_a.len()),
        split(team_delta_b, side_b.len()),
    )
}

/// Deltas for a free-for-all, one entry per `(points, place)` pair.
///
/// Every ordered pair of entrants is scored as a pairwise duel decided by
/// place (lower is better, equal places draw); each entrant's actual and
/// expected scores are averaged over their N-1 opponents. With two entrants
/// this reduces exactly to [`duel_deltas`].
pub fn ffa_deltas(entrants: &[(i32, i32)]) -> Vec<i32> {
    let opponents = (entrants.len() - 1) as f64;
    entrants
        .iter()
        .enumerate()
        .map(|(i, &(points_i, place_i))| {
            let mut actual = 0.0;
            let mut expected_sum = 0.0;
            for (j, &(points_j, place_j)) in entrants.iter().enumerate() {
                if i == j {
                    continue;
                }
                actual += match place_i.cmp(&place_j) {
                    Ordering::Less => 1.0,
                    Ordering::Equal => 0.5,
                    Ordering::Greater => 0.0,
                };
                expected_sum += expected(points_i as f64, points_j as f64);
            }
            (K_FACTOR * (actual / opponents - expected_sum / opponents)).round() as i32
        })
        .collect()
}

/// Per-participant outcome of running the engine over one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantDelta {
    pub user_id: Uuid,
    /// 0 = free-for-all, 1 = side A, 2 = side B.
    pub team: i16,
    pub place: Option<i32>,
    pub delta: i32,
}

/// Dispatch a validated outcome to the matching update rule.
///
/// `points` holds the pre-match rating of every participant; the recorder
/// materializes missing rows at `default_points` before calling in, so the
/// fallback here only documents the same policy.
pub fn compute_deltas(
    outcome: &MatchOutcome,
    points: &HashMap<Uuid, i32>,
    default_points: i32,
) -> Vec<ParticipantDelta> {
    let points_of = |user: &Uuid| points.get(user).copied().unwrap_or(default_points);

    match outcome {
        MatchOutcome::Duel { a, b, result } => {
            let (delta_a, delta_b) = duel_deltas(points_of(a), points_of(b), *result);
            vec![
                ParticipantDelta {
                    user_id: *a,
                    team: 1,
                    place: None,
                    delta: delta_a,
                },
                ParticipantDelta {
                    user_id: *b,
                    team: 2,
                    place: None,
                    delta: delta_b,
                },
            ]
        }
        MatchOutcome::Team {
            side_a,
            side_b,
            result,
        } => {
            let points_a: Vec<i32> = side_a.iter().map(|u| points_of(u)).collect();
            let points_b: Vec<i32> = side_b.iter().map(|u| points_of(u)).collect();
            let (deltas_a, deltas_b) = team_deltas(&points_a, &points_b, *result);

            let mut out = Vec::with_capacity(side_a.len() + side_b.len());
            for (user_id, delta) in side_a.iter().zip(deltas_a) {
                out.push(ParticipantDelta {
                    user_id: *user_id,
                    team: 1,
                    place: None,
                    delta,
                });
            }
            for (user_id, delta) in side_b.iter().zip(deltas_b) {
                out.push(ParticipantDelta {
                    user_id: *user_id,
                    team: 2,
                    place: None,
                    delta,
                });
            }
            out
        }
        MatchOutcome::FreeForAll { entrants } => {
            let rated: Vec<(i32, i32)> = entrants
                .iter()
                .map(|e| (points_of(&e.user_id), e.place))
                .collect();
            entrants
                .iter()
                .zip(ffa_deltas(&rated))
                .map(|(entrant, delta)| ParticipantDelta {
                    user_id: entrant.user_id,
                    team: 0,
                    place: Some(entrant.place),
                    delta,
                })
                .collect()
        }
    }
}
