//! Submitted-outcome validation.
//!
//! A caller posts a [`MatchSubmission`] whose optional fields describe one of
//! three match shapes. [`MatchSubmission::resolve`] decides the shape once
//! and produces a tagged [`MatchOutcome`]; everything downstream dispatches
//! on the enum instead of re-checking field presence.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("outcome does not match any supported match shape")]
    Unrecognized,

    #[error("a player cannot play against themselves")]
    SelfPlay,

    #[error("a tie duel needs exactly two distinct player ids")]
    BadTiePair,

    #[error("teams must be non-empty and of equal size")]
    UnevenTeams,

    #[error("a player may be listed only once per match")]
    DuplicatePlayer,

    #[error("winning_team must be 1 or 2")]
    BadWinningTeam,

    #[error("a free-for-all needs at least two players")]
    TooFewPlayers,

    #[error("the winner must be among the listed players")]
    WinnerNotListed,

    #[error("places must be positive integers")]
    BadPlace,

    #[error("`{0}` is not a whole number")]
    BadNumber(String),
}

/// Result of a two-sided match, seen from side A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideResult {
    AWins,
    BWins,
    Draw,
}

impl SideResult {
    /// Actual scores `(S_a, S_b)` fed into the Elo update.
    pub fn scores(self) -> (f64, f64) {
        match self {
            SideResult::AWins => (1.0, 0.0),
            SideResult::BWins => (0.0, 1.0),
            SideResult::Draw => (0.5, 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FfaEntrant {
    pub user_id: Uuid,
    /// Finish place, 1 = best. Equal places are allowed.
    pub place: i32,
}

/// Validated match shape. Constructed once, then matched exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Duel {
        a: Uuid,
        b: Uuid,
        result: SideResult,
    },
    Team {
        side_a: Vec<Uuid>,
        side_b: Vec<Uuid>,
        result: SideResult,
    },
    FreeForAll {
        entrants: Vec<FfaEntrant>,
    },
}

impl MatchOutcome {
    /// Every user involved, in roster order.
    pub fn participants(&self) -> Vec<Uuid> {
        match self {
            MatchOutcome::Duel { a, b, .. } => vec![*a, *b],
            MatchOutcome::Team { side_a, side_b, .. } => {
                side_a.iter().chain(side_b.iter()).copied().collect()
            }
            MatchOutcome::FreeForAll { entrants } => {
                entrants.iter().map(|e| e.user_id).collect()
            }
        }
    }
}

/// Raw submission payload. Which fields are present decides the shape:
/// `free_for_all` wins, then the team arrays, then the duel fields.
#[derive(Debug, Default, Deserialize)]
pub struct MatchSubmission {
    #[serde(default)]
    pub winner_id: Option<Uuid>,
    #[serde(default)]
    pub loser_id: Option<Uuid>,
    #[serde(default)]
    pub tie: Option<bool>,
    /// Duel tie pair, or the free-for-all roster.
    #[serde(default)]
    pub player_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub team_a: Option<Vec<Uuid>>,
    #[serde(default)]
    pub team_b: Option<Vec<Uuid>>,
    /// 1 or 2; accepts a JSON number or a numeric string.
    #[serde(default)]
    pub winning_team: Option<Value>,
    #[serde(default)]
    pub free_for_all: Option<bool>,
    /// Finish place per player id.
    #[serde(default)]
    pub places: Option<BTreeMap<Uuid, Value>>,
    /// Best-to-worst finish order; places are derived as 1, 2, 3, ...
    #[serde(default)]
    pub finish_order: Option<Vec<Uuid>>,
    #[serde(default)]
    pub team_a_score: Option<Value>,
    #[serde(default)]
    pub team_b_score: Option<Value>,
}

/// A submission after shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutcome {
    pub outcome: MatchOutcome,
    pub team_a_score: Option<i32>,
    pub team_b_score: Option<i32>,
}

impl MatchSubmission {
    pub fn resolve(&self) -> Result<ResolvedOutcome, ShapeError> {
        // Scorelines are parsed up front so malformed numbers are rejected
        // no matter which shape the rest of the payload takes.
        let team_a_score = parse_optional_int("team_a_score", self.team_a_score.as_ref())?;
        let team_b_score = parse_optional_int("team_b_score", self.team_b_score.as_ref())?;

        let outcome = if self.free_for_all.unwrap_or(false) {
            self.resolve_free_for_all()?
        } else if self.team_a.is_some() || self.team_b.is_some() {
            self.resolve_team()?
        } else {
            self.resolve_duel()?
        };

        Ok(ResolvedOutcome {
            outcome,
            team_a_score,
            team_b_score,
        })
    }

    fn resolve_duel(&self) -> Result<MatchOutcome, ShapeError> {
        if self.tie == Some(true) {
            let pair = self.player_ids.as_deref().ok_or(ShapeError::BadTiePair)?;
            let [a, b] = pair else {
                return Err(ShapeError::BadTiePair);
            };
            if a == b {
                return Err(ShapeError::SelfPlay);
            }
            return Ok(MatchOutcome::Duel {
                a: *a,
                b: *b,
                result: SideResult::Draw,
            });
        }

        match (self.winner_id, self.loser_id) {
            (Some(winner), Some(loser)) => {
                if winner == loser {
                    return Err(ShapeError::SelfPlay);
                }
                Ok(MatchOutcome::Duel {
                    a: winner,
                    b: loser,
                    result: SideResult::AWins,
                })
            }
            _ => Err(ShapeError::Unrecognized),
        }
    }

    fn resolve_team(&self) -> Result<MatchOutcome, ShapeError> {
        let side_a = self.team_a.clone().unwrap_or_default();
        let side_b = self.team_b.clone().unwrap_or_default();
        if side_a.is_empty() || side_b.is_empty() || side_a.len() != side_b.len() {
            return Err(ShapeError::UnevenTeams);
        }
        ensure_distinct(side_a.iter().chain(side_b.iter()))?;

        let result = if self.tie == Some(true) {
            SideResult::Draw
        } else {
            let selector = self
                .winning_team
                .as_ref()
                .ok_or(ShapeError::Unrecognized)?;
            match parse_int("winning_team", selector)? {
                1 => SideResult::AWins,
                2 => SideResult::BWins,
                _ => return Err(ShapeError::BadWinningTeam),
            }
        };

        Ok(MatchOutcome::Team {
            side_a,
            side_b,
            result,
        })
    }

    fn resolve_free_for_all(&self) -> Result<MatchOutcome, ShapeError> {
        let mut entrants: Vec<FfaEntrant> = if let Some(places) = &self.places {
            let mut entrants = Vec::with_capacity(places.len());
            for (user_id, raw) in places {
                let place = parse_place(raw)?;
                entrants.push(FfaEntrant {
                    user_id: *user_id,
                    place,
                });
            }
            entrants
        } else if let Some(order) = &self.finish_order {
            order
                .iter()
                .enumerate()
                .map(|(i, user_id)| FfaEntrant {
                    user_id: *user_id,
                    place: i as i32 + 1,
                })
                .collect()
        } else if let (Some(winner), Some(roster)) = (self.winner_id, &self.player_ids) {
            if !roster.contains(&winner) {
                return Err(ShapeError::WinnerNotListed);
            }
            roster
                .iter()
                .map(|user_id| FfaEntrant {
                    user_id: *user_id,
                    place: if *user_id == winner { 1 } else { 2 },
                })
                .collect()
        } else {
            return Err(ShapeError::Unrecognized);
        };

        if entrants.len() < 2 {
            return Err(ShapeError::TooFewPlayers);
        }
        ensure_distinct(entrants.iter().map(|e| &e.user_id))?;
        entrants.sort_by_key(|e| (e.place, e.user_id));

        Ok(MatchOutcome::FreeForAll { entrants })
    }
}

fn ensure_distinct<'a>(ids: impl Iterator<Item = &'a Uuid>) -> Result<(), ShapeError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(*id) {
            return Err(ShapeError::DuplicatePlayer);
        }
    }
    Ok(())
}

/// Accepts a JSON number or a numeric string; anything else is rejected.
fn parse_int(field: &str, value: &Value) -> Result<i64, ShapeError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| ShapeError::BadNumber(field.into())),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ShapeError::BadNumber(field.into())),
        _ => Err(ShapeError::BadNumber(field.into())),
    }
}

fn parse_optional_int(field: &str, value: Option<&Value>) -> Result<Option<i32>, ShapeError> {
    value
        .map(|v| {
            let n = parse_int(field, v)?;
            i32::try_from(n).map_err(|_| ShapeError::BadNumber(field.into()))
        })
        .transpose()
}

fn parse_place(value: &Value) -> Result<i32, ShapeError> {
    let n = parse_int("places", value)?;
    i32::try_from(n)
        .ok()
        .filter(|p| *p >= 1)
        .ok_or(ShapeError::BadPlace)
}
