//! Turns a submitted outcome into committed ratings plus a match record.
//!
//! This is the only write path for ratings. Validation happens entirely
//! before the transaction opens; the load/compute/write phase runs on one
//! transaction handle, so an error on any step rolls the whole submission
//! back with no partial state.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{MatchParticipantRow, MatchRow};
use crate::db::store::{MatchRecord, MembershipOracle, StorageError, Store, StoreTx};
use crate::rating::engine::{self, DEFAULT_POINTS};
use crate::rating::outcome::{MatchOutcome, MatchSubmission, ShapeError, SideResult};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("group not found")]
    GroupNotFound,

    #[error("{0} is not a member of this group")]
    NotAMember(Uuid),

    #[error(transparent)]
    InvalidOutcome(#[from] ShapeError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Serialize)]
pub struct ParticipantResult {
    pub user_id: Uuid,
    /// Post-match rating.
    pub points: i32,
    pub delta: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct MatchResult {
    pub match_id: Uuid,
    pub tie: bool,
    pub participants: Vec<ParticipantResult>,
}

/// Validate a submission, update every participant's rating and append the
/// match to the group's history, all inside one transaction.
pub async fn record_match<S>(
    store: &S,
    group_id: Uuid,
    caller_id: Uuid,
    submission: &MatchSubmission,
) -> Result<MatchResult, RecordError>
where
    S: Store + MembershipOracle,
{
    if !store.group_exists(group_id).await? {
        return Err(RecordError::GroupNotFound);
    }
    if !store.is_member(group_id, caller_id).await? {
        return Err(RecordError::NotAMember(caller_id));
    }

    let resolved = submission.resolve()?;
    let participants = resolved.outcome.participants();
    for user_id in &participants {
        if !store.is_member(group_id, *user_id).await? {
            return Err(RecordError::NotAMember(*user_id));
        }
    }

    let mut tx = store.begin().await?;

    // Lock rating rows in ascending user order so two submissions sharing
    // players cannot deadlock against each other.
    let mut ordered = participants.clone();
    ordered.sort();
    let mut ratings = HashMap::with_capacity(ordered.len());
    for user_id in &ordered {
        let rating = tx
            .rating_for_update(group_id, *user_id, DEFAULT_POINTS)
            .await?;
        ratings.insert(*user_id, rating);
    }

    let pre_match: HashMap<Uuid, i32> = ratings.iter().map(|(u, r)| (*u, r.points)).collect();
    let deltas = engine::compute_deltas(&resolved.outcome, &pre_match, DEFAULT_POINTS);

    let now = Utc::now();
    let mut results = Vec::with_capacity(deltas.len());
    for entry in &deltas {
        let rating = ratings
            .get_mut(&entry.user_id)
            .ok_or(StorageError::NotFound)?;
        rating.points += entry.delta;
        rating.updated_at = now;
        tx.save_rating(rating).await?;
        results.push(ParticipantResult {
            user_id: entry.user_id,
            points: rating.points,
            delta: entry.delta,
            place: entry.place,
        });
    }

    let (is_tie, winner_id, loser_id) = headline(&resolved.outcome);
    let match_row = MatchRow {
        id: Uuid::new_v4(),
        group_id,
        is_tie,
        winner_id,
        loser_id,
        team_a_score: resolved.team_a_score,
        team_b_score: resolved.team_b_score,
        created_at: now,
    };
    tx.insert_match(&match_row).await?;

    let participant_rows: Vec<MatchParticipantRow> = deltas
        .iter()
        .map(|entry| MatchParticipantRow {
            match_id: match_row.id,
            user_id: entry.user_id,
            team: entry.team,
            place: entry.place,
        })
        .collect();
    tx.insert_participants(&participant_rows).await?;

    tx.commit().await?;

    Ok(MatchResult {
        match_id: match_row.id,
        tie: is_tie,
        participants: results,
    })
}

/// Member-only view of a group's match history, newest first.
pub async fn list_group_matches<S>(
    store: &S,
    group_id: Uuid,
    caller_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<MatchRecord>, RecordError>
where
    S: Store + MembershipOracle,
{
    if !store.group_exists(group_id).await? {
        return Err(RecordError::GroupNotFound);
    }
    if !store.is_member(group_id, caller_id).await? {
        return Err(RecordError::NotAMember(caller_id));
    }
    Ok(store.list_matches(group_id, limit, offset).await?)
}

/// Derive the headline fields stored on the match row.
///
/// Teams get a single representative per side (the first listed member);
/// a free-for-all gets the sole holder of the best place, or `is_tie` when
/// several players share it.
fn headline(outcome: &MatchOutcome) -> (bool, Option<Uuid>, Option<Uuid>) {
    match outcome {
        MatchOutcome::Duel { a, b, result } => match result {
            SideResult::AWins => (false, Some(*a), Some(*b)),
            SideResult::BWins => (false, Some(*b), Some(*a)),
            SideResult::Draw => (true, None, None),
        },
        MatchOutcome::Team {
            side_a,
            side_b,
            result,
        } => match result {
            SideResult::AWins => (false, side_a.first().copied(), side_b.first().copied()),
            SideResult::BWins => (false, side_b.first().copied(), side_a.first().copied()),
            SideResult::Draw => (true, None, None),
        },
        MatchOutcome::FreeForAll { entrants } => {
            let best = entrants.iter().map(|e| e.place).min().unwrap_or(1);
            let worst = entrants.iter().map(|e| e.place).max().unwrap_or(1);
            let mut at_best = entrants.iter().filter(|e| e.place == best);
            let mut at_worst = entrants.iter().filter(|e| e.place == worst);

            let winner = match (at_best.next(), at_best.next()) {
                (Some(sole), None) => Some(sole.user_id),
                _ => None,
            };
            let loser = if worst == best {
                None
            } else {
                match (at_worst.next(), at_worst.next()) {
                    (Some(sole), None) => Some(sole.user_id),
                    _ => None,
                }
            };
            (winner.is_none(), winner, loser)
        }
    }
}
