//! In-memory implementation of the persistence contracts for tests.
//!
//! A transaction takes the whole-store lock and stages its writes, applying
//! them on commit only. That gives the same serializable behavior the
//! Postgres row locks provide for overlapping participants, without needing
//! a database in the test environment.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use head2head_server::db::models::{MatchParticipantRow, MatchRow, Rating};
use head2head_server::db::store::{
    clamp_page, MatchRecord, MembershipOracle, StorageError, Store, StoreTx,
};

#[derive(Default)]
pub struct MemState {
    groups: Vec<Uuid>,
    members: HashMap<Uuid, Vec<Uuid>>,
    ratings: HashMap<(Uuid, Uuid), Rating>, // keyed by (user, group)
    matches: Vec<MatchRow>,
    participants: Vec<MatchParticipantRow>,
}

#[derive(Clone, Default)]
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_group(&self, group: Uuid) {
        self.state.lock().await.groups.push(group);
    }

    pub async fn add_member(&self, group: Uuid, user: Uuid) {
        self.state
            .lock()
            .await
            .members
            .entry(group)
            .or_default()
            .push(user);
    }

    pub async fn points(&self, group: Uuid, user: Uuid) -> Option<i32> {
        self.state
            .lock()
            .await
            .ratings
            .get(&(user, group))
            .map(|r| r.points)
    }

    pub async fn rating_count(&self) -> usize {
        self.state.lock().await.ratings.len()
    }

    pub async fn match_count(&self) -> usize {
        self.state.lock().await.matches.len()
    }

    pub async fn participant_count(&self) -> usize {
        self.state.lock().await.participants.len()
    }
}

pub struct MemTx {
    guard: OwnedMutexGuard<MemState>,
    staged_ratings: HashMap<(Uuid, Uuid), Rating>,
    staged_matches: Vec<MatchRow>,
    staged_participants: Vec<MatchParticipantRow>,
}

#[async_trait]
impl MembershipOracle for MemStore {
    async fn group_exists(&self, group_id: Uuid) -> Result<bool, StorageError> {
        Ok(self.state.lock().await.groups.contains(&group_id))
    }

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StorageError> {
        Ok(self
            .state
            .lock()
            .await
            .members
            .get(&group_id)
            .map_or(false, |m| m.contains(&user_id)))
    }
}

#[async_trait]
impl Store for MemStore {
    type Tx = MemTx;

    async fn begin(&self) -> Result<MemTx, StorageError> {
        Ok(MemTx {
            guard: self.state.clone().lock_owned().await,
            staged_ratings: HashMap::new(),
            staged_matches: Vec::new(),
            staged_participants: Vec::new(),
        })
    }

    async fn list_matches(
        &self,
        group_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MatchRecord>, StorageError> {
        let (limit, offset) = clamp_page(limit, offset);
        let state = self.state.lock().await;

        let mut summaries: Vec<MatchRow> = state
            .matches
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(summaries
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|summary| MatchRecord {
                participants: state
                    .participants
                    .iter()
                    .filter(|p| p.match_id == summary.id)
                    .cloned()
                    .collect(),
                summary,
            })
            .collect())
    }
}

#[async_trait]
impl StoreTx for MemTx {
    async fn rating_for_update(
        &mut self,
        group_id: Uuid,
        user_id: Uuid,
        default_points: i32,
    ) -> Result<Rating, StorageError> {
        let key = (user_id, group_id);
        if let Some(rating) = self.staged_ratings.get(&key) {
            return Ok(rating.clone());
        }
        let rating = self.guard.ratings.get(&key).cloned().unwrap_or(Rating {
            user_id,
            group_id,
            points: default_points,
            updated_at: Utc::now(),
        });
        self.staged_ratings.insert(key, rating.clone());
        Ok(rating)
    }

    async fn save_rating(&mut self, rating: &Rating) -> Result<(), StorageError> {
        self.staged_ratings
            .insert((rating.user_id, rating.group_id), rating.clone());
        Ok(())
    }

    async fn insert_match(&mut self, row: &MatchRow) -> Result<(), StorageError> {
        self.staged_matches.push(row.clone());
        Ok(())
    }

    async fn insert_participants(
        &mut self,
        rows: &[MatchParticipantRow],
    ) -> Result<(), StorageError> {
        self.staged_participants.extend_from_slice(rows);
        Ok(())
    }

    async fn commit(self) -> Result<(), StorageError> {
        let MemTx {
            mut guard,
            staged_ratings,
            staged_matches,
            staged_participants,
        } = self;
        for (key, rating) in staged_ratings {
            guard.ratings.insert(key, rating);
        }
        guard.matches.extend(staged_matches);
        guard.participants.extend(staged_participants);
        Ok(())
    }
}
