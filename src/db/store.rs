//! Persistence contracts for the rating table and the match log.
//!
//! The match recorder talks to storage exclusively through these traits so
//! the read-modify-write over rating rows stays inside one transaction
//! handle. Dropping an uncommitted [`StoreTx`] rolls everything back.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{MatchParticipantRow, MatchRow, Rating};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found")]
    NotFound,

    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// Hard cap on a single match-history page.
pub const PAGE_LIMIT_MAX: i64 = 100;

/// Clamp caller-supplied paging to `1 <= limit <= 100`, `offset >= 0`.
pub fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, PAGE_LIMIT_MAX), offset.max(0))
}

/// Answers group-existence and membership questions.
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn group_exists(&self, group_id: Uuid) -> Result<bool, StorageError>;

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StorageError>;
}

/// A match together with its full participant roster.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub summary: MatchRow,
    pub participants: Vec<MatchParticipantRow>,
}

#[async_trait]
pub trait Store: Send + Sync {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx, StorageError>;

    /// Matches of a group, newest first, participants embedded.
    async fn list_matches(
        &self,
        group_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MatchRecord>, StorageError>;
}

#[async_trait]
pub trait StoreTx: Send {
    /// Load the rating row for (user, group), inserting a fresh row at
    /// `default_points` if none exists yet. The row stays locked against
    /// concurrent writers until the transaction ends.
    async fn rating_for_update(
        &mut self,
        group_id: Uuid,
        user_id: Uuid,
        default_points: i32,
    ) -> Result<Rating, StorageError>;

    async fn save_rating(&mut self, rating: &Rating) -> Result<(), StorageError>;

    async fn insert_match(&mut self, row: &MatchRow) -> Result<(), StorageError>;

    async fn insert_participants(
        &mut self,
        rows: &[MatchParticipantRow],
    ) -> Result<(), StorageError>;

    async fn commit(self) -> Result<(), StorageError>;
}
