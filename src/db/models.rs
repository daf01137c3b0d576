use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub sport: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// One rating per (user, group) pair, created lazily on first participation.
#[derive(Debug, Clone, FromRow)]
pub struct Rating {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub points: i32,
    pub updated_at: DateTime<Utc>,
}

/// A recorded match. Immutable once inserted.
///
/// `winner_id` / `loser_id` hold a single representative (the first listed
/// member of a winning team, or the sole best-placed free-for-all player);
/// the full roster lives in `match_participants`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MatchRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub is_tie: bool,
    pub winner_id: Option<Uuid>,
    pub loser_id: Option<Uuid>,
    pub team_a_score: Option<i32>,
    pub team_b_score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// One row per player involved in a match.
///
/// `team` is 0 for free-for-all, 1 for side A, 2 for side B. `place` is set
/// exactly when `team` is 0 (1 = best finish, equal places allowed).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MatchParticipantRow {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub team: i16,
    pub place: Option<i32>,
}
