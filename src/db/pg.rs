//! Postgres implementation of the persistence contracts.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{MatchParticipantRow, MatchRow, Rating};
use crate::db::store::{
    clamp_page, MatchRecord, MembershipOracle, StorageError, Store, StoreTx,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl MembershipOracle for PgStore {
    async fn group_exists(&self, group_id: Uuid) -> Result<bool, StorageError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE id = $1)")
                .bind(group_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, StorageError> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(
                   SELECT 1
                     FROM group_members
                    WHERE group_id = $1
                      AND user_id  = $2
               )"#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StorageError> {
        Ok(PgTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn list_matches(
        &self,
        group_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MatchRecord>, StorageError> {
        let (limit, offset) = clamp_page(limit, offset);

        let matches: Vec<MatchRow> = sqlx::query_as(
            r#"SELECT id, group_id, is_tie, winner_id, loser_id,
                      team_a_score, team_b_score, created_at
                 FROM matches
                WHERE group_id = $1
                ORDER BY created_at DESC, id
                LIMIT $2 OFFSET $3"#,
        )
        .bind(group_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = matches.iter().map(|m| m.id).collect();
        let participants: Vec<MatchParticipantRow> = sqlx::query_as(
            r#"SELECT match_id, user_id, team, place
                 FROM match_participants
                WHERE match_id = ANY($1)
                ORDER BY team, place, user_id"#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut by_match: HashMap<Uuid, Vec<MatchParticipantRow>> = HashMap::new();
        for row in participants {
            by_match.entry(row.match_id).or_default().push(row);
        }

        Ok(matches
            .into_iter()
            .map(|summary| MatchRecord {
                participants: by_match.remove(&summary.id).unwrap_or_default(),
                summary,
            })
            .collect())
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn rating_for_update(
        &mut self,
        group_id: Uuid,
        user_id: Uuid,
        default_points: i32,
    ) -> Result<Rating, StorageError> {
        // Materialize the default row first so the FOR UPDATE below always
        // has a row to lock.
        sqlx::query(
            r#"INSERT INTO ratings (user_id, group_id, points, updated_at)
               VALUES ($1, $2, $3, NOW())
               ON CONFLICT (user_id, group_id) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(default_points)
        .execute(&mut *self.tx)
        .await?;

        let rating: Rating = sqlx::query_as(
            r#"SELECT user_id, group_id, points, updated_at
                 FROM ratings
                WHERE user_id = $1
                  AND group_id = $2
                FOR UPDATE"#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(rating)
    }

    async fn save_rating(&mut self, rating: &Rating) -> Result<(), StorageError> {
        sqlx::query(
            r#"UPDATE ratings
                  SET points = $3, updated_at = $4
                WHERE user_id = $1
                  AND group_id = $2"#,
        )
        .bind(rating.user_id)
        .bind(rating.group_id)
        .bind(rating.points)
        .bind(rating.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_match(&mut self, row: &MatchRow) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO matches (id, group_id, is_tie, winner_id, loser_id,
                                    team_a_score, team_b_score, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(row.id)
        .bind(row.group_id)
        .bind(row.is_tie)
        .bind(row.winner_id)
        .bind(row.loser_id)
        .bind(row.team_a_score)
        .bind(row.team_b_score)
        .bind(row.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_participants(
        &mut self,
        rows: &[MatchParticipantRow],
    ) -> Result<(), StorageError> {
        for row in rows {
            sqlx::query(
                r#"INSERT INTO match_participants (match_id, user_id, team, place)
                   VALUES ($1, $2, $3, $4)"#,
            )
            .bind(row.match_id)
            .bind(row.user_id)
            .bind(row.team)
            .bind(row.place)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }
}
