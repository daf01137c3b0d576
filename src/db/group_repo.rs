//! Group and membership queries backing the HTTP collaborator endpoints.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Returns true if the given user belongs to the given group.
pub async fn is_member(db: &PgPool, group: Uuid, user: Uuid) -> Result<bool> {
    sqlx::query_scalar(
        r#"SELECT EXISTS(
               SELECT 1
                 FROM group_members
                WHERE group_id = $1
                  AND user_id  = $2
           )"#,
    )
    .bind(group)
    .bind(user)
    .fetch_one(db)
    .await
    .context("checking group membership")
}

pub async fn group_exists(db: &PgPool, group: Uuid) -> Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE id = $1)")
        .bind(group)
        .fetch_one(db)
        .await
        .context("checking group existence")
}

/// Add a user to a group. A second join is a no-op.
pub async fn join_group(db: &PgPool, group: Uuid, user: Uuid) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO group_members (group_id, user_id, role)
           VALUES ($1, $2, 'member')
           ON CONFLICT DO NOTHING"#,
    )
    .bind(group)
    .bind(user)
    .execute(db)
    .await
    .context("joining group")?;
    Ok(())
}

/// Remove a user from a group together with their rating there.
/// Returns false if the user was not a member.
pub async fn leave_group(db: &PgPool, group: Uuid, user: Uuid) -> Result<bool> {
    let mut tx = db.begin().await?;

    let rows = sqlx::query(
        "DELETE FROM group_members
          WHERE group_id = $1 AND user_id = $2",
    )
    .bind(group)
    .bind(user)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query(
        "DELETE FROM ratings
          WHERE group_id = $1 AND user_id = $2",
    )
    .bind(group)
    .bind(user)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(rows > 0)
}

/// (user_id, username, role, joined_at) for every member of a group.
pub async fn group_members(
    db: &PgPool,
    group: Uuid,
) -> Result<Vec<(Uuid, String, String, DateTime<Utc>)>> {
    sqlx::query_as(
        r#"SELECT gm.user_id, u.username, gm.role, gm.joined_at
             FROM group_members gm
             JOIN users u ON u.id = gm.user_id
            WHERE gm.group_id = $1
            ORDER BY gm.role DESC, u.username"#,
    )
    .bind(group)
    .fetch_all(db)
    .await
    .context("listing group members")
}
