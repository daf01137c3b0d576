//! Per-group standings, best rating first.

use actix_web::{get, web, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct LeaderboardParams {
    /// Maximum number of entries to return.
    pub limit: i64,
}

#[get("/groups/{group_id}/leaderboard")]
pub async fn leaderboard(
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
    web::Query(params): web::Query<LeaderboardParams>,
) -> impl Responder {
    let rows: Vec<(Uuid, String, i32)> = match sqlx::query_as::<_, (Uuid, String, i32)>(
        r#"
        SELECT r.user_id, u.username, r.points
          FROM ratings r
          JOIN users u ON u.id = r.user_id
         WHERE r.group_id = $1
         ORDER BY r.points DESC, u.username
         LIMIT $2
        "#,
    )
    .bind(path.into_inner())
    .bind(params.limit)
    .fetch_all(db.get_ref())
    .await
    {
        Ok(r) => r,
        Err(_) => return HttpResponse::InternalServerError().body("DB error"),
    };

    HttpResponse::Ok().json(rows)
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(leaderboard);
}
