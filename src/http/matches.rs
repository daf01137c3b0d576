//! Match submission and group match history.

use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::pg::PgStore;
use crate::db::store::MatchRecord;
use crate::http::auth::JwtAuth;
use crate::rating::outcome::MatchSubmission;
use crate::rating::recorder::{self, RecordError};

#[derive(Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Serialize)]
pub struct ParticipantView {
    pub user_id: Uuid,
    pub team: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<i32>,
}

#[derive(Serialize)]
pub struct MatchView {
    pub id: Uuid,
    pub is_tie: bool,
    pub winner_id: Option<Uuid>,
    pub loser_id: Option<Uuid>,
    pub team_a_score: Option<i32>,
    pub team_b_score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<ParticipantView>,
}

impl From<MatchRecord> for MatchView {
    fn from(record: MatchRecord) -> Self {
        MatchView {
            id: record.summary.id,
            is_tie: record.summary.is_tie,
            winner_id: record.summary.winner_id,
            loser_id: record.summary.loser_id,
            team_a_score: record.summary.team_a_score,
            team_b_score: record.summary.team_b_score,
            created_at: record.summary.created_at,
            participants: record
                .participants
                .into_iter()
                .map(|p| ParticipantView {
                    user_id: p.user_id,
                    team: p.team,
                    place: p.place,
                })
                .collect(),
        }
    }
}

fn error_response(err: RecordError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match &err {
        RecordError::GroupNotFound => HttpResponse::NotFound().json(body),
        RecordError::NotAMember(_) => HttpResponse::Forbidden().json(body),
        RecordError::InvalidOutcome(_) => HttpResponse::UnprocessableEntity().json(body),
        RecordError::Storage(e) => {
            log::error!("match storage failure: {e}");
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// POST /api/groups/{group_id}/matches
#[post("/groups/{group_id}/matches")]
pub async fn submit(
    path: web::Path<Uuid>,
    auth: JwtAuth,
    info: web::Json<MatchSubmission>,
    store: web::Data<PgStore>,
) -> impl Responder {
    match recorder::record_match(store.get_ref(), path.into_inner(), auth.user_id, &info).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(e),
    }
}

/// GET /api/groups/{group_id}/matches
#[get("/groups/{group_id}/matches")]
pub async fn history(
    path: web::Path<Uuid>,
    auth: JwtAuth,
    web::Query(params): web::Query<HistoryParams>,
    store: web::Data<PgStore>,
) -> impl Responder {
    match recorder::list_group_matches(
        store.get_ref(),
        path.into_inner(),
        auth.user_id,
        params.limit,
        params.offset,
    )
    .await
    {
        Ok(records) => {
            let views: Vec<MatchView> = records.into_iter().map(MatchView::from).collect();
            HttpResponse::Ok().json(views)
        }
        Err(e) => error_response(e),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(submit).service(history);
}
