//! Group management (create / join / leave / list / members).

use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::group_repo;
use crate::http::auth::JwtAuth;

//////////////////////////////////////////////////
// Data transfer objects
//////////////////////////////////////////////////

#[derive(Serialize, sqlx::FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub sport: String,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct MemberRow {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

//////////////////////////////////////////////////
// Requests
//////////////////////////////////////////////////

#[derive(Deserialize)]
pub struct CreateReq {
    pub name: String,
    pub sport: String,
}

//////////////////////////////////////////////////
// Handlers
//////////////////////////////////////////////////

/// POST /api/groups
#[post("/groups")]
pub async fn create(
    info: web::Json<CreateReq>,
    auth: JwtAuth,
    db: web::Data<PgPool>,
) -> impl Responder {
    let name = info.name.trim();
    if name.is_empty() || info.sport.trim().is_empty() {
        return HttpResponse::BadRequest().body("name and sport are required");
    }

    let mut tx = match db.begin().await {
        Ok(t) => t,
        Err(_) => return HttpResponse::InternalServerError().finish(),
    };

    let gid = Uuid::new_v4();
    match sqlx::query(
        r#"INSERT INTO groups (id, name, sport)
           VALUES ($1, $2, $3)"#,
    )
    .bind(gid)
    .bind(name)
    .bind(info.sport.trim())
    .execute(&mut *tx)
    .await
    {
        Ok(_) => {}
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some("23505".into()) => {
            return HttpResponse::BadRequest().body("name already taken")
        }
        Err(_) => return HttpResponse::InternalServerError().finish(),
    }

    let _ = sqlx::query(
        "INSERT INTO group_members (group_id, user_id, role)
         VALUES ($1, $2, 'owner')",
    )
    .bind(gid)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await;

    tx.commit().await.ok();
    HttpResponse::Ok().json(serde_json::json!({ "group_id": gid }))
}

/// GET /api/groups
#[get("/groups")]
pub async fn list(db: web::Data<PgPool>) -> impl Responder {
    let rows: Vec<GroupRow> = sqlx::query_as(
        r#"
        SELECT g.id, g.name, g.sport,
               COUNT(m.user_id) AS member_count,
               g.created_at
          FROM groups g
          LEFT JOIN group_members m ON m.group_id = g.id
         GROUP BY g.id
         ORDER BY g.created_at
        "#,
    )
    .fetch_all(&**db)
    .await
    .unwrap_or_default();

    HttpResponse::Ok().json(rows)
}

/// POST /api/groups/{group_id}/join
#[post("/groups/{group_id}/join")]
pub async fn join(path: web::Path<Uuid>, auth: JwtAuth, db: web::Data<PgPool>) -> impl Responder {
    let gid = path.into_inner();
    match group_repo::group_exists(&db, gid).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body("no such group"),
        Err(_) => return HttpResponse::InternalServerError().finish(),
    }
    match group_repo::join_group(&db, gid, auth.user_id).await {
        Ok(_) => HttpResponse::Ok().body("joined"),
        Err(e) => {
            log::warn!("join failed: {e:?}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// POST /api/groups/{group_id}/leave
#[post("/groups/{group_id}/leave")]
pub async fn leave(path: web::Path<Uuid>, auth: JwtAuth, db: web::Data<PgPool>) -> impl Responder {
    match group_repo::leave_group(&db, path.into_inner(), auth.user_id).await {
        Ok(true) => HttpResponse::Ok().body("left"),
        Ok(false) => HttpResponse::BadRequest().body("not a member"),
        Err(e) => {
            log::warn!("leave failed: {e:?}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// GET /api/groups/{group_id}/members
#[get("/groups/{group_id}/members")]
pub async fn members(path: web::Path<Uuid>, db: web::Data<PgPool>) -> impl Responder {
    let gid = path.into_inner();
    match group_repo::group_exists(&db, gid).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body("no such group"),
        Err(_) => return HttpResponse::InternalServerError().finish(),
    }

    let rows = match group_repo::group_members(&db, gid).await {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("member listing failed: {e:?}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let members: Vec<MemberRow> = rows
        .into_iter()
        .map(|(user_id, username, role, joined_at)| MemberRow {
            user_id,
            username,
            role,
            joined_at,
        })
        .collect();

    HttpResponse::Ok().json(members)
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create)
        .service(list)
        .service(join)
        .service(leave)
        .service(members);
}
