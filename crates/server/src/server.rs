use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{balances, expenses, groups, payments, settlements, sync, user};
use engine::{Engine, SyncOrchestrator};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub sync: Arc<SyncOrchestrator>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = if let Some(user) = user {
        user
    } else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/groups", post(groups::create))
        .route(
            "/groups/{group_id}/members",
            get(groups::list_members).post(groups::add_member),
        )
        .route("/groups/{group_id}/balances", get(balances::list))
        .route("/groups/{group_id}/settlement", get(settlements::plan))
        .route(
            "/groups/{group_id}/recalculate",
            post(balances::recalculate),
        )
        .route("/expenses", post(expenses::create).get(expenses::list))
        .route(
            "/expenses/{expense_id}",
            axum::routing::patch(expenses::update).delete(expenses::delete),
        )
        .route("/payments", post(payments::create).get(payments::list))
        .route("/queue", post(sync::enqueue))
        .route("/sync", post(sync::sync_now))
        .route("/sync/status", get(sync::status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Arc<Engine>, sync: Arc<SyncOrchestrator>, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, sync, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    sync: Arc<SyncOrchestrator>,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine, sync, db };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Arc<Engine>,
    sync: Arc<SyncOrchestrator>,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, sync, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement};
    use tower::ServiceExt;

    use super::*;
    use engine::MutationQueue;

    async fn test_state() -> ServerState {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let backend = db.get_database_backend();
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec!["alice".into(), "password".into()],
        ))
        .await
        .unwrap();

        let engine = Arc::new(
            Engine::builder()
                .database(db.clone())
                .build()
                .await
                .unwrap(),
        );
        let queue_db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&queue_db, None).await.unwrap();
        let queue = Arc::new(MutationQueue::new(queue_db));
        let sync = Arc::new(SyncOrchestrator::new(engine.clone(), queue));

        ServerState { engine, sync, db }
    }

    fn basic_auth(username: &str, password: &str) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        format!("Basic {encoded}")
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected() {
        let app = router(test_state().await);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/groups")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Trip"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = router(test_state().await);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/groups")
                    .header(header::AUTHORIZATION, basic_auth("alice", "wrong"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Trip"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_user_can_create_group_and_read_settlement() {
        let app = router(test_state().await);

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/groups")
                    .header(header::AUTHORIZATION, basic_auth("alice", "password"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Trip"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let group_id = created["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("GET")
                    .uri(format!("/groups/{group_id}/settlement"))
                    .header(header::AUTHORIZATION, basic_auth("alice", "password"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let plan: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(plan["transfers"].as_array().unwrap().len(), 0);
    }
}
