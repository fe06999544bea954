use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use playlog_core::{sessions_for_subject, OpenStore, Session, SnapshotStore, DEFAULT_QUERY_LIMIT};
use playlog_store::SqliteOpener;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub fn run(config: Option<&Path>, bind: Option<&str>) -> anyhow::Result<()> {
    let (paths, app_config) = super::load(config)?;
    let opener = super::opener(&paths, &app_config);
    let bind = bind.unwrap_or(&app_config.server.bind).to_string();

    super::runtime()?.block_on(serve(bind, opener))
}

async fn serve(bind: String, opener: SqliteOpener) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    tracing::info!(%bind, database = %opener.db_path().display(), "serving session api");
    println!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(opener))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

pub fn router<O: OpenStore>(opener: O) -> Router {
    Router::new()
        .route("/api/sessions", get(sessions::<O>))
        .route("/api/subjects", get(subjects::<O>))
        .with_state(Arc::new(opener))
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    #[serde(alias = "steamid")]
    pub subject_id: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl SessionsQuery {
    /// Absent means the default cap; zero or negative keeps everything
    fn limit(&self) -> Option<usize> {
        match self.limit {
            None => Some(DEFAULT_QUERY_LIMIT),
            Some(n) if n <= 0 => None,
            Some(n) => Some(n as usize),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SubjectEntry {
    pub subject_id: String,
}

/// Store failures surface as 500 with a JSON error body
pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("query failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("{:#}", self.0) })),
        )
            .into_response()
    }
}

async fn sessions<O: OpenStore>(
    State(opener): State<Arc<O>>,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let limit = query.limit();
    let sessions = tokio::task::spawn_blocking(move || {
        let store = opener.open()?;
        sessions_for_subject(&store, &query.subject_id, limit)
    })
    .await??;
    Ok(Json(sessions))
}

async fn subjects<O: OpenStore>(
    State(opener): State<Arc<O>>,
) -> Result<Json<Vec<SubjectEntry>>, ApiError> {
    let ids = tokio::task::spawn_blocking(move || opener.open()?.list_subjects()).await??;
    Ok(Json(
        ids.into_iter()
            .map(|subject_id| SubjectEntry { subject_id })
            .collect(),
    ))
}
