//! HTTP API over [`MirrorService`].
//!
//! Every response uses the same envelope: `{"success", "message", "data"}`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hubmirror::service::{MirrorService, ServiceError};
use hubmirror::store::RepositoryFilter;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    fn ok(message: &str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        })
    }
}

pub(crate) enum ApiError {
    BadRequest(String),
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Service(err @ ServiceError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Service(err) if err.is_not_found() => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Service(err) => {
                tracing::error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        let body = Envelope::<()> {
            success: false,
            message,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub(crate) fn router(service: MirrorService) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/authors/top/{n}", get(top_authors))
        .route("/{owner}/repos", get(list_repositories))
        .route("/{owner}/repos/{repo}", get(get_repository))
        .route("/{owner}/repos/{repo}/commits", get(list_commits))
        .route("/{owner}/repos/{repo}/commits/reset/{sha}", get(request_reset))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    full_name: String,
}

async fn register(
    State(service): State<MirrorService>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> ApiResult<hubmirror::UserModel> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(format!("Invalid payload: {e}")))?;
    if payload.username.trim().is_empty() || payload.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid payload: username and full_name are required".to_string(),
        ));
    }
    let user = service
        .register_user(payload.username.trim(), Some(&payload.full_name))
        .await?;
    Ok(Envelope::ok("User registered successfully", user))
}

/// Query string of the repository listing. Unparseable `top_stars` is ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RepositoryQuery {
    name: Option<String>,
    language: Option<String>,
    top_stars: Option<String>,
}

impl RepositoryQuery {
    fn into_filter(self) -> RepositoryFilter {
        RepositoryFilter {
            name: self.name.filter(|n| !n.is_empty()),
            language: self.language.filter(|l| !l.is_empty()),
            top_stars: self
                .top_stars
                .and_then(|n| n.trim().parse::<u64>().ok())
                .filter(|n| *n > 0),
        }
    }
}

async fn list_repositories(
    State(service): State<MirrorService>,
    Path(owner): Path<String>,
    Query(query): Query<RepositoryQuery>,
) -> ApiResult<Vec<hubmirror::RepositoryModel>> {
    let repositories = service
        .list_user_repositories(&owner, &query.into_filter())
        .await?;
    Ok(Envelope::ok("Repositories fetched successfully", repositories))
}

async fn get_repository(
    State(service): State<MirrorService>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<hubmirror::RepositoryModel> {
    let repository = service.get_repository(&owner, &repo).await?;
    Ok(Envelope::ok("Repository fetched successfully", repository))
}

async fn list_commits(
    State(service): State<MirrorService>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Vec<hubmirror::CommitModel>> {
    let commits = service.list_commits(&owner, &repo).await?;
    Ok(Envelope::ok("Repository commits fetched successfully", commits))
}

async fn request_reset(
    State(service): State<MirrorService>,
    Path((owner, repo, sha)): Path<(String, String, String)>,
) -> ApiResult<()> {
    service.request_reset(&owner, &repo, &sha).await?;
    Ok(Envelope::ok("Reset request accepted", ()))
}

async fn top_authors(
    State(service): State<MirrorService>,
    Path(n): Path<String>,
) -> ApiResult<Vec<hubmirror::AuthorCommitCountModel>> {
    let n = n
        .parse::<u64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid count '{n}'")))?;
    let authors = service.top_authors(n).await?;
    Ok(Envelope::ok("Top authors fetched successfully", authors))
}
