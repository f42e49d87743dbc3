//! HTTP interface: one-shot generation plus per-client wizard sessions.
//!
//! Sessions live in a concurrent map keyed by UUID. Each handler mutates only
//! its own entry and never holds the entry across an await point. Generation
//! runs on the blocking pool against a copy of the session, which is written
//! back when it succeeds. Sessions idle longer than the configured TTL are
//! dropped together with their stored uploads.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use dashmap::DashMap;
use pargamd::core::auxiliary::SearchPaths;
use pargamd::core::bundle::OutputBundle;
use pargamd::core::uploads::{UnknownUploadKind, UploadKind, Uploads, decode_base64};
use pargamd::core::cv::CvSpec;
use pargamd::engine::config::{ConfigError, ParameterRecord, ParameterRecordBuilder, SchedulerOptions};
use pargamd::engine::diagnostics::GenerationWarning;
use pargamd::engine::error::GeneratorError;
use pargamd::session::{FormDraft, Session, SessionError, WizardStep};
use pargamd::workflows::generate::generate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::ErrorKind;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Topology and trajectory uploads easily exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

pub const UPLOADS_DIR: &str = "uploads";
pub const GENERATED_DIR: &str = "generated";

/// Sessions untouched for this long are pruned when a new one is created.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct SessionSlot {
    session: Session,
    touched: Instant,
}

struct AppStateInner {
    sessions: DashMap<Uuid, SessionSlot>,
    fallback: SearchPaths,
    workdir: PathBuf,
    idle_ttl: Duration,
}

impl AppState {
    pub fn new(workdir: PathBuf, fallback: SearchPaths) -> Self {
        Self::with_idle_ttl(workdir, fallback, SESSION_IDLE_TTL)
    }

    pub fn with_idle_ttl(workdir: PathBuf, fallback: SearchPaths, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                sessions: DashMap::new(),
                fallback,
                workdir,
                idle_ttl,
            }),
        }
    }

    fn upload_dir(&self, id: Uuid) -> PathBuf {
        self.inner.workdir.join(UPLOADS_DIR).join(id.to_string())
    }

    fn upload_path(&self, id: Uuid, kind: UploadKind) -> PathBuf {
        self.upload_dir(id).join(format!("upload.{}", kind.extension()))
    }

    fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session, &SearchPaths) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut entry = self
            .inner
            .sessions
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("No session {}", id)))?;
        let slot = entry.value_mut();
        slot.touched = Instant::now();
        f(&mut slot.session, &self.inner.fallback)
    }

    /// Runs `f` on the blocking pool against a copy of the session. The map
    /// entry is only locked while copying and while storing the result; a
    /// failed run leaves the stored session untouched.
    async fn with_session_blocking<T, F>(&self, id: Uuid, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Session, &SearchPaths) -> Result<T, ApiError> + Send + 'static,
    {
        let mut session = self.with_session(id, |session, _| Ok(session.clone()))?;
        let state = self.clone();
        let (session, value) = tokio::task::spawn_blocking(move || {
            let value = f(&mut session, &state.inner.fallback)?;
            Ok::<_, ApiError>((session, value))
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Session task failed: {}", e)))??;

        self.with_session(id, move |slot, _| {
            *slot = session;
            Ok(value)
        })
    }

    /// Drops sessions idle past the TTL and returns their ids.
    fn prune_idle(&self, now: Instant) -> Vec<Uuid> {
        let ttl = self.inner.idle_ttl;
        let mut expired = Vec::new();
        self.inner.sessions.retain(|id, slot| {
            let keep = now.saturating_duration_since(slot.touched) < ttl;
            if !keep {
                expired.push(*id);
            }
            keep
        });
        expired
    }

    async fn discard_uploads(&self, id: Uuid) {
        remove_quietly(&self.upload_dir(id), true).await;
    }
}

/// Removes a stored file or directory. A path that is already gone is fine.
async fn remove_quietly(path: &FsPath, is_dir: bool) {
    let result = if is_dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => debug!("Removed {:?}", path),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {:?}: {}", path, e),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/form", put(put_form))
        .route(
            "/api/sessions/{id}/uploads/{kind}",
            put(put_upload).delete(delete_upload),
        )
        .route("/api/sessions/{id}/cvs", post(add_cv))
        .route("/api/sessions/{id}/cvs/{index}", delete(remove_cv))
        .route("/api/sessions/{id}/next", post(next_step))
        .route("/api/sessions/{id}/back", post(previous_step))
        .route("/api/sessions/{id}/reset", post(reset_session))
        .route("/api/sessions/{id}/regenerate", post(regenerate))
        .route(
            "/api/sessions/{id}/files/{*path}",
            put(edit_file).delete(reset_file),
        )
        .route("/api/sessions/{id}/export", post(export_bundle))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let message = e.to_string();
        match e {
            SessionError::StepIncomplete { .. }
            | SessionError::RequiredCv
            | SessionError::NotGenerated => ApiError::Conflict(message),
            SessionError::CvOutOfRange(_) | SessionError::UnknownFile(_) => {
                ApiError::NotFound(message)
            }
            SessionError::BinaryFile(_) => ApiError::BadRequest(message),
            SessionError::Generation(inner) => inner.into(),
        }
    }
}

impl From<GeneratorError> for ApiError {
    fn from(e: GeneratorError) -> Self {
        match e {
            GeneratorError::Config(_) => ApiError::BadRequest(e.to_string()),
            GeneratorError::Inconsistent(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadPayload {
    pub kind: UploadKind,
    pub content_base64: String,
}

/// Parameters for one-shot generation. Unlike the wizard form nothing is
/// prefilled: required values that are absent are reported as missing.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateParameters {
    pub account: Option<String>,
    pub email: Option<String>,
    pub protein_name: Option<String>,
    pub bin_target_counts: Option<u32>,
    pub max_total_iterations: Option<u64>,
    pub nstlim: Option<u64>,
    pub ntpr: Option<i64>,
    pub include_infinite_bounds: Option<bool>,
    pub enable_gpu_parallelization: Option<bool>,
    pub rst_as_bstate: Option<bool>,
    pub cvs: Option<Vec<CvSpec>>,
    pub scheduler: Option<SchedulerOptions>,
}

impl GenerateParameters {
    pub fn into_record(self) -> Result<ParameterRecord, ConfigError> {
        let mut builder = ParameterRecordBuilder::new();
        if let Some(account) = self.account {
            builder = builder.account(account);
        }
        if let Some(email) = self.email {
            builder = builder.email(email);
        }
        if let Some(name) = self.protein_name {
            builder = builder.protein_name(name);
        }
        if let Some(count) = self.bin_target_counts {
            builder = builder.bin_target_counts(count);
        }
        if let Some(iterations) = self.max_total_iterations {
            builder = builder.max_total_iterations(iterations);
        }
        if let Some(steps) = self.nstlim {
            builder = builder.nstlim(steps);
        }
        if let Some(frequency) = self.ntpr {
            builder = builder.ntpr(frequency);
        }
        if let Some(include) = self.include_infinite_bounds {
            builder = builder.include_infinite_bounds(include);
        }
        if let Some(enable) = self.enable_gpu_parallelization {
            builder = builder.enable_gpu_parallelization(enable);
        }
        if let Some(as_bstate) = self.rst_as_bstate {
            builder = builder.rst_as_bstate(as_bstate);
        }
        if let Some(cvs) = self.cvs {
            builder = builder.cvs(cvs);
        }
        if let Some(scheduler) = self.scheduler {
            builder = builder.scheduler(scheduler);
        }
        builder.build()
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub parameters: GenerateParameters,
    #[serde(default)]
    pub uploads: Vec<UploadPayload>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub files: OutputBundle,
    pub warnings: Vec<GenerationWarning>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub step: WizardStep,
    pub step_number: u8,
    pub title: &'static str,
    pub form: FormDraft,
    pub uploads: Vec<UploadKind>,
    pub files: Option<OutputBundle>,
    pub warnings: Vec<GenerationWarning>,
}

impl SessionView {
    fn of(id: Uuid, session: &Session) -> Self {
        let step = session.step();
        Self {
            id,
            step,
            step_number: step.number(),
            title: step.title(),
            form: session.form().clone(),
            uploads: session.uploads().kinds().collect(),
            files: session.generated().cloned(),
            warnings: session.warnings().to_vec(),
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let record = request.parameters.into_record()?;

    let mut uploads = Uploads::new();
    for upload in request.uploads {
        let bytes = decode_base64(&upload.content_base64).map_err(|e| {
            ApiError::BadRequest(format!("Upload '{}' is not valid base64: {}", upload.kind, e))
        })?;
        uploads.insert(upload.kind, bytes);
    }

    let report = tokio::task::spawn_blocking(move || {
        generate(&record, &uploads, &state.inner.fallback)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Generation task failed: {}", e)))??;
    info!("Generated bundle with {} file(s) over HTTP.", report.bundle.len());
    Ok(Json(GenerateResponse {
        files: report.bundle,
        warnings: report.warnings,
    }))
}

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let now = Instant::now();
    for expired in state.prune_idle(now) {
        info!("Session {} expired after being idle.", expired);
        state.discard_uploads(expired).await;
    }

    let id = Uuid::new_v4();
    let session = Session::new();
    let view = SessionView::of(id, &session);
    state.inner.sessions.insert(
        id,
        SessionSlot {
            session,
            touched: now,
        },
    );
    debug!("Created session {}", id);
    (StatusCode::CREATED, Json(view))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state.with_session(id, |session, _| Ok(Json(SessionView::of(id, session))))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .inner
        .sessions
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound(format!("No session {}", id)))?;
    state.discard_uploads(id).await;
    debug!("Deleted session {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn put_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<FormDraft>,
) -> Result<Json<SessionView>, ApiError> {
    state.with_session(id, |session, _| {
        session.set_form(form);
        Ok(Json(SessionView::of(id, session)))
    })
}

fn parse_kind(kind: &str) -> Result<UploadKind, ApiError> {
    kind.parse()
        .map_err(|e: UnknownUploadKind| ApiError::NotFound(e.to_string()))
}

async fn put_upload(
    State(state): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
    body: Bytes,
) -> Result<Json<SessionView>, ApiError> {
    let kind = parse_kind(&kind)?;
    let stored = state.upload_path(id, kind);
    let view = state.with_session(id, |session, _| {
        session.set_upload(kind, body.to_vec());
        Ok(Json(SessionView::of(id, session)))
    })?;

    if let Some(parent) = stored.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    }
    tokio::fs::write(&stored, &body)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    debug!("Stored {} upload for session {} at {:?}", kind, id, stored);
    Ok(view)
}

async fn delete_upload(
    State(state): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
) -> Result<Json<SessionView>, ApiError> {
    let kind = parse_kind(&kind)?;
    let view = state.with_session(id, |session, _| {
        if !session.remove_upload(kind) {
            return Err(ApiError::NotFound(format!("No {} upload in session {}", kind, id)));
        }
        Ok(Json(SessionView::of(id, session)))
    })?;
    remove_quietly(&state.upload_path(id, kind), false).await;
    Ok(view)
}

async fn add_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state.with_session(id, |session, _| {
        session.add_cv();
        Ok(Json(SessionView::of(id, session)))
    })
}

async fn remove_cv(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<SessionView>, ApiError> {
    state.with_session(id, |session, _| {
        session.remove_cv(index)?;
        Ok(Json(SessionView::of(id, session)))
    })
}

async fn next_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .with_session_blocking(id, move |session, fallback| {
            session.advance(fallback)?;
            Ok(Json(SessionView::of(id, session)))
        })
        .await
}

async fn previous_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state.with_session(id, |session, _| {
        session.back();
        Ok(Json(SessionView::of(id, session)))
    })
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state.with_session(id, |session, _| {
        session.reset();
        Ok(Json(SessionView::of(id, session)))
    })?;
    state.discard_uploads(id).await;
    Ok(view)
}

async fn regenerate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .with_session_blocking(id, move |session, fallback| {
            session.regenerate(fallback)?;
            Ok(Json(SessionView::of(id, session)))
        })
        .await
}

async fn edit_file(
    State(state): State<AppState>,
    Path((id, path)): Path<(Uuid, String)>,
    content: String,
) -> Result<StatusCode, ApiError> {
    state.with_session(id, |session, _| {
        session.edit_file(&path, content)?;
        Ok(StatusCode::NO_CONTENT)
    })
}

async fn reset_file(
    State(state): State<AppState>,
    Path((id, path)): Path<(Uuid, String)>,
) -> Result<Response, ApiError> {
    state
        .with_session_blocking(id, move |session, fallback| {
            let content = session.reset_file(&path, fallback)?;
            Ok(Json(content.clone()))
        })
        .await
        .map(IntoResponse::into_response)
}

async fn export_bundle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bundle = state.with_session(id, |session, _| {
        session
            .generated()
            .cloned()
            .ok_or_else(|| SessionError::NotGenerated.into())
    })?;
    let target = state.inner.workdir.join(GENERATED_DIR).join(id.to_string());

    let written = tokio::task::spawn_blocking({
        let target = target.clone();
        move || bundle.write_to_dir(&target)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Export task failed: {}", e)))?
    .map_err(|e| ApiError::Internal(format!("Failed to write bundle: {}", e)))?;

    info!("Exported session {} to {:?}", id, target);
    Ok(Json(json!({
        "directory": target,
        "files": written.len(),
    })))
}
