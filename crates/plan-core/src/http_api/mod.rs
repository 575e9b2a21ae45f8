use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use parking_lot::RwLock;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::calendar::{CalendarDay, HEADER};
use crate::catalog::Catalog;
use crate::error::{RenderError, SessionError};
use crate::metadata::{PlanMetadata, ScheduleSettings};
use crate::plan::{PlanSession, RecomputeSummary};
use crate::preview::PreviewScheduler;
use crate::render::{
    DocumentFormat, DocumentRenderer, DocxRenderer, PdfRenderer, PlanDocument, Watermark,
};

#[derive(Clone)]
pub struct AppState {
    session: Arc<RwLock<PlanSession>>,
    pdf: Arc<PdfRenderer>,
    docx: Arc<DocxRenderer>,
    watermark: Option<Watermark>,
    preview: Option<Arc<PreviewScheduler>>,
}

impl AppState {
    pub fn new(session: PlanSession) -> Self {
        Self::with_shared(Arc::new(RwLock::new(session)))
    }

    pub fn with_shared(session: Arc<RwLock<PlanSession>>) -> Self {
        Self {
            session,
            pdf: Arc::new(PdfRenderer::default()),
            docx: Arc::new(DocxRenderer::default()),
            watermark: None,
            preview: None,
        }
    }

    pub fn with_pdf_renderer(mut self, renderer: PdfRenderer) -> Self {
        self.pdf = Arc::new(renderer);
        self
    }

    pub fn with_watermark(mut self, watermark: Option<Watermark>) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn with_preview(mut self, preview: Arc<PreviewScheduler>) -> Self {
        self.preview = Some(preview);
        self
    }

    fn session(&self) -> Arc<RwLock<PlanSession>> {
        self.session.clone()
    }

    fn document(&self) -> (PlanDocument, String, String) {
        let guard = self.session.read();
        (
            guard.document(self.watermark.clone()),
            guard.export_file_name(DocumentFormat::Docx),
            guard.export_file_name(DocumentFormat::Pdf),
        )
    }

    fn refresh_preview(&self) {
        if let Some(preview) = &self.preview {
            let document = self.session.read().document(self.watermark.clone());
            preview.trigger(document);
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<SessionError> for ApiError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::RowOutOfRange(_) | SessionError::ColumnOutOfRange(_) => {
                ApiError::not_found(value.to_string())
            }
            other => ApiError::invalid(other.to_string()),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(value: RenderError) -> Self {
        tracing::error!(error = %value, "render failed");
        ApiError::internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

/// Everything a client needs to draw the plan table.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlanView {
    pub title: String,
    pub metadata: PlanMetadata,
    pub settings: ScheduleSettings,
    pub header: Vec<String>,
    pub rows: Vec<CalendarDay>,
    pub available_pages: Vec<u32>,
}

impl PlanView {
    fn from_session(session: &PlanSession) -> Self {
        Self {
            title: session.document_title(),
            metadata: session.metadata().clone(),
            settings: session.settings().clone(),
            header: HEADER.iter().map(|h| h.to_string()).collect(),
            rows: session.rows().to_vec(),
            available_pages: session.available_pages(),
        }
    }
}

/// Partial metadata update; absent fields keep their value. `month` is 0-based.
#[derive(Debug, Default, Deserialize)]
struct MetadataPayload {
    participant_name: Option<String>,
    month: Option<u32>,
    year: Option<i32>,
    starting_day: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CellPayload {
    value: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/catalog", get(get_catalog))
        .route("/plan", get(get_plan))
        .route("/plan/metadata", put(update_metadata))
        .route("/plan/settings", put(update_settings))
        .route("/plan/cells/:row/:column", put(update_cell))
        .route("/plan/recompute", post(recompute))
        .route("/export/docx", get(export_docx))
        .route("/export/pdf", get(export_pdf))
        .route("/preview", get(get_preview))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_catalog(State(state): State<AppState>) -> Json<Catalog> {
    let session = state.session();
    let catalog = {
        let guard = session.read();
        guard.catalog().clone()
    };
    Json(catalog)
}

async fn get_plan(State(state): State<AppState>) -> Json<PlanView> {
    let session = state.session();
    let view = {
        let guard = session.read();
        PlanView::from_session(&guard)
    };
    Json(view)
}

async fn update_metadata(
    State(state): State<AppState>,
    Json(payload): Json<MetadataPayload>,
) -> Result<Json<PlanView>, ApiError> {
    let session = state.session();
    let view = {
        let mut guard = session.write();
        let current = guard.metadata().clone();
        guard.apply_metadata(PlanMetadata {
            participant_name: payload.participant_name.unwrap_or(current.participant_name),
            month: payload.month.unwrap_or(current.month),
            year: payload.year.unwrap_or(current.year),
            starting_day: payload.starting_day.unwrap_or(current.starting_day),
        })?;
        PlanView::from_session(&guard)
    };
    state.refresh_preview();
    Ok(Json(view))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<ScheduleSettings>,
) -> Result<Json<PlanView>, ApiError> {
    let session = state.session();
    let view = {
        let mut guard = session.write();
        guard.apply_settings(settings)?;
        PlanView::from_session(&guard)
    };
    state.refresh_preview();
    Ok(Json(view))
}

async fn update_cell(
    State(state): State<AppState>,
    Path((row, column)): Path<(usize, usize)>,
    Json(payload): Json<CellPayload>,
) -> Result<Json<PlanView>, ApiError> {
    let session = state.session();
    let view = {
        let mut guard = session.write();
        guard.update_cell(row, column, &payload.value)?;
        PlanView::from_session(&guard)
    };
    state.refresh_preview();
    Ok(Json(view))
}

async fn recompute(State(state): State<AppState>) -> Result<Json<RecomputeSummary>, ApiError> {
    let session = state.session();
    let summary = {
        let mut guard = session.write();
        guard.recompute()?
    };
    state.refresh_preview();
    Ok(Json(summary))
}

async fn export_docx(State(state): State<AppState>) -> Result<Response, ApiError> {
    let (document, file_name, _) = state.document();
    let renderer = state.docx.clone();
    let bytes = render_blocking(move || renderer.render(&document)).await?;
    Ok(attachment(DocumentFormat::Docx, &file_name, bytes))
}

async fn export_pdf(State(state): State<AppState>) -> Result<Response, ApiError> {
    let (document, _, file_name) = state.document();
    let renderer = state.pdf.clone();
    let bytes = render_blocking(move || renderer.render(&document)).await?;
    Ok(attachment(DocumentFormat::Pdf, &file_name, bytes))
}

async fn get_preview(State(state): State<AppState>) -> Result<Response, ApiError> {
    let preview = state
        .preview
        .as_ref()
        .ok_or_else(|| ApiError::not_found("preview is disabled"))?;
    let handle = preview.current().ok_or_else(|| {
        let message = preview
            .last_error()
            .unwrap_or_else(|| "no preview rendered yet".to_string());
        ApiError::not_found(message)
    })?;
    let bytes = tokio::fs::read(&handle.path)
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, DocumentFormat::Pdf.mime_type().to_string()),
            (header::ETAG, format!("\"{}\"", handle.generation)),
        ],
        bytes,
    )
        .into_response())
}

async fn render_blocking<F>(render: F) -> Result<Vec<u8>, ApiError>
where
    F: FnOnce() -> Result<Vec<u8>, RenderError> + Send + 'static,
{
    let bytes = tokio::task::spawn_blocking(render)
        .await
        .map_err(|err| RenderError::Task(err.to_string()))??;
    Ok(bytes)
}

fn attachment(format: DocumentFormat, file_name: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!(
        "attachment; filename=\"plan.{}\"; filename*=UTF-8''{}",
        format.extension(),
        utf8_percent_encode(file_name, ATTR_CHAR)
    );
    (
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// RFC 5987 `attr-char`: alphanumerics plus `!#$&+-.^_`|~` stay as written.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');
