use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, ResponseError, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use serde::Serialize;
use shared::ArtifactKind;
use shared::error::format_bytes;
use std::str::FromStr;
use uuid::Uuid;

use crate::upstream::models::{FormError, RawForm};
use crate::upstream::upstream_service::{UpstreamError, UpstreamResponse, UpstreamService};

/// Upload ceiling enforced while reading the multipart body.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub u64);

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid upload: {0}")]
    Multipart(#[from] actix_multipart::MultipartError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("File exceeds the {limit} upload limit")]
    TooLarge { limit: String },
    #[error("Unknown artifact type: {0}")]
    UnknownArtifact(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Multipart(_) | GatewayError::Form(_) => StatusCode::BAD_REQUEST,
            GatewayError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::UnknownArtifact(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    cfg.service(
        web::scope("/api")
            .route("/", web::post().to(handle_analyze))
            .route("/analyze", web::post().to(handle_analyze))
            .route("/download/{kind}", web::get().to(handle_download))
            .route("/health", web::get().to(health)),
    )
    .service(Files::new("/", frontend_dir).index_file("index.html"));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

async fn handle_analyze(
    upstream: web::Data<UpstreamService>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> Result<HttpResponse, GatewayError> {
    let request_id = Uuid::new_v4();
    let form = read_form(payload, limit.0).await?.validate()?;
    info!(
        "[{}] Forwarding {} ({}) to {} with {} / {}",
        request_id,
        form.file_name,
        format_bytes(form.bytes.len() as u64),
        upstream.base(),
        form.params.environment,
        form.params.confidence_field()
    );

    let response = upstream.analyze(form).await.map_err(|e| {
        error!("[{}] {}", request_id, e);
        e
    })?;
    if !response.status.is_success() {
        warn!("[{}] Upstream answered {}", request_id, response.status);
    }
    Ok(relay(response, None))
}

async fn handle_download(
    upstream: web::Data<UpstreamService>,
    path: web::Path<String>,
) -> Result<HttpResponse, GatewayError> {
    let raw_kind = path.into_inner();
    let kind =
        ArtifactKind::from_str(&raw_kind).map_err(|_| GatewayError::UnknownArtifact(raw_kind))?;

    let response = upstream.download(kind).await.map_err(|e| {
        error!("Error downloading {} file: {}", kind, e);
        e
    })?;
    let attachment = response.status.is_success().then(|| kind.file_name());
    Ok(relay(response, attachment))
}

/// Reads the multipart stream into a [`RawForm`], refusing files over `limit`.
async fn read_form(mut payload: Multipart, limit: u64) -> Result<RawForm, GatewayError> {
    let mut form = RawForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .content_disposition()
                    .and_then(|disposition| disposition.get_filename())
                    .unwrap_or("upload")
                    .to_string();
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let mut data = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk?;
                    if (data.len() + chunk.len()) as u64 > limit {
                        return Err(GatewayError::TooLarge {
                            limit: format_bytes(limit),
                        });
                    }
                    data.extend_from_slice(&chunk);
                }
                form.file = Some((file_name, content_type, data));
            }
            "environment" | "confidence" => {
                let mut data = Vec::new();
                while let Some(chunk) = field.next().await {
                    data.extend_from_slice(&chunk?);
                }
                let value = String::from_utf8_lossy(&data).into_owned();
                if name == "environment" {
                    form.environment = Some(value);
                } else {
                    form.confidence = Some(value);
                }
            }
            other => {
                warn!("Ignoring unexpected form field: {}", other);
                while let Some(chunk) = field.next().await {
                    chunk?;
                }
            }
        }
    }

    Ok(form)
}

fn relay(response: UpstreamResponse, attachment: Option<&str>) -> HttpResponse {
    let status =
        StatusCode::from_u16(response.status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);
    if let Some(content_type) = response.content_type {
        builder.insert_header((header::CONTENT_TYPE, content_type));
    }
    if let Some(file_name) = attachment {
        builder.insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file_name.to_string())],
        });
    }
    builder.body(response.body)
}
