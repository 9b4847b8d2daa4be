//! HTTP handlers for product attachments

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::attach::{AttachResponse, AttachUrl, Upload};
use crate::services::AttachService;
use crate::AppState;

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

/// Types a browser may render in place; anything else is sent as a download
const INLINE_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "application/pdf",
];

fn is_inline(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    INLINE_CONTENT_TYPES.contains(&essence.as_str())
}

/// Response headers for a stored file
fn open_headers(content_type: Option<&str>, file_name: &str) -> [(HeaderName, HeaderValue); 3] {
    let content_type = content_type
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let disposition = if content_type.to_str().map(is_inline).unwrap_or(false) {
        "inline"
    } else {
        "attachment"
    };
    let disposition = HeaderValue::from_str(&format!("{}; filename=\"{}\"", disposition, file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_DISPOSITION, disposition),
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
    ]
}

/// Upload a file for a product (multipart field `file`)
pub async fn upload_attach(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<AttachUrl>)> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(FILE_FIELD, e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let origin_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(FILE_FIELD, e.to_string()))?;
        upload = Some(Upload {
            origin_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| AppError::validation(FILE_FIELD, "Multipart field 'file' is required"))?;

    let service = AttachService::new(state.db, &state.config.attach);
    let url = service
        .upload(product_id, upload, current_user.0.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(url)))
}

pub async fn get_attach(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(hash): Path<String>,
) -> AppResult<Json<AttachResponse>> {
    let service = AttachService::new(state.db, &state.config.attach);
    Ok(Json(service.get(&hash).await?))
}

/// Stream the stored file with its original content type
pub async fn open_attach(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> AppResult<Response> {
    let service = AttachService::new(state.db, &state.config.attach);
    let (attach, bytes) = service.open(&hash).await?;

    let headers = open_headers(attach.content_type.as_deref(), &attach.file_name);
    Ok((headers, bytes).into_response())
}

pub async fn delete_attach(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(hash): Path<String>,
) -> AppResult<StatusCode> {
    let service = AttachService::new(state.db, &state.config.attach);
    service.delete(&hash, current_user.0.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_product_attaches(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<Vec<AttachResponse>>> {
    let service = AttachService::new(state.db, &state.config.attach);
    Ok(Json(service.list_for_product(product_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of<'a>(headers: &'a [(HeaderName, HeaderValue); 3], name: &HeaderName) -> &'a str {
        headers
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.to_str().ok())
            .unwrap()
    }

    #[test]
    fn test_images_and_pdf_open_inline() {
        assert!(is_inline("image/png"));
        assert!(is_inline("Application/PDF"));
        assert!(is_inline("image/jpeg; charset=binary"));
        assert!(!is_inline("image/svg+xml"));
        assert!(!is_inline("text/html"));
    }

    #[test]
    fn test_html_upload_is_served_as_download() {
        let headers = open_headers(Some("text/html"), "Ab12Cd34Ef.html");
        assert_eq!(
            header_of(&headers, &header::CONTENT_DISPOSITION),
            "attachment; filename=\"Ab12Cd34Ef.html\""
        );
        assert_eq!(header_of(&headers, &header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    }

    #[test]
    fn test_png_is_served_inline_without_sniffing() {
        let headers = open_headers(Some("image/png"), "Ab12Cd34Ef.png");
        assert_eq!(header_of(&headers, &header::CONTENT_TYPE), "image/png");
        assert_eq!(
            header_of(&headers, &header::CONTENT_DISPOSITION),
            "inline; filename=\"Ab12Cd34Ef.png\""
        );
        assert_eq!(header_of(&headers, &header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    }

    #[test]
    fn test_missing_or_invalid_type_falls_back_to_octet_stream() {
        let headers = open_headers(None, "Ab12Cd34Ef");
        assert_eq!(header_of(&headers, &header::CONTENT_TYPE), "application/octet-stream");
        assert!(header_of(&headers, &header::CONTENT_DISPOSITION).starts_with("attachment"));

        let headers = open_headers(Some("text/html\r\nSet-Cookie: a=b"), "x");
        assert_eq!(header_of(&headers, &header::CONTENT_TYPE), "application/octet-stream");
    }
}
