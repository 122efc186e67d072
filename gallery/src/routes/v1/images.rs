use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path},
    http::StatusCode,
    Extension, Json,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    gallery::SelectedFile,
    gateway::ImageGateway,
    middleware::AuthenticatedUser,
    namespace::ObjectKey,
    types::AppError,
};

/// Multipart field carrying the image
const FILE_FIELD: &str = "file";

/// One listed image
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ImageResponse {
    /// Object key of the image
    pub name: String,
    /// Signed URL granting temporary read access
    pub url: String,
    /// ISO-8601 UTC timestamp when the signed URL expires
    pub expires_at: String,
}

/// Listing of the caller's images
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListImagesResponse {
    /// Images of the caller, newest first
    pub images: Vec<ImageResponse>,
}

/// Key of a freshly stored image
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UploadImageResponse {
    /// Generated object key
    pub name: String,
    /// Full storage path (`{principal}/{name}`)
    pub path: String,
}

/// List the caller's images
///
/// Lists the caller's namespace sorted by creation time (newest first, capped at the
/// configured limit) and signs every entry. Entries whose URL cannot be signed are left
/// out; the rest of the listing is still returned.
///
/// # Errors
///
/// Returns an error if:
/// - `401 UNAUTHORIZED` - Invalid or missing authentication
/// - `503 SERVICE_UNAVAILABLE` - Object store upstream error
/// - `504 GATEWAY_TIMEOUT` - Object store did not answer in time
/// - `500 INTERNAL_SERVER_ERROR` - Other listing failures
#[instrument(skip_all, fields(principal = %user.principal.id))]
pub async fn list_images(
    user: AuthenticatedUser,
    Extension(gateway): Extension<Arc<ImageGateway>>,
) -> Result<Json<ListImagesResponse>, AppError> {
    let signed = gateway.list_signed(&user.namespace()).await?;

    let images = signed
        .into_iter()
        .map(|signed| ImageResponse {
            name: signed.key.to_string(),
            url: signed.url,
            expires_at: signed.expires_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(ListImagesResponse { images }))
}

fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "Image exceeds the maximum upload size",
            false,
        );
    }

    tracing::warn!("Malformed multipart body: {err}");
    AppError::new(
        StatusCode::BAD_REQUEST,
        "invalid_multipart",
        "Request body must be multipart/form-data",
        false,
    )
}

/// Upload an image
///
/// Expects a `multipart/form-data` body with the image in the `file` field. The image is
/// stored under a generated key (random UUID plus the original extension) inside the
/// caller's namespace; the original file name is not kept.
///
/// # Returns
///
/// Returns `201 CREATED` with the generated key
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Missing or empty `file` field, or a non-image content type
/// - `401 UNAUTHORIZED` - Invalid or missing authentication
/// - `413 PAYLOAD_TOO_LARGE` - Image exceeds the upload limit
/// - `5xx` - Object store failure
#[instrument(skip_all, fields(principal = %user.principal.id))]
pub async fn upload_image(
    user: AuthenticatedUser,
    Extension(gateway): Extension<Arc<ImageGateway>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadImageResponse>), AppError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;

        file = Some(SelectedFile::new(name, content_type, bytes));
        break;
    }

    let Some(file) = file.filter(|file| !file.bytes.is_empty()) else {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "missing_file",
            "Please select a file",
            false,
        ));
    };

    if !file.is_image() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "invalid_content_type",
            "Only image files can be uploaded",
            false,
        ));
    }

    let namespace = user.namespace();
    let key = gateway
        .upload(&namespace, &file.name, file.bytes, Some(file.content_type.as_str()))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadImageResponse {
            path: namespace.full_path(&key),
            name: key.to_string(),
        }),
    ))
}

/// Delete an image
///
/// Removes the image from the caller's namespace. Signed URLs issued earlier keep working
/// until they expire.
///
/// # Returns
///
/// Returns `204 NO_CONTENT` on success
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - `name` is not a valid object key
/// - `401 UNAUTHORIZED` - Invalid or missing authentication
/// - `5xx` - Object store failure
#[instrument(skip_all, fields(principal = %user.principal.id))]
pub async fn delete_image(
    user: AuthenticatedUser,
    Extension(gateway): Extension<Arc<ImageGateway>>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    let key = ObjectKey::parse(&name)?;

    gateway.remove(&user.namespace(), &key).await?;

    Ok(StatusCode::NO_CONTENT)
}
