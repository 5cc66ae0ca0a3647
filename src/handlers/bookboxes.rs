use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::{
    errors::{AppError, Result},
    extract::{Json, Path, Query},
    handlers::AppState,
    middleware::auth::AuthenticatedAdmin,
    models::{
        non_empty, BookBox, BookBoxForm, BookBoxSearch, LocationQuery, TransferRequest,
    },
    services::qr_code::png_data_url,
    utils::{
        file::{get_file_extension, qr_download_filename, validate_image_upload, UploadedImage},
        geo::{static_map_url, Coordinates, Distance},
    },
};

/// A book box as shown in the console, with its distance from the admin when known.
#[derive(Debug, Serialize)]
pub struct BookBoxView {
    #[serde(flatten)]
    pub bookbox: BookBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
}

impl BookBoxView {
    fn new(bookbox: BookBox, from: Option<Coordinates>) -> Self {
        let distance = from.map(|from| Distance::between(from, bookbox.coordinates()));
        Self { bookbox, distance }
    }
}

/// Splits the multipart form into text fields and the optional image file.
async fn read_form(
    multipart: &mut Multipart,
    max_upload_size: usize,
) -> Result<(BookBoxForm, Option<UploadedImage>)> {
    let mut form = BookBoxForm::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" && field.file_name().is_some() {
            let filename = field.file_name().unwrap_or("image").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid image upload: {}", e)))?;
            if bytes.is_empty() {
                continue;
            }
            let mime_type = validate_image_upload(&bytes, max_upload_size)?;
            image = Some(UploadedImage {
                bytes: bytes.to_vec(),
                filename: normalize_filename(&filename, mime_type),
                mime_type: mime_type.to_string(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid form field {}: {}", name, e)))?;
            form.set_text_field(&name, value);
        }
    }

    Ok((form, image))
}

fn normalize_filename(filename: &str, mime_type: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("bookbox");
    format!("{}.{}", stem, get_file_extension(mime_type))
}

pub async fn search(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Query(search): Query<BookBoxSearch>,
) -> Result<Json<serde_json::Value>> {
    let origin = match (search.latitude, search.longitude) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)).filter(|c| c.validate().is_ok()),
        _ => None,
    };

    let bookboxes = state.lino.search_bookboxes(&admin.token, &search).await?;
    let views: Vec<BookBoxView> = bookboxes
        .into_iter()
        .map(|bookbox| BookBoxView::new(bookbox, origin))
        .collect();
    let count = views.len();

    Ok(Json(json!({
        "data": views,
        "count": count
    })))
}

pub async fn create(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let (form, image) = read_form(&mut multipart, state.config.max_upload_size).await?;
    let image_url = non_empty(form.image_url.clone());

    if image.is_none() && image_url.is_none() {
        return Err(AppError::Validation("Please select an image".to_string()));
    }

    // Validate the text fields before spending an upload on them.
    let mut payload = form.into_payload(String::new())?;
    payload.image = match image {
        Some(image) => state.image_host.upload(image).await?,
        None => image_url.unwrap_or_default(),
    };

    let bookbox = state.lino.create_bookbox(&admin.token, &payload).await?;
    tracing::info!("{} created book box {} ({})", admin.username, bookbox.name, bookbox.id);

    let (qr_code, qr_error) = if state.qr.is_configured() {
        match state.qr.generate_for_bookbox(&bookbox.id).await {
            Ok(png) => (Some(png_data_url(&png)), None),
            Err(e) => {
                tracing::warn!("QR code generation failed for {}: {}", bookbox.id, e);
                (None, Some(e.user_message()))
            }
        }
    } else {
        (None, Some("QR code service is not configured".to_string()))
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Book box created successfully",
            "data": {
                "qrFilename": qr_download_filename(&bookbox.name),
                "bookbox": bookbox,
                "qrCode": qr_code,
                "qrCodeError": qr_error
            }
        })),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
    Query(location): Query<LocationQuery>,
) -> Result<Json<serde_json::Value>> {
    let bookbox = state.lino.get_bookbox(&admin.token, &id).await?;

    Ok(Json(json!({
        "data": BookBoxView::new(bookbox, location.coordinates())
    })))
}

pub async fn update(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let (form, image) = read_form(&mut multipart, state.config.max_upload_size).await?;
    let image_url = non_empty(form.image_url.clone());

    let mut payload = form.into_payload(String::new())?;
    payload.image = match (image, image_url) {
        (Some(image), _) => state.image_host.upload(image).await?,
        (None, Some(url)) => url,
        (None, None) => state
            .lino
            .get_bookbox(&admin.token, &id)
            .await?
            .image
            .unwrap_or_default(),
    };

    let data = state.lino.update_bookbox(&admin.token, &id, &payload).await?;
    tracing::info!("{} updated book box {}", admin.username, id);

    Ok(Json(json!({
        "message": "Book box updated successfully",
        "data": data
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.lino.delete_bookbox(&admin.token, &id).await?;
    tracing::info!("{} deleted book box {}", admin.username, id);

    Ok(Json(json!({
        "message": "Book box deleted successfully"
    })))
}

pub async fn activate(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let data = state.lino.set_bookbox_active(&admin.token, &id, true).await?;

    Ok(Json(json!({
        "message": "Book box activated successfully",
        "data": data
    })))
}

pub async fn deactivate(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let data = state.lino.set_bookbox_active(&admin.token, &id, false).await?;

    Ok(Json(json!({
        "message": "Book box deactivated successfully",
        "data": data
    })))
}

pub async fn transfer(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<serde_json::Value>> {
    let new_owner = request.new_owner.trim();
    if new_owner.is_empty() {
        return Err(AppError::Validation("Please select a new owner".to_string()));
    }

    let data = state.lino.transfer_bookbox(&admin.token, &id, new_owner).await?;
    tracing::info!("{} transferred book box {} to {}", admin.username, id, new_owner);

    Ok(Json(json!({
        "message": format!("Book box ownership transferred to {}", new_owner),
        "data": data
    })))
}

pub async fn qr_code(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
) -> Result<Response> {
    let bookbox = state.lino.get_bookbox(&admin.token, &id).await?;
    let png = state.qr.generate_for_bookbox(&bookbox.id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    qr_download_filename(&bookbox.name)
                ),
            ),
        ],
        png,
    )
        .into_response())
}

pub async fn map(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let bookbox = state.lino.get_bookbox(&admin.token, &id).await?;
    Ok(Redirect::temporary(&static_map_url(
        bookbox.coordinates(),
        state.config.maps_api_key.as_deref(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_filename() {
        assert_eq!(normalize_filename("photo.JPG", "image/jpeg"), "photo.jpg");
        assert_eq!(normalize_filename("", "image/png"), "bookbox.png");
    }

    #[test]
    fn test_view_includes_distance_only_with_origin() {
        let bookbox: BookBox = serde_json::from_value(json!({
            "_id": "b1",
            "name": "Parc Jarry",
            "latitude": 45.5336,
            "longitude": -73.6282
        }))
        .unwrap();

        let without = serde_json::to_value(BookBoxView::new(bookbox.clone(), None)).unwrap();
        assert!(without.get("distance").is_none());
        assert_eq!(without["id"], "b1");

        let with = serde_json::to_value(BookBoxView::new(
            bookbox,
            Some(Coordinates::new(45.5336, -73.6282)),
        ))
        .unwrap();
        assert_eq!(with["distance"]["display"], "0m away");
    }
}
