use image::ImageFormat;
use std::path::Path;

use crate::errors::{AppError, Result};

/// Size limit of the QR service for logo files.
pub const MAX_LOGO_SIZE: usize = 2 * 1024 * 1024; // 2MB

const LOGO_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg", "image/svg+xml"];

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

/// Checks that an upload really is a supported raster image and returns its MIME type.
pub fn validate_image_upload(data: &[u8], max_size: usize) -> Result<&'static str> {
    if data.is_empty() {
        return Err(AppError::Validation("Please select an image".to_string()));
    }
    if data.len() > max_size {
        return Err(AppError::FileTooLarge);
    }

    let format = image::guess_format(data)
        .map_err(|_| AppError::Validation("Unsupported image format".to_string()))?;

    mime_for_format(format)
        .ok_or_else(|| AppError::Validation("Only PNG, JPEG, GIF and WebP images are allowed".to_string()))
}

fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

pub fn validate_logo(data: &[u8], mime_type: &str) -> Result<()> {
    if !LOGO_MIME_TYPES.contains(&mime_type) {
        return Err(AppError::Validation(
            "Only PNG, JPG, and SVG files are allowed".to_string(),
        ));
    }
    if data.len() > MAX_LOGO_SIZE {
        return Err(AppError::Validation("File size must be less than 2MB".to_string()));
    }
    Ok(())
}

pub fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

pub fn get_file_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

/// `Parc Jarry #2` becomes `Parc_Jarry__2_QR_code.png`.
pub fn qr_download_filename(bookbox_name: &str) -> String {
    let stem: String = bookbox_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_QR_code.png", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_png_is_accepted() {
        assert_eq!(validate_image_upload(PNG_HEADER, 1024).unwrap(), "image/png");
    }

    #[test]
    fn test_empty_and_oversized_uploads() {
        assert!(matches!(
            validate_image_upload(&[], 1024),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_image_upload(PNG_HEADER, 4),
            Err(AppError::FileTooLarge)
        ));
    }

    #[test]
    fn test_text_is_rejected() {
        assert!(validate_image_upload(b"hello world, not an image", 1024).is_err());
    }

    #[test]
    fn test_logo_rules() {
        assert!(validate_logo(PNG_HEADER, "image/png").is_ok());
        assert!(validate_logo(PNG_HEADER, "image/gif").is_err());
        assert!(validate_logo(&vec![0u8; MAX_LOGO_SIZE + 1], "image/png").is_err());
    }

    #[test]
    fn test_qr_filename() {
        assert_eq!(qr_download_filename("Parc Jarry #2"), "Parc_Jarry__2_QR_code.png");
        assert_eq!(get_file_extension("image/svg+xml"), "svg");
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type(Path::new("icon.png")), "image/png");
        assert_eq!(guess_mime_type(Path::new("logo.svg")), "image/svg+xml");
    }
}
