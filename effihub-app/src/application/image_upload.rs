use effihub_errors::AppError;

/// Uploads are restricted to raster web formats. No SVG.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// An image file as it arrives from a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// File extension for the stored blob, derived from the declared type
    /// rather than the client-supplied file name.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

pub fn validate_image(field: &str, image: &ImageUpload) -> Result<(), AppError> {
    if image.bytes.is_empty() {
        return Err(AppError::validation(field, "Image file is empty"));
    }
    if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
        return Err(AppError::validation(
            field,
            "Image must be a PNG, JPG, or WEBP file",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, bytes: Vec<u8>) -> ImageUpload {
        ImageUpload {
            file_name: "shot.bin".into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    #[test]
    fn raster_formats_pass() {
        assert!(validate_image("logo", &upload("image/png", vec![1])).is_ok());
        assert!(validate_image("logo", &upload("image/webp", vec![1])).is_ok());
    }

    #[test]
    fn svg_and_empty_files_are_rejected() {
        assert!(validate_image("logo", &upload("image/svg+xml", vec![1])).is_err());
        assert!(validate_image("logo", &upload("image/png", Vec::new())).is_err());
    }

    #[test]
    fn extension_follows_the_declared_type() {
        assert_eq!(upload("image/png", vec![1]).extension(), "png");
        assert_eq!(upload("image/jpeg", vec![1]).extension(), "jpg");
    }
}
