//! Thumbnail images as `data:` URLs for app listings.

use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{LaunchError, LaunchResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// MIME type for an image file name.
///
/// `jpg`/`jpeg` and `svg` get their registered types; any other extension
/// is assumed to be `image/<ext>`.
pub fn image_mime_type(filename: &str) -> String {
    let lower = filename.to_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg".to_string()
    } else if lower.ends_with(".svg") {
        "image/svg+xml".to_string()
    } else {
        let ext = lower.rsplit('.').next().unwrap_or_default();
        format!("image/{}", ext)
    }
}

/// Encode file contents as a base64 `data:` URL.
pub fn encode_data_url(filename: &str, contents: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        image_mime_type(filename),
        STANDARD.encode(contents)
    )
}

/// Read an image file and encode it as a `data:` URL.
pub async fn thumbnail_data_url(path: &Path) -> LaunchResult<String> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| LaunchError::Generic(format!("Not a file: {}", path.display())))?;

    let contents = tokio::fs::read(path).await?;
    Ok(encode_data_url(&filename, &contents))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mime_types() {
        assert_eq!(image_mime_type("logo.JPG"), "image/jpeg");
        assert_eq!(image_mime_type("logo.jpeg"), "image/jpeg");
        assert_eq!(image_mime_type("logo.svg"), "image/svg+xml");
        assert_eq!(image_mime_type("logo.PNG"), "image/png");
        assert_eq!(image_mime_type("logo.webp"), "image/webp");
    }

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url("a.png", b"hello"), "data:image/png;base64,aGVsbG8=");
    }

    #[tokio::test]
    async fn test_thumbnail_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.svg");
        std::fs::write(&path, "<svg/>").unwrap();

        let url = thumbnail_data_url(&path).await.unwrap();
        assert_eq!(url, "data:image/svg+xml;base64,PHN2Zy8+");
    }

    #[tokio::test]
    async fn test_thumbnail_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = thumbnail_data_url(&dir.path().join("nope.png")).await.unwrap_err();
        assert!(matches!(err, LaunchError::Io(_)));
    }
}
