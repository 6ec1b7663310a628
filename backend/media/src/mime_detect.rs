//! MIME type detection for uploaded images.
//!
//! Browsers and HTTP clients usually label uploads; when they don't, the
//! file extension and then the leading magic bytes are consulted.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "heic"         => "image/heic",
        "heif"         => "image/heif",
        "bmp"          => "image/bmp",
        "tiff" | "tif" => "image/tiff",

        "pdf"          => "application/pdf",
        "txt"          => "text/plain",
        "json"         => "application/json",
        "csv"          => "text/csv",

        _              => "application/octet-stream",
    }
}

/// Detect an image MIME type from the leading bytes of the file.
pub fn sniff_image_mime(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("image/tiff"),
        _ => None,
    }
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Whether a MIME type carries no real information about the content.
pub fn is_generic(mime: &str) -> bool {
    mime.is_empty() || mime == "application/octet-stream"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_jpeg() {
        assert_eq!(detect_mime_type(&PathBuf::from("kk.JPG")), "image/jpeg");
    }

    #[test]
    fn unknown_extension_fallback() {
        assert_eq!(detect_mime_type(&PathBuf::from("scan.xyz")), "application/octet-stream");
    }

    #[test]
    fn sniffs_png_and_jpeg() {
        assert_eq!(sniff_image_mime(b"\x89PNG\r\n\x1a\n...."), Some("image/png"));
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_mime(b"%PDF-1.7"), None);
    }

    #[test]
    fn image_prefix() {
        assert!(is_image("image/heic"));
        assert!(!is_image("application/pdf"));
    }
}
