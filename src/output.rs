//! File and object naming, PNG normalization, and saving.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::error::StudioError;
use crate::params::UpscaleFactor;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Generate an output filename from a prompt.
///
/// Sanitizes the first 50 characters of the prompt to kebab-case and
/// appends a unix timestamp and the `.png` extension.
#[must_use]
pub fn auto_filename(prompt: &str) -> String {
    let sanitized = sanitize_for_filename(prompt, 50);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{sanitized}-{timestamp}.png")
}

/// Object name for an upload: `<prefix>/<kebab-prompt>-<id>.png`.
#[must_use]
pub fn object_name(prefix: &str, prompt: &str, id: Uuid) -> String {
    let stem = format!("{}-{id}.png", sanitize_for_filename(prompt, 40));
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        stem
    } else {
        format!("{prefix}/{stem}")
    }
}

/// Sanitize a string for use in a filename.
///
/// Converts to lowercase, replaces non-alphanumeric chars with hyphens,
/// collapses consecutive hyphens, and trims to max length.
#[must_use]
pub fn sanitize_for_filename(input: &str, max_len: usize) -> String {
    let mut result = String::with_capacity(max_len);
    let mut last_was_hyphen = true;

    for ch in input.chars() {
        if result.len() >= max_len {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        "image".to_string()
    } else {
        result
    }
}

/// Return the bytes as PNG, re-encoding if they are another image format.
///
/// # Errors
///
/// Returns an error if the bytes are not a decodable image.
pub fn ensure_png(data: &[u8]) -> Result<Vec<u8>, StudioError> {
    if data.starts_with(PNG_SIGNATURE) {
        return Ok(data.to_vec());
    }
    let img = image::load_from_memory(data)
        .map_err(|e| StudioError::ImageConversion(format!("Failed to decode image: {e}")))?;
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| StudioError::ImageConversion(format!("Failed to encode PNG: {e}")))?;
    Ok(buf.into_inner())
}

/// Save image bytes as a PNG file.
///
/// # Errors
///
/// Returns an error if conversion fails or the file cannot be written.
pub fn save_png(data: &[u8], output_path: &Path) -> Result<(), StudioError> {
    let png = ensure_png(data)?;
    std::fs::write(output_path, png).map_err(StudioError::Io)
}

/// Guess the MIME type of image bytes from their signature.
#[must_use]
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::WebP => Some("image/webp"),
        image::ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

/// Resolve the output path: use explicit path or auto-generate.
#[must_use]
pub fn resolve_output_path(explicit: Option<&str>, prompt: &str) -> PathBuf {
    match explicit {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(auto_filename(prompt)),
    }
}

/// Default path for an upscaled copy of `input`: `<stem>-<factor>.png` beside it.
#[must_use]
pub fn upscaled_path(input: &Path, factor: UpscaleFactor) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    input.with_file_name(format!("{stem}-{factor}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_bytes() -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(2, 2);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    #[test]
    fn sanitize_basic() {
        assert_eq!(sanitize_for_filename("Hello World", 50), "hello-world");
    }

    #[test]
    fn sanitize_special_chars() {
        assert_eq!(
            sanitize_for_filename("A cat!! sitting on a mat...", 50),
            "a-cat-sitting-on-a-mat"
        );
    }

    #[test]
    fn sanitize_truncates() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_for_filename(&long, 10).len(), 10);
    }

    #[test]
    fn sanitize_non_ascii_prompt() {
        assert_eq!(sanitize_for_filename("夕焼けの富士山", 50), "image");
        assert_eq!(sanitize_for_filename("富士山 sunset", 50), "sunset");
    }

    #[test]
    fn auto_filename_is_png() {
        let name = auto_filename("a cat");
        assert!(name.starts_with("a-cat-"));
        assert_eq!(Path::new(&name).extension().unwrap(), "png");
    }

    #[test]
    fn object_name_layout() {
        let id = Uuid::nil();
        assert_eq!(
            object_name("studio/", "A cat", id),
            "studio/a-cat-00000000-0000-0000-0000-000000000000.png"
        );
        assert!(object_name("", "x", id).starts_with("x-"));
    }

    #[test]
    fn ensure_png_passthrough() {
        let fake = b"\x89PNG\r\n\x1a\nnot really".to_vec();
        assert_eq!(ensure_png(&fake).unwrap(), fake);
    }

    #[test]
    fn ensure_png_converts_jpeg() {
        let png = ensure_png(&jpeg_bytes()).unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn ensure_png_rejects_garbage() {
        assert!(matches!(ensure_png(b"garbage"), Err(StudioError::ImageConversion(_))));
    }

    #[test]
    fn sniff_known_formats() {
        assert_eq!(sniff_mime(&jpeg_bytes()), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n...."), Some("image/png"));
        assert_eq!(sniff_mime(b"hello"), None);
    }

    #[test]
    fn resolve_explicit() {
        let expected = PathBuf::from("mine.png");
        assert_eq!(resolve_output_path(Some("mine.png"), "ignored"), expected);
    }

    #[test]
    fn resolve_auto() {
        let path = resolve_output_path(None, "a cat");
        assert!(path.to_str().unwrap().starts_with("a-cat-"));
    }

    #[test]
    fn upscaled_path_sits_beside_input() {
        assert_eq!(
            upscaled_path(Path::new("shots/cat.jpg"), UpscaleFactor::X4),
            PathBuf::from("shots/cat-x4.png")
        );
    }
}
