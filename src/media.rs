//! File extension and MIME type helpers.

use std::path::Path;

/// Suffixes that span more than one dot and must be matched as a whole.
const COMPOUND_EXTENSIONS: &[&str] = &[".nii.gz", ".tar.gz"];

/// MIME types used in model configs, with the file extensions they accept.
/// The first extension is the canonical one.
const MEDIA_TYPES: &[(&str, &[&str])] = &[
    ("image/png", &[".png"]),
    ("image/jpeg", &[".jpg", ".jpeg"]),
    ("image/jpg", &[".jpg", ".jpeg"]),
    ("image/gif", &[".gif"]),
    ("image/bmp", &[".bmp"]),
    ("image/tiff", &[".tif", ".tiff"]),
    ("application/dicom", &[".dcm"]),
    ("application/nii", &[".nii"]),
    ("application/nii-gzip", &[".nii.gz"]),
    ("application/nrrd", &[".nrrd"]),
    ("application/json", &[".json"]),
    ("application/zip", &[".zip"]),
    ("application/gzip", &[".gz"]),
    ("text/plain", &[".txt"]),
    ("text/csv", &[".csv"]),
];

/// Lower-cased extension including the leading dot, e.g. `.png` or `.nii.gz`.
pub fn detect_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?.to_lowercase();

    if let Some(compound) = COMPOUND_EXTENSIONS
        .iter()
        .find(|ext| name.ends_with(*ext) && name.len() > ext.len())
    {
        return Some((*compound).to_string());
    }

    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext))
}

/// Extensions accepted for a config `format` entry. Entries that already look
/// like extensions (`.png`) are taken literally.
pub fn extensions_for(format: &str) -> Vec<String> {
    let format = format.trim().to_lowercase();
    if format.starts_with('.') {
        return vec![format];
    }

    MEDIA_TYPES
        .iter()
        .find(|(mime, _)| *mime == format)
        .map(|(_, exts)| exts.iter().map(|e| e.to_string()).collect())
        .unwrap_or_default()
}

/// Canonical extension for a `Content-Type` header value, ignoring parameters.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(m, _)| *m == mime)
        .and_then(|(_, exts)| exts.first().copied())
}

pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = detect_extension(path) else {
        return "application/octet-stream";
    };

    MEDIA_TYPES
        .iter()
        .find(|(mime, exts)| *mime != "image/jpg" && exts.contains(&ext.as_str()))
        .map(|(mime, _)| *mime)
        .unwrap_or("application/octet-stream")
}
