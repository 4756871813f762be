use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use castswap_contracts::images::{ImageId, UploadedImage};
use image::ImageReader;
use reqwest::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    Single,
    Multiple { max_files: usize },
}

impl UploadMode {
    fn limit(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Multiple { max_files } => max_files,
        }
    }
}

/// Outcome of ingesting one selected file.
#[derive(Debug)]
pub struct Ingested {
    pub path: PathBuf,
    pub image: Result<UploadedImage>,
}

/// Reads and decodes every selected file on its own worker thread.
///
/// Results arrive in completion order, which need not match `paths`.
/// Files beyond the mode's limit are ignored.
pub fn ingest_selection(paths: &[PathBuf], mode: UploadMode) -> Vec<Ingested> {
    let selected = &paths[..paths.len().min(mode.limit())];
    if selected.is_empty() {
        return Vec::new();
    }

    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        for path in selected {
            let tx = tx.clone();
            scope.spawn(move || {
                let image = ingest_file(path);
                let _ = tx.send(Ingested {
                    path: path.clone(),
                    image,
                });
            });
        }
        drop(tx);
        rx.iter().collect()
    })
}

pub fn ingest_file(path: &Path) -> Result<UploadedImage> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .with_context(|| format!("failed probing {}", path.display()))?;
    let sniffed_mime = reader.format().map(|format| format.to_mime_type());
    let (width, height) = reader
        .into_dimensions()
        .with_context(|| format!("{} is not a supported image", path.display()))?;

    let mime_type = mime_for_path(path)
        .or(sniffed_mime)
        .unwrap_or("application/octet-stream");
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(UploadedImage {
        id: ImageId::random(),
        display_url: display_url_for(path),
        data: BASE64.encode(&bytes),
        mime_type: mime_type.to_string(),
        file_name,
        width: Some(width),
        height: Some(height),
    })
}

fn display_url_for(path: &Path) -> String {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| absolute.display().to_string())
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
