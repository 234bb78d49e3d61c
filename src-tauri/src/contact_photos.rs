use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tauri::{AppHandle, Manager, Runtime};

use crate::{decode_data_url_bytes, CONTACT_PHOTO_MAX_BYTES, CONTACT_PHOTO_REQUEST_TIMEOUT_SECS};

const FILE_PREFIX: &str = "contact-";
const FILE_SUFFIX: &str = ".png";

pub(crate) fn contact_photo_dir<R: Runtime>(app: &AppHandle<R>) -> Result<PathBuf, String> {
    let base = app
        .path()
        .temp_dir()
        .map_err(|error| format!("Failed to resolve temp dir: {error}"))?;
    Ok(base.join("zaptray").join("contact-photos"))
}

/// Cache file name derived from the contact's display name, never from the photo bytes,
/// so a contact keeps one file that is overwritten as the avatar changes.
pub(crate) fn contact_photo_file_name(contact_name: &str) -> String {
    let name = if contact_name.trim().is_empty() {
        "unknown"
    } else {
        contact_name
    };
    let digest = Sha256::digest(name.as_bytes());
    format!("{FILE_PREFIX}{}{FILE_SUFFIX}", &hex::encode(digest)[..32])
}

pub(crate) fn store_photo_bytes(
    dir: &Path,
    contact_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, String> {
    if bytes.is_empty() {
        return Err("Contact photo is empty".to_string());
    }
    fs::create_dir_all(dir)
        .map_err(|error| format!("Failed to create contact photo dir: {error}"))?;
    let path = dir.join(contact_photo_file_name(contact_name));
    fs::write(&path, bytes).map_err(|error| format!("Failed to write contact photo: {error}"))?;
    Ok(path)
}

/// Deletes cached photos whose modification time is older than `retention`.
pub(crate) fn remove_expired_photos(dir: &Path, retention: Duration, now: SystemTime) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(FILE_PREFIX) || !name.ends_with(FILE_SUFFIX) {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|meta| meta.modified()) else {
            continue;
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= retention {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                log::debug!("expired contact photo removed: {name}");
                removed += 1;
            }
            Err(error) => log::debug!("failed to remove expired contact photo {name}: {error}"),
        }
    }
    removed
}

pub(crate) fn cleanup_contact_photos<R: Runtime>(app: &AppHandle<R>, retention_secs: u64) {
    match contact_photo_dir(app) {
        Ok(dir) => {
            remove_expired_photos(&dir, Duration::from_secs(retention_secs), SystemTime::now());
        }
        Err(error) => log::debug!("contact photo cleanup skipped: {error}"),
    }
}

async fn download_photo(url: &str) -> Result<Vec<u8>, String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(CONTACT_PHOTO_REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|error| format!("Failed to build HTTP client: {error}"))?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|error| format!("Contact photo request failed: {error}"))?;
    if !response.status().is_success() {
        return Err(format!(
            "Contact photo request failed with HTTP {}",
            response.status().as_u16()
        ));
    }
    if let Some(content_length) = response.content_length() {
        if content_length > CONTACT_PHOTO_MAX_BYTES as u64 {
            return Err(format!(
                "Contact photo too large ({content_length} bytes > {CONTACT_PHOTO_MAX_BYTES})"
            ));
        }
    }
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_ascii_lowercase();
    if !content_type.starts_with("image/") {
        return Err(format!(
            "Contact photo response is not an image ({content_type})"
        ));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|error| format!("Failed to read contact photo body: {error}"))?;
    if bytes.len() > CONTACT_PHOTO_MAX_BYTES {
        return Err(format!(
            "Contact photo too large ({} bytes > {CONTACT_PHOTO_MAX_BYTES})",
            bytes.len()
        ));
    }
    Ok(bytes.to_vec())
}

/// Turns the page's avatar reference into image bytes. `blob:` URLs only live inside the
/// page and yield `Ok(None)`.
pub(crate) async fn fetch_photo_bytes(reference: &str) -> Result<Option<Vec<u8>>, String> {
    let reference = reference.trim();
    if reference.starts_with("data:") {
        return decode_data_url_bytes(reference, CONTACT_PHOTO_MAX_BYTES).map(Some);
    }
    if reference.starts_with("https://") || reference.starts_with("http://") {
        return download_photo(reference).await.map(Some);
    }
    Ok(None)
}

/// Resolves and caches the photo, returning its local path. Every failure is reported as
/// `None` so the notification falls back to the default icon.
pub(crate) async fn cache_contact_photo<R: Runtime>(
    app: &AppHandle<R>,
    reference: &str,
    contact_name: &str,
) -> Option<PathBuf> {
    let result: Result<Option<PathBuf>, String> = async {
        let Some(bytes) = fetch_photo_bytes(reference).await? else {
            return Ok(None);
        };
        let dir = contact_photo_dir(app)?;
        store_photo_bytes(&dir, contact_name, &bytes).map(Some)
    }
    .await;
    match result {
        Ok(Some(path)) => {
            log::debug!("using contact photo for {contact_name:?}");
            Some(path)
        }
        Ok(None) => None,
        Err(error) => {
            log::debug!("contact photo unavailable for {contact_name:?}: {error}");
            None
        }
    }
}
