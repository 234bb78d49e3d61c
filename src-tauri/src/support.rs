use base64::Engine as _;
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    sync::OnceLock,
};
use tauri::{AppHandle, Manager, Runtime};

static DEV_MODE: OnceLock<bool> = OnceLock::new();

/// Development mode: `--dev` on the command line, `ZAPTRAY_DEV=1`, or a debug build.
pub(crate) fn is_dev_mode() -> bool {
    *DEV_MODE.get_or_init(|| {
        cfg!(debug_assertions)
            || std::env::args().any(|arg| arg == "--dev")
            || std::env::var("ZAPTRAY_DEV").is_ok_and(|value| value == "1" || value == "true")
    })
}

pub(crate) fn init_logging() {
    let default_filter = if is_dev_mode() {
        "zaptray=debug"
    } else {
        "zaptray=warn"
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}

pub(crate) fn install_panic_logger() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("uncaught panic: {info}");
        previous(info);
    }));
}

pub(crate) fn settings_file<R: Runtime>(app: &AppHandle<R>) -> Result<PathBuf, String> {
    let config_dir = app
        .path()
        .app_config_dir()
        .map_err(|error| format!("Failed to resolve app config dir: {error}"))?;

    fs::create_dir_all(&config_dir)
        .map_err(|error| format!("Failed to create config directory: {error}"))?;

    Ok(config_dir.join("settings.json"))
}

#[cfg(unix)]
pub(crate) fn restrict_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt as _;
    if path.exists() {
        if let Err(error) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            log::debug!("restrict_file_permissions: failed for {path:?}: {error}");
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn restrict_file_permissions(_path: &Path) {}

pub(crate) fn decode_data_url_bytes(data_url: &str, max_bytes: usize) -> Result<Vec<u8>, String> {
    let trimmed = data_url.trim();
    if !trimmed.starts_with("data:") {
        return Err("Not a data URL".to_string());
    }
    let (meta, payload) = trimmed
        .split_once(',')
        .ok_or_else(|| "Malformed data URL".to_string())?;
    let meta_lower = meta.to_ascii_lowercase();
    if !meta_lower.starts_with("data:image/") {
        return Err("Data URL is not an image".to_string());
    }
    if !meta_lower.contains(";base64") {
        return Err("Data URL is not base64 encoded".to_string());
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|error| format!("Invalid base64 payload: {error}"))?;
    if bytes.len() > max_bytes {
        return Err(format!(
            "Data URL image too large ({} bytes > {max_bytes})",
            bytes.len()
        ));
    }
    Ok(bytes)
}

pub(crate) fn truncate_message(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let truncated: String = input.chars().take(max_chars).collect();
    format!("{truncated}...")
}

/// Hands a link the hosted page tried to navigate to over to the OS browser.
pub(crate) fn open_external_url(url: &str) -> Result<(), String> {
    let candidate = url.trim();
    if candidate.is_empty() {
        return Err("Missing URL".to_string());
    }
    let parsed = reqwest::Url::parse(candidate).map_err(|error| format!("Invalid URL: {error}"))?;
    let scheme = parsed.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" && scheme != "mailto" {
        return Err(format!("Unsupported URL scheme: {scheme}"));
    }

    #[cfg(target_os = "macos")]
    let status = Command::new("open").arg(candidate).status();
    #[cfg(target_os = "windows")]
    let status = Command::new("cmd")
        .arg("/C")
        .arg("start")
        .arg("")
        .arg(candidate)
        .status();
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let status = Command::new("xdg-open").arg(candidate).status();

    let status = status.map_err(|error| format!("Failed to open URL: {error}"))?;
    if !status.success() {
        return Err(format!(
            "Failed to open URL (exit code {})",
            status.code().unwrap_or(-1)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_image_data_url() {
        let bytes = decode_data_url_bytes("data:image/png;base64,iVBORw0KGgo=", 1024).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_non_image_and_oversized_data_urls() {
        assert!(decode_data_url_bytes("blob:https://web.whatsapp.com/abc", 1024).is_err());
        assert!(decode_data_url_bytes("data:text/plain;base64,aGVsbG8=", 1024).is_err());
        assert!(decode_data_url_bytes("data:image/png,rawbytes", 1024).is_err());
        let err = decode_data_url_bytes("data:image/png;base64,iVBORw0KGgo=", 4).unwrap_err();
        assert!(err.contains("too large"));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_message("olá mundo", 3), "olá...");
        assert_eq!(truncate_message("short", 10), "short");
    }

    #[test]
    fn refuses_unsupported_schemes() {
        let err = open_external_url("file:///etc/passwd").unwrap_err();
        assert!(err.contains("Unsupported URL scheme"));
        assert!(open_external_url("   ").is_err());
    }
}
