pub(crate) const APP_NAME: &str = "ZapTray";
#[cfg(any(target_os = "macos", target_os = "windows"))]
pub(crate) const APP_BUNDLE_ID: &str = "net.zaptray.desktop";
pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_TRAY_ID: &str = "main-tray";

pub(crate) const DEFAULT_HOME_URL: &str = "https://web.whatsapp.com";
pub(crate) const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub(crate) const DEFAULT_REOPEN_SHORTCUT: &str = "CommandOrControl+Shift+U";

pub(crate) const DEFAULT_NOTIFICATION_TITLE: &str = "WhatsApp";
pub(crate) const DEFAULT_NOTIFICATION_BODY: &str = "New message";
pub(crate) const NOTIFICATION_TITLE_SEPARATOR: &str = " - ";
pub(crate) const DEFAULT_NOTIFICATION_TIMEOUT_MS: u32 = 5_000;

pub(crate) const DEFAULT_CONNECTION_PROBE_INTERVAL_SECS: u64 = 10;
pub(crate) const MIN_CONNECTION_PROBE_INTERVAL_SECS: u64 = 5;
pub(crate) const MAX_CONNECTION_PROBE_INTERVAL_SECS: u64 = 60;
pub(crate) const DEFAULT_REOPEN_SETTLE_DELAY_MS: u64 = 1_000;
pub(crate) const MAX_REOPEN_SETTLE_DELAY_MS: u64 = 10_000;

pub(crate) const CONTACT_PHOTO_MAX_BYTES: usize = 256_000;
pub(crate) const CONTACT_PHOTO_REQUEST_TIMEOUT_SECS: u64 = 6;
pub(crate) const DEFAULT_CONTACT_PHOTO_RETENTION_SECS: u64 = 3_600;

pub(crate) const TRAY_TOOLTIP_BASE: &str = "ZapTray - WhatsApp";
