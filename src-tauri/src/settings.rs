use serde::{Deserialize, Serialize};
use std::fs;
use tauri::{AppHandle, Runtime};

use crate::{
    restrict_file_permissions, settings_file, DEFAULT_CONNECTION_PROBE_INTERVAL_SECS,
    DEFAULT_CONTACT_PHOTO_RETENTION_SECS, DEFAULT_HOME_URL, DEFAULT_NOTIFICATION_TIMEOUT_MS,
    DEFAULT_REOPEN_SETTLE_DELAY_MS, DEFAULT_REOPEN_SHORTCUT, DEFAULT_USER_AGENT,
    MAX_CONNECTION_PROBE_INTERVAL_SECS, MAX_REOPEN_SETTLE_DELAY_MS,
    MIN_CONNECTION_PROBE_INTERVAL_SECS,
};

/// One chat-list lookup strategy: which elements are chat entries and how to read their title.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub(crate) struct ChatLocator {
    pub(crate) container: String,
    #[serde(default)]
    pub(crate) title_selectors: Vec<String>,
    #[serde(default)]
    pub(crate) title_attributes: Vec<String>,
}

/// Finds the name of a chat with unread messages: take an unread badge, climb to the
/// closest chat row around it, then read the row's title. The badge itself is never read.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct UnreadChatProbe {
    pub(crate) badge: String,
    pub(crate) row: String,
    pub(crate) title_selectors: Vec<String>,
}

impl Default for UnreadChatProbe {
    fn default() -> Self {
        Self {
            badge: r#"#pane-side [data-testid="icon-unread-count"], #pane-side span[aria-label*="unread"]"#
                .to_string(),
            row: r#"[data-testid="cell-frame-container"], #pane-side [role="listitem"], #pane-side [role="row"]"#
                .to_string(),
            title_selectors: vec![
                r#"[data-testid="cell-frame-title"] span[title]"#.to_string(),
                "span[title]".to_string(),
            ],
        }
    }
}

/// DOM probes used by the page bridge. Serialized verbatim into the injected script.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct PageSelectors {
    pub(crate) offline_marker: String,
    pub(crate) avatar_candidates: String,
    pub(crate) active_chat_title: Vec<String>,
    pub(crate) unread_chat: UnreadChatProbe,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            offline_marker: r#"[data-testid="alert-phone-offline"]"#.to_string(),
            avatar_candidates:
                r#"img[src*="blob:"], img[src*="data:image"], [style*="background-image"]"#
                    .to_string(),
            active_chat_title: vec![
                r#"#main header [data-testid="conversation-info-header-chat-title"]"#
                    .to_string(),
                "#main header span[title]".to_string(),
            ],
            unread_chat: UnreadChatProbe::default(),
        }
    }
}

pub(crate) fn default_chat_locators() -> Vec<ChatLocator> {
    vec![
        ChatLocator {
            container: r#"[data-testid="cell-frame-container"]"#.to_string(),
            title_selectors: vec![
                r#"[data-testid="cell-frame-title"] span[title]"#.to_string(),
                "span[title]".to_string(),
            ],
            title_attributes: vec!["title".to_string(), "aria-label".to_string()],
        },
        ChatLocator {
            container: r#"#pane-side [role="listitem"]"#.to_string(),
            title_selectors: vec!["span[title]".to_string(), "span[dir=\"auto\"]".to_string()],
            title_attributes: vec!["aria-label".to_string()],
        },
        ChatLocator {
            container: r#"#pane-side [role="row"]"#.to_string(),
            title_selectors: vec!["span[title]".to_string()],
            title_attributes: vec!["aria-label".to_string()],
        },
    ]
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct StoredSettings {
    pub(crate) home_url: String,
    pub(crate) user_agent: String,
    pub(crate) start_minimized_to_tray: bool,
    pub(crate) reopen_shortcut: Option<String>,
    pub(crate) connection_probe_interval_secs: u64,
    pub(crate) reopen_settle_delay_ms: u64,
    pub(crate) notification_timeout_ms: u32,
    pub(crate) contact_photo_retention_secs: u64,
    pub(crate) page_selectors: PageSelectors,
    pub(crate) chat_locators: Vec<ChatLocator>,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            home_url: DEFAULT_HOME_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            start_minimized_to_tray: false,
            reopen_shortcut: Some(DEFAULT_REOPEN_SHORTCUT.to_string()),
            connection_probe_interval_secs: DEFAULT_CONNECTION_PROBE_INTERVAL_SECS,
            reopen_settle_delay_ms: DEFAULT_REOPEN_SETTLE_DELAY_MS,
            notification_timeout_ms: DEFAULT_NOTIFICATION_TIMEOUT_MS,
            contact_photo_retention_secs: DEFAULT_CONTACT_PHOTO_RETENTION_SECS,
            page_selectors: PageSelectors::default(),
            chat_locators: default_chat_locators(),
        }
    }
}

impl StoredSettings {
    /// Clamps numeric knobs and replaces invalid URL or selector tables with defaults.
    pub(crate) fn normalized(mut self) -> Self {
        let defaults = StoredSettings::default();

        match normalize_home_url(&self.home_url) {
            Ok(url) => self.home_url = url,
            Err(error) => {
                log::warn!("settings: {error}; using {}", defaults.home_url);
                self.home_url = defaults.home_url;
            }
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = defaults.user_agent;
        }
        self.reopen_shortcut = self
            .reopen_shortcut
            .map(|shortcut| shortcut.trim().to_string())
            .filter(|shortcut| !shortcut.is_empty());
        self.connection_probe_interval_secs = self.connection_probe_interval_secs.clamp(
            MIN_CONNECTION_PROBE_INTERVAL_SECS,
            MAX_CONNECTION_PROBE_INTERVAL_SECS,
        );
        self.reopen_settle_delay_ms = self.reopen_settle_delay_ms.min(MAX_REOPEN_SETTLE_DELAY_MS);
        if self.notification_timeout_ms == 0 {
            self.notification_timeout_ms = defaults.notification_timeout_ms;
        }

        if let Err(error) = validate_page_selectors(&self.page_selectors) {
            log::warn!("settings: page selectors rejected ({error}); using built-in selectors");
            self.page_selectors = defaults.page_selectors;
        }
        if let Err(error) = validate_chat_locators(&self.chat_locators) {
            log::warn!("settings: chat locators rejected ({error}); using built-in locators");
            self.chat_locators = defaults.chat_locators;
        }
        self
    }
}

pub(crate) fn read_settings<R: Runtime>(app: &AppHandle<R>) -> Result<StoredSettings, String> {
    let path = settings_file(app)?;
    if !path.exists() {
        return Ok(StoredSettings::default());
    }

    let content =
        fs::read_to_string(path).map_err(|error| format!("Failed to read settings: {error}"))?;
    parse_settings(&content)
}

pub(crate) fn parse_settings(content: &str) -> Result<StoredSettings, String> {
    serde_json::from_str::<StoredSettings>(content)
        .map(StoredSettings::normalized)
        .map_err(|error| format!("Failed to parse settings: {error}"))
}

pub(crate) fn save_settings<R: Runtime>(
    app: &AppHandle<R>,
    settings: &StoredSettings,
) -> Result<(), String> {
    let path = settings_file(app)?;
    let content = serde_json::to_string_pretty(settings)
        .map_err(|error| format!("Failed to serialize settings: {error}"))?;
    fs::write(&path, content).map_err(|error| format!("Failed to write settings: {error}"))?;
    restrict_file_permissions(&path);
    Ok(())
}

/// Loads settings at startup, writing the defaults on first run so the selector tables
/// can be edited by hand. Never fails: a broken file yields defaults.
pub(crate) fn load_or_init_settings<R: Runtime>(app: &AppHandle<R>) -> StoredSettings {
    let exists = settings_file(app).map(|path| path.exists()).unwrap_or(false);
    if !exists {
        let defaults = StoredSettings::default();
        if let Err(error) = save_settings(app, &defaults) {
            log::warn!("failed to write default settings: {error}");
        }
        return defaults;
    }
    match read_settings(app) {
        Ok(settings) => settings,
        Err(error) => {
            log::warn!("{error}; continuing with defaults");
            StoredSettings::default()
        }
    }
}

pub(crate) fn normalize_home_url(input: &str) -> Result<String, String> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("Home URL is required".to_string());
    }

    let url =
        reqwest::Url::parse(trimmed).map_err(|error| format!("Invalid home URL: {error}"))?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err("Home URL must start with http:// or https://".to_string());
    }
    if url.host_str().is_none() {
        return Err("Home URL has no host".to_string());
    }

    Ok(trimmed.to_string())
}

/// True when `target` stays on the hosted page's host and may load inside the window.
pub(crate) fn is_hosted_navigation(home_url: &str, target: &reqwest::Url) -> bool {
    if matches!(target.scheme(), "about" | "blob" | "data") {
        return true;
    }
    let Ok(home) = reqwest::Url::parse(home_url) else {
        return false;
    };
    home.host_str().is_some() && home.host_str() == target.host_str()
}

fn validate_selector(selector: &str) -> Result<(), String> {
    if selector.trim().is_empty() {
        return Err("empty selector".to_string());
    }
    scraper::Selector::parse(selector)
        .map(|_| ())
        .map_err(|error| format!("invalid selector {selector:?}: {error}"))
}

pub(crate) fn validate_page_selectors(selectors: &PageSelectors) -> Result<(), String> {
    validate_selector(&selectors.offline_marker)?;
    validate_selector(&selectors.avatar_candidates)?;
    validate_selector(&selectors.unread_chat.badge)?;
    validate_selector(&selectors.unread_chat.row)?;
    if selectors.unread_chat.title_selectors.is_empty() {
        return Err("no unread chat title selectors configured".to_string());
    }
    for selector in selectors
        .active_chat_title
        .iter()
        .chain(selectors.unread_chat.title_selectors.iter())
    {
        validate_selector(selector)?;
    }
    Ok(())
}

pub(crate) fn validate_chat_locators(locators: &[ChatLocator]) -> Result<(), String> {
    if locators.is_empty() {
        return Err("no chat locators configured".to_string());
    }
    for locator in locators {
        validate_selector(&locator.container)?;
        for selector in &locator.title_selectors {
            validate_selector(selector)?;
        }
        if let Some(attribute) = locator
            .title_attributes
            .iter()
            .find(|attribute| attribute.trim().is_empty() || attribute.contains(char::is_whitespace))
        {
            return Err(format!("invalid attribute name {attribute:?}"));
        }
    }
    Ok(())
}
