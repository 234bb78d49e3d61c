use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{LazyLock, Mutex};
use tauri::menu::MenuItem;
use tokio::sync::oneshot;

use crate::{
    settings::StoredSettings, DEFAULT_NOTIFICATION_BODY, DEFAULT_NOTIFICATION_TITLE,
    NOTIFICATION_TITLE_SEPARATOR,
};

static UNREAD_COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("unread count pattern is valid"));

#[derive(Clone)]
pub(crate) struct TrayMenuState {
    pub(crate) reopen_item: MenuItem<tauri::Wry>,
}

pub(crate) struct AppState {
    pub(crate) settings: StoredSettings,
    pub(crate) shell: Mutex<ApplicationState>,
    pub(crate) tray_menu: Mutex<Option<TrayMenuState>>,
    pub(crate) page_requests: Mutex<PendingPageRequest>,
    pub(crate) minimize_hint_shown: Mutex<bool>,
}

impl AppState {
    pub(crate) fn new(settings: StoredSettings) -> Self {
        Self {
            settings,
            shell: Mutex::new(ApplicationState::default()),
            tray_menu: Mutex::new(None),
            page_requests: Mutex::new(PendingPageRequest::default()),
            minimize_hint_shown: Mutex::new(false),
        }
    }
}

/// Process-lifetime shell state. Only the bridge handlers and user actions mutate it.
#[derive(Debug, Default)]
pub(crate) struct ApplicationState {
    pub(crate) unread_count: u64,
    pub(crate) is_connected: bool,
    pub(crate) last_notified_chat: Option<String>,
    pub(crate) last_notification: Option<NotificationPayload>,
}

impl ApplicationState {
    /// Replaces the unread count with the one parsed from `title`. Returns true when it changed.
    pub(crate) fn apply_title(&mut self, title: &str) -> bool {
        let count = parse_unread_count(title);
        if count == self.unread_count {
            return false;
        }
        self.unread_count = count;
        true
    }

    pub(crate) fn apply_connection(&mut self, connected: bool) -> bool {
        if connected == self.is_connected {
            return false;
        }
        self.is_connected = connected;
        true
    }

    /// Records an intercepted notification unless the main window has focus.
    pub(crate) fn accept_notification(
        &mut self,
        payload: NotificationPayload,
        window_focused: bool,
    ) -> Option<NotificationPlan> {
        if window_focused {
            return None;
        }
        let plan = NotificationPlan::from_payload(&payload);
        self.last_notified_chat = Some(plan.chat_identity.clone());
        self.last_notification = Some(payload);
        Some(plan)
    }
}

pub(crate) fn parse_unread_count(title: &str) -> u64 {
    UNREAD_COUNT_PATTERN
        .captures(title)
        .and_then(|captures| captures.get(1))
        .map(|digits| digits.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Structured data the page bridge assembles for every `new Notification(...)`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct NotificationPayload {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) icon: Option<String>,
    pub(crate) tag: Option<String>,
    pub(crate) image: Option<String>,
    pub(crate) badge: Option<String>,
    pub(crate) contact_photo: Option<String>,
    pub(crate) chat_name: Option<String>,
    pub(crate) active_chat_name: Option<String>,
    pub(crate) timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NotificationPlan {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) chat_identity: String,
    pub(crate) contact_photo: Option<String>,
}

impl NotificationPlan {
    pub(crate) fn from_payload(payload: &NotificationPayload) -> Self {
        let title = clean_notification_title(&payload.title);
        let body = if payload.body.is_empty() {
            DEFAULT_NOTIFICATION_BODY.to_string()
        } else {
            payload.body.clone()
        };
        let chat_identity = chat_name(payload.chat_name.as_deref())
            .or_else(|| chat_name(payload.active_chat_name.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| title.clone());
        Self {
            title,
            body,
            chat_identity,
            contact_photo: non_empty(payload.contact_photo.as_deref()).map(str::to_string),
        }
    }
}

/// Text before the first `" - "`. Only a missing title falls back to the default;
/// `" - WhatsApp"` cleans to an empty string.
pub(crate) fn clean_notification_title(raw: &str) -> String {
    let raw = if raw.is_empty() {
        DEFAULT_NOTIFICATION_TITLE
    } else {
        raw
    };
    match raw.split_once(NOTIFICATION_TITLE_SEPARATOR) {
        Some((head, _)) => head.to_string(),
        None => raw.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// A scraped chat name, unless it is blank or only digits (an unread badge, not a name).
fn chat_name(value: Option<&str>) -> Option<&str> {
    non_empty(value).filter(|value| !value.trim().chars().all(|c| c.is_ascii_digit()))
}

/// The page's answer to a host-initiated search (`candidates`) or click (`clicked`) request.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ChatSearchReply {
    pub(crate) request_id: u64,
    pub(crate) strategy: Option<usize>,
    pub(crate) candidates: Vec<String>,
    pub(crate) clicked: Option<bool>,
}

/// Single-slot rendezvous for host -> page requests. Registering a new request drops the
/// previous sender, so a superseded waiter resolves with a receive error.
#[derive(Default)]
pub(crate) struct PendingPageRequest {
    next_id: u64,
    slot: Option<(u64, oneshot::Sender<ChatSearchReply>)>,
}

impl PendingPageRequest {
    pub(crate) fn register(&mut self) -> (u64, oneshot::Receiver<ChatSearchReply>) {
        self.next_id = self.next_id.wrapping_add(1);
        let (tx, rx) = oneshot::channel();
        self.slot = Some((self.next_id, tx));
        (self.next_id, rx)
    }

    /// Routes a reply to its waiter. Replies for stale or unknown ids are dropped.
    pub(crate) fn resolve(&mut self, reply: ChatSearchReply) -> bool {
        match self.slot.take() {
            Some((id, tx)) if id == reply.request_id => tx.send(reply).is_ok(),
            other => {
                self.slot = other;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str) -> NotificationPayload {
        NotificationPayload {
            title: title.to_string(),
            ..NotificationPayload::default()
        }
    }

    #[test]
    fn unread_count_comes_from_first_parenthesized_number() {
        assert_eq!(parse_unread_count("WhatsApp (3)"), 3);
        assert_eq!(parse_unread_count("(12) WhatsApp (4)"), 12);
        assert_eq!(parse_unread_count("WhatsApp"), 0);
        assert_eq!(parse_unread_count("WhatsApp (x)"), 0);
        assert_eq!(parse_unread_count("(99999999999999999999999)"), u64::MAX);
    }

    #[test]
    fn title_update_replaces_instead_of_accumulating() {
        let mut state = ApplicationState::default();
        assert!(state.apply_title("WhatsApp (3)"));
        assert!(state.apply_title("WhatsApp (1)"));
        assert_eq!(state.unread_count, 1);
        assert!(!state.apply_title("(1) WhatsApp"));
        assert!(state.apply_title("WhatsApp"));
        assert_eq!(state.unread_count, 0);
    }

    #[test]
    fn connection_flag_reports_changes_only() {
        let mut state = ApplicationState::default();
        assert!(!state.is_connected);
        assert!(state.apply_connection(true));
        assert!(!state.apply_connection(true));
        assert!(state.apply_connection(false));
    }

    #[test]
    fn title_is_cut_at_first_separator() {
        assert_eq!(clean_notification_title("Alice - WhatsApp"), "Alice");
        assert_eq!(clean_notification_title("A - B - C"), "A");
        assert_eq!(clean_notification_title("Alice-Bob"), "Alice-Bob");
        assert_eq!(clean_notification_title(""), "WhatsApp");
    }

    #[test]
    fn cleaned_title_is_exactly_the_text_before_the_separator() {
        for raw in [" - WhatsApp", "   - x", "Alice - ", " Bob  - WhatsApp", "no separator"] {
            let expected = raw.split(" - ").next().unwrap();
            assert_eq!(clean_notification_title(raw), expected, "raw={raw:?}");
        }
    }

    #[test]
    fn only_an_empty_body_gets_placeholder() {
        let plan = NotificationPlan::from_payload(&payload("Alice"));
        assert_eq!(plan.body, "New message");

        let whitespace = NotificationPayload {
            title: "Alice".to_string(),
            body: "  ".to_string(),
            ..NotificationPayload::default()
        };
        assert_eq!(NotificationPlan::from_payload(&whitespace).body, "  ");
    }

    #[test]
    fn numeric_chat_names_are_ignored() {
        let p = NotificationPayload {
            title: "Alice - WhatsApp".to_string(),
            chat_name: Some("3".to_string()),
            active_chat_name: Some(" 12 ".to_string()),
            ..NotificationPayload::default()
        };
        assert_eq!(NotificationPlan::from_payload(&p).chat_identity, "Alice");

        let p = NotificationPayload {
            chat_name: Some("Room 101".to_string()),
            ..p
        };
        assert_eq!(NotificationPlan::from_payload(&p).chat_identity, "Room 101");
    }

    #[test]
    fn chat_identity_prefers_chat_name_then_active_chat_then_title() {
        let mut p = NotificationPayload {
            title: "WhatsApp".to_string(),
            active_chat_name: Some("Bob".to_string()),
            ..NotificationPayload::default()
        };
        assert_eq!(NotificationPlan::from_payload(&p).chat_identity, "Bob");

        p.chat_name = Some("Family".to_string());
        assert_eq!(NotificationPlan::from_payload(&p).chat_identity, "Family");

        p.chat_name = Some("  ".to_string());
        p.active_chat_name = None;
        p.title = "Carol - WhatsApp".to_string();
        assert_eq!(NotificationPlan::from_payload(&p).chat_identity, "Carol");
    }

    #[test]
    fn focused_window_suppresses_notification_and_keeps_state() {
        let mut state = ApplicationState {
            last_notified_chat: Some("Alice".to_string()),
            ..ApplicationState::default()
        };
        assert!(state.accept_notification(payload("Bob"), true).is_none());
        assert_eq!(state.last_notified_chat.as_deref(), Some("Alice"));
        assert!(state.last_notification.is_none());

        let plan = state.accept_notification(payload("Bob - WhatsApp"), false).unwrap();
        assert_eq!(plan.title, "Bob");
        assert_eq!(state.last_notified_chat.as_deref(), Some("Bob"));
        assert_eq!(state.last_notification.as_ref().unwrap().title, "Bob - WhatsApp");
    }

    #[test]
    fn payload_deserializes_from_bridge_json() {
        let json = r#"{"title":"Alice","body":"hi","icon":"","tag":"t1","contactPhoto":"data:image/png;base64,AA==","activeChatName":"Alice","timestamp":1700000000000}"#;
        let p: NotificationPayload = serde_json::from_str(json).unwrap();
        assert_eq!(p.tag.as_deref(), Some("t1"));
        assert_eq!(p.active_chat_name.as_deref(), Some("Alice"));
        assert_eq!(p.chat_name, None);
        assert_eq!(p.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn pending_request_routes_matching_reply_only() {
        let mut pending = PendingPageRequest::default();
        let (id, mut rx) = pending.register();
        let stale = ChatSearchReply {
            request_id: id + 7,
            ..ChatSearchReply::default()
        };
        assert!(!pending.resolve(stale));
        let reply = ChatSearchReply {
            request_id: id,
            candidates: vec!["Bob".to_string()],
            ..ChatSearchReply::default()
        };
        assert!(pending.resolve(reply.clone()));
        assert_eq!(rx.try_recv().unwrap(), reply);
    }

    #[test]
    fn registering_again_cancels_previous_waiter() {
        let mut pending = PendingPageRequest::default();
        let (_, mut first) = pending.register();
        let (second_id, _second) = pending.register();
        assert!(first.try_recv().is_err());
        assert_ne!(second_id, 0);
    }
}
