use serde::Serialize;
use std::time::Duration;
use tauri::{AppHandle, Manager, Runtime};

use crate::{settings::ChatLocator, ui_shell, AppState, ChatSearchReply, MAIN_WINDOW_LABEL};

const SEARCH_TEMPLATE: &str = include_str!("../scripts/chat_search.js");
const REQUEST_PLACEHOLDER: &str = "__ZAPTRAY_REQUEST__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReopenOutcome {
    Opened,
    NotFound,
    NothingRecorded,
    PageUnavailable,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
enum SearchRequest<'a> {
    Collect {
        request_id: u64,
        locators: &'a [ChatLocator],
    },
    Click {
        request_id: u64,
        locators: &'a [ChatLocator],
        strategy: usize,
        index: usize,
    },
}

fn render_search_script(request: &SearchRequest<'_>) -> Result<String, String> {
    let json = serde_json::to_string(request)
        .map_err(|error| format!("Failed to serialize chat search request: {error}"))?;
    Ok(SEARCH_TEMPLATE.replace(REQUEST_PLACEHOLDER, &json))
}

/// Picks the candidate to click for `identity`.
///
/// Exact equality wins over everything else. Failing that, the first candidate (in page
/// order) where either name contains the other, ignoring case. Overlapping names such as
/// "Ana" / "Ana Paula" are therefore resolved by position, not by closeness.
pub(crate) fn match_chat(candidates: &[String], identity: &str) -> Option<usize> {
    let target = identity.trim();
    if target.is_empty() {
        return None;
    }
    if let Some(index) = candidates
        .iter()
        .position(|candidate| candidate.trim() == target)
    {
        return Some(index);
    }
    let target_lower = target.to_lowercase();
    candidates.iter().position(|candidate| {
        let candidate_lower = candidate.trim().to_lowercase();
        !candidate_lower.is_empty()
            && (candidate_lower.contains(&target_lower) || target_lower.contains(&candidate_lower))
    })
}

/// Reopens the most recently notified conversation, if any.
pub(crate) async fn reopen_last_chat(app: AppHandle) -> ReopenOutcome {
    let identity = match app.try_state::<AppState>() {
        Some(state) => state
            .shell
            .lock()
            .ok()
            .and_then(|shell| shell.last_notified_chat.clone()),
        None => None,
    };
    ui_shell::show_main_window(&app);
    let Some(identity) = identity else {
        return ReopenOutcome::NothingRecorded;
    };
    let outcome = reopen_chat(&app, &identity).await;
    log::debug!("reopen {identity:?}: {outcome:?}");
    outcome
}

pub(crate) fn spawn_reopen_last_chat(app: &AppHandle) {
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        reopen_last_chat(app).await;
    });
}

async fn reopen_chat<R: Runtime>(app: &AppHandle<R>, identity: &str) -> ReopenOutcome {
    let Some(state) = app.try_state::<AppState>() else {
        return ReopenOutcome::PageUnavailable;
    };
    let locators = state.settings.chat_locators.clone();
    tokio::time::sleep(Duration::from_millis(state.settings.reopen_settle_delay_ms)).await;

    let collected = match page_request(app, |request_id| SearchRequest::Collect {
        request_id,
        locators: &locators,
    })
    .await
    {
        Some(reply) => reply,
        None => return ReopenOutcome::PageUnavailable,
    };
    let Some(strategy) = collected.strategy else {
        return ReopenOutcome::NotFound;
    };
    let Some(index) = match_chat(&collected.candidates, identity) else {
        return ReopenOutcome::NotFound;
    };

    let clicked = page_request(app, |request_id| SearchRequest::Click {
        request_id,
        locators: &locators,
        strategy,
        index,
    })
    .await;
    match clicked.and_then(|reply| reply.clicked) {
        Some(true) => ReopenOutcome::Opened,
        Some(false) => ReopenOutcome::NotFound,
        None => ReopenOutcome::PageUnavailable,
    }
}

/// Evaluates a search script in the main webview and waits for its bridge reply.
async fn page_request<'a, R, F>(app: &AppHandle<R>, build: F) -> Option<ChatSearchReply>
where
    R: Runtime,
    F: FnOnce(u64) -> SearchRequest<'a>,
{
    let state = app.try_state::<AppState>()?;
    let window = app.get_webview_window(MAIN_WINDOW_LABEL)?;
    let (request_id, receiver) = state.page_requests.lock().ok()?.register();

    let script = match render_search_script(&build(request_id)) {
        Ok(script) => script,
        Err(error) => {
            log::debug!("{error}");
            return None;
        }
    };
    if let Err(error) = window.eval(&script) {
        log::debug!("chat search script failed to run: {error}");
        return None;
    }
    match receiver.await {
        Ok(reply) => Some(reply),
        Err(_) => {
            log::debug!("chat search request {request_id} superseded");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::default_chat_locators;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn exact_match_beats_earlier_substring_match() {
        let candidates = names(&["Bob Smith", "Bob"]);
        assert_eq!(match_chat(&candidates, "Bob"), Some(1));
        let candidates = names(&["Bob", "Bob Smith"]);
        assert_eq!(match_chat(&candidates, "Bob"), Some(0));
    }

    #[test]
    fn substring_match_is_case_insensitive_in_both_directions() {
        let candidates = names(&["Alice", "Team Rocket"]);
        assert_eq!(match_chat(&candidates, "team"), Some(1));
        assert_eq!(match_chat(&candidates, "Alice (work)"), Some(0));
    }

    #[test]
    fn overlapping_names_resolve_to_first_in_page_order() {
        let candidates = names(&["Ana Paula", "Ana Clara"]);
        assert_eq!(match_chat(&candidates, "ana"), Some(0));
    }

    #[test]
    fn no_match_and_blank_inputs() {
        let candidates = names(&["", "Carol"]);
        assert_eq!(match_chat(&candidates, "Dave"), None);
        assert_eq!(match_chat(&candidates, "  "), None);
        assert_eq!(match_chat(&[], "Carol"), None);
    }

    #[test]
    fn matching_is_repeatable_for_unchanged_candidates() {
        let candidates = names(&["Bob Smith", "Bobby", "Bob"]);
        let first = match_chat(&candidates, "Bob");
        assert_eq!(first, match_chat(&candidates, "Bob"));
        let missing = match_chat(&candidates, "Zed");
        assert_eq!(missing, match_chat(&candidates, "Zed"));
    }

    #[test]
    fn collect_request_renders_locator_table() {
        let locators = default_chat_locators();
        let script = render_search_script(&SearchRequest::Collect {
            request_id: 42,
            locators: &locators,
        })
        .unwrap();
        assert!(!script.contains(REQUEST_PLACEHOLDER));
        assert!(script.contains(r#""action":"collect","request_id":42"#));
        assert!(script.contains("cell-frame-container"));
    }

    #[test]
    fn click_request_carries_strategy_and_index() {
        let locators = default_chat_locators();
        let script = render_search_script(&SearchRequest::Click {
            request_id: 7,
            locators: &locators,
            strategy: 1,
            index: 3,
        })
        .unwrap();
        assert!(script.contains(r#""action":"click","request_id":7"#));
        assert!(script.contains(r#""strategy":1,"index":3"#));
    }
}
