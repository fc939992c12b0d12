//! View state for the message thread of the selected chat.
//!
//! Every asynchronous result is handed back together with the chat id it
//! was issued for. Results for a chat that is no longer selected are
//! dropped, so a slow response can never overwrite the thread the user
//! switched to in the meantime.

use chrono::{DateTime, Local, TimeZone, Utc};
use reqwest::StatusCode;

use crate::api::models::{Message, OutgoingMessage, Owner};
use crate::error::ApiError;
use crate::push::PushEvent;

pub const INVALID_CHAT_ID: &str = "Invalid chat ID";
pub const FETCH_FAILED: &str = "Failed to fetch messages";
pub const SEND_FAILED: &str = "Failed to send message";
pub const DELETE_FAILED: &str = "Failed to delete message";
pub const TOGGLE_FAILED: &str = "Failed to toggle auto message";
pub const EMPTY_THREAD: &str = "No messages yet";
pub const OFFLINE_NOTICE: &str = "Offline. New messages will appear once the connection is back.";

#[derive(Debug, PartialEq)]
pub enum ThreadBody<'a> {
    Loading,
    Error(&'a str),
    Empty,
    Messages(&'a [Message]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub id: String,
    pub text: String,
    pub side: Side,
    pub deletable: bool,
    pub time: String,
    pub avatar: String,
}

/// What a push event did to the thread.
#[derive(Debug, Default, PartialEq)]
pub struct PushOutcome {
    pub appended: bool,
    pub notification: Option<String>,
}

#[derive(Debug, Default)]
pub struct ThreadState {
    chat_id: Option<String>,
    messages: Vec<Message>,
    loading: bool,
    error: Option<String>,
    draft: String,
    auto_reply: bool,
    live: bool,
}

impl ThreadState {
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn auto_reply(&self) -> bool {
        self.auto_reply
    }

    /// Whether pushes are currently arriving.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    /// Notice to show above an open thread while the push link is down.
    pub fn connection_notice(&self) -> Option<&'static str> {
        (self.chat_id.is_some() && !self.live).then_some(OFFLINE_NOTICE)
    }

    pub fn body(&self) -> ThreadBody<'_> {
        if let Some(err) = &self.error {
            ThreadBody::Error(err)
        } else if self.loading {
            ThreadBody::Loading
        } else if self.messages.is_empty() {
            ThreadBody::Empty
        } else {
            ThreadBody::Messages(&self.messages)
        }
    }

    fn is_current(&self, chat_id: &str) -> bool {
        self.chat_id.as_deref() == Some(chat_id)
    }

    /// Select a chat. Returns the id to fetch, or `None` when the id is
    /// unusable, in which case the thread shows an error instead.
    pub fn open(&mut self, chat_id: Option<&str>) -> Option<String> {
        self.messages.clear();
        self.draft.clear();
        match chat_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                self.chat_id = Some(id.to_string());
                self.loading = true;
                self.error = None;
                Some(id.to_string())
            }
            None => {
                self.chat_id = None;
                self.loading = false;
                self.error = Some(INVALID_CHAT_ID.to_string());
                None
            }
        }
    }

    /// Returns whether the result was applied.
    pub fn finish_fetch(&mut self, for_chat: &str, result: Result<Vec<Message>, ApiError>) -> bool {
        if !self.is_current(for_chat) {
            log::debug!("dropping stale messages for chat {for_chat}");
            return false;
        }
        self.loading = false;
        match result {
            Ok(messages) => {
                self.messages = messages;
                self.error = None;
            }
            Err(e) => {
                log::error!("{FETCH_FAILED}: {e}");
                self.error = Some(FETCH_FAILED.to_string());
            }
        }
        true
    }

    /// The message to post, if the draft has any text and a chat is open.
    pub fn begin_send(&self) -> Option<OutgoingMessage> {
        let chat_id = self.chat_id.as_ref()?;
        if self.draft.trim().is_empty() {
            return None;
        }
        Some(OutgoingMessage { content: self.draft.clone(), chat_id: chat_id.clone() })
    }

    /// Returns whether the thread should be refetched.
    pub fn finish_send(&mut self, for_chat: &str, result: Result<(), ApiError>) -> bool {
        if !self.is_current(for_chat) {
            return false;
        }
        match result {
            Ok(()) => {
                self.draft.clear();
                true
            }
            Err(e) => {
                log::error!("{SEND_FAILED}: {e}");
                self.error = Some(SEND_FAILED.to_string());
                false
            }
        }
    }

    pub fn can_delete(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id && m.is_own())
    }

    pub fn finish_delete(&mut self, for_chat: &str, message_id: &str, result: Result<(), ApiError>) {
        if !self.is_current(for_chat) {
            return;
        }
        match result {
            Ok(()) => self.messages.retain(|m| m.id != message_id),
            Err(e) => {
                log::error!("{DELETE_FAILED}: {e}");
                self.error = Some(DELETE_FAILED.to_string());
            }
        }
    }

    pub fn requested_toggle(&self) -> bool {
        !self.auto_reply
    }

    /// The switch only moves when the server answered with a plain 200.
    pub fn finish_toggle(&mut self, requested: bool, result: Result<StatusCode, ApiError>) {
        match result {
            Ok(status) if status == StatusCode::OK => self.auto_reply = requested,
            Ok(status) => log::warn!("auto message toggle answered {status}, keeping switch"),
            Err(e) => {
                log::error!("{TOGGLE_FAILED}: {e}");
                self.error = Some(TOGGLE_FAILED.to_string());
            }
        }
    }

    pub fn on_push_event(&mut self, event: &PushEvent) -> PushOutcome {
        match event {
            PushEvent::Connected => {
                self.live = true;
                PushOutcome::default()
            }
            PushEvent::Disconnected => {
                self.live = false;
                PushOutcome::default()
            }
            PushEvent::NewMessage(message) => self.on_push(message),
        }
    }

    pub fn on_push(&mut self, message: &Message) -> PushOutcome {
        let mut outcome = PushOutcome::default();
        if self.is_current(&message.chat_id) {
            self.messages.push(message.clone());
            outcome.appended = true;
        }
        if message.owner == Owner::Bot {
            outcome.notification = Some(bot_notification(message));
        }
        outcome
    }

    pub fn views(&self) -> Vec<MessageView> {
        self.messages.iter().map(|m| message_view(m, &Local)).collect()
    }
}

pub fn bot_notification(message: &Message) -> String {
    let from = message.chat_name.as_deref().unwrap_or("chat");
    format!("New message from {from}: {}", message.content)
}

pub fn message_view<Tz: TimeZone>(message: &Message, tz: &Tz) -> MessageView
where
    Tz::Offset: std::fmt::Display,
{
    let own = message.is_own();
    MessageView {
        id: message.id.clone(),
        text: message.content.clone(),
        side: if own { Side::End } else { Side::Start },
        deletable: own,
        time: format_time(&message.created_at, tz),
        avatar: if own {
            "Me".to_string()
        } else {
            initials(message.chat_name.as_deref().unwrap_or("?"))
        },
    }
}

pub fn format_time<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format("%H:%M").to_string()
}

fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() { "?".to_string() } else { letters }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, chat: &str, owner: Owner) -> Message {
        Message {
            id: id.into(),
            content: format!("text {id}"),
            owner,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap(),
            chat_id: chat.into(),
            chat_name: Some("Ann Lee".into()),
        }
    }

    fn opened(chat: &str, messages: Vec<Message>) -> ThreadState {
        let mut state = ThreadState::default();
        let id = state.open(Some(chat)).unwrap();
        assert!(state.finish_fetch(&id, Ok(messages)));
        state
    }

    #[test]
    fn missing_id_is_invalid() {
        let mut state = ThreadState::default();
        assert_eq!(state.open(None), None);
        assert_eq!(state.body(), ThreadBody::Error(INVALID_CHAT_ID));
        assert_eq!(state.open(Some("  ")), None);
        assert_eq!(state.body(), ThreadBody::Error(INVALID_CHAT_ID));
    }

    #[test]
    fn loading_then_empty() {
        let mut state = ThreadState::default();
        state.open(Some("1"));
        assert_eq!(state.body(), ThreadBody::Loading);
        state.finish_fetch("1", Ok(vec![]));
        assert_eq!(state.body(), ThreadBody::Empty);
    }

    #[test]
    fn fetch_failure_message() {
        let mut state = ThreadState::default();
        state.open(Some("1"));
        state.finish_fetch("1", Err(ApiError::Status(StatusCode::NOT_FOUND)));
        assert_eq!(state.body(), ThreadBody::Error(FETCH_FAILED));
    }

    #[test]
    fn stale_fetch_is_dropped() {
        let mut state = ThreadState::default();
        state.open(Some("1"));
        state.open(Some("2"));
        assert!(!state.finish_fetch("1", Ok(vec![msg("a", "1", Owner::User)])));
        assert_eq!(state.body(), ThreadBody::Loading);
        assert!(state.finish_fetch("2", Ok(vec![msg("b", "2", Owner::User)])));
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].chat_id, "2");
    }

    #[test]
    fn blank_drafts_never_send() {
        let mut state = opened("1", vec![]);
        assert_eq!(state.begin_send(), None);
        state.set_draft(" \t\n");
        assert_eq!(state.begin_send(), None);
        state.set_draft("hello");
        assert_eq!(
            state.begin_send(),
            Some(OutgoingMessage { content: "hello".into(), chat_id: "1".into() })
        );
    }

    #[test]
    fn send_success_clears_and_refetches() {
        let mut state = opened("1", vec![]);
        state.set_draft("hello");
        assert!(state.finish_send("1", Ok(())));
        assert_eq!(state.draft(), "");
        // no optimistic append
        assert!(state.messages().is_empty());
    }

    #[test]
    fn send_failure_keeps_draft() {
        let mut state = opened("1", vec![]);
        state.set_draft("hello");
        assert!(!state.finish_send("1", Err(ApiError::Status(StatusCode::BAD_REQUEST))));
        assert_eq!(state.draft(), "hello");
        assert_eq!(state.body(), ThreadBody::Error(SEND_FAILED));
    }

    #[test]
    fn delete_removes_only_that_message() {
        let mut state = opened(
            "1",
            vec![msg("a", "1", Owner::User), msg("b", "1", Owner::Bot), msg("c", "1", Owner::User)],
        );
        assert!(state.can_delete("a"));
        assert!(!state.can_delete("b"));
        assert!(!state.can_delete("zzz"));
        state.finish_delete("1", "a", Ok(()));
        let ids: Vec<&str> = state.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn toggle_flips_only_on_200() {
        let mut state = opened("1", vec![]);
        let want = state.requested_toggle();
        assert!(want);
        state.finish_toggle(want, Ok(StatusCode::ACCEPTED));
        assert!(!state.auto_reply());
        state.finish_toggle(want, Err(ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        assert!(!state.auto_reply());
        state.finish_toggle(want, Ok(StatusCode::OK));
        assert!(state.auto_reply());
    }

    #[test]
    fn push_appends_only_for_active_chat() {
        let mut state = opened("1", vec![msg("a", "1", Owner::User)]);
        let outcome = state.on_push(&msg("b", "1", Owner::User));
        assert!(outcome.appended);
        assert_eq!(outcome.notification, None);
        assert_eq!(state.messages().len(), 2);

        let outcome = state.on_push(&msg("c", "9", Owner::User));
        assert!(!outcome.appended);
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn bot_push_notifies_for_any_chat() {
        let mut state = opened("1", vec![]);
        let outcome = state.on_push(&msg("x", "9", Owner::Bot));
        assert!(!outcome.appended);
        assert_eq!(outcome.notification.as_deref(), Some("New message from Ann Lee: text x"));
    }

    #[test]
    fn message_views_are_sender_relative() {
        let own = message_view(&msg("a", "1", Owner::User), &Utc);
        assert_eq!(own.side, Side::End);
        assert!(own.deletable);
        assert_eq!(own.time, "09:05");
        assert_eq!(own.avatar, "Me");

        let theirs = message_view(&msg("b", "1", Owner::Bot), &Utc);
        assert_eq!(theirs.side, Side::Start);
        assert!(!theirs.deletable);
        assert_eq!(theirs.avatar, "AL");
    }

    #[test]
    fn connection_events_drive_offline_notice() {
        let mut state = opened("1", vec![]);
        assert_eq!(state.connection_notice(), Some(OFFLINE_NOTICE));
        assert_eq!(state.on_push_event(&PushEvent::Connected), PushOutcome::default());
        assert!(state.is_live());
        assert_eq!(state.connection_notice(), None);
        state.on_push_event(&PushEvent::Disconnected);
        assert_eq!(state.connection_notice(), Some(OFFLINE_NOTICE));

        let outcome = state.on_push_event(&PushEvent::NewMessage(msg("b", "1", Owner::Bot)));
        assert!(outcome.appended);
        assert!(outcome.notification.is_some());
    }
}
