use chrono::{DateTime, Local, Utc};

use crate::api::client::ApiClient;
use crate::api::models::{ChatDraft, ChatSummary};
use crate::error::ApiError;
use crate::state::dialogs::{ConfirmDialog, CreateChatDialog};

pub const FETCH_FAILED: &str = "Failed to fetch chats";
pub const EMPTY_LIST: &str = "No chats found";

/// Mutations the list can issue. Each one is followed by a full refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

impl Mutation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Mutation::Create => "Failed to create chat",
            Mutation::Update => "Failed to update chat",
            Mutation::Delete => "Failed to delete chat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub chat_id: String,
    pub first_name: String,
    pub last_name: String,
}

/// What the list body should show.
#[derive(Debug, PartialEq)]
pub enum ListBody<'a> {
    Loading,
    Error(&'a str),
    Empty,
    Rows(&'a [ChatSummary]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub chat_id: String,
    pub title: String,
    pub link: String,
    pub preview: Option<String>,
    pub time: Option<String>,
}

/// Identifies one list request. Only the most recently issued one may
/// replace the displayed set.
pub type Ticket = u64;

#[derive(Debug, Default)]
pub struct ChatListState {
    chats: Vec<ChatSummary>,
    loading: bool,
    latest: Ticket,
    error: Option<String>,
    editing: Option<EditDraft>,
    pub confirm: ConfirmDialog,
    pub create: CreateChatDialog,
}

impl ChatListState {
    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn body(&self) -> ListBody<'_> {
        if self.loading {
            ListBody::Loading
        } else if let Some(err) = &self.error {
            ListBody::Error(err)
        } else if self.chats.is_empty() {
            ListBody::Empty
        } else {
            ListBody::Rows(&self.chats)
        }
    }

    fn issue(&mut self) -> Ticket {
        self.latest += 1;
        self.latest
    }

    /// Settle a request. Stale tickets are refused and leave everything as is.
    fn settle(&mut self, ticket: Ticket) -> bool {
        if ticket != self.latest {
            log::debug!("dropping chat list result {ticket}, latest is {}", self.latest);
            return false;
        }
        self.loading = false;
        true
    }

    /// Full refetch. Shows the loading state until the result lands.
    pub fn begin_fetch(&mut self) -> Ticket {
        self.loading = true;
        self.issue()
    }

    /// Returns whether the result was applied.
    pub fn finish_fetch(&mut self, ticket: Ticket, result: Result<Vec<ChatSummary>, ApiError>) -> bool {
        if !self.settle(ticket) {
            return false;
        }
        match result {
            Ok(chats) => {
                self.chats = chats;
                self.error = None;
            }
            Err(e) => {
                log::error!("{FETCH_FAILED}: {e}");
                self.error = Some(FETCH_FAILED.to_string());
            }
        }
        true
    }

    /// A search keeps the current rows on screen while it runs.
    pub fn begin_search(&mut self) -> Ticket {
        self.issue()
    }

    /// Search results replace the whole displayed set. A failed search
    /// leaves the list as it was.
    pub fn apply_search_results(&mut self, ticket: Ticket, result: Result<Vec<ChatSummary>, ApiError>) -> bool {
        if !self.settle(ticket) {
            return false;
        }
        match result {
            Ok(chats) => {
                self.chats = chats;
                self.error = None;
            }
            Err(e) => log::error!("Failed to search chats: {e}"),
        }
        true
    }

    /// Outcome of a create/update/delete. Returns whether a refetch is due.
    pub fn finish_mutation(&mut self, kind: Mutation, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                if kind == Mutation::Update {
                    self.editing = None;
                }
                true
            }
            Err(e) => {
                log::error!("{}: {e}", kind.failure_message());
                self.error = Some(kind.failure_message().to_string());
                false
            }
        }
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    pub fn is_editing(&self, chat_id: &str) -> bool {
        self.editing.as_ref().is_some_and(|e| e.chat_id == chat_id)
    }

    /// Switch a row into edit mode. Any other row being edited is abandoned.
    pub fn start_edit(&mut self, chat_id: &str) -> bool {
        let Some(chat) = self.chats.iter().find(|c| c.id == chat_id) else {
            return false;
        };
        self.editing = Some(EditDraft {
            chat_id: chat.id.clone(),
            first_name: chat.first_name.clone(),
            last_name: chat.last_name.clone(),
        });
        true
    }

    pub fn set_edit_first_name(&mut self, value: impl Into<String>) {
        if let Some(edit) = self.editing.as_mut() {
            edit.first_name = value.into();
        }
    }

    pub fn set_edit_last_name(&mut self, value: impl Into<String>) {
        if let Some(edit) = self.editing.as_mut() {
            edit.last_name = value.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// The update to send for the row being edited. The draft stays in
    /// place until the update succeeds.
    pub fn pending_update(&self) -> Option<ChatChange> {
        self.editing.as_ref().map(|e| ChatChange::Update {
            chat_id: e.chat_id.clone(),
            draft: ChatDraft { first_name: e.first_name.clone(), last_name: e.last_name.clone() },
        })
    }

    pub fn request_delete(&mut self, chat_id: &str) {
        self.confirm.open(chat_id);
    }

    pub fn confirm_delete(&mut self) -> Option<String> {
        self.confirm.confirm()
    }

    pub fn cancel_delete(&mut self) {
        self.confirm.cancel();
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.chats.iter().map(row_view).collect()
    }
}

pub fn row_view(chat: &ChatSummary) -> RowView {
    RowView {
        chat_id: chat.id.clone(),
        title: chat.display_name(),
        link: chat.link(),
        preview: chat.last_message.clone().filter(|m| !m.trim().is_empty()),
        time: chat.last_message_at.as_ref().map(short_date),
    }
}

fn short_date(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %-d").to_string()
}

/// A change to send to the server, tagged with what it is for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatChange {
    Create(ChatDraft),
    Update { chat_id: String, draft: ChatDraft },
    Delete(String),
}

impl ChatChange {
    pub fn kind(&self) -> Mutation {
        match self {
            ChatChange::Create(_) => Mutation::Create,
            ChatChange::Update { .. } => Mutation::Update,
            ChatChange::Delete(_) => Mutation::Delete,
        }
    }

    pub async fn apply(&self, api: &ApiClient) -> Result<(), ApiError> {
        match self {
            ChatChange::Create(draft) => api.create_chat(draft).await,
            ChatChange::Update { chat_id, draft } => api.update_chat(chat_id, draft).await,
            ChatChange::Delete(chat_id) => api.delete_chat(chat_id).await,
        }
    }
}
