use crate::api::models::ChatDraft;

pub const NAMES_REQUIRED: &str = "Both first name and last name are required.";
pub const DELETE_CHAT_PROMPT: &str = "Are you sure you want to delete this chat?";

/// Yes/no gate for a destructive action. Open exactly while it holds a
/// target id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    target: Option<String>,
}

impl ConfirmDialog {
    pub fn open(&mut self, target: impl Into<String>) {
        self.target = Some(target.into());
    }

    pub fn is_open(&self) -> bool {
        self.target.is_some()
    }

    /// Close and hand back the target to act on.
    pub fn confirm(&mut self) -> Option<String> {
        self.target.take()
    }

    pub fn cancel(&mut self) {
        self.target = None;
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CreateChatDialog {
    open: bool,
    pub first_name: String,
    pub last_name: String,
    error: Option<String>,
}

impl CreateChatDialog {
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    /// Validate the drafts. On success the dialog resets and closes and the
    /// trimmed names are returned; otherwise it stays open with an error.
    pub fn submit(&mut self) -> Option<ChatDraft> {
        let first = self.first_name.trim();
        let last = self.last_name.trim();
        if first.is_empty() || last.is_empty() {
            self.error = Some(NAMES_REQUIRED.to_string());
            return None;
        }
        let draft = ChatDraft { first_name: first.to_string(), last_name: last.to_string() };
        self.close();
        Some(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_returns_single_target() {
        let mut dialog = ConfirmDialog::default();
        assert!(!dialog.is_open());
        dialog.open("a");
        dialog.open("b");
        assert!(dialog.is_open());
        assert_eq!(dialog.confirm().as_deref(), Some("b"));
        assert!(!dialog.is_open());
        assert_eq!(dialog.confirm(), None);
    }

    #[test]
    fn cancel_closes_without_target() {
        let mut dialog = ConfirmDialog::default();
        dialog.open("a");
        dialog.cancel();
        assert!(!dialog.is_open());
        assert_eq!(dialog.confirm(), None);
    }

    #[test]
    fn create_requires_both_names() {
        let mut dialog = CreateChatDialog::default();
        dialog.open();
        dialog.first_name = "Ann".into();
        dialog.last_name = "   ".into();
        assert_eq!(dialog.submit(), None);
        assert_eq!(dialog.error(), Some(NAMES_REQUIRED));
        assert!(dialog.is_open());
        assert_eq!(dialog.first_name, "Ann");
    }

    #[test]
    fn create_success_resets() {
        let mut dialog = CreateChatDialog::default();
        dialog.open();
        dialog.first_name = " Ann ".into();
        dialog.last_name = "Lee".into();
        let draft = dialog.submit().unwrap();
        assert_eq!(draft, ChatDraft { first_name: "Ann".into(), last_name: "Lee".into() });
        assert_eq!(dialog, CreateChatDialog::default());
    }

    #[test]
    fn close_discards_drafts_and_error() {
        let mut dialog = CreateChatDialog::default();
        dialog.open();
        dialog.first_name = "x".into();
        dialog.submit();
        dialog.close();
        assert!(!dialog.is_open());
        assert!(dialog.first_name.is_empty());
        assert_eq!(dialog.error(), None);
    }
}
