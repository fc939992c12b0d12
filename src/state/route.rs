use std::fmt;

use crate::api::models::{ChatSummary, Message};

pub const FALLBACK_TITLE: &str = "Chat";

/// In-app location. Mirrors the `/`, `/profile` and `/chat/:id` paths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    Profile,
    Chat(String),
}

impl Route {
    /// Unknown paths land on `Home`.
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim().trim_end_matches('/');
        match trimmed {
            "" => Route::Home,
            "/profile" => Route::Profile,
            _ => match trimmed.strip_prefix("/chat/") {
                Some(id) if !id.is_empty() && !id.contains('/') => Route::Chat(id.to_string()),
                _ => Route::Home,
            },
        }
    }

    pub fn selected_chat(&self) -> Option<&str> {
        match self {
            Route::Chat(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Profile => f.write_str("/profile"),
            Route::Chat(id) => write!(f, "/chat/{id}"),
        }
    }
}

/// Title for the chat header: the listed summary wins, then the name the
/// server stamped on the thread's messages.
pub fn header_title(selected: &str, chats: &[ChatSummary], messages: &[Message]) -> String {
    chats
        .iter()
        .find(|c| c.id == selected)
        .map(ChatSummary::display_name)
        .or_else(|| messages.iter().find_map(|m| m.chat_name.clone()))
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/profile"), Route::Profile);
        assert_eq!(Route::parse("/chat/42"), Route::Chat("42".into()));
        assert_eq!(Route::parse("/chat/42/"), Route::Chat("42".into()));
    }

    #[test]
    fn unknown_paths_go_home() {
        assert_eq!(Route::parse("/chat/"), Route::Home);
        assert_eq!(Route::parse("/chat/1/extra"), Route::Home);
        assert_eq!(Route::parse("/settings"), Route::Home);
    }

    #[test]
    fn display_matches_parse() {
        let route = Route::Chat("abc".into());
        assert_eq!(route.to_string(), "/chat/abc");
        assert_eq!(Route::parse(&route.to_string()), route);
        assert_eq!(Route::Profile.selected_chat(), None);
    }

    #[test]
    fn header_prefers_list_then_messages() {
        let chats = vec![ChatSummary {
            id: "1".into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            last_message: None,
            last_message_at: None,
        }];
        assert_eq!(header_title("1", &chats, &[]), "Ann Lee");

        let messages: Vec<Message> = serde_json::from_value(serde_json::json!([{
            "_id": "m", "content": "x", "owner": "bot",
            "createdAt": "2024-01-01T00:00:00Z", "chatId": "2", "chatName": "Bo Ng"
        }]))
        .unwrap();
        assert_eq!(header_title("2", &chats, &messages), "Bo Ng");
        assert_eq!(header_title("3", &chats, &[]), FALLBACK_TITLE);
    }
}
