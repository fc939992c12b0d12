use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::models::{AutoMessageToggle, ChatDraft, ChatSummary, Message, OutgoingMessage};
use crate::error::ApiError;

/// Thin wrapper over the chat REST API. Every call is a single request;
/// callers decide when to refetch.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub http: HttpClient,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_http(HttpClient::new(), base_url)
    }

    pub fn with_http(http: HttpClient, base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(&Self::base_api(base_url))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::NotABase(base.to_string()));
        }
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn base_api(base_url: &str) -> String {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.ends_with("/api") { trimmed.to_string() } else { format!("{}/api", trimmed) }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(req: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        Ok(Self::send(req).await?.json::<T>().await?)
    }

    pub async fn chats(&self) -> Result<Vec<ChatSummary>, ApiError> {
        log::debug!("GET chats");
        self.get_json(self.http.get(self.endpoint(&["chats"]))).await
    }

    pub async fn search_chats(&self, query: &str) -> Result<Vec<ChatSummary>, ApiError> {
        log::debug!("search chats: {query:?}");
        let req = self
            .http
            .get(self.endpoint(&["chats", "search"]))
            .query(&[("query", query)]);
        self.get_json(req).await
    }

    pub async fn create_chat(&self, draft: &ChatDraft) -> Result<(), ApiError> {
        Self::send(self.http.post(self.endpoint(&["chats"])).json(draft)).await?;
        Ok(())
    }

    pub async fn update_chat(&self, id: &str, draft: &ChatDraft) -> Result<(), ApiError> {
        Self::send(self.http.put(self.endpoint(&["chats", id])).json(draft)).await?;
        Ok(())
    }

    pub async fn delete_chat(&self, id: &str) -> Result<(), ApiError> {
        Self::send(self.http.delete(self.endpoint(&["chats", id]))).await?;
        Ok(())
    }

    pub async fn messages(&self, chat_id: &str) -> Result<Vec<Message>, ApiError> {
        self.get_json(self.http.get(self.endpoint(&["messages", chat_id]))).await
    }

    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<(), ApiError> {
        Self::send(self.http.post(self.endpoint(&["messages"])).json(message)).await?;
        Ok(())
    }

    pub async fn delete_message(&self, id: &str) -> Result<(), ApiError> {
        Self::send(self.http.delete(self.endpoint(&["messages", id]))).await?;
        Ok(())
    }

    /// Ask the server to enable or disable automatic replies. Returns the
    /// response status so callers can require a plain 200.
    pub async fn toggle_auto_message(&self, enabled: bool) -> Result<StatusCode, ApiError> {
        let req = self
            .http
            .post(self.endpoint(&["messages", "auto-message", "toggle"]))
            .json(&AutoMessageToggle { enabled });
        Ok(Self::send(req).await?.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_api_prefix_once() {
        let a = ApiClient::new("http://localhost:5000").unwrap();
        let b = ApiClient::new("http://localhost:5000/api/").unwrap();
        assert_eq!(a.base().as_str(), "http://localhost:5000/api");
        assert_eq!(a.base(), b.base());
    }

    #[test]
    fn endpoint_escapes_ids() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(
            client.endpoint(&["chats", "a b/c"]).as_str(),
            "http://localhost:5000/api/chats/a%20b%2Fc"
        );
        assert_eq!(
            client.endpoint(&["messages", "auto-message", "toggle"]).as_str(),
            "http://localhost:5000/api/messages/auto-message/toggle"
        );
    }

    #[test]
    fn rejects_garbage_base() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
