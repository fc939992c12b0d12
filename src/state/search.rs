use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::client::ApiClient;
use crate::api::models::ChatSummary;
use crate::error::ApiError;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Forwards a value only after the input has been quiet for `delay`.
/// Values superseded within the window are dropped; dropping the
/// debouncer drops whatever is still pending.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn<F>(delay: Duration, emit: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        Self::spawn_on(&Handle::current(), delay, emit)
    }

    pub fn spawn_on<F>(handle: &Handle, delay: Duration, mut emit: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (input, mut rx) = mpsc::unbounded_channel::<T>();
        let task = handle.spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                match pending.take() {
                    None => match rx.recv().await {
                        Some(value) => pending = Some(value),
                        None => break,
                    },
                    Some(value) => {
                        tokio::select! {
                            next = rx.recv() => match next {
                                Some(newer) => pending = Some(newer),
                                None => break,
                            },
                            _ = tokio::time::sleep(delay) => emit(value),
                        }
                    }
                }
            }
        });
        Self { input, task }
    }

    pub fn push(&self, value: T) {
        if self.input.send(value).is_err() {
            log::warn!("debouncer task is gone");
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    All,
    Matching(String),
}

impl SearchRequest {
    pub async fn run(&self, api: &ApiClient) -> Result<Vec<ChatSummary>, ApiError> {
        match self {
            SearchRequest::All => api.chats().await,
            SearchRequest::Matching(query) => api.search_chats(query).await,
        }
    }
}

/// Raw and debounced query text for the chat search box.
#[derive(Debug, Default, Clone)]
pub struct SearchBox {
    query: String,
    debounced: String,
}

impl SearchBox {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn debounced(&self) -> &str {
        &self.debounced
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Called with the value the debouncer let through. Yields a request
    /// only when the debounced query actually changed.
    pub fn settle(&mut self, query: &str) -> Option<SearchRequest> {
        if query == self.debounced {
            return None;
        }
        self.debounced = query.to_string();
        if query.trim().is_empty() {
            Some(SearchRequest::All)
        } else {
            Some(SearchRequest::Matching(query.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl FnMut(String) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |v: String| sink.lock().unwrap().push(v))
    }

    #[tokio::test(start_paused = true)]
    async fn only_final_keystroke_is_emitted() {
        let (seen, emit) = collector();
        let debouncer = Debouncer::spawn(SEARCH_DEBOUNCE, emit);

        for partial in ["a", "an", "ann"] {
            debouncer.push(partial.to_string());
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["ann".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_pauses_emit_separately() {
        let (seen, emit) = collector();
        let debouncer = Debouncer::spawn(SEARCH_DEBOUNCE, emit);

        debouncer.push("ann".to_string());
        tokio::time::sleep(Duration::from_millis(600)).await;
        debouncer.push("bo".to_string());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["ann".to_string(), "bo".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels_pending_value() {
        let (seen, emit) = collector();
        let debouncer = Debouncer::spawn(SEARCH_DEBOUNCE, emit);
        debouncer.push("ann".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(debouncer);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn settle_dedupes_and_maps_blank_to_all() {
        let mut search = SearchBox::default();
        search.set_query("ann");
        assert_eq!(search.query(), "ann");
        assert_eq!(search.settle("ann"), Some(SearchRequest::Matching("ann".into())));
        assert_eq!(search.settle("ann"), None);
        assert_eq!(search.settle("  "), Some(SearchRequest::All));
        assert_eq!(search.debounced(), "  ");
        assert_eq!(search.settle(""), Some(SearchRequest::All));
    }
}
