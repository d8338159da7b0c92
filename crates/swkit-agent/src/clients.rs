//! Window clients of the agent's origin.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use swkit_common::{OptionExt, Result, SwKitError};
use tokio::sync::RwLock;
use url::Url;

use crate::capabilities::WindowRegistry;

/// A client (controlled page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub url: Url,
    pub client_type: ClientType,
    pub focused: bool,
}

/// Client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientType {
    #[default]
    Window,
    Worker,
    All,
}

impl Client {
    /// Create an unfocused window client.
    pub fn window(id: impl Into<String>, url: Url) -> Self {
        Self {
            id: id.into(),
            url,
            client_type: ClientType::Window,
            focused: false,
        }
    }
}

/// Options for `match_all`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientMatchOptions {
    pub client_type: ClientType,
}

impl ClientMatchOptions {
    /// Window clients only.
    pub fn windows() -> Self {
        Self {
            client_type: ClientType::Window,
        }
    }
}

/// In-memory window registry. Enumeration order is insertion order.
#[derive(Debug, Default)]
pub struct MemoryWindowRegistry {
    clients: RwLock<Vec<Client>>,
}

impl MemoryWindowRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client.
    pub async fn add(&self, client: Client) {
        self.clients.write().await.push(client);
    }

    /// Remove a client.
    pub async fn remove(&self, id: &str) -> Option<Client> {
        let mut clients = self.clients.write().await;
        let index = clients.iter().position(|c| c.id == id)?;
        Some(clients.remove(index))
    }

    /// Get a client by ID.
    pub async fn get(&self, id: &str) -> Option<Client> {
        self.clients.read().await.iter().find(|c| c.id == id).cloned()
    }

    /// Number of open clients.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Whether no clients are open.
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

#[async_trait]
impl WindowRegistry for MemoryWindowRegistry {
    async fn match_all(&self, options: ClientMatchOptions) -> Result<Vec<Client>> {
        let clients = self.clients.read().await;
        Ok(clients
            .iter()
            .filter(|c| match options.client_type {
                ClientType::All => true,
                t => c.client_type == t,
            })
            .cloned()
            .collect())
    }

    async fn focus(&self, id: &str) -> Result<Client> {
        let mut clients = self.clients.write().await;
        let target = clients
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.client_type)
            .ok_or_not_found(format!("client {}", id))?;
        if target != ClientType::Window {
            return Err(SwKitError::client("can only focus window clients"));
        }

        let mut focused = None;
        for client in clients.iter_mut() {
            client.focused = client.id == id;
            if client.focused {
                focused = Some(client.clone());
            }
        }
        focused.ok_or_not_found(format!("client {}", id))
    }

    async fn open_window(&self, url: &Url) -> Result<Client> {
        static COUNTER: AtomicU64 = AtomicU64::new(1);

        let mut clients = self.clients.write().await;
        for client in clients.iter_mut() {
            client.focused = false;
        }

        let mut client = Client::window(
            format!("client-{}", COUNTER.fetch_add(1, Ordering::Relaxed)),
            url.clone(),
        );
        client.focused = true;
        clients.push(client.clone());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_open_window() {
        let registry = MemoryWindowRegistry::new();
        let client = registry.open_window(&url("https://a.test/")).await.unwrap();

        assert_eq!(client.client_type, ClientType::Window);
        assert!(client.focused);
        assert_eq!(registry.get(&client.id).await, Some(client));
    }

    #[tokio::test]
    async fn test_match_all_preserves_order_and_filters() {
        let registry = MemoryWindowRegistry::new();
        registry.add(Client::window("w1", url("https://a.test/1"))).await;
        let mut worker = Client::window("k1", url("https://a.test/w.js"));
        worker.client_type = ClientType::Worker;
        registry.add(worker).await;
        registry.add(Client::window("w2", url("https://a.test/2"))).await;

        let windows = registry.match_all(ClientMatchOptions::windows()).await.unwrap();
        let ids: Vec<_> = windows.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w2"]);

        let all = registry
            .match_all(ClientMatchOptions {
                client_type: ClientType::All,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_focus_moves_focus() {
        let registry = MemoryWindowRegistry::new();
        registry.open_window(&url("https://a.test/1")).await.unwrap();
        registry.add(Client::window("w2", url("https://a.test/2"))).await;

        let focused = registry.focus("w2").await.unwrap();
        assert!(focused.focused);

        let windows = registry.match_all(ClientMatchOptions::windows()).await.unwrap();
        assert_eq!(windows.iter().filter(|c| c.focused).count(), 1);
    }

    #[tokio::test]
    async fn test_focus_rejects_non_window() {
        let registry = MemoryWindowRegistry::new();
        let mut worker = Client::window("k1", url("https://a.test/w.js"));
        worker.client_type = ClientType::Worker;
        registry.add(worker).await;

        assert!(matches!(
            registry.focus("k1").await,
            Err(SwKitError::Client { .. })
        ));
        assert!(matches!(
            registry.focus("missing").await,
            Err(SwKitError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = MemoryWindowRegistry::new();
        registry.add(Client::window("w1", url("https://a.test/"))).await;
        assert!(registry.remove("w1").await.is_some());
        assert!(registry.is_empty().await);
    }
}
