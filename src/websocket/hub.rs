//! WebSocket Connection Hub
//!
//! The dispatcher that connection actors talk to. Actors feed it parsed
//! requests and unregister notifications through channels; the hub task
//! applies them one at a time. Fan-out is a plain walk over registered
//! clients with exact topic matching.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use super::client::{Client, ClientId};
use super::messages::{event_payload, Request, RequestEvent, Response};

/// A parsed request paired with the client that sent it
#[derive(Debug)]
pub struct HubRequest {
    pub client: Arc<Client>,
    pub request: Request,
}

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the request intake channel
    pub request_capacity: usize,
    /// Topics that are per-identity and need an authenticated connection
    pub private_topics: Vec<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            request_capacity: 256,
            private_topics: vec![
                "order".to_string(),
                "trade".to_string(),
                "balance".to_string(),
            ],
        }
    }
}

/// Routes requests to clients and keeps the registry of live clients
pub struct Hub {
    clients: RwLock<HashMap<ClientId, Arc<Client>>>,
    config: HubConfig,
}

/// Receiving ends of the hub intake, consumed by [`Hub::run`]
pub struct HubReceivers {
    pub(crate) requests: mpsc::Receiver<HubRequest>,
    pub(crate) unregister: mpsc::UnboundedReceiver<Arc<Client>>,
}

/// What a connection actor holds to talk to the hub
#[derive(Clone)]
pub struct HubHandle {
    hub: Arc<Hub>,
    requests: mpsc::Sender<HubRequest>,
    unregister: mpsc::UnboundedSender<Arc<Client>>,
}

impl Hub {
    /// Create a hub and its intake channels
    pub fn new(config: HubConfig) -> (HubHandle, HubReceivers) {
        let (requests_tx, requests_rx) = mpsc::channel(config.request_capacity.max(1));
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();

        let hub = Arc::new(Self {
            clients: RwLock::new(HashMap::new()),
            config,
        });

        let handle = HubHandle {
            hub,
            requests: requests_tx,
            unregister: unregister_tx,
        };
        let receivers = HubReceivers {
            requests: requests_rx,
            unregister: unregister_rx,
        };
        (handle, receivers)
    }

    /// Create a hub and spawn its intake loop
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (handle, receivers) = Self::new(config);
        let hub = Arc::clone(&handle.hub);
        let task = tokio::spawn(async move { hub.run(receivers).await });
        (handle, task)
    }

    /// Process requests and unregistrations until every sender is gone
    pub async fn run(self: Arc<Self>, mut receivers: HubReceivers) {
        tracing::debug!("Hub started");
        loop {
            tokio::select! {
                Some(client) = receivers.unregister.recv() => {
                    self.handle_unregister(client).await;
                }
                Some(req) = receivers.requests.recv() => {
                    self.handle_request(req).await;
                }
                else => break,
            }
        }
        tracing::debug!("Hub stopped");
    }

    /// Register a new client and apply the streams it asked for at connect time
    pub async fn handle_subscribe(&self, client: &Arc<Client>, streams: &[String]) {
        self.clients
            .write()
            .await
            .insert(client.id(), Arc::clone(client));

        if client.is_authenticated() {
            tracing::info!(client_id = %client.id(), identity = %client.identity(), "New authenticated connection");
        } else {
            tracing::info!(client_id = %client.id(), "New anonymous connection");
        }

        if streams.is_empty() {
            return;
        }
        self.subscribe(client, streams).await;
        client.send(Response::success(RequestEvent::Subscribe, client.subscriptions().await).encode());
    }

    async fn handle_request(&self, req: HubRequest) {
        let HubRequest { client, request } = req;
        match request.event {
            RequestEvent::Subscribe => self.subscribe(&client, &request.streams).await,
            RequestEvent::Unsubscribe => self.unsubscribe(&client, &request.streams).await,
        }

        tracing::debug!(
            client_id = %client.id(),
            event = ?request.event,
            streams = ?request.streams,
            "Applied request"
        );
        client.send(Response::success(request.event, client.subscriptions().await).encode());
    }

    async fn handle_unregister(&self, client: Arc<Client>) {
        let removed = self.clients.write().await.remove(&client.id());
        client.close();
        if removed.is_some() {
            tracing::info!(client_id = %client.id(), "Client unregistered");
        }
    }

    async fn subscribe(&self, client: &Client, streams: &[String]) {
        for topic in streams {
            if self.is_private_topic(topic) {
                if client.is_authenticated() {
                    client.subscribe_private(topic).await;
                } else {
                    tracing::debug!(client_id = %client.id(), topic = %topic, "Anonymous private subscription ignored");
                }
            } else {
                client.subscribe_public(topic).await;
            }
        }
    }

    async fn unsubscribe(&self, client: &Client, streams: &[String]) {
        for topic in streams {
            if self.is_private_topic(topic) && client.is_authenticated() {
                client.unsubscribe_private(topic).await;
            } else {
                client.unsubscribe_public(topic).await;
            }
        }
    }

    /// Deliver an event to every client subscribed to the public `topic`
    ///
    /// Returns the number of clients the event was queued for.
    pub async fn publish(&self, topic: &str, payload: &Value) -> usize {
        let text = event_payload(topic, payload);
        let mut delivered = 0;
        for client in self.snapshot().await {
            if client.is_subscribed_public(topic).await {
                client.send(text.clone());
                delivered += 1;
            }
        }
        tracing::trace!(topic = %topic, subscribers = delivered, "Published event");
        delivered
    }

    /// Deliver an event to the connections of `identity` subscribed to the private `topic`
    pub async fn publish_private(&self, identity: &str, topic: &str, payload: &Value) -> usize {
        let text = event_payload(topic, payload);
        let mut delivered = 0;
        for client in self.snapshot().await {
            if client.identity() == identity && client.is_subscribed_private(topic).await {
                client.send(text.clone());
                delivered += 1;
            }
        }
        tracing::trace!(topic = %topic, identity = %identity, subscribers = delivered, "Published private event");
        delivered
    }

    /// Get the current connection count
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    fn is_private_topic(&self, topic: &str) -> bool {
        self.config.private_topics.iter().any(|t| t == topic)
    }

    async fn snapshot(&self) -> Vec<Arc<Client>> {
        self.clients.read().await.values().cloned().collect()
    }
}

impl HubHandle {
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Whether the hub task still accepts requests
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }

    /// Forward a parsed request to the hub task
    pub async fn submit(&self, client: Arc<Client>, request: Request) -> Result<(), HubError> {
        self.requests
            .send(HubRequest { client, request })
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Ask the hub to forget `client`
    pub fn unregister(&self, client: Arc<Client>) {
        if self.unregister.send(client).is_err() {
            tracing::warn!("Hub stopped before client could be unregistered");
        }
    }

    pub async fn handle_subscribe(&self, client: &Arc<Client>, streams: &[String]) {
        self.hub.handle_subscribe(client, streams).await;
    }
}

/// Errors that can occur talking to the hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Hub is not running")]
    Stopped,
}
