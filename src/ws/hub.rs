//! Live client registry and event fan-out.
//!
//! Every connection has its own outbound queue and `Seq` counter. A send
//! locks the recipient, stamps its next `Seq` and enqueues while still holding
//! the lock, so the order a client receives messages in is the order of their
//! `Seq` values. Recipients are served concurrently; one that cannot accept a
//! message within the send timeout is dropped and its eviction signal fired,
//! so the socket that owns it can tear down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tracing::{debug, warn};

use crate::models::{EventKind, SceneObject, Session, Transform};

use super::connctx::{ConnCtx, ConnectionId};

pub struct Hub {
    clients: RwLock<HashMap<ConnectionId, Arc<Mutex<ConnCtx>>>>,
    next_id: AtomicU64,
    send_timeout: Duration,
    queue_capacity: usize,
}

impl Hub {
    pub fn new(send_timeout: Duration, queue_capacity: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            send_timeout,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Add a connection. The receiver yields the serialized frames to write
    /// to it; it ends once the connection is unregistered or dropped.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.clients
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(ConnCtx::new(tx))));
        debug!("Registered {}", id);
        (id, rx)
    }

    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.clients.write().await.remove(&id).is_some();
        if removed {
            debug!("Unregistered {}", id);
        }
        removed
    }

    /// Signal fired if the hub drops `id` after a failed send. `None` once the
    /// connection is no longer registered.
    pub async fn eviction_signal(&self, id: ConnectionId) -> Option<Arc<Notify>> {
        let ctx = self.clients.read().await.get(&id).cloned()?;
        let evicted = ctx.lock().await.evicted.clone();
        Some(evicted)
    }

    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Send `{Event, Seq, ...payload}` to every connection except `exclude`.
    /// Returns how many connections it was delivered to.
    pub async fn broadcast_event(
        &self,
        event: EventKind,
        payload: Map<String, Value>,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let mut message = payload;
        message.insert("Event".into(), Value::String(event.as_str().to_string()));
        self.fan_out(message, exclude).await
    }

    /// Forward an already-shaped inbound message to every other connection,
    /// re-stamping its `Seq` per recipient.
    pub async fn relay_message(&self, message: Map<String, Value>, exclude: ConnectionId) -> usize {
        self.fan_out(message, Some(exclude)).await
    }

    pub async fn item_added(&self, object: &SceneObject, exclude: Option<ConnectionId>) -> usize {
        self.broadcast_event(EventKind::ItemAdded, object.to_payload(), exclude)
            .await
    }

    pub async fn item_moved(&self, uid: &str, transform: &Transform, exclude: Option<ConnectionId>) -> usize {
        let mut payload = transform.to_payload();
        payload.insert("Uid".into(), Value::String(uid.to_string()));
        self.broadcast_event(EventKind::ItemMoved, payload, exclude).await
    }

    pub async fn item_removed(&self, uid: &str, exclude: Option<ConnectionId>) -> usize {
        self.broadcast_event(EventKind::ItemRemoved, uid_payload(uid), exclude)
            .await
    }

    pub async fn session_added(&self, session: &Session, exclude: Option<ConnectionId>) -> usize {
        self.broadcast_event(EventKind::SessionAdded, session.to_payload(), exclude)
            .await
    }

    pub async fn session_removed(&self, uid: &str, exclude: Option<ConnectionId>) -> usize {
        self.broadcast_event(EventKind::SessionRemoved, uid_payload(uid), exclude)
            .await
    }

    async fn fan_out(&self, message: Map<String, Value>, exclude: Option<ConnectionId>) -> usize {
        let recipients: Vec<(ConnectionId, Arc<Mutex<ConnCtx>>)> = {
            let clients = self.clients.read().await;
            clients
                .iter()
                .filter(|(id, _)| Some(**id) != exclude)
                .map(|(id, ctx)| (*id, ctx.clone()))
                .collect()
        };
        if recipients.is_empty() {
            return 0;
        }

        let message = &message;
        let sends = recipients.into_iter().map(|(id, ctx)| async move {
            let mut ctx = ctx.lock().await;
            let mut stamped = message.clone();
            stamped.insert("Seq".into(), Value::from(ctx.next_seq));
            let text = match serde_json::to_string(&stamped) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize message for {}: {}", id, e);
                    return Ok(());
                }
            };
            match ctx.outbound.send_timeout(text, self.send_timeout).await {
                Ok(()) => {
                    ctx.next_seq += 1;
                    Ok(())
                }
                Err(e) => Err((id, e)),
            }
        });

        let mut delivered = 0;
        let mut failed = Vec::new();
        for result in join_all(sends).await {
            match result {
                Ok(()) => delivered += 1,
                Err((id, e)) => {
                    warn!("Dropping {} after failed send: {}", id, e);
                    failed.push(id);
                }
            }
        }
        if !failed.is_empty() {
            let mut evicted = Vec::new();
            {
                let mut clients = self.clients.write().await;
                for id in failed {
                    if let Some(ctx) = clients.remove(&id) {
                        evicted.push(ctx);
                    }
                }
            }
            for ctx in evicted {
                ctx.lock().await.evicted.notify_one();
            }
        }
        delivered
    }
}

fn uid_payload(uid: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("Uid".into(), Value::String(uid.to_string()));
    payload
}
