use std::fmt;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

/// Opaque handle of a live connection, issued by the hub at registration.
/// The coordinator uses it as the selection holder identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outbound side of one registered connection
#[derive(Debug)]
pub struct ConnCtx {
    /// Seq stamped on the next message sent to this connection
    pub next_seq: u64,
    pub outbound: mpsc::Sender<String>,
    /// Fired when the hub drops this connection after a failed send
    pub evicted: Arc<Notify>,
}

impl ConnCtx {
    pub fn new(outbound: mpsc::Sender<String>) -> Self {
        Self {
            next_seq: 1,
            outbound,
            evicted: Arc::new(Notify::new()),
        }
    }
}
