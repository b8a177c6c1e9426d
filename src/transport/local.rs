//! In-process transport for sockets accepted by the `/ws` endpoint

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{Payload, Transport, TransportError};

/// Socket table: connection id -> bounded outbound queue of that socket's writer task.
///
/// A missing entry or a closed queue means the socket is gone. A full queue
/// means the client is slow, which is backpressure rather than death.
pub struct LocalTransport {
    sockets: DashMap<String, mpsc::Sender<Payload>>,
    buffer: usize,
}

impl LocalTransport {
    pub fn new(buffer: usize) -> Self {
        Self {
            sockets: DashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Attach a socket; the returned receiver feeds its writer task.
    pub fn attach(&self, connection_id: &str) -> mpsc::Receiver<Payload> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.sockets.insert(connection_id.to_string(), tx);
        rx
    }

    pub fn detach(&self, connection_id: &str) {
        self.sockets.remove(connection_id);
    }

    pub fn is_attached(&self, connection_id: &str) -> bool {
        self.sockets.contains_key(connection_id)
    }

    pub fn attached_count(&self) -> usize {
        self.sockets.len()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: Payload,
    ) -> Result<(), TransportError> {
        let sender = match self.sockets.get(connection_id) {
            Some(entry) => entry.value().clone(),
            None => return Err(TransportError::Gone),
        };

        match sender.try_send(payload) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(TransportError::Throttled),
            Err(TrySendError::Closed(_)) => {
                // Writer task exited without detaching; drop the dead entry
                self.sockets
                    .remove_if(connection_id, |_, tx| tx.is_closed());
                Err(TransportError::Gone)
            }
        }
    }
}
