//! In-memory Transport implementation for deterministic testing.
//!
//! `SimNetwork` plays the role of the signaling/broker layer: it assigns
//! peer identities, tracks which logical connections exist, and delivers
//! lifecycle events into per-handle queues. Delivery is synchronous and
//! lossless, so tests control ordering entirely through when each driver
//! drains its queue.

use std::{
    collections::{HashMap, HashSet},
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use atelier_core::transport::{PeerConfig, Transport, TransportEvent, TransportHandle};
use atelier_proto::{Message, PeerId};
use tokio::sync::mpsc;

/// Normalized endpoint pair; connections are symmetric.
type Link = (PeerId, PeerId);

fn link(a: &PeerId, b: &PeerId) -> Link {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    endpoints: HashMap<PeerId, mpsc::UnboundedSender<TransportEvent>>,
    links: HashSet<Link>,
    fail_next_open: bool,
    last_config: Option<PeerConfig>,
}

/// Shared in-memory peer registry.
///
/// Clone freely: all clones address the same network.
#[derive(Clone, Default)]
pub struct SimNetwork {
    inner: Arc<Mutex<Inner>>,
}

impl SimNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Make the next [`Transport::open`] produce a handle that fails
    /// instead of opening. Models an unreachable signaling server.
    pub fn fail_next_open(&self) {
        self.lock().fail_next_open = true;
    }

    /// The `PeerConfig` passed to the most recent `open`, for asserting on
    /// relay resolution.
    pub fn last_config(&self) -> Option<PeerConfig> {
        self.lock().last_config.clone()
    }

    /// Deliver a raw, unvalidated payload from `from` to `to` over their
    /// existing connection. Lets tests inject malformed traffic below the
    /// protocol layer.
    ///
    /// Returns `false` if no such connection exists.
    pub fn send_raw(&self, from: &PeerId, to: &PeerId, payload: serde_json::Value) -> bool {
        let inner = self.lock();
        if !inner.links.contains(&link(from, to)) {
            return false;
        }
        Self::deliver(&inner, to, TransportEvent::Data { peer: from.clone(), payload });
        true
    }

    /// Abruptly fail the connection between `a` and `b`: both ends observe
    /// a `ConnectionError`.
    pub fn break_connection(&self, a: &PeerId, b: &PeerId) {
        let mut inner = self.lock();
        if !inner.links.remove(&link(a, b)) {
            return;
        }
        Self::deliver(
            &inner,
            a,
            TransportEvent::ConnectionError { peer: b.clone(), reason: "link failed".to_string() },
        );
        Self::deliver(
            &inner,
            b,
            TransportEvent::ConnectionError { peer: a.clone(), reason: "link failed".to_string() },
        );
    }

    fn deliver(inner: &Inner, to: &PeerId, event: TransportEvent) {
        if let Some(sender) = inner.endpoints.get(to) {
            // Receiver dropped means the handle is gone; losing the event
            // matches a real network race.
            let _ = sender.send(event);
        }
    }
}

#[async_trait]
impl Transport for SimNetwork {
    type Handle = SimHandle;

    async fn open(&self, config: PeerConfig) -> io::Result<SimHandle> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        inner.last_config = Some(config);
        inner.next_id += 1;
        let id = PeerId::new(format!("peer-{}", inner.next_id));

        if inner.fail_next_open {
            inner.fail_next_open = false;
            let _ = sender.send(TransportEvent::HandleError {
                reason: "signaling server unreachable".to_string(),
            });
            // Unregistered: the handle exists only to surface the error.
            return Ok(SimHandle { id, network: self.clone(), receiver, open: false });
        }

        let _ = sender.send(TransportEvent::HandleOpen { id: id.clone() });
        inner.endpoints.insert(id.clone(), sender);
        Ok(SimHandle { id, network: self.clone(), receiver, open: true })
    }
}

/// One simulated peer endpoint.
pub struct SimHandle {
    id: PeerId,
    network: SimNetwork,
    receiver: mpsc::UnboundedReceiver<TransportEvent>,
    open: bool,
}

impl SimHandle {
    /// This handle's assigned identity.
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// Drain one queued event without waiting, for deterministic pumping.
    pub fn try_next_event(&mut self) -> Option<TransportEvent> {
        self.receiver.try_recv().ok()
    }
}

#[async_trait]
impl TransportHandle for SimHandle {
    async fn connect(&mut self, peer: &PeerId) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "handle closed"));
        }

        let mut inner = self.network.lock();
        if !inner.endpoints.contains_key(peer) {
            SimNetwork::deliver(
                &inner,
                &self.id,
                TransportEvent::ConnectionError {
                    peer: peer.clone(),
                    reason: "peer not found".to_string(),
                },
            );
            return Ok(());
        }

        inner.links.insert(link(&self.id, peer));
        // Both ends observe the open, each naming the other.
        SimNetwork::deliver(&inner, peer, TransportEvent::ConnectionOpen { peer: self.id.clone() });
        SimNetwork::deliver(&inner, &self.id, TransportEvent::ConnectionOpen { peer: peer.clone() });
        Ok(())
    }

    async fn send(&mut self, peer: &PeerId, message: &Message) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "handle closed"));
        }

        let inner = self.network.lock();
        if !inner.links.contains(&link(&self.id, peer)) {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no open connection to peer"));
        }

        let payload = serde_json::to_value(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        SimNetwork::deliver(&inner, peer, TransportEvent::Data { peer: self.id.clone(), payload });
        Ok(())
    }

    async fn close_connection(&mut self, peer: &PeerId) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "handle closed"));
        }

        let mut inner = self.network.lock();
        if inner.links.remove(&link(&self.id, peer)) {
            SimNetwork::deliver(&inner, peer, TransportEvent::ConnectionClosed {
                peer: self.id.clone(),
            });
            SimNetwork::deliver(&inner, &self.id, TransportEvent::ConnectionClosed {
                peer: peer.clone(),
            });
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.receiver.recv().await
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let mut inner = self.network.lock();
        inner.endpoints.remove(&self.id);

        // Every surviving peer sees our connections close.
        let gone: Vec<Link> = inner
            .links
            .iter()
            .filter(|(a, b)| *a == self.id || *b == self.id)
            .cloned()
            .collect();
        for pair in gone {
            inner.links.remove(&pair);
            let remote = if pair.0 == self.id { &pair.1 } else { &pair.0 };
            SimNetwork::deliver(&inner, remote, TransportEvent::ConnectionClosed {
                peer: self.id.clone(),
            });
        }
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.close();
    }
}
