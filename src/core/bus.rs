//! In-process message bus.
//!
//! `LocalBus` connects several stores living in one process: each gets a
//! [`LocalEndpoint`], broadcasts land in per-endpoint queues, and requests
//! are served synchronously by whichever store was attached with
//! [`LocalBus::serve`]. Queued messages are picked up with
//! [`ProfileStore::dispatch_pending`].

use crate::core::error::ProfileError;
use crate::core::protocol::{EndpointId, Envelope, Message, Request, Response, Transport};
use crate::core::store::{ProfileStore, WeakProfileStore};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    queues: Mutex<Vec<(EndpointId, Sender<Envelope>)>>,
    coordinator: Mutex<Option<WeakProfileStore>>,
}

impl BusInner {
    fn queues(&self) -> MutexGuard<'_, Vec<(EndpointId, Sender<Envelope>)>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new endpoint to the bus.
    pub fn endpoint(&self) -> Arc<LocalEndpoint> {
        let id = EndpointId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::channel();
        self.inner.queues().push((id, tx));
        Arc::new(LocalEndpoint {
            id,
            bus: self.inner.clone(),
            inbox: Mutex::new(rx),
        })
    }

    /// Route every request on this bus to `store`.
    pub fn serve(&self, store: &ProfileStore) {
        *self
            .inner
            .coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(store.downgrade());
    }

    pub fn endpoint_count(&self) -> usize {
        self.inner.queues().len()
    }
}

pub struct LocalEndpoint {
    id: EndpointId,
    bus: Arc<BusInner>,
    inbox: Mutex<Receiver<Envelope>>,
}

impl Transport for LocalEndpoint {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn broadcast(&self, message: &Message, exclude: Option<EndpointId>) {
        let mut queues = self.bus.queues();
        queues.retain(|(id, tx)| {
            if *id == self.id || Some(*id) == exclude {
                return true;
            }
            tx.send(Envelope {
                from: self.id,
                message: message.clone(),
            })
            .is_ok()
        });
        debug!("{} broadcast to {} queues", self.id, queues.len());
    }

    fn request(&self, request: Request) -> Result<Response, ProfileError> {
        let coordinator = self
            .bus
            .coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(WeakProfileStore::upgrade)
            .ok_or_else(|| ProfileError::Channel("no coordinator on the bus".to_string()))?;
        Ok(coordinator.handle_request(self.id, request))
    }

    fn poll(&self) -> Vec<Envelope> {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_iter()
            .collect()
    }
}

impl Drop for LocalEndpoint {
    fn drop(&mut self) {
        self.bus.queues().retain(|(id, _)| *id != self.id);
    }
}
