//! "changed" notifications for profile subscribers.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    Set,
    Delete,
    Clear,
    Reset,
    Reload,
    Save,
    /// Another endpoint saved this profile.
    Remote,
    /// A type, schema or default table this profile reads through changed.
    Layering,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEvent {
    pub locator: String,
    pub cause: ChangeCause,
}

/// Fan-out list of subscriber channels. Dropped receivers are pruned on emit.
#[derive(Debug, Default)]
pub struct Listeners {
    senders: Mutex<Vec<Sender<ProfileEvent>>>,
}

impl Listeners {
    pub fn subscribe(&self) -> Receiver<ProfileEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn emit(&self, event: ProfileEvent) {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
