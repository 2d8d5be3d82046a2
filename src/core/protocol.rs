//! Change propagation between endpoints.
//!
//! One coordinator owns the disk. Every other endpoint keeps shadow copies
//! of the registry and of the profiles it loaded, and talks to the
//! coordinator through a [`Transport`]:
//!
//! - `request` is a synchronous round trip to the coordinator (bootstrap,
//!   document fetches, publishing a save or a table change);
//! - `broadcast` is fire-and-forget to every endpoint except the caller and
//!   an optional excluded sender, used by the coordinator to echo changes;
//! - `poll` hands back whatever arrived since the last call.
//!
//! Receivers apply a message to their shadows and notify local subscribers.
//! They never re-broadcast it.

use crate::core::error::ProfileError;
use crate::core::locator::Locator;
use crate::core::registry::ProfileType;
use crate::core::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub u64);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint-{}", self.0)
    }
}

/// State changes pushed between endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    ProfileChanged {
        locator: Locator,
        data: Map<String, Value>,
    },
    TypeRegistered {
        profile_type: ProfileType,
    },
    TypesCleared,
    SchemaRegistered {
        type_name: String,
        file: String,
        schema: Schema,
    },
    DefaultsChanged {
        file: String,
        data: Map<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: EndpointId,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub type_name: String,
    pub file: String,
    pub schema: Schema,
}

/// Everything a fresh endpoint needs before it can resolve profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub types: Vec<ProfileType>,
    #[serde(default)]
    pub schemas: Vec<SchemaEntry>,
    #[serde(default)]
    pub defaults: BTreeMap<String, Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Snapshot,
    /// Current on-disk content. With `create`, a missing file is written
    /// out empty first.
    Fetch {
        locator: Locator,
        #[serde(default)]
        create: bool,
    },
    /// Apply and echo a change; `ProfileChanged` is also written to disk.
    Publish { message: Message },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Snapshot { snapshot: RegistrySnapshot },
    Document { data: Map<String, Value> },
    Ack,
    Failed { reason: String },
}

pub trait Transport: Send + Sync {
    fn id(&self) -> EndpointId;

    /// Deliver to every other endpoint except `exclude`.
    fn broadcast(&self, message: &Message, exclude: Option<EndpointId>);

    /// Synchronous round trip to the coordinator.
    fn request(&self, request: Request) -> Result<Response, ProfileError>;

    fn poll(&self) -> Vec<Envelope> {
        Vec::new()
    }
}
