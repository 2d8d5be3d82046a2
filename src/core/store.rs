//! The profile store.
//!
//! A [`ProfileStore`] is the per-process state container: the type registry,
//! the identity cache of loaded profiles, the schema table and the per-file
//! default documents. It is cheap to clone and every clone shares the same
//! state, so it can be handed to every consumer in the process.
//!
//! A store runs in one of two roles. The coordinator owns the disk: it reads
//! and writes profile files and echoes every change to the other endpoints.
//! An endpoint keeps shadow copies and routes reads and writes through the
//! coordinator over its [`Transport`].
//!
//! # Lookup order
//!
//! [`Profile::get`] answers from the first layer that holds the full path:
//!
//! 1. the profile's own data;
//! 2. the same file under each ancestor type, nearest parent first;
//! 3. the default document registered for the file, if any;
//! 4. the schema default of the first path segment, when the profile's root
//!    type has a schema for this file. This layer is single-level: a missing
//!    nested path under a declared key yields that key's whole default.
//!
//! # Reset
//!
//! [`ProfileStore::reset`] drops every type, schema, default and cached
//! profile. Handles obtained before the reset keep their own data but are
//! detached: lookups no longer fall through to ancestors, `save` fails with
//! [`ProfileError::UnknownType`] until the type is registered again, and a
//! later `load` of the same locator yields a new, unrelated instance.

use crate::core::config::{ReloadPolicy, StoreConfig};
use crate::core::document::{self, Loaded};
use crate::core::error::ProfileError;
use crate::core::event::{ChangeCause, Listeners, ProfileEvent};
use crate::core::locator::Locator;
use crate::core::path::{self, KeyPath};
use crate::core::protocol::{
    EndpointId, Envelope, Message, RegistrySnapshot, Request, Response, SchemaEntry, Transport,
};
use crate::core::registry::{ProfileType, TypeRegistry};
use crate::core::schema::{self, Schema};
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Endpoint,
}

#[derive(Default)]
struct StoreState {
    registry: TypeRegistry,
    profiles: HashMap<Locator, Arc<ProfileCell>>,
    schemas: HashMap<(String, String), Arc<Schema>>,
    defaults: HashMap<String, Arc<Map<String, Value>>>,
}

impl StoreState {
    fn schema_for(&self, locator: &Locator) -> Option<Arc<Schema>> {
        let root = self.registry.root_of(locator.type_name())?;
        self.schemas
            .get(&(root.name.clone(), locator.file().to_string()))
            .cloned()
    }

    fn clear(&mut self) {
        self.registry.clear();
        self.profiles.clear();
        self.schemas.clear();
        self.defaults.clear();
    }
}

struct Shared {
    role: Role,
    reload: ReloadPolicy,
    indent: usize,
    transport: Option<Arc<dyn Transport>>,
    state: Mutex<StoreState>,
}

struct ProfileCell {
    locator: Locator,
    data: Mutex<Map<String, Value>>,
    listeners: Listeners,
    /// Set once the source file is known to exist.
    materialized: AtomicBool,
}

impl ProfileCell {
    fn new(locator: Locator, data: Map<String, Value>, materialized: bool) -> Self {
        ProfileCell {
            locator,
            data: Mutex::new(data),
            listeners: Listeners::default(),
            materialized: AtomicBool::new(materialized),
        }
    }

    fn data(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, cause: ChangeCause) {
        self.listeners.emit(ProfileEvent {
            locator: self.locator.to_string(),
            cause,
        });
    }
}

/// Values a profile reads through after its own data.
struct Layers {
    ancestors: Vec<Arc<ProfileCell>>,
    defaults: Option<Arc<Map<String, Value>>>,
    schema: Option<Arc<Schema>>,
}

#[derive(Clone)]
pub struct ProfileStore {
    shared: Arc<Shared>,
}

/// Non-owning handle, used by transports that route requests back to a
/// coordinator without keeping it alive.
#[derive(Clone)]
pub struct WeakProfileStore(Weak<Shared>);

impl WeakProfileStore {
    pub fn upgrade(&self) -> Option<ProfileStore> {
        self.0.upgrade().map(|shared| ProfileStore { shared })
    }
}

impl ProfileStore {
    /// A standalone coordinator with no other endpoints.
    pub fn new(config: StoreConfig) -> Self {
        Self::build(Role::Coordinator, &config, None).with_configured_tables(&config)
    }

    /// A coordinator that echoes changes over `transport`.
    pub fn coordinator(config: StoreConfig, transport: Arc<dyn Transport>) -> Self {
        Self::build(Role::Coordinator, &config, Some(transport)).with_configured_tables(&config)
    }

    /// An endpoint bootstrapped from the coordinator's registry snapshot.
    ///
    /// Only `reload` and `indent` are taken from `config`; types and schemas
    /// come from the coordinator.
    pub fn connect(config: StoreConfig, transport: Arc<dyn Transport>) -> Result<Self, ProfileError> {
        let store = Self::build(Role::Endpoint, &config, Some(transport));
        match store.request(Request::Snapshot)? {
            Response::Snapshot { snapshot } => {
                store.install_snapshot(snapshot);
                Ok(store)
            }
            Response::Failed { reason } => Err(ProfileError::Remote(reason)),
            other => Err(ProfileError::Channel(format!(
                "unexpected reply to snapshot request: {:?}",
                other
            ))),
        }
    }

    fn build(role: Role, config: &StoreConfig, transport: Option<Arc<dyn Transport>>) -> Self {
        ProfileStore {
            shared: Arc::new(Shared {
                role,
                reload: config.reload,
                indent: config.indent,
                transport,
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    fn with_configured_tables(self, config: &StoreConfig) -> Self {
        for def in &config.types {
            if let Err(e) = self.register(&def.name, &def.dir, def.parent.as_deref()) {
                warn!("Skipping configured type `{}`: {}", def.name, e);
            }
        }
        for def in &config.schemas {
            if let Err(e) = self.register_schema(&def.locator, &def.example) {
                warn!("Skipping configured schema for {}: {}", def.locator, e);
            }
        }
        self
    }

    pub fn role(&self) -> Role {
        self.shared.role
    }

    pub fn endpoint_id(&self) -> Option<EndpointId> {
        self.shared.transport.as_ref().map(|t| t.id())
    }

    pub fn downgrade(&self) -> WeakProfileStore {
        WeakProfileStore(Arc::downgrade(&self.shared))
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ----- type registry -----

    pub fn register(
        &self,
        name: &str,
        dir: impl Into<PathBuf>,
        parent: Option<&str>,
    ) -> Result<ProfileType, ProfileError> {
        let registered = self.state().registry.register(name, dir, parent)?.clone();
        self.notify_dependents_of_type(&registered.name);
        self.publish(Message::TypeRegistered {
            profile_type: registered.clone(),
        });
        Ok(registered)
    }

    pub fn inherit(&self, name: &str, parent: &str) -> Result<ProfileType, ProfileError> {
        let updated = self.state().registry.inherit(name, parent)?.clone();
        self.notify_dependents_of_type(&updated.name);
        self.publish(Message::TypeRegistered {
            profile_type: updated.clone(),
        });
        Ok(updated)
    }

    /// Drop every type, schema, default and cached profile.
    pub fn reset(&self) {
        self.state().clear();
        info!("Profile store reset");
        self.publish(Message::TypesCleared);
    }

    pub fn storage_dir(&self, name: &str) -> Option<PathBuf> {
        self.state()
            .registry
            .storage_dir(name)
            .map(|p| p.to_path_buf())
    }

    pub fn types(&self) -> Vec<ProfileType> {
        self.state().registry.types().cloned().collect()
    }

    /// `name` and its ancestors, root last.
    pub fn chain(&self, name: &str) -> Vec<ProfileType> {
        self.state()
            .registry
            .chain(name)
            .into_iter()
            .cloned()
            .collect()
    }

    // ----- schemas and defaults -----

    /// Attach a schema built from `example` to the root type of `locator`.
    pub fn register_schema(
        &self,
        locator: &str,
        example: &Map<String, Value>,
    ) -> Result<(), ProfileError> {
        let locator: Locator = locator.parse()?;
        let schema = Schema::from_example(example);
        {
            let mut state = self.state();
            let ty = state
                .registry
                .resolve(locator.type_name())
                .ok_or_else(|| ProfileError::UnknownType(locator.type_name().to_string()))?;
            if let Some(parent) = &ty.parent {
                warn!(
                    "Ignoring schema for {}: type `{}` inherits `{}`, schemas belong on root types",
                    locator,
                    ty.name,
                    parent
                );
                return Err(ProfileError::NonRootSchema {
                    type_name: ty.name.clone(),
                });
            }
            state.schemas.insert(
                (locator.type_name().to_string(), locator.file().to_string()),
                Arc::new(schema.clone()),
            );
        }
        self.notify_file_under_root(locator.type_name(), locator.file());
        self.publish(Message::SchemaRegistered {
            type_name: locator.type_name().to_string(),
            file: locator.file().to_string(),
            schema,
        });
        Ok(())
    }

    /// Schema governing writes to `locator`, via its root type.
    pub fn schema_for(&self, locator: &Locator) -> Option<Arc<Schema>> {
        self.state().schema_for(locator)
    }

    /// Default document for `file`, shared by every type.
    pub fn set_defaults(&self, file: &str, data: Map<String, Value>) {
        self.state()
            .defaults
            .insert(file.to_string(), Arc::new(data.clone()));
        self.notify_file(file);
        self.publish(Message::DefaultsChanged {
            file: file.to_string(),
            data,
        });
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state();
        RegistrySnapshot {
            types: state.registry.types().cloned().collect(),
            schemas: state
                .schemas
                .iter()
                .map(|((type_name, file), schema)| SchemaEntry {
                    type_name: type_name.clone(),
                    file: file.clone(),
                    schema: schema.as_ref().clone(),
                })
                .collect(),
            defaults: state
                .defaults
                .iter()
                .map(|(file, data)| (file.clone(), data.as_ref().clone()))
                .collect(),
        }
    }

    fn install_snapshot(&self, snapshot: RegistrySnapshot) {
        let mut state = self.state();
        for ty in snapshot.types {
            state.registry.insert(ty);
        }
        for entry in snapshot.schemas {
            state
                .schemas
                .insert((entry.type_name, entry.file), Arc::new(entry.schema));
        }
        for (file, data) in snapshot.defaults {
            state.defaults.insert(file, Arc::new(data));
        }
        debug!(
            "Installed registry snapshot with {} types",
            state.registry.len()
        );
    }

    // ----- profiles -----

    /// Resolve `locator` to its shared profile instance.
    pub fn load(&self, locator: &str) -> Result<Profile, ProfileError> {
        let locator: Locator = locator.parse().inspect_err(|e| {
            error!("Failed to load profile {}: {}", locator, e);
        })?;
        self.load_locator(&locator)
    }

    /// [`load`](Self::load), registering `defaults` for the locator's file first.
    pub fn load_with_defaults(
        &self,
        locator: &str,
        defaults: Map<String, Value>,
    ) -> Result<Profile, ProfileError> {
        let parsed: Locator = locator.parse().inspect_err(|e| {
            error!("Failed to load profile {}: {}", locator, e);
        })?;
        self.set_defaults(parsed.file(), defaults);
        self.load_locator(&parsed)
    }

    pub fn load_locator(&self, locator: &Locator) -> Result<Profile, ProfileError> {
        self.load_cell(locator, true).map(|cell| self.handle(cell))
    }

    /// Cached cell for `locator`, read from its source on a miss.
    ///
    /// Without `create` a missing file stays missing; ancestor lookups load
    /// this way. A later `create` load of the same cell writes the file.
    fn load_cell(&self, locator: &Locator, create: bool) -> Result<Arc<ProfileCell>, ProfileError> {
        let cached = {
            let state = self.state();
            let cached = state.profiles.get(locator).cloned();
            if cached.is_none() && state.registry.resolve(locator.type_name()).is_none() {
                error!(
                    "Failed to load profile {}: profile type not found",
                    locator
                );
                return Err(ProfileError::UnknownType(locator.type_name().to_string()));
            }
            cached
        };
        if let Some(cell) = cached {
            if create && !cell.materialized.swap(true, Ordering::AcqRel) {
                let _ = self.read_source(locator, true);
            }
            return Ok(cell);
        }

        let data = self.read_source(locator, create).unwrap_or_default();

        let cell = self
            .state()
            .profiles
            .entry(locator.clone())
            .or_insert_with(|| Arc::new(ProfileCell::new(locator.clone(), data, create)))
            .clone();
        Ok(cell)
    }

    /// Locators currently held by the identity cache.
    pub fn loaded(&self) -> Vec<Locator> {
        let mut loaded: Vec<Locator> = self.state().profiles.keys().cloned().collect();
        loaded.sort();
        loaded
    }

    fn handle(&self, cell: Arc<ProfileCell>) -> Profile {
        Profile {
            cell,
            store: self.clone(),
        }
    }

    fn path_of(&self, locator: &Locator) -> Result<PathBuf, ProfileError> {
        self.state()
            .registry
            .storage_dir(locator.type_name())
            .map(|dir| locator.resolve(dir))
            .ok_or_else(|| ProfileError::UnknownType(locator.type_name().to_string()))
    }

    /// Current source document for `locator`.
    ///
    /// `None` means the source could not be read and the caller should keep
    /// what it has; the reason has already been logged.
    fn read_source(&self, locator: &Locator, create_missing: bool) -> Option<Map<String, Value>> {
        match self.shared.role {
            Role::Coordinator => {
                let path = match self.path_of(locator) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("Cannot read profile {}: {}", locator, e);
                        return None;
                    }
                };
                match document::read_document(&path) {
                    Loaded::Parsed(data) => Some(data),
                    Loaded::Missing => {
                        if create_missing {
                            if let Err(e) =
                                document::write_document(&path, &Map::new(), self.shared.indent)
                            {
                                warn!("Failed to create profile file for {}: {}", locator, e);
                            }
                        }
                        Some(Map::new())
                    }
                    Loaded::Corrupt(reason) => {
                        warn!(
                            "Profile file {} for {} is unreadable: {}",
                            path.display(),
                            locator,
                            reason
                        );
                        None
                    }
                }
            }
            Role::Endpoint => match self.request(Request::Fetch {
                locator: locator.clone(),
                create: create_missing,
            }) {
                Ok(Response::Document { data }) => Some(data),
                Ok(Response::Failed { reason }) => {
                    warn!("Coordinator could not read {}: {}", locator, reason);
                    None
                }
                Ok(other) => {
                    warn!("Unexpected reply fetching {}: {:?}", locator, other);
                    None
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", locator, e);
                    None
                }
            },
        }
    }

    /// Write `data` as the document for `locator` and tell everyone else.
    fn persist(&self, locator: &Locator, data: Map<String, Value>) -> Result<(), ProfileError> {
        match self.shared.role {
            Role::Coordinator => {
                let path = self.path_of(locator)?;
                document::write_document(&path, &data, self.shared.indent)?;
                info!("Saved profile {} to {}", locator, path.display());
                self.notify_dependents_of_file(locator);
                if let Some(transport) = &self.shared.transport {
                    transport.broadcast(
                        &Message::ProfileChanged {
                            locator: locator.clone(),
                            data,
                        },
                        None,
                    );
                }
                Ok(())
            }
            Role::Endpoint => {
                let message = Message::ProfileChanged {
                    locator: locator.clone(),
                    data,
                };
                match self.request(Request::Publish { message })? {
                    Response::Ack => {
                        self.notify_dependents_of_file(locator);
                        Ok(())
                    }
                    Response::Failed { reason } => Err(ProfileError::Remote(reason)),
                    other => Err(ProfileError::Channel(format!(
                        "unexpected reply to save of {}: {:?}",
                        locator, other
                    ))),
                }
            }
        }
    }

    fn layers(&self, locator: &Locator) -> Layers {
        let (ancestor_types, defaults, schema) = {
            let state = self.state();
            let ancestors: Vec<String> = state
                .registry
                .chain(locator.type_name())
                .into_iter()
                .skip(1)
                .map(|t| t.name.clone())
                .collect();
            (
                ancestors,
                state.defaults.get(locator.file()).cloned(),
                state.schema_for(locator),
            )
        };
        let ancestors = ancestor_types
            .iter()
            .filter_map(|name| self.load_cell(&locator.with_type(name), false).ok())
            .collect();
        Layers {
            ancestors,
            defaults,
            schema,
        }
    }

    // ----- propagation -----

    fn request(&self, request: Request) -> Result<Response, ProfileError> {
        let transport = self
            .shared
            .transport
            .as_ref()
            .ok_or_else(|| ProfileError::Channel("store has no transport".to_string()))?;
        transport.request(request)
    }

    /// Send a local table change to the other endpoints.
    fn publish(&self, message: Message) {
        let Some(transport) = &self.shared.transport else {
            return;
        };
        match self.shared.role {
            Role::Coordinator => transport.broadcast(&message, None),
            Role::Endpoint => match transport.request(Request::Publish { message }) {
                Ok(Response::Ack) => {}
                Ok(other) => warn!("Coordinator did not accept change: {:?}", other),
                Err(e) => warn!("Failed to publish change to coordinator: {}", e),
            },
        }
    }

    /// Serve a request from `from`. Only a coordinator answers.
    pub fn handle_request(&self, from: EndpointId, request: Request) -> Response {
        if self.shared.role != Role::Coordinator {
            return Response::Failed {
                reason: "not the coordinator".to_string(),
            };
        }
        match request {
            Request::Snapshot => Response::Snapshot {
                snapshot: self.snapshot(),
            },
            Request::Fetch { locator, create } => match self.read_source(&locator, create) {
                Some(data) => Response::Document { data },
                None => Response::Failed {
                    reason: format!("{} could not be read", locator),
                },
            },
            Request::Publish { message } => {
                if let Message::ProfileChanged { locator, data } = &message {
                    let written = self
                        .path_of(locator)
                        .and_then(|path| document::write_document(&path, data, self.shared.indent));
                    if let Err(e) = written {
                        warn!("Failed to save {} for {}: {}", locator, from, e);
                        return Response::Failed {
                            reason: e.to_string(),
                        };
                    }
                    info!("Saved profile {} for {}", locator, from);
                }
                self.apply(&message);
                if let Some(transport) = &self.shared.transport {
                    transport.broadcast(&message, Some(from));
                }
                Response::Ack
            }
        }
    }

    /// Apply a change that arrived from another endpoint.
    pub fn receive(&self, envelope: Envelope) {
        debug!("Received {:?} from {}", envelope.message, envelope.from);
        self.apply(&envelope.message);
    }

    /// Drain the transport's inbox. Returns the number of messages applied.
    pub fn dispatch_pending(&self) -> usize {
        let Some(transport) = &self.shared.transport else {
            return 0;
        };
        let pending = transport.poll();
        let count = pending.len();
        for envelope in pending {
            self.receive(envelope);
        }
        count
    }

    fn apply(&self, message: &Message) {
        match message {
            Message::ProfileChanged { locator, data } => {
                let cell = self.state().profiles.get(locator).cloned();
                if let Some(cell) = cell {
                    *cell.data() = data.clone();
                    cell.emit(ChangeCause::Remote);
                }
                self.notify_dependents_of_file(locator);
            }
            Message::TypeRegistered { profile_type } => {
                self.state().registry.insert(profile_type.clone());
                self.notify_dependents_of_type(&profile_type.name);
            }
            Message::TypesCleared => {
                self.state().clear();
            }
            Message::SchemaRegistered {
                type_name,
                file,
                schema,
            } => {
                self.state().schemas.insert(
                    (type_name.clone(), file.clone()),
                    Arc::new(schema.clone()),
                );
                self.notify_file_under_root(type_name, file);
            }
            Message::DefaultsChanged { file, data } => {
                self.state()
                    .defaults
                    .insert(file.clone(), Arc::new(data.clone()));
                self.notify_file(file);
            }
        }
    }

    // ----- layering notifications -----

    fn notify_where(&self, pred: impl Fn(&TypeRegistry, &Locator) -> bool) {
        let cells: Vec<Arc<ProfileCell>> = {
            let state = self.state();
            state
                .profiles
                .values()
                .filter(|cell| pred(&state.registry, &cell.locator))
                .cloned()
                .collect()
        };
        for cell in cells {
            cell.emit(ChangeCause::Layering);
        }
    }

    /// Profiles whose chain now passes through `type_name`.
    fn notify_dependents_of_type(&self, type_name: &str) {
        self.notify_where(|registry, loc| registry.descends_from(loc.type_name(), type_name));
    }

    /// Profiles of the same file that inherit from `locator`'s type.
    fn notify_dependents_of_file(&self, locator: &Locator) {
        self.notify_where(|registry, loc| {
            loc.file() == locator.file()
                && loc.type_name() != locator.type_name()
                && registry.descends_from(loc.type_name(), locator.type_name())
        });
    }

    fn notify_file_under_root(&self, root: &str, file: &str) {
        self.notify_where(|registry, loc| {
            loc.file() == file && registry.descends_from(loc.type_name(), root)
        });
    }

    fn notify_file(&self, file: &str) {
        self.notify_where(|_, loc| loc.file() == file);
    }
}

impl fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ProfileStore")
            .field("role", &self.shared.role)
            .field("types", &state.registry.len())
            .field("profiles", &state.profiles.len())
            .finish()
    }
}

/// Handle to one cached profile. Clones, and every `load` of the same
/// locator, share the same data.
#[derive(Clone)]
pub struct Profile {
    cell: Arc<ProfileCell>,
    store: ProfileStore,
}

impl Profile {
    pub fn locator(&self) -> &Locator {
        &self.cell.locator
    }

    pub fn type_name(&self) -> &str {
        self.cell.locator.type_name()
    }

    pub fn file(&self) -> &str {
        self.cell.locator.file()
    }

    /// True when both handles point at the same cached instance.
    pub fn same_instance(&self, other: &Profile) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Resolve `key` through the lookup layers. `None` when no layer has it.
    pub fn get(&self, key: &str) -> Option<Value> {
        let Some(path) = KeyPath::parse(key) else {
            warn!("Illegal key path `{}` on {}", key, self.cell.locator);
            return None;
        };
        if let Some(value) = self.lookup_own(&path) {
            return Some(value);
        }

        let layers = self.store.layers(&self.cell.locator);
        for cell in &layers.ancestors {
            if let Some(value) = path::lookup(&cell.data(), &path) {
                return Some(value.clone());
            }
        }
        if let Some(defaults) = &layers.defaults {
            if let Some(value) = path::lookup(defaults, &path) {
                return Some(value.clone());
            }
        }
        layers
            .schema
            .as_ref()
            .and_then(|schema| schema.default_for(path.head()))
            .cloned()
    }

    fn lookup_own(&self, path: &KeyPath<'_>) -> Option<Value> {
        path::lookup(&self.cell.data(), path).cloned()
    }

    /// Write `value` at `key` in this profile's own data.
    ///
    /// Under a schema, a dotted key is checked against its first segment
    /// only, which must be declared as an object or an array.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<Value, ProfileError> {
        let value = value.into();
        let Some(path) = KeyPath::parse(key) else {
            warn!("Illegal key path `{}` on {}", key, self.cell.locator);
            return Err(ProfileError::IllegalPath(key.to_string()));
        };

        let schema = self.store.schema_for(&self.cell.locator);
        let verdict = schema::validate(schema.as_deref(), key, &value);
        if !verdict.is_ok() {
            warn!(
                "Rejected write of `{}` on {}: {}",
                key, self.cell.locator, verdict
            );
            return Err(ProfileError::SchemaRejection {
                key: key.to_string(),
                verdict,
            });
        }

        path::assign(&mut self.cell.data(), &path, value.clone());
        self.cell.emit(ChangeCause::Set);
        Ok(value)
    }

    /// Remove `key` from this profile's own data. Inherited values stay visible.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let Some(path) = KeyPath::parse(key) else {
            warn!("Illegal key path `{}` on {}", key, self.cell.locator);
            return None;
        };
        let removed = path::remove(&mut self.cell.data(), &path);
        self.cell.emit(ChangeCause::Delete);
        removed
    }

    /// Overwrite this type's file with the own data and notify other endpoints.
    pub fn save(&self) -> Result<(), ProfileError> {
        let data = self.data();
        self.store.persist(&self.cell.locator, data)?;
        self.cell.materialized.store(true, Ordering::Release);
        self.cell.emit(ChangeCause::Save);
        Ok(())
    }

    /// Re-read the source document according to the configured [`ReloadPolicy`].
    ///
    /// An unreadable source leaves the data untouched.
    pub fn reload(&self) {
        let Some(source) = self.store.read_source(&self.cell.locator, false) else {
            return;
        };
        {
            let mut data = self.cell.data();
            match self.store.shared.reload {
                ReloadPolicy::Replace => *data = source,
                ReloadPolicy::Merge => data.extend(source),
            }
        }
        self.cell.emit(ChangeCause::Reload);
    }

    /// Empty the own data. The file is untouched until the next `save`.
    pub fn clear(&self) {
        self.cell.data().clear();
        self.cell.emit(ChangeCause::Clear);
    }

    /// Replace the own data with `data`.
    pub fn reset(&self, data: Map<String, Value>) {
        *self.cell.data() = data;
        self.cell.emit(ChangeCause::Reset);
    }

    /// Copy of the own data.
    pub fn data(&self) -> Map<String, Value> {
        self.cell.data().clone()
    }

    /// Receive an event each time this profile, or a layer under it, changes.
    pub fn subscribe(&self) -> Receiver<ProfileEvent> {
        self.cell.listeners.subscribe()
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("locator", &self.cell.locator.to_string())
            .field("data", &*self.cell.data())
            .finish()
    }
}
