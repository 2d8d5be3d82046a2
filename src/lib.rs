//! Profile store: JSON configuration documents with typed inheritance.
//!
//! Callers register named profile *types* (`global`, `local`, `project`, ...),
//! each bound to a storage directory and optionally inheriting from another
//! type. A profile is then addressed as `profile://<type>/<file>.json`,
//! read and written through dotted key paths, and saved back as pretty JSON.
//!
//! # Architecture
//!
//! - [`core::registry`]: type table and inheritance chains
//! - [`core::schema`]: example-derived schemas (kinds and defaults)
//! - [`core::store`]: identity cache, lookup layers, mutation and persistence
//! - [`core::protocol`] and [`core::bus`]: change propagation between a
//!   coordinator that owns the disk and any number of endpoints
//!
//! # Example
//!
//! ```no_run
//! use profile_store::{ProfileStore, StoreConfig};
//!
//! let store = ProfileStore::new(StoreConfig::default());
//! store.register("global", "/tmp/app", None)?;
//! store.register("local", "/tmp/app/local", Some("global"))?;
//!
//! let global = store.load("profile://global/user.json")?;
//! let local = store.load("profile://local/user.json")?;
//! global.set("theme", "dark")?;
//! assert_eq!(local.get("theme"), Some("dark".into()));
//! local.save()?;
//! # Ok::<(), profile_store::ProfileError>(())
//! ```

mod cli;
pub mod core;

pub use crate::core::bus::{LocalBus, LocalEndpoint};
pub use crate::core::config::{ReloadPolicy, StoreConfig};
pub use crate::core::error::ProfileError;
pub use crate::core::event::{ChangeCause, ProfileEvent};
pub use crate::core::locator::Locator;
pub use crate::core::protocol::{EndpointId, Envelope, Message, Request, Response, Transport};
pub use crate::core::registry::ProfileType;
pub use crate::core::schema::{Schema, Validation, ValueKind};
pub use crate::core::store::{Profile, ProfileStore, Role};

use clap::Parser;
use cli::{Cli, Command};
use serde_json::{Value, json};
use std::io::Write;
use std::process::ExitCode;

/// Parse the command line and run it against the configured store.
pub fn run() -> Result<ExitCode, ProfileError> {
    let cli = Cli::parse();
    let config = StoreConfig::load(&cli.config)?;
    let store = ProfileStore::new(config);
    let stdout = std::io::stdout();
    execute(&store, cli.command, &mut stdout.lock())
}

fn execute(
    store: &ProfileStore,
    command: Command,
    out: &mut impl Write,
) -> Result<ExitCode, ProfileError> {
    match command {
        Command::Types => {
            let types: Vec<Value> = store
                .types()
                .into_iter()
                .map(|ty| {
                    let chain: Vec<String> =
                        store.chain(&ty.name).into_iter().map(|t| t.name).collect();
                    json!({
                        "name": ty.name,
                        "dir": ty.dir,
                        "parent": ty.parent,
                        "chain": chain,
                    })
                })
                .collect();
            print_json(out, &Value::Array(types))?;
        }
        Command::Show { locator } => {
            let profile = store.load(&locator)?;
            print_json(out, &Value::Object(profile.data()))?;
        }
        Command::Get { locator, key } => {
            let profile = store.load(&locator)?;
            match profile.get(&key) {
                Some(value) => print_json(out, &value)?,
                None => {
                    eprintln!("`{}` is not set in {}", key, locator);
                    return Ok(ExitCode::from(2));
                }
            }
        }
        Command::Set {
            locator,
            key,
            value,
        } => {
            let profile = store.load(&locator)?;
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            let stored = profile.set(&key, value)?;
            profile.save()?;
            print_json(out, &stored)?;
        }
        Command::Delete { locator, key } => {
            let profile = store.load(&locator)?;
            let removed = profile.delete(&key);
            profile.save()?;
            print_json(out, &removed.unwrap_or(Value::Null))?;
        }
        Command::Schema { locator } => {
            let parsed: Locator = locator.parse()?;
            match store.schema_for(&parsed) {
                Some(schema) => print_json(out, &serde_json::to_value(schema.as_ref())?)?,
                None => {
                    eprintln!("No schema governs {}", locator);
                    return Ok(ExitCode::from(2));
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json(out: &mut impl Write, value: &Value) -> Result<(), ProfileError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
