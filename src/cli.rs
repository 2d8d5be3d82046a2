//! CLI struct definitions for `profilectl`.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "profilectl",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect and edit JSON profiles through their inheritance chains."
)]
pub(crate) struct Cli {
    /// Store configuration declaring profile types and schemas.
    #[clap(long, short = 'c', default_value = crate::core::config::CONFIG_FILE_NAME)]
    pub config: PathBuf,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// List registered types with their inheritance chains
    Types,
    /// Print a profile's own data
    Show {
        /// Locator, e.g. profile://local/settings.json
        locator: String,
    },
    /// Resolve a key through the inheritance chain
    Get {
        locator: String,
        /// Dotted key path, e.g. window.width
        key: String,
    },
    /// Set a key on a profile and save it
    Set {
        locator: String,
        key: String,
        /// JSON value; anything that does not parse as JSON is stored as a string
        value: String,
    },
    /// Delete a key from a profile and save it
    Delete { locator: String, key: String },
    /// Print the schema governing a profile, if any
    Schema { locator: String },
}
