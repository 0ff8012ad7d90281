//! Block-structured configuration files bound to typed application settings.
//!
//! A blockconf file is a list of `name = value` assignments. Names are dotted
//! identifiers, blocks prefix every name inside them, and `include "file"`
//! pulls in another file relative to the including one:
//!
//! ```text
//! # server settings
//! server {
//!     host = example.org
//!     port = 8080
//!     motd = Welcome to ${server.host}!\n
//! }
//! limits.cpu = 4
//! include "local.cfg"
//! ```
//!
//! Values are raw text up to the end of the line (a trailing backslash
//! continues it). Escapes like `\n` and `\u00e9` are decoded and `${name}`
//! references are replaced by an earlier property's value, falling back to
//! the environment when that is enabled.
//!
//! # Binding
//!
//! Parsing yields a [`PropertyMap`]. A [`Registry`] declares which names the
//! application understands and how each value is converted and stored:
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.property("server.port", Binding::required(), convert::int_in_range(1, 65535),
//!     |s: &mut Settings, v| s.port = v as u16)?;
//! registry.prefix("limits.", Binding::optional(), convert::int(),
//!     |s: &mut Settings, name, v| { s.limits.insert(name.to_string(), v); })?;
//!
//! let settings: Settings = Blockconf::builder(registry)
//!     .app_name("myapp")
//!     .load()?;
//! ```
//!
//! That call searches the platform config directory for `myapp.cfg`, parses
//! it (following includes), and binds every property into a fresh
//! `Settings`. Unknown names and missing required names are errors unless
//! the registry says otherwise.
//!
//! # Discovery
//!
//! Search paths are listed in **priority-ascending** order:
//!
//! - **`Platform`**: the OS config directory (XDG on Linux, `~/Library/
//!   Application Support` on macOS).
//! - **`Home(".myapp")`**: a dotfile directory under `$HOME`.
//! - **`Cwd`**: the working directory.
//! - **`Path(path)`**: an explicit directory.
//! - **`Ancestors(boundary)`**: walks up from CWD, expanding into multiple
//!   directories, shallowest first.
//!
//! With [`SearchMode::Merge`] (default) every file found is parsed and later
//! files overwrite earlier ones name by name. With [`SearchMode::FirstMatch`]
//! only the highest-priority file is used. Missing files are skipped.
//!
//! # Lower-level use
//!
//! [`Parser`] and [`Registry::bind`] work without any discovery, and
//! [`Lexer`] and [`ValueProcessor`] are public for tools that need the raw
//! token stream or value decoding.

pub mod convert;
pub mod env;
pub mod error;
pub mod lexer;
pub mod map;
pub mod merge;
pub mod parser;
pub mod property;
pub mod registry;
pub mod types;
pub mod value;

mod builder;
mod file;
mod resolve;

#[cfg(test)]
mod fixtures;

pub use builder::{Blockconf, LoaderBuilder};
pub use convert::{Converter, ValueMap};
pub use env::EnvSource;
pub use error::{ConfigError, FormatError, Location};
pub use lexer::{Lexer, Token, TokenKind};
pub use map::PropertyMap;
pub use parser::{MAX_INCLUDE_DEPTH, Parser, ParserOptions};
pub use property::{Property, is_legal_name};
pub use registry::{Binding, Registry};
pub use types::{Boundary, DuplicateMode, SearchMode, SearchPath};
pub use value::{ValueProcessor, encode_utf8};
