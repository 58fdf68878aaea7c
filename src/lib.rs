//! # ALX - Skies of Arcadia Legends Examiner
//!
//! `alx` moves the entry tables of a game installation (characters,
//! weapons, armors, accessories, enemies, magics, ship cannons) between
//! their fixed-layout binary records and editable CSV files.
//!
//! - **Installation root**: detects the platform and validates product,
//!   region and maker identity from the disc metadata
//! - **Cascading configuration**: every attribute resolves to the most
//!   specific value for the identity of the installation
//! - **Entry stores**: one generic engine for every entity kind, with
//!   dependent stores loaded first
//! - **Isolated workers**: conversions run in a child process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alx::{Config, Direction, EntryStore, Root, StdEntryTransform, Transform, Worker, WorkerMode};
//! use std::sync::Arc;
//!
//! # fn main() -> alx::Result<()> {
//! let mut root = Root::new(Arc::new(Config::embedded()?));
//! root.load("/games/soal");
//!
//! let weapon = alx::entry::kinds::find("weapon").expect("known kind");
//! let mut export = StdEntryTransform::new(weapon, Direction::Export, &root)?;
//! export.exec(&Worker::new(WorkerMode::Thread));
//!
//! let mut store = EntryStore::new(weapon, &root, true)?;
//! store.load_csv()?;
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod config;
pub mod entry;
pub mod error;
pub mod header;
pub mod io;
pub mod metadata;
pub mod pattern;
pub mod range;
pub mod resolver;
pub mod root;
pub mod text;
pub mod transform;
pub mod worker;

pub use compression::{CompressionCodec, CompressionMethod};
pub use config::{Config, ConfigSource, Etc};
pub use entry::{EntityKind, Entry, EntryStore, StoreLayout};
pub use error::{AlxError, Result};
pub use header::DynamicHeader;
pub use io::Endianness;
pub use range::{RangeDescriptor, RangeSpec};
pub use resolver::Resolver;
pub use root::{Identity, Root, RootState};
pub use text::TextEncoding;
pub use transform::{Direction, StdEntryTransform, Transform, TransformState};
pub use worker::{Worker, WorkerMode};
