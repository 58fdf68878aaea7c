//! Transform pipeline
//!
//! ```text
//! Idle -> Validating -> Running -> Done
//!              |           |
//!              +-----------+-----> Failed
//! ```
//!
//! A transform refuses to run unless [`Transform::valid`] holds. Otherwise
//! `startup` runs in the calling process, `update` runs inside a
//! [`Worker`], and `shutdown` runs once the worker is done.

use crate::entry::{EntityKind, EntryStore};
use crate::error::Result;
use crate::root::Root;
use crate::worker::Worker;
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformState {
    Idle,
    Validating,
    Running,
    Done,
    Failed,
}

/// One direction of conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// CSV to binary
    Import,
    /// Binary to CSV
    Export,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Import => f.write_str("Import"),
            Direction::Export => f.write_str("Export"),
        }
    }
}

pub trait Transform: Send {
    fn name(&self) -> String;

    /// Preconditions, checked before anything runs
    fn valid(&self) -> bool;

    fn startup(&mut self) -> Result<()> {
        Ok(())
    }

    /// The conversion itself, executed by the worker
    fn update(&mut self) -> Result<()>;

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn exec(&mut self, worker: &Worker) -> TransformState
    where
        Self: Sized,
    {
        exec(self, worker)
    }
}

/// Drive `transform` through its lifecycle and return the final state
pub fn exec(transform: &mut dyn Transform, worker: &Worker) -> TransformState {
    let name = transform.name();
    let mut state = TransformState::Idle;

    let mut advance = |next: TransformState| {
        debug!("{} - {:?} -> {:?}", name, state, next);
        state = next;
        next
    };

    advance(TransformState::Validating);
    if !transform.valid() {
        error!("{} - preconditions not met", name);
        return advance(TransformState::Failed);
    }

    advance(TransformState::Running);
    if let Err(e) = transform.startup() {
        error!("{} - startup failed ({})", name, e);
        return advance(TransformState::Failed);
    }

    let updated = worker.run(|| transform.update());

    if let Err(e) = transform.shutdown() {
        error!("{} - shutdown failed ({})", name, e);
        return advance(TransformState::Failed);
    }

    if updated {
        info!("{} - done", name);
        advance(TransformState::Done)
    } else {
        error!("{} - failed", name);
        advance(TransformState::Failed)
    }
}

/// CSV import or export of one entity kind
#[derive(Debug)]
pub struct StdEntryTransform {
    direction: Direction,
    store: EntryStore,
}

impl StdEntryTransform {
    /// Transform for `kind` in the installation in `root`. Exports resolve
    /// dependencies so their names reach the CSV file.
    pub fn new(kind: &'static dyn EntityKind, direction: Direction, root: &Root) -> Result<Self> {
        root.ensure_valid()?;
        let store = EntryStore::new(kind, root, direction == Direction::Export)?;
        Ok(Self::with_store(store, direction))
    }

    pub fn with_store(store: EntryStore, direction: Direction) -> Self {
        StdEntryTransform { direction, store }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// File the transform reads from
    pub fn source(&self) -> Option<&Path> {
        let layout = self.store.layout();
        match self.direction {
            Direction::Import => Some(&layout.csv_file),
            Direction::Export => layout.data_file.as_ref().map(|f| f.path.as_path()),
        }
    }
}

impl Transform for StdEntryTransform {
    fn name(&self) -> String {
        format!("{} {}", self.direction, self.store.kind().name())
    }

    fn valid(&self) -> bool {
        // Nothing is read for an empty ID range
        if self.direction == Direction::Export && self.store.id_range().is_empty() {
            return true;
        }

        match self.source() {
            Some(path) if path.is_file() => {
                info!("Check file {} - exists", path.display());
                true
            }
            Some(path) => {
                error!("Check file {} - not found", path.display());
                false
            }
            None => {
                error!("Check {} data file - not found", self.store.kind().name());
                false
            }
        }
    }

    fn startup(&mut self) -> Result<()> {
        info!("{} - started", self.name());
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        match self.direction {
            Direction::Import => {
                self.store.load_csv()?;
                self.store.save_bin()
            }
            Direction::Export => {
                self.store.load_bin()?;
                self.store.save_csv()
            }
        }
    }
}
