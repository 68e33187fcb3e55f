use crate::core::currency::ForexTable;
use crate::core::custodian::{Custodian, CustodianError, CustodianId};
use crate::simulation::event::{generate_event, EventError, GeneratedEvent};
use log::{debug, info, warn};
use rand::Rng;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Upper bound on events generated by a single batch request.
pub const MAX_EVENTS_PER_BATCH: usize = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("custodian {0} not found")]
    NotFound(CustodianId),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed snapshot {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot encode error: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("custodian {0} appears more than once")]
    DuplicateCustodian(CustodianId),
    #[error("invalid custodian: {0}")]
    Custodian(#[from] CustodianError),
    #[error("event generation failed: {0}")]
    Event(#[from] EventError),
}

#[derive(Debug, Default)]
struct Inner {
    custodians: Vec<Custodian>,
    index: HashMap<CustodianId, usize>,
}

impl Inner {
    fn from_custodians(custodians: Vec<Custodian>) -> Result<Self, StoreError> {
        let mut index = HashMap::with_capacity(custodians.len());
        for (pos, custodian) in custodians.iter().enumerate() {
            custodian.validate()?;
            if index.insert(custodian.id(), pos).is_some() {
                return Err(StoreError::DuplicateCustodian(custodian.id()));
            }
        }
        Ok(Self { custodians, index })
    }
}

/// Thread-safe owner of every custodian.
///
/// Reads share the lock; anything that mutates or persists takes it
/// exclusively for its whole duration, so a two-leg event is never seen
/// half applied.
#[derive(Debug)]
pub struct LedgerStore {
    inner: RwLock<Inner>,
    state_file: PathBuf,
    forex: ForexTable,
}

impl LedgerStore {
    /// An empty store persisting to `state_file`. Nothing is read.
    pub fn empty(state_file: impl Into<PathBuf>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            state_file: state_file.into(),
            forex: ForexTable::standard(),
        }
    }

    /// Load the store from `state_file`.
    ///
    /// A missing or zero-length file yields an empty store. Unreadable or
    /// malformed files are errors.
    pub fn open(state_file: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let state_file = state_file.into();
        let data = match fs::read(&state_file) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: state_file,
                    source,
                })
            }
        };

        let custodians: Vec<Custodian> = if data.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(&data).map_err(|source| StoreError::Decode {
                path: state_file.clone(),
                source,
            })?
        };
        info!(
            "loaded {} custodians from {}",
            custodians.len(),
            state_file.display()
        );

        Ok(Self {
            inner: RwLock::new(Inner::from_custodians(custodians)?),
            state_file,
            forex: ForexTable::standard(),
        })
    }

    /// Replace the forex table used for conversions.
    pub fn with_forex(mut self, forex: ForexTable) -> Self {
        self.forex = forex;
        self
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn forex(&self) -> &ForexTable {
        &self.forex
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_empty(&self) -> bool {
        self.read().custodians.is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().custodians.len()
    }

    /// Number the given custodians after the highest existing ID and add
    /// them. Either all are added or none.
    pub fn add_custodians(
        &self,
        custodians: impl IntoIterator<Item = Custodian>,
    ) -> Result<Vec<CustodianId>, StoreError> {
        let mut incoming: Vec<Custodian> = custodians.into_iter().collect();
        if incoming.is_empty() {
            return Ok(Vec::new());
        }

        let mut inner = self.write();
        let mut next = inner
            .custodians
            .iter()
            .map(Custodian::id)
            .max()
            .unwrap_or_default()
            .next();
        for custodian in &mut incoming {
            custodian.set_id(next);
            custodian.validate()?;
            next = next.next();
        }

        let mut ids = Vec::with_capacity(incoming.len());
        for custodian in incoming {
            let id = custodian.id();
            let pos = inner.custodians.len();
            inner.custodians.push(custodian);
            inner.index.insert(id, pos);
            ids.push(id);
        }
        debug!("added custodians {:?}", ids);
        Ok(ids)
    }

    /// A copy of the custodian with `id`, if it exists.
    pub fn get_custodian(&self, id: CustodianId) -> Option<Custodian> {
        let inner = self.read();
        inner.index.get(&id).map(|&pos| inner.custodians[pos].clone())
    }

    /// Copies of the requested custodians, in request order.
    pub fn get_custodians(&self, ids: &[CustodianId]) -> Result<Vec<Custodian>, StoreError> {
        let inner = self.read();
        ids.iter()
            .map(|id| {
                inner
                    .index
                    .get(id)
                    .map(|&pos| inner.custodians[pos].clone())
                    .ok_or(StoreError::NotFound(*id))
            })
            .collect()
    }

    /// Copies of every custodian, in insertion order.
    pub fn custodians(&self) -> Vec<Custodian> {
        self.read().custodians.clone()
    }

    /// Copies of every custodian with their transaction history stripped.
    pub fn custodians_without_transactions(&self) -> Vec<Custodian> {
        self.read()
            .custodians
            .iter()
            .map(Custodian::without_transactions)
            .collect()
    }

    /// Generate one random event under the exclusive lock.
    pub fn add_random_event<R: Rng>(&self, rng: &mut R) -> Result<GeneratedEvent, StoreError> {
        let mut inner = self.write();
        Ok(generate_event(&mut inner.custodians, &self.forex, rng)?)
    }

    /// Generate a batch of events and snapshot the result.
    ///
    /// `requested` is clamped to `1..=MAX_EVENTS_PER_BATCH`. The batch stops
    /// at the first failing event, which is returned without snapshotting.
    pub fn generate_events<R: Rng>(&self, requested: i64, rng: &mut R) -> Result<usize, StoreError> {
        let count = clamp_batch(requested);
        for _ in 0..count {
            self.add_random_event(rng)?;
        }
        self.snapshot()?;
        Ok(count)
    }

    /// Write every custodian to the state file.
    ///
    /// The JSON is written to a sibling temporary file which is then renamed
    /// over the target. On failure the temporary file is removed and the
    /// previous snapshot is left as it was.
    pub fn snapshot(&self) -> Result<(), StoreError> {
        let inner = self.write();
        let data = serde_json::to_vec_pretty(&inner.custodians).map_err(StoreError::Encode)?;

        let tmp_path = temp_path(&self.state_file);
        let written = write_synced(&tmp_path, &data)
            .and_then(|()| fs::rename(&tmp_path, &self.state_file).map_err(io_error(&self.state_file)));
        if let Err(err) = written {
            if let Err(e) = fs::remove_file(&tmp_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("cannot remove {}: {}", tmp_path.display(), e);
                }
            }
            return Err(err);
        }

        info!(
            "snapshot of {} custodians written to {}",
            inner.custodians.len(),
            self.state_file.display()
        );
        Ok(())
    }
}

/// Clamp a requested batch size to `1..=MAX_EVENTS_PER_BATCH`.
pub fn clamp_batch(requested: i64) -> usize {
    usize::try_from(requested)
        .unwrap_or(1)
        .clamp(1, MAX_EVENTS_PER_BATCH)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_synced(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut file = File::create(path).map_err(io_error(path))?;
    file.write_all(data).map_err(io_error(path))?;
    file.sync_all().map_err(io_error(path))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
