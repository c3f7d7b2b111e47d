//! Snapshot persistence decorator.
//!
//! Snapshot file layout:
//!
//! ```text
//! magic "RKV\0" | version: u8 | format: u8 | len: u32 LE | payload | crc32: u32 LE
//! ```

use crate::error::{Result, StoreError};
use crate::subscriptions::{Listener, Subscription};
use crate::types::{Delta, State};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::StateStore;

/// Magic bytes for snapshot files.
const SNAPSHOT_MAGIC: &[u8; 4] = b"RKV\0";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u8 = 1;

/// Header size: magic, version, format, length.
const HEADER_LEN: usize = 4 + 1 + 1 + 4;

/// Payload encoding of a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PersistFormat {
    #[default]
    Json,
    MessagePack,
}

impl PersistFormat {
    fn tag(self) -> u8 {
        match self {
            PersistFormat::Json => 0,
            PersistFormat::MessagePack => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(PersistFormat::Json),
            1 => Ok(PersistFormat::MessagePack),
            other => Err(StoreError::InvalidFormat(format!("unknown payload format {}", other))),
        }
    }

    fn encode(self, state: &State) -> Result<Vec<u8>> {
        match self {
            PersistFormat::Json => Ok(serde_json::to_vec(state)?),
            PersistFormat::MessagePack => Ok(rmp_serde::to_vec(state)?),
        }
    }

    fn decode(self, payload: &[u8]) -> Result<State> {
        match self {
            PersistFormat::Json => serde_json::from_slice(payload)
                .map_err(|e| StoreError::Deserialization(e.to_string())),
            PersistFormat::MessagePack => Ok(rmp_serde::from_slice(payload)?),
        }
    }
}

/// Write a state snapshot, replacing any existing file atomically.
pub fn save_snapshot(path: impl AsRef<Path>, state: &State, format: PersistFormat) -> Result<()> {
    let path = path.as_ref();
    let payload = format.encode(state)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization("snapshot too large".into()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len() + 4);
    bytes.extend_from_slice(SNAPSHOT_MAGIC);
    bytes.push(SNAPSHOT_VERSION);
    bytes.push(format.tag());
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());

    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a state snapshot. Returns `None` if the file does not exist.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Option<State>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    if bytes.len() < HEADER_LEN + 4 {
        return Err(StoreError::Corruption("snapshot truncated".into()));
    }
    if &bytes[0..4] != SNAPSHOT_MAGIC {
        return Err(StoreError::InvalidFormat("bad magic bytes".into()));
    }
    if bytes[4] != SNAPSHOT_VERSION {
        return Err(StoreError::InvalidFormat(format!(
            "unsupported version {}",
            bytes[4]
        )));
    }
    let format = PersistFormat::from_tag(bytes[5])?;

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[6..10]);
    let len = u32::from_le_bytes(len_bytes) as usize;
    if bytes.len() != HEADER_LEN + len + 4 {
        return Err(StoreError::Corruption(format!(
            "snapshot length {} does not match header {}",
            bytes.len(),
            len
        )));
    }

    let payload = &bytes[HEADER_LEN..HEADER_LEN + len];
    let mut checksum_bytes = [0u8; 4];
    checksum_bytes.copy_from_slice(&bytes[HEADER_LEN + len..]);
    let expected = u32::from_le_bytes(checksum_bytes);
    let got = crc32fast::hash(payload);
    if expected != got {
        return Err(StoreError::ChecksumMismatch { expected, got });
    }

    format.decode(payload).map(Some)
}

/// Loads a saved snapshot on open and saves after every observable change.
///
/// Saving is driven by a listener on the inner store, so changes made through
/// `undo`, `redo`, `replace` or directly on a shared inner store are saved
/// too. Persistence failures are logged and never reach the caller.
pub struct Persisted<S> {
    inner: S,
    path: PathBuf,
    format: PersistFormat,
    subscription: Subscription,
}

impl<S: StateStore> Persisted<S> {
    /// Wrap `inner`, applying the snapshot at `path` if one exists.
    ///
    /// The snapshot is applied without recording history, so it cannot be
    /// undone.
    pub fn open(inner: S, path: impl Into<PathBuf>, format: PersistFormat) -> Self {
        let path = path.into();
        match load_snapshot(&path) {
            Ok(Some(saved)) => inner.replace_state(Value::Object(saved)),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load snapshot");
            }
        }

        let subscription = {
            let path = path.clone();
            inner.subscribe(Rc::new(move |state: &State, _: &Delta| {
                if let Err(e) = save_snapshot(&path, state, format) {
                    tracing::error!(path = %path.display(), error = %e, "failed to save snapshot");
                }
            }))
        };

        Self {
            inner,
            path,
            format,
            subscription,
        }
    }

    /// Save the current state now.
    pub fn flush(&self) -> Result<()> {
        save_snapshot(&self.path, &self.inner.get(), self.format)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> Drop for Persisted<S> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl<S: StateStore> StateStore for Persisted<S> {
    fn get(&self) -> State {
        self.inner.get()
    }

    fn get_all(&self) -> State {
        self.inner.get_all()
    }

    fn set(&self, partial: Value) {
        self.inner.set(partial)
    }

    fn replace(&self, key: &str, value: Value) {
        self.inner.replace(key, value)
    }

    fn replace_state(&self, state: Value) {
        self.inner.replace_state(state)
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.inner.subscribe(listener)
    }

    fn undo(&self) -> bool {
        self.inner.undo()
    }

    fn redo(&self) -> bool {
        self.inner.redo()
    }
}
