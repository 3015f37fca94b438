//! Channel sources and the polling reader.
//!
//! The editor appends records to the channel at its own pace, so an empty read
//! means "nothing yet" rather than end of stream. The reader waits with a
//! linear backoff until the requested bytes arrive or the source reports that
//! the writer is gone.

mod naming;

pub use naming::{channel_file_name, path_digest, resolve_channel_path};

use crate::error::MirrorError;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Byte stream appended to by an independent writer.
pub trait ChannelSource {
    /// Read whatever bytes are pending into `buf`.
    ///
    /// Returns `Ok(0)` when nothing is available right now.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Returns `true` once the writer can no longer append.
    fn is_closed(&mut self) -> io::Result<bool>;
}

/// Channel backed by a file that the writer removes when it goes away.
///
/// The channel also counts as closed once its path names a different file,
/// since a later session may recreate the same name.
#[derive(Debug)]
pub struct FileChannel {
    file: File,
    path: PathBuf,
    identity: Option<(u64, u64)>,
}

/// Device and inode of a channel file.
#[cfg(unix)]
fn file_identity(metadata: &fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn file_identity(_metadata: &fs::Metadata) -> Option<(u64, u64)> {
    None
}

impl FileChannel {
    /// Open an existing channel file for reading.
    ///
    /// # Errors
    /// Returns the I/O error from opening `path`.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let identity = file_identity(&file.metadata()?);
        Ok(Self {
            file,
            path,
            identity,
        })
    }

    /// Path the channel was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChannelSource for FileChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.file.read(buf) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }

    fn is_closed(&mut self) -> io::Result<bool> {
        match fs::metadata(&self.path) {
            Ok(metadata) => Ok(file_identity(&metadata) != self.identity),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    pending: VecDeque<u8>,
    closed: bool,
}

/// In-memory channel; clones share the same stream.
///
/// One clone is typically handed to the engine while another acts as writer.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryChannel {
    /// Create an open, empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a channel that already holds `bytes` and is closed.
    pub fn closed_with(bytes: &[u8]) -> Self {
        let channel = Self::new();
        // A fresh mutex cannot be poisoned.
        let _ = channel.push(bytes);
        let _ = channel.close();
        channel
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| io::Error::other("memory channel lock poisoned"))
    }

    /// Append bytes for the reader.
    ///
    /// # Errors
    /// Fails if the channel was closed or its lock is poisoned.
    pub fn push(&self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "memory channel is closed",
            ));
        }
        state.pending.extend(bytes);
        Ok(())
    }

    /// Mark the writer as gone; pending bytes stay readable.
    ///
    /// # Errors
    /// Fails if the lock is poisoned.
    pub fn close(&self) -> io::Result<()> {
        self.lock()?.closed = true;
        Ok(())
    }
}

impl ChannelSource for MemoryChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.lock()?;
        let count = buf.len().min(state.pending.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn is_closed(&mut self) -> io::Result<bool> {
        Ok(self.lock()?.closed)
    }
}

/// Linear backoff for idle polls: `step`, `2 * step`, ... capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    step: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a backoff that grows by `step` up to `max`.
    pub fn new(step: Duration, max: Duration) -> Self {
        Self {
            step,
            max: max.max(step),
            current: Duration::ZERO,
        }
    }

    /// Advance and return the next delay.
    pub fn next_delay(&mut self) -> Duration {
        self.current = (self.current + self.step).min(self.max);
        self.current
    }

    /// Start over after data arrived.
    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
    }
}

/// Blocking reader that never returns short reads.
pub struct ChannelReader<S> {
    source: S,
    backoff: Backoff,
}

impl<S: ChannelSource> ChannelReader<S> {
    /// Wrap `source`, waiting between idle polls according to `backoff`.
    pub fn new(source: S, backoff: Backoff) -> Self {
        Self { source, backoff }
    }

    /// Borrow the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Block until exactly `len` bytes have been read.
    ///
    /// # Errors
    /// Returns [`MirrorError::ChannelClosed`] with the number of bytes already
    /// received when the source closes first, or [`MirrorError::Io`] when the
    /// source fails.
    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, MirrorError> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let read = self.source.read_available(&mut buf[filled..])?;
            if read > 0 {
                filled += read;
                self.backoff.reset();
                continue;
            }
            if self.source.is_closed()? {
                // Bytes written right before the close are still owed to us.
                let read = self.source.read_available(&mut buf[filled..])?;
                if read > 0 {
                    filled += read;
                    continue;
                }
                return Err(MirrorError::ChannelClosed {
                    expected: len,
                    received: filled,
                });
            }
            let delay = self.backoff.next_delay();
            trace!(
                wait_ms = delay.as_millis() as u64,
                filled,
                expected = len,
                "channel idle"
            );
            thread::sleep(delay);
        }
        Ok(buf)
    }
}
