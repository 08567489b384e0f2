//! File-backed append-only line store.

use crate::{LogStoreError, LogStoreResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of lines shown to readers by default.
pub const DEFAULT_TAIL_LINES: usize = 150;

const TAIL_CHUNK: u64 = 8 * 1024;

/// Append-only sequence of text lines backed by one file.
///
/// Each line is written with a single `write_all` of `line + "\n"` while the
/// store lock is held, so lines never interleave and are handed to the OS as
/// soon as they are appended. Tail reads take the same lock and only ever see
/// whole lines.
#[derive(Debug)]
pub struct LogStore {
    path: PathBuf,
    writer: Mutex<Option<File>>,
}

impl LogStore {
    /// Create a store for `path`. Nothing is touched on disk until the first
    /// [`reset`](Self::reset) or [`append`](Self::append).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the file and write `banner` as its first line.
    pub fn reset(&self, banner: &str) -> LogStoreResult<()> {
        let mut writer = self.writer.lock();
        *writer = None;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| LogStoreError::io("create directory for", &self.path, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| LogStoreError::io("truncate", &self.path, e))?;

        write_line(&mut file, banner).map_err(|e| LogStoreError::io("write", &self.path, e))?;
        *writer = Some(file);

        debug!(path = %self.path.display(), "Log store reset");
        Ok(())
    }

    /// Append one line. `line` must not contain a line terminator.
    pub fn append(&self, line: &str) -> LogStoreResult<()> {
        let mut writer = self.writer.lock();

        if writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| LogStoreError::io("open", &self.path, e))?;
            *writer = Some(file);
        }

        match writer.as_mut() {
            Some(file) => {
                write_line(file, line).map_err(|e| LogStoreError::io("write", &self.path, e))
            }
            None => Ok(()),
        }
    }

    /// The last `max_lines` lines, oldest first.
    ///
    /// A missing file reads as empty. Invalid UTF-8 is replaced, never fatal.
    pub fn tail(&self, max_lines: usize) -> LogStoreResult<Vec<String>> {
        if max_lines == 0 {
            return Ok(Vec::new());
        }

        let _guard = self.writer.lock();

        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogStoreError::io("open", &self.path, e)),
        };

        let (bytes, complete) = read_tail_bytes(&mut file, max_lines)
            .map_err(|e| LogStoreError::io("read", &self.path, e))?;

        let text = String::from_utf8_lossy(&bytes);
        let mut lines: Vec<String> = text.lines().map(str::to_owned).collect();

        // The first segment is cut mid-line unless the read reached the start of the file
        if !complete && !lines.is_empty() {
            lines.remove(0);
        }

        let skip = lines.len().saturating_sub(max_lines);
        Ok(lines.split_off(skip))
    }

    /// Every line in the store, oldest first.
    pub fn read_all(&self) -> LogStoreResult<Vec<String>> {
        self.tail(usize::MAX)
    }
}

fn write_line(file: &mut File, line: &str) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    file.write_all(&buf)
}

/// Read backwards from the end of the file in chunks until more than
/// `max_lines` newlines are buffered or the start of the file is reached.
///
/// Returns the buffered bytes and whether they start at offset 0.
fn read_tail_bytes(file: &mut File, max_lines: usize) -> std::io::Result<(Vec<u8>, bool)> {
    let mut pos = file.metadata()?.len();
    let mut buf: Vec<u8> = Vec::new();
    let mut newlines = 0usize;

    while pos > 0 {
        let chunk = TAIL_CHUNK.min(pos);
        pos -= chunk;

        file.seek(SeekFrom::Start(pos))?;
        let mut block = vec![0u8; chunk as usize];
        file.read_exact(&mut block)?;

        newlines += block.iter().filter(|&&b| b == b'\n').count();
        block.extend_from_slice(&buf);
        buf = block;

        if newlines > max_lines {
            break;
        }
    }

    Ok((buf, pos == 0))
}
