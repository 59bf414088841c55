//! Buffered request bodies.
//!
//! Once a host has finished reading a request body it holds it either as an
//! ordered chain of in-memory buffers or, for large bodies, in a temporary
//! file. [`BodyReader`] presents both as a single [`std::io::Read`] stream.
//!
//! File-backed bodies are read through a [`FileReadFn`] capability rather
//! than opened directly, so a host can route reads through its own file
//! layer. [`read_file_at`] is the standard-library implementation.

use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Reads up to `buf.len()` bytes of the file at `path`, starting at `offset`.
///
/// Returns the number of bytes read; zero means end of file.
pub type FileReadFn = fn(&Path, &mut [u8], u64) -> io::Result<usize>;

/// Default [`FileReadFn`] backed by `std::fs`.
pub fn read_file_at(path: &Path, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;

    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// A request body the host spilled to a temporary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFileBody {
    path: PathBuf,
    len: u64,
}

impl TempFileBody {
    /// Creates a file-backed body of `len` bytes.
    pub fn new(path: impl Into<PathBuf>, len: u64) -> Self {
        Self {
            path: path.into(),
            len,
        }
    }

    /// Returns the path of the temporary file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the body length in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the file holds no body bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A fully buffered request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// The request had no body (for example a GET request).
    #[default]
    Empty,
    /// The body is held in memory as an ordered chain of buffers.
    InMemory(Vec<Bytes>),
    /// The body was spilled to a temporary file.
    TempFile(TempFileBody),
}

impl RequestBody {
    /// Creates an in-memory body from a single buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            Self::Empty
        } else {
            Self::InMemory(vec![bytes])
        }
    }

    /// Returns the total body length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::InMemory(chunks) => chunks.iter().map(|c| c.len() as u64).sum(),
            Self::TempFile(file) => file.len(),
        }
    }

    /// Returns true if the body holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reader over the body using [`read_file_at`] for spilled bodies.
    #[must_use]
    pub fn reader(&self) -> BodyReader<'_> {
        self.reader_with(read_file_at)
    }

    /// Returns a reader over the body using the given file-read capability.
    #[must_use]
    pub fn reader_with(&self, read_file: FileReadFn) -> BodyReader<'_> {
        BodyReader {
            body: self,
            read_file,
            chunk: 0,
            chunk_pos: 0,
            file_pos: 0,
            finished: false,
        }
    }
}

/// Sequential reader over a [`RequestBody`].
///
/// File-backed bodies yield at most [`TempFileBody::len`] bytes. A short
/// read from the capability ends the stream early.
#[derive(Debug)]
pub struct BodyReader<'a> {
    body: &'a RequestBody,
    read_file: FileReadFn,
    chunk: usize,
    chunk_pos: usize,
    file_pos: u64,
    finished: bool,
}

impl BodyReader<'_> {
    /// Returns the number of bytes already consumed from a file-backed body.
    #[must_use]
    pub const fn file_position(&self) -> u64 {
        self.file_pos
    }
}

impl Read for BodyReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }

        let body = self.body;
        match body {
            RequestBody::Empty => {
                self.finished = true;
                Ok(0)
            }
            RequestBody::InMemory(chunks) => {
                while let Some(chunk) = chunks.get(self.chunk) {
                    let remaining = &chunk[self.chunk_pos..];
                    if remaining.is_empty() {
                        self.chunk += 1;
                        self.chunk_pos = 0;
                        continue;
                    }

                    let n = remaining.len().min(buf.len());
                    buf[..n].copy_from_slice(&remaining[..n]);
                    self.chunk_pos += n;
                    if self.chunk_pos == chunk.len() {
                        self.chunk += 1;
                        self.chunk_pos = 0;
                    }
                    return Ok(n);
                }

                self.finished = true;
                Ok(0)
            }
            RequestBody::TempFile(file) => {
                let remaining = file.len().saturating_sub(self.file_pos);
                if remaining == 0 {
                    self.finished = true;
                    return Ok(0);
                }

                let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
                let n = (self.read_file)(file.path(), &mut buf[..want], self.file_pos)?;
                self.file_pos += n as u64;
                if n < want || self.file_pos >= file.len() {
                    self.finished = true;
                }
                Ok(n)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn read_all(mut reader: BodyReader<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_empty_body() {
        let body = RequestBody::Empty;
        assert!(body.is_empty());
        assert!(read_all(body.reader()).is_empty());
    }

    #[test]
    fn test_from_empty_bytes_is_empty_body() {
        assert_eq!(RequestBody::from_bytes(Bytes::new()), RequestBody::Empty);
    }

    #[test]
    fn test_in_memory_chain_is_read_in_order() {
        let body = RequestBody::InMemory(vec![
            Bytes::from_static(b"a=1"),
            Bytes::new(),
            Bytes::from_static(b"&b=2"),
        ]);
        assert_eq!(body.len(), 7);
        assert_eq!(read_all(body.reader()), b"a=1&b=2");
    }

    #[test]
    fn test_in_memory_small_buffer_reads() {
        let body = RequestBody::InMemory(vec![Bytes::from_static(b"hello"), Bytes::from_static(b"world")]);
        let mut reader = body.reader();
        let mut buf = [0u8; 3];

        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"wor");
    }

    #[test]
    fn test_temp_file_body() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"spilled body contents").unwrap();

        let body = RequestBody::TempFile(TempFileBody::new(file.path(), 21));
        assert_eq!(body.len(), 21);
        assert_eq!(read_all(body.reader()), b"spilled body contents");
    }

    #[test]
    fn test_temp_file_uses_capability() {
        fn fixed(_path: &Path, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            let data = b"0123456789";
            let start = usize::try_from(offset).unwrap().min(data.len());
            let n = (data.len() - start).min(buf.len());
            buf[..n].copy_from_slice(&data[start..start + n]);
            Ok(n)
        }

        let body = RequestBody::TempFile(TempFileBody::new("/nonexistent", 10));
        let mut reader = body.reader_with(fixed);
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(reader.file_position(), 4);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"456789");
    }

    #[test]
    fn test_temp_file_is_bounded_by_declared_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"user=alice&trailing-garbage").unwrap();

        let body = RequestBody::TempFile(TempFileBody::new(file.path(), 10));
        let mut reader = body.reader();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, b"user=alice");
        assert_eq!(out.len() as u64, body.len());
        assert_eq!(reader.file_position(), 10);
    }

    #[test]
    fn test_zero_length_temp_file_never_touches_the_file() {
        fn unreachable_read(_path: &Path, _buf: &mut [u8], _offset: u64) -> io::Result<usize> {
            Err(io::Error::other("file must not be read"))
        }

        let body = RequestBody::TempFile(TempFileBody::new("/nonexistent", 0));
        let mut buf = [0u8; 8];
        assert_eq!(body.reader_with(unreachable_read).read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_temp_file_read_error_propagates() {
        let body = RequestBody::TempFile(TempFileBody::new("/definitely/not/here", 5));
        let mut buf = [0u8; 8];
        assert!(body.reader().read(&mut buf).is_err());
    }
}
