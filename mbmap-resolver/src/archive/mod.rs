//! Streaming access to members of a compressed dump archive
//!
//! The archive is a tar stream, optionally bzip2 or gzip compressed.
//! Nothing is extracted: each call re-opens the file, decompresses
//! incrementally while walking tar headers, and hands the matching
//! member to a closure as a buffered reader.
//!
//! # Invariants
//! - Reads are sequential; no seeks are performed.
//! - The file handle and decoder live only for the duration of the call,
//!   so they are released on every exit path, including a closure that
//!   returns early or with an error.
//! - Only regular-file members are selectable.

mod selector;

pub use selector::{MemberSelector, SelectorParseError};

use crate::error::{ResolveError, ResolveResult};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read buffer used for both the compressed file and the member stream
const READ_BUFFER_LEN: usize = 256 * 1024;

/// bzip2 stream magic ("BZh" + block size digit)
const BZIP2_MAGIC: [u8; 3] = *b"BZh";

/// gzip magic bytes (RFC 1952)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Container compression detected from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarBzip2,
    TarGzip,
    Tar,
}

impl ArchiveFormat {
    /// Detect the format from the first bytes of the file
    ///
    /// Anything that is not bzip2 or gzip is treated as a plain tar stream;
    /// the tar parser rejects it later if it is not one.
    pub fn sniff(header: &[u8]) -> Self {
        match header {
            [a, b, c, level, ..] if [*a, *b, *c] == BZIP2_MAGIC && level.is_ascii_digit() => {
                ArchiveFormat::TarBzip2
            }
            [a, b, ..] if [*a, *b] == GZIP_MAGIC => ArchiveFormat::TarGzip,
            _ => ArchiveFormat::Tar,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::TarBzip2 => f.write_str("tar.bz2"),
            ArchiveFormat::TarGzip => f.write_str("tar.gz"),
            ArchiveFormat::Tar => f.write_str("tar"),
        }
    }
}

/// Handle on a dump archive; holds no open file between calls
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    path: PathBuf,
    format: ArchiveFormat,
}

impl ArchiveReader {
    /// Check the archive exists and detect its compression
    pub fn open(path: &Path) -> ResolveResult<Self> {
        if !path.exists() {
            return Err(ResolveError::ArchiveNotFound(path.to_path_buf()));
        }

        let mut file = File::open(path).map_err(|e| open_error(path, e))?;
        let mut header = [0u8; 4];
        let header_len = read_prefix(&mut file, &mut header).map_err(|e| open_error(path, e))?;
        let format = ArchiveFormat::sniff(&header[..header_len]);

        debug!("Archive {} detected as {}", path.display(), format);

        Ok(Self {
            path: path.to_path_buf(),
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Map a read failure inside a member to `CorruptArchive`
    pub fn read_error(&self, err: io::Error) -> ResolveError {
        ResolveError::CorruptArchive {
            path: self.path.clone(),
            detail: err.to_string(),
        }
    }

    /// Fresh decoding tar stream from the start of the file
    fn stream(&self) -> ResolveResult<tar::Archive<Box<dyn Read>>> {
        let file = File::open(&self.path).map_err(|e| open_error(&self.path, e))?;
        let buffered = BufReader::with_capacity(READ_BUFFER_LEN, file);

        let decoded: Box<dyn Read> = match self.format {
            ArchiveFormat::TarBzip2 => Box::new(MultiBzDecoder::new(buffered)),
            ArchiveFormat::TarGzip => Box::new(MultiGzDecoder::new(buffered)),
            ArchiveFormat::Tar => Box::new(buffered),
        };

        Ok(tar::Archive::new(decoded))
    }

    /// Find the member name matched by each selector
    ///
    /// Walks member headers (decompressing, but not buffering, member
    /// data) and stops as soon as every selector has a match. Each
    /// selector takes the first member it matches. Returned names are in
    /// selector order.
    pub fn locate_members(&self, selectors: &[&MemberSelector]) -> ResolveResult<Vec<String>> {
        let mut found: Vec<Option<String>> = vec![None; selectors.len()];
        let mut archive = self.stream()?;
        let entries = archive.entries().map_err(|e| self.read_error(e))?;
        let mut seen = 0u64;

        for entry in entries {
            let entry = entry.map_err(|e| self.read_error(e))?;
            seen += 1;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = member_name(&entry);
            for (slot, selector) in found.iter_mut().zip(selectors) {
                if slot.is_none() && selector.matches(&name) {
                    debug!("Selector {} matched member {}", selector, name);
                    *slot = Some(name.clone());
                }
            }

            if found.iter().all(Option::is_some) {
                break;
            }
        }

        if seen == 0 {
            return Err(self.no_entries());
        }

        found
            .into_iter()
            .zip(selectors)
            .map(|(slot, selector)| {
                slot.ok_or_else(|| ResolveError::MemberNotFound {
                    selector: selector.to_string(),
                })
            })
            .collect()
    }

    /// Stream the first member matching `selector` through `read`
    ///
    /// The closure receives the member name and a buffered reader over
    /// the decompressed member bytes. Returning from the closure, for any
    /// reason, stops decompression and closes the file.
    pub fn with_member<T, F>(&self, selector: &MemberSelector, read: F) -> ResolveResult<T>
    where
        F: FnOnce(&str, &mut dyn BufRead) -> ResolveResult<T>,
    {
        let mut archive = self.stream()?;
        let entries = archive.entries().map_err(|e| self.read_error(e))?;
        let mut seen = 0u64;

        for entry in entries {
            let entry = entry.map_err(|e| self.read_error(e))?;
            seen += 1;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = member_name(&entry);
            if selector.matches(&name) {
                debug!(
                    "Streaming member {} ({} bytes uncompressed)",
                    name,
                    entry.size()
                );
                let mut reader = BufReader::with_capacity(READ_BUFFER_LEN, entry);
                return read(&name, &mut reader);
            }
        }

        if seen == 0 {
            return Err(self.no_entries());
        }
        Err(ResolveError::MemberNotFound {
            selector: selector.to_string(),
        })
    }

    /// A stream that yields no tar headers at all is not a dump archive
    fn no_entries(&self) -> ResolveError {
        ResolveError::CorruptArchive {
            path: self.path.clone(),
            detail: "no tar entries found".to_string(),
        }
    }
}

/// Member path as a `/`-separated string without a leading `./`
fn member_name<R: Read>(entry: &tar::Entry<'_, R>) -> String {
    let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
    match raw.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => raw,
    }
}

fn open_error(path: &Path, err: io::Error) -> ResolveError {
    if err.kind() == io::ErrorKind::NotFound {
        ResolveError::ArchiveNotFound(path.to_path_buf())
    } else {
        ResolveError::CorruptArchive {
            path: path.to_path_buf(),
            detail: format!("cannot open: {}", err),
        }
    }
}

/// Fill `buf` as far as the file allows; short files return fewer bytes
fn read_prefix(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
