//! The record codec: one [`FileRecord`] per filesystem entry, and the
//! length-prefixed binary framing used to store a sequence of them.
//!
//! Encoding order, all integers little-endian:
//! 1. `u16 path_len` + `path_len` bytes of path
//! 2. `i64 size`
//! 3. `u32 mode`
//! 4. `u16 modtime_len` (always 16) + timestamp: `i64` seconds, `u32` nanos, `i32` UTC offset seconds
//! 5. `u16 digest_len` + `digest_len` bytes of digest
//!
//! Framing wraps one encoded record with a `u16` length prefix. Paths beyond 65535 bytes,
//! or records whose encoded form exceeds 65535 bytes, cannot be framed.

use std::fmt;
use std::io::{Read, Write};

use chrono::{DateTime, FixedOffset, TimeZone};
use sha2::{Digest, Sha512};

use crate::error::{Error, Result};

const MODE_DIR: u32 = 1 << 31;
const MODE_SYMLINK: u32 = 1 << 27;
const MODE_DEVICE: u32 = 1 << 26;
const MODE_NAMED_PIPE: u32 = 1 << 25;
const MODE_SOCKET: u32 = 1 << 24;
const MODE_TYPE_MASK: u32 = MODE_DIR | MODE_SYMLINK | MODE_DEVICE | MODE_NAMED_PIPE | MODE_SOCKET;
const MODE_PERM: u32 = 0o777;

/// File type + permission bits, modelled on the high bits `os.FileMode` uses in the
/// original implementation so that matching and formatting read the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileMode(pub u32);

impl FileMode {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let ft = meta.file_type();
        let mut bits = 0u32;
        if ft.is_dir() {
            bits |= MODE_DIR;
        } else if ft.is_symlink() {
            bits |= MODE_SYMLINK;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            use std::os::unix::fs::PermissionsExt;
            if ft.is_block_device() || ft.is_char_device() {
                bits |= MODE_DEVICE;
            }
            if ft.is_fifo() {
                bits |= MODE_NAMED_PIPE;
            }
            if ft.is_socket() {
                bits |= MODE_SOCKET;
            }
            bits |= meta.permissions().mode() & MODE_PERM;
        }
        #[cfg(not(unix))]
        {
            if meta.permissions().readonly() {
                bits |= 0o444;
            } else {
                bits |= 0o644;
            }
        }
        FileMode(bits)
    }

    pub fn is_dir(&self) -> bool {
        self.0 & MODE_DIR != 0
    }

    pub fn is_symlink(&self) -> bool {
        self.0 & MODE_SYMLINK != 0
    }

    /// Mirrors Go's `FileMode.IsRegular`: no type bit is set at all.
    pub fn is_regular(&self) -> bool {
        self.0 & MODE_TYPE_MASK == 0
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_char = if self.is_dir() {
            'd'
        } else if self.is_symlink() {
            'L'
        } else if self.0 & MODE_NAMED_PIPE != 0 {
            'p'
        } else if self.0 & MODE_SOCKET != 0 {
            'S'
        } else if self.0 & MODE_DEVICE != 0 {
            'D'
        } else {
            '-'
        };
        let perm = self.0 & MODE_PERM;
        let mut s = String::with_capacity(10);
        s.push(type_char);
        for shift in [6, 3, 0] {
            let bits = (perm >> shift) & 0o7;
            s.push(if bits & 0b100 != 0 { 'r' } else { '-' });
            s.push(if bits & 0b010 != 0 { 'w' } else { '-' });
            s.push(if bits & 0b001 != 0 { 'x' } else { '-' });
        }
        f.write_str(&s)
    }
}

/// One filesystem entry as recorded by a generate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub size: i64,
    pub mode: FileMode,
    pub modtime: DateTime<FixedOffset>,
    pub digest: Vec<u8>,
}

impl FileRecord {
    /// Build a skeletal record (no digest) from a directory entry's metadata.
    pub fn from_metadata(path: String, meta: &std::fs::Metadata) -> Self {
        let mode = FileMode::from_metadata(meta);
        let modtime = system_time_to_fixed_offset(meta.modified().unwrap_or(std::time::UNIX_EPOCH));
        FileRecord {
            path,
            size: meta.len() as i64,
            mode,
            modtime,
            digest: Vec::new(),
        }
    }

    /// Computes the SHA-512 digest of the file's content, unless it is not a regular
    /// file or is empty, in which case the digest stays empty.
    pub fn calc_digest(&mut self) -> Result<()> {
        if !self.mode.is_regular() || self.size == 0 {
            return Ok(());
        }
        let mut file = std::fs::File::open(&self.path)?;
        let mut hasher = Sha512::new();
        std::io::copy(&mut file, &mut hasher)?;
        self.digest = hasher.finalize().to_vec();
        Ok(())
    }

    pub fn hex_digest(&self) -> String {
        if self.digest.is_empty() {
            String::new()
        } else {
            hex_encode(&self.digest)
        }
    }

    /// Metadata-only equality used to skip digesting before a costly hash.
    pub fn lite_match(&self, other: &FileRecord) -> bool {
        if self.mode != other.mode {
            return false;
        }
        if self.mode.is_regular() {
            self.size == other.size && self.modtime == other.modtime
        } else {
            self.modtime == other.modtime
        }
    }

    /// Full equality: metadata plus content digest.
    pub fn matches(&self, other: &FileRecord) -> bool {
        self.lite_match(other) && self.digest == other.digest
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let path_bytes = self.path.as_bytes();
        if path_bytes.len() > u16::MAX as usize {
            return Err(Error::EncodingTooLarge(path_bytes.len()));
        }
        if self.digest.len() > u16::MAX as usize {
            return Err(Error::EncodingTooLarge(self.digest.len()));
        }

        let mut buf = Vec::with_capacity(2 + path_bytes.len() + 8 + 4 + 2 + 16 + 2 + self.digest.len());
        buf.extend_from_slice(&(path_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(path_bytes);
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&self.mode.0.to_le_bytes());

        let modtime_bytes = encode_modtime(&self.modtime);
        buf.extend_from_slice(&(modtime_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(&modtime_bytes);

        buf.extend_from_slice(&(self.digest.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.digest);

        if buf.len() > u16::MAX as usize {
            return Err(Error::EncodingTooLarge(buf.len()));
        }
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<FileRecord> {
        let mut pos = 0usize;
        let path_len = read_u16(data, &mut pos)? as usize;
        let path_bytes = read_slice(data, &mut pos, path_len)?;
        let path = String::from_utf8_lossy(path_bytes).into_owned();

        let size = read_i64(data, &mut pos)?;
        let mode = FileMode(read_u32(data, &mut pos)?);

        let modtime_len = read_u16(data, &mut pos)? as usize;
        let modtime_bytes = read_slice(data, &mut pos, modtime_len)?;
        let modtime = decode_modtime(modtime_bytes)?;

        let digest_len = read_u16(data, &mut pos)? as usize;
        let digest = read_slice(data, &mut pos, digest_len)?.to_vec();

        Ok(FileRecord {
            path,
            size,
            mode,
            modtime,
            digest,
        })
    }

    pub fn write_framed<W: Write>(&self, sink: &mut W) -> Result<()> {
        let bytes = self.encode()?;
        if bytes.len() > u16::MAX as usize {
            return Err(Error::EncodingTooLarge(bytes.len()));
        }
        sink.write_all(&(bytes.len() as u16).to_le_bytes())?;
        sink.write_all(&bytes)?;
        Ok(())
    }

    /// Reads one framed record. `Ok(None)` is a clean end-of-stream (zero bytes read
    /// for the length prefix); a short read past that point is `Error::TruncatedRecord`.
    pub fn read_framed<R: Read>(source: &mut R) -> Result<Option<FileRecord>> {
        let mut len_buf = [0u8; 2];
        let n = read_partial(source, &mut len_buf)?;
        if n == 0 {
            return Ok(None);
        }
        if n < 2 {
            return Err(Error::TruncatedRecord);
        }
        let len = u16::from_le_bytes(len_buf) as usize;
        let mut blob = vec![0u8; len];
        source.read_exact(&mut blob).map_err(|_| Error::TruncatedRecord)?;
        Ok(Some(FileRecord::decode(&blob)?))
    }
}

fn read_partial<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match source.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

fn read_u16(data: &[u8], pos: &mut usize) -> Result<u16> {
    let bytes = read_slice(data, pos, 2)?;
    Ok(u16::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    let bytes = read_slice(data, pos, 4)?;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_i64(data: &[u8], pos: &mut usize) -> Result<i64> {
    let bytes = read_slice(data, pos, 8)?;
    Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_slice<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos.checked_add(len).ok_or(Error::TruncatedRecord)?;
    if end > data.len() {
        return Err(Error::TruncatedRecord);
    }
    let slice = &data[*pos..end];
    *pos = end;
    Ok(slice)
}

fn encode_modtime(dt: &DateTime<FixedOffset>) -> [u8; 16] {
    let mut buf = [0u8; 16];
    buf[0..8].copy_from_slice(&dt.timestamp().to_le_bytes());
    buf[8..12].copy_from_slice(&dt.timestamp_subsec_nanos().to_le_bytes());
    buf[12..16].copy_from_slice(&dt.offset().local_minus_utc().to_le_bytes());
    buf
}

fn decode_modtime(bytes: &[u8]) -> Result<DateTime<FixedOffset>> {
    if bytes.len() != 16 {
        return Err(Error::TruncatedRecord);
    }
    let secs = i64::from_le_bytes(bytes[0..8].try_into().unwrap());
    let nanos = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let offset_secs = i32::from_le_bytes(bytes[12..16].try_into().unwrap());
    let offset = FixedOffset::east_opt(offset_secs).ok_or(Error::TruncatedRecord)?;
    offset
        .timestamp_opt(secs, nanos)
        .single()
        .ok_or(Error::TruncatedRecord)
}

fn system_time_to_fixed_offset(t: std::time::SystemTime) -> DateTime<FixedOffset> {
    let dt: DateTime<chrono::Local> = t.into();
    dt.fixed_offset()
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}
