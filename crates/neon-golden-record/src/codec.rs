//! Binary record layout.
//!
//! Fields appear in a fixed order. Integer fields are one header line; blob
//! fields are a header line carrying the byte length, followed by exactly that
//! many raw bytes and a single `\n` terminator:
//!
//! ```text
//! :i builds <0|1>
//! :i argc <N>
//! :b arg0 <len>
//! <len bytes>
//! ...
//! :b stdin <len>
//! <len bytes>
//! :i returncode <value>
//! :b stdout <len>
//! <len bytes>
//! :b stderr <len>
//! <len bytes>
//! ```

use std::io::{self, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::RecordError;
use crate::test_case::TestCase;

impl TestCase {
    /// Write the record layout to `out`.
    pub fn encode<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write_int_field(out, "builds", i64::from(self.builds))?;
        write_int_field(out, "argc", self.argv.len() as i64)?;
        for (index, arg) in self.argv.iter().enumerate() {
            write_blob_field(out, &format!("arg{index}"), arg.as_bytes())?;
        }
        write_blob_field(out, "stdin", &self.stdin)?;
        write_int_field(out, "returncode", i64::from(self.returncode))?;
        write_blob_field(out, "stdout", &self.stdout)?;
        write_blob_field(out, "stderr", &self.stderr)
    }

    /// Encode into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            64 + self.stdin.len() + self.stdout.len() + self.stderr.len(),
        );
        // Writing into a Vec cannot fail.
        let _ = self.encode(&mut out);
        out
    }

    /// Read a complete record from `input`.
    pub fn decode<R: Read>(input: &mut R) -> Result<Self, RecordError> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a complete record. Trailing bytes after `stderr` are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut cursor = Cursor::new(bytes);

        let builds = match cursor.int_field("builds")? {
            0 => false,
            1 => true,
            other => {
                return Err(RecordError::malformed(
                    cursor.last_line,
                    format!("builds must be 0 or 1, got {other}"),
                ));
            }
        };

        let argc = cursor.int_field("argc")?;
        let argc = usize::try_from(argc).map_err(|_| {
            RecordError::malformed(cursor.last_line, format!("negative argc {argc}"))
        })?;

        let mut argv = Vec::with_capacity(argc.min(64));
        for index in 0..argc {
            let start = cursor.pos;
            let raw = cursor.blob_field(&format!("arg{index}"))?;
            let arg = std::str::from_utf8(raw).map_err(|e| {
                RecordError::malformed(start, format!("arg{index} is not valid UTF-8: {e}"))
            })?;
            argv.push(arg.to_string());
        }

        let stdin = cursor.blob_field("stdin")?.to_vec();
        let returncode = cursor.int_field("returncode")?;
        let returncode = i32::try_from(returncode).map_err(|_| {
            RecordError::malformed(
                cursor.last_line,
                format!("returncode {returncode} out of range"),
            )
        })?;
        let stdout = cursor.blob_field("stdout")?.to_vec();
        let stderr = cursor.blob_field("stderr")?.to_vec();

        if cursor.pos != bytes.len() {
            return Err(RecordError::malformed(
                cursor.pos,
                format!("{} trailing bytes after stderr", bytes.len() - cursor.pos),
            ));
        }

        Ok(Self {
            builds,
            argv,
            stdin,
            returncode,
            stdout,
            stderr,
        })
    }
}

/// Load the record at `path`.
///
/// Returns `Ok(None)` when the file does not exist: the fixture simply has no
/// expectation yet.
pub fn load(path: &Path) -> Result<Option<TestCase>, RecordError> {
    match std::fs::read(path) {
        Ok(bytes) => TestCase::from_bytes(&bytes).map(Some),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Replace the record at `path`.
///
/// The record is written to a temporary file in the same directory and then
/// renamed over `path`, so a reader never observes a partial record.
pub fn save(path: &Path, case: &TestCase) -> Result<(), RecordError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&case.to_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

fn write_int_field<W: Write>(out: &mut W, name: &str, value: i64) -> io::Result<()> {
    writeln!(out, ":i {name} {value}")
}

fn write_blob_field<W: Write>(out: &mut W, name: &str, blob: &[u8]) -> io::Result<()> {
    writeln!(out, ":b {name} {}", blob.len())?;
    out.write_all(blob)?;
    out.write_all(b"\n")
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Offset of the most recently consumed header line.
    last_line: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            last_line: 0,
        }
    }

    fn line(&mut self) -> Result<&'a [u8], RecordError> {
        let rest = &self.bytes[self.pos..];
        let Some(end) = rest.iter().position(|&b| b == b'\n') else {
            return Err(RecordError::malformed(
                self.pos,
                "unterminated header line",
            ));
        };
        self.last_line = self.pos;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    fn header_value(&mut self, kind: char, name: &str) -> Result<&'a str, RecordError> {
        let line = self.line()?;
        let prefix = format!(":{kind} {name} ");
        let Some(value) = line.strip_prefix(prefix.as_bytes()) else {
            return Err(RecordError::malformed(
                self.last_line,
                format!(
                    "expected `{}<value>`, found `{}`",
                    prefix,
                    line.escape_ascii()
                ),
            ));
        };
        std::str::from_utf8(value).map_err(|_| {
            RecordError::malformed(self.last_line, format!("non-ASCII value for {name}"))
        })
    }

    fn int_field(&mut self, name: &str) -> Result<i64, RecordError> {
        let value = self.header_value('i', name)?;
        value.parse::<i64>().map_err(|e| {
            RecordError::malformed(
                self.last_line,
                format!("{name}: `{value}` is not a decimal integer ({e})"),
            )
        })
    }

    fn blob_field(&mut self, name: &str) -> Result<&'a [u8], RecordError> {
        let value = self.header_value('b', name)?;
        let len = value.parse::<usize>().map_err(|e| {
            RecordError::malformed(
                self.last_line,
                format!("{name}: `{value}` is not a byte length ({e})"),
            )
        })?;

        let remaining = self.bytes.len() - self.pos;
        if len > remaining {
            return Err(RecordError::malformed(
                self.pos,
                format!("{name}: blob of {len} bytes truncated to {remaining}"),
            ));
        }
        let blob = &self.bytes[self.pos..self.pos + len];
        self.pos += len;

        if self.bytes.get(self.pos) != Some(&b'\n') {
            return Err(RecordError::malformed(
                self.pos,
                format!("{name}: missing newline after blob"),
            ));
        }
        self.pos += 1;
        Ok(blob)
    }
}
