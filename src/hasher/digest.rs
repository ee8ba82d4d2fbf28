use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const READ_CHUNK_SIZE: usize = 8 * 1024; // 8KB

const MD5_EMPTY: &str = "d41d8cd98f00b204e9800998ecf8427e";
const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Lowercase hex digest of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streams bytes through a hash to produce a [`ContentDigest`].
///
/// Implementations only need `digest_reader`; `digest` opens the file and
/// attaches the path to any I/O failure.
pub trait Fingerprinter {
    fn algorithm(&self) -> &'static str;

    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<ContentDigest>;

    fn digest(&self, path: &Path) -> Result<ContentDigest> {
        let mut file = File::open(path).map_err(|e| Error::io_at(path, e))?;
        self.digest_reader(&mut file)
            .map_err(|e| Error::io_at(path, e))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Md5Fingerprinter;

impl Fingerprinter for Md5Fingerprinter {
    fn algorithm(&self) -> &'static str {
        "md5"
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<ContentDigest> {
        let mut context = md5::Context::new();
        for_each_chunk(reader, |chunk| context.consume(chunk))?;
        Ok(ContentDigest(format!("{:x}", context.compute())))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Fingerprinter;

impl Fingerprinter for Sha256Fingerprinter {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<ContentDigest> {
        let mut hasher = Sha256::new();
        for_each_chunk(reader, |chunk| hasher.update(chunk))?;
        Ok(ContentDigest(hex::encode(hasher.finalize())))
    }
}

fn for_each_chunk<F>(reader: &mut dyn Read, mut consume: F) -> io::Result<()>
where
    F: FnMut(&[u8]),
{
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        consume(&buffer[..bytes_read]);
    }
}

/// Resolve a configured algorithm name to a fingerprinter and make sure it
/// digests the empty stream to the expected constant before any file is
/// hashed with it.
pub fn fingerprinter_for(name: &str) -> Result<Box<dyn Fingerprinter>> {
    let (fingerprinter, expected_empty): (Box<dyn Fingerprinter>, &str) =
        match name.trim().to_ascii_lowercase().as_str() {
            "md5" => (Box::new(Md5Fingerprinter), MD5_EMPTY),
            "sha256" | "sha-256" => (Box::new(Sha256Fingerprinter), SHA256_EMPTY),
            other => {
                return Err(Error::HashingFailure(format!(
                    "unsupported hash algorithm '{}'",
                    other
                )))
            }
        };

    let empty = fingerprinter
        .digest_reader(&mut io::empty())
        .map_err(|e| Error::HashingFailure(e.to_string()))?;
    if empty.as_str() != expected_empty {
        return Err(Error::HashingFailure(format!(
            "{} self-check produced {}",
            fingerprinter.algorithm(),
            empty
        )));
    }

    Ok(fingerprinter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_md5_known_value() {
        let digest = Md5Fingerprinter
            .digest_reader(&mut Cursor::new(b"hello world".to_vec()))
            .unwrap();
        assert_eq!(digest.as_str(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_sha256_known_value() {
        let digest = Sha256Fingerprinter
            .digest_reader(&mut Cursor::new(b"hello world".to_vec()))
            .unwrap();
        assert_eq!(
            digest.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_digest() {
        let data: Vec<u8> = (0..(READ_CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let streamed = Md5Fingerprinter
            .digest_reader(&mut Cursor::new(data.clone()))
            .unwrap();
        let direct = format!("{:x}", md5::compute(&data));
        assert_eq!(streamed.as_str(), direct);
    }

    #[test]
    fn test_fingerprinter_for_known_names() {
        assert_eq!(fingerprinter_for("md5").unwrap().algorithm(), "md5");
        assert_eq!(fingerprinter_for("SHA256").unwrap().algorithm(), "sha256");
    }

    #[test]
    fn test_fingerprinter_for_unknown_name() {
        match fingerprinter_for("crc32") {
            Err(Error::HashingFailure(msg)) => assert!(msg.contains("crc32")),
            other => panic!("expected HashingFailure, got {:?}", other.map(|f| f.algorithm())),
        }
    }

    #[test]
    fn test_missing_file_reports_path() {
        let missing = Path::new("/definitely/not/here.bin");
        match Md5Fingerprinter.digest(missing) {
            Err(Error::PathIo { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected PathIo, got {:?}", other),
        }
    }
}
