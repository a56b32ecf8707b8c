use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use concord_types::{Digest, ErrorClass};
use sha2::{Digest as _, Sha256};
use tracing::trace;

const READ_CHUNK: usize = 64 * 1024;

/// SHA-256 content hasher.
///
/// Ledger tip hashes, receipt digests, and packet anchors all go through
/// here so that two instances hashing the same bytes always agree.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes.
    pub fn hash_bytes(data: &[u8]) -> Digest {
        Digest::from_hash(Sha256::digest(data).into())
    }

    /// Hash a file's contents, streaming it in chunks.
    pub fn hash_file(path: &Path) -> Result<Digest, HashError> {
        let io_err = |source| HashError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_CHUNK];
        let mut total = 0usize;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(e)),
            };
            hasher.update(&buf[..n]);
            total += n;
        }
        trace!(path = %path.display(), bytes = total, "hashed file");
        Ok(Digest::from_hash(hasher.finalize().into()))
    }

    /// Hash the UTF-8 concatenation of hex digests, in the order given.
    ///
    /// Callers sort beforehand; this function does not reorder.
    pub fn hash_concat<'a, I>(digests: I) -> Digest
    where
        I: IntoIterator<Item = &'a Digest>,
    {
        let mut hasher = Sha256::new();
        for digest in digests {
            hasher.update(digest.as_str().as_bytes());
        }
        Digest::from_hash(hasher.finalize().into())
    }

    /// Verify that data produces the expected digest.
    pub fn verify(data: &[u8], expected: &Digest) -> bool {
        Self::hash_bytes(data) == *expected
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HashError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorClass::Resource
            }
            Self::Io { .. } => ErrorClass::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // SHA-256("abc") from FIPS 180-2 appendix B.1.
    const ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    // SHA-256 of the empty string.
    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn known_vectors() {
        assert_eq!(ContentHasher::hash_bytes(b"abc").as_str(), ABC);
        assert_eq!(ContentHasher::hash_bytes(b"").as_str(), EMPTY);
    }

    #[test]
    fn file_hash_matches_byte_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        let digest = ContentHasher::hash_file(file.path()).unwrap();
        assert_eq!(digest.as_str(), ABC);
    }

    #[test]
    fn large_file_streams_across_chunks() {
        let data = vec![7u8; READ_CHUNK * 3 + 17];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        assert_eq!(
            ContentHasher::hash_file(file.path()).unwrap(),
            ContentHasher::hash_bytes(&data)
        );
    }

    #[test]
    fn missing_file_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentHasher::hash_file(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Resource);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn concat_hashes_hex_text_in_order() {
        let a = ContentHasher::hash_bytes(b"a");
        let b = ContentHasher::hash_bytes(b"b");
        let expected = ContentHasher::hash_bytes(format!("{a}{b}").as_bytes());
        assert_eq!(ContentHasher::hash_concat([&a, &b]), expected);
        assert_ne!(ContentHasher::hash_concat([&b, &a]), expected);
    }

    #[test]
    fn concat_of_nothing_is_empty_hash() {
        let none: [&Digest; 0] = [];
        assert_eq!(ContentHasher::hash_concat(none).as_str(), EMPTY);
    }

    #[test]
    fn verify_detects_tampering() {
        let digest = ContentHasher::hash_bytes(b"original");
        assert!(ContentHasher::verify(b"original", &digest));
        assert!(!ContentHasher::verify(b"tampered", &digest));
    }
}
