use sha1::{Digest, Sha1};
use std::fmt::{Debug, Display};
use std::str::FromStr;

use crate::error::Error;

pub const OID_SIZE: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    hash: [u8; OID_SIZE],
}

impl Oid {
    /// Hashes framed object bytes.
    pub fn new(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        let hash = hasher.finalize();
        Self { hash: hash.into() }
    }

    pub fn from_bytes(hash: [u8; OID_SIZE]) -> Self {
        Self { hash }
    }

    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidHashHex(s.to_string()))?;
        let hash: [u8; OID_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::InvalidHashHex(s.to_string()))?;
        Ok(Self { hash })
    }

    pub fn as_bytes(&self) -> &[u8; OID_SIZE] {
        &self.hash
    }

    /// Fan-out directory (first two hex chars) and file name (remaining 38).
    pub fn to_path_components(&self) -> (String, String) {
        let hex = self.to_string();
        let (group, rest) = hex.split_at(2);
        (group.to_owned(), rest.to_owned())
    }
}

impl Debug for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Oid({})", base16ct::lower::encode_string(&self.hash))
    }
}

impl Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", base16ct::lower::encode_string(&self.hash))
    }
}

impl From<Oid> for String {
    fn from(value: Oid) -> Self {
        value.to_string()
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_blob_digest() {
        let oid = Oid::new(b"blob 6\0hello\n");
        assert_eq!(oid.to_string(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn test_hex_roundtrip() {
        let oid = Oid::new(b"tree 0\0");
        let parsed: Oid = oid.to_string().parse().unwrap();
        assert_eq!(oid, parsed);
        assert_eq!(parsed.to_string(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Oid::from_hex("not hex at all").is_err());
        assert!(Oid::from_hex("abcd").is_err());
        // 39 chars
        assert!(Oid::from_hex("ce013625030ba8dba906f756967f9e9ca394464").is_err());
        assert!(Oid::from_hex("ce013625030ba8dba906f756967f9e9ca394464aff").is_err());
    }

    #[test]
    fn test_path_components() {
        let oid = Oid::from_hex("ce013625030ba8dba906f756967f9e9ca394464a").unwrap();
        let (group, rest) = oid.to_path_components();
        assert_eq!(group, "ce");
        assert_eq!(rest, "013625030ba8dba906f756967f9e9ca394464a");
        assert_eq!(rest.len(), 38);
    }

    #[test]
    fn test_display_is_lowercase() {
        let oid = Oid::from_hex("CE013625030BA8DBA906F756967F9E9CA394464A").unwrap();
        assert_eq!(oid.to_string(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }
}
