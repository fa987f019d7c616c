use std::{cmp::Ordering, fmt::Display};

use bstr::{BStr, BString, ByteSlice};
use indexmap::{map::Entry, IndexMap};

use crate::error::{Error, Result};
use crate::oid::{Oid, OID_SIZE};

use super::{Object, ObjectKind};

pub const DIRECTORY_MODE: u32 = 0o40000;
pub const REGULAR_MODE: u32 = 0o100644;
pub const EXECUTABLE_MODE: u32 = 0o100755;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    mode: u32,
    name: BString,
    oid: Oid,
}

impl TreeEntry {
    pub fn new(mode: u32, name: impl Into<BString>, oid: Oid) -> Result<Self> {
        let name = name.into();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(&b'/')
            || name.contains(&0)
        {
            return Err(Error::InvalidEntryName(name.to_str_lossy().into_owned()));
        }
        Ok(Self { mode, name, oid })
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn name(&self) -> &BStr {
        self.name.as_bstr()
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn is_dir(&self) -> bool {
        self.mode == DIRECTORY_MODE
    }

    /// Kind of the object this entry points at, as implied by its mode.
    pub fn kind(&self) -> ObjectKind {
        if self.is_dir() {
            ObjectKind::Tree
        } else {
            ObjectKind::Blob
        }
    }
}

impl Display for TreeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:06o} {} {}\t{}",
            self.mode,
            self.kind(),
            self.oid,
            self.name
        )
    }
}

/// Git's tree order: bytewise on names, with directories compared as though
/// their name ended in `/`.
pub fn canonical_cmp(a: &[u8], a_is_dir: bool, b: &[u8], b_is_dir: bool) -> Ordering {
    let suffix = |is_dir: bool| if is_dir { &b"/"[..] } else { &b""[..] };
    a.iter()
        .chain(suffix(a_is_dir))
        .cmp(b.iter().chain(suffix(b_is_dir)))
}

pub fn encode(entries: &[TreeEntry]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for entry in entries {
        serialize_entry(entry, &mut bytes);
    }
    bytes
}

fn serialize_entry(entry: &TreeEntry, out: &mut Vec<u8>) {
    out.extend_from_slice(format!("{:o}", entry.mode).as_bytes());
    out.push(b' ');
    out.extend_from_slice(&entry.name);
    out.push(0);
    out.extend_from_slice(entry.oid.as_bytes());
}

/// Only the form `encode` writes is accepted: octal digits without a
/// leading zero, so decoding then encoding reproduces the input bytes.
fn parse_mode(text: &[u8]) -> Option<u32> {
    if text.is_empty() || text[0] == b'0' || !text.iter().all(|b| (b'0'..=b'7').contains(b)) {
        return None;
    }
    u32::from_str_radix(std::str::from_utf8(text).ok()?, 8).ok()
}

pub fn decode(bytes: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut rest = bytes;

    while !rest.is_empty() {
        let offset = bytes.len() - rest.len();

        let space = rest.find_byte(b' ').ok_or_else(|| {
            Error::Format(format!("tree entry at offset {offset} has no mode separator"))
        })?;
        let mode = parse_mode(&rest[..space]).ok_or_else(|| {
            Error::Format(format!(
                "invalid mode {:?} in tree entry at offset {offset}",
                rest[..space].to_str_lossy()
            ))
        })?;
        rest = &rest[space + 1..];

        let nul = rest.find_byte(0).ok_or_else(|| {
            Error::Format(format!("tree entry at offset {offset} has unterminated name"))
        })?;
        let name = BString::from(&rest[..nul]);
        rest = &rest[nul + 1..];

        if rest.len() < OID_SIZE {
            return Err(Error::Format(format!(
                "tree entry {:?} has truncated hash ({} of {} bytes)",
                name,
                rest.len(),
                OID_SIZE
            )));
        }
        let (hash, tail) = rest.split_at(OID_SIZE);
        let mut raw = [0u8; OID_SIZE];
        raw.copy_from_slice(hash);
        rest = tail;

        entries.push(TreeEntry {
            mode,
            name,
            oid: Oid::from_bytes(raw),
        });
    }

    Ok(entries)
}

/// Entries of one directory level, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    entries: IndexMap<BString, TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut tree = Tree::new();
        for entry in decode(bytes)? {
            tree.add_entry(entry)?;
        }
        Ok(tree)
    }

    pub fn add_entry(&mut self, entry: TreeEntry) -> Result<()> {
        match self.entries.entry(entry.name.clone()) {
            Entry::Vacant(e) => e.insert(entry),
            Entry::Occupied(e) => {
                return Err(Error::DuplicateEntryName(
                    e.key().to_str_lossy().into_owned(),
                ))
            }
        };

        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    pub fn get(&self, name: &[u8]) -> Option<&TreeEntry> {
        self.entries.get(name.as_bstr())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sort_canonical(&mut self) {
        self.entries
            .sort_by(|_, a, _, b| canonical_cmp(&a.name, a.is_dir(), &b.name, b.is_dir()));
    }
}

impl Object for Tree {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Tree
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for entry in self.entries.values() {
            serialize_entry(entry, &mut bytes);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mode: u32, name: &str, content: &[u8]) -> TreeEntry {
        TreeEntry::new(mode, name, Oid::new(content)).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let oid = Oid::new(b"blob 3\0hi\n");
        let bytes = encode(&[TreeEntry::new(REGULAR_MODE, "a.txt", oid).unwrap()]);

        let mut expected = b"100644 a.txt\0".to_vec();
        expected.extend_from_slice(oid.as_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_directory_mode_has_no_leading_zero() {
        let bytes = encode(&[entry(DIRECTORY_MODE, "b", b"tree 0\0")]);
        assert!(bytes.starts_with(b"40000 b\0"));
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let entries = vec![
            entry(REGULAR_MODE, "zeta", b"1"),
            entry(DIRECTORY_MODE, "alpha", b"2"),
            entry(EXECUTABLE_MODE, "run.sh", b"3"),
        ];
        assert_eq!(decode(&encode(&entries)).unwrap(), entries);
    }

    #[test]
    fn test_roundtrip_empty() {
        assert!(encode(&[]).is_empty());
        assert!(decode(b"").unwrap().is_empty());
    }

    #[test]
    fn test_name_may_contain_spaces() {
        let entries = vec![entry(REGULAR_MODE, "my file.txt", b"x")];
        assert_eq!(decode(&encode(&entries)).unwrap(), entries);
    }

    #[test]
    fn test_truncated_hash() {
        let mut bytes = encode(&[entry(REGULAR_MODE, "a", b"x")]);
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_missing_separators() {
        assert!(matches!(decode(b"100644"), Err(Error::Format(_))));
        assert!(matches!(decode(b"100644 name"), Err(Error::Format(_))));
    }

    #[test]
    fn test_invalid_mode() {
        let mut bytes = b"10x644 a\0".to_vec();
        bytes.extend_from_slice(&[0u8; OID_SIZE]);
        assert!(matches!(decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_noncanonical_mode_text() {
        for mode in [&b"040000"[..], b"+644", b"10x644", b"1006448", b"0"] {
            let mut bytes = mode.to_vec();
            bytes.extend_from_slice(b" d\0");
            bytes.extend_from_slice(&[1u8; OID_SIZE]);
            assert!(
                matches!(decode(&bytes), Err(Error::Format(_))),
                "mode {:?} accepted",
                mode.as_bstr()
            );
        }
    }

    #[test]
    fn test_decoded_bytes_reencode_identically() {
        let mut bytes = b"40000 d\0".to_vec();
        bytes.extend_from_slice(&[1u8; OID_SIZE]);
        bytes.extend_from_slice(b"100600 f\0");
        bytes.extend_from_slice(&[2u8; OID_SIZE]);
        assert_eq!(encode(&decode(&bytes).unwrap()), bytes);
    }

    #[test]
    fn test_invalid_names() {
        let oid = Oid::new(b"");
        for name in ["", ".", "..", "a/b", "nul\0byte"] {
            assert!(matches!(
                TreeEntry::new(REGULAR_MODE, name, oid),
                Err(Error::InvalidEntryName(_))
            ));
        }
    }

    #[test]
    fn test_duplicate_entry() {
        let mut tree = Tree::new();
        tree.add_entry(entry(REGULAR_MODE, "a", b"1")).unwrap();
        assert!(matches!(
            tree.add_entry(entry(REGULAR_MODE, "a", b"2")),
            Err(Error::DuplicateEntryName(_))
        ));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_tree_keeps_insertion_order() {
        let mut tree = Tree::new();
        tree.add_entry(entry(REGULAR_MODE, "b", b"1")).unwrap();
        tree.add_entry(entry(REGULAR_MODE, "a", b"2")).unwrap();
        let names: Vec<_> = tree.entries().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_sort_canonical() {
        let mut tree = Tree::new();
        tree.add_entry(entry(REGULAR_MODE, "foo.txt", b"1")).unwrap();
        tree.add_entry(entry(DIRECTORY_MODE, "foo", b"2")).unwrap();
        tree.add_entry(entry(REGULAR_MODE, "foo-bar", b"3")).unwrap();
        tree.add_entry(entry(REGULAR_MODE, "Zed", b"4")).unwrap();
        tree.sort_canonical();

        // "foo/" sorts after "foo.txt" because '/' > '.'
        let names: Vec<_> = tree.entries().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["Zed", "foo-bar", "foo.txt", "foo"]);
    }

    #[test]
    fn test_tree_object_bytes_match_codec() {
        let entries = vec![
            entry(REGULAR_MODE, "a", b"1"),
            entry(DIRECTORY_MODE, "b", b"2"),
        ];
        let mut tree = Tree::new();
        for e in entries.clone() {
            tree.add_entry(e).unwrap();
        }
        assert_eq!(tree.kind(), ObjectKind::Tree);
        assert_eq!(tree.to_bytes(), encode(&entries));

        let parsed = Tree::parse(&tree.to_bytes()).unwrap();
        assert_eq!(parsed.get(b"b").unwrap().kind(), ObjectKind::Tree);
    }

    #[test]
    fn test_ls_tree_display() {
        let e = entry(DIRECTORY_MODE, "src", b"tree 0\0");
        assert_eq!(
            e.to_string(),
            format!("040000 tree {}\tsrc", Oid::new(b"tree 0\0"))
        );
    }
}
