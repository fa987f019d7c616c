use std::fmt::Display;

use bstr::ByteSlice;
use chrono::{DateTime, FixedOffset, TimeZone};
use tracing::debug;

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::repository::db::Db;

use super::{Object, ObjectKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    name: String,
    email: String,
    a_time: DateTime<FixedOffset>,
}

impl Author {
    pub fn new<Tz: TimeZone>(name: String, email: String, atime: DateTime<Tz>) -> Self {
        Self {
            a_time: atime.fixed_offset(),
            name,
            email,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn time(&self) -> &DateTime<FixedOffset> {
        &self.a_time
    }

    /// Parses `name <email> unix_seconds +hhmm`.
    pub fn parse(line: &str) -> Result<Self> {
        let malformed = || Error::Format(format!("malformed identity {line:?}"));

        let open = line.find('<').ok_or_else(malformed)?;
        let close = line.rfind('>').filter(|&c| c > open).ok_or_else(malformed)?;

        let name = line[..open].trim_end().to_owned();
        let email = line[open + 1..close].to_owned();

        let mut when = line[close + 1..].split_whitespace();
        let seconds: i64 = when
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(malformed)?;
        let offset = when.next().and_then(parse_offset).ok_or_else(malformed)?;

        let a_time = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(malformed)?
            .with_timezone(&offset);

        Ok(Self {
            name,
            email,
            a_time,
        })
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unix_timestamp = self.a_time.timestamp();
        let utc_offset = self.a_time.format("%z");

        write!(
            f,
            "{} <{}> {} {}",
            self.name, self.email, unix_timestamp, utc_offset
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    tree: Oid,
    parent: Option<Oid>,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    pub fn new(
        tree_oid: Oid,
        parent: Option<Oid>,
        author: Author,
        committer: Author,
        message: String,
    ) -> Self {
        Self {
            tree: tree_oid,
            parent,
            author,
            committer,
            message,
        }
    }

    pub fn tree(&self) -> &Oid {
        &self.tree
    }

    pub fn parent(&self) -> Option<&Oid> {
        self.parent.as_ref()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Checks that `tree` names a tree and `parent`, if any, names a commit.
    pub fn validate(&self, db: &Db) -> Result<()> {
        expect_kind(db, &self.tree, ObjectKind::Tree)?;
        if let Some(parent) = &self.parent {
            expect_kind(db, parent, ObjectKind::Commit)?;
        }
        Ok(())
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = bytes
            .to_str()
            .map_err(|_| Error::Format("commit is not valid utf-8".into()))?;
        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::Format("commit has no blank line before message".into()))?;

        let mut tree = None;
        let mut parent = None;
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "tree" => tree = Some(value.parse::<Oid>()?),
                "parent" => {
                    if parent.replace(value.parse::<Oid>()?).is_some() {
                        return Err(Error::Format("commit has more than one parent".into()));
                    }
                }
                "author" => author = Some(Author::parse(value)?),
                "committer" => committer = Some(Author::parse(value)?),
                _ => {}
            }
        }

        let missing = |field: &str| Error::Format(format!("commit has no {field} header"));

        Ok(Self {
            tree: tree.ok_or_else(|| missing("tree"))?,
            parent,
            author: author.ok_or_else(|| missing("author"))?,
            committer: committer.ok_or_else(|| missing("committer"))?,
            message: message.to_owned(),
        })
    }
}

fn expect_kind(db: &Db, oid: &Oid, expected: ObjectKind) -> Result<()> {
    let actual = db.kind_of(oid)?;
    debug!(%oid, %actual, %expected, "checked commit reference");

    if actual != expected {
        return Err(Error::Validation {
            oid: *oid,
            expected,
            actual,
        });
    }
    Ok(())
}

impl Object for Commit {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Commit
    }

    fn to_bytes(&self) -> Vec<u8> {
        let newline = if self.message.ends_with('\n') { "" } else { "\n" };
        format!(
            "tree {}\n{}author {}\ncommitter {}\n\n{}{}",
            self.tree,
            match self.parent {
                Some(parent) => format!("parent {}\n", parent),
                None => String::new(),
            },
            self.author,
            self.committer,
            self.message,
            newline
        )
        .into()
    }
}

/// Validates references against `db`, then renders the commit payload.
pub fn build(
    db: &Db,
    tree: Oid,
    parent: Option<Oid>,
    author: Author,
    committer: Author,
    message: String,
) -> Result<Vec<u8>> {
    let commit = Commit::new(tree, parent, author, committer, message);
    commit.validate(db)?;
    Ok(commit.to_bytes())
}
