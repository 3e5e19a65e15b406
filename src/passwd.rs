//! Parser for the classic /etc/passwd format.
//!
//! One record per non-empty line, 7 colon-separated fields:
//! name, password placeholder, uid, gid, comment (GECOS), home, shell.
//! The parse is fail-fast: a single malformed line aborts the whole
//! thing and no partial record list escapes.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const FIELD_COUNT: usize = 7;

/// One account record. UID and GID stay string-typed: they are opaque
/// identifiers here, compared but never done arithmetic on.
///
/// A `User` with only `name` or only `uid` set is a partial query, used
/// for lookups and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub password: String,
    pub uid: String,
    pub gid: String,
    pub comment: String,
    pub home: String,
    pub shell: String,
}

impl User {
    /// Partial query matching on login name.
    pub fn by_name(name: impl Into<String>) -> Self {
        User {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Partial query matching on uid.
    pub fn by_uid(uid: impl Into<String>) -> Self {
        User {
            uid: uid.into(),
            ..Default::default()
        }
    }

    /// Match rule used by lookups: uid matches OR name matches, each
    /// side only considered when the query populates it. When a caller
    /// supplies both and only one agrees, this still matches. That is
    /// long-standing behavior callers rely on; do not tighten to AND.
    pub fn matches(&self, query: &User) -> bool {
        (!query.uid.is_empty() && query.uid == self.uid)
            || (!query.name.is_empty() && query.name == self.name)
    }

    /// Human-readable identity for diagnostics, preferring the name.
    pub fn identity(&self) -> &str {
        if self.name.is_empty() {
            &self.uid
        } else {
            &self.name
        }
    }
}

/// Parse a full passwd dump, preserving line order. Blank lines are
/// skipped, so a trailing newline produces no phantom record.
pub fn parse(raw: &str) -> Result<Vec<User>> {
    let mut users = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != FIELD_COUNT {
            return Err(Error::Parse {
                line: idx + 1,
                fields: fields.len(),
                content: line.to_string(),
            });
        }
        users.push(User {
            name: fields[0].to_string(),
            password: fields[1].to_string(),
            uid: fields[2].to_string(),
            gid: fields[3].to_string(),
            comment: fields[4].to_string(),
            home: fields[5].to_string(),
            shell: fields[6].to_string(),
        });
    }
    Ok(users)
}
