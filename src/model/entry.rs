//! Entry modes and the flat (`ls-tree` style) wire format

use crate::model::Hash;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Git file mode of a tree entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Regular file
    #[default]
    File,
    /// Executable file
    Executable,
    /// Symbolic link
    Symlink,
    /// Directory
    Tree,
}

impl EntryMode {
    /// The octal form Git writes into tree objects
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::File => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Tree => "40000",
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Tree)
    }

    pub fn entry_type(&self) -> EntryType {
        if self.is_tree() {
            EntryType::Tree
        } else {
            EntryType::Blob
        }
    }
}

impl FromStr for EntryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "100644" => Ok(EntryMode::File),
            "100755" => Ok(EntryMode::Executable),
            "120000" => Ok(EntryMode::Symlink),
            "40000" | "040000" => Ok(EntryMode::Tree),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EntryMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntryMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Object type of a flat record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    Tree,
}

/// One record of a flattened tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatEntry {
    pub path: String,
    pub sha: Hash,
    pub mode: EntryMode,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

impl FlatEntry {
    pub fn blob(path: impl Into<String>, sha: Hash, mode: EntryMode) -> Self {
        FlatEntry {
            path: path.into(),
            sha,
            mode,
            entry_type: EntryType::Blob,
        }
    }

    pub fn tree(path: impl Into<String>, sha: Hash) -> Self {
        FlatEntry {
            path: path.into(),
            sha,
            mode: EntryMode::Tree,
            entry_type: EntryType::Tree,
        }
    }
}

/// A whole tree as a flat record list plus its declared root sha
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatTree {
    pub sha: Hash,
    pub tree: Vec<FlatEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("100644".parse::<EntryMode>().unwrap(), EntryMode::File);
        assert_eq!("040000".parse::<EntryMode>().unwrap(), EntryMode::Tree);
        assert_eq!("40000".parse::<EntryMode>().unwrap(), EntryMode::Tree);
        assert!("644".parse::<EntryMode>().is_err());
    }

    #[test]
    fn test_flat_entry_json_shape() {
        let entry = FlatEntry::blob("a/b.txt", Hash::blob(b""), EntryMode::File);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["path"], "a/b.txt");
        assert_eq!(value["mode"], "100644");
        assert_eq!(value["type"], "blob");
        assert_eq!(value["sha"], "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }
}
