//! Non-fatal problems collected during a run

use crate::id::{TriceFmt, TriceId};
use std::fmt;
use std::path::PathBuf;

/// A problem that was reported and skipped over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// File where the warning occurred, if it concerns one
    pub file: Option<PathBuf>,
    /// Line number (1-indexed)
    pub line: Option<usize>,
    pub kind: WarningKind,
}

/// Types of warnings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// A configured source root does not exist
    MissingRoot(PathBuf),
    /// A source file could not be read or is not UTF-8
    UnreadableFile(String),
    /// An embedded ID is already registered with a different format.
    /// The list keeps `kept`.
    DuplicateId {
        id: TriceId,
        kept: TriceFmt,
        found: TriceFmt,
    },
}

impl Warning {
    pub fn missing_root(root: impl Into<PathBuf>) -> Self {
        Self {
            file: None,
            line: None,
            kind: WarningKind::MissingRoot(root.into()),
        }
    }

    pub fn unreadable(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            line: None,
            kind: WarningKind::UnreadableFile(reason.into()),
        }
    }

    pub fn duplicate_id(
        file: impl Into<PathBuf>,
        line: usize,
        id: TriceId,
        kept: TriceFmt,
        found: TriceFmt,
    ) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
            kind: WarningKind::DuplicateId { id, kept, found },
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::MissingRoot(root) => {
                write!(f, "source root {} does not exist, skipping", root.display())
            }
            WarningKind::UnreadableFile(reason) => write!(f, "skipping file: {reason}"),
            WarningKind::DuplicateId { id, kept, found } => write!(
                f,
                "ID {id} is already used by {kept}, ignoring {found}"
            ),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}: {}", file.display(), line, self.kind),
            (Some(file), None) => write!(f, "{}: {}", file.display(), self.kind),
            _ => write!(f, "{}", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let w = Warning::duplicate_id(
            "src/main.c",
            12,
            TriceId(99),
            TriceFmt::new("TRICE0", "a"),
            TriceFmt::new("TRICE0", "b"),
        );
        assert_eq!(
            w.to_string(),
            r#"src/main.c:12: ID 99 is already used by TRICE0 "a", ignoring TRICE0 "b""#
        );
        assert_eq!(
            Warning::missing_root("nope").to_string(),
            "source root nope does not exist, skipping"
        );
    }
}
