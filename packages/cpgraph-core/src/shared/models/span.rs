//! Source locations
//!
//! A location pins a node to a region inside an artifact (file) so that
//! diagnostics and downstream reporting can point back into the source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column region inside a source artifact (1-based, end-inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Region {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// A region spanning a single line.
    pub fn line(line: u32) -> Self {
        Self::new(line, 1, line, 1)
    }

    /// The smallest region covering both `self` and `other`.
    pub fn merge(&self, other: &Region) -> Region {
        let (start_line, start_column) =
            if (self.start_line, self.start_column) <= (other.start_line, other.start_column) {
                (self.start_line, self.start_column)
            } else {
                (other.start_line, other.start_column)
            };
        let (end_line, end_column) =
            if (self.end_line, self.end_column) >= (other.end_line, other.end_column) {
                (self.end_line, self.end_column)
            } else {
                (other.end_line, other.end_column)
            };
        Region {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new(1, 1, 1, 1)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

/// Physical source location: artifact URI plus region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// URI of the source artifact (usually a file path)
    pub uri: String,
    /// Region within the artifact
    pub region: Region,
}

impl Location {
    pub fn new(uri: impl Into<String>, region: Region) -> Self {
        Self {
            uri: uri.into(),
            region,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uri, self.region)
    }
}
