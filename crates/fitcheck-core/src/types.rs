// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the fitcheck validator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the upload session an image belongs to. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One of the four page corners expected to carry boilerplate text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    TopLeft,
    TopRight,
    BaseLeft,
    BaseRight,
}

impl Region {
    /// All four regions, in declaration order.
    pub const ALL: [Region; 4] = [
        Region::TopLeft,
        Region::TopRight,
        Region::BaseLeft,
        Region::BaseRight,
    ];

    /// The region on the other end of this region's diagonal.
    pub fn diagonal(self) -> Region {
        match self {
            Self::TopLeft => Self::BaseRight,
            Self::BaseRight => Self::TopLeft,
            Self::TopRight => Self::BaseLeft,
            Self::BaseLeft => Self::TopRight,
        }
    }

    /// Whether the region lies in the top strip of the page.
    pub fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }

    /// Whether the region lies in the left half of the page.
    pub fn is_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BaseLeft)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::TopLeft => 0,
            Self::TopRight => 1,
            Self::BaseLeft => 2,
            Self::BaseRight => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "TOP_LEFT",
            Self::TopRight => "TOP_RIGHT",
            Self::BaseLeft => "BASE_LEFT",
            Self::BaseRight => "BASE_RIGHT",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-size map from [`Region`] to a value, one slot per corner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionMap<T>([T; 4]);

impl<T> RegionMap<T> {
    /// Build a map by evaluating `f` once per region.
    pub fn from_fn(mut f: impl FnMut(Region) -> T) -> Self {
        Self(Region::ALL.map(&mut f))
    }

    pub fn get(&self, region: Region) -> &T {
        &self.0[region.index()]
    }

    pub fn get_mut(&mut self, region: Region) -> &mut T {
        &mut self.0[region.index()]
    }

    /// Iterate `(region, value)` pairs in [`Region::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Region, &T)> {
        Region::ALL.into_iter().zip(self.0.iter())
    }
}

/// The classifier's current conclusion about a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// No scores have been classified yet.
    Initialised,
    /// No region reached the high target.
    Failed,
    /// At least one strong region, but no diagonal or full top match.
    Partial,
    /// The document is a readable instance of the form.
    Success,
}

impl Verdict {
    /// `SUCCESS` and `PARTIAL` end a rotation race; anything else is worthless.
    pub fn is_conclusive(self) -> bool {
        matches!(self, Self::Success | Self::Partial)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Initialised => "INITIALISED",
            Self::Failed => "FAILED",
            Self::Partial => "PARTIAL",
            Self::Success => "SUCCESS",
        };
        f.write_str(label)
    }
}

/// An assumed orientation of the scanned document, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Rotation {
    /// Launch order for the rotation race: right-way-up and upside-down
    /// are by far the most common real-world scans.
    pub const RACE_ORDER: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg180,
        Rotation::Deg90,
        Rotation::Deg270,
    ];

    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Diagnostic summary of one region after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionReport {
    pub region: Region,
    /// Best fuzzy match percentage found for the region.
    pub percentage: u8,
    /// Recognised text that produced the best score, truncated for logging.
    pub snippet: String,
}
