//! Policy versions and version-match constraints.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use itertools::{EitherOrBoth, Itertools};
use serde::{Deserialize, Serialize};

use crate::error::PdpError;

use super::identifier::Identifier;

/// A policy version: a dotted sequence of numbers. Ordering is field-wise
/// numeric, never lexical, so `2.0 < 10.0` and `1.0 == 1.0.0`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(Vec<u64>);

impl Version {
    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for Version {
    type Err = PdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = s
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| PdpError::InvalidVersion(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if components.is_empty() {
            return Err(PdpError::InvalidVersion(s.to_string()));
        }
        Ok(Version(components))
    }
}

impl TryFrom<String> for Version {
    type Error = PdpError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0.iter().map(|c| c.to_string()).join("."))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // missing trailing components compare as zero
        for pair in self.0.iter().zip_longest(other.0.iter()) {
            let (a, b) = match pair {
                EitherOrBoth::Both(a, b) => (*a, *b),
                EitherOrBoth::Left(a) => (*a, 0),
                EitherOrBoth::Right(b) => (0, *b),
            };
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchPart {
    Number(u64),
    /// `*`: any single component.
    AnyOne,
    /// `+`: any remaining components, including none.
    AnySuffix,
}

/// A version-match pattern: numeric components with `*` (exactly one
/// component) and a trailing `+` (any suffix), e.g. `1.*.3` or `2.+`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionMatch {
    parts: Vec<MatchPart>,
    pattern: String,
}

impl VersionMatch {
    pub fn matches(&self, version: &Version) -> bool {
        let mut components = version.components().iter();
        for part in &self.parts {
            match part {
                MatchPart::AnySuffix => return true,
                MatchPart::AnyOne => {
                    if components.next().is_none() {
                        return false;
                    }
                }
                MatchPart::Number(n) => {
                    if components.next() != Some(n) {
                        return false;
                    }
                }
            }
        }
        components.next().is_none()
    }
}

impl FromStr for VersionMatch {
    type Err = PdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: Vec<&str> = s.split('.').collect();
        if raw.is_empty() || raw.iter().any(|p| p.is_empty()) {
            return Err(PdpError::InvalidVersionMatch(s.to_string()));
        }
        let mut parts = Vec::with_capacity(raw.len());
        for (i, part) in raw.iter().enumerate() {
            let part = match *part {
                "*" => MatchPart::AnyOne,
                "+" => {
                    if i != raw.len() - 1 {
                        return Err(PdpError::InvalidVersionMatch(s.to_string()));
                    }
                    MatchPart::AnySuffix
                }
                number => MatchPart::Number(
                    number
                        .parse::<u64>()
                        .map_err(|_| PdpError::InvalidVersionMatch(s.to_string()))?,
                ),
            };
            parts.push(part);
        }
        Ok(VersionMatch {
            parts,
            pattern: s.to_string(),
        })
    }
}

impl TryFrom<String> for VersionMatch {
    type Error = PdpError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VersionMatch> for String {
    fn from(v: VersionMatch) -> Self {
        v.pattern
    }
}

impl Display for VersionMatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.pattern)
    }
}

/// The constraints an id reference places on the policy it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdReferenceMatch {
    id: Identifier,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    version: Option<VersionMatch>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    earliest_version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    latest_version: Option<Version>,
}

impl IdReferenceMatch {
    pub fn new(id: impl Into<Identifier>) -> Self {
        IdReferenceMatch {
            id: id.into(),
            version: None,
            earliest_version: None,
            latest_version: None,
        }
    }

    pub fn with_version(mut self, version: VersionMatch) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_earliest_version(mut self, version: Version) -> Self {
        self.earliest_version = Some(version);
        self
    }

    pub fn with_latest_version(mut self, version: Version) -> Self {
        self.latest_version = Some(version);
        self
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn matches(&self, id: &Identifier, version: &Version) -> bool {
        if &self.id != id {
            return false;
        }
        if let Some(pattern) = &self.version {
            if !pattern.matches(version) {
                return false;
            }
        }
        if let Some(earliest) = &self.earliest_version {
            if version < earliest {
                return false;
            }
        }
        if let Some(latest) = &self.latest_version {
            if version > latest {
                return false;
            }
        }
        true
    }
}
