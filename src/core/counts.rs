//! Match-code and mapped-read counters accumulated from alignment results.
//!
//! Both types are values: they are filled in while a file is being read and
//! afterwards only combined with [`MatchCodes::merge`] / [`MappedReads::merge`]
//! (or `+`), which return new instances.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CountsError {
    #[error("Unrecognized match code: {0}")]
    UnknownMatchCode(String),
}

/// Alignment outcome categories reported by ELAND
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchCode {
    /// No match
    NM,
    /// Failed quality control
    QC,
    /// Repeat masked
    RM,
    /// Unique, no mismatches
    U0,
    /// Unique, one mismatch
    U1,
    /// Unique, two mismatches
    U2,
    /// Repeat, no mismatches
    R0,
    /// Repeat, one mismatch
    R1,
    /// Repeat, two mismatches
    R2,
}

impl MatchCode {
    pub const ALL: [MatchCode; 9] = [
        MatchCode::NM,
        MatchCode::QC,
        MatchCode::RM,
        MatchCode::U0,
        MatchCode::U1,
        MatchCode::U2,
        MatchCode::R0,
        MatchCode::R1,
        MatchCode::R2,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NM => "NM",
            Self::QC => "QC",
            Self::RM => "RM",
            Self::U0 => "U0",
            Self::U1 => "U1",
            Self::U2 => "U2",
            Self::R0 => "R0",
            Self::R1 => "R1",
            Self::R2 => "R2",
        }
    }

    /// Unique-hit code for a mismatch count (0, 1, or 2+)
    #[must_use]
    pub fn unique(mismatches: usize) -> Self {
        match mismatches {
            0 => Self::U0,
            1 => Self::U1,
            _ => Self::U2,
        }
    }

    /// Repeat-hit code for a mismatch count (0, 1, or 2+)
    #[must_use]
    pub fn repeat(mismatches: usize) -> Self {
        match mismatches {
            0 => Self::R0,
            1 => Self::R1,
            _ => Self::R2,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for MatchCode {
    type Err = CountsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| CountsError::UnknownMatchCode(s.to_string()))
    }
}

impl fmt::Display for MatchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-key histogram of [`MatchCode`] counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MatchCodes {
    counts: [u64; 9],
}

impl MatchCodes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(code, count)` pairs, rejecting unknown codes.
    ///
    /// # Errors
    ///
    /// Returns `CountsError::UnknownMatchCode` if a key is not one of the
    /// nine ELAND match codes.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, CountsError>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut codes = Self::new();
        for (name, count) in pairs {
            let code = name.parse::<MatchCode>()?;
            codes.counts[code.index()] = count;
        }
        Ok(codes)
    }

    #[must_use]
    pub fn get(&self, code: MatchCode) -> u64 {
        self.counts[code.index()]
    }

    /// Copy with one code replaced
    #[must_use]
    pub fn with_updated(&self, code: MatchCode, count: u64) -> Self {
        let mut next = *self;
        next.counts[code.index()] = count;
        next
    }

    /// Key-wise sum
    #[must_use]
    pub fn merge(&self, other: &MatchCodes) -> Self {
        let mut next = *self;
        for (slot, add) in next.counts.iter_mut().zip(other.counts.iter()) {
            *slot += add;
        }
        next
    }

    /// Codes and counts in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (MatchCode, u64)> + '_ {
        MatchCode::ALL.iter().map(move |&code| (code, self.get(code)))
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Sum of the unique-hit codes
    #[must_use]
    pub fn unique_total(&self) -> u64 {
        self.get(MatchCode::U0) + self.get(MatchCode::U1) + self.get(MatchCode::U2)
    }

    /// Sum of the repeat-hit codes
    #[must_use]
    pub fn repeat_total(&self) -> u64 {
        self.get(MatchCode::R0) + self.get(MatchCode::R1) + self.get(MatchCode::R2)
    }

    pub(crate) fn bump(&mut self, code: MatchCode, by: u64) {
        self.counts[code.index()] += by;
    }
}

impl Add for MatchCodes {
    type Output = MatchCodes;

    fn add(self, rhs: MatchCodes) -> MatchCodes {
        self.merge(&rhs)
    }
}

impl Serialize for MatchCodes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(MatchCode::ALL.len()))?;
        for (code, count) in self.iter() {
            map.serialize_entry(code.as_str(), &count)?;
        }
        map.end()
    }
}

/// Read counts per genome-relative chromosome file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappedReads {
    counts: BTreeMap<String, u64>,
}

impl MappedReads {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.counts.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Copy with one entry replaced
    #[must_use]
    pub fn with_updated(&self, name: &str, count: u64) -> Self {
        let mut next = self.clone();
        next.counts.insert(name.to_string(), count);
        next
    }

    /// Union of both maps, summing shared keys
    #[must_use]
    pub fn merge(&self, other: &MappedReads) -> Self {
        let mut next = self.clone();
        for (name, count) in &other.counts {
            *next.counts.entry(name.clone()).or_insert(0) += count;
        }
        next
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub(crate) fn bump(&mut self, name: &str, by: u64) {
        *self.counts.entry(name.to_string()).or_insert(0) += by;
    }
}

impl Add for MappedReads {
    type Output = MappedReads;

    fn add(self, rhs: MappedReads) -> MappedReads {
        self.merge(&rhs)
    }
}

impl FromIterator<(String, u64)> for MappedReads {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_codes_start_at_zero() {
        let codes = MatchCodes::new();
        assert_eq!(codes.iter().count(), 9);
        assert!(codes.iter().all(|(_, n)| n == 0));
    }

    #[test]
    fn test_from_pairs_rejects_unknown_code() {
        let err = MatchCodes::from_pairs([("U0", 1), ("foo", 2)]).unwrap_err();
        assert_eq!(err, CountsError::UnknownMatchCode("foo".to_string()));

        let codes = MatchCodes::from_pairs([("U0", 1), ("R2", 7)]).unwrap();
        assert_eq!(codes.get(MatchCode::U0), 1);
        assert_eq!(codes.get(MatchCode::R2), 7);
    }

    #[test]
    fn test_merge_identity_and_commutativity() {
        let a = MatchCodes::from_pairs([("U0", 3), ("NM", 1)]).unwrap();
        let b = MatchCodes::from_pairs([("U0", 2), ("R1", 9)]).unwrap();
        let c = MatchCodes::from_pairs([("QC", 5)]).unwrap();

        assert_eq!(a + MatchCodes::new(), a);
        assert_eq!(a + b, b + a);
        assert_eq!((a + b) + c, a + (b + c));

        let sum = a + b;
        assert_eq!(sum.get(MatchCode::U0), 5);
        assert_eq!(sum.get(MatchCode::R1), 9);
        assert_eq!(sum.get(MatchCode::NM), 1);
    }

    #[test]
    fn test_with_updated_leaves_receiver_unchanged() {
        let a = MatchCodes::new();
        let b = a.with_updated(MatchCode::RM, 4);
        assert_eq!(a.get(MatchCode::RM), 0);
        assert_eq!(b.get(MatchCode::RM), 4);
    }

    #[test]
    fn test_unique_and_repeat_codes() {
        assert_eq!(MatchCode::unique(0), MatchCode::U0);
        assert_eq!(MatchCode::unique(5), MatchCode::U2);
        assert_eq!(MatchCode::repeat(1), MatchCode::R1);
        assert_eq!("R2".parse::<MatchCode>().unwrap(), MatchCode::R2);
        assert!("r2".parse::<MatchCode>().is_err());
    }

    #[test]
    fn test_mapped_reads_merge() {
        let a: MappedReads = [("hg18/chr1.fa".to_string(), 2)].into_iter().collect();
        let b: MappedReads = [
            ("hg18/chr1.fa".to_string(), 3),
            ("Lambda.fa".to_string(), 1),
        ]
        .into_iter()
        .collect();

        let sum = a.clone() + b;
        assert_eq!(sum.get("hg18/chr1.fa"), Some(5));
        assert_eq!(sum.get("Lambda.fa"), Some(1));
        assert_eq!(sum.total(), 6);
        assert_eq!(a.get("hg18/chr1.fa"), Some(2));
        assert_eq!(a.clone() + MappedReads::new(), a);
    }

    #[test]
    fn test_match_codes_serialize_as_map() {
        let codes = MatchCodes::new().with_updated(MatchCode::U1, 2);
        let json = serde_json::to_value(codes).unwrap();
        assert_eq!(json["U1"], 2);
        assert_eq!(json["NM"], 0);
    }
}
