//! Composite `(lane, read, sample)` identifier for alignment results.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::LANE_LIST;

/// Identifies one lane/read/sample combination.
///
/// Any field may be `None`, which acts as a wildcard in [`SampleKey::matches`].
/// Ordering compares `lane`, then `sample`, then `read`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleKey {
    pub lane: Option<u32>,
    pub read: Option<u32>,
    pub sample: Option<String>,
}

impl SampleKey {
    #[must_use]
    pub fn new(lane: Option<u32>, read: Option<u32>, sample: Option<&str>) -> Self {
        Self {
            lane,
            read,
            sample: sample.map(str::to_string),
        }
    }

    /// Key for a whole lane, with read and sample left as wildcards
    #[must_use]
    pub fn for_lane(lane: u32) -> Self {
        Self {
            lane: Some(lane),
            ..Self::default()
        }
    }

    /// Build a key from textual lane/read values as found in file names and
    /// snapshots. Empty or non-numeric values become wildcards.
    #[must_use]
    pub fn from_text(lane: Option<&str>, read: Option<&str>, sample: Option<&str>) -> Self {
        let number = |v: Option<&str>| v.and_then(|s| s.trim().parse::<u32>().ok());
        Self {
            lane: number(lane),
            read: number(read),
            sample: sample.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    /// True if any field is a wildcard
    #[must_use]
    pub fn is_wild(&self) -> bool {
        self.lane.is_none() || self.read.is_none() || self.sample.is_none()
    }

    /// Field-wise comparison where `None` on either side matches anything
    #[must_use]
    pub fn matches(&self, other: &SampleKey) -> bool {
        fn field<T: PartialEq>(a: Option<&T>, b: Option<&T>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }

        field(self.lane.as_ref(), other.lane.as_ref())
            && field(self.read.as_ref(), other.read.as_ref())
            && field(self.sample.as_ref(), other.sample.as_ref())
    }
}

impl Ord for SampleKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lane
            .cmp(&other.lane)
            .then_with(|| self.sample.cmp(&other.sample))
            .then_with(|| self.read.cmp(&other.read))
    }
}

impl PartialOrd for SampleKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<String>| v.unwrap_or_else(|| "*".to_string());
        write!(
            f,
            "L{},R{},S{}",
            show(self.lane.map(|l| l.to_string())),
            show(self.read.map(|r| r.to_string())),
            show(self.sample.clone())
        )
    }
}

/// One wildcard key per flowcell lane
#[must_use]
pub fn lane_sample_keys() -> Vec<SampleKey> {
    LANE_LIST.iter().map(|&lane| SampleKey::for_lane(lane)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_matches_wildcards() {
        let full = SampleKey::new(Some(1), Some(1), Some("s"));
        assert!(full.matches(&SampleKey::default()));
        assert!(SampleKey::default().matches(&full));
        assert!(full.matches(&SampleKey::for_lane(1)));
        assert!(!SampleKey::for_lane(1).matches(&SampleKey::for_lane(2)));
        assert!(!full.matches(&SampleKey::new(Some(1), Some(2), None)));
        assert!(!full.matches(&SampleKey::new(None, None, Some("other"))));
    }

    #[test]
    fn test_is_wild() {
        assert!(SampleKey::default().is_wild());
        assert!(SampleKey::for_lane(3).is_wild());
        assert!(!SampleKey::new(Some(3), Some(1), Some("s")).is_wild());
    }

    #[test]
    fn test_ordering_compares_sample_before_read() {
        let a = SampleKey::new(Some(1), Some(2), Some("a"));
        let b = SampleKey::new(Some(1), Some(1), Some("b"));
        assert!(a < b);

        let c = SampleKey::new(Some(2), Some(1), Some("a"));
        assert!(b < c);
        assert!(a < c);

        let mut keys = vec![c.clone(), b.clone(), a.clone()];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn test_wildcard_sorts_first() {
        assert!(SampleKey::default() < SampleKey::for_lane(1));
        assert!(SampleKey::for_lane(1) < SampleKey::new(Some(1), None, Some("s")));
    }

    #[test]
    fn test_hash_covers_all_fields() {
        let mut set = HashSet::new();
        set.insert(SampleKey::new(Some(1), Some(1), Some("s")));
        set.insert(SampleKey::new(Some(1), Some(1), Some("s")));
        set.insert(SampleKey::new(Some(1), Some(2), Some("s")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_from_text() {
        let key = SampleKey::from_text(Some("3"), Some("2"), Some("11111"));
        assert_eq!(key, SampleKey::new(Some(3), Some(2), Some("11111")));

        let key = SampleKey::from_text(Some("x"), None, Some(""));
        assert_eq!(key, SampleKey::default());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SampleKey::new(Some(1), Some(2), Some("s")).to_string(),
            "L1,R2,Ss"
        );
        assert_eq!(SampleKey::for_lane(4).to_string(), "L4,R*,S*");
    }

    #[test]
    fn test_lane_sample_keys() {
        let keys = lane_sample_keys();
        assert_eq!(keys.len(), 8);
        assert_eq!(keys[0], SampleKey::for_lane(1));
        assert!(keys.iter().all(SampleKey::is_wild));
    }
}
