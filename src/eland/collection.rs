//! All result lanes of one alignment run, keyed by [`SampleKey`].

use std::collections::btree_map;
use std::collections::BTreeMap;

use tracing::warn;

use crate::core::sample_key::SampleKey;
use crate::eland::lane::ResultLane;
use crate::element::Element;
use crate::parsing::ParseError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElandCollection {
    results: BTreeMap<SampleKey, ResultLane>,
}

impl ElandCollection {
    pub const XML_TAG: &'static str = "ElandCollection";
    pub const XML_VERSION: u32 = 2;
    const LANE_TAG: &'static str = "Lane";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &SampleKey) -> Option<&ResultLane> {
        self.results.get(key)
    }

    pub fn insert(&mut self, key: SampleKey, lane: ResultLane) -> Option<ResultLane> {
        self.results.insert(key, lane)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SampleKey> {
        self.results.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &ResultLane> {
        self.results.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, SampleKey, ResultLane> {
        self.results.iter()
    }

    /// Keys matching a possibly wildcarded pattern, in key order
    #[must_use]
    pub fn find_keys(&self, pattern: &SampleKey) -> Vec<&SampleKey> {
        self.results.keys().filter(|k| k.matches(pattern)).collect()
    }

    /// Serialize every lane, counting unread files first.
    ///
    /// # Errors
    ///
    /// Propagates counting errors, including `ParseError::NotReady`.
    pub fn to_xml(&self) -> Result<Element, ParseError> {
        let mut root = Element::new(Self::XML_TAG).with_attr("version", Self::XML_VERSION);
        for (key, lane) in &self.results {
            let mut lane_xml = Element::new(Self::LANE_TAG);
            if let Some(l) = key.lane {
                lane_xml.set_attr("lane", l);
            }
            if let Some(r) = key.read {
                lane_xml.set_attr("read", r);
            }
            if let Some(s) = &key.sample {
                lane_xml.set_attr("sample", s);
            }
            lane_xml.push(lane.to_xml()?);
            root.push(lane_xml);
        }
        Ok(root)
    }

    /// Rebuild from a snapshot element.
    ///
    /// Version 1 documents put a bare `id` attribute on each lane result;
    /// those become `lane = id, read = 1`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Xml` for a different root tag and lane errors
    /// from [`ResultLane::from_xml`].
    pub fn from_xml(tree: &Element) -> Result<Self, ParseError> {
        tree.expect_tag(Self::XML_TAG)?;
        tree.warn_if_newer(Self::XML_VERSION);

        let mut collection = Self::new();
        for element in &tree.children {
            if element.is(Self::LANE_TAG) {
                let key = SampleKey::from_text(
                    element.attr("lane"),
                    element.attr("read"),
                    element.attr("sample"),
                );
                for child in &element.children {
                    collection.insert(key.clone(), ResultLane::from_xml(child)?);
                }
            } else if let Some(id) = element.attr("id") {
                let key = SampleKey::from_text(Some(id), Some("1"), None);
                collection.insert(key, ResultLane::from_xml(element)?);
            } else {
                warn!(tag = %element.name, "Unrecognized ElandCollection tag, skipping");
            }
        }
        Ok(collection)
    }
}

impl<'a> IntoIterator for &'a ElandCollection {
    type Item = (&'a SampleKey, &'a ResultLane);
    type IntoIter = btree_map::Iter<'a, SampleKey, ResultLane>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
