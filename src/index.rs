//! Anchor-tag selector index.
//!
//! Compiled selectors are filed under every tag in their anchor set, plus a
//! tag-independent bucket for selectors that cannot name a finite set.
//! Visiting a node only evaluates its tag's bucket merged with the
//! tag-independent bucket, so per-node work scales with the selectors that
//! could possibly match, not with every registration.
//!
//! Buckets are sorted once at build time by dispatch order (specificity,
//! then canonical text); [`SelectorIndex::candidates`] merges two sorted
//! runs lazily, so evaluation order equals firing order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::selector::{AnchorSet, CompiledSelector};

/// Selectors bucketed by anchor tag, sorted in dispatch order.
#[derive(Debug, Default)]
pub struct SelectorIndex {
    by_tag: HashMap<String, Vec<Arc<CompiledSelector>>>,
    untagged: Vec<Arc<CompiledSelector>>,
}

impl SelectorIndex {
    /// Build an index over a set of compiled selectors.
    pub fn build<'a, I>(selectors: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<CompiledSelector>>,
    {
        let mut index = SelectorIndex::default();
        for selector in selectors {
            match selector.anchors() {
                AnchorSet::Tags(tags) => {
                    for tag in tags {
                        index
                            .by_tag
                            .entry(tag.clone())
                            .or_default()
                            .push(Arc::clone(selector));
                    }
                }
                AnchorSet::Any => index.untagged.push(Arc::clone(selector)),
            }
        }
        for bucket in index.by_tag.values_mut() {
            bucket.sort_by(|a, b| a.dispatch_cmp(b));
        }
        index.untagged.sort_by(|a, b| a.dispatch_cmp(b));
        index
    }

    /// The candidates for a node tag, in dispatch order.
    pub fn candidates(&self, tag: &str) -> Candidates<'_> {
        Candidates {
            tagged: self.by_tag.get(tag).map_or(&[], Vec::as_slice),
            untagged: &self.untagged,
        }
    }
}

/// Lazy ordered merge of a tag bucket and the tag-independent bucket.
#[derive(Debug)]
pub struct Candidates<'i> {
    tagged: &'i [Arc<CompiledSelector>],
    untagged: &'i [Arc<CompiledSelector>],
}

impl<'i> Iterator for Candidates<'i> {
    type Item = &'i CompiledSelector;

    fn next(&mut self) -> Option<Self::Item> {
        let pick_tagged = match (self.tagged.first(), self.untagged.first()) {
            (Some(a), Some(b)) => a.dispatch_cmp(b) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };
        if pick_tagged {
            let (first, rest) = self.tagged.split_first()?;
            self.tagged = rest;
            Some(first.as_ref())
        } else {
            let (first, rest) = self.untagged.split_first()?;
            self.untagged = rest;
            Some(first.as_ref())
        }
    }
}
