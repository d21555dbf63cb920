//! Specificity scoring.
//!
//! The ordering key for simultaneous matches: attribute-constraint count,
//! then type-constraint count, summed across the whole selector including
//! grouping pseudo-class bodies and comma alternatives. A pure function of
//! selector structure; no tree is ever inspected.

use serde::Serialize;

use crate::selector::ast::{Selector, Test};

/// The specificity ordering key.
///
/// Derived `Ord` compares `attributes` first, then `types`, which is
/// exactly the dispatch order contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Specificity {
    /// Attribute and field constraints.
    pub attributes: u32,
    /// Literal tag and category constraints.
    pub types: u32,
}

impl Specificity {
    /// Score a parsed selector.
    pub fn of(selector: &Selector) -> Self {
        let mut score = Specificity::default();
        score.add(selector);
        score
    }

    fn add(&mut self, selector: &Selector) {
        match selector {
            Selector::List(alternatives) => {
                for alt in alternatives {
                    self.add(alt);
                }
            }
            Selector::Relation { left, right, .. } => {
                self.add(left);
                self.add(right);
            }
            Selector::Compound(tests) => {
                for test in tests {
                    match test {
                        Test::Tag(_) | Test::Category(_) => self.types += 1,
                        Test::Attr { .. } | Test::Field(_) => self.attributes += 1,
                        Test::Not(alternatives) | Test::Matches(alternatives) => {
                            for alt in alternatives {
                                self.add(alt);
                            }
                        }
                        Test::Wildcard
                        | Test::FirstChild
                        | Test::LastChild
                        | Test::NthChild(_) => {}
                    }
                }
            }
        }
    }
}
