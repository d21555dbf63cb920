//! Compiled selector structure.
//!
//! A selector list is one or more alternative chains; a chain is a sequence
//! of compounds joined by relationship combinators (read right-to-left
//! during matching); a compound is a conjunction of simple tests. Compiling
//! attaches the canonical source text, the specificity score, and the
//! anchor-tag set used for indexing.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::selector::parse::{parse_selector, SelectorError};
use crate::selector::specificity::Specificity;
use crate::types::{CategoryTable, Phase};

// ============================================================================
// Parsed structure
// ============================================================================

/// A parsed selector.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Conjunction of simple tests, all evaluated at one position.
    Compound(Vec<Test>),
    /// Two selectors related by a combinator; `right` is the position being
    /// matched, `left` the ancestor/sibling constraint.
    Relation {
        combinator: Combinator,
        left: Box<Selector>,
        right: Box<Selector>,
    },
    /// Alternatives; matches if any alternative matches.
    List(Vec<Selector>),
}

/// A relationship operator between two selector positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: some ancestor at any depth satisfies the left operand.
    Descendant,
    /// `>`: the immediate parent satisfies the left operand.
    Child,
    /// `+`: the immediately preceding sibling satisfies the left operand.
    AdjacentSibling,
    /// `~`: some earlier sibling satisfies the left operand.
    GeneralSibling,
}

/// A simple test evaluated at a single tree position.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    /// Literal type-tag test.
    Tag(String),
    /// `*`, always true.
    Wildcard,
    /// Category pseudo-class expanding to a static tag set.
    Category(String),
    /// Attribute test on a dotted field path; `predicate` of `None` is a
    /// bare existence test.
    Attr {
        path: Vec<String>,
        predicate: Option<(AttrOp, AttrValue)>,
    },
    /// Field test: the node is the value (or an element of the sequence) at
    /// this path of its immediate parent.
    Field(Vec<String>),
    /// `:first-child`.
    FirstChild,
    /// `:last-child`.
    LastChild,
    /// `:nth-child(N)`, 1-based.
    NthChild(usize),
    /// `:not(list)`: none of the alternatives match at this position.
    Not(Vec<Selector>),
    /// `:matches(list)`: some alternative matches at this position.
    Matches(Vec<Selector>),
}

/// Comparison operators for attribute tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl AttrOp {
    /// Evaluate the operator over two numbers.
    pub fn evaluate(self, left: f64, right: f64) -> bool {
        match self {
            AttrOp::Eq => left == right,
            AttrOp::Ne => left != right,
            AttrOp::Lt => left < right,
            AttrOp::Le => left <= right,
            AttrOp::Gt => left > right,
            AttrOp::Ge => left >= right,
        }
    }
}

/// A literal value on the right-hand side of an attribute test.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

// ============================================================================
// Anchors
// ============================================================================

/// The set of type tags a selector could anchor on at its rightmost
/// position, used to bucket it in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorSet {
    /// A finite tag set; the selector can only match nodes with these tags.
    Tags(BTreeSet<String>),
    /// No finite set can be named (wildcard, attribute-only, `:not`, ...).
    Any,
}

impl AnchorSet {
    fn union(self, other: AnchorSet) -> AnchorSet {
        match (self, other) {
            (AnchorSet::Tags(mut left), AnchorSet::Tags(right)) => {
                left.extend(right);
                AnchorSet::Tags(left)
            }
            _ => AnchorSet::Any,
        }
    }
}

fn anchors_of(selector: &Selector, categories: &CategoryTable) -> AnchorSet {
    match selector {
        Selector::List(alternatives) => alternatives
            .iter()
            .map(|alt| anchors_of(alt, categories))
            .fold(AnchorSet::Tags(BTreeSet::new()), AnchorSet::union),
        Selector::Relation { right, .. } => anchors_of(right, categories),
        Selector::Compound(tests) => {
            for test in tests {
                if let Test::Tag(tag) = test {
                    return AnchorSet::Tags(BTreeSet::from([tag.clone()]));
                }
            }
            for test in tests {
                if let Test::Category(name) = test {
                    if let Some(tags) = categories.get(name) {
                        return AnchorSet::Tags(tags.clone());
                    }
                }
            }
            for test in tests {
                if let Test::Matches(alternatives) = test {
                    return alternatives
                        .iter()
                        .map(|alt| anchors_of(alt, categories))
                        .fold(AnchorSet::Tags(BTreeSet::new()), AnchorSet::union);
                }
            }
            AnchorSet::Any
        }
    }
}

// ============================================================================
// Category validation
// ============================================================================

fn first_unknown_category<'s>(selector: &'s Selector, categories: &CategoryTable) -> Option<&'s str> {
    match selector {
        Selector::List(alternatives) => alternatives
            .iter()
            .find_map(|alt| first_unknown_category(alt, categories)),
        Selector::Relation { left, right, .. } => first_unknown_category(left, categories)
            .or_else(|| first_unknown_category(right, categories)),
        Selector::Compound(tests) => tests.iter().find_map(|test| match test {
            Test::Category(name) if !categories.has(name) => Some(name.as_str()),
            Test::Not(alternatives) | Test::Matches(alternatives) => alternatives
                .iter()
                .find_map(|alt| first_unknown_category(alt, categories)),
            _ => None,
        }),
    }
}

// ============================================================================
// Compiled selector
// ============================================================================

/// Canonical event key plus effective phase for a registration.
///
/// A trailing `:exit` marker in the text forces the exit phase; an
/// exit-phase registration without the marker gets it appended so the event
/// key always reflects the phase.
pub(crate) fn canonical_key(text: &str, phase: Phase) -> (String, Phase) {
    let trimmed = text.trim();
    if trimmed.ends_with(":exit") {
        (trimmed.to_string(), Phase::Exit)
    } else {
        match phase {
            Phase::Enter => (trimmed.to_string(), Phase::Enter),
            Phase::Exit => (format!("{trimmed}:exit"), Phase::Exit),
        }
    }
}

/// An immutable compiled selector: canonical text, phase, parsed predicate
/// structure, specificity score, and anchor set.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    text: String,
    phase: Phase,
    selector: Selector,
    specificity: Specificity,
    anchors: AnchorSet,
}

impl CompiledSelector {
    /// Compile selector text for a phase against a category table.
    ///
    /// Fails with a syntax error (offset + expected token) or an unknown
    /// category error; a failed compilation leaves nothing behind.
    pub fn compile(
        text: &str,
        phase: Phase,
        categories: &CategoryTable,
    ) -> Result<Self, SelectorError> {
        let (canonical, phase) = canonical_key(text, phase);
        let body = canonical.strip_suffix(":exit").unwrap_or(&canonical);
        let selector = parse_selector(body).map_err(|err| err.with_selector(&canonical))?;
        if let Some(name) = first_unknown_category(&selector, categories) {
            let name = name.to_string();
            return Err(SelectorError::UnknownCategory {
                selector: canonical,
                name,
            });
        }
        let specificity = Specificity::of(&selector);
        let anchors = anchors_of(&selector, categories);
        Ok(Self {
            text: canonical,
            phase,
            selector,
            specificity,
            anchors,
        })
    }

    /// The canonical source text, used as the event key.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The phase bucket this selector belongs to.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The parsed predicate structure.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The specificity ordering key.
    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// The anchor-tag set for indexing.
    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    /// Total dispatch order: specificity ascending, then canonical text
    /// bytewise ascending. Independent of registration order.
    pub fn dispatch_cmp(&self, other: &Self) -> Ordering {
        self.specificity
            .cmp(&other.specificity)
            .then_with(|| self.text.cmp(&other.text))
    }
}
