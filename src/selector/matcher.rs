//! Selector evaluation against a tree position.
//!
//! A position is a [`Cursor`]: the current node plus the ancestor chain from
//! the root (exclusive of the node itself). Relationship combinators move
//! the cursor left through the chain; descendant and general-sibling
//! operators try every candidate position, so any one satisfying the rest of
//! the chain counts as a match.

use serde_json::Value;

use crate::node::{resolve_path, tag_of, Resolved};
use crate::selector::ast::{AttrOp, AttrValue, Combinator, Selector, Test};
use crate::traverse::{flat_children, ChildKeyMap};
use crate::types::CategoryTable;

/// Matching context shared across one dispatch: field naming, child keys,
/// and the category table. No per-node state lives here.
pub(crate) struct MatchContext<'c> {
    pub type_field: &'c str,
    pub child_keys: &'c ChildKeyMap,
    pub categories: &'c CategoryTable,
}

/// A tree position: the node under test plus its ancestor chain
/// (root first, immediate parent last).
#[derive(Clone, Copy)]
pub(crate) struct Cursor<'t, 'a> {
    pub node: &'t Value,
    pub ancestry: &'a [&'t Value],
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn parent(self) -> Option<Cursor<'t, 'a>> {
        let (node, rest) = self.ancestry.split_last()?;
        Some(Cursor {
            node: *node,
            ancestry: rest,
        })
    }

    fn ancestors(self) -> impl Iterator<Item = Cursor<'t, 'a>> {
        (0..self.ancestry.len()).rev().map(move |depth| Cursor {
            node: self.ancestry[depth],
            ancestry: &self.ancestry[..depth],
        })
    }

    /// Index and sibling count in the parent's flattened child list.
    fn position(self, ctx: &MatchContext<'_>) -> Option<(usize, usize)> {
        let siblings = self.siblings(ctx)?;
        let index = siblings
            .iter()
            .position(|sibling| std::ptr::eq(*sibling, self.node))?;
        Some((index, siblings.len()))
    }

    fn siblings(self, ctx: &MatchContext<'_>) -> Option<Vec<&'t Value>> {
        let parent = self.ancestry.last().copied()?;
        Some(flat_children(parent, ctx.type_field, ctx.child_keys))
    }

    fn previous_sibling(self, ctx: &MatchContext<'_>) -> Option<Cursor<'t, 'a>> {
        let siblings = self.siblings(ctx)?;
        let index = siblings
            .iter()
            .position(|sibling| std::ptr::eq(*sibling, self.node))?;
        if index == 0 {
            return None;
        }
        Some(Cursor {
            node: siblings[index - 1],
            ancestry: self.ancestry,
        })
    }

    fn earlier_siblings(self, ctx: &MatchContext<'_>) -> Vec<Cursor<'t, 'a>> {
        let Some(siblings) = self.siblings(ctx) else {
            return Vec::new();
        };
        let Some(index) = siblings
            .iter()
            .position(|sibling| std::ptr::eq(*sibling, self.node))
        else {
            return Vec::new();
        };
        siblings[..index]
            .iter()
            .copied()
            .map(|sibling| Cursor {
                node: sibling,
                ancestry: self.ancestry,
            })
            .collect()
    }
}

/// Evaluate a selector at a cursor position.
pub(crate) fn matches(selector: &Selector, cursor: Cursor<'_, '_>, ctx: &MatchContext<'_>) -> bool {
    match selector {
        Selector::List(alternatives) => alternatives.iter().any(|alt| matches(alt, cursor, ctx)),
        Selector::Compound(tests) => tests.iter().all(|test| test_matches(test, cursor, ctx)),
        Selector::Relation {
            combinator,
            left,
            right,
        } => {
            if !matches(right, cursor, ctx) {
                return false;
            }
            match combinator {
                Combinator::Child => cursor.parent().is_some_and(|p| matches(left, p, ctx)),
                Combinator::Descendant => cursor.ancestors().any(|a| matches(left, a, ctx)),
                Combinator::AdjacentSibling => cursor
                    .previous_sibling(ctx)
                    .is_some_and(|s| matches(left, s, ctx)),
                Combinator::GeneralSibling => cursor
                    .earlier_siblings(ctx)
                    .into_iter()
                    .any(|s| matches(left, s, ctx)),
            }
        }
    }
}

fn test_matches(test: &Test, cursor: Cursor<'_, '_>, ctx: &MatchContext<'_>) -> bool {
    match test {
        Test::Wildcard => true,
        Test::Tag(tag) => tag_of(cursor.node, ctx.type_field) == Some(tag.as_str()),
        Test::Category(name) => {
            let Some(tags) = ctx.categories.get(name) else {
                return false;
            };
            tag_of(cursor.node, ctx.type_field).is_some_and(|tag| tags.contains(tag))
        }
        Test::Attr { path, predicate } => match resolve_path(cursor.node, path) {
            None => false,
            Some(resolved) => match predicate {
                None => true,
                Some((op, literal)) => compare(&resolved, *op, literal),
            },
        },
        Test::Field(path) => {
            let Some(parent) = cursor.ancestry.last().copied() else {
                return false;
            };
            match resolve_path(parent, path) {
                Some(Resolved::Value(value)) => {
                    std::ptr::eq(value, cursor.node)
                        || value.as_array().is_some_and(|items| {
                            items.iter().any(|item| std::ptr::eq(item, cursor.node))
                        })
                }
                _ => false,
            }
        }
        Test::FirstChild => cursor.position(ctx).is_some_and(|(index, _)| index == 0),
        Test::LastChild => cursor
            .position(ctx)
            .is_some_and(|(index, len)| index + 1 == len),
        Test::NthChild(position) => cursor
            .position(ctx)
            .is_some_and(|(index, _)| index + 1 == *position),
        Test::Not(alternatives) => !alternatives.iter().any(|alt| matches(alt, cursor, ctx)),
        Test::Matches(alternatives) => alternatives.iter().any(|alt| matches(alt, cursor, ctx)),
    }
}

/// Compare a resolved attribute against a literal.
///
/// Comparisons are typed: relational operators require both sides numeric,
/// equality never crosses types, and `!=` matches any *present* value that
/// does not equal the literal. Absence is handled before this point.
fn compare(resolved: &Resolved<'_>, op: AttrOp, literal: &AttrValue) -> bool {
    if let (Some(actual), AttrValue::Num(expected)) = (numeric(resolved), literal) {
        return op.evaluate(actual, *expected);
    }
    match op {
        AttrOp::Eq => value_eq(resolved, literal),
        AttrOp::Ne => !value_eq(resolved, literal),
        _ => false,
    }
}

fn numeric(resolved: &Resolved<'_>) -> Option<f64> {
    match resolved {
        Resolved::Value(Value::Number(number)) => number.as_f64(),
        Resolved::Length(len) => Some(*len as f64),
        _ => None,
    }
}

fn value_eq(resolved: &Resolved<'_>, literal: &AttrValue) -> bool {
    match (resolved, literal) {
        (Resolved::Value(Value::String(actual)), AttrValue::Str(expected)) => actual == expected,
        (Resolved::Value(Value::Bool(actual)), AttrValue::Bool(expected)) => actual == expected,
        (Resolved::Value(Value::Null), AttrValue::Null) => true,
        (_, AttrValue::Num(expected)) => numeric(resolved) == Some(*expected),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::parse::parse_selector;
    use serde_json::json;

    fn ctx<'c>(child_keys: &'c ChildKeyMap, categories: &'c CategoryTable) -> MatchContext<'c> {
        MatchContext {
            type_field: "type",
            child_keys,
            categories,
        }
    }

    fn matches_at_root(selector: &str, node: &Value) -> bool {
        let keys = ChildKeyMap::default();
        let categories = CategoryTable::new();
        let selector = parse_selector(selector).unwrap();
        matches(
            &selector,
            Cursor {
                node,
                ancestry: &[],
            },
            &ctx(&keys, &categories),
        )
    }

    #[test]
    fn tag_and_wildcard_tests() {
        let node = json!({ "type": "Identifier", "name": "foo" });
        assert!(matches_at_root("Identifier", &node));
        assert!(matches_at_root("*", &node));
        assert!(!matches_at_root("Literal", &node));
    }

    #[test]
    fn attribute_tests_on_dotted_paths() {
        let node = json!({
            "type": "CallExpression",
            "callee": { "type": "Identifier", "name": "foo" },
            "arguments": [],
        });
        assert!(matches_at_root("[callee.name='foo']", &node));
        assert!(!matches_at_root("[callee.name='bar']", &node));
        assert!(matches_at_root("[callee.name]", &node));
        assert!(matches_at_root("[arguments.length=0]", &node));
    }

    #[test]
    fn comparisons_against_absent_are_false() {
        let node = json!({ "type": "Identifier" });
        assert!(!matches_at_root("[name='foo']", &node));
        assert!(!matches_at_root("[name!='foo']", &node));
        assert!(!matches_at_root("[name.length>0]", &node));
        assert!(!matches_at_root("[name]", &node));
        // Negated existence is the one test absence satisfies.
        assert!(matches_at_root(":not([name])", &node));
    }

    #[test]
    fn relational_operators_are_numeric_only() {
        let node = json!({ "type": "Literal", "value": 5, "raw": "5" });
        assert!(matches_at_root("[value>4]", &node));
        assert!(matches_at_root("[value<=5]", &node));
        assert!(!matches_at_root("[raw>4]", &node));
        assert!(matches_at_root("[value!=6]", &node));
        assert!(!matches_at_root("[value='5']", &node));
    }

    #[test]
    fn keyword_literals() {
        let node = json!({ "type": "MemberExpression", "computed": true, "object": null });
        assert!(matches_at_root("[computed=true]", &node));
        assert!(!matches_at_root("[computed=false]", &node));
        assert!(matches_at_root("[object=null]", &node));
        assert!(matches_at_root("[computed!=null]", &node));
    }

    #[test]
    fn vacuous_selector_never_matches() {
        let node = json!({ "type": "Identifier" });
        assert!(!matches_at_root(":not(*)", &node));
    }

    #[test]
    fn child_and_descendant_combinators() {
        let keys = ChildKeyMap::default();
        let categories = CategoryTable::new();
        let ctx = ctx(&keys, &categories);

        let root = json!({
            "type": "Program",
            "body": [{
                "type": "ExpressionStatement",
                "expression": { "type": "Identifier", "name": "foo" },
            }],
        });
        let statement = &root["body"][0];
        let identifier = &statement["expression"];
        let ancestry = [&root, statement];
        let cursor = Cursor {
            node: identifier,
            ancestry: &ancestry,
        };

        let child = parse_selector("ExpressionStatement > Identifier").unwrap();
        assert!(matches(&child, cursor, &ctx));

        let too_far = parse_selector("Program > Identifier").unwrap();
        assert!(!matches(&too_far, cursor, &ctx));

        let descendant = parse_selector("Program Identifier").unwrap();
        assert!(matches(&descendant, cursor, &ctx));

        let nested = parse_selector("Program ExpressionStatement Identifier").unwrap();
        assert!(matches(&nested, cursor, &ctx));
    }

    #[test]
    fn descendant_backtracks_across_ancestors() {
        let keys = ChildKeyMap::default();
        let categories = CategoryTable::new();
        let ctx = ctx(&keys, &categories);

        // Two Block ancestors; only the outer one carries the flag, so the
        // match must try more than the nearest candidate.
        let root = json!({
            "type": "Block",
            "flagged": true,
            "body": [{
                "type": "Block",
                "body": [{ "type": "Identifier", "name": "x" }],
            }],
        });
        let inner = &root["body"][0];
        let identifier = &inner["body"][0];
        let ancestry = [&root, inner];
        let cursor = Cursor {
            node: identifier,
            ancestry: &ancestry,
        };

        let selector = parse_selector("Block[flagged=true] Identifier").unwrap();
        assert!(matches(&selector, cursor, &ctx));

        let child_only = parse_selector("Block[flagged=true] > Identifier").unwrap();
        assert!(!matches(&child_only, cursor, &ctx));
    }

    #[test]
    fn sibling_combinators_use_the_flattened_child_list() {
        let keys = ChildKeyMap::default();
        let categories = CategoryTable::new();
        let ctx = ctx(&keys, &categories);

        let root = json!({
            "type": "ArrayExpression",
            "elements": [
                { "type": "Identifier", "name": "foo" },
                { "type": "ObjectExpression", "properties": [] },
                { "type": "Literal", "value": 5 },
            ],
        });
        let literal = &root["elements"][2];
        let ancestry = [&root];
        let cursor = Cursor {
            node: literal,
            ancestry: &ancestry,
        };

        let adjacent = parse_selector("Identifier + Literal").unwrap();
        assert!(!matches(&adjacent, cursor, &ctx));

        let general = parse_selector("Identifier ~ Literal").unwrap();
        assert!(matches(&general, cursor, &ctx));
    }

    #[test]
    fn position_tests() {
        let keys = ChildKeyMap::default();
        let categories = CategoryTable::new();
        let ctx = ctx(&keys, &categories);

        let root = json!({
            "type": "ArrayExpression",
            "elements": [
                { "type": "Identifier", "name": "a" },
                { "type": "Identifier", "name": "b" },
                { "type": "Identifier", "name": "c" },
            ],
        });
        let ancestry = [&root];
        let at = |index: usize| Cursor {
            node: &root["elements"][index],
            ancestry: &ancestry,
        };

        let first = parse_selector(":first-child").unwrap();
        assert!(matches(&first, at(0), &ctx));
        assert!(!matches(&first, at(1), &ctx));

        let last = parse_selector(":last-child").unwrap();
        assert!(matches(&last, at(2), &ctx));
        assert!(!matches(&last, at(0), &ctx));

        let second = parse_selector(":nth-child(2)").unwrap();
        assert!(matches(&second, at(1), &ctx));
        assert!(!matches(&second, at(2), &ctx));

        // The root has no parent, so no position test can hold there.
        let root_cursor = Cursor {
            node: &root,
            ancestry: &[],
        };
        assert!(!matches(&first, root_cursor, &ctx));
    }

    #[test]
    fn field_tests_check_the_parent_slot() {
        let keys = ChildKeyMap::default();
        let categories = CategoryTable::new();
        let ctx = ctx(&keys, &categories);

        let property = json!({
            "type": "Property",
            "key": { "type": "Identifier", "name": "a" },
            "value": { "type": "Literal", "value": 1 },
        });
        let key = &property["key"];
        let value = &property["value"];
        let ancestry = [&property];

        let selector = parse_selector(".key").unwrap();
        assert!(matches(
            &selector,
            Cursor {
                node: key,
                ancestry: &ancestry
            },
            &ctx
        ));
        assert!(!matches(
            &selector,
            Cursor {
                node: value,
                ancestry: &ancestry
            },
            &ctx
        ));
    }

    #[test]
    fn field_tests_accept_sequence_membership() {
        let keys = ChildKeyMap::default();
        let categories = CategoryTable::new();
        let ctx = ctx(&keys, &categories);

        let call = json!({
            "type": "CallExpression",
            "callee": { "type": "Identifier", "name": "f" },
            "arguments": [{ "type": "Identifier", "name": "x" }],
        });
        let argument = &call["arguments"][0];
        let ancestry = [&call];

        let selector = parse_selector(".arguments").unwrap();
        assert!(matches(
            &selector,
            Cursor {
                node: argument,
                ancestry: &ancestry
            },
            &ctx
        ));
    }

    #[test]
    fn categories_expand_to_tag_sets() {
        let keys = ChildKeyMap::default();
        let categories = CategoryTable::new().with("expression", ["Identifier", "Literal"]);
        let ctx = ctx(&keys, &categories);

        let identifier = json!({ "type": "Identifier", "name": "x" });
        let statement = json!({ "type": "ExpressionStatement" });
        let selector = parse_selector(":expression").unwrap();

        assert!(matches(
            &selector,
            Cursor {
                node: &identifier,
                ancestry: &[]
            },
            &ctx
        ));
        assert!(!matches(
            &selector,
            Cursor {
                node: &statement,
                ancestry: &[]
            },
            &ctx
        ));
    }

    #[test]
    fn grouping_pseudo_classes() {
        let node = json!({ "type": "Identifier", "name": "foo" });
        assert!(matches_at_root(
            ":matches(Identifier[name='foo'], Literal)",
            &node
        ));
        assert!(!matches_at_root(":matches(Literal, ReturnStatement)", &node));
        assert!(matches_at_root(":not(Program, ExpressionStatement)", &node));
        assert!(!matches_at_root(":not(Program, Identifier)", &node));
    }
}
