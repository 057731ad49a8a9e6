//! Schema pruning: keep the types reachable from the include rules, drop
//! the ones matched by exclude rules.
//!
//! ```text
//! includes = ["pkg.Order"]          Order ──> Money
//! excludes = ["pkg.Legacy"]         Order ──> Customer
//!                                   Legacy ──> Money
//! retained = {Order, Money, Customer}
//! ```
//!
//! Excluded types are never traversed. If a retained type references one, the
//! pruned schema would no longer be closed, so pruning fails with
//! [`Error::SchemaIntegrity`] instead of emitting a dangling reference.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::rules::{Identifier, RuleSet};
use crate::schema::{Reachable, Schema, TypeNode};
use crate::Error;

/// Records which rules of a [`RuleSet`] matched at least one type.
#[derive(Debug, Clone)]
pub struct UsageTracker {
    rules: RuleSet,
    used_roots: Vec<bool>,
    used_prunes: Vec<bool>,
}

impl UsageTracker {
    fn new(rules: RuleSet) -> Self {
        Self {
            used_roots: vec![false; rules.roots().len()],
            used_prunes: vec![false; rules.prunes().len()],
            rules,
        }
    }

    /// The rules this tracker accounts for.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Include rules that matched no type.
    pub fn unused_roots(&self) -> impl Iterator<Item = &Identifier> {
        unused(self.rules.roots(), &self.used_roots)
    }

    /// Exclude rules that matched no type.
    pub fn unused_prunes(&self) -> impl Iterator<Item = &Identifier> {
        unused(self.rules.prunes(), &self.used_prunes)
    }

    /// Mark every include rule matching `name`; returns whether any did.
    fn match_roots(&mut self, name: &str) -> bool {
        mark(self.rules.roots(), &mut self.used_roots, name)
    }

    /// Mark every exclude rule matching `name`; returns whether any did.
    fn match_prunes(&mut self, name: &str) -> bool {
        mark(self.rules.prunes(), &mut self.used_prunes, name)
    }
}

fn mark(identifiers: &[Identifier], used: &mut [bool], name: &str) -> bool {
    let mut matched = false;
    for (identifier, used) in identifiers.iter().zip(used.iter_mut()) {
        if identifier.matches(name) {
            *used = true;
            matched = true;
        }
    }
    matched
}

fn unused<'a>(
    identifiers: &'a [Identifier],
    used: &'a [bool],
) -> impl Iterator<Item = &'a Identifier> {
    identifiers
        .iter()
        .zip(used)
        .filter(|(_, used)| !**used)
        .map(|(identifier, _)| identifier)
}

/// Prune `schema` down to the types selected by `rules`.
///
/// With no include rules every top-level type is a root. A type matching both
/// an include and an exclude rule is excluded. Original file and type order is
/// preserved and files left without types are dropped. An empty rule set
/// returns the schema unchanged.
pub fn prune(schema: Schema, rules: RuleSet) -> Result<(Schema, UsageTracker), Error> {
    let mut usage = UsageTracker::new(rules);
    if usage.rules().is_empty() {
        return Ok((schema, usage));
    }

    let retained: HashSet<String> = {
        let select_top_level = usage.rules().roots().is_empty();
        let mut excluded = HashSet::new();
        let mut roots = Vec::new();

        for node in schema.types() {
            let is_pruned = usage.match_prunes(node.name());
            let is_root = if select_top_level {
                node.is_top_level()
            } else {
                usage.match_roots(node.name())
            };

            if is_pruned {
                debug!("Excluding {} {}", node.kind().label(), node.name());
                excluded.insert(node.name());
            } else if is_root {
                roots.push(node);
            }
        }

        let index: HashMap<&str, &TypeNode> = schema.types().map(|node| (node.name(), node)).collect();
        reachable(&index, &roots, &excluded)?
            .into_iter()
            .map(str::to_owned)
            .collect()
    };

    let pruned = schema.retain(|node| retained.contains(node.name()));
    Ok((pruned, usage))
}

/// Depth-first closure over references, starting from `roots` in order.
fn reachable<'a, N: Reachable>(
    index: &HashMap<&'a str, &'a N>,
    roots: &[&'a N],
    excluded: &HashSet<&str>,
) -> Result<HashSet<&'a str>, Error> {
    let mut retained = HashSet::new();
    let mut stack = Vec::new();

    for root in roots {
        if retained.insert(root.name()) {
            stack.push(*root);
        }
        while let Some(node) = stack.pop() {
            for reference in node.references() {
                if excluded.contains(reference.as_str()) {
                    return Err(Error::SchemaIntegrity {
                        referrer: node.name().to_string(),
                        referenced: reference.clone(),
                    });
                }
                if let Some(next) = index.get(reference.as_str()) {
                    if retained.insert(next.name()) {
                        stack.push(*next);
                    }
                }
            }
        }
    }

    Ok(retained)
}
