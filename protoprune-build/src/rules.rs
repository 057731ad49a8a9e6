//! Include/exclude rules for pruning.
//!
//! A rule is either a fully-qualified type name (`com.example.Pizza`,
//! `com.example.Pizza.Topping`) or a package wildcard (`com.example.*`).
//! Wildcards cover sub-packages and nested types but never a sibling package
//! that merely shares a string prefix: `com.example.*` does not match
//! `com.examples.Pizza`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::Error;

/// A single include or exclude rule.
///
/// Two rules are equal when they select the same types, so `.pkg.*` and
/// `pkg.*` are the same rule.
#[derive(Debug, Clone)]
pub struct Identifier {
    /// The rule as written by the user.
    raw: String,
    pattern: Pattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Pattern {
    Exact(String),
    /// Prefix including its trailing dot.
    Prefix(String),
}

impl Identifier {
    /// Parse a rule, rejecting member references and malformed wildcards.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let invalid = |reason| Error::InvalidIdentifier {
            identifier: raw.to_string(),
            reason,
        };

        if raw.chars().any(char::is_whitespace) {
            return Err(invalid("rules must not contain whitespace"));
        }
        if raw.contains('#') {
            return Err(invalid("member rules are not supported, use a type or package"));
        }

        let name = raw.strip_prefix('.').unwrap_or(raw);
        let (path, wildcard) = match name.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (name, false),
        };
        if path.is_empty() {
            return Err(invalid("rule is empty"));
        }
        if path.contains('*') {
            return Err(invalid("`*` is only allowed as a trailing `.*`"));
        }
        if path.split('.').any(str::is_empty) {
            return Err(invalid("rule has an empty name component"));
        }

        let pattern = if wildcard {
            Pattern::Prefix(format!("{}.", path))
        } else {
            Pattern::Exact(path.to_string())
        };
        Ok(Self {
            raw: raw.to_string(),
            pattern,
        })
    }

    /// The rule as originally written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.pattern, Pattern::Prefix(_))
    }

    /// Whether this rule selects the type with fully-qualified `name`.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.strip_prefix('.').unwrap_or(name);
        match &self.pattern {
            Pattern::Exact(exact) => name == exact,
            Pattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pattern.hash(state);
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Roots to keep and types to prune.
///
/// Built once through [`RuleSetBuilder`]; immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    roots: Vec<Identifier>,
    prunes: Vec<Identifier>,
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// Include rules, in declaration order.
    pub fn roots(&self) -> &[Identifier] {
        &self.roots
    }

    /// Exclude rules, in declaration order.
    pub fn prunes(&self) -> &[Identifier] {
        &self.prunes
    }

    /// True when there are neither includes nor excludes.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.prunes.is_empty()
    }
}

/// Collects raw rules and validates them in [`RuleSetBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct RuleSetBuilder {
    roots: Vec<String>,
    prunes: Vec<String>,
}

impl RuleSetBuilder {
    /// Keep `identifier` and everything it references.
    pub fn add_root(&mut self, identifier: impl Into<String>) -> &mut Self {
        self.roots.push(identifier.into());
        self
    }

    /// Remove `identifier`, even if it also matches a root.
    pub fn prune(&mut self, identifier: impl Into<String>) -> &mut Self {
        self.prunes.push(identifier.into());
        self
    }

    /// Validate every rule. Repeated rules are kept once.
    pub fn build(&self) -> Result<RuleSet, Error> {
        Ok(RuleSet {
            roots: parse_all(&self.roots)?,
            prunes: parse_all(&self.prunes)?,
        })
    }
}

fn parse_all(raw: &[String]) -> Result<Vec<Identifier>, Error> {
    let mut identifiers: Vec<Identifier> = Vec::with_capacity(raw.len());
    for rule in raw {
        let identifier = Identifier::parse(rule)?;
        if !identifiers.contains(&identifier) {
            identifiers.push(identifier);
        }
    }
    Ok(identifiers)
}
