//! Archive member selection
//!
//! String form: alternatives separated by `|`, each one of
//! `exact:<name>`, `suffix:<text>`, `contains:<text>` or a bare name
//! (treated as exact). Example: `contains:recording_isrc|suffix:/isrc`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Selector string could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid member selector {input:?}: {reason}")]
pub struct SelectorParseError {
    pub input: String,
    pub reason: String,
}

type MemberPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Chooses one member of an archive by name
#[derive(Clone)]
pub enum MemberSelector {
    /// Whole member name equals the text
    Exact(String),
    /// Member name ends with the text
    Suffix(String),
    /// Member name contains the text
    Contains(String),
    /// First alternative that matches wins
    AnyOf(Vec<MemberSelector>),
    /// Arbitrary caller-supplied predicate
    Predicate {
        description: String,
        matcher: MemberPredicate,
    },
}

impl MemberSelector {
    pub fn exact(name: impl Into<String>) -> Self {
        MemberSelector::Exact(name.into())
    }

    /// Build a selector from a predicate over member names
    ///
    /// `description` is only used in logs and `MemberNotFound` errors.
    pub fn predicate<F>(description: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        MemberSelector::Predicate {
            description: description.into(),
            matcher: Arc::new(matcher),
        }
    }

    /// Combine with a fallback alternative
    pub fn or(self, other: MemberSelector) -> Self {
        match self {
            MemberSelector::AnyOf(mut alternatives) => {
                alternatives.push(other);
                MemberSelector::AnyOf(alternatives)
            }
            first => MemberSelector::AnyOf(vec![first, other]),
        }
    }

    pub fn matches(&self, member_name: &str) -> bool {
        match self {
            MemberSelector::Exact(name) => member_name == name,
            MemberSelector::Suffix(suffix) => member_name.ends_with(suffix.as_str()),
            MemberSelector::Contains(text) => member_name.contains(text.as_str()),
            MemberSelector::AnyOf(alternatives) => {
                alternatives.iter().any(|alt| alt.matches(member_name))
            }
            MemberSelector::Predicate { matcher, .. } => matcher(member_name),
        }
    }
}

impl fmt::Display for MemberSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberSelector::Exact(name) => write!(f, "exact:{}", name),
            MemberSelector::Suffix(suffix) => write!(f, "suffix:{}", suffix),
            MemberSelector::Contains(text) => write!(f, "contains:{}", text),
            MemberSelector::AnyOf(alternatives) => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{}", alt)?;
                }
                Ok(())
            }
            MemberSelector::Predicate { description, .. } => {
                write!(f, "predicate:{}", description)
            }
        }
    }
}

impl fmt::Debug for MemberSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberSelector({})", self)
    }
}

impl FromStr for MemberSelector {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = |reason: &str| SelectorParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut alternatives = Vec::new();
        for part in s.split('|') {
            let part = part.trim();
            let selector = if let Some(name) = part.strip_prefix("exact:") {
                MemberSelector::Exact(name.to_string())
            } else if let Some(suffix) = part.strip_prefix("suffix:") {
                MemberSelector::Suffix(suffix.to_string())
            } else if let Some(text) = part.strip_prefix("contains:") {
                MemberSelector::Contains(text.to_string())
            } else {
                MemberSelector::Exact(part.to_string())
            };

            match &selector {
                MemberSelector::Exact(text)
                | MemberSelector::Suffix(text)
                | MemberSelector::Contains(text)
                    if text.is_empty() =>
                {
                    return Err(error("empty alternative"));
                }
                _ => alternatives.push(selector),
            }
        }

        if alternatives.len() == 1 {
            Ok(alternatives.remove(0))
        } else {
            Ok(MemberSelector::AnyOf(alternatives))
        }
    }
}
