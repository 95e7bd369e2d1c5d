//! Ordered storage for one category of X-lines.

use super::XLine;
use crate::matcher::{irc_eq, wildcard_match};
use std::sync::Arc;

/// Outcome of checking whether a new X-line may be added to a set.
#[derive(Debug, Clone)]
pub enum AddCheck {
    /// The rule may be added. `superseded` lists existing rules the new one
    /// covers; they should be removed first.
    Allowed { superseded: Vec<Arc<XLine>> },
    /// An identical rule (same mask, reason, and at least as long a lifetime)
    /// already exists.
    Exists(Arc<XLine>),
    /// A rule with the same mask exists but the new one changes its reason or
    /// extends its lifetime. Rules are immutable: remove the old, add the new.
    Replace(Arc<XLine>),
    /// An existing, broader rule already covers the new mask.
    Covered(Arc<XLine>),
}

/// Insertion-ordered collection of X-lines.
#[derive(Debug, Default)]
pub struct XLineSet {
    lines: Vec<Arc<XLine>>,
}

impl XLineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<XLine>> {
        self.lines.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<XLine>> + '_ {
        self.lines.iter()
    }

    /// Append a rule and return the shared handle.
    pub fn add(&mut self, line: XLine) -> Arc<XLine> {
        let line = Arc::new(line);
        self.lines.push(Arc::clone(&line));
        line
    }

    /// Find a rule by mask (case-insensitive).
    pub fn find_mask(&self, mask: &str) -> Option<&Arc<XLine>> {
        self.lines.iter().find(|x| irc_eq(x.mask(), mask))
    }

    /// Remove this exact rule. Returns `false` if it was not in the set.
    pub fn remove(&mut self, line: &Arc<XLine>) -> bool {
        let before = self.lines.len();
        self.lines.retain(|x| !Arc::ptr_eq(x, line));
        self.lines.len() != before
    }

    /// Remove the rule with this mask (case-insensitive).
    pub fn remove_mask(&mut self, mask: &str) -> Option<Arc<XLine>> {
        let index = self.lines.iter().position(|x| irc_eq(x.mask(), mask))?;
        Some(self.lines.remove(index))
    }

    /// Remove every rule, returning them in insertion order.
    pub fn clear(&mut self) -> Vec<Arc<XLine>> {
        std::mem::take(&mut self.lines)
    }

    /// Remove and return every rule whose active window has ended.
    pub fn take_expired(&mut self, now: i64) -> Vec<Arc<XLine>> {
        let (active, expired) = std::mem::take(&mut self.lines)
            .into_iter()
            .partition(|x| x.is_active_at(now));
        self.lines = active;
        expired
    }

    /// First active rule satisfying `pred`, in insertion order.
    pub fn find_active(&self, now: i64, mut pred: impl FnMut(&XLine) -> bool) -> Option<&Arc<XLine>> {
        self.lines
            .iter()
            .filter(|x| x.is_active_at(now))
            .find(|x| pred(x))
    }

    /// Decide whether `candidate` may be added without duplicating or
    /// shadowing an existing rule.
    pub fn can_add(&self, candidate: &XLine) -> AddCheck {
        let mut superseded = Vec::new();

        for existing in &self.lines {
            if irc_eq(existing.mask(), candidate.mask()) {
                let unchanged = existing.outlives(candidate.expires())
                    && existing.reason() == candidate.reason();
                return if unchanged {
                    AddCheck::Exists(Arc::clone(existing))
                } else {
                    AddCheck::Replace(Arc::clone(existing))
                };
            }

            // Regex masks only ever collide by equality.
            if existing.is_regex() || candidate.is_regex() {
                continue;
            }

            if wildcard_match(candidate.mask(), existing.mask())
                && existing.outlives(candidate.expires())
            {
                return AddCheck::Covered(Arc::clone(existing));
            }

            if wildcard_match(existing.mask(), candidate.mask())
                && candidate.outlives(existing.expires())
            {
                superseded.push(Arc::clone(existing));
            }
        }

        AddCheck::Allowed { superseded }
    }
}
