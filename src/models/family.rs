//! Families: the atomic unit of assignment.
//!
//! A family is a guardian followed by every competitor that names it as
//! guardian. Families are never split across groups.
//!
//! Guardian relations are one level deep. A competitor is absorbed into its
//! guardian's family only when that guardian is present in the batch and has
//! no guardian of its own; anything else heads its own family. This keeps the
//! grouping total and loop-free even on input that skipped validation.

use serde::Serialize;
use std::collections::HashMap;

use super::Competitor;

/// An ordered, non-empty set of competitors that must share a group.
///
/// The head (guardian or lone competitor) is always first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Family {
    members: Vec<Competitor>,
}

impl Family {
    /// Family head.
    pub fn head(&self) -> &Competitor {
        &self.members[0]
    }

    /// All members, head first.
    pub fn members(&self) -> &[Competitor] {
        &self.members
    }

    /// Number of members.
    #[inline]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Whether the head has at least one dependent.
    pub fn has_dependents(&self) -> bool {
        self.members.len() > 1
    }

    /// Whether a competitor with this ID belongs to the family.
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id == id)
    }
}

/// Collapses guardian/dependent relations into families.
///
/// Families are emitted in order of their head's first appearance; a
/// dependent is skipped at its own position. Every competitor lands in
/// exactly one family.
///
/// # Complexity
/// O(n) with two passes over the input.
pub fn group_families(competitors: &[Competitor]) -> Vec<Family> {
    let by_id: HashMap<&str, &Competitor> =
        competitors.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut dependents: HashMap<&str, Vec<&Competitor>> = HashMap::new();
    for c in competitors {
        if let Some(guardian_id) = absorbed_by(c, &by_id) {
            dependents.entry(guardian_id).or_default().push(c);
        }
    }

    let mut families = Vec::new();
    for c in competitors {
        if absorbed_by(c, &by_id).is_some() {
            continue;
        }
        let mut members = vec![c.clone()];
        if let Some(deps) = dependents.remove(c.id.as_str()) {
            members.extend(deps.into_iter().cloned());
        }
        families.push(Family { members });
    }

    families
}

/// Guardian ID a competitor is absorbed into, or `None` if it heads a family.
fn absorbed_by<'a>(c: &'a Competitor, by_id: &HashMap<&str, &Competitor>) -> Option<&'a str> {
    let guardian_id = c.guardian.as_deref()?;
    if guardian_id == c.id {
        return None;
    }
    let guardian = by_id.get(guardian_id)?;
    if guardian.has_guardian() {
        return None;
    }
    Some(guardian_id)
}
