//! Competitor (entity) model.
//!
//! A competitor is the unit being partitioned. Its three categorical
//! attributes drive the quality score; the optional guardian reference
//! ties it to another competitor's family.

use serde::{Deserialize, Serialize};

/// Competitor gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Age category of a competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeCategory {
    U13,
    U15,
    U18,
    U21,
    Senior,
    Master,
}

/// Equipment class a competitor shoots with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentClass {
    Recurve,
    Compound,
    Barebow,
    Longbow,
    Instinctive,
}

/// A competitor to be placed into a group.
///
/// Immutable once built. `guardian` names another competitor in the same
/// batch; the two always end up in the same group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    /// Unique competitor identifier.
    pub id: String,
    /// Gender.
    pub gender: Gender,
    /// Age category.
    pub age_category: AgeCategory,
    /// Equipment class.
    pub equipment_class: EquipmentClass,
    /// Identifier of the guardian competitor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian: Option<String>,
}

impl Competitor {
    /// Creates a competitor without a guardian.
    pub fn new(
        id: impl Into<String>,
        gender: Gender,
        age_category: AgeCategory,
        equipment_class: EquipmentClass,
    ) -> Self {
        Self {
            id: id.into(),
            gender,
            age_category,
            equipment_class,
            guardian: None,
        }
    }

    /// Sets the guardian reference.
    pub fn with_guardian(mut self, guardian_id: impl Into<String>) -> Self {
        self.guardian = Some(guardian_id.into());
        self
    }

    /// Whether this competitor references a guardian.
    #[inline]
    pub fn has_guardian(&self) -> bool {
        self.guardian.is_some()
    }
}
