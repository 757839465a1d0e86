//! Input validation for partitioning problems.
//!
//! Checks structural integrity of a competitor batch before partitioning.
//! The partitioning algorithms assume these checks have passed. Detects:
//! - Empty and duplicate IDs
//! - Guardian references to unknown competitors or to oneself
//! - Circular guardian references
//! - Guardian chains (a guardian that itself has a guardian)
//! - Families larger than [`MAX_FAMILY_SIZE`]
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.3 (Depth-First Search)

use crate::models::Competitor;
use std::collections::{HashMap, HashSet};

/// Largest allowed family: a guardian plus at most two dependents.
pub const MAX_FAMILY_SIZE: usize = 3;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum ValidationErrorKind {
    /// A competitor has an empty ID.
    EmptyId,
    /// Two competitors share the same ID.
    DuplicateId,
    /// A guardian reference points to no competitor in the batch.
    UnknownGuardian,
    /// A competitor names itself as guardian.
    SelfGuardian,
    /// Guardian references form a cycle.
    CyclicGuardian,
    /// A guardian has a guardian of its own (more than one level).
    NestedGuardian,
    /// Guardian plus dependents exceed the family size limit.
    FamilyTooLarge,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates a competitor batch.
///
/// Checks:
/// 1. No empty IDs
/// 2. No duplicate IDs
/// 3. No self-references
/// 4. All guardian references point to existing competitors
/// 5. No circular guardian references
/// 6. No guardian chains
/// 7. No family larger than [`MAX_FAMILY_SIZE`]
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(competitors: &[Competitor]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut ids = HashSet::new();
    for c in competitors {
        if c.id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                "Competitor with empty ID",
            ));
        }
        if !ids.insert(c.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate competitor ID: {}", c.id),
            ));
        }
    }

    let guardian_of: HashMap<&str, &str> = competitors
        .iter()
        .filter_map(|c| c.guardian.as_deref().map(|g| (c.id.as_str(), g)))
        .collect();

    let mut dependent_count: HashMap<&str, usize> = HashMap::new();
    for c in competitors {
        let Some(guardian) = c.guardian.as_deref() else {
            continue;
        };
        if guardian == c.id {
            errors.push(ValidationError::new(
                ValidationErrorKind::SelfGuardian,
                format!("Competitor '{}' names itself as guardian", c.id),
            ));
            continue;
        }
        if !ids.contains(guardian) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownGuardian,
                format!("Competitor '{}' references unknown guardian '{}'", c.id, guardian),
            ));
            continue;
        }
        if let Some(grand) = guardian_of.get(guardian) {
            errors.push(ValidationError::new(
                ValidationErrorKind::NestedGuardian,
                format!(
                    "Guardian '{}' of '{}' has a guardian of its own ('{}')",
                    guardian, c.id, grand
                ),
            ));
        }
        *dependent_count.entry(guardian).or_insert(0) += 1;
    }

    for c in competitors {
        if let Some(&deps) = dependent_count.get(c.id.as_str()) {
            if deps + 1 > MAX_FAMILY_SIZE {
                errors.push(ValidationError::new(
                    ValidationErrorKind::FamilyTooLarge,
                    format!(
                        "Family of '{}' has {} members, limit is {}",
                        c.id,
                        deps + 1,
                        MAX_FAMILY_SIZE
                    ),
                ));
            }
        }
    }

    if let Some(cycle_err) = detect_cycles(competitors, &guardian_of) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the guardian graph.
///
/// # Algorithm
/// Iterative DFS with an explicit stack. Each node is `visited` once; nodes
/// on the current path are `in_progress`. Reaching an in-progress node is a
/// back edge, i.e. a cycle. Self-references are reported separately.
fn detect_cycles(
    competitors: &[Competitor],
    guardian_of: &HashMap<&str, &str>,
) -> Option<ValidationError> {
    let mut visited: HashSet<&str> = HashSet::new();

    for c in competitors {
        let start = c.id.as_str();
        if visited.contains(start) {
            continue;
        }

        let mut in_progress: HashSet<&str> = HashSet::new();
        let mut path: Vec<&str> = Vec::new();
        let mut node = Some(start);

        while let Some(current) = node {
            if in_progress.contains(current) {
                return Some(ValidationError::new(
                    ValidationErrorKind::CyclicGuardian,
                    format!("Circular guardian reference involving competitor '{current}'"),
                ));
            }
            if visited.contains(current) {
                break;
            }
            visited.insert(current);
            in_progress.insert(current);
            path.push(current);

            node = guardian_of
                .get(current)
                .copied()
                .filter(|&next| next != current);
        }

        for done in path {
            in_progress.remove(done);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgeCategory, EquipmentClass, Gender};

    fn c(id: &str) -> Competitor {
        Competitor::new(id, Gender::Male, AgeCategory::U21, EquipmentClass::Longbow)
    }

    fn has_kind(result: ValidationResult, kind: ValidationErrorKind) -> bool {
        result.unwrap_err().iter().any(|e| e.kind == kind)
    }

    #[test]
    fn test_valid_input() {
        let input = vec![
            c("001"),
            c("002"),
            c("003"),
            c("004").with_guardian("003"),
            c("005"),
            c("006").with_guardian("005"),
            c("007").with_guardian("005"),
        ];
        assert!(validate_input(&input).is_ok());
        assert!(validate_input(&[]).is_ok());
    }

    #[test]
    fn test_empty_id() {
        assert!(has_kind(validate_input(&[c(" ")]), ValidationErrorKind::EmptyId));
    }

    #[test]
    fn test_duplicate_id() {
        assert!(has_kind(
            validate_input(&[c("a"), c("a")]),
            ValidationErrorKind::DuplicateId
        ));
    }

    #[test]
    fn test_unknown_guardian() {
        assert!(has_kind(
            validate_input(&[c("a").with_guardian("ghost")]),
            ValidationErrorKind::UnknownGuardian
        ));
    }

    #[test]
    fn test_self_guardian() {
        assert!(has_kind(
            validate_input(&[c("a").with_guardian("a")]),
            ValidationErrorKind::SelfGuardian
        ));
    }

    #[test]
    fn test_cyclic_guardian() {
        // a → b → c → a
        let input = vec![
            c("a").with_guardian("c"),
            c("b").with_guardian("a"),
            c("c").with_guardian("b"),
        ];
        assert!(has_kind(validate_input(&input), ValidationErrorKind::CyclicGuardian));
    }

    #[test]
    fn test_two_cycle() {
        let input = vec![c("a").with_guardian("b"), c("b").with_guardian("a")];
        assert!(has_kind(validate_input(&input), ValidationErrorKind::CyclicGuardian));
    }

    #[test]
    fn test_chain_is_nested_not_cyclic() {
        let input = vec![c("a"), c("b").with_guardian("a"), c("c").with_guardian("b")];
        let errors = validate_input(&input).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::NestedGuardian));
        assert!(!errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CyclicGuardian));
    }

    #[test]
    fn test_long_chain_no_stack_overflow() {
        let mut input = vec![c("n0")];
        for i in 1..50_000 {
            input.push(c(&format!("n{i}")).with_guardian(format!("n{}", i - 1)));
        }
        let errors = validate_input(&input).unwrap_err();
        assert!(!errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CyclicGuardian));
    }

    #[test]
    fn test_family_too_large() {
        let input = vec![
            c("g"),
            c("d1").with_guardian("g"),
            c("d2").with_guardian("g"),
            c("d3").with_guardian("g"),
        ];
        assert!(has_kind(validate_input(&input), ValidationErrorKind::FamilyTooLarge));
    }

    #[test]
    fn test_multiple_errors() {
        let input = vec![c("a"), c("a"), c("b").with_guardian("zz")];
        let errors = validate_input(&input).unwrap_err();
        assert!(errors.len() >= 2);
        assert!(errors[0].to_string().contains("Duplicate"));
    }
}
