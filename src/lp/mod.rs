//! LP-based partitioning formulation.
//!
//! Expresses family-to-slot assignment as a binary integer program and hands
//! it to an external [`LpSolver`]. The solver itself is a black box; this
//! module only builds the model and decodes a 0/1 assignment back into a
//! [`Partition`].
//!
//! # Model
//!
//! Slots `g = 0..max_groups`, families `f` with member count `size_f`.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `x[f][g]` | family `f` is placed in slot `g` |
//! | `y[g]` | slot `g` is in use |
//!
//! | Row | Bounds |
//! |-----|--------|
//! | `assign_f`: `Σ_g x[f][g]` | `= 1` |
//! | `capacity_g`: `Σ_f size_f·x[f][g] − max_size·y[g]` | `≤ 0` |
//! | `minimum_g`: `Σ_f size_f·x[f][g] − min_size·y[g]` | `≥ 0` |
//!
//! The objective (maximized) is an affinity proxy. Each slot gets an anchor
//! age category and equipment class, taken round-robin from the batch's
//! most frequent values. `x[f][g]` earns the age weight for every member
//! matching the slot's age anchor, and gains (grouping mode) or loses
//! (distribution mode) the equipment weight for every member matching the
//! equipment anchor.
//!
//! # Reference
//! - Wolsey (1998), "Integer Programming", Ch. 1: Formulations

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::PartitionError;
use crate::models::{AgeCategory, EquipmentClass, Family, Partition, PartitionConfig};

/// Tolerance for row feasibility checks.
const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// Values above this count as "assigned" when decoding.
const ASSIGNED_THRESHOLD: f64 = 0.5;

/// A binary decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name (`x_f_g` or `y_g`).
    pub name: String,
    /// Objective coefficient.
    pub objective: f64,
}

/// A linear constraint row with optional bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row name.
    pub name: String,
    /// Sparse `(variable index, coefficient)` terms.
    pub terms: Vec<(usize, f64)>,
    /// Lower bound (inclusive).
    pub lower: Option<f64>,
    /// Upper bound (inclusive).
    pub upper: Option<f64>,
}

impl Row {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terms: Vec::new(),
            lower: None,
            upper: None,
        }
    }

    fn with_term(mut self, variable: usize, coefficient: f64) -> Self {
        self.terms.push((variable, coefficient));
        self
    }

    fn with_bounds(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    /// Row activity for the given variable values. Missing values count as 0.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(v, a)| a * values.get(v).copied().unwrap_or(0.0))
            .sum()
    }

    /// Whether the row activity lies within its bounds.
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let activity = self.evaluate(values);
        self.lower
            .map_or(true, |lo| activity >= lo - FEASIBILITY_TOLERANCE)
            && self
                .upper
                .map_or(true, |hi| activity <= hi + FEASIBILITY_TOLERANCE)
    }
}

/// A binary assignment model, ready for an external solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpModel {
    /// All variables: `x` in family-major order, then `y`.
    pub variables: Vec<Variable>,
    /// Constraint rows.
    pub rows: Vec<Row>,
    family_sizes: Vec<usize>,
    slot_count: usize,
}

impl LpModel {
    /// Index of `x[family][slot]`.
    pub fn x_index(&self, family: usize, slot: usize) -> usize {
        family * self.slot_count + slot
    }

    /// Index of `y[slot]`.
    pub fn y_index(&self, slot: usize) -> usize {
        self.family_sizes.len() * self.slot_count + slot
    }

    /// Number of families in the model.
    pub fn family_count(&self) -> usize {
        self.family_sizes.len()
    }

    /// Number of group slots.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Member count of each family.
    pub fn family_sizes(&self) -> &[usize] {
        &self.family_sizes
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraint rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Objective value of an assignment.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.variables
            .iter()
            .zip(values)
            .map(|(var, &v)| var.objective * v)
            .sum()
    }

    /// Whether an assignment satisfies every row.
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        self.rows.iter().all(|r| r.is_satisfied(values))
    }

    /// Decodes a solver assignment into a partition.
    ///
    /// Every family must have exactly one slot with `x > 0.5`. Unused slots
    /// are dropped; the remaining groups keep slot order.
    pub fn decode(
        &self,
        solution: &LpSolution,
        families: &[Family],
    ) -> Result<Partition, PartitionError> {
        if !solution.is_solution_found() {
            return Err(PartitionError::invalid_solution(format!(
                "no assignment to decode (status: {})",
                solution.status
            )));
        }
        if families.len() != self.family_count() {
            return Err(PartitionError::invalid_solution(format!(
                "model has {} families, got {}",
                self.family_count(),
                families.len()
            )));
        }
        if solution.values.len() != self.variable_count() {
            return Err(PartitionError::invalid_solution(format!(
                "expected {} values, got {}",
                self.variable_count(),
                solution.values.len()
            )));
        }

        let mut slots: Vec<Vec<usize>> = vec![Vec::new(); self.slot_count];
        for f in 0..self.family_count() {
            let chosen: Vec<usize> = (0..self.slot_count)
                .filter(|&g| solution.values[self.x_index(f, g)] > ASSIGNED_THRESHOLD)
                .collect();
            match chosen.as_slice() {
                [g] => slots[*g].push(f),
                [] => {
                    return Err(PartitionError::invalid_solution(format!(
                        "family of '{}' is unassigned",
                        families[f].head().id
                    )))
                }
                _ => {
                    return Err(PartitionError::invalid_solution(format!(
                        "family of '{}' is assigned to {} slots",
                        families[f].head().id,
                        chosen.len()
                    )))
                }
            }
        }

        Ok(Partition::from_family_groups(&slots, families))
    }
}

/// Solver outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LpStatus {
    /// Proven optimal assignment.
    Optimal,
    /// Feasible assignment, optimality not proven.
    Feasible,
    /// No feasible assignment exists.
    Infeasible,
    /// The solver failed.
    Error(String),
}

impl fmt::Display for LpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Feasible => write!(f, "feasible"),
            Self::Infeasible => write!(f, "infeasible"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// Values returned by a solver, indexed like [`LpModel::variables`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpSolution {
    pub status: LpStatus,
    pub values: Vec<f64>,
}

impl LpSolution {
    /// An optimal assignment.
    pub fn optimal(values: Vec<f64>) -> Self {
        Self {
            status: LpStatus::Optimal,
            values,
        }
    }

    /// A feasible, possibly suboptimal assignment.
    pub fn feasible(values: Vec<f64>) -> Self {
        Self {
            status: LpStatus::Feasible,
            values,
        }
    }

    /// No feasible assignment.
    pub fn infeasible() -> Self {
        Self {
            status: LpStatus::Infeasible,
            values: Vec::new(),
        }
    }

    /// Solver failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: LpStatus::Error(message.into()),
            values: Vec::new(),
        }
    }

    /// Whether the solution carries a usable assignment.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, LpStatus::Optimal | LpStatus::Feasible)
    }
}

/// An external integer programming solver.
///
/// Implementations wrap whatever backend is available (native library,
/// subprocess, remote service). Calls are blocking; hosts that need async
/// or a timeout wrap the call themselves.
pub trait LpSolver {
    /// Solver name, for logs and errors.
    fn name(&self) -> &str;

    /// Solves the model, maximizing its objective.
    fn solve(&self, model: &LpModel) -> LpSolution;
}

/// Builds an [`LpModel`] from families.
///
/// # Example
/// ```
/// use u_partition::lp::LpModelBuilder;
/// use u_partition::models::{
///     group_families, AgeCategory, Competitor, EquipmentClass, Gender, PartitionConfig,
/// };
///
/// let batch = vec![
///     Competitor::new("a", Gender::Male, AgeCategory::Senior, EquipmentClass::Recurve),
///     Competitor::new("b", Gender::Male, AgeCategory::Senior, EquipmentClass::Recurve)
///         .with_guardian("a"),
///     Competitor::new("c", Gender::Female, AgeCategory::U18, EquipmentClass::Compound),
/// ];
/// let families = group_families(&batch);
/// let config = PartitionConfig::default().with_max_groups(2);
///
/// let model = LpModelBuilder::new(&families, &config).build();
/// assert_eq!(model.variable_count(), 2 * 2 + 2);
/// assert_eq!(model.row_count(), 2 + 2 * 2);
/// ```
pub struct LpModelBuilder<'a> {
    families: &'a [Family],
    config: &'a PartitionConfig,
}

impl<'a> LpModelBuilder<'a> {
    /// Creates a new builder.
    pub fn new(families: &'a [Family], config: &'a PartitionConfig) -> Self {
        Self { families, config }
    }

    /// Builds the model with `max_groups` slots.
    pub fn build(&self) -> LpModel {
        let slot_count = self.config.max_groups;
        let family_sizes: Vec<usize> = self.families.iter().map(Family::size).collect();
        let (age_anchors, equipment_anchors) = self.anchors(slot_count);

        let mut variables = Vec::with_capacity(family_sizes.len() * slot_count + slot_count);
        for (f, family) in self.families.iter().enumerate() {
            for g in 0..slot_count {
                variables.push(Variable {
                    name: format!("x_{f}_{g}"),
                    objective: self.affinity(family, age_anchors[g], equipment_anchors[g]),
                });
            }
        }
        for g in 0..slot_count {
            variables.push(Variable {
                name: format!("y_{g}"),
                objective: 0.0,
            });
        }

        let mut model = LpModel {
            variables,
            rows: Vec::new(),
            family_sizes,
            slot_count,
        };

        let mut rows = Vec::with_capacity(model.family_count() + 2 * slot_count);
        for f in 0..model.family_count() {
            let row = (0..slot_count).fold(Row::new(format!("assign_{f}")), |row, g| {
                row.with_term(model.x_index(f, g), 1.0)
            });
            rows.push(row.with_bounds(Some(1.0), Some(1.0)));
        }
        for g in 0..slot_count {
            let load = |name: String| {
                model
                    .family_sizes
                    .iter()
                    .enumerate()
                    .fold(Row::new(name), |row, (f, &size)| {
                        row.with_term(model.x_index(f, g), size as f64)
                    })
            };
            rows.push(
                load(format!("capacity_{g}"))
                    .with_term(model.y_index(g), -(self.config.max_size as f64))
                    .with_bounds(None, Some(0.0)),
            );
            rows.push(
                load(format!("minimum_{g}"))
                    .with_term(model.y_index(g), -(self.config.min_size as f64))
                    .with_bounds(Some(0.0), None),
            );
        }
        model.rows = rows;
        model
    }

    /// Builds the model, solves it and decodes the assignment.
    ///
    /// Returns [`PartitionError::SolverFailed`] when the solver reports no
    /// usable assignment.
    pub fn solve<S: LpSolver + ?Sized>(&self, solver: &S) -> Result<Partition, PartitionError> {
        let model = self.build();
        let solution = solver.solve(&model);
        if !solution.is_solution_found() {
            return Err(PartitionError::solver_failed(solver.name(), solution.status));
        }
        model.decode(&solution, self.families)
    }

    /// Per-slot anchors, round-robin over values ranked by frequency.
    fn anchors(&self, slot_count: usize) -> (Vec<AgeCategory>, Vec<EquipmentClass>) {
        let members = || self.families.iter().flat_map(|f| f.members());
        let ages = ranked(members().map(|m| m.age_category));
        let equipment = ranked(members().map(|m| m.equipment_class));
        (
            round_robin(&ages, slot_count, AgeCategory::Senior),
            round_robin(&equipment, slot_count, EquipmentClass::Recurve),
        )
    }

    fn affinity(&self, family: &Family, age: AgeCategory, equipment: EquipmentClass) -> f64 {
        let w = &self.config.weights;
        let sign = if self.config.group_by_equipment_class {
            1.0
        } else {
            -1.0
        };
        family
            .members()
            .iter()
            .map(|m| {
                let age_match = if m.age_category == age { w.age } else { 0.0 };
                let equipment_match = if m.equipment_class == equipment {
                    sign * w.equipment
                } else {
                    0.0
                };
                age_match + equipment_match
            })
            .sum()
    }
}

/// Cycles through `ranked` to fill `slots` entries; `fallback` when empty.
fn round_robin<T: Copy>(ranked: &[T], slots: usize, fallback: T) -> Vec<T> {
    if ranked.is_empty() {
        return vec![fallback; slots];
    }
    (0..slots).map(|g| ranked[g % ranked.len()]).collect()
}

/// Distinct values by descending frequency; ties keep the smaller value first.
fn ranked<T: Copy + Ord + Hash>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut ranked: Vec<(T, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().map(|(v, _)| v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{group_families, Competitor, Gender};

    /// Places each family in the first slot with room, ignoring the objective.
    struct FirstFitSolver;

    impl LpSolver for FirstFitSolver {
        fn name(&self) -> &str {
            "first-fit"
        }

        fn solve(&self, model: &LpModel) -> LpSolution {
            let max = first_capacity(model);
            let mut values = vec![0.0; model.variable_count()];
            let mut load = vec![0usize; model.slot_count()];
            for (f, &size) in model.family_sizes().iter().enumerate() {
                let Some(g) = (0..model.slot_count()).find(|&g| load[g] + size <= max) else {
                    return LpSolution::infeasible();
                };
                load[g] += size;
                values[model.x_index(f, g)] = 1.0;
                values[model.y_index(g)] = 1.0;
            }
            LpSolution::feasible(values)
        }
    }

    /// Reads `max_size` back out of the first capacity row.
    fn first_capacity(model: &LpModel) -> usize {
        let y = model.y_index(0);
        model
            .rows
            .iter()
            .find(|r| r.name == "capacity_0")
            .and_then(|r| r.terms.iter().find(|&&(v, _)| v == y))
            .map(|&(_, a)| (-a) as usize)
            .unwrap_or(0)
    }

    struct FailingSolver(LpStatus);

    impl LpSolver for FailingSolver {
        fn name(&self) -> &str {
            "failing"
        }

        fn solve(&self, _model: &LpModel) -> LpSolution {
            LpSolution {
                status: self.0.clone(),
                values: Vec::new(),
            }
        }
    }

    fn c(id: &str, age: AgeCategory, eq: EquipmentClass) -> Competitor {
        Competitor::new(id, Gender::Male, age, eq)
    }

    fn sample() -> Vec<Family> {
        let batch = vec![
            c("a", AgeCategory::Senior, EquipmentClass::Recurve),
            c("b", AgeCategory::Senior, EquipmentClass::Recurve).with_guardian("a"),
            c("c", AgeCategory::U18, EquipmentClass::Compound),
            c("d", AgeCategory::Senior, EquipmentClass::Compound),
            c("e", AgeCategory::U18, EquipmentClass::Recurve),
        ];
        group_families(&batch)
    }

    #[test]
    fn test_model_shape() {
        let families = sample();
        let config = PartitionConfig::default().with_max_groups(3);
        let model = LpModelBuilder::new(&families, &config).build();

        // 4 families × 3 slots + 3 indicators
        assert_eq!(model.variable_count(), 15);
        // 4 assignment rows + 3 capacity + 3 minimum
        assert_eq!(model.row_count(), 10);
        assert_eq!(model.x_index(1, 2), 5);
        assert_eq!(model.y_index(0), 12);
        assert_eq!(model.family_sizes(), &[2, 1, 1, 1]);
        assert_eq!(model.variables[model.y_index(2)].name, "y_2");
    }

    #[test]
    fn test_row_bounds() {
        let families = sample();
        let config = PartitionConfig::default().with_sizes(2, 3, 4).with_max_groups(2);
        let model = LpModelBuilder::new(&families, &config).build();

        let assign = &model.rows[0];
        assert_eq!(assign.lower, Some(1.0));
        assert_eq!(assign.upper, Some(1.0));
        assert_eq!(assign.terms.len(), 2);

        let capacity = model.rows.iter().find(|r| r.name == "capacity_1").unwrap();
        assert_eq!(capacity.upper, Some(0.0));
        assert!(capacity.terms.contains(&(model.x_index(0, 1), 2.0)));
        assert!(capacity.terms.contains(&(model.y_index(1), -4.0)));

        let minimum = model.rows.iter().find(|r| r.name == "minimum_1").unwrap();
        assert_eq!(minimum.lower, Some(0.0));
        assert!(minimum.terms.contains(&(model.y_index(1), -2.0)));
    }

    #[test]
    fn test_objective_anchors() {
        // Ages: Senior ×3, U18 ×2. Equipment: Recurve ×3, Compound ×2.
        let families = sample();
        let config = PartitionConfig::default().with_max_groups(2);
        let model = LpModelBuilder::new(&families, &config).build();

        // Slot 0 anchors Senior/Recurve, slot 1 anchors U18/Compound.
        let coef = |f, g| model.variables[model.x_index(f, g)].objective;
        assert!((coef(0, 0) - 4.0).abs() < 1e-10);
        assert!((coef(0, 1) - 0.0).abs() < 1e-10);
        assert!((coef(1, 1) - 2.0).abs() < 1e-10);
        assert!((coef(2, 0) - 1.0).abs() < 1e-10);
        assert!((model.variables[model.y_index(0)].objective - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_objective_penalizes_equipment_in_distribution_mode() {
        let families = sample();
        let config = PartitionConfig::default()
            .with_max_groups(2)
            .with_group_by_equipment_class(false);
        let model = LpModelBuilder::new(&families, &config).build();

        // Family "a" (2 × Senior/Recurve) in the Senior/Recurve slot: 2 − 2.
        let coef = model.variables[model.x_index(0, 0)].objective;
        assert!(coef.abs() < 1e-10);
    }

    #[test]
    fn test_first_fit_solution_satisfies_model() {
        let families = sample();
        let config = PartitionConfig::default().with_sizes(1, 2, 3).with_max_groups(2);
        let model = LpModelBuilder::new(&families, &config).build();
        let solution = FirstFitSolver.solve(&model);

        assert!(solution.is_solution_found());
        assert!(model.is_satisfied(&solution.values));
        assert!(model.objective_value(&solution.values) > 0.0);
    }

    #[test]
    fn test_violated_row_detected() {
        let families = sample();
        let config = PartitionConfig::default().with_sizes(1, 2, 3).with_max_groups(2);
        let model = LpModelBuilder::new(&families, &config).build();

        // Everything in slot 0: 5 members over a capacity of 3.
        let mut values = vec![0.0; model.variable_count()];
        for f in 0..model.family_count() {
            values[model.x_index(f, 0)] = 1.0;
        }
        values[model.y_index(0)] = 1.0;
        assert!(!model.is_satisfied(&values));
    }

    #[test]
    fn test_solve_and_decode() {
        let families = sample();
        let config = PartitionConfig::default().with_sizes(1, 2, 3).with_max_groups(2);
        let partition = LpModelBuilder::new(&families, &config)
            .solve(&FirstFitSolver)
            .unwrap();

        assert_eq!(partition.entity_count(), 5);
        assert_eq!(partition.sizes(), vec![3, 2]);
        assert!(partition.co_located(&["a", "b"]));
    }

    #[test]
    fn test_solver_failure_surfaces() {
        let families = sample();
        let config = PartitionConfig::default();
        let builder = LpModelBuilder::new(&families, &config);

        let err = builder
            .solve(&FailingSolver(LpStatus::Infeasible))
            .unwrap_err();
        assert!(matches!(
            err,
            PartitionError::SolverFailed { ref solver, status: LpStatus::Infeasible } if solver == "failing"
        ));

        let err = builder
            .solve(&FailingSolver(LpStatus::Error("license".into())))
            .unwrap_err();
        assert!(err.to_string().contains("license"));
    }

    #[test]
    fn test_decode_rejects_double_assignment() {
        let families = sample();
        let config = PartitionConfig::default().with_max_groups(2);
        let model = LpModelBuilder::new(&families, &config).build();

        let mut values = FirstFitSolver.solve(&model).values;
        values[model.x_index(2, 1)] = 1.0;
        let err = model
            .decode(&LpSolution::optimal(values), &families)
            .unwrap_err();
        assert!(err.to_string().contains("assigned to 2 slots"));
    }

    #[test]
    fn test_decode_rejects_unassigned_family() {
        let families = sample();
        let config = PartitionConfig::default().with_max_groups(2);
        let model = LpModelBuilder::new(&families, &config).build();

        let mut values = FirstFitSolver.solve(&model).values;
        values[model.x_index(2, 0)] = 0.0;
        let err = model
            .decode(&LpSolution::optimal(values), &families)
            .unwrap_err();
        assert!(err.to_string().contains("family of 'd' is unassigned"));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let families = sample();
        let config = PartitionConfig::default().with_max_groups(2);
        let model = LpModelBuilder::new(&families, &config).build();

        let err = model
            .decode(&LpSolution::optimal(vec![1.0; 3]), &families)
            .unwrap_err();
        assert!(matches!(err, PartitionError::InvalidSolution(_)));
    }

    #[test]
    fn test_decode_rejects_missing_assignment() {
        let families = sample();
        let config = PartitionConfig::default();
        let model = LpModelBuilder::new(&families, &config).build();
        assert!(model.decode(&LpSolution::infeasible(), &families).is_err());
    }

    #[test]
    fn test_empty_model() {
        let config = PartitionConfig::default().with_max_groups(2);
        let model = LpModelBuilder::new(&[], &config).build();
        assert_eq!(model.variable_count(), 2);
        assert_eq!(model.row_count(), 4);

        let partition = model
            .decode(&LpSolution::optimal(vec![0.0, 0.0]), &[])
            .unwrap();
        assert!(partition.is_empty());
    }

    #[test]
    fn test_ranked_by_frequency() {
        let ranked = ranked(
            [
                AgeCategory::U13,
                AgeCategory::Senior,
                AgeCategory::Senior,
                AgeCategory::Master,
            ]
            .into_iter(),
        );
        assert_eq!(
            ranked,
            vec![AgeCategory::Senior, AgeCategory::U13, AgeCategory::Master]
        );
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&LpStatus::Optimal).unwrap();
        assert_eq!(json, "\"optimal\"");
        let status: LpStatus = serde_json::from_str("\"infeasible\"").unwrap();
        assert_eq!(status, LpStatus::Infeasible);
    }
}
