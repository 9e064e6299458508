//! Startup dependency graph.
//!
//! Edges point from a dependent unit to its prerequisite.
//! Ordering is Kahn's algorithm with ties broken by declaration order, so the same declaration always yields the same order.
//! Only the declaration is validated and ordered here; the orchestrator performs the actual health gating at runtime.

mod order;
pub use order::StartOrder;

use std::collections::{BTreeSet, HashMap, HashSet};

use berth_model::{DependencyCondition, Unit, UnitId, UnitState};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::error::ResolveError;

/// `from` may start once `to` satisfies `condition`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: UnitId,
    pub to: UnitId,
    pub condition: DependencyCondition,
}

impl Edge {
    pub fn new(from: impl Into<UnitId>, to: impl Into<UnitId>, condition: DependencyCondition) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition,
        }
    }
}

/// Validated adjacency over a unit set.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    ids: Vec<UnitId>,
    /// Prerequisites of each unit, by index, in declaration order.
    prereqs: Vec<Vec<(usize, DependencyCondition)>>,
}

/// Order a unit set in one call.
pub fn resolve(units: &[Unit]) -> Result<StartOrder, ResolveError> {
    DependencyGraph::from_units(units)?.resolve()
}

impl DependencyGraph {
    /// Build from declared units, rejecting duplicate ids, undeclared or repeated dependencies.
    pub fn from_units(units: &[Unit]) -> Result<Self, ResolveError> {
        let (graph, mut issues) = Self::scan_units(units);
        match issues.is_empty() {
            true => Ok(graph),
            false => Err(issues.swap_remove(0)),
        }
    }

    /// Build from a bare id set and an edge set.
    pub fn from_parts(ids: Vec<UnitId>, edges: &[Edge]) -> Result<Self, ResolveError> {
        let (graph, mut issues) = Self::scan(ids, edges);
        match issues.is_empty() {
            true => Ok(graph),
            false => Err(issues.swap_remove(0)),
        }
    }

    /// Every structural problem in `units`, followed by a cycle if the rest is sound.
    pub fn check(units: &[Unit]) -> Vec<ResolveError> {
        let (graph, mut issues) = Self::scan_units(units);
        if issues.is_empty()
            && let Err(e) = graph.resolve()
        {
            issues.push(e);
        }
        issues
    }

    fn scan_units(units: &[Unit]) -> (Self, Vec<ResolveError>) {
        let ids = units.iter().map(|u| u.id.clone()).collect();
        let edges: Vec<Edge> = units
            .iter()
            .flat_map(|u| {
                u.depends_on
                    .iter()
                    .map(|d| Edge::new(u.id.clone(), d.unit.clone(), d.condition))
            })
            .collect();
        Self::scan(ids, &edges)
    }

    /// Build the graph while collecting every issue instead of stopping at the first.
    /// Offending edges are left out of the graph.
    fn scan(ids: Vec<UnitId>, edges: &[Edge]) -> (Self, Vec<ResolveError>) {
        let mut issues = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(ids.len());

        for (i, id) in ids.iter().enumerate() {
            if index.contains_key(id.as_str()) {
                issues.push(ResolveError::DuplicateUnit(id.clone()));
            } else {
                index.insert(id.as_str(), i);
            }
        }

        let mut prereqs: Vec<Vec<(usize, DependencyCondition)>> = vec![Vec::new(); ids.len()];
        let mut seen: HashSet<(usize, usize)> = HashSet::new();

        for edge in edges {
            let Some(&from) = index.get(edge.from.as_str()) else {
                issues.push(ResolveError::UndeclaredDependent {
                    unit: edge.from.clone(),
                    dependency: edge.to.clone(),
                });
                continue;
            };
            let Some(&to) = index.get(edge.to.as_str()) else {
                issues.push(ResolveError::UndeclaredUnit {
                    unit: edge.to.clone(),
                    referenced_by: edge.from.clone(),
                });
                continue;
            };
            if !seen.insert((from, to)) {
                issues.push(ResolveError::DuplicateDependency {
                    unit: edge.from.clone(),
                    dependency: edge.to.clone(),
                });
                continue;
            }
            prereqs[from].push((to, edge.condition));
        }

        (Self { ids, prereqs }, issues)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All edges, grouped by dependent in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.prereqs.iter().enumerate().flat_map(move |(from, deps)| {
            deps.iter().map(move |&(to, condition)| Edge {
                from: self.ids[from].clone(),
                to: self.ids[to].clone(),
                condition,
            })
        })
    }

    /// Linear start order in which every unit follows all of its prerequisites.
    #[instrument(level = "debug", skip(self), fields(units = self.ids.len()))]
    pub fn resolve(&self) -> Result<StartOrder, ResolveError> {
        let order = self.kahn()?;
        debug!(order = ?order.iter().map(|&i| self.ids[i].as_str()).collect::<Vec<_>>(), "start order resolved");
        Ok(StartOrder::new(order.into_iter().map(|i| self.ids[i].clone()).collect()))
    }

    /// Units grouped into startup waves.
    ///
    /// Wave 0 holds units without prerequisites; every other unit sits one wave after its deepest prerequisite.
    /// Units of one wave do not depend on each other and may be started together.
    pub fn waves(&self) -> Result<Vec<Vec<UnitId>>, ResolveError> {
        let order = self.kahn()?;
        let mut level = vec![0usize; self.ids.len()];
        for &i in &order {
            level[i] = self.prereqs[i]
                .iter()
                .map(|&(p, _)| level[p] + 1)
                .max()
                .unwrap_or(0);
        }

        let depth = level.iter().copied().max().map_or(0, |m| m + 1);
        let mut waves: Vec<Vec<UnitId>> = vec![Vec::new(); depth];
        for (i, id) in self.ids.iter().enumerate() {
            waves[level[i]].push(id.clone());
        }
        Ok(waves)
    }

    /// Pending units whose prerequisites all satisfy their conditions in `states`.
    ///
    /// Units missing from `states` count as pending.
    pub fn ready_units(&self, states: &HashMap<UnitId, UnitState>) -> Vec<UnitId> {
        let state_of = |i: usize| states.get(&self.ids[i]).copied().unwrap_or_default();

        (0..self.ids.len())
            .filter(|&i| !state_of(i).has_started())
            .filter(|&i| {
                self.prereqs[i]
                    .iter()
                    .all(|&(p, condition)| condition.is_satisfied_by(state_of(p)))
            })
            .map(|i| self.ids[i].clone())
            .collect()
    }

    fn kahn(&self) -> Result<Vec<usize>, ResolveError> {
        let n = self.ids.len();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (from, deps) in self.prereqs.iter().enumerate() {
            indegree[from] = deps.len();
            for &(to, _) in deps {
                dependents[to].push(from);
            }
        }

        // Lowest declaration index first.
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(i) = ready.pop_first() {
            trace!(unit = %self.ids[i], "unit released");
            order.push(i);
            for &d in &dependents[i] {
                indegree[d] -= 1;
                if indegree[d] == 0 {
                    ready.insert(d);
                }
            }
        }

        if order.len() == n {
            return Ok(order);
        }
        Err(ResolveError::Cycle(self.find_cycle(&indegree)))
    }

    /// Walk prerequisite edges among unresolved units until a unit repeats.
    ///
    /// Every unresolved unit has at least one unresolved prerequisite, so the walk cannot dead-end.
    fn find_cycle(&self, indegree: &[usize]) -> Vec<UnitId> {
        let unresolved = |i: usize| indegree[i] > 0;
        let Some(start) = (0..self.ids.len()).find(|&i| unresolved(i)) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut pos: HashMap<usize, usize> = HashMap::new();
        let mut cur = start;

        loop {
            if let Some(&at) = pos.get(&cur) {
                return path[at..].iter().map(|&i| self.ids[i].clone()).collect();
            }
            pos.insert(cur, path.len());
            path.push(cur);

            match self.prereqs[cur].iter().find(|&&(p, _)| unresolved(p)) {
                Some(&(next, _)) => cur = next,
                None => return path.iter().map(|&i| self.ids[i].clone()).collect(),
            }
        }
    }
}
