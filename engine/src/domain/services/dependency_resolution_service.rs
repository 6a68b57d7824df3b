//! Dependency Resolution Service
//!
//! Orders units so every unit comes after the dependencies it names, and
//! detects cycles in the `depends_on` relation.

use crate::domain::{DomainError, Unit};
use std::collections::{HashMap, HashSet, VecDeque};

pub struct DependencyResolutionService;

impl DependencyResolutionService {
    /// Start order over `units` (Kahn's algorithm)
    ///
    /// Only edges between members of `units` count; dependencies outside the
    /// subset are assumed to be handled by the caller. Ties are broken by the
    /// order of `units`, so the result is deterministic.
    pub fn start_order(units: &[&Unit]) -> Result<Vec<String>, DomainError> {
        let members: HashSet<&str> = units.iter().copied().map(Unit::id).collect();

        let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(units.len());
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::with_capacity(units.len());

        for &unit in units {
            let deps = unit
                .depends_on()
                .iter()
                .filter(|dep| members.contains(dep.as_str()));
            let mut count = 0;
            for dep in deps {
                count += 1;
                dependents.entry(dep.as_str()).or_default().push(unit.id());
            }
            in_degree.insert(unit.id(), count);
        }

        let mut queue: VecDeque<&str> = units
            .iter()
            .copied()
            .map(Unit::id)
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(units.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            if let Some(children) = dependents.get(id) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(*child);
                        }
                    }
                }
            }
        }

        if order.len() < units.len() {
            let residual = units
                .iter()
                .copied()
                .map(Unit::id)
                .filter(|id| in_degree.get(id).is_some_and(|d| *d > 0))
                .map(str::to_string)
                .collect();
            return Err(DomainError::DependencyCycle(residual));
        }

        Ok(order)
    }

    /// Stop order: the exact reverse of [`Self::start_order`]
    pub fn stop_order(units: &[&Unit]) -> Result<Vec<String>, DomainError> {
        let mut order = Self::start_order(units)?;
        order.reverse();
        Ok(order)
    }

    /// Depth-first cycle search with a recursion stack
    ///
    /// Returns the id of the unit whose traversal closed the first back-edge.
    /// Dependencies that name unknown units are ignored here.
    pub fn find_cycle(units: &[Unit]) -> Option<String> {
        let graph: HashMap<&str, &[String]> =
            units.iter().map(|u| (u.id(), u.depends_on())).collect();
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();

        for unit in units {
            if !visited.contains(unit.id())
                && Self::has_cycle(unit.id(), &graph, &mut visited, &mut stack)
            {
                return Some(unit.id().to_string());
            }
        }
        None
    }

    fn has_cycle<'a>(
        id: &'a str,
        graph: &HashMap<&'a str, &'a [String]>,
        visited: &mut HashSet<&'a str>,
        stack: &mut HashSet<&'a str>,
    ) -> bool {
        visited.insert(id);
        stack.insert(id);

        if let Some(&deps) = graph.get(id) {
            for dep in deps {
                let dep = dep.as_str();
                if !graph.contains_key(dep) {
                    continue;
                }
                if stack.contains(dep) {
                    return true;
                }
                if !visited.contains(dep) && Self::has_cycle(dep, graph, visited, stack) {
                    return true;
                }
            }
        }

        stack.remove(id);
        false
    }
}
