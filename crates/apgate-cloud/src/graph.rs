//! Dependency graph of cascade fields
//!
//! Each provider declares which selectable fields it uses and which
//! upstream fields each one depends on. The graph is validated once and
//! stored in topological order so walks over descendants never revisit a
//! field before its parents.

use crate::error::{CloudError, Result};
use crate::model::FieldId;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A field and its direct upstream dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: FieldId,
    pub depends_on: Vec<FieldId>,
}

impl FieldSpec {
    pub fn root(id: FieldId) -> Self {
        Self {
            id,
            depends_on: Vec::new(),
        }
    }

    pub fn new(id: FieldId, depends_on: impl IntoIterator<Item = FieldId>) -> Self {
        Self {
            id,
            depends_on: depends_on.into_iter().collect(),
        }
    }
}

/// Validated, topologically ordered field graph
#[derive(Debug, Clone)]
pub struct CascadeGraph {
    fields: Vec<FieldSpec>,
    position: HashMap<FieldId, usize>,
}

impl CascadeGraph {
    /// Build a graph, rejecting duplicate fields, unknown dependencies and cycles.
    ///
    /// Declaration order is kept wherever the dependency order allows it.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        let mut declared = HashSet::new();
        for spec in &fields {
            if !declared.insert(spec.id) {
                return Err(CloudError::Validation(format!(
                    "field '{}' declared twice",
                    spec.id
                )));
            }
        }
        for spec in &fields {
            for dep in &spec.depends_on {
                if !declared.contains(dep) {
                    return Err(CloudError::Validation(format!(
                        "field '{}' depends on undeclared field '{}'",
                        spec.id, dep
                    )));
                }
                if *dep == spec.id {
                    return Err(CloudError::Validation(format!(
                        "field '{}' depends on itself",
                        spec.id
                    )));
                }
            }
        }

        // Kahn's algorithm, picking the earliest declared ready field each round
        let mut remaining: Vec<FieldSpec> = fields;
        let mut ordered: Vec<FieldSpec> = Vec::with_capacity(remaining.len());
        let mut placed: HashSet<FieldId> = HashSet::new();
        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .position(|spec| spec.depends_on.iter().all(|d| placed.contains(d)))
                .ok_or_else(|| {
                    let stuck: Vec<String> =
                        remaining.iter().map(|s| s.id.to_string()).collect();
                    CloudError::Validation(format!(
                        "dependency cycle among fields: {}",
                        stuck.join(", ")
                    ))
                })?;
            let spec = remaining.remove(next);
            placed.insert(spec.id);
            ordered.push(spec);
        }

        let position = ordered
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.id, i))
            .collect();

        Ok(Self {
            fields: ordered,
            position,
        })
    }

    /// Fields in topological order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn spec(&self, id: FieldId) -> Option<&FieldSpec> {
        self.position.get(&id).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.position.contains_key(&id)
    }

    /// Fields without upstream dependencies
    pub fn roots(&self) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|spec| spec.depends_on.is_empty())
            .map(|spec| spec.id)
            .collect()
    }

    /// Fields that list `id` as a direct dependency
    pub fn dependents(&self, id: FieldId) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|spec| spec.depends_on.contains(&id))
            .map(|spec| spec.id)
            .collect()
    }

    /// All fields reachable downstream of `id`, in topological order
    pub fn descendants(&self, id: FieldId) -> Vec<FieldId> {
        let mut reached: BTreeSet<usize> = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for dependent in self.dependents(current) {
                if let Some(&pos) = self.position.get(&dependent) {
                    if reached.insert(pos) {
                        stack.push(dependent);
                    }
                }
            }
        }
        reached.into_iter().map(|i| self.fields[i].id).collect()
    }

    /// All fields upstream of `id`, in topological order
    pub fn ancestors(&self, id: FieldId) -> Vec<FieldId> {
        let mut reached: BTreeSet<usize> = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(spec) = self.spec(current) {
                for dep in &spec.depends_on {
                    if let Some(&pos) = self.position.get(dep) {
                        if reached.insert(pos) {
                            stack.push(*dep);
                        }
                    }
                }
            }
        }
        reached.into_iter().map(|i| self.fields[i].id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws_like() -> CascadeGraph {
        CascadeGraph::new(vec![
            FieldSpec::new(FieldId::Subnet, [FieldId::Vpc]),
            FieldSpec::root(FieldId::Region),
            FieldSpec::new(FieldId::Vpc, [FieldId::Region]),
            FieldSpec::new(FieldId::Certificate, [FieldId::Region]),
            FieldSpec::new(FieldId::SecurityGroup, [FieldId::Vpc]),
        ])
        .unwrap()
    }

    #[test]
    fn test_topological_order() {
        let graph = aws_like();
        let order: Vec<FieldId> = graph.fields().iter().map(|s| s.id).collect();
        let pos = |f: FieldId| order.iter().position(|x| *x == f).unwrap();

        assert!(pos(FieldId::Region) < pos(FieldId::Vpc));
        assert!(pos(FieldId::Vpc) < pos(FieldId::Subnet));
        assert!(pos(FieldId::Vpc) < pos(FieldId::SecurityGroup));
        assert_eq!(graph.roots(), vec![FieldId::Region]);
    }

    #[test]
    fn test_descendants_and_ancestors() {
        let graph = aws_like();

        let below_region = graph.descendants(FieldId::Region);
        assert_eq!(below_region.len(), 4);
        assert_eq!(below_region[0], FieldId::Vpc);

        assert_eq!(
            graph.descendants(FieldId::Vpc),
            vec![FieldId::Subnet, FieldId::SecurityGroup]
        );
        assert!(graph.descendants(FieldId::Certificate).is_empty());
        assert_eq!(
            graph.ancestors(FieldId::Subnet),
            vec![FieldId::Region, FieldId::Vpc]
        );
    }

    #[test]
    fn test_rejects_cycles_and_unknown_deps() {
        let cycle = CascadeGraph::new(vec![
            FieldSpec::new(FieldId::Vpc, [FieldId::Subnet]),
            FieldSpec::new(FieldId::Subnet, [FieldId::Vpc]),
        ]);
        assert!(matches!(cycle, Err(CloudError::Validation(msg)) if msg.contains("cycle")));

        let unknown = CascadeGraph::new(vec![FieldSpec::new(FieldId::Vpc, [FieldId::Region])]);
        assert!(unknown.is_err());

        let duplicate = CascadeGraph::new(vec![
            FieldSpec::root(FieldId::Region),
            FieldSpec::root(FieldId::Region),
        ]);
        assert!(duplicate.is_err());
    }
}
