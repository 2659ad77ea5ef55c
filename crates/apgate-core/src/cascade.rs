//! Dependent-resource cascade resolution
//!
//! [`CascadeResolver`] owns one [`ResourceSelection`] per field of a
//! provider's [`CascadeGraph`]. It performs no I/O: every operation returns
//! the [`FetchRequest`]s that became issuable, and the caller feeds the
//! port's answer back through [`CascadeResolver::complete`]. A response is
//! only applied when its token is still the field's latest one.

use apgate_cloud::{
    CascadeGraph, CloudError, FieldId, ParentSelections, Result, SelectableOption,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Load status of a cascade field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Idle,
    Loading,
    Loaded,
    Error,
}

impl std::fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldStatus::Idle => write!(f, "idle"),
            FieldStatus::Loading => write!(f, "loading"),
            FieldStatus::Loaded => write!(f, "loaded"),
            FieldStatus::Error => write!(f, "error"),
        }
    }
}

/// State of one selectable field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSelection {
    pub field_id: FieldId,
    pub value: Option<String>,
    pub depends_on: Vec<FieldId>,
    pub options: Vec<SelectableOption>,
    pub status: FieldStatus,
    /// Message of the last failed fetch
    pub error: Option<String>,
    /// Upstream values the last fetch was issued with
    pub last_inputs: Option<ParentSelections>,
    #[serde(skip)]
    token: u64,
    #[serde(skip)]
    pending_key: Option<u64>,
}

impl ResourceSelection {
    fn new(field_id: FieldId, depends_on: Vec<FieldId>) -> Self {
        Self {
            field_id,
            value: None,
            depends_on,
            options: Vec::new(),
            status: FieldStatus::Idle,
            error: None,
            last_inputs: None,
            token: 0,
            pending_key: None,
        }
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Option listing the caller must perform for a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub field: FieldId,
    /// Values of every upstream field
    pub parents: ParentSelections,
    token: u64,
    key: u64,
}

impl FetchRequest {
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Hash of the upstream values, used to de-duplicate in-flight fetches
    pub fn key(&self) -> u64 {
        self.key
    }
}

/// Recorded status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeEvent {
    pub field: FieldId,
    pub from: FieldStatus,
    pub to: FieldStatus,
}

fn input_key(parents: &ParentSelections) -> u64 {
    let mut hasher = DefaultHasher::new();
    parents.hash(&mut hasher);
    hasher.finish()
}

/// Sans-IO resolver for one provider's field graph
#[derive(Debug, Clone)]
pub struct CascadeResolver {
    graph: CascadeGraph,
    selections: BTreeMap<FieldId, ResourceSelection>,
    events: Vec<CascadeEvent>,
    next_token: u64,
}

impl CascadeResolver {
    pub fn new(graph: CascadeGraph) -> Self {
        let selections = graph
            .fields()
            .iter()
            .map(|spec| {
                (
                    spec.id,
                    ResourceSelection::new(spec.id, spec.depends_on.clone()),
                )
            })
            .collect();
        Self {
            graph,
            selections,
            events: Vec::new(),
            next_token: 0,
        }
    }

    pub fn graph(&self) -> &CascadeGraph {
        &self.graph
    }

    pub fn selection(&self, field: FieldId) -> Option<&ResourceSelection> {
        self.selections.get(&field)
    }

    /// Selections in topological order
    pub fn selections(&self) -> Vec<&ResourceSelection> {
        self.graph
            .fields()
            .iter()
            .filter_map(|spec| self.selections.get(&spec.id))
            .collect()
    }

    /// Every field that currently holds a value
    pub fn values(&self) -> ParentSelections {
        self.selections
            .values()
            .filter_map(|s| s.value.clone().map(|v| (s.field_id, v)))
            .collect()
    }

    /// True when no fetch is outstanding
    pub fn is_settled(&self) -> bool {
        self.selections
            .values()
            .all(|s| s.status != FieldStatus::Loading)
    }

    /// Status transitions recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<CascadeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Issue fetches for every idle field whose dependencies are satisfied
    pub fn start(&mut self) -> Vec<FetchRequest> {
        let ready: Vec<FieldId> = self
            .graph
            .fields()
            .iter()
            .map(|spec| spec.id)
            .filter(|id| self.status_of(*id) == Some(FieldStatus::Idle))
            .collect();
        ready.into_iter().filter_map(|id| self.issue(id)).collect()
    }

    /// Request the options of `field` with the current upstream values
    ///
    /// Returns `Ok(None)` when an identical fetch is already in flight.
    pub fn resolve(&mut self, field: FieldId) -> Result<Option<FetchRequest>> {
        self.ensure_known(field)?;
        self.ensure_satisfied(field)?;
        Ok(self.issue(field))
    }

    /// Set or clear the value of `field` and invalidate everything downstream
    pub fn select(&mut self, field: FieldId, value: Option<String>) -> Result<Vec<FetchRequest>> {
        self.ensure_known(field)?;
        self.ensure_satisfied(field)?;

        let value = value.filter(|v| !v.trim().is_empty());
        let Some(selection) = self.selections.get_mut(&field) else {
            return Ok(Vec::new());
        };
        if let Some(v) = &value {
            if selection.status != FieldStatus::Loaded {
                return Err(CloudError::Validation(format!(
                    "{} options are not loaded",
                    field
                )));
            }
            if !selection.has_option(v) {
                return Err(CloudError::Validation(format!(
                    "'{}' is not an available {}",
                    v, field
                )));
            }
        }
        if selection.value == value {
            return Ok(Vec::new());
        }

        tracing::debug!("{} set to {:?}", field, value);
        selection.value = value;
        Ok(self.on_upstream_change(field))
    }

    /// Seed values before their options load, e.g. when editing an existing
    /// access point. Values the loaded options do not contain are dropped.
    pub fn preset(&mut self, values: &ParentSelections) {
        for (field, value) in values {
            if let Some(selection) = self.selections.get_mut(field) {
                selection.value = Some(value.clone());
            }
        }
    }

    /// Reset every descendant of `field` and fetch the ones now satisfied
    pub fn on_upstream_change(&mut self, field: FieldId) -> Vec<FetchRequest> {
        let descendants = self.graph.descendants(field);
        for id in &descendants {
            self.invalidate(*id);
        }
        descendants
            .into_iter()
            .filter_map(|id| self.issue(id))
            .collect()
    }

    /// Apply the port's answer to `request`
    ///
    /// Responses for a superseded request are ignored.
    pub fn complete(
        &mut self,
        request: &FetchRequest,
        result: Result<Vec<SelectableOption>>,
    ) -> Vec<FetchRequest> {
        let field = request.field;
        let Some(selection) = self.selections.get_mut(&field) else {
            return Vec::new();
        };
        if selection.status != FieldStatus::Loading || selection.token != request.token {
            tracing::debug!("Dropping stale {} response (token {})", field, request.token);
            return Vec::new();
        }
        selection.pending_key = None;

        match result {
            Ok(options) => {
                selection.options = options;
                selection.error = None;
                let unavailable = selection
                    .value
                    .as_ref()
                    .filter(|v| !selection.has_option(v.as_str()))
                    .cloned();
                if let Some(v) = &unavailable {
                    tracing::debug!("{} value '{}' is no longer available", field, v);
                    selection.value = None;
                }
                let dropped = unavailable.is_some();
                self.transition(field, FieldStatus::Loaded);
                if dropped {
                    self.on_upstream_change(field)
                } else {
                    self.issue_ready_descendants(field)
                }
            }
            Err(e) => {
                tracing::warn!("Failed to list {}: {}", field.collection(), e);
                selection.error = Some(e.to_string());
                self.transition(field, FieldStatus::Error);
                Vec::new()
            }
        }
    }

    /// Re-issue the fetch of a field in `Error`
    pub fn retry(&mut self, field: FieldId) -> Result<Option<FetchRequest>> {
        self.ensure_known(field)?;
        if self.status_of(field) != Some(FieldStatus::Error) {
            return Ok(None);
        }
        self.resolve(field)
    }

    /// Return every field to `Idle` with no value
    pub fn reset(&mut self) {
        let fields: Vec<FieldId> = self.graph.fields().iter().map(|s| s.id).collect();
        for id in fields {
            self.invalidate(id);
        }
    }

    fn status_of(&self, field: FieldId) -> Option<FieldStatus> {
        self.selections.get(&field).map(|s| s.status)
    }

    fn ensure_known(&self, field: FieldId) -> Result<()> {
        if self.selections.contains_key(&field) {
            Ok(())
        } else {
            Err(CloudError::Validation(format!(
                "{} is not used by this provider",
                field
            )))
        }
    }

    fn ensure_satisfied(&self, field: FieldId) -> Result<()> {
        match self.missing_dependency(field) {
            Some(dep) => Err(CloudError::Validation(format!(
                "{} requires a {} selection",
                field, dep
            ))),
            None => Ok(()),
        }
    }

    /// First direct dependency without a loaded value
    fn missing_dependency(&self, field: FieldId) -> Option<FieldId> {
        let selection = self.selections.get(&field)?;
        selection.depends_on.iter().copied().find(|dep| {
            self.selections.get(dep).is_none_or(|s| {
                s.status != FieldStatus::Loaded || s.value.as_deref().is_none_or(str::is_empty)
            })
        })
    }

    fn parents_of(&self, field: FieldId) -> ParentSelections {
        self.graph
            .ancestors(field)
            .into_iter()
            .filter_map(|id| {
                self.selections
                    .get(&id)
                    .and_then(|s| s.value.clone())
                    .map(|v| (id, v))
            })
            .collect()
    }

    fn issue(&mut self, field: FieldId) -> Option<FetchRequest> {
        if self.missing_dependency(field).is_some() {
            return None;
        }
        let parents = self.parents_of(field);
        let key = input_key(&parents);

        self.next_token += 1;
        let token = self.next_token;
        let selection = self.selections.get_mut(&field)?;
        if selection.status == FieldStatus::Loading && selection.pending_key == Some(key) {
            tracing::debug!("{} fetch already in flight", field);
            return None;
        }
        selection.token = token;
        selection.pending_key = Some(key);
        selection.error = None;
        selection.last_inputs = Some(parents.clone());
        self.transition(field, FieldStatus::Loading);

        tracing::debug!("Fetching {} with {:?}", field.collection(), parents);
        Some(FetchRequest {
            field,
            parents,
            token,
            key,
        })
    }

    fn issue_ready_descendants(&mut self, field: FieldId) -> Vec<FetchRequest> {
        self.graph
            .descendants(field)
            .into_iter()
            .filter(|id| self.status_of(*id) == Some(FieldStatus::Idle))
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|id| self.issue(id))
            .collect()
    }

    fn invalidate(&mut self, field: FieldId) {
        self.next_token += 1;
        let token = self.next_token;
        if let Some(selection) = self.selections.get_mut(&field) {
            selection.value = None;
            selection.options.clear();
            selection.error = None;
            selection.last_inputs = None;
            selection.pending_key = None;
            selection.token = token;
        }
        self.transition(field, FieldStatus::Idle);
    }

    fn transition(&mut self, field: FieldId, to: FieldStatus) {
        let Some(selection) = self.selections.get_mut(&field) else {
            return;
        };
        let from = selection.status;
        if from == to {
            return;
        }
        selection.status = to;
        self.events.push(CascadeEvent { field, from, to });
    }
}
