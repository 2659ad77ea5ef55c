//! Access point reconciliation
//!
//! Decides whether a core resource picked by the user is already wrapped by
//! a platform access point, and whether that access point may be reused.

use apgate_cloud::{
    AccessPoint, AccessPointCore, AccessPointStatus, CloudAccountRef, GenericApConfig,
    NativeCoreResource, ProviderAdapter, SelectableOption,
};
use serde::Serialize;
use std::sync::Arc;

/// Verdict for a selected core resource
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// A healthy access point already wraps the core
    Reuse(AccessPoint),
    /// No access point wraps the core; open the create flow with `seed`
    RequiresCreation {
        core: AccessPointCore,
        seed: GenericApConfig,
    },
    /// The selection cannot be used and must be cleared
    Invalid(String),
}

impl Reconciliation {
    pub fn label(&self) -> &'static str {
        match self {
            Reconciliation::Reuse(_) => "reuse",
            Reconciliation::RequiresCreation { .. } => "create",
            Reconciliation::Invalid(_) => "invalid",
        }
    }
}

/// Entry of the selectable core list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreOption {
    pub core: AccessPointCore,
    /// Access point wrapping the core, if any
    pub linked: Option<AccessPoint>,
    /// Linked access point is errored; excluded from auto-selection
    pub errored: bool,
}

impl CoreOption {
    pub fn option(&self) -> SelectableOption {
        self.core.to_option()
    }
}

/// Reconciler bound to one provider adapter and cloud account
#[derive(Clone)]
pub struct AccessPointReconciler {
    adapter: Arc<dyn ProviderAdapter>,
    account: CloudAccountRef,
}

impl AccessPointReconciler {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, account: CloudAccountRef) -> Self {
        Self { adapter, account }
    }

    /// Map provider records to cores, skipping the ones the adapter rejects
    pub fn map_cores(&self, natives: &[NativeCoreResource]) -> Vec<AccessPointCore> {
        natives
            .iter()
            .filter_map(|native| match self.adapter.to_generic_access_point(native) {
                Ok(core) => Some(core),
                Err(e) => {
                    tracing::warn!("Skipping {} core resource: {}", self.adapter.kind(), e);
                    None
                }
            })
            .collect()
    }

    /// Listed cores plus cores known only through access points
    ///
    /// `submitted` access points without a listed core become
    /// [`AccessPointCore::Submitted`]; other access points referencing an
    /// unlisted core become [`AccessPointCore::Unknown`].
    pub fn known_cores(
        &self,
        access_points: &[AccessPoint],
        cores: &[AccessPointCore],
    ) -> Vec<AccessPointCore> {
        let mut known = cores.to_vec();
        for ap in access_points {
            if known.iter().any(|core| self.adapter.matches_core(ap, core)) {
                continue;
            }
            let synthetic = match (ap.status, ap.id.as_deref()) {
                (AccessPointStatus::Submitted, Some(id)) => AccessPointCore::Submitted {
                    access_point_id: id.to_string(),
                    name: ap.name.clone(),
                    vpc: ap.vpc.clone(),
                },
                _ => match self.adapter.linked_core_id(ap) {
                    Some(core_id) => AccessPointCore::Unknown {
                        core_id: core_id.to_string(),
                    },
                    None => continue,
                },
            };
            known.push(synthetic);
        }
        known
    }

    /// Selectable cores with their linked access point
    pub fn catalogue(
        &self,
        access_points: &[AccessPoint],
        cores: &[AccessPointCore],
    ) -> Vec<CoreOption> {
        self.known_cores(access_points, cores)
            .into_iter()
            .map(|core| {
                let linked = self.linked_access_point(&core, access_points).cloned();
                let errored = linked.as_ref().is_some_and(AccessPoint::is_errored);
                CoreOption {
                    core,
                    linked,
                    errored,
                }
            })
            .collect()
    }

    /// Access point wrapping `core`; the most recently created one wins
    pub fn linked_access_point<'a>(
        &self,
        core: &AccessPointCore,
        access_points: &'a [AccessPoint],
    ) -> Option<&'a AccessPoint> {
        access_points
            .iter()
            .enumerate()
            .filter(|(_, ap)| self.adapter.matches_core(ap, core))
            .max_by_key(|(index, ap)| (ap.created_at, *index))
            .map(|(_, ap)| ap)
    }

    /// Decide what to do with the core selected through `option`
    pub fn select_core(
        &self,
        option: &SelectableOption,
        access_points: &[AccessPoint],
        cores: &[AccessPointCore],
    ) -> Reconciliation {
        let known = self.known_cores(access_points, cores);
        let Some(core) = known
            .into_iter()
            .find(|core| core.selection_value() == option.value)
        else {
            return Reconciliation::Invalid(format!("unknown core resource '{}'", option.value));
        };

        match self.linked_access_point(&core, access_points) {
            Some(ap) if ap.is_errored() => {
                tracing::warn!(
                    "Core {} is wrapped by errored access point {:?}",
                    option.value,
                    ap.id
                );
                Reconciliation::Invalid("errored access point".to_string())
            }
            Some(ap) => {
                tracing::debug!("Reusing access point {:?} for core {}", ap.id, option.value);
                Reconciliation::Reuse(ap.clone())
            }
            None => {
                let mut seed = self.adapter.seed_config(&self.account, &core);
                if let AccessPointCore::Unknown { core_id } = &core {
                    seed.core_id = Some(core_id.clone());
                }
                tracing::debug!("Core {} requires a new access point", option.value);
                Reconciliation::RequiresCreation { core, seed }
            }
        }
    }
}
