use fleetscope_core::{labels, FleetResource};
use serde::{Deserialize, Serialize};

/// Application counts per family, for the overview cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTypeCounts {
    pub subscription: usize,
    pub argo: usize,
    pub appset: usize,
    pub ocp: usize,
    pub flux: usize,
}

impl AppTypeCounts {
    pub fn total(&self) -> usize {
        self.subscription + self.argo + self.appset + self.ocp + self.flux
    }
}

/// Count application-like resources. Argo applications generated by an
/// ApplicationSet are folded into their set and not counted on their own.
pub fn application_type_counts<'a>(resources: impl IntoIterator<Item = &'a FleetResource>) -> AppTypeCounts {
    let mut counts = AppTypeCounts::default();
    for r in resources {
        match r {
            FleetResource::Application(_) => counts.subscription += 1,
            FleetResource::ApplicationSet(_) => counts.appset += 1,
            FleetResource::ArgoApplication(app) => {
                if !app.metadata.owner_references.iter().any(|o| o.kind == "ApplicationSet") {
                    counts.argo += 1;
                }
            }
            FleetResource::Workload(w) => {
                let m = &w.metadata;
                if m.label(labels::FLUX_KUSTOMIZATION).is_some() || m.label(labels::FLUX_HELM).is_some() {
                    counts.flux += 1;
                } else {
                    counts.ocp += 1;
                }
            }
            _ => {}
        }
    }
    counts
}
