use fleetscope_core::ApplicationSet;

/// Placement of `app_set` and the other ApplicationSets drawing from the same placement.
///
/// Returns `("", [])` when the first generator names no placement.
pub fn get_app_set_related_resources(app_set: &ApplicationSet, application_sets: &[ApplicationSet]) -> (String, Vec<String>) {
    let Some(placement) = app_set.spec.placement_name() else {
        return (String::new(), Vec::new());
    };
    let siblings = application_sets
        .iter()
        .filter(|other| !other.metadata.is(app_set.namespace(), app_set.name()))
        .filter(|other| other.spec.placement_name() == Some(placement))
        .map(|other| other.name().to_string())
        .collect();
    (placement.to_string(), siblings)
}
