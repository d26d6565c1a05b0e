//! Reporting of component types rendered below the first fold.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thunderbolt_core::PhaseLogger;

use crate::key::ComponentTypeKey;
use crate::structure::AppStructure;

/// Meter name under which the report is emitted.
pub const COMPONENTS_UNDER_FOLD: &str = "components-under-fold";

/// First-fold status of one component instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstFoldEntry {
    /// Component type as reported by the fold measurement.
    pub component_type: String,
    /// Whether the instance is visible without scrolling.
    pub is_in_first_fold: bool,
    /// Widget id, for third-party widgets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<String>,
}

/// Component types and widgets that never appear in the first fold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderFoldReport {
    /// Keys with no instance in the first fold.
    pub comp_types_under_fold: Vec<ComponentTypeKey>,
    /// Widget ids of instances below the fold.
    pub widget_ids_under_fold: Vec<String>,
}

/// Computes which component types are only rendered below the fold.
///
/// `first_fold` is keyed by comp id. When the structure knows the instance,
/// its declared type and UI variant name the key; otherwise the fold entry's
/// type is used as is. A key is in the fold as soon as one instance is.
#[must_use]
pub fn components_under_fold(
    first_fold: &IndexMap<String, FirstFoldEntry>,
    structure: &AppStructure,
) -> UnderFoldReport {
    let mut in_fold: IndexMap<ComponentTypeKey, bool> = IndexMap::new();
    let mut widgets: IndexSet<String> = IndexSet::new();

    for (comp_id, entry) in first_fold {
        if !entry.is_in_first_fold
            && let Some(widget_id) = &entry.widget_id
        {
            widgets.insert(widget_id.clone());
        }

        let key = structure
            .get(comp_id)
            .map_or_else(|| ComponentTypeKey::from(entry.component_type.as_str()), |s| s.key());
        *in_fold.entry(key).or_insert(false) |= entry.is_in_first_fold;
    }

    UnderFoldReport {
        comp_types_under_fold: in_fold
            .into_iter()
            .filter_map(|(key, visible)| (!visible).then_some(key))
            .collect(),
        widget_ids_under_fold: widgets.into_iter().collect(),
    }
}

/// Emits the report as the `components-under-fold` meter.
pub fn report_components_under_fold(phases: &PhaseLogger, report: &UnderFoldReport) {
    match serde_json::to_value(report) {
        Ok(params) => phases.meter(COMPONENTS_UNDER_FOLD, params),
        Err(err) => tracing::warn!(error = %err, "failed to serialize under-fold report"),
    }
}
