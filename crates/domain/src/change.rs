use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventPayload, is_empty_value};

/// Classification of one field difference between stored data and an update patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The stored document had no value for the field.
    Added,
    /// The patch clears a stored value.
    Removed,
    /// Both sides carry different values.
    Modified,
}

impl ChangeType {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
        }
    }
}

/// One field difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Changed key.
    pub field: String,
    /// Stored value before the update.
    pub old_value: Option<Value>,
    /// Patch value.
    pub new_value: Value,
    /// Change classification.
    pub change_type: ChangeType,
}

/// Compares every key of `patch` against `stored`, in ascending key order.
///
/// Keys whose values are equal produce no entry, and so do keys that are empty on
/// both sides.
#[must_use]
pub fn analyze_changes(stored: &EventPayload, patch: &EventPayload) -> Vec<FieldChange> {
    patch
        .iter()
        .filter_map(|(field, new_value)| {
            let old_value = stored.get(field).filter(|value| !value.is_null());
            let change_type = classify(old_value, new_value)?;
            Some(FieldChange {
                field: field.clone(),
                old_value: old_value.cloned(),
                new_value: new_value.clone(),
                change_type,
            })
        })
        .collect()
}

fn classify(old_value: Option<&Value>, new_value: &Value) -> Option<ChangeType> {
    match old_value {
        None if is_empty_value(new_value) => None,
        None => Some(ChangeType::Added),
        Some(old) if old == new_value => None,
        Some(old) if is_empty_value(new_value) && is_empty_value(old) => None,
        Some(_) if is_empty_value(new_value) => Some(ChangeType::Removed),
        Some(_) => Some(ChangeType::Modified),
    }
}
