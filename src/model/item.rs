use serde::Serialize;

use super::time_off::TimeOffRequest;

/// Employee and manager note after applying the presence rules in [`resolve_notes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedNotes {
    pub employee: String,
    pub manager: String,
}

/// Empty strings count as absent. A note that is present is kept as-is, an
/// absent one is blanked.
pub fn resolve_notes(employee: Option<&str>, manager: Option<&str>) -> ResolvedNotes {
    let employee = employee.filter(|s| !s.is_empty());
    let manager = manager.filter(|s| !s.is_empty());
    match (employee, manager) {
        (Some(e), Some(m)) => ResolvedNotes {
            employee: e.to_string(),
            manager: m.to_string(),
        },
        (Some(e), None) => ResolvedNotes {
            employee: e.to_string(),
            manager: String::new(),
        },
        (None, Some(m)) => ResolvedNotes {
            employee: String::new(),
            manager: m.to_string(),
        },
        (None, None) => ResolvedNotes::default(),
    }
}

/// Board column values keyed by the target board's column ids.
/// Field order is the serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnValues {
    #[serde(rename = "text")]
    pub employee_id: String,
    pub status: String,
    #[serde(rename = "date4")]
    pub start: String,
    #[serde(rename = "date")]
    pub end: String,
    #[serde(rename = "created1")]
    pub created: String,
    #[serde(rename = "text3")]
    pub amount: String,
    #[serde(rename = "text2")]
    pub employee_note: String,
    #[serde(rename = "text38")]
    pub manager_note: String,
}

/// Everything needed to create one board item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub columns: ColumnValues,
}

impl ItemDraft {
    pub fn from_request(req: &TimeOffRequest) -> Self {
        let notes = resolve_notes(req.employee_note.as_deref(), req.manager_note.as_deref());
        Self {
            name: req.name.clone(),
            columns: ColumnValues {
                employee_id: req.employee_id.clone(),
                status: req.status.clone(),
                start: req.start.clone(),
                end: req.end.clone(),
                created: req.created.clone(),
                amount: req.amount_label(),
                employee_note: notes.employee,
                manager_note: notes.manager,
            },
        }
    }

    /// The `column_values` argument: a JSON object encoded as a string.
    pub fn column_values_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.columns)
    }
}
