use chrono::{Months, NaiveDate};

/// One time-off request as reported by the HR system for the current window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeOffRequest {
    pub employee_id: String,
    pub name: String,
    /// e.g. "approved", "requested", "denied"
    pub status: String,
    pub start: String,
    pub end: String,
    pub created: String,
    pub amount: String,
    pub unit: String,
    pub employee_note: Option<String>,
    pub manager_note: Option<String>,
}

impl TimeOffRequest {
    /// Quantity and unit as one label, e.g. "5 hours".
    pub fn amount_label(&self) -> String {
        format!("{} {}", self.amount.trim(), self.unit.trim())
            .trim()
            .to_string()
    }
}

/// Date range requested from the HR API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// `[today, today + 1 month)`. Day-of-month is clamped, so Jan 31 ends on Feb 28/29.
    pub fn one_month_from(today: NaiveDate) -> Self {
        let end = today
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        Self { start: today, end }
    }

    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}
