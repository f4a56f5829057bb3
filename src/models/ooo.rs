use crate::errors::{AppError, AppResult};
use chrono::NaiveDate;
use serde::Serialize;

/// Closed date interval during which a user does not work.
/// ⇔ one row of `user_out_of_office`, unique on (user_email, start_date, end_date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OooPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: Option<String>,
}

impl OooPeriod {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        description: Option<String>,
    ) -> AppResult<Self> {
        if end_date < start_date {
            return Err(AppError::InvalidDate(format!(
                "out-of-office end {} is before start {}",
                end_date, start_date
            )));
        }

        Ok(Self {
            start_date,
            end_date,
            description,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

pub fn is_out_of_office(periods: &[OooPeriod], date: NaiveDate) -> bool {
    periods.iter().any(|p| p.contains(date))
}
