use crate::types::{Fuel, State, TgpRecord};

use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct HistoryFilter {
    pub state: Option<State>,
    pub fuel: Option<Fuel>,
    pub terminal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn apply(self, mut records: Vec<TgpRecord>) -> Vec<TgpRecord> {
        if let Some(state) = self.state {
            records.retain(|r| r.state == state);
        }
        if let Some(fuel) = self.fuel {
            records.retain(|r| r.fuel == fuel);
        }
        if let Some(terminal) = &self.terminal {
            let needle = terminal.to_lowercase();
            records.retain(|r| r.terminal.to_lowercase().contains(&needle));
        }
        if let Some(start) = self.start_date {
            records.retain(|r| r.effective_date >= start);
        }
        if let Some(end) = self.end_date {
            records.retain(|r| r.effective_date <= end);
        }
        if let Some(lim) = self.limit {
            // Most recent days are the interesting ones.
            let skip = records.len().saturating_sub(lim);
            records.drain(..skip);
        }
        records
    }

    pub fn validate(self) -> Result<Self, String> {
        if let Some(start) = self.start_date
            && let Some(end) = self.end_date
            && start > end
        {
            return Err(format!(
                "Start date ({start}) cannot be after end date ({end})"
            ));
        }
        if self.limit.is_some_and(|l| l == 0) {
            return Err("Limit must be greater than 0".to_string());
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub struct HistoryStats {
    pub records: usize,
    pub terminals: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl HistoryStats {
    pub fn from_records(records: &[TgpRecord]) -> HistoryStats {
        let terminals: HashSet<_> = records.iter().map(|r| (r.state, &r.terminal)).collect();
        HistoryStats {
            records: records.len(),
            terminals: terminals.len(),
            first_date: records.iter().map(|r| r.effective_date).min(),
            last_date: records.iter().map(|r| r.effective_date).max(),
        }
    }
}

impl std::fmt::Display for HistoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Prices:    {}", self.records)?;
        writeln!(f, "  Terminals: {}", self.terminals)?;
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            writeln!(f, "  Dates:     {} to {}", first, last)?;
        }
        Ok(())
    }
}
