use std::collections::HashSet;
use std::io;
use std::path::Path;

use crate::types::TgpRecord;

pub const DEFAULT_OUTPUT: &str = "ampol_tgp_data.csv";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub fn read_history(path: &Path) -> Result<Vec<TgpRecord>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize::<TgpRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Among records downloaded at the same second the later one in `records` wins.
pub fn merge_records(records: Vec<TgpRecord>) -> Vec<TgpRecord> {
    let mut indexed: Vec<(usize, TgpRecord)> = records.into_iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        b.date_downloaded
            .cmp(&a.date_downloaded)
            .then_with(|| ib.cmp(ia))
    });

    let mut seen = HashSet::new();
    let mut merged: Vec<TgpRecord> = indexed
        .into_iter()
        .map(|(_, r)| r)
        .filter(|r| seen.insert((r.effective_date, r.state, r.terminal.clone(), r.fuel)))
        .collect();

    merged.sort_by(|a, b| a.key().cmp(&b.key()));
    merged
}

pub fn append_records(path: &Path, new_records: Vec<TgpRecord>) -> Result<usize, StoreError> {
    let mut combined = if path.exists() {
        log::info!("Appending data to {}", path.display());
        read_history(path)?
    } else {
        log::info!("Creating new data file: {}", path.display());
        Vec::new()
    };
    combined.extend(new_records);

    let merged = merge_records(combined);
    write_history(path, &merged)?;
    log::info!("Successfully saved data to {}", path.display());
    Ok(merged.len())
}

fn write_history(path: &Path, records: &[TgpRecord]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
