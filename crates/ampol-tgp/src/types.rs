use std::{fmt::Display, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Invalid state '{0}'. Accepted values: NSW, QLD, VIC, TAS, SA, NT, WA")]
pub struct StateParseError(String);

#[derive(Debug, thiserror::Error)]
#[error("Invalid fuel '{0}'. Accepted values: E10, ULP, PULP95, PULP98, DIESEL")]
pub struct FuelParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Nsw,
    Qld,
    Vic,
    Tas,
    Sa,
    Nt,
    Wa,
}

impl State {
    pub fn code(&self) -> &'static str {
        match self {
            State::Nsw => "NSW",
            State::Qld => "QLD",
            State::Vic => "VIC",
            State::Tas => "TAS",
            State::Sa => "SA",
            State::Nt => "NT",
            State::Wa => "WA",
        }
    }
}

impl FromStr for State {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NSW" => Ok(State::Nsw),
            "QLD" => Ok(State::Qld),
            "VIC" => Ok(State::Vic),
            "TAS" => Ok(State::Tas),
            "SA" => Ok(State::Sa),
            "NT" => Ok(State::Nt),
            "WA" => Ok(State::Wa),
            _ => Err(StateParseError(s.to_string())),
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fuel {
    E10,
    #[serde(rename = "ULP")]
    Ulp,
    #[serde(rename = "PULP95")]
    Pulp95,
    #[serde(rename = "PULP98")]
    Pulp98,
    #[serde(rename = "DIESEL")]
    Diesel,
}

impl Fuel {
    pub const ALL: [Fuel; 5] = [
        Fuel::E10,
        Fuel::Ulp,
        Fuel::Pulp95,
        Fuel::Pulp98,
        Fuel::Diesel,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Fuel::E10 => "E10",
            Fuel::Ulp => "ULP",
            Fuel::Pulp95 => "PULP95",
            Fuel::Pulp98 => "PULP98",
            Fuel::Diesel => "DIESEL",
        }
    }
}

impl FromStr for Fuel {
    type Err = FuelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "E10" => Ok(Fuel::E10),
            "ULP" => Ok(Fuel::Ulp),
            "PULP95" => Ok(Fuel::Pulp95),
            "PULP98" => Ok(Fuel::Pulp98),
            "DIESEL" => Ok(Fuel::Diesel),
            _ => Err(FuelParseError(s.to_string())),
        }
    }
}

impl Display for Fuel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDay {
    Previous,
    Current,
}

pub const PRICE_COLUMNS: usize = Fuel::ALL.len() * 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalRow {
    pub state: State,
    pub terminal: String,
    pub prices: [String; PRICE_COLUMNS],
}

impl TerminalRow {
    pub fn columns(&self) -> impl Iterator<Item = (Fuel, PriceDay, &str)> {
        Fuel::ALL
            .iter()
            .flat_map(|fuel| [(*fuel, PriceDay::Previous), (*fuel, PriceDay::Current)])
            .zip(self.prices.iter())
            .map(|((fuel, day), price)| (fuel, day, price.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSheet {
    pub current_date: NaiveDate,
    pub previous_date: NaiveDate,
    pub rows: Vec<TerminalRow>,
}

impl PriceSheet {
    pub fn date_for(&self, day: PriceDay) -> NaiveDate {
        match day {
            PriceDay::Previous => self.previous_date,
            PriceDay::Current => self.current_date,
        }
    }

    /// Price tokens that are not numbers (blank cells, dashes) are dropped.
    pub fn to_records(&self, downloaded_at: NaiveDateTime) -> Vec<TgpRecord> {
        let mut records = Vec::with_capacity(self.rows.len() * PRICE_COLUMNS);
        for row in &self.rows {
            for (fuel, day, raw) in row.columns() {
                match raw.parse::<f64>() {
                    Ok(tgp) if tgp.is_finite() => records.push(TgpRecord {
                        state: row.state,
                        terminal: row.terminal.clone(),
                        effective_date: self.date_for(day),
                        fuel,
                        tgp,
                        date_downloaded: downloaded_at,
                    }),
                    _ => log::debug!(
                        "Dropping non-numeric {} price '{}' for {} {}",
                        fuel,
                        raw,
                        row.state,
                        row.terminal
                    ),
                }
            }
        }
        records
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgpRecord {
    pub state: State,
    pub terminal: String,
    pub effective_date: NaiveDate,
    pub fuel: Fuel,
    pub tgp: f64,
    #[serde(with = "download_timestamp")]
    pub date_downloaded: NaiveDateTime,
}

impl TgpRecord {
    // States and fuels order by their codes.
    pub fn key(&self) -> (NaiveDate, &'static str, &str, &'static str) {
        (
            self.effective_date,
            self.state.code(),
            &self.terminal,
            self.fuel.code(),
        )
    }
}

impl Display for TgpRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:<3} {:<28} {:<6} {:>8.2}",
            self.effective_date, self.state, self.terminal, self.fuel, self.tgp
        )
    }
}

pub(crate) mod download_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(s.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}
