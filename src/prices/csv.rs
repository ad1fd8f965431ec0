use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Deserializer};

use crate::domain::{Horizon, PricePoint, RegulationPrice};
use crate::error::ScheduleError;
use crate::prices::PriceSource;

/// Hourly prices loaded from market settlement CSV files.
///
/// The energy file carries `Operating Day` (`%m/%d/%y`), `Operating Hour`
/// (1 through 24) and `Price` columns; the optional regulation file carries
/// `Regulation Up` and `Regulation Down` instead of `Price`. Rows whose
/// price cells are blank or unparsable are dropped at load time, the same
/// way the settlement feeds themselves publish holes.
#[derive(Debug)]
pub struct CsvPriceSource {
    energy: BTreeMap<DateTime<Utc>, f64>,
    regulation: BTreeMap<DateTime<Utc>, RegulationPrice>,
}

#[derive(Debug, Deserialize)]
struct EnergyRow {
    #[serde(rename = "Operating Day")]
    day: String,
    #[serde(rename = "Operating Hour")]
    hour: u32,
    #[serde(rename = "Price", deserialize_with = "lenient_f64")]
    price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RegulationRow {
    #[serde(rename = "Operating Day")]
    day: String,
    #[serde(rename = "Operating Hour")]
    hour: u32,
    #[serde(rename = "Regulation Up", deserialize_with = "lenient_f64")]
    up: Option<f64>,
    #[serde(rename = "Regulation Down", deserialize_with = "lenient_f64")]
    down: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse::<f64>().ok()))
}

/// Operating hour `h` of a day covers `[h-1, h)`; hour 1 starts at midnight.
fn hour_timestamp(day: &str, hour: u32) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(day.trim(), "%m/%d/%y")
        .with_context(|| format!("operating day {day:?} is not m/d/yy"))?;
    ensure!(
        (1..=24).contains(&hour),
        "operating hour {hour} outside 1..=24 on {day}"
    );
    let naive = date
        .and_hms_opt(hour - 1, 0, 0)
        .context("operating hour out of range")?;
    Ok(naive.and_utc())
}

impl CsvPriceSource {
    pub fn from_files(
        energy_path: impl AsRef<Path>,
        regulation_path: Option<impl AsRef<Path>>,
    ) -> Result<Self> {
        let energy_path = energy_path.as_ref();
        let energy = File::open(energy_path)
            .with_context(|| format!("opening energy price file {}", energy_path.display()))?;
        let regulation = match regulation_path {
            Some(path) => {
                let path = path.as_ref();
                Some(File::open(path).with_context(|| {
                    format!("opening regulation price file {}", path.display())
                })?)
            }
            None => None,
        };
        let source = Self::from_readers(energy, regulation)?;
        tracing::info!(
            energy_hours = source.energy_hours(),
            regulation_hours = source.regulation_hours(),
            path = %energy_path.display(),
            "loaded price data"
        );
        Ok(source)
    }

    pub fn from_readers(energy: impl Read, regulation: Option<impl Read>) -> Result<Self> {
        let mut energy_map = BTreeMap::new();
        let mut reader = csv::Reader::from_reader(energy);
        for record in reader.deserialize() {
            let row: EnergyRow = record.context("parsing energy price file")?;
            if let Some(price) = row.price {
                energy_map.insert(hour_timestamp(&row.day, row.hour)?, price);
            }
        }

        let mut regulation_map = BTreeMap::new();
        if let Some(regulation) = regulation {
            let mut reader = csv::Reader::from_reader(regulation);
            for record in reader.deserialize() {
                let row: RegulationRow = record.context("parsing regulation price file")?;
                // An hour is offered only when both directions cleared.
                if let (Some(up), Some(down)) = (row.up, row.down) {
                    regulation_map
                        .insert(hour_timestamp(&row.day, row.hour)?, RegulationPrice { up, down });
                }
            }
        }

        Ok(Self {
            energy: energy_map,
            regulation: regulation_map,
        })
    }

    pub fn energy_hours(&self) -> usize {
        self.energy.len()
    }

    pub fn regulation_hours(&self) -> usize {
        self.regulation.len()
    }
}

fn whole_hour(name: &'static str, at: DateTime<Utc>) -> Result<(), ScheduleError> {
    if at.minute() != 0 || at.second() != 0 || at.nanosecond() != 0 {
        return Err(ScheduleError::invalid_parameter(
            name,
            format!("{at} must fall on a whole hour"),
        ));
    }
    Ok(())
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    async fn price_series(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Horizon, ScheduleError> {
        whole_hour("start", start)?;
        whole_hour("end", end)?;
        if start >= end {
            return Err(ScheduleError::invalid_parameter(
                "window",
                format!("start {start} must precede end {end}"),
            ));
        }

        let mut points = Vec::new();
        let mut regulation = Vec::new();
        let mut offered = false;
        let mut t = start;
        while t < end {
            let price = self
                .energy
                .get(&t)
                .copied()
                .ok_or(ScheduleError::MissingData { period: t })?;
            points.push(PricePoint {
                timestamp: t,
                price,
            });
            let award_prices = self.regulation.get(&t).copied();
            offered |= award_prices.is_some();
            regulation.push(award_prices);
            t += Duration::hours(1);
        }

        let horizon = Horizon::hourly(points)?;
        if offered {
            horizon.with_regulation(regulation)
        } else {
            Ok(horizon)
        }
    }
}
