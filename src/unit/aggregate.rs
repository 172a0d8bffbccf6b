// src/unit/aggregate.rs

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Map, Value};
use tracing::info;

use super::collect::locality_name;
use super::{read_json_object, write_json_object, ResumableUnit, DATA_FILE, RESULT_FILE};
use crate::fs::FileSystem;

/// Per-day averages of one forecast date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyAverages {
    pub temp: f64,
    pub pressure_mm: f64,
    pub humidity: f64,
}

/// Computes per-day averages for every city in `<dir>/data.json` and merges
/// them into `<dir>/result.json`, one city per step.
///
/// `data.json` is read lazily on the first step, after the collecting job has
/// had a chance to fill it.
#[derive(Debug)]
pub struct AggregateUnit {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    cities: Option<VecDeque<(String, Value)>>,
}

impl AggregateUnit {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
            cities: None,
        }
    }

    fn load_cities(&self) -> Result<VecDeque<(String, Value)>> {
        let data = read_json_object(self.fs.as_ref(), &self.dir.join(DATA_FILE))?;
        Ok(data
            .into_iter()
            .map(|(key, doc)| {
                let city = locality_name(&doc).map(str::to_string).unwrap_or(key);
                (city, doc)
            })
            .collect())
    }
}

fn hour_field(hour: &Value, field: &str) -> f64 {
    hour.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Average `temp`, `pressure_mm` and `humidity` over the hours of each
/// forecast date. Missing readings count as zero; a date with no hours keeps
/// zero averages.
pub fn daily_averages(doc: &Value) -> Vec<(String, DailyAverages)> {
    let forecasts = doc
        .get("forecasts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    forecasts
        .iter()
        .map(|forecast| {
            let date = forecast
                .get("date")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let hours = forecast
                .get("hours")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut sums = DailyAverages {
                temp: 0.0,
                pressure_mm: 0.0,
                humidity: 0.0,
            };
            for hour in hours {
                sums.temp += hour_field(hour, "temp");
                sums.pressure_mm += hour_field(hour, "pressure_mm");
                sums.humidity += hour_field(hour, "humidity");
            }

            let n = hours.len().max(1) as f64;
            let avg = DailyAverages {
                temp: sums.temp / n,
                pressure_mm: sums.pressure_mm / n,
                humidity: sums.humidity / n,
            };
            (date, avg)
        })
        .collect()
}

impl ResumableUnit for AggregateUnit {
    fn step(&mut self) -> Result<Option<Value>> {
        if self.cities.is_none() {
            self.cities = Some(self.load_cities()?);
        }
        let Some((city, doc)) = self.cities.as_ref().and_then(|c| c.front()).cloned() else {
            return Ok(None);
        };

        info!(city = %city, "calculating daily averages");
        let mut per_day = Map::new();
        for (date, avg) in daily_averages(&doc) {
            per_day.insert(
                date,
                json!({
                    "temp": avg.temp,
                    "pressure_mm": avg.pressure_mm,
                    "humidity": avg.humidity,
                }),
            );
        }
        let days = per_day.len();

        let result_path = self.dir.join(RESULT_FILE);
        let mut summary = if self.fs.exists(&result_path) {
            read_json_object(self.fs.as_ref(), &result_path)?
        } else {
            Map::new()
        };
        summary.insert(city.clone(), Value::Object(per_day));
        write_json_object(self.fs.as_ref(), &result_path, &summary)?;

        if let Some(cities) = self.cities.as_mut() {
            cities.pop_front();
        }
        info!(city = %city, days, "daily averages written");
        Ok(Some(json!({ "city": city, "days": days })))
    }

    fn describe(&self) -> String {
        format!("aggregate({})", self.dir.display())
    }
}
