//! Crop calendar planning
//!
//! Expands a sowing date and crop duration into dated field tasks. Per-crop
//! irrigation intervals and fertilizer days come from an optional schedule
//! table; crops without an entry use a generic schedule.

use crate::error::{AdvisorError, Result};
use anyhow::Context;
use chrono::{Days, NaiveDate};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub const DEFAULT_CROP: &str = "GenericCrop";
pub const DEFAULT_DURATION_DAYS: u32 = 120;

/// Upper bound on a single plan (ten years)
pub const MAX_DURATION_DAYS: u32 = 3650;

/// Growing schedule for one crop
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CropSchedule {
    pub duration_days: u32,
    /// Irrigation interval in weeks; 0 disables irrigation tasks
    pub watering_weeks: u32,
    /// Days after sowing on which fertilizer is applied
    #[serde(default)]
    pub fertilizer_days: Vec<u32>,
}

impl Default for CropSchedule {
    fn default() -> Self {
        Self {
            duration_days: DEFAULT_DURATION_DAYS,
            watering_weeks: 1,
            fertilizer_days: vec![30, 60],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum CalendarTask {
    Sowing,
    Irrigation,
    #[serde(rename = "Fertilizer application")]
    Fertilizer,
    Harvest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub task: CalendarTask,
}

#[derive(Debug, Clone, Serialize)]
pub struct CropCalendar {
    pub crop: String,
    pub sowing_date: NaiveDate,
    pub harvest_date: NaiveDate,
    pub schedule: Vec<CalendarEntry>,
}

/// Validated calendar request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarRequest {
    pub crop: Option<String>,
    pub sowing_date: Option<NaiveDate>,
    pub duration_days: Option<u32>,
}

impl CalendarRequest {
    /// Parse `{crop?, sowing_date?, duration_days?}`.
    ///
    /// `sowing_date` must be ISO `YYYY-MM-DD`. `duration_days` accepts a
    /// positive integer or a string of digits.
    pub fn from_json_map(payload: &Map<String, Value>) -> Result<Self> {
        let crop = match payload.get("crop") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(_) => return Err(AdvisorError::invalid_input("crop", "expected a string")),
        };

        let sowing_date = match payload.get("sowing_date") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                    AdvisorError::invalid_input(
                        "sowing_date",
                        format!("'{}' is not an ISO date (YYYY-MM-DD)", s),
                    )
                })?,
            ),
            Some(_) => {
                return Err(AdvisorError::invalid_input(
                    "sowing_date",
                    "expected an ISO date string",
                ))
            }
        };

        let duration_days = match payload.get("duration_days") {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_duration(value)?),
        };

        Ok(Self { crop, sowing_date, duration_days })
    }
}

fn parse_duration(value: &Value) -> Result<u32> {
    let days = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| AdvisorError::invalid_input("duration_days", "expected a positive integer"))?;

    let days = u32::try_from(days).unwrap_or(u32::MAX);
    check_duration(days)
}

fn check_duration(days: u32) -> Result<u32> {
    if days == 0 || days > MAX_DURATION_DAYS {
        return Err(AdvisorError::invalid_input(
            "duration_days",
            format!("must be between 1 and {}", MAX_DURATION_DAYS),
        ));
    }
    Ok(days)
}

/// Crop name -> schedule
#[derive(Debug, Default)]
pub struct CalendarPlanner {
    schedules: FxHashMap<String, CropSchedule>,
}

impl CalendarPlanner {
    /// Load the schedule table from JSON (`{"rice": {...}, ...}`)
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read crop schedules: {}", path.display()))?;
        let planner = Self::from_json_str(&contents)
            .with_context(|| format!("Failed to load crop schedules: {}", path.display()))?;

        tracing::info!("Loaded {} crop schedules from {}", planner.len(), path.display());
        Ok(planner)
    }

    /// Parse and validate a schedule table
    pub fn from_json_str(contents: &str) -> anyhow::Result<Self> {
        let schedules: FxHashMap<String, CropSchedule> =
            serde_json::from_str(contents).context("Invalid crop schedule JSON")?;

        for (crop, schedule) in &schedules {
            check_duration(schedule.duration_days)
                .with_context(|| format!("Invalid schedule for '{}'", crop))?;
        }
        Ok(Self::new(schedules))
    }

    pub fn new(schedules: FxHashMap<String, CropSchedule>) -> Self {
        Self { schedules }
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// Schedule for `crop`, or the generic one
    pub fn schedule_for(&self, crop: &str) -> CropSchedule {
        self.schedules.get(crop).cloned().unwrap_or_default()
    }

    /// Build the dated task list. `today` is used when no sowing date is given.
    pub fn plan(&self, request: &CalendarRequest, today: NaiveDate) -> Result<CropCalendar> {
        let crop = request.crop.clone().unwrap_or_else(|| DEFAULT_CROP.to_string());
        let schedule = self.schedule_for(&crop);
        let duration = check_duration(request.duration_days.unwrap_or(schedule.duration_days))?;
        let sowing = request.sowing_date.unwrap_or(today);

        let offset = |day: u32| -> Result<NaiveDate> {
            sowing.checked_add_days(Days::new(day as u64)).ok_or_else(|| {
                AdvisorError::invalid_input("sowing_date", "calendar runs past the supported date range")
            })
        };

        let mut tasks: Vec<(u32, CalendarTask)> = vec![(0, CalendarTask::Sowing)];

        if schedule.watering_weeks > 0 {
            let interval = schedule.watering_weeks.saturating_mul(7);
            tasks.extend(
                (1u32..)
                    .map(|n| n.saturating_mul(interval))
                    .take_while(|day| *day < duration)
                    .map(|day| (day, CalendarTask::Irrigation)),
            );
        }

        let mut fertilizer_days = schedule.fertilizer_days.clone();
        fertilizer_days.sort_unstable();
        fertilizer_days.dedup();
        tasks.extend(
            fertilizer_days
                .into_iter()
                .filter(|day| *day > 0 && *day < duration)
                .map(|day| (day, CalendarTask::Fertilizer)),
        );

        tasks.push((duration, CalendarTask::Harvest));
        tasks.sort();

        let schedule = tasks
            .into_iter()
            .map(|(day, task)| Ok(CalendarEntry { date: offset(day)?, task }))
            .collect::<Result<Vec<_>>>()?;

        Ok(CropCalendar {
            crop,
            sowing_date: sowing,
            harvest_date: offset(duration)?,
            schedule,
        })
    }
}
