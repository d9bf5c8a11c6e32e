//! Meteorological seasons used for rainfall aggregation.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    Winter,
    #[serde(rename = "Pre-Monsoon")]
    PreMonsoon,
    Monsoon,
    #[serde(rename = "Post-Monsoon")]
    PostMonsoon,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Winter,
        Season::PreMonsoon,
        Season::Monsoon,
        Season::PostMonsoon,
    ];

    /// Calendar months (1-12) belonging to the season
    pub fn months(self) -> &'static [u32] {
        match self {
            Season::Winter => &[12, 1, 2],
            Season::PreMonsoon => &[3, 4, 5],
            Season::Monsoon => &[6, 7, 8, 9],
            Season::PostMonsoon => &[10, 11],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::PreMonsoon => "Pre-Monsoon",
            Season::Monsoon => "Monsoon",
            Season::PostMonsoon => "Post-Monsoon",
        }
    }

    /// Bucket a calendar month; `None` outside 1-12
    pub fn from_month(month: u32) -> Option<Season> {
        Season::ALL
            .into_iter()
            .find(|season| season.months().contains(&month))
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the current month is mapped to a season.
///
/// `Legacy` reproduces the historical behaviour of moving February, May,
/// September and November forward one month before bucketing, which makes
/// each of them report the following season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthShift {
    #[default]
    Calendar,
    Legacy,
}

impl MonthShift {
    pub fn season_for(self, month: u32) -> Option<Season> {
        let month = match self {
            MonthShift::Legacy if matches!(month, 2 | 5 | 9 | 11) => month + 1,
            _ => month,
        };
        Season::from_month(month)
    }
}

impl FromStr for MonthShift {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calendar" | "" => Ok(MonthShift::Calendar),
            "legacy" => Ok(MonthShift::Legacy),
            other => Err(format!(
                "unknown month shift '{}' (expected 'calendar' or 'legacy')",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_month_has_one_season() {
        for month in 1..=12 {
            let hits = Season::ALL
                .iter()
                .filter(|s| s.months().contains(&month))
                .count();
            assert_eq!(hits, 1, "month {month}");
        }
        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn test_calendar_mapping() {
        let shift = MonthShift::Calendar;
        assert_eq!(shift.season_for(1), Some(Season::Winter));
        assert_eq!(shift.season_for(2), Some(Season::Winter));
        assert_eq!(shift.season_for(5), Some(Season::PreMonsoon));
        assert_eq!(shift.season_for(7), Some(Season::Monsoon));
        assert_eq!(shift.season_for(9), Some(Season::Monsoon));
        assert_eq!(shift.season_for(11), Some(Season::PostMonsoon));
        assert_eq!(shift.season_for(12), Some(Season::Winter));
    }

    #[test]
    fn test_legacy_shift_moves_boundary_months() {
        let shift = MonthShift::Legacy;
        assert_eq!(shift.season_for(2), Some(Season::PreMonsoon));
        assert_eq!(shift.season_for(5), Some(Season::Monsoon));
        assert_eq!(shift.season_for(9), Some(Season::PostMonsoon));
        assert_eq!(shift.season_for(11), Some(Season::Winter));
        // Untouched months agree with the calendar mapping
        for month in [1, 3, 4, 6, 7, 8, 10, 12] {
            assert_eq!(shift.season_for(month), MonthShift::Calendar.season_for(month));
        }
    }

    #[test]
    fn test_parse_month_shift() {
        assert_eq!("legacy".parse::<MonthShift>(), Ok(MonthShift::Legacy));
        assert_eq!(" Calendar ".parse::<MonthShift>(), Ok(MonthShift::Calendar));
        assert!("shifted".parse::<MonthShift>().is_err());
    }

    #[test]
    fn test_season_serializes_with_hyphen() {
        assert_eq!(serde_json::to_string(&Season::PreMonsoon).unwrap(), "\"Pre-Monsoon\"");
        assert_eq!(Season::PostMonsoon.to_string(), "Post-Monsoon");
    }
}
