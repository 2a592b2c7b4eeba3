//! Calendar quarters, the forecasting period of this market.

use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar quarter, e.g. `2024-Q3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    year: i32,
    quarter: u32,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid quarter label '{0}', expected YYYY-Qn")]
pub struct QuarterParseError(pub String);

impl Quarter {
    pub fn new(year: i32, quarter: u32) -> Self {
        assert!((1..=4).contains(&quarter), "quarter must be 1..=4");
        Self { year, quarter }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    /// First day of the quarter (Q1=Jan, Q2=Apr, Q3=Jul, Q4=Oct).
    pub fn start_date(&self) -> NaiveDate {
        let month = (self.quarter - 1) * 3 + 1;
        NaiveDate::from_ymd_opt(self.year, month, 1).expect("valid quarter start")
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self { year: self.year + 1, quarter: 1 }
        } else {
            Self { year: self.year, quarter: self.quarter + 1 }
        }
    }

    /// The `n` quarters strictly after `self`, in order.
    pub fn next_quarters(&self, n: usize) -> Vec<Quarter> {
        let mut out = Vec::with_capacity(n);
        let mut q = *self;
        for _ in 0..n {
            q = q.next();
            out.push(q);
        }
        out
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

impl FromStr for Quarter {
    type Err = QuarterParseError;

    /// Accepts `2024-Q3` and the compact `2024Q3` wire form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || QuarterParseError(s.to_string());
        let (year_part, quarter_part) = s
            .split_once(['Q', 'q'])
            .ok_or_else(err)?;
        let year: i32 = year_part.trim_end_matches('-').parse().map_err(|_| err())?;
        let quarter: u32 = quarter_part.parse().map_err(|_| err())?;
        if !(1..=4).contains(&quarter) {
            return Err(err());
        }
        Ok(Self { year, quarter })
    }
}

impl Serialize for Quarter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quarter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
