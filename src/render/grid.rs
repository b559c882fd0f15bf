use crate::layout::week_start_for;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Month laid out as week rows of seven cells; cells outside the month are `None`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub week_start: Weekday,
    pub weeks: Vec<[Option<NaiveDate>; 7]>,
}

impl MonthGrid {
    pub fn new(year: i32, month: u32, week_start: Weekday) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let mut row_start = week_start_for(first, week_start);
        let mut weeks = Vec::new();

        while row_start.month() == month || row_start < first {
            let mut row = [None; 7];
            for (column, cell) in row.iter_mut().enumerate() {
                let day = row_start + Duration::days(column as i64);
                if day.month() == month && day.year() == year {
                    *cell = Some(day);
                }
            }
            weeks.push(row);
            row_start += Duration::days(7);
        }

        Some(Self {
            year,
            month,
            week_start,
            weeks,
        })
    }

    /// Every day of the month with its (row, column) cell
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, NaiveDate)> + '_ {
        self.weeks.iter().enumerate().flat_map(|(row, week)| {
            week.iter()
                .enumerate()
                .filter_map(move |(column, day)| day.map(|day| (row, column, day)))
        })
    }
}
