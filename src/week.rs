use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};

use crate::domain::{Course, Selection, activities_on};

pub const WEEKDAYS: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];
const WEEKDAY_NAMES: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Hour-by-weekday table. The first row is the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekGrid {
    pub rows: Vec<Vec<String>>,
}

impl WeekGrid {
    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    pub fn body(&self) -> &[Vec<String>] {
        &self.rows[1..]
    }

    /// Cell text for `weekday` in the row labelled `label` (`HH:MM`).
    #[cfg(test)]
    pub fn cell(&self, label: &str, weekday: Weekday) -> Option<&str> {
        let column = WEEKDAYS.iter().position(|day| *day == weekday)? + 1;
        self.body()
            .iter()
            .find(|row| row[0] == label)
            .map(|row| row[column].as_str())
    }
}

/// Monday to Friday of the week containing `date`.
pub fn week_dates(date: NaiveDate) -> [NaiveDate; 5] {
    let offset = i64::from(date.weekday().num_days_from_monday());
    WEEKDAYS.map(|day| date + Duration::days(i64::from(day.num_days_from_monday()) - offset))
}

/// Builds the week table, or `None` when nothing happens that week.
pub fn build_week_grid(date: NaiveDate, courses: &[Course], selection: &Selection) -> Option<WeekGrid> {
    let activities = week_dates(date)
        .into_iter()
        .flat_map(|day| activities_on(courses, day, selection))
        .collect::<Vec<_>>();

    let earliest = activities.iter().map(|(_, activity)| activity.start.hour()).min()?;
    let latest = activities
        .iter()
        .map(|(_, activity)| hour_ceiling(activity.end))
        .max()?;

    let mut cells: HashMap<(Weekday, u32), Vec<String>> = HashMap::new();
    for (course, activity) in &activities {
        for hour in activity.start.hour()..activity.end.hour() {
            cells
                .entry((activity.weekday, hour))
                .or_default()
                .push(format!("{} {}", course.title, activity.name));
        }
    }

    let mut rows = Vec::with_capacity(latest.saturating_sub(earliest) as usize + 1);
    let mut header = vec![String::new()];
    header.extend(WEEKDAY_NAMES.iter().map(|name| name.to_string()));
    rows.push(header);

    for hour in earliest..latest {
        let mut row = vec![format!("{hour:02}:00")];
        for weekday in WEEKDAYS {
            row.push(
                cells
                    .get(&(weekday, hour))
                    .map(|entries| entries.join("\n"))
                    .unwrap_or_default(),
            );
        }
        rows.push(row);
    }

    Some(WeekGrid { rows })
}

fn hour_ceiling(time: NaiveTime) -> u32 {
    if time.minute() > 0 || time.second() > 0 {
        time.hour() + 1
    } else {
        time.hour()
    }
}
