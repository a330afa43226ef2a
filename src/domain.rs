use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Identifies one offering of an activity slot.
///
/// The timetable service numbers alternative offerings of the same slot
/// `01`, `02`, ... and labels ad-hoc sub-allocations `01-P1`. Only `group`
/// takes part in selection; every part of the chosen group is attended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityId {
    pub group: u32,
    pub part: Option<u32>,
}

impl ActivityId {
    pub fn new(group: u32, part: Option<u32>) -> Self {
        Self { group, part }
    }
}

impl FromStr for ActivityId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (group, rest) = split_leading_number(raw)
            .ok_or_else(|| format!("{raw:?} is not a valid activity id"))?;
        let part = rest
            .strip_prefix("-P")
            .and_then(split_leading_number)
            .map(|(part, _)| part);
        Ok(Self::new(group, part))
    }
}

impl Display for ActivityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}", self.group)?;
        if let Some(part) = self.part {
            write!(f, "-P{part}")?;
        }
        Ok(())
    }
}

fn split_leading_number(raw: &str) -> Option<(u32, &str)> {
    let digits = raw.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let number = raw[..digits].parse().ok()?;
    Some((number, &raw[digits..]))
}

/// Inclusive range of dates. A single-day window has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub place: String,
    /// Empty means the location applies on every date.
    #[serde(default)]
    pub windows: Vec<DateWindow>,
}

impl Location {
    pub fn new(place: impl Into<String>, windows: Vec<DateWindow>) -> Self {
        Self {
            place: place.into(),
            windows,
        }
    }

    pub fn everywhen(place: impl Into<String>) -> Self {
        Self::new(place, Vec::new())
    }

    pub fn valid_for(&self, date: NaiveDate) -> bool {
        self.windows.is_empty() || self.windows.iter().any(|window| window.contains(date))
    }

    /// Last day this location was valid strictly before `date`.
    fn last_valid_before(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.windows
            .iter()
            .map(|window| window.end)
            .filter(|end| *end < date)
            .max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub locations: Vec<Location>,
}

impl Activity {
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        self.weekday == date.weekday()
    }

    /// Picks the location that applies on `date`.
    ///
    /// The first location whose windows contain `date` wins. When none do,
    /// the location that was valid most recently before `date` is used, and
    /// failing that the first declared one, so rendering never stalls on
    /// incomplete room data. `None` only when there are no locations at all.
    pub fn location_valid_for(&self, date: NaiveDate) -> Option<&Location> {
        if let Some(location) = self.locations.iter().find(|location| location.valid_for(date)) {
            return Some(location);
        }

        let mut latest: Option<(NaiveDate, &Location)> = None;
        for location in &self.locations {
            if let Some(end) = location.last_valid_before(date) {
                if latest.is_none_or(|(best, _)| end > best) {
                    latest = Some((end, location));
                }
            }
        }

        latest
            .map(|(_, location)| location)
            .or_else(|| self.locations.first())
    }

    pub fn place_on(&self, date: NaiveDate) -> &str {
        self.location_valid_for(date)
            .map(|location| location.place.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub year: i32,
    pub semester: u8,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Course {
    pub fn new(title: impl Into<String>, year: i32, semester: u8) -> Self {
        Self {
            title: title.into(),
            year,
            semester,
            activities: Vec::new(),
        }
    }

    /// Lowest group offered for the slot called `name`.
    fn default_group(&self, name: &str) -> Option<u32> {
        self.activities
            .iter()
            .filter(|activity| activity.name == name)
            .map(|activity| activity.id.group)
            .min()
    }
}

/// Which offering the user attends, per (course title, activity name) slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    choices: HashMap<(String, String), u32>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choose(&mut self, course: impl Into<String>, activity: impl Into<String>, group: u32) {
        self.choices.insert((course.into(), activity.into()), group);
    }

    pub fn chosen(&self, course: &str, activity: &str) -> Option<u32> {
        self.choices
            .get(&(course.to_string(), activity.to_string()))
            .copied()
    }

    fn keeps(&self, course: &Course, activity: &Activity) -> bool {
        let group = self
            .chosen(&course.title, &activity.name)
            .or_else(|| course.default_group(&activity.name))
            .unwrap_or(activity.id.group);
        activity.id.group == group
    }
}

/// All attended activities on `date`, ordered by start time then course title.
pub fn activities_on<'a>(
    courses: &'a [Course],
    date: NaiveDate,
    selection: &Selection,
) -> Vec<(&'a Course, &'a Activity)> {
    let mut activities = courses
        .iter()
        .flat_map(|course| course.activities.iter().map(move |activity| (course, activity)))
        .filter(|(course, activity)| activity.occurs_on(date) && selection.keeps(course, activity))
        .collect::<Vec<_>>();

    activities.sort_by(|left, right| {
        left.1
            .start
            .cmp(&right.1.start)
            .then_with(|| left.0.title.cmp(&right.0.title))
    });
    activities
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

    use super::{
        Activity, ActivityId, Course, DateWindow, Location, Selection, activities_on,
        format_duration,
    };

    pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    pub(crate) fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    pub(crate) fn activity(
        group: u32,
        name: &str,
        weekday: Weekday,
        start: (u32, u32),
        end: (u32, u32),
        place: &str,
    ) -> Activity {
        Activity {
            id: ActivityId::new(group, None),
            name: name.to_string(),
            weekday,
            start: time(start.0, start.1),
            end: time(end.0, end.1),
            locations: vec![Location::everywhen(place)],
        }
    }

    pub(crate) fn course(title: &str, activities: Vec<Activity>) -> Course {
        let mut course = Course::new(title, 2018, 1);
        course.activities = activities;
        course
    }

    fn with_locations(locations: Vec<Location>) -> Activity {
        let mut act = activity(1, "Lecture A", Weekday::Mon, (9, 0), (10, 0), "unused");
        act.locations = locations;
        act
    }

    #[test]
    fn parses_plain_and_partial_ids() {
        assert_eq!("01".parse::<ActivityId>(), Ok(ActivityId::new(1, None)));
        assert_eq!("02-P3".parse::<ActivityId>(), Ok(ActivityId::new(2, Some(3))));
        assert_eq!("1".parse::<ActivityId>().map(|id| id.to_string()), Ok("01".to_string()));
        assert!("P1".parse::<ActivityId>().is_err());
    }

    #[test]
    fn keeps_only_activities_on_the_requested_weekday() {
        let courses = vec![course(
            "COSC262",
            vec![
                activity(1, "Lecture A", Weekday::Mon, (9, 0), (10, 0), "E8"),
                activity(1, "Lecture B", Weekday::Wed, (9, 0), (10, 0), "E8"),
            ],
        )];
        let monday = date(2018, 3, 5);

        let found = activities_on(&courses, monday, &Selection::new());
        assert_eq!(found.len(), 1);
        assert!(found.iter().all(|(_, act)| act.weekday == monday.weekday()));
        assert!(activities_on(&courses, date(2018, 3, 6), &Selection::new()).is_empty());
    }

    #[test]
    fn selection_overrides_default_offering() {
        let courses = vec![course(
            "COSC262",
            vec![
                activity(1, "Lab A", Weekday::Mon, (9, 0), (10, 0), "Lab 1"),
                activity(2, "Lab A", Weekday::Mon, (11, 0), (12, 0), "Lab 2"),
                activity(1, "Lecture A", Weekday::Mon, (13, 0), (14, 0), "C1"),
            ],
        )];
        let monday = date(2018, 3, 5);

        let defaults = activities_on(&courses, monday, &Selection::new());
        let names = defaults
            .iter()
            .map(|(_, act)| (act.name.as_str(), act.id.group))
            .collect::<Vec<_>>();
        assert_eq!(names, vec![("Lab A", 1), ("Lecture A", 1)]);

        let mut selection = Selection::new();
        selection.choose("COSC262", "Lab A", 2);
        let picked = activities_on(&courses, monday, &selection);
        assert!(
            picked
                .iter()
                .all(|(_, act)| act.name != "Lab A" || act.id.group == 2)
        );
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn lone_offering_is_kept_even_when_not_numbered_one() {
        let courses = vec![course(
            "MATH101",
            vec![activity(3, "Tutorial", Weekday::Fri, (15, 0), (16, 0), "Room 3")],
        )];
        let friday = date(2018, 3, 9);
        assert_eq!(activities_on(&courses, friday, &Selection::new()).len(), 1);
    }

    #[test]
    fn orders_by_start_then_title_and_is_repeatable() {
        let courses = vec![
            course("ZOOL101", vec![activity(1, "Lecture", Weekday::Tue, (9, 0), (10, 0), "A")]),
            course("ACCT101", vec![activity(1, "Lecture", Weekday::Tue, (9, 0), (10, 0), "B")]),
            course("BIOL101", vec![activity(1, "Lecture", Weekday::Tue, (8, 0), (9, 0), "C")]),
        ];
        let tuesday = date(2018, 3, 6);

        let first = activities_on(&courses, tuesday, &Selection::new());
        let titles = first
            .iter()
            .map(|(course, _)| course.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["BIOL101", "ACCT101", "ZOOL101"]);
        assert_eq!(first, activities_on(&courses, tuesday, &Selection::new()));
    }

    #[test]
    fn resolves_location_whose_window_contains_the_date() {
        let act = with_locations(vec![
            Location::new("Jack Erskine 244", vec![DateWindow::new(date(2018, 2, 27), date(2018, 3, 27))]),
            Location::new("Ernest Rutherford 140", vec![DateWindow::new(date(2018, 4, 24), date(2018, 5, 29))]),
        ]);

        let place = act.location_valid_for(date(2018, 4, 30)).map(|l| l.place.as_str());
        assert_eq!(place, Some("Ernest Rutherford 140"));
    }

    #[test]
    fn falls_back_to_last_known_location() {
        let act = with_locations(vec![
            Location::new("Early", vec![DateWindow::new(date(2018, 2, 1), date(2018, 2, 10))]),
            Location::new("Later", vec![DateWindow::new(date(2018, 3, 1), date(2018, 3, 10))]),
            Location::new("Future", vec![DateWindow::new(date(2018, 6, 1), date(2018, 6, 10))]),
        ]);

        let place = act.location_valid_for(date(2018, 4, 1)).map(|l| l.place.as_str());
        assert_eq!(place, Some("Later"));
    }

    #[test]
    fn falls_back_to_first_location_when_nothing_precedes() {
        let act = with_locations(vec![
            Location::new("First", vec![DateWindow::day(date(2018, 6, 1))]),
            Location::new("Second", vec![DateWindow::day(date(2018, 7, 1))]),
        ]);

        let place = act.location_valid_for(date(2018, 1, 1)).map(|l| l.place.as_str());
        assert_eq!(place, Some("First"));
        assert_eq!(with_locations(Vec::new()).location_valid_for(date(2018, 1, 1)), None);
    }

    #[test]
    fn overlapping_windows_resolve_in_declaration_order() {
        let window = DateWindow::new(date(2018, 3, 1), date(2018, 3, 31));
        let act = with_locations(vec![
            Location::new("Declared first", vec![window]),
            Location::new("Declared second", vec![window]),
        ]);

        for offset in 0..60 {
            let day = date(2018, 2, 15) + Duration::days(offset);
            let resolved = act.location_valid_for(day).expect("location should resolve");
            assert!(act.locations.contains(resolved));
        }
        let place = act.location_valid_for(date(2018, 3, 15)).map(|l| l.place.as_str());
        assert_eq!(place, Some("Declared first"));
    }

    #[test]
    fn formats_durations_as_clock() {
        assert_eq!(format_duration(Duration::minutes(245)), "04:05:00");
        assert_eq!(format_duration(Duration::seconds(-5)), "00:00:00");
    }
}
