use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use crossterm::style::Stylize;

use crate::config::Colours;
use crate::domain::{Activity, Course, Selection, activities_on};

pub fn clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// One line of the day view: `09:00 - 10:00 :: COSC262 Lecture A @ E8`.
pub fn format_activity(colours: &Colours, date: NaiveDate, course: &Course, activity: &Activity) -> String {
    let title = match colours.of(&course.title) {
        Some(colour) => course.title.clone().with(colour).to_string(),
        None => course.title.clone(),
    };
    format!(
        "{} - {} :: {title} {} @ {}",
        clock(activity.start),
        clock(activity.end),
        activity.name,
        activity.place_on(date)
    )
}

pub fn format_day(colours: &Colours, date: NaiveDate, activities: &[(&Course, &Activity)]) -> Vec<String> {
    activities
        .iter()
        .map(|(course, activity)| format_activity(colours, date, course, activity))
        .collect()
}

/// First activity today that has not started yet.
pub fn find_next<'a>(
    courses: &'a [Course],
    now: NaiveDateTime,
    selection: &Selection,
) -> Option<(&'a Course, &'a Activity)> {
    activities_on(courses, now.date(), selection)
        .into_iter()
        .find(|(_, activity)| activity.start > now.time())
}

pub fn time_until(activity: &Activity, now: NaiveDateTime) -> Duration {
    now.date().and_time(activity.start) - now
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Weekday};
    use crossterm::style::Color;

    use crate::config::Colours;
    use crate::domain::Selection;
    use crate::domain::tests::{activity, course, date, time};

    use super::{find_next, format_activity, format_day, time_until};

    #[test]
    fn formats_one_line_per_activity() {
        let courses = vec![course(
            "CS101",
            vec![activity(1, "Lecture A", Weekday::Mon, (9, 0), (10, 0), "A1")],
        )];
        let monday = date(2018, 3, 5);
        let pairs = courses
            .iter()
            .flat_map(|course| course.activities.iter().map(move |act| (course, act)))
            .collect::<Vec<_>>();

        let lines = format_day(&Colours::default(), monday, &pairs);
        assert_eq!(lines, vec!["09:00 - 10:00 :: CS101 Lecture A @ A1".to_string()]);
    }

    #[test]
    fn wraps_title_in_configured_colour() {
        let cs101 = course("CS101", vec![activity(1, "Lab", Weekday::Mon, (9, 0), (10, 0), "A1")]);
        let mut colours = Colours::default();
        colours.set("CS101", Color::DarkBlue);

        let line = format_activity(&colours, date(2018, 3, 5), &cs101, &cs101.activities[0]);
        assert!(line.contains("\u{1b}["));
        assert!(line.contains("CS101"));
        assert!(line.ends_with("Lab @ A1"));
    }

    #[test]
    fn finds_first_activity_that_has_not_started() {
        let courses = vec![course(
            "CS101",
            vec![
                activity(1, "Morning", Weekday::Mon, (9, 0), (10, 0), "A1"),
                activity(1, "Afternoon", Weekday::Mon, (14, 0), (15, 0), "A2"),
            ],
        )];
        let monday = date(2018, 3, 5);
        let selection = Selection::new();

        let at_ten = find_next(&courses, monday.and_time(time(10, 0)), &selection);
        assert_eq!(at_ten.map(|(_, act)| act.name.as_str()), Some("Afternoon"));

        let at_three = find_next(&courses, monday.and_time(time(15, 0)), &selection);
        assert!(at_three.is_none());

        let at_nine = find_next(&courses, monday.and_time(time(9, 0)), &selection);
        assert_eq!(at_nine.map(|(_, act)| act.name.as_str()), Some("Afternoon"));
    }

    #[test]
    fn time_until_is_measured_from_now() {
        let act = activity(1, "Afternoon", Weekday::Mon, (14, 0), (15, 0), "A2");
        let now = date(2018, 3, 5).and_time(time(10, 30));
        assert_eq!(time_until(&act, now), Duration::minutes(210));
    }
}
