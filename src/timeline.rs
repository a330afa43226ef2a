use chrono::NaiveDate;

use crate::domain::{Activity, Course};
use crate::views::clock;

/// Box height in layout units: five text lines of five units each.
pub const BOX_HEIGHT: usize = 25;
/// Layout units per character of the longest label.
pub const UNITS_PER_CHAR: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineBox {
    pub lines: Vec<String>,
    pub width: usize,
    pub height: usize,
}

/// Boxes bucketed by `HH:MM` start time, in the order the times first appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineLayout {
    pub buckets: Vec<(String, Vec<TimelineBox>)>,
}

impl TimelineLayout {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn push(&mut self, key: String, entry: TimelineBox) {
        match self.buckets.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, boxes)) => boxes.push(entry),
            None => self.buckets.push((key, vec![entry])),
        }
    }
}

/// Lays out one box per activity, all sharing the width of the longest label.
pub fn layout_timeline(date: NaiveDate, activities: &[(&Course, &Activity)]) -> TimelineLayout {
    let resolved = activities
        .iter()
        .map(|(course, activity)| (*course, *activity, activity.place_on(date)))
        .collect::<Vec<_>>();

    let longest = resolved
        .iter()
        .flat_map(|(course, activity, place)| {
            [course.title.as_str(), activity.name.as_str(), *place]
        })
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0);
    let width = longest * UNITS_PER_CHAR;

    let mut layout = TimelineLayout::default();
    for (course, activity, place) in resolved {
        let lines = vec![
            course.title.clone(),
            String::new(),
            activity.name.clone(),
            place.to_string(),
            clock(activity.end),
        ];
        layout.push(
            clock(activity.start),
            TimelineBox {
                lines,
                width,
                height: BOX_HEIGHT,
            },
        );
    }
    layout
}
