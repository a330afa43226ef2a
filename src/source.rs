use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime, Weekday};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::domain::{Activity, ActivityId, Course, DateWindow, Location};

pub const UC_COURSE_URL: &str = "http://www.canterbury.ac.nz/courseinfo/GetCourseDetails.aspx";

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(?is)<table[^>]*\bid\s*=\s*["']?RepeatTable\b[^>]*>(.*?)</table>"#).expect("table pattern")
});
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<tr\b([^>]*)>(.*?)</tr>").expect("row pattern"));
static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(?is)<td\b[^>]*\bdata-title\s*=\s*["']?([A-Za-z]+)["']?[^>]*>(.*?)</td>"#).expect("cell pattern")
});
static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("break pattern"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));

#[derive(Debug)]
pub enum FetchError {
	Http(String, reqwest::Error),
	Parse(String, String),
}

impl Display for FetchError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			FetchError::Http(course, err) => write!(f, "failed to download {course}: {err}"),
			FetchError::Parse(course, reason) => write!(f, "failed to read timetable for {course}: {reason}"),
		}
	}
}

impl std::error::Error for FetchError {}

/// Supplies the activities of a course.
pub trait CourseSource {
	fn fetch_activities(&self, course: &Course) -> Result<Vec<Activity>, FetchError>;
}

/// Replaces the activities of every course with freshly fetched ones.
pub fn refresh_courses(source: &dyn CourseSource, courses: &mut [Course]) -> Result<(), FetchError> {
	for course in courses.iter_mut() {
		info!(course = %course.title, "fetching activities");
		course.activities = source.fetch_activities(course)?;
		debug!(course = %course.title, activities = course.activities.len(), "fetched activities");
	}
	Ok(())
}

/// Scrapes University of Canterbury course-details pages.
pub struct UcCourseSource {
	client: reqwest::blocking::Client,
	base_url: String,
}

impl UcCourseSource {
	pub fn new() -> Self {
		Self::with_base_url(UC_COURSE_URL)
	}

	pub fn with_base_url(base_url: impl Into<String>) -> Self {
		Self {
			client: reqwest::blocking::Client::new(),
			base_url: base_url.into(),
		}
	}

	pub fn course_url(&self, course: &Course) -> String {
		// Occurrence codes look like 18S1(C) for semester one of 2018.
		let occurrence = format!("{:02}S{}(C)", course.year.rem_euclid(100), course.semester);
		format!(
			"{}?course={}&occurrence={}&year={}",
			self.base_url, course.title, occurrence, course.year
		)
	}
}

impl CourseSource for UcCourseSource {
	fn fetch_activities(&self, course: &Course) -> Result<Vec<Activity>, FetchError> {
		let url = self.course_url(course);
		debug!(%url, "requesting course page");
		let page = self
			.client
			.get(&url)
			.send()
			.and_then(|response| response.error_for_status())
			.and_then(|response| response.text())
			.map_err(|err| FetchError::Http(course.title.clone(), err))?;
		parse_course_page(course.year, &page).map_err(|reason| FetchError::Parse(course.title.clone(), reason))
	}
}

/// Extracts activities from the `RepeatTable` of a course page.
///
/// Rows with the `datarow` class are activities; any other row with text
/// names the slot the following activities belong to.
pub fn parse_course_page(year: i32, page: &str) -> Result<Vec<Activity>, String> {
	let Some(table) = TABLE_RE.captures(page).and_then(|captures| captures.get(1)) else {
		warn!("course page has no activity table");
		return Ok(Vec::new());
	};

	let mut activities = Vec::new();
	let mut slot: Option<String> = None;
	for row in ROW_RE.captures_iter(table.as_str()) {
		let attributes = row.get(1).map(|m| m.as_str()).unwrap_or("");
		let body = row.get(2).map(|m| m.as_str()).unwrap_or("");
		if attributes.contains("datarow") {
			let name = slot
				.as_deref()
				.ok_or_else(|| "activity row appears before any activity heading".to_string())?;
			activities.push(parse_activity_row(year, name, body)?);
		} else {
			let heading = html_text(body);
			if !heading.is_empty() {
				slot = Some(heading.replace('\n', " "));
			}
		}
	}

	Ok(activities)
}

fn parse_activity_row(year: i32, name: &str, body: &str) -> Result<Activity, String> {
	let cells = CELL_RE
		.captures_iter(body)
		.map(|cell| (cell[1].to_ascii_lowercase(), html_text(&cell[2])))
		.collect::<HashMap<_, _>>();
	let cell = |title: &str| {
		cells
			.get(title)
			.map(String::as_str)
			.ok_or_else(|| format!("{name}: missing {title} column"))
	};

	let id = cell("activity")?.parse::<ActivityId>()?;
	let day = cell("day")?;
	let weekday = day
		.parse::<Weekday>()
		.map_err(|_| format!("{name} {id}: unknown day {day:?}"))?;
	let (start, end) = parse_time_range(cell("time")?).ok_or_else(|| format!("{name} {id}: bad time range"))?;
	if start >= end {
		return Err(format!("{name} {id}: activity ends before it starts"));
	}
	let locations: Vec<Location> = cells
		.get("location")
		.map(|text| {
			text.lines()
				.map(str::trim)
				.filter(|line| !line.is_empty())
				.map(|line| parse_location(year, line))
				.collect()
		})
		.unwrap_or_default();

	Ok(Activity {
		id,
		name: name.to_string(),
		weekday,
		start,
		end,
		locations,
	})
}

fn parse_time_range(raw: &str) -> Option<(NaiveTime, NaiveTime)> {
	let (start, end) = raw.trim().split_once('-')?;
	let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
	let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
	Some((start, end))
}

/// Parses `Jack Erskine 244 (27/2-27/3, 24/4-29/5)` style locations.
///
/// Dates are `d/m` in `year`. Without a parenthesised date list, or when the
/// list cannot be read, the whole text is the place and it is always valid.
pub fn parse_location(year: i32, raw: &str) -> Location {
	let raw = raw.trim();
	let Some(open) = raw.rfind('(') else {
		return Location::everywhen(raw);
	};

	let place = raw[..open].trim();
	let dates = raw[open + 1..].trim_end_matches(')');
	let windows = dates
		.split(',')
		.map(|interval| parse_interval(year, interval))
		.collect::<Option<Vec<_>>>();

	match windows {
		Some(windows) if !windows.is_empty() => Location::new(place, windows),
		_ => {
			debug!(location = raw, "location has no readable dates");
			Location::everywhen(raw)
		}
	}
}

fn parse_interval(year: i32, raw: &str) -> Option<DateWindow> {
	match raw.split_once('-') {
		Some((start, end)) => Some(DateWindow::new(parse_day_month(year, start)?, parse_day_month(year, end)?)),
		None => parse_day_month(year, raw).map(DateWindow::day),
	}
}

fn parse_day_month(year: i32, raw: &str) -> Option<NaiveDate> {
	let (day, month) = raw.trim().split_once('/')?;
	NaiveDate::from_ymd_opt(year, month.trim().parse().ok()?, day.trim().parse().ok()?)
}

fn html_text(fragment: &str) -> String {
	let with_breaks = BREAK_RE.replace_all(fragment, "\n");
	let stripped = TAG_RE.replace_all(&with_breaks, "");
	let decoded = stripped
		.replace("&nbsp;", " ")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&amp;", "&");
	decoded
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.collect::<Vec<_>>()
		.join("\n")
}
