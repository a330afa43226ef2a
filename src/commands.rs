use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::config::{Colours, Config};
use crate::domain::{Course, Selection, activities_on, format_duration};
use crate::render::{render_timeline, render_week};
use crate::source::{CourseSource, refresh_courses};
use crate::storage::load_cache;
use crate::timeline::layout_timeline;
use crate::views::{find_next, format_activity, format_day, time_until};
use crate::week::build_week_grid;

/// Everything a view needs for one run.
pub struct Context {
	pub colours: Colours,
	pub courses: Vec<Course>,
	pub selection: Selection,
}

impl Context {
	pub fn new(config: &Config, courses: Vec<Course>) -> Self {
		Self {
			colours: config.colours(),
			selection: config.selection(),
			courses,
		}
	}
}

/// Uses the cached courses unless there are none or a refresh is forced.
pub fn load_courses(
	config: &Config,
	cache_file: &Path,
	drop_cache: bool,
	source: &dyn CourseSource,
) -> Result<Vec<Course>, Box<dyn Error>> {
	if !drop_cache {
		if let Some(courses) = load_cache(cache_file)? {
			debug!(courses = courses.len(), "using cached courses");
			return Ok(courses);
		}
	}

	info!(drop_cache, "refreshing course data");
	let mut courses = config.courses();
	refresh_courses(source, &mut courses)?;
	Ok(courses)
}

pub fn show_day(context: &Context, date: NaiveDate, timeline: bool, out: &mut dyn Write) -> io::Result<()> {
	let activities = activities_on(&context.courses, date, &context.selection);
	writeln!(out, "Showing timetable for {}", date.format("%A, %Y-%m-%d"))?;

	let lines = if timeline {
		render_timeline(&layout_timeline(date, &activities))
	} else {
		format_day(&context.colours, date, &activities)
	};
	for line in lines {
		writeln!(out, "{line}")?;
	}
	Ok(())
}

pub fn show_week(context: &Context, date: NaiveDate, out: &mut dyn Write) -> io::Result<()> {
	writeln!(out, "Showing timetable for {}", date.format("week %U of %Y"))?;
	let Some(grid) = build_week_grid(date, &context.courses, &context.selection) else {
		return Ok(());
	};
	for line in render_week(&grid) {
		writeln!(out, "{line}")?;
	}
	Ok(())
}

pub fn show_next(context: &Context, now: NaiveDateTime, countdown: bool, out: &mut dyn Write) -> io::Result<()> {
	let Some((course, activity)) = find_next(&context.courses, now, &context.selection) else {
		debug!("no more activities today");
		return Ok(());
	};

	if countdown {
		writeln!(out, "{}", format_duration(time_until(activity, now)))
	} else {
		writeln!(out, "{}", format_activity(&context.colours, now.date(), course, activity))
	}
}
