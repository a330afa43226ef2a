use std::collections::{BTreeMap, HashMap};
use std::env;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use crossterm::style::Color;
use serde::Deserialize;

use crate::domain::{Course, Selection};

pub const CONFIG_DIR_VAR: &str = "TIMETABLE_CONFIG_PATH";
const CONFIG_FILE: &str = "config.toml";
const CACHE_FILE: &str = "data.json";

#[derive(Debug)]
pub enum ConfigError {
	MissingDirectory,
	Io(PathBuf, std::io::Error),
	TomlDecode(toml::de::Error),
	Invalid(String),
}

impl Display for ConfigError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ConfigError::MissingDirectory => {
				write!(f, "{CONFIG_DIR_VAR} is not set; point it at your timetable config directory")
			}
			ConfigError::Io(path, err) => write!(f, "failed to read {}: {err}", path.display()),
			ConfigError::TomlDecode(err) => write!(f, "failed to parse config: {err}"),
			ConfigError::Invalid(reason) => write!(f, "invalid config: {reason}"),
		}
	}
}

impl std::error::Error for ConfigError {}

/// Files living under the config directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
	pub root: PathBuf,
	pub config_file: PathBuf,
	pub cache_file: PathBuf,
}

impl ConfigPaths {
	pub fn new(root: PathBuf) -> Self {
		Self {
			config_file: root.join(CONFIG_FILE),
			cache_file: root.join(CACHE_FILE),
			root,
		}
	}

	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_var(env::var_os(CONFIG_DIR_VAR))
	}

	/// An unset or empty directory variable is an error.
	fn from_var(value: Option<OsString>) -> Result<Self, ConfigError> {
		match value {
			Some(path) if !path.is_empty() => Ok(Self::new(PathBuf::from(path))),
			_ => Err(ConfigError::MissingDirectory),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
	#[serde(default)]
	courses: BTreeMap<String, RawCourse>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCourse {
	year: i32,
	semester: u8,
	colour: Option<String>,
	#[serde(default)]
	select: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseConfig {
	pub title: String,
	pub year: i32,
	pub semester: u8,
	pub colour: Option<Color>,
	pub select: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
	pub courses: Vec<CourseConfig>,
}

impl Config {
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let raw = fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
		Self::parse(&raw)
	}

	pub fn parse(raw: &str) -> Result<Self, ConfigError> {
		let parsed: RawConfig = toml::from_str(raw).map_err(ConfigError::TomlDecode)?;
		let mut courses = Vec::new();
		for (title, course) in parsed.courses {
			courses.push(validate_course(title, course)?);
		}
		Ok(Self { courses })
	}

	/// Empty courses for every configured title, ready to be fetched.
	pub fn courses(&self) -> Vec<Course> {
		self.courses
			.iter()
			.map(|course| Course::new(course.title.clone(), course.year, course.semester))
			.collect()
	}

	pub fn selection(&self) -> Selection {
		let mut selection = Selection::new();
		for course in &self.courses {
			for (activity, group) in &course.select {
				selection.choose(course.title.clone(), activity.clone(), *group);
			}
		}
		selection
	}

	pub fn colours(&self) -> Colours {
		let mut colours = Colours::default();
		for course in &self.courses {
			if let Some(colour) = course.colour {
				colours.set(course.title.clone(), colour);
			}
		}
		colours
	}
}

fn validate_course(title: String, course: RawCourse) -> Result<CourseConfig, ConfigError> {
	if !(1..=2).contains(&course.semester) {
		return Err(ConfigError::Invalid(format!(
			"course {title}: semester must be 1 or 2, got {}",
			course.semester
		)));
	}

	if let Some((activity, _)) = course.select.iter().find(|(_, group)| **group == 0) {
		return Err(ConfigError::Invalid(format!(
			"course {title}: selected activity for {activity:?} must be greater than zero"
		)));
	}

	let colour = match course.colour.as_deref() {
		None => None,
		Some(name) => colour_from_name(name)
			.ok_or_else(|| ConfigError::Invalid(format!("course {title}: unknown colour {name:?}")))?,
	};

	Ok(CourseConfig {
		title,
		year: course.year,
		semester: course.semester,
		colour,
		select: course.select,
	})
}

/// Display colour per course title.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Colours(HashMap<String, Color>);

impl Colours {
	pub fn of(&self, title: &str) -> Option<Color> {
		self.0.get(title).copied()
	}

	pub fn set(&mut self, title: impl Into<String>, colour: Color) {
		self.0.insert(title.into(), colour);
	}
}

/// `Some(None)` is the explicit "no colour" choice.
fn colour_from_name(name: &str) -> Option<Option<Color>> {
	let colour = match name.to_ascii_lowercase().as_str() {
		"none" => None,
		"black" => Some(Color::Black),
		"red" => Some(Color::DarkRed),
		"green" => Some(Color::DarkGreen),
		"yellow" => Some(Color::DarkYellow),
		"blue" => Some(Color::DarkBlue),
		"magenta" => Some(Color::DarkMagenta),
		"cyan" => Some(Color::DarkCyan),
		"gray" => Some(Color::Grey),
		"dark_gray" => Some(Color::DarkGrey),
		"light_red" => Some(Color::Red),
		"light_green" => Some(Color::Green),
		"light_yellow" => Some(Color::Yellow),
		"light_blue" => Some(Color::Blue),
		"light_magenta" => Some(Color::Magenta),
		"light_cyan" => Some(Color::Cyan),
		"white" => Some(Color::White),
		_ => return None,
	};
	Some(colour)
}
