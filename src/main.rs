mod commands;
mod config;
mod domain;
mod render;
mod source;
mod storage;
mod timeline;
mod views;
mod week;

use std::error::Error;
use std::io::{self, ErrorKind, Write};

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{Context, load_courses, show_day, show_next, show_week};
use crate::config::{Config, ConfigPaths};
use crate::source::{CourseSource, UcCourseSource};
use crate::storage::save_cache;

#[derive(Debug, Parser)]
#[command(name = "timetable", version, about = "Print, display, and manage your UC timetable")]
struct Cli {
	/// Be more verbose.
	#[arg(short, long, global = true)]
	verbose: bool,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Show the timetable for a day.
	Show {
		/// Show the timetable for this date (YYYY-MM-DD).
		#[arg(long, value_parser = parse_date)]
		on: Option<NaiveDate>,
		/// Drop the current data file and download it again.
		#[arg(long)]
		drop_cache: bool,
		/// Show your timetable in a fancy timeline.
		#[arg(short, long)]
		timeline: bool,
	},
	/// Show the timetable for a whole week.
	Week {
		#[arg(long, value_parser = parse_date)]
		on: Option<NaiveDate>,
		#[arg(long)]
		drop_cache: bool,
	},
	/// Show the next class today.
	Next {
		/// Show the time left until the next class.
		#[arg(long)]
		time: bool,
		#[arg(long)]
		drop_cache: bool,
	},
}

impl Command {
	fn drop_cache(&self) -> bool {
		match self {
			Command::Show { drop_cache, .. }
			| Command::Week { drop_cache, .. }
			| Command::Next { drop_cache, .. } => *drop_cache,
		}
	}
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	let paths = ConfigPaths::from_env()?;
	let source = UcCourseSource::new();
	let now = Local::now().naive_local();
	let mut stdout = io::stdout().lock();
	execute(&cli, &paths, &source, now, &mut stdout)
}

/// Loads config and courses, prints the chosen view, then rewrites the cache.
fn execute(
	cli: &Cli,
	paths: &ConfigPaths,
	source: &dyn CourseSource,
	now: NaiveDateTime,
	out: &mut dyn Write,
) -> Result<(), Box<dyn Error>> {
	debug!(root = %paths.root.display(), "using config directory");
	let config = match Config::load(&paths.config_file) {
		Ok(config) => config,
		Err(err) if cli.verbose => return Err(err.into()),
		Err(_) => return Err("failed to parse config (rerun with -v for details)".into()),
	};

	let courses = load_courses(&config, &paths.cache_file, cli.command.drop_cache(), source)?;
	let context = Context::new(&config, courses);

	let printed = match &cli.command {
		Command::Show { on, timeline, .. } => show_day(&context, on.unwrap_or(now.date()), *timeline, out),
		Command::Week { on, .. } => show_week(&context, on.unwrap_or(now.date()), out),
		Command::Next { time, .. } => show_next(&context, now, *time, out),
	};
	match printed {
		Err(err) if err.kind() == ErrorKind::BrokenPipe => debug!("stdout closed before the view was printed"),
		result => result?,
	}

	save_cache(&paths.cache_file, &context.courses)?;
	Ok(())
}

fn init_tracing(verbose: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.try_init();
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
	NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}
