use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, Widget};

use crate::timeline::{TimelineBox, TimelineLayout};
use crate::week::WeekGrid;

const COLUMN_SPACING: u16 = 3;
// Timeline units are half a column wide and a quarter of a row tall.
const UNITS_PER_COLUMN: usize = 2;
const UNITS_PER_ROW: usize = 4;
const BOX_GAP: u16 = 2;
const DIVIDER: &str = "│";

/// Draws the week table with a bordered frame and returns it line by line.
pub fn render_week(grid: &WeekGrid) -> Vec<String> {
	let header = grid.header();
	let columns = header.len();
	let widths = (0..columns)
		.map(|column| {
			grid.rows
				.iter()
				.map(|row| row.get(column).map(|cell| text_width(cell)).unwrap_or(0))
				.max()
				.unwrap_or(0)
		})
		.map(to_u16)
		.collect::<Vec<_>>();

	let header_height = row_height(header);
	let body_heights = grid.body().iter().map(|row| row_height(row)).collect::<Vec<_>>();

	let width = widths
		.iter()
		.fold(2u16, |total, width| total.saturating_add(*width))
		.saturating_add(COLUMN_SPACING.saturating_mul(to_u16(columns.saturating_sub(1))));
	let height = body_heights
		.iter()
		.fold(header_height.saturating_add(3), |total, height| total.saturating_add(*height));

	let header_row = Row::new(header.iter().map(|cell| cell.as_str()))
		.height(header_height)
		.bottom_margin(1)
		.style(Style::default().add_modifier(Modifier::BOLD));
	let rows = grid
		.body()
		.iter()
		.zip(body_heights)
		.map(|(row, height)| Row::new(row.iter().map(|cell| cell.as_str())).height(height));
	let table = Table::new(rows, widths.iter().map(|width| Constraint::Length(*width)))
		.header(header_row)
		.column_spacing(COLUMN_SPACING)
		.block(Block::default().borders(Borders::ALL));

	let mut buffer = Buffer::empty(Rect::new(0, 0, width, height));
	table.render(buffer.area, &mut buffer);
	buffer_lines(&buffer)
}

/// Draws start-time keys left of a divider and each bucket's boxes in a row.
pub fn render_timeline(layout: &TimelineLayout) -> Vec<String> {
	if layout.is_empty() {
		return Vec::new();
	}

	let key_width = layout
		.buckets
		.iter()
		.map(|(key, _)| text_width(key))
		.max()
		.map(to_u16)
		.unwrap_or(0);
	let divider_x = key_width.saturating_add(1);
	let boxes_x = divider_x.saturating_add(2);

	let mut width = boxes_x;
	let mut height = 0u16;
	for (_, boxes) in &layout.buckets {
		let row_width = boxes.iter().fold(boxes_x, |total, entry| {
			total.saturating_add(box_size(entry).0).saturating_add(BOX_GAP)
		});
		width = width.max(row_width);
		height = height.saturating_add(bucket_height(boxes)).saturating_add(1);
	}

	let mut buffer = Buffer::empty(Rect::new(0, 0, width, height));
	let mut y = 0u16;
	for (key, boxes) in &layout.buckets {
		buffer.set_string(0, y, key, Style::default());
		let mut x = boxes_x;
		for entry in boxes {
			let (columns, rows) = box_size(entry);
			let lines = entry.lines.iter().map(|line| Line::from(line.as_str())).collect::<Vec<_>>();
			Paragraph::new(Text::from(lines))
				.block(Block::default().borders(Borders::ALL))
				.render(Rect::new(x, y, columns, rows), &mut buffer);
			x = x.saturating_add(columns).saturating_add(BOX_GAP);
		}
		y = y.saturating_add(bucket_height(boxes)).saturating_add(1);
	}
	for row in 0..height {
		buffer.set_string(divider_x, row, DIVIDER, Style::default());
	}

	buffer_lines(&buffer)
}

// Never narrower than the longest line plus both borders.
fn box_size(entry: &TimelineBox) -> (u16, u16) {
	let longest_line = entry.lines.iter().map(|line| text_width(line)).max().unwrap_or(0);
	let columns = entry.width.div_ceil(UNITS_PER_COLUMN).max(longest_line + 2);
	(to_u16(columns), to_u16(entry.height.div_ceil(UNITS_PER_ROW)))
}

fn bucket_height(boxes: &[TimelineBox]) -> u16 {
	boxes.iter().map(|entry| box_size(entry).1).max().unwrap_or(0)
}

fn row_height(row: &[String]) -> u16 {
	to_u16(row.iter().map(|cell| cell.lines().count().max(1)).max().unwrap_or(1))
}

fn text_width(text: &str) -> usize {
	text.lines().map(|line| line.chars().count()).max().unwrap_or(0)
}

fn to_u16(value: usize) -> u16 {
	u16::try_from(value).unwrap_or(u16::MAX)
}

fn buffer_lines(buffer: &Buffer) -> Vec<String> {
	let width = usize::from(buffer.area.width);
	if width == 0 {
		return Vec::new();
	}

	buffer
		.content
		.chunks(width)
		.map(|row| {
			row.iter()
				.map(|cell| cell.symbol())
				.collect::<String>()
				.trim_end()
				.to_string()
		})
		.collect()
}
