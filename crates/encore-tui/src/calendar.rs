//! Month-grid date picker for inline due-date and date-field editing.

use chrono::{Datelike, Days, Months, NaiveDate};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone)]
pub struct DatePicker {
    cursor: NaiveDate,
}

impl DatePicker {
    pub fn new(initial: Option<NaiveDate>, today: NaiveDate) -> Self {
        Self {
            cursor: initial.unwrap_or(today),
        }
    }

    pub fn cursor(&self) -> NaiveDate {
        self.cursor
    }

    pub fn move_days(&mut self, days: i64) {
        let moved = if days >= 0 {
            self.cursor.checked_add_days(Days::new(days as u64))
        } else {
            self.cursor.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        if let Some(date) = moved {
            self.cursor = date;
        }
    }

    pub fn move_months(&mut self, months: i32) {
        let moved = if months >= 0 {
            self.cursor.checked_add_months(Months::new(months as u32))
        } else {
            self.cursor
                .checked_sub_months(Months::new(months.unsigned_abs()))
        };
        if let Some(date) = moved {
            self.cursor = date;
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .and_then(|d| d.pred_opt())
    .map(|d| d.day())
    .unwrap_or(30)
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Render the picker's month as styled lines: weekday header plus up to six
/// week rows, with the cursor day inverted and today underlined.
pub fn render_picker(picker: &DatePicker, today: NaiveDate) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let cursor = picker.cursor();
    let (year, month) = (cursor.year(), cursor.month());

    let header_style = Style::default().fg(Color::DarkGray);
    lines.push(Line::from(Span::styled(
        format!("{} {}", month_name(month), year),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(vec![
        Span::styled("Su ", header_style),
        Span::styled("Mo ", header_style),
        Span::styled("Tu ", header_style),
        Span::styled("We ", header_style),
        Span::styled("Th ", header_style),
        Span::styled("Fr ", header_style),
        Span::styled("Sa", header_style),
    ]));

    let Some(first_day) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return lines;
    };

    let start_weekday = first_day.weekday().num_days_from_sunday() as usize;
    let num_days = days_in_month(year, month);
    let mut current_day = 1u32;

    for week in 0..6 {
        let mut spans = Vec::new();

        for weekday in 0..7 {
            let cell_idx = week * 7 + weekday;

            if cell_idx < start_weekday || current_day > num_days {
                spans.push(Span::raw(if weekday == 6 { "  " } else { "   " }));
            } else {
                let date = NaiveDate::from_ymd_opt(year, month, current_day)
                    .unwrap_or(first_day);

                let mut style = Style::default().fg(Color::White);
                if date == today {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                if date == cursor {
                    style = Style::default()
                        .bg(Color::Blue)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD);
                }

                let text = if weekday == 6 {
                    format!("{:2}", current_day)
                } else {
                    format!("{:2} ", current_day)
                };
                spans.push(Span::styled(text, style));

                current_day += 1;
            }
        }

        lines.push(Line::from(spans));

        if current_day > num_days {
            break;
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cursor_defaults_to_today_without_initial_date() {
        let today = date(2026, 8, 6);
        assert_eq!(DatePicker::new(None, today).cursor(), today);
        assert_eq!(
            DatePicker::new(Some(date(2026, 9, 1)), today).cursor(),
            date(2026, 9, 1)
        );
    }

    #[test]
    fn day_and_month_movement_crosses_boundaries() {
        let mut picker = DatePicker::new(Some(date(2026, 8, 31)), date(2026, 8, 6));
        picker.move_days(1);
        assert_eq!(picker.cursor(), date(2026, 9, 1));

        picker.move_days(-7);
        assert_eq!(picker.cursor(), date(2026, 8, 25));

        picker.move_months(-1);
        assert_eq!(picker.cursor(), date(2026, 7, 25));

        // Clamps to the shorter month's end.
        let mut picker = DatePicker::new(Some(date(2026, 1, 31)), date(2026, 8, 6));
        picker.move_months(1);
        assert_eq!(picker.cursor(), date(2026, 2, 28));
    }

    #[test]
    fn picker_renders_week_rows() {
        let picker = DatePicker::new(Some(date(2026, 8, 6)), date(2026, 8, 6));
        let lines = render_picker(&picker, date(2026, 8, 6));
        // Title + weekday header + 6 week rows for August 2026.
        assert_eq!(lines.len(), 8);
    }
}
