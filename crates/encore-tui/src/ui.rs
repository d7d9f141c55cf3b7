use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use encore_shared::{CustomFieldType, Priority, TaskStatus};

use crate::app::{App, FilterEntry, NewFieldFocus, View, FIELD_TYPES};
use crate::calendar;
use crate::table::{
    columns::ColumnId,
    edit::CellEditor,
    rows::{
        self, priority_color, status_theme, RenderStrategy, RowCells, MAX_VIEWPORT_ROWS,
    },
    HeaderHit,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.view {
        View::ProjectSelect => draw_project_select(f, app),
        View::Tasks => draw_tasks(f, app),
    }

    // Draw error overlay if present
    if let Some(error) = app.error_message.clone() {
        draw_error_popup(f, &error);
    }

    // Draw loading overlay if loading
    if app.loading {
        draw_loading_overlay(f, &app.loading_message);
    }
}

fn draw_project_select(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // List
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let header = Paragraph::new(vec![Line::from(vec![
        Span::styled(
            "ENCORE",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled("Projects", Style::default().fg(Color::Yellow)),
    ])])
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = app
        .projects
        .iter()
        .enumerate()
        .map(|(i, project)| {
            let style = if i == app.selected_project_idx {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            let mut spans = vec![Span::raw("  "), Span::styled(&project.name, style)];
            if let Some(artist) = &project.artist_name {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    format!("({})", artist),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Select Project ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(list, chunks[1]);

    let status = Paragraph::new(Line::from(vec![
        Span::styled(
            " NORMAL ",
            Style::default().bg(Color::Blue).fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(
            "j/k: select | Enter: open | r: reload | q: quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    f.render_widget(status, chunks[2]);
}

fn draw_tasks(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Table
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_tasks_header(f, chunks[0], app);
    draw_table(f, chunks[1], app);
    draw_tasks_status_bar(f, chunks[2], app);

    if app.filter_panel.is_some() {
        draw_filter_panel(f, app);
    }
    if app.new_field_form.is_some() {
        draw_new_field_form(f, app);
    }
    if app.table.edit.is_some() {
        draw_edit_popup(f, app);
    }
}

fn draw_tasks_header(f: &mut Frame, area: Rect, app: &App) {
    let project_name = app
        .current_project
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("No project");

    let expand_label = if app.table.groups.all_expanded() {
        "Collapse all"
    } else {
        "Expand all"
    };

    let header = Paragraph::new(vec![Line::from(vec![
        Span::styled(
            "ENCORE",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(project_name, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("e: {}", expand_label),
            Style::default().fg(Color::DarkGray),
        ),
    ])])
    .block(Block::default().borders(Borders::BOTTOM));

    f.render_widget(header, area);
}

fn draw_tasks_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (mode, mode_color) = if app.table.drag.as_ref().map(|d| d.is_active()) == Some(true) {
        ("DRAG", Color::Magenta)
    } else if app.table.edit.is_some() {
        ("EDIT", Color::Green)
    } else if app.table.filter.is_active() {
        ("FILTERED", Color::Yellow)
    } else {
        ("NORMAL", Color::Blue)
    };

    let hints = if app.table.edit.is_some() {
        "j/k: choose | Enter: apply | Esc: close"
    } else {
        "j/k/h/l: move | Enter: edit | s: sort | f: filter | m: more | n: new field | q: quit"
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", mode),
            Style::default().bg(mode_color).fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ];
    if let Some(notice) = &app.notice {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(notice.clone(), Style::default().fg(Color::Cyan)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Width of each non-flex column; the title column absorbs the remainder.
fn column_width(column: ColumnId) -> u16 {
    match column {
        ColumnId::Checkbox => 3,
        ColumnId::Title => 0,
        ColumnId::Type => 9,
        ColumnId::Priority => 9,
        ColumnId::Status => 13,
        ColumnId::Assigned => 16,
        ColumnId::Due => 7,
        ColumnId::Custom(_) => 12,
    }
}

fn header_label(column: ColumnId, app: &App) -> String {
    match column {
        ColumnId::Checkbox => String::new(),
        ColumnId::Title => "Task".to_string(),
        ColumnId::Type => "Type".to_string(),
        ColumnId::Priority => "Priority".to_string(),
        ColumnId::Status => "Status".to_string(),
        ColumnId::Assigned => "Assigned".to_string(),
        ColumnId::Due => "Due".to_string(),
        ColumnId::Custom(field_id) => app
            .table
            .custom_fields
            .iter()
            .find(|d| d.id == field_id)
            .map(|d| d.field_name.clone())
            .unwrap_or_else(|| "Field".to_string()),
    }
}

fn resolve_widths(columns: &[ColumnId], total_width: u16) -> Vec<u16> {
    let gaps = columns.len() as u16;
    let fixed: u16 = columns.iter().map(|&c| column_width(c)).sum();
    let title_width = total_width.saturating_sub(fixed + gaps).max(16);

    columns
        .iter()
        .map(|&c| match c {
            ColumnId::Title => title_width,
            other => column_width(other),
        })
        .collect()
}

/// Truncate and pad a cell's styled fragments to the column width.
fn fit_spans(spans: &[(String, Style)], width: usize, base: Style) -> Vec<Span<'static>> {
    let mut out = Vec::new();
    let mut used = 0usize;

    for (text, style) in spans {
        if used >= width {
            break;
        }
        let taken: String = text.chars().take(width - used).collect();
        used += taken.chars().count();
        out.push(Span::styled(taken, style.patch(base)));
    }
    if used < width {
        out.push(Span::styled(" ".repeat(width - used), base));
    }

    out
}

fn row_line(
    cells: &RowCells,
    widths: &[u16],
    is_cursor_row: bool,
    cursor_col: usize,
) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();

    for (i, cell) in cells.cells.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(8) as usize;
        let mut base = Style::default();
        if is_cursor_row {
            base = base.bg(Color::DarkGray);
        }
        if is_cursor_row && i == cursor_col {
            base = base.bg(Color::Blue);
        }
        spans.extend(fit_spans(&cell.spans, width, base));
        spans.push(Span::styled(
            " ",
            if is_cursor_row {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            },
        ));
    }

    Line::from(spans)
}

fn draw_table(f: &mut Frame, area: Rect, app: &mut App) {
    app.table.hits.clear();

    let columns = app.table.ordered_columns();
    let widths = resolve_widths(&columns, area.width);
    let views = app.table.bucket_views();
    let cursor_row = app.table.cursor_row;
    let cursor_col = app.table.cursor_col;
    let drag_source = app
        .table
        .drag
        .as_ref()
        .filter(|d| d.is_active())
        .map(|d| d.source);

    let mut lines: Vec<Line> = Vec::new();

    // Column header row.
    let mut header_spans: Vec<Span> = Vec::new();
    let mut x = area.x;
    for (i, &column) in columns.iter().enumerate() {
        let width = widths[i];
        let mut label = header_label(column, app);
        if app.table.sort.column == Some(column) {
            match app.table.sort.direction {
                Some(crate::table::sort::SortDirection::Asc) => label.push_str(" ▲"),
                Some(crate::table::sort::SortDirection::Desc) => label.push_str(" ▼"),
                None => {}
            }
        }

        let mut style = Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD);
        if drag_source == Some(column) {
            style = style.add_modifier(Modifier::REVERSED);
        }

        header_spans.extend(fit_spans(&[(label, style)], width as usize, Style::default()));
        header_spans.push(Span::raw(" "));

        app.table.hits.headers.push(HeaderHit {
            column,
            x_start: x,
            x_end: x + width,
            y: area.y,
        });
        x += width + 1;
    }
    lines.push(Line::from(header_spans));

    // Buckets.
    let mut flat_row = 0usize;
    let max_lines = area.height as usize;

    for view in &views {
        if view.total == 0 {
            continue;
        }
        if lines.len() >= max_lines {
            break;
        }

        let (glyph, color) = status_theme(view.status);
        let arrow = if view.expanded { "▾" } else { "▸" };
        let scroll_hint = if view.expanded && view.strategy == RenderStrategy::Virtualized {
            let offset = view.scroll_offset;
            let viewport = MAX_VIEWPORT_ROWS as usize;
            match (offset > 0, offset + viewport < view.visible.len()) {
                (true, true) => " ↑↓",
                (true, false) => " ↑",
                (false, true) => " ↓",
                (false, false) => "",
            }
        } else {
            ""
        };

        let header_y = area.y + lines.len() as u16;
        app.table.hits.bucket_toggles.push((view.status, header_y));
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", arrow), Style::default().fg(Color::Gray)),
            Span::styled(format!("{} ", glyph), Style::default().fg(color)),
            Span::styled(
                view.status.label().to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" ({}){}", view.total, scroll_hint),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        if view.expanded {
            match view.strategy {
                RenderStrategy::Direct => {
                    for &task_index in &view.visible {
                        if lines.len() < max_lines {
                            let y = area.y + lines.len() as u16;
                            app.table.hits.rows.push((flat_row, task_index, y));

                            let cells = app.table.row_cache.row(
                                &app.table.tasks[task_index],
                                &columns,
                                &app.table.custom_fields,
                            );
                            lines.push(row_line(
                                cells,
                                &widths,
                                flat_row == cursor_row,
                                cursor_col,
                            ));
                        }
                        flat_row += 1;
                    }
                }
                RenderStrategy::Virtualized => {
                    // Bounded viewport over the bucket; overscan rows are
                    // built (cache-warmed) but not drawn.
                    let viewport = (MAX_VIEWPORT_ROWS as usize).min(view.visible.len());
                    let offset = view.scroll_offset.min(view.visible.len() - viewport);
                    let window = rows::visible_window(view.visible.len(), offset, viewport);
                    let region_start = area.y + lines.len() as u16;

                    for pos in window.start..window.end {
                        let task_index = view.visible[pos];
                        let in_viewport = pos >= offset && pos < offset + viewport;

                        let cells = app.table.row_cache.row(
                            &app.table.tasks[task_index],
                            &columns,
                            &app.table.custom_fields,
                        );

                        if in_viewport && lines.len() < max_lines {
                            let y = area.y + lines.len() as u16;
                            app.table.hits.rows.push((flat_row + pos, task_index, y));
                            lines.push(row_line(
                                cells,
                                &widths,
                                flat_row + pos == cursor_row,
                                cursor_col,
                            ));
                        }
                    }

                    let region_end = area.y + lines.len() as u16;
                    app.table
                        .hits
                        .bucket_regions
                        .push((view.status, region_start, region_end));
                    flat_row += view.visible.len();
                }
            }

            if view.remaining > 0 && lines.len() < max_lines {
                let y = area.y + lines.len() as u16;
                app.table.hits.show_more.push((view.status, y));
                lines.push(Line::from(Span::styled(
                    format!(
                        "   + show {} more ({} remaining)",
                        crate::table::groups::PAGE_SIZE.min(view.remaining),
                        view.remaining
                    ),
                    Style::default().fg(Color::Cyan),
                )));
            }
        }

        if lines.len() < max_lines {
            lines.push(Line::from(""));
        }
    }

    if views.iter().all(|v| v.total == 0) {
        lines.push(Line::from(Span::styled(
            "  No tasks match the current filters.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines.truncate(max_lines);
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_edit_popup(f: &mut Frame, app: &App) {
    let Some(session) = &app.table.edit else {
        return;
    };

    match &session.editor {
        CellEditor::Status { selected } => {
            let items: Vec<Line> = TaskStatus::ALL
                .iter()
                .enumerate()
                .map(|(i, status)| {
                    let (glyph, color) = status_theme(*status);
                    let style = if i == *selected {
                        Style::default().bg(Color::DarkGray).fg(Color::White)
                    } else {
                        Style::default().fg(color)
                    };
                    Line::from(Span::styled(
                        format!(" {} {} ", glyph, status.label()),
                        style,
                    ))
                })
                .collect();
            draw_popup_lines(f, " Status ", items, 30);
        }
        CellEditor::Priority { selected } => {
            let items: Vec<Line> = Priority::ALL
                .iter()
                .enumerate()
                .map(|(i, priority)| {
                    let style = if i == *selected {
                        Style::default().bg(Color::DarkGray).fg(Color::White)
                    } else {
                        Style::default().fg(priority_color(*priority))
                    };
                    Line::from(Span::styled(format!(" ● {} ", priority.label()), style))
                })
                .collect();
            draw_popup_lines(f, " Priority ", items, 26);
        }
        CellEditor::Assignees { selected, chosen } => {
            let items: Vec<Line> = app
                .table
                .members
                .iter()
                .enumerate()
                .map(|(i, member)| {
                    let mark = if chosen.contains(&member.id) { "[x]" } else { "[ ]" };
                    let style = if i == *selected {
                        Style::default().bg(Color::DarkGray).fg(Color::White)
                    } else {
                        Style::default().fg(Color::Gray)
                    };
                    Line::from(Span::styled(format!(" {} {} ", mark, member.name), style))
                })
                .collect();
            draw_popup_lines(f, " Assignees (space toggles) ", items, 36);
        }
        CellEditor::Date { picker } => {
            let mut items = calendar::render_picker(picker, chrono::Local::now().date_naive());
            items.push(Line::from(""));
            items.push(Line::from(Span::styled(
                "Enter: set | x: clear | Esc: close",
                Style::default().fg(Color::DarkGray),
            )));
            draw_popup_lines(f, " Due date ", items, 40);
        }
        CellEditor::Select {
            options, selected, ..
        } => {
            let mut items: Vec<Line> = options
                .iter()
                .enumerate()
                .map(|(i, option)| {
                    let style = if i == *selected {
                        Style::default().bg(Color::DarkGray).fg(Color::White)
                    } else {
                        Style::default().fg(Color::Gray)
                    };
                    Line::from(Span::styled(format!(" {} ", option), style))
                })
                .collect();
            let clear_style = if *selected == options.len() {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            items.push(Line::from(Span::styled(" (clear) ", clear_style)));
            draw_popup_lines(f, " Select ", items, 32);
        }
        CellEditor::Text { buffer, numeric, .. } => {
            let title = if *numeric { " Number " } else { " Text " };
            let items = vec![
                Line::from(Span::styled(
                    buffer.clone(),
                    Style::default().fg(Color::White),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter/Esc: done (pending edits flush)",
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            draw_popup_lines(f, title, items, 44);
        }
    }
}

fn draw_popup_lines(f: &mut Frame, title: &str, lines: Vec<Line>, width: u16) {
    let height = lines.len() as u16 + 2;
    let area = centered_fixed_rect(width, height, f.area());

    f.render_widget(Clear, area);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_filter_panel(f: &mut Frame, app: &App) {
    let Some(panel) = &app.filter_panel else {
        return;
    };
    let entries = app.filter_entries();

    let lines: Vec<Line> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mark = if app.filter_entry_active(entry) { "[x]" } else { "[ ]" };
            let label = match entry {
                FilterEntry::Type(t) => format!("Type: {}", t.label()),
                FilterEntry::Priority(p) => format!("Priority: {}", p.label()),
                FilterEntry::Status(s) => format!("Status: {}", s.label()),
                FilterEntry::Assignee(_, name) => format!("Assignee: {}", name),
                FilterEntry::Custom(field_id, value) => {
                    let name = app
                        .table
                        .custom_fields
                        .iter()
                        .find(|d| d.id == *field_id)
                        .map(|d| d.field_name.as_str())
                        .unwrap_or("Field");
                    format!("{}: {}", name, value)
                }
            };
            let style = if i == panel.cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(format!(" {} {} ", mark, label), style))
        })
        .collect();

    let mut lines = lines;
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "space: toggle | x: clear all | f/Esc: close",
        Style::default().fg(Color::DarkGray),
    )));

    draw_popup_lines(f, " Filters ", lines, 44);
}

fn draw_new_field_form(f: &mut Frame, app: &App) {
    let Some(form) = &app.new_field_form else {
        return;
    };

    let area = centered_rect(50, 40, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" New Custom Field ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Name
            Constraint::Length(3), // Type
            Constraint::Length(3), // Options
            Constraint::Length(1), // Show in table
            Constraint::Length(2), // Hint
            Constraint::Min(0),
        ])
        .split(inner);

    let focus_style = |focused: bool| {
        if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    let name_block = Block::default()
        .title(" Name ")
        .borders(Borders::ALL)
        .border_style(focus_style(form.focus == NewFieldFocus::Name));
    f.render_widget(Paragraph::new(form.name.as_str()).block(name_block), chunks[0]);

    let type_block = Block::default()
        .title(" Type (j/k) ")
        .borders(Borders::ALL)
        .border_style(focus_style(form.focus == NewFieldFocus::FieldType));
    f.render_widget(
        Paragraph::new(FIELD_TYPES[form.type_index].label()).block(type_block),
        chunks[1],
    );

    if form.field_type() == CustomFieldType::SingleSelect {
        let options_block = Block::default()
            .title(" Options (comma separated) ")
            .borders(Borders::ALL)
            .border_style(focus_style(form.focus == NewFieldFocus::Options));
        f.render_widget(
            Paragraph::new(form.options.as_str())
                .block(options_block)
                .wrap(Wrap { trim: false }),
            chunks[2],
        );
    }

    let mark = if form.show_in_table { "[x]" } else { "[ ]" };
    f.render_widget(
        Paragraph::new(Span::styled(
            format!("{} show as table column", mark),
            focus_style(form.focus == NewFieldFocus::ShowInTable),
        )),
        chunks[3],
    );

    let hint = Paragraph::new("Tab: next field | Enter: create | Esc: cancel")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(hint, chunks[4]);
}

fn draw_error_popup(f: &mut Frame, error: &str) {
    let area = centered_rect(50, 20, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = Paragraph::new(error)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White));

    f.render_widget(text, area);
}

fn draw_loading_overlay(f: &mut Frame, message: &str) {
    let area = centered_rect(40, 12, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = Paragraph::new(message)
        .block(block)
        .alignment(Alignment::Center);

    f.render_widget(text, area);
}

/// Helper to create a centered rect using percentage of the available rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn centered_fixed_rect(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}
