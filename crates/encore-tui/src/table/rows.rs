//! Row construction for the task table.
//!
//! Builds per-column cell content for a task and memoizes it by a by-value
//! signature, so unchanged rows are not rebuilt frame after frame. Also
//! decides, per bucket, between rendering every visible row directly and
//! windowed rendering behind a scrollable viewport.

use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use encore_shared::{CustomFieldDefinition, CustomFieldType, Priority, Task, TaskStatus};
use ratatui::style::{Color, Modifier, Style};
use uuid::Uuid;

use super::columns::ColumnId;

/// Buckets showing more rows than this render through the windowed path.
pub const VIRTUALIZATION_THRESHOLD: usize = 50;
/// Extra rows materialized above and below the viewport.
pub const OVERSCAN_ROWS: usize = 4;
/// Height cap for a windowed bucket's viewport, in rows.
pub const MAX_VIEWPORT_ROWS: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    Direct,
    Virtualized,
}

pub fn choose_render_strategy(visible_count: usize) -> RenderStrategy {
    if visible_count > VIRTUALIZATION_THRESHOLD {
        RenderStrategy::Virtualized
    } else {
        RenderStrategy::Direct
    }
}

/// Half-open row range to materialize for a windowed bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    pub start: usize,
    pub end: usize,
}

pub fn visible_window(row_count: usize, scroll_offset: usize, viewport_rows: usize) -> RowWindow {
    let start = scroll_offset.saturating_sub(OVERSCAN_ROWS);
    let end = scroll_offset
        .saturating_add(viewport_rows)
        .saturating_add(OVERSCAN_ROWS)
        .min(row_count);
    RowWindow { start, end }
}

pub fn max_scroll_offset(row_count: usize, viewport_rows: usize) -> usize {
    row_count.saturating_sub(viewport_rows)
}

pub fn status_theme(status: TaskStatus) -> (&'static str, Color) {
    match status {
        TaskStatus::Todo => ("○", Color::Gray),
        TaskStatus::InProgress => ("◐", Color::Blue),
        TaskStatus::Blocked => ("■", Color::Red),
        TaskStatus::Review => ("◍", Color::Magenta),
        TaskStatus::Done => ("●", Color::Green),
        TaskStatus::Cancelled => ("✕", Color::DarkGray),
    }
}

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Urgent => Color::Red,
        Priority::High => Color::Yellow,
        Priority::Normal => Color::Blue,
        Priority::Low => Color::DarkGray,
    }
}

fn type_color(task_type: encore_shared::TaskType) -> Color {
    match task_type {
        encore_shared::TaskType::Contract => Color::Cyan,
        encore_shared::TaskType::Campaign => Color::Magenta,
        encore_shared::TaskType::Release => Color::Green,
        encore_shared::TaskType::Outreach => Color::Yellow,
        encore_shared::TaskType::General => Color::Gray,
    }
}

/// One rendered cell: styled fragments, concatenated by the drawing layer
/// and padded to the column width there.
#[derive(Debug, Clone)]
pub struct Cell {
    pub column: ColumnId,
    pub spans: Vec<(String, Style)>,
}

impl Cell {
    fn plain(column: ColumnId, text: impl Into<String>, style: Style) -> Self {
        Self {
            column,
            spans: vec![(text.into(), style)],
        }
    }
}

#[derive(Debug, Clone)]
pub struct RowCells {
    pub cells: Vec<Cell>,
}

/// By-value change signature for a row. Covers exactly the inputs that feed
/// cell content: the task's tracked fields, the column order, and the
/// custom field definitions. Title and type edits ride on `updated_at`.
pub fn row_signature(task: &Task, columns: &[ColumnId], defs: &[CustomFieldDefinition]) -> u64 {
    let mut hasher = DefaultHasher::new();

    task.updated_at.hash(&mut hasher);
    task.status.hash(&mut hasher);
    task.priority.hash(&mut hasher);
    task.due_date.hash(&mut hasher);
    for user in &task.assigned_to_users {
        user.id.hash(&mut hasher);
        user.name.hash(&mut hasher);
    }

    for column in columns {
        column.hash(&mut hasher);
    }

    let mut values: Vec<(&i64, String, Option<&String>)> = task
        .custom_field_values
        .iter()
        .map(|(id, v)| (id, v.value.to_string(), v.display_value.as_ref()))
        .collect();
    values.sort_by_key(|(id, _, _)| **id);
    values.hash(&mut hasher);

    for def in defs {
        def.id.hash(&mut hasher);
        def.field_name.hash(&mut hasher);
        def.field_type.label().hash(&mut hasher);
        def.select_options.hash(&mut hasher);
        def.show_in_table.hash(&mut hasher);
        def.is_archived.hash(&mut hasher);
        def.order.hash(&mut hasher);
    }

    hasher.finish()
}

pub fn build_row(task: &Task, columns: &[ColumnId], defs: &[CustomFieldDefinition]) -> RowCells {
    let cells = columns
        .iter()
        .map(|&column| build_cell(task, column, defs))
        .collect();
    RowCells { cells }
}

fn build_cell(task: &Task, column: ColumnId, defs: &[CustomFieldDefinition]) -> Cell {
    match column {
        ColumnId::Checkbox => {
            // Derived from status, not stored independently.
            if task.status.is_done() {
                Cell::plain(column, "[x]", Style::default().fg(Color::Green))
            } else {
                Cell::plain(column, "[ ]", Style::default().fg(Color::DarkGray))
            }
        }
        ColumnId::Title => {
            let mut spans = vec![
                (
                    "▎".to_string(),
                    Style::default().fg(priority_color(task.priority)),
                ),
                (task.title.clone(), Style::default().fg(Color::White)),
            ];
            if let Some(related) = &task.related {
                spans.push((
                    format!(" ⦿{}", related.label),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                ));
            }
            Cell { column, spans }
        }
        ColumnId::Type => Cell::plain(
            column,
            task.task_type.label(),
            Style::default().fg(type_color(task.task_type)),
        ),
        ColumnId::Priority => Cell::plain(
            column,
            format!("● {}", task.priority.label()),
            Style::default().fg(priority_color(task.priority)),
        ),
        ColumnId::Status => {
            let (glyph, color) = status_theme(task.status);
            Cell::plain(
                column,
                format!("{} {}", glyph, task.status.label()),
                Style::default().fg(color),
            )
        }
        ColumnId::Assigned => {
            if task.assigned_to_users.is_empty() {
                Cell::plain(column, "—", Style::default().fg(Color::DarkGray))
            } else {
                let names: Vec<&str> = task
                    .assigned_to_users
                    .iter()
                    .map(|u| u.name.as_str())
                    .collect();
                Cell::plain(column, names.join(", "), Style::default().fg(Color::Cyan))
            }
        }
        ColumnId::Due => match task.due_date {
            Some(date) => Cell::plain(
                column,
                date.format("%b %d").to_string(),
                Style::default().fg(Color::Yellow),
            ),
            None => Cell::plain(column, "—", Style::default().fg(Color::DarkGray)),
        },
        ColumnId::Custom(field_id) => build_custom_cell(task, column, field_id, defs),
    }
}

fn build_custom_cell(
    task: &Task,
    column: ColumnId,
    field_id: i64,
    defs: &[CustomFieldDefinition],
) -> Cell {
    let def = defs.iter().find(|d| d.id == field_id);
    let value = task.custom_field_values.get(&field_id);

    if let Some(def) = def {
        if def.field_type == CustomFieldType::Checkbox {
            let checked = value
                .map(|v| v.value.as_bool().unwrap_or(false))
                .unwrap_or(false);
            return if checked {
                Cell::plain(column, "[x]", Style::default().fg(Color::Green))
            } else {
                Cell::plain(column, "[ ]", Style::default().fg(Color::DarkGray))
            };
        }
    }

    let text = value
        .and_then(|v| v.display_value.clone().or_else(|| v.value_text()))
        .unwrap_or_default();
    if text.is_empty() {
        Cell::plain(column, "—", Style::default().fg(Color::DarkGray))
    } else {
        Cell::plain(column, text, Style::default().fg(Color::White))
    }
}

/// Per-task cache of built rows, keyed by id and invalidated by signature.
#[derive(Debug, Default)]
pub struct RowCache {
    map: HashMap<Uuid, CachedRow>,
}

#[derive(Debug)]
struct CachedRow {
    signature: u64,
    cells: RowCells,
}

impl RowCache {
    pub fn row(
        &mut self,
        task: &Task,
        columns: &[ColumnId],
        defs: &[CustomFieldDefinition],
    ) -> &RowCells {
        let signature = row_signature(task, columns, defs);

        match self.map.entry(task.id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().signature != signature {
                    *occupied.get_mut() = CachedRow {
                        signature,
                        cells: build_row(task, columns, defs),
                    };
                }
                &occupied.into_mut().cells
            }
            Entry::Vacant(vacant) => {
                &vacant
                    .insert(CachedRow {
                        signature,
                        cells: build_row(task, columns, defs),
                    })
                    .cells
            }
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use encore_shared::{TaskType, UserRef};

    use super::*;

    fn task() -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Draft distribution deal".to_string(),
            status: TaskStatus::Todo,
            priority: Priority::High,
            task_type: TaskType::Contract,
            due_date: NaiveDate::from_ymd_opt(2026, 9, 15),
            assigned_to_users: vec![UserRef {
                id: Uuid::new_v4(),
                name: "Maya".to_string(),
            }],
            related: None,
            custom_field_values: HashMap::new(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn strategy_switches_above_threshold() {
        assert_eq!(choose_render_strategy(0), RenderStrategy::Direct);
        assert_eq!(choose_render_strategy(50), RenderStrategy::Direct);
        assert_eq!(choose_render_strategy(51), RenderStrategy::Virtualized);
        assert_eq!(choose_render_strategy(90), RenderStrategy::Virtualized);
    }

    #[test]
    fn window_adds_overscan_and_clamps() {
        let window = visible_window(90, 0, 20);
        assert_eq!(window, RowWindow { start: 0, end: 24 });

        let window = visible_window(90, 40, 20);
        assert_eq!(window, RowWindow { start: 36, end: 64 });

        let window = visible_window(90, 70, 20);
        assert_eq!(window, RowWindow { start: 66, end: 90 });

        assert_eq!(max_scroll_offset(90, 20), 70);
        assert_eq!(max_scroll_offset(10, 20), 0);
    }

    #[test]
    fn signature_tracks_value_changes() {
        let columns = ColumnId::FIXED_DEFAULT.to_vec();
        let base = task();

        let mut changed = base.clone();
        changed.status = TaskStatus::Done;
        assert_ne!(
            row_signature(&base, &columns, &[]),
            row_signature(&changed, &columns, &[])
        );

        let mut changed = base.clone();
        changed.assigned_to_users.push(UserRef {
            id: Uuid::new_v4(),
            name: "Leo".to_string(),
        });
        assert_ne!(
            row_signature(&base, &columns, &[]),
            row_signature(&changed, &columns, &[])
        );

        let mut reordered = columns.clone();
        reordered.swap(2, 3);
        assert_ne!(
            row_signature(&base, &columns, &[]),
            row_signature(&base, &reordered, &[])
        );

        // Equality by value, not identity.
        assert_eq!(
            row_signature(&base, &columns, &[]),
            row_signature(&base.clone(), &columns.clone(), &[])
        );
    }

    #[test]
    fn cache_skips_rebuild_until_signature_changes() {
        let columns = ColumnId::FIXED_DEFAULT.to_vec();
        let mut cache = RowCache::default();
        let mut task = task();

        let first_title = cache.row(&task, &columns, &[]).cells[1].spans[1].0.clone();
        assert_eq!(first_title, "Draft distribution deal");

        // A title edit alone is not in the signature set; the cached row
        // survives until updated_at moves.
        task.title = "Renamed".to_string();
        let stale = cache.row(&task, &columns, &[]).cells[1].spans[1].0.clone();
        assert_eq!(stale, "Draft distribution deal");

        task.updated_at = Utc.with_ymd_and_hms(2026, 8, 2, 9, 0, 0).unwrap();
        let fresh = cache.row(&task, &columns, &[]).cells[1].spans[1].0.clone();
        assert_eq!(fresh, "Renamed");
    }

    #[test]
    fn checkbox_cell_derives_from_status() {
        let columns = vec![ColumnId::Checkbox];
        let mut t = task();

        let open = build_row(&t, &columns, &[]);
        assert_eq!(open.cells[0].spans[0].0, "[ ]");

        t.status = TaskStatus::Done;
        let done = build_row(&t, &columns, &[]);
        assert_eq!(done.cells[0].spans[0].0, "[x]");
    }

    #[test]
    fn title_cell_renders_single_related_chip() {
        let columns = vec![ColumnId::Title];
        let mut t = task();
        t.related = Some(encore_shared::RelatedEntity {
            kind: encore_shared::RelatedEntityKind::Song,
            id: Uuid::new_v4(),
            label: "Neon Nights".to_string(),
        });

        let row = build_row(&t, &columns, &[]);
        let chips: Vec<&String> = row.cells[0]
            .spans
            .iter()
            .map(|(text, _)| text)
            .filter(|text| text.contains('⦿'))
            .collect();
        assert_eq!(chips, vec![" ⦿Neon Nights"]);
    }
}
