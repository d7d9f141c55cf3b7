//! Grouped task table.
//!
//! Consumes an already-fetched task collection plus the project's custom
//! field definitions and renders a status-partitioned, sortable, filterable,
//! column-configurable table. All cell edits are emitted upward as
//! [`UpdateIntent`]s; the table never mutates task data itself and relies on
//! the caller's refresh cycle to see the results.

pub mod columns;
pub mod drag;
pub mod edit;
pub mod filter;
pub mod groups;
pub mod rows;
pub mod sort;

use std::collections::HashMap;
use std::time::Instant;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use encore_shared::{CustomFieldDefinition, CustomFieldType, Priority, Task, TaskStatus, UserRef};
use uuid::Uuid;

use crate::layout::LayoutStore;
use columns::{ColumnId, ColumnModel};
use drag::DragSession;
use edit::{EditAction, EditSession};
use filter::TaskFilter;
use groups::{partition, GroupState};
use rows::{choose_render_strategy, max_scroll_offset, RenderStrategy, RowCache, MAX_VIEWPORT_ROWS};
use sort::{sort_bucket, SortState};

/// A cell edit or navigation request, emitted upward and handled by the
/// shell. Fire-and-forget: the table gets no success or failure signal.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateIntent {
    OpenTask(Uuid),
    Status(Uuid, TaskStatus),
    Priority(Uuid, Priority),
    Assignees(Uuid, Vec<Uuid>),
    DueDate(Uuid, Option<NaiveDate>),
    CustomField(Uuid, i64, Option<serde_json::Value>),
}

/// One status bucket, resolved for rendering.
#[derive(Debug)]
pub struct BucketView {
    pub status: TaskStatus,
    pub total: usize,
    pub expanded: bool,
    /// Task indices for the paged visible slice, already sorted.
    pub visible: Vec<usize>,
    pub remaining: usize,
    pub strategy: RenderStrategy,
    pub scroll_offset: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderHit {
    pub column: ColumnId,
    pub x_start: u16,
    pub x_end: u16,
    pub y: u16,
}

/// Screen regions recorded during drawing, consumed by mouse handling on
/// the following events. Cleared at the start of every frame.
#[derive(Debug, Default)]
pub struct HitMap {
    pub headers: Vec<HeaderHit>,
    /// (flattened row index, task index, y).
    pub rows: Vec<(usize, usize, u16)>,
    pub bucket_toggles: Vec<(TaskStatus, u16)>,
    pub show_more: Vec<(TaskStatus, u16)>,
    /// (status, y_start, y_end) of each bucket's row viewport.
    pub bucket_regions: Vec<(TaskStatus, u16, u16)>,
}

impl HitMap {
    pub fn clear(&mut self) {
        self.headers.clear();
        self.rows.clear();
        self.bucket_toggles.clear();
        self.show_more.clear();
        self.bucket_regions.clear();
    }

    fn header_at(&self, x: u16, y: u16) -> Option<HeaderHit> {
        self.headers
            .iter()
            .find(|h| h.y == y && x >= h.x_start && x < h.x_end)
            .copied()
    }

    fn column_index_at(&self, x: u16) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| x >= h.x_start && x < h.x_end)
    }

    fn row_at(&self, y: u16) -> Option<(usize, usize)> {
        self.rows
            .iter()
            .find(|(_, _, row_y)| *row_y == y)
            .map(|(flat, task, _)| (*flat, *task))
    }

    fn bucket_region_at(&self, y: u16) -> Option<TaskStatus> {
        self.bucket_regions
            .iter()
            .find(|(_, start, end)| y >= *start && y < *end)
            .map(|(status, _, _)| *status)
    }
}

pub struct TaskTable {
    pub tasks: Vec<Task>,
    pub custom_fields: Vec<CustomFieldDefinition>,
    pub members: Vec<UserRef>,
    pub columns: ColumnModel,
    pub filter: TaskFilter,
    pub sort: SortState,
    pub groups: GroupState,
    pub edit: Option<EditSession>,
    pub drag: Option<DragSession>,
    pub row_cache: RowCache,
    pub hits: HitMap,
    pub cursor_row: usize,
    pub cursor_col: usize,
    scroll_offsets: HashMap<TaskStatus, usize>,
    pressed_header: Option<ColumnId>,
    query_key: Option<Uuid>,
    intents: Vec<UpdateIntent>,
}

impl TaskTable {
    pub fn new(store: &dyn LayoutStore) -> Self {
        Self {
            tasks: Vec::new(),
            custom_fields: Vec::new(),
            members: Vec::new(),
            columns: ColumnModel::load(store),
            filter: TaskFilter::default(),
            sort: SortState::default(),
            groups: GroupState::default(),
            edit: None,
            drag: None,
            row_cache: RowCache::default(),
            hits: HitMap::default(),
            cursor_row: 0,
            cursor_col: 1,
            scroll_offsets: HashMap::new(),
            pressed_header: None,
            query_key: None,
            intents: Vec::new(),
        }
    }

    /// Install a freshly loaded collection. Switching to a different query
    /// (project) resets all session-local view state; a refresh of the same
    /// query keeps it.
    pub fn set_data(
        &mut self,
        query_key: Uuid,
        tasks: Vec<Task>,
        custom_fields: Vec<CustomFieldDefinition>,
        members: Vec<UserRef>,
        store: &mut dyn LayoutStore,
    ) {
        if self.query_key != Some(query_key) {
            self.query_key = Some(query_key);
            self.filter = TaskFilter::default();
            self.sort = SortState::default();
            self.groups.reset();
            self.scroll_offsets.clear();
            self.row_cache.clear();
            self.cursor_row = 0;
            self.cursor_col = 1;
            if let Some(mut session) = self.edit.take() {
                session.cancel();
            }
        }

        self.tasks = tasks;
        self.members = members;
        self.columns.reconcile(&custom_fields, store);
        self.custom_fields = custom_fields;
    }

    pub fn ordered_columns(&self) -> Vec<ColumnId> {
        self.columns.ordered_columns(&self.custom_fields)
    }

    /// Filter, partition and sort the collection into per-status views.
    /// Pure with respect to the current configuration; recomputed on demand.
    pub fn bucket_views(&self) -> Vec<BucketView> {
        let filtered = self.filter.apply(&self.tasks);
        let mut buckets = partition(&self.tasks, &filtered);

        buckets
            .iter_mut()
            .for_each(|b| sort_bucket(&mut b.task_indices, &self.tasks, &self.sort));

        buckets
            .into_iter()
            .map(|b| {
                let total = b.task_indices.len();
                let visible_count = self.groups.visible_count(b.status, total);
                BucketView {
                    status: b.status,
                    total,
                    expanded: self.groups.is_expanded(b.status),
                    remaining: self.groups.remaining(b.status, total),
                    strategy: choose_render_strategy(visible_count),
                    scroll_offset: self.scroll_offset(b.status),
                    visible: b.task_indices[..visible_count].to_vec(),
                }
            })
            .collect()
    }

    pub fn scroll_offset(&self, status: TaskStatus) -> usize {
        self.scroll_offsets.get(&status).copied().unwrap_or(0)
    }

    /// Flattened (status, task index) pairs for every row on screen, in
    /// render order. The cursor indexes into this list.
    pub fn visible_row_entries(&self) -> Vec<(TaskStatus, usize)> {
        self.bucket_views()
            .iter()
            .filter(|v| v.total > 0 && v.expanded)
            .flat_map(|v| v.visible.iter().map(|&i| (v.status, i)).collect::<Vec<_>>())
            .collect()
    }

    pub fn drain_intents(&mut self) -> Vec<UpdateIntent> {
        std::mem::take(&mut self.intents)
    }

    /// Timer tick: fires any due debounced edit.
    pub fn tick(&mut self, now: Instant) {
        if let Some(session) = &mut self.edit {
            if let Some(intent) = session.tick(now) {
                self.intents.push(intent);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant, today: NaiveDate) {
        if let Some(session) = &mut self.edit {
            match session.handle_key(key, &self.members, now) {
                EditAction::Continue => {}
                EditAction::Close => self.edit = None,
                EditAction::Emit(intent) => self.intents.push(intent),
                EditAction::EmitClose(intent) => {
                    self.intents.push(intent);
                    self.edit = None;
                }
            }
            return;
        }

        let entries = self.visible_row_entries();
        let column_count = self.ordered_columns().len();

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.cursor_row + 1 < entries.len() {
                    self.cursor_row += 1;
                    self.ensure_cursor_visible();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.cursor_row = self.cursor_row.saturating_sub(1);
                self.ensure_cursor_visible();
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.cursor_col = self.cursor_col.saturating_sub(1);
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if self.cursor_col + 1 < column_count {
                    self.cursor_col += 1;
                }
            }
            KeyCode::Char('s') => {
                if let Some(column) = self.ordered_columns().get(self.cursor_col).copied() {
                    self.sort.cycle(column);
                }
            }
            KeyCode::Char('e') => self.groups.toggle_all(),
            KeyCode::Char('c') => {
                if let Some(&(status, _)) = entries.get(self.cursor_row) {
                    self.groups.toggle(status);
                }
            }
            KeyCode::Char('m') => {
                if let Some(&(status, _)) = entries.get(self.cursor_row) {
                    self.groups.show_more(status);
                }
            }
            KeyCode::Char(' ') => {
                if let Some(&(_, task_index)) = entries.get(self.cursor_row) {
                    self.toggle_completion(task_index);
                }
            }
            KeyCode::Enter => {
                if let Some(&(_, task_index)) = entries.get(self.cursor_row) {
                    self.activate_cell(task_index, today);
                }
            }
            _ => {}
        }
    }

    fn activate_cell(&mut self, task_index: usize, today: NaiveDate) {
        let Some(column) = self.ordered_columns().get(self.cursor_col).copied() else {
            return;
        };
        let task = &self.tasks[task_index];

        match column {
            ColumnId::Title => self.intents.push(UpdateIntent::OpenTask(task.id)),
            ColumnId::Checkbox => self.toggle_completion(task_index),
            ColumnId::Custom(field_id) if self.is_checkbox_field(field_id) => {
                self.toggle_custom_checkbox(task_index, field_id);
            }
            _ => {
                self.edit = EditSession::open(task, column, &self.custom_fields, today);
            }
        }
    }

    fn is_checkbox_field(&self, field_id: i64) -> bool {
        self.custom_fields
            .iter()
            .any(|d| d.id == field_id && d.field_type == CustomFieldType::Checkbox)
    }

    /// The completion checkbox is a view of `status == done`; toggling it is
    /// a status transition.
    fn toggle_completion(&mut self, task_index: usize) {
        let task = &self.tasks[task_index];
        let next = if task.status.is_done() {
            TaskStatus::Todo
        } else {
            TaskStatus::Done
        };
        self.intents.push(UpdateIntent::Status(task.id, next));
    }

    fn toggle_custom_checkbox(&mut self, task_index: usize, field_id: i64) {
        let task = &self.tasks[task_index];
        let current = task
            .custom_field_values
            .get(&field_id)
            .and_then(|v| v.value.as_bool())
            .unwrap_or(false);
        self.intents.push(UpdateIntent::CustomField(
            task.id,
            field_id,
            Some(serde_json::Value::Bool(!current)),
        ));
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, store: &mut dyn LayoutStore) {
        let (x, y) = (event.column, event.row);

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(hit) = self.hits.header_at(x, y) {
                    self.pressed_header = Some(hit.column);
                    self.drag = DragSession::start(hit.column, x, y);
                } else if let Some((status, _)) = self
                    .hits
                    .bucket_toggles
                    .iter()
                    .find(|(_, toggle_y)| *toggle_y == y)
                    .copied()
                {
                    self.groups.toggle(status);
                } else if let Some((status, _)) = self
                    .hits
                    .show_more
                    .iter()
                    .find(|(_, more_y)| *more_y == y)
                    .copied()
                {
                    self.groups.show_more(status);
                } else if let Some((flat, _)) = self.hits.row_at(y) {
                    self.cursor_row = flat;
                    if let Some(col) = self.hits.column_index_at(x) {
                        self.cursor_col = col;
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(session) = &mut self.drag {
                    session.update(x, y);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let pressed = self.pressed_header.take();
                if let Some(session) = self.drag.take() {
                    if session.is_active() {
                        let (drop_x, drop_y) = session.position();
                        if let Some(target) = self.hits.header_at(drop_x, drop_y) {
                            self.columns
                                .move_column(session.source, target.column, store);
                        }
                        return;
                    }
                }
                // A press-and-release on a header without drag activation is
                // a sort click.
                if let Some(column) = pressed {
                    if self.hits.header_at(x, y).map(|h| h.column) == Some(column) {
                        self.sort.cycle(column);
                    }
                }
            }
            MouseEventKind::ScrollDown => self.scroll_bucket_at(y, 3),
            MouseEventKind::ScrollUp => self.scroll_bucket_at(y, -3),
            _ => {}
        }
    }

    fn scroll_bucket_at(&mut self, y: u16, delta: isize) {
        let Some(status) = self.hits.bucket_region_at(y) else {
            return;
        };

        let views = self.bucket_views();
        let Some(view) = views.iter().find(|v| v.status == status) else {
            return;
        };
        if view.strategy != RenderStrategy::Virtualized {
            return;
        }

        let max = max_scroll_offset(view.visible.len(), MAX_VIEWPORT_ROWS as usize);
        let offset = self.scroll_offset(status).saturating_add_signed(delta).min(max);
        self.scroll_offsets.insert(status, offset);
    }

    /// Keep the cursor row inside its bucket's viewport when the bucket is
    /// rendered through the windowed path.
    fn ensure_cursor_visible(&mut self) {
        let views = self.bucket_views();
        let mut flat = 0usize;

        for view in views.iter().filter(|v| v.total > 0 && v.expanded) {
            let len = view.visible.len();
            if self.cursor_row < flat + len {
                if view.strategy == RenderStrategy::Virtualized {
                    let pos = self.cursor_row - flat;
                    let viewport = MAX_VIEWPORT_ROWS as usize;
                    let mut offset = self.scroll_offset(view.status);
                    if pos < offset {
                        offset = pos;
                    } else if pos >= offset + viewport {
                        offset = pos + 1 - viewport;
                    }
                    self.scroll_offsets.insert(view.status, offset);
                }
                return;
            }
            flat += len;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;

    use chrono::Utc;
    use crossterm::event::{KeyEvent, KeyModifiers};
    use encore_shared::TaskType;

    use super::*;
    use crate::layout::MemoryLayoutStore;

    fn task(title: &str, status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: title.to_string(),
            status,
            priority: Priority::Normal,
            task_type: TaskType::General,
            due_date: None,
            assigned_to_users: Vec::new(),
            related: None,
            custom_field_values: StdHashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn table_with(tasks: Vec<Task>) -> (TaskTable, MemoryLayoutStore) {
        let mut store = MemoryLayoutStore::default();
        let mut table = TaskTable::new(&store);
        table.set_data(
            Uuid::new_v4(),
            tasks,
            Vec::new(),
            Vec::new(),
            &mut store,
        );
        (table, store)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    #[test]
    fn empty_buckets_report_zero_and_render_nothing() {
        let (table, _) = table_with(vec![task("a", TaskStatus::Todo)]);
        let views = table.bucket_views();

        assert_eq!(views.len(), 6);
        assert_eq!(views[0].total, 1);
        assert!(views[1..].iter().all(|v| v.total == 0));
    }

    #[test]
    fn space_toggles_completion_through_a_status_intent() {
        let (mut table, _) = table_with(vec![task("a", TaskStatus::Todo)]);
        let id = table.tasks[0].id;

        table.handle_key(key(KeyCode::Char(' ')), Instant::now(), today());
        assert_eq!(
            table.drain_intents(),
            vec![UpdateIntent::Status(id, TaskStatus::Done)]
        );
    }

    #[test]
    fn enter_on_title_emits_open_task() {
        let (mut table, _) = table_with(vec![task("a", TaskStatus::Todo)]);
        let id = table.tasks[0].id;

        table.cursor_col = 1;
        table.handle_key(key(KeyCode::Enter), Instant::now(), today());
        assert_eq!(table.drain_intents(), vec![UpdateIntent::OpenTask(id)]);
    }

    #[test]
    fn enter_on_status_opens_an_editor_and_commits_on_enter() {
        let (mut table, _) = table_with(vec![task("a", TaskStatus::Todo)]);
        let id = table.tasks[0].id;

        // status is the fifth default column.
        table.cursor_col = 4;
        table.handle_key(key(KeyCode::Enter), Instant::now(), today());
        assert!(table.edit.is_some());

        table.handle_key(key(KeyCode::Char('j')), Instant::now(), today());
        table.handle_key(key(KeyCode::Enter), Instant::now(), today());
        assert!(table.edit.is_none());
        assert_eq!(
            table.drain_intents(),
            vec![UpdateIntent::Status(id, TaskStatus::InProgress)]
        );
    }

    #[test]
    fn switching_query_resets_session_state_but_not_layout() {
        let mut store = MemoryLayoutStore::default();
        let mut table = TaskTable::new(&store);

        let first = Uuid::new_v4();
        table.set_data(first, vec![task("a", TaskStatus::Todo)], Vec::new(), Vec::new(), &mut store);
        table.sort.cycle(ColumnId::Title);
        table.groups.show_more(TaskStatus::Todo);
        assert!(table.columns.move_column(ColumnId::Priority, ColumnId::Due, &mut store));

        // Same query: state survives a refresh.
        table.set_data(first, vec![task("a", TaskStatus::Todo)], Vec::new(), Vec::new(), &mut store);
        assert!(table.sort.is_active());

        // New query: session state resets, persisted layout stays.
        table.set_data(Uuid::new_v4(), Vec::new(), Vec::new(), Vec::new(), &mut store);
        assert!(!table.sort.is_active());
        assert_eq!(table.groups.visible_count(TaskStatus::Todo, 100), 5);
        assert_eq!(table.columns.fixed_order()[6], ColumnId::Priority);
    }

    #[test]
    fn header_click_without_travel_sorts_and_drag_reorders() {
        let (mut table, mut store) = table_with(vec![task("a", TaskStatus::Todo)]);
        table.hits.headers = vec![
            HeaderHit { column: ColumnId::Type, x_start: 10, x_end: 20, y: 0 },
            HeaderHit { column: ColumnId::Priority, x_start: 20, x_end: 30, y: 0 },
        ];

        // Click: press and release in place.
        let down = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 12,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        let up = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column: 12,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        table.handle_mouse(down, &mut store);
        table.handle_mouse(up, &mut store);
        assert_eq!(table.sort.column, Some(ColumnId::Type));

        // Drag: press, travel past the threshold, release over priority.
        table.handle_mouse(
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 12,
                row: 0,
                modifiers: KeyModifiers::NONE,
            },
            &mut store,
        );
        table.handle_mouse(
            MouseEvent {
                kind: MouseEventKind::Drag(MouseButton::Left),
                column: 25,
                row: 0,
                modifiers: KeyModifiers::NONE,
            },
            &mut store,
        );
        table.handle_mouse(
            MouseEvent {
                kind: MouseEventKind::Up(MouseButton::Left),
                column: 25,
                row: 0,
                modifiers: KeyModifiers::NONE,
            },
            &mut store,
        );

        let order = table.columns.fixed_order();
        let type_pos = order.iter().position(|c| *c == ColumnId::Type).unwrap();
        let priority_pos = order.iter().position(|c| *c == ColumnId::Priority).unwrap();
        assert!(type_pos > priority_pos);
        // The sort state was not disturbed by the drag.
        assert_eq!(table.sort.column, Some(ColumnId::Type));
    }
}
