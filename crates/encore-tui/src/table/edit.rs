//! Inline edit surfaces.
//!
//! Selector cells (status, priority, assignees, select options, dates) emit
//! an update intent the moment a choice is made. Free-text and numeric cells
//! go through [`DebouncedField`]: emission happens a fixed delay after the
//! last keystroke, or immediately on blur when the value still differs from
//! the last emitted one, so no edit is lost on focus-out.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use encore_shared::{
    CustomFieldDefinition, CustomFieldType, Priority, Task, TaskStatus, UserRef,
};
use uuid::Uuid;

use super::columns::ColumnId;
use super::UpdateIntent;
use crate::calendar::DatePicker;

pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending { value: String, deadline: Instant },
    Flushed,
}

/// Debounce-with-flush-on-blur, as an explicit state machine per editable
/// cell. Keystrokes reset the deadline; the timer firing emits; blur emits
/// immediately when the pending value differs from the last emission.
#[derive(Debug)]
pub struct DebouncedField {
    state: DebounceState,
    last_emitted: Option<String>,
    delay: Duration,
}

impl DebouncedField {
    pub fn new(initial: Option<String>) -> Self {
        Self::with_delay(initial, DEBOUNCE_DELAY)
    }

    pub fn with_delay(initial: Option<String>, delay: Duration) -> Self {
        Self {
            state: DebounceState::Idle,
            last_emitted: initial,
            delay,
        }
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn input(&mut self, value: String, now: Instant) {
        self.state = DebounceState::Pending {
            value,
            deadline: now + self.delay,
        };
    }

    /// Timer tick. Emits the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.state {
            DebounceState::Pending { value, deadline } if now >= *deadline => {
                let value = value.clone();
                self.state = DebounceState::Flushed;
                self.last_emitted = Some(value.clone());
                Some(value)
            }
            _ => None,
        }
    }

    /// Focus-out. Emits the pending value immediately when it differs from
    /// the last emitted one.
    pub fn blur(&mut self) -> Option<String> {
        if let DebounceState::Pending { value, .. } = &self.state {
            let value = value.clone();
            self.state = DebounceState::Flushed;
            if self.last_emitted.as_ref() != Some(&value) {
                self.last_emitted = Some(value.clone());
                return Some(value);
            }
        }
        None
    }

    /// Teardown: a pending emission is dropped, not deferred.
    pub fn cancel(&mut self) {
        self.state = DebounceState::Idle;
    }
}

#[derive(Debug)]
pub enum CellEditor {
    Status {
        selected: usize,
    },
    Priority {
        selected: usize,
    },
    Assignees {
        selected: usize,
        chosen: HashSet<Uuid>,
    },
    Date {
        picker: DatePicker,
    },
    Select {
        field_id: i64,
        options: Vec<String>,
        selected: usize,
    },
    Text {
        field_id: i64,
        buffer: String,
        numeric: bool,
        debounce: DebouncedField,
    },
}

/// An open editor for one cell of one task.
#[derive(Debug)]
pub struct EditSession {
    pub task_id: Uuid,
    pub column: ColumnId,
    pub editor: CellEditor,
}

/// What a key or timer event did to the session.
pub enum EditAction {
    Continue,
    Close,
    /// Emit and keep editing (debounce fires, assignee toggles).
    Emit(UpdateIntent),
    /// Emit and close (selector chosen, text blurred).
    EmitClose(UpdateIntent),
}

impl EditSession {
    /// Open the editor for a cell, or `None` for cells without one (the
    /// checkbox column and checkbox custom fields toggle directly).
    pub fn open(
        task: &Task,
        column: ColumnId,
        defs: &[CustomFieldDefinition],
        today: chrono::NaiveDate,
    ) -> Option<Self> {
        let editor = match column {
            ColumnId::Checkbox | ColumnId::Title | ColumnId::Type => return None,
            ColumnId::Status => CellEditor::Status {
                selected: TaskStatus::ALL
                    .iter()
                    .position(|s| *s == task.status)
                    .unwrap_or(0),
            },
            ColumnId::Priority => CellEditor::Priority {
                selected: Priority::ALL
                    .iter()
                    .position(|p| *p == task.priority)
                    .unwrap_or(0),
            },
            ColumnId::Assigned => CellEditor::Assignees {
                selected: 0,
                chosen: task.assigned_to_users.iter().map(|u| u.id).collect(),
            },
            ColumnId::Due => CellEditor::Date {
                picker: DatePicker::new(task.due_date, today),
            },
            ColumnId::Custom(field_id) => {
                let def = defs.iter().find(|d| d.id == field_id)?;
                match def.field_type {
                    CustomFieldType::Checkbox => return None,
                    CustomFieldType::SingleSelect => CellEditor::Select {
                        field_id,
                        options: def.select_options.clone(),
                        selected: 0,
                    },
                    CustomFieldType::Date => {
                        let current = task
                            .custom_field_values
                            .get(&field_id)
                            .and_then(|v| v.value.as_str())
                            .and_then(|s| s.parse().ok());
                        CellEditor::Date {
                            picker: DatePicker::new(current, today),
                        }
                    }
                    CustomFieldType::Text | CustomFieldType::Number => {
                        let current = task
                            .custom_field_values
                            .get(&field_id)
                            .and_then(|v| v.value_text());
                        CellEditor::Text {
                            field_id,
                            buffer: current.clone().unwrap_or_default(),
                            numeric: def.field_type == CustomFieldType::Number,
                            debounce: DebouncedField::new(current),
                        }
                    }
                }
            }
        };

        Some(Self {
            task_id: task.id,
            column,
            editor,
        })
    }

    /// Timer tick: fires a due debounce emission, if any.
    pub fn tick(&mut self, now: Instant) -> Option<UpdateIntent> {
        match &mut self.editor {
            CellEditor::Text {
                field_id, debounce, ..
            } => debounce
                .poll(now)
                .map(|value| text_intent(self.task_id, *field_id, value)),
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, members: &[UserRef], now: Instant) -> EditAction {
        let task_id = self.task_id;
        let column = self.column;

        match &mut self.editor {
            CellEditor::Status { selected } => match key.code {
                KeyCode::Esc => EditAction::Close,
                KeyCode::Char('j') | KeyCode::Down => {
                    *selected = (*selected + 1).min(TaskStatus::ALL.len() - 1);
                    EditAction::Continue
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    *selected = selected.saturating_sub(1);
                    EditAction::Continue
                }
                KeyCode::Enter => {
                    EditAction::EmitClose(UpdateIntent::Status(task_id, TaskStatus::ALL[*selected]))
                }
                _ => EditAction::Continue,
            },
            CellEditor::Priority { selected } => match key.code {
                KeyCode::Esc => EditAction::Close,
                KeyCode::Char('j') | KeyCode::Down => {
                    *selected = (*selected + 1).min(Priority::ALL.len() - 1);
                    EditAction::Continue
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    *selected = selected.saturating_sub(1);
                    EditAction::Continue
                }
                KeyCode::Enter => {
                    EditAction::EmitClose(UpdateIntent::Priority(task_id, Priority::ALL[*selected]))
                }
                _ => EditAction::Continue,
            },
            CellEditor::Assignees { selected, chosen } => match key.code {
                KeyCode::Esc | KeyCode::Enter => EditAction::Close,
                KeyCode::Char('j') | KeyCode::Down => {
                    *selected = (*selected + 1).min(members.len().saturating_sub(1));
                    EditAction::Continue
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    *selected = selected.saturating_sub(1);
                    EditAction::Continue
                }
                KeyCode::Char(' ') => {
                    let Some(member) = members.get(*selected) else {
                        return EditAction::Continue;
                    };
                    if !chosen.remove(&member.id) {
                        chosen.insert(member.id);
                    }
                    let mut ids: Vec<Uuid> = members
                        .iter()
                        .map(|m| m.id)
                        .filter(|id| chosen.contains(id))
                        .collect();
                    let extra: Vec<Uuid> =
                        chosen.iter().filter(|id| !ids.contains(id)).copied().collect();
                    ids.extend(extra);
                    EditAction::Emit(UpdateIntent::Assignees(task_id, ids))
                }
                _ => EditAction::Continue,
            },
            CellEditor::Date { picker } => match key.code {
                KeyCode::Esc => EditAction::Close,
                KeyCode::Char('h') | KeyCode::Left => {
                    picker.move_days(-1);
                    EditAction::Continue
                }
                KeyCode::Char('l') | KeyCode::Right => {
                    picker.move_days(1);
                    EditAction::Continue
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    picker.move_days(7);
                    EditAction::Continue
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    picker.move_days(-7);
                    EditAction::Continue
                }
                KeyCode::Char('[') => {
                    picker.move_months(-1);
                    EditAction::Continue
                }
                KeyCode::Char(']') => {
                    picker.move_months(1);
                    EditAction::Continue
                }
                KeyCode::Char('x') | KeyCode::Delete => {
                    EditAction::EmitClose(date_intent(task_id, column, None))
                }
                KeyCode::Enter => {
                    EditAction::EmitClose(date_intent(task_id, column, Some(picker.cursor())))
                }
                _ => EditAction::Continue,
            },
            CellEditor::Select {
                field_id,
                options,
                selected,
            } => match key.code {
                KeyCode::Esc => EditAction::Close,
                KeyCode::Char('j') | KeyCode::Down => {
                    // Last entry clears the value.
                    *selected = (*selected + 1).min(options.len());
                    EditAction::Continue
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    *selected = selected.saturating_sub(1);
                    EditAction::Continue
                }
                KeyCode::Enter => {
                    let value = options
                        .get(*selected)
                        .map(|opt| serde_json::Value::String(opt.clone()));
                    EditAction::EmitClose(UpdateIntent::CustomField(task_id, *field_id, value))
                }
                _ => EditAction::Continue,
            },
            CellEditor::Text {
                field_id,
                buffer,
                numeric,
                debounce,
            } => match key.code {
                // Esc and Enter both blur; a pending edit flushes first.
                KeyCode::Esc | KeyCode::Enter => match debounce.blur() {
                    Some(value) => EditAction::EmitClose(text_intent(task_id, *field_id, value)),
                    None => EditAction::Close,
                },
                KeyCode::Char(c) => {
                    if *numeric && !(c.is_ascii_digit() || c == '.' || c == '-') {
                        return EditAction::Continue;
                    }
                    buffer.push(c);
                    debounce.input(buffer.clone(), now);
                    EditAction::Continue
                }
                KeyCode::Backspace => {
                    buffer.pop();
                    debounce.input(buffer.clone(), now);
                    EditAction::Continue
                }
                _ => EditAction::Continue,
            },
        }
    }

    /// Teardown: drop any pending debounce without emitting.
    pub fn cancel(&mut self) {
        if let CellEditor::Text { debounce, .. } = &mut self.editor {
            debounce.cancel();
        }
    }
}

fn date_intent(task_id: Uuid, column: ColumnId, date: Option<chrono::NaiveDate>) -> UpdateIntent {
    match column {
        ColumnId::Custom(field_id) => UpdateIntent::CustomField(
            task_id,
            field_id,
            date.map(|d| serde_json::Value::String(d.to_string())),
        ),
        _ => UpdateIntent::DueDate(task_id, date),
    }
}

fn text_intent(task_id: Uuid, field_id: i64, value: String) -> UpdateIntent {
    let value = if value.is_empty() {
        None
    } else {
        Some(serde_json::Value::String(value))
    };
    UpdateIntent::CustomField(task_id, field_id, value)
}
