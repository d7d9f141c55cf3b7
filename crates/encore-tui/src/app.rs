use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use encore_shared::{
    api::{CreateCustomFieldRequest, TaskListParams, UpdateTaskRequest},
    CustomFieldDefinition, CustomFieldType, Priority, Project, Task, TaskStatus, TaskType, UserRef,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::layout::LayoutStore;
use crate::table::{TaskTable, UpdateIntent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    ProjectSelect,
    Tasks,
}

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick,
    ProjectsLoaded(Vec<Project>),
    ProjectDataLoaded {
        project_id: Uuid,
        tasks: Vec<Task>,
        custom_fields: Vec<CustomFieldDefinition>,
        members: Vec<UserRef>,
    },
    TasksRefreshed {
        project_id: Uuid,
        tasks: Vec<Task>,
    },
    Error(String),
}

/// One toggleable line in the filter panel.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    Type(TaskType),
    Priority(Priority),
    Status(TaskStatus),
    Assignee(Uuid, String),
    Custom(i64, String),
}

#[derive(Debug, Default)]
pub struct FilterPanel {
    pub cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewFieldFocus {
    Name,
    FieldType,
    Options,
    ShowInTable,
}

/// Popup form posting a custom-field-definition creation.
#[derive(Debug)]
pub struct NewFieldForm {
    pub name: String,
    pub type_index: usize,
    pub options: String,
    pub show_in_table: bool,
    pub focus: NewFieldFocus,
}

pub const FIELD_TYPES: [CustomFieldType; 5] = [
    CustomFieldType::Text,
    CustomFieldType::Number,
    CustomFieldType::Date,
    CustomFieldType::Checkbox,
    CustomFieldType::SingleSelect,
];

impl NewFieldForm {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            type_index: 0,
            options: String::new(),
            show_in_table: true,
            focus: NewFieldFocus::Name,
        }
    }

    pub fn field_type(&self) -> CustomFieldType {
        FIELD_TYPES[self.type_index]
    }

    fn request(&self) -> CreateCustomFieldRequest {
        let select_options = if self.field_type() == CustomFieldType::SingleSelect {
            Some(
                self.options
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            )
        } else {
            None
        };

        CreateCustomFieldRequest {
            field_name: self.name.trim().to_string(),
            field_type: self.field_type(),
            select_options,
            show_in_table: self.show_in_table,
        }
    }
}

pub struct App {
    pub api: Arc<ApiClient>,
    pub view: View,

    // Loading state
    pub loading: bool,
    pub loading_message: String,
    pub error_message: Option<String>,
    pub notice: Option<String>,

    // Project selection
    pub projects: Vec<Project>,
    pub selected_project_idx: usize,
    pub current_project: Option<Project>,

    // Task table
    pub store: Box<dyn LayoutStore + Send>,
    pub table: TaskTable,
    pub filter_panel: Option<FilterPanel>,
    pub new_field_form: Option<NewFieldForm>,
}

impl App {
    pub fn new(api: ApiClient, store: Box<dyn LayoutStore + Send>) -> Self {
        let table = TaskTable::new(store.as_ref());

        Self {
            api: Arc::new(api),
            view: View::ProjectSelect,
            loading: false,
            loading_message: String::new(),
            error_message: None,
            notice: None,
            projects: Vec::new(),
            selected_project_idx: 0,
            current_project: None,
            store,
            table,
            filter_panel: None,
            new_field_form: None,
        }
    }

    pub fn set_loading(&mut self, loading: bool, message: &str) {
        self.loading = loading;
        self.loading_message = message.to_string();
    }

    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Handle key events, returns true if app should quit
    pub fn handle_key(&mut self, key: KeyEvent, tx: &mpsc::Sender<AppEvent>) -> Result<bool> {
        // Clear error on any key press
        if self.error_message.is_some() && key.code != KeyCode::Esc {
            self.clear_error();
        }

        // Global quit with Ctrl+C
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        let quit = match self.view {
            View::ProjectSelect => self.handle_project_select_key(key, tx),
            View::Tasks => self.handle_tasks_key(key, tx),
        };

        self.dispatch_intents(tx);
        Ok(quit)
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, tx: &mpsc::Sender<AppEvent>) {
        if self.view == View::Tasks
            && self.filter_panel.is_none()
            && self.new_field_form.is_none()
        {
            self.table.handle_mouse(event, self.store.as_mut());
            self.dispatch_intents(tx);
        }
    }

    pub fn on_tick(&mut self, tx: &mpsc::Sender<AppEvent>) {
        self.table.tick(Instant::now());
        self.dispatch_intents(tx);
    }

    fn handle_project_select_key(&mut self, key: KeyEvent, tx: &mpsc::Sender<AppEvent>) -> bool {
        if self.loading {
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected_project_idx < self.projects.len().saturating_sub(1) {
                    self.selected_project_idx += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.selected_project_idx > 0 {
                    self.selected_project_idx -= 1;
                }
            }
            KeyCode::Char('r') => self.load_projects(tx),
            KeyCode::Enter => {
                if let Some(project) = self.projects.get(self.selected_project_idx) {
                    self.current_project = Some(project.clone());
                    self.load_project_data(tx);
                }
            }
            _ => {}
        }

        false
    }

    fn handle_tasks_key(&mut self, key: KeyEvent, tx: &mpsc::Sender<AppEvent>) -> bool {
        if self.filter_panel.is_some() {
            self.handle_filter_panel_key(key);
            return false;
        }
        if self.new_field_form.is_some() {
            self.handle_new_field_key(key, tx);
            return false;
        }

        // An open cell editor consumes everything except the global keys.
        if self.table.edit.is_some() {
            self.table
                .handle_key(key, Instant::now(), chrono::Local::now().date_naive());
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Backspace => self.go_back_to_project_select(),
            KeyCode::Char('f') => self.filter_panel = Some(FilterPanel::default()),
            KeyCode::Char('n') => self.new_field_form = Some(NewFieldForm::new()),
            KeyCode::Char('r') => self.refresh_tasks(tx),
            _ => {
                self.table
                    .handle_key(key, Instant::now(), chrono::Local::now().date_naive());
            }
        }

        false
    }

    fn go_back_to_project_select(&mut self) {
        self.current_project = None;
        self.filter_panel = None;
        self.new_field_form = None;
        self.notice = None;
        self.view = View::ProjectSelect;
    }

    // ============ Filter panel ============

    /// All toggleable filter lines, in panel order.
    pub fn filter_entries(&self) -> Vec<FilterEntry> {
        let mut entries = Vec::new();

        entries.extend(TaskType::ALL.iter().map(|&t| FilterEntry::Type(t)));
        entries.extend(Priority::ALL.iter().map(|&p| FilterEntry::Priority(p)));
        entries.extend(TaskStatus::ALL.iter().map(|&s| FilterEntry::Status(s)));
        entries.extend(
            self.table
                .members
                .iter()
                .map(|m| FilterEntry::Assignee(m.id, m.name.clone())),
        );
        for def in &self.table.custom_fields {
            if def.field_type == CustomFieldType::SingleSelect && def.is_visible() {
                entries.extend(
                    def.select_options
                        .iter()
                        .map(|opt| FilterEntry::Custom(def.id, opt.clone())),
                );
            }
        }

        entries
    }

    pub fn filter_entry_active(&self, entry: &FilterEntry) -> bool {
        let filter = &self.table.filter;
        match entry {
            FilterEntry::Type(t) => filter.types.contains(t),
            FilterEntry::Priority(p) => filter.priorities.contains(p),
            FilterEntry::Status(s) => filter.statuses.contains(s),
            FilterEntry::Assignee(id, _) => filter.assignees.contains(id),
            FilterEntry::Custom(field_id, value) => filter
                .custom_fields
                .get(field_id)
                .map(|set| set.contains(value))
                .unwrap_or(false),
        }
    }

    fn toggle_filter_entry(&mut self, entry: &FilterEntry) {
        let filter = &mut self.table.filter;
        match entry {
            FilterEntry::Type(t) => {
                if !filter.types.remove(t) {
                    filter.types.insert(*t);
                }
            }
            FilterEntry::Priority(p) => {
                if !filter.priorities.remove(p) {
                    filter.priorities.insert(*p);
                }
            }
            FilterEntry::Status(s) => {
                if !filter.statuses.remove(s) {
                    filter.statuses.insert(*s);
                }
            }
            FilterEntry::Assignee(id, _) => {
                if !filter.assignees.remove(id) {
                    filter.assignees.insert(*id);
                }
            }
            FilterEntry::Custom(field_id, value) => {
                let set = filter.custom_fields.entry(*field_id).or_default();
                if !set.remove(value) {
                    set.insert(value.clone());
                }
            }
        }
    }

    fn handle_filter_panel_key(&mut self, key: KeyEvent) {
        let entries = self.filter_entries();
        let Some(panel) = &mut self.filter_panel else {
            return;
        };

        match key.code {
            KeyCode::Esc | KeyCode::Char('f') => self.filter_panel = None,
            KeyCode::Char('j') | KeyCode::Down => {
                panel.cursor = (panel.cursor + 1).min(entries.len().saturating_sub(1));
            }
            KeyCode::Char('k') | KeyCode::Up => {
                panel.cursor = panel.cursor.saturating_sub(1);
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let cursor = panel.cursor;
                if let Some(entry) = entries.get(cursor) {
                    self.toggle_filter_entry(&entry.clone());
                }
            }
            KeyCode::Char('x') => self.table.filter.clear(),
            _ => {}
        }
    }

    // ============ New custom field form ============

    fn handle_new_field_key(&mut self, key: KeyEvent, tx: &mpsc::Sender<AppEvent>) {
        let Some(form) = &mut self.new_field_form else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.new_field_form = None,
            KeyCode::Tab | KeyCode::BackTab => {
                let has_options = form.field_type() == CustomFieldType::SingleSelect;
                form.focus = match (form.focus, has_options) {
                    (NewFieldFocus::Name, _) => NewFieldFocus::FieldType,
                    (NewFieldFocus::FieldType, true) => NewFieldFocus::Options,
                    (NewFieldFocus::FieldType, false) => NewFieldFocus::ShowInTable,
                    (NewFieldFocus::Options, _) => NewFieldFocus::ShowInTable,
                    (NewFieldFocus::ShowInTable, _) => NewFieldFocus::Name,
                };
            }
            KeyCode::Char(' ') if form.focus == NewFieldFocus::ShowInTable => {
                form.show_in_table = !form.show_in_table;
            }
            KeyCode::Char('j') | KeyCode::Down if form.focus == NewFieldFocus::FieldType => {
                form.type_index = (form.type_index + 1) % FIELD_TYPES.len();
            }
            KeyCode::Char('k') | KeyCode::Up if form.focus == NewFieldFocus::FieldType => {
                form.type_index = (form.type_index + FIELD_TYPES.len() - 1) % FIELD_TYPES.len();
            }
            KeyCode::Enter => {
                if !form.name.trim().is_empty() {
                    let request = form.request();
                    self.new_field_form = None;
                    self.create_custom_field(request, tx);
                }
            }
            KeyCode::Char(c) => match form.focus {
                NewFieldFocus::Name => form.name.push(c),
                NewFieldFocus::Options => form.options.push(c),
                _ => {}
            },
            KeyCode::Backspace => match form.focus {
                NewFieldFocus::Name => {
                    form.name.pop();
                }
                NewFieldFocus::Options => {
                    form.options.pop();
                }
                _ => {}
            },
            _ => {}
        }
    }

    // ============ Data loading ============

    pub fn load_projects(&mut self, tx: &mpsc::Sender<AppEvent>) {
        self.set_loading(true, "Loading projects...");

        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let event = match api.list_projects().await {
                Ok(projects) => AppEvent::ProjectsLoaded(projects),
                Err(e) => AppEvent::Error(format!("Failed to load projects: {}", e)),
            };
            let _ = tx.send(event).await;
        });
    }

    pub fn on_projects_loaded(&mut self, projects: Vec<Project>) {
        self.projects = projects;
        self.selected_project_idx = 0;
        self.set_loading(false, "");
    }

    fn load_project_data(&mut self, tx: &mpsc::Sender<AppEvent>) {
        let Some(project_id) = self.current_project.as_ref().map(|p| p.id) else {
            return;
        };

        self.set_loading(true, "Loading tasks...");

        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let params = TaskListParams::default();
            let tasks = api.list_tasks(project_id, &params);
            let custom_fields = api.list_custom_fields(project_id);
            let members = api.list_members(project_id);

            let event = match tokio::try_join!(tasks, custom_fields, members) {
                Ok((tasks, custom_fields, members)) => AppEvent::ProjectDataLoaded {
                    project_id,
                    tasks: tasks.tasks,
                    custom_fields,
                    members,
                },
                Err(e) => AppEvent::Error(format!("Failed to load project data: {}", e)),
            };
            let _ = tx.send(event).await;
        });
    }

    pub fn on_project_data_loaded(
        &mut self,
        project_id: Uuid,
        tasks: Vec<Task>,
        custom_fields: Vec<CustomFieldDefinition>,
        members: Vec<UserRef>,
    ) {
        self.table.set_data(
            project_id,
            tasks,
            custom_fields,
            members,
            self.store.as_mut(),
        );
        self.view = View::Tasks;
        self.set_loading(false, "");
    }

    /// Re-pull the task collection for the current project. The refreshed
    /// data re-enters the table from the top.
    fn refresh_tasks(&mut self, tx: &mpsc::Sender<AppEvent>) {
        let Some(project_id) = self.current_project.as_ref().map(|p| p.id) else {
            return;
        };

        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let event = match api.list_tasks(project_id, &TaskListParams::default()).await {
                Ok(response) => AppEvent::TasksRefreshed {
                    project_id,
                    tasks: response.tasks,
                },
                Err(e) => AppEvent::Error(format!("Failed to refresh tasks: {}", e)),
            };
            let _ = tx.send(event).await;
        });
    }

    pub fn on_tasks_refreshed(&mut self, project_id: Uuid, tasks: Vec<Task>) {
        if self.current_project.as_ref().map(|p| p.id) != Some(project_id) {
            return;
        }
        let custom_fields = self.table.custom_fields.clone();
        let members = self.table.members.clone();
        self.table
            .set_data(project_id, tasks, custom_fields, members, self.store.as_mut());
    }

    fn create_custom_field(
        &mut self,
        request: CreateCustomFieldRequest,
        tx: &mpsc::Sender<AppEvent>,
    ) {
        let Some(project_id) = self.current_project.as_ref().map(|p| p.id) else {
            return;
        };

        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = api.create_custom_field(project_id, &request).await {
                let _ = tx
                    .send(AppEvent::Error(format!("Failed to create field: {}", e)))
                    .await;
                return;
            }

            // Reload everything so the new column reconciles into the
            // persisted order.
            let params = TaskListParams::default();
            let tasks = api.list_tasks(project_id, &params);
            let custom_fields = api.list_custom_fields(project_id);
            let members = api.list_members(project_id);
            let event = match tokio::try_join!(tasks, custom_fields, members) {
                Ok((tasks, custom_fields, members)) => AppEvent::ProjectDataLoaded {
                    project_id,
                    tasks: tasks.tasks,
                    custom_fields,
                    members,
                },
                Err(e) => AppEvent::Error(format!("Failed to reload project data: {}", e)),
            };
            let _ = tx.send(event).await;
        });
    }

    // ============ Mutation intents ============

    /// Forward the table's emitted intents to the API, fire-and-forget. A
    /// successful mutation schedules a task refresh; failures surface as
    /// error popups here, never inside the table.
    fn dispatch_intents(&mut self, tx: &mpsc::Sender<AppEvent>) {
        let intents = self.table.drain_intents();
        if intents.is_empty() {
            return;
        }

        for intent in intents {
            match intent {
                UpdateIntent::OpenTask(task_id) => {
                    if let Some(task) = self.table.tasks.iter().find(|t| t.id == task_id) {
                        self.notice = Some(format!("Task: {}", task.title));
                        tracing::info!(%task_id, "task opened");
                    }
                }
                UpdateIntent::Status(task_id, status) => {
                    self.spawn_task_update(
                        task_id,
                        UpdateTaskRequest {
                            status: Some(status),
                            ..Default::default()
                        },
                        tx,
                    );
                }
                UpdateIntent::Priority(task_id, priority) => {
                    self.spawn_task_update(
                        task_id,
                        UpdateTaskRequest {
                            priority: Some(priority),
                            ..Default::default()
                        },
                        tx,
                    );
                }
                UpdateIntent::Assignees(task_id, user_ids) => {
                    self.spawn_task_update(
                        task_id,
                        UpdateTaskRequest {
                            assigned_to_user_ids: Some(user_ids),
                            ..Default::default()
                        },
                        tx,
                    );
                }
                UpdateIntent::DueDate(task_id, date) => {
                    self.spawn_task_update(
                        task_id,
                        UpdateTaskRequest {
                            due_date: Some(date),
                            ..Default::default()
                        },
                        tx,
                    );
                }
                UpdateIntent::CustomField(task_id, field_id, value) => {
                    let api = self.api.clone();
                    let tx = tx.clone();
                    let refresh = self.current_project.as_ref().map(|p| p.id);
                    tokio::spawn(async move {
                        match api.set_custom_field_value(task_id, field_id, value).await {
                            Ok(()) => send_refresh(api, refresh, tx).await,
                            Err(e) => {
                                let _ = tx
                                    .send(AppEvent::Error(format!("Update failed: {}", e)))
                                    .await;
                            }
                        }
                    });
                }
            }
        }
    }

    fn spawn_task_update(
        &self,
        task_id: Uuid,
        request: UpdateTaskRequest,
        tx: &mpsc::Sender<AppEvent>,
    ) {
        let api = self.api.clone();
        let tx = tx.clone();
        let refresh = self.current_project.as_ref().map(|p| p.id);
        tokio::spawn(async move {
            match api.update_task(task_id, &request).await {
                Ok(_) => send_refresh(api, refresh, tx).await,
                Err(e) => {
                    let _ = tx
                        .send(AppEvent::Error(format!("Update failed: {}", e)))
                        .await;
                }
            }
        });
    }
}

async fn send_refresh(
    api: Arc<ApiClient>,
    project_id: Option<Uuid>,
    tx: mpsc::Sender<AppEvent>,
) {
    let Some(project_id) = project_id else {
        return;
    };

    let event = match api.list_tasks(project_id, &TaskListParams::default()).await {
        Ok(response) => AppEvent::TasksRefreshed {
            project_id,
            tasks: response.tasks,
        },
        Err(e) => AppEvent::Error(format!("Failed to refresh tasks: {}", e)),
    };
    let _ = tx.send(event).await;
}
