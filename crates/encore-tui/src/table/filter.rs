//! Filter engine: AND across dimensions, OR within a dimension.
//!
//! An empty set for a dimension means the dimension is inactive, not that
//! everything is rejected. Filtering is a pure function of the task
//! collection and the filter configuration.

use std::collections::{HashMap, HashSet};

use encore_shared::{Priority, Task, TaskStatus, TaskType};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub types: HashSet<TaskType>,
    pub priorities: HashSet<Priority>,
    pub statuses: HashSet<TaskStatus>,
    pub assignees: HashSet<Uuid>,
    pub custom_fields: HashMap<i64, HashSet<String>>,
}

impl TaskFilter {
    pub fn is_active(&self) -> bool {
        !self.types.is_empty()
            || !self.priorities.is_empty()
            || !self.statuses.is_empty()
            || !self.assignees.is_empty()
            || self.custom_fields.values().any(|set| !set.is_empty())
    }

    pub fn clear(&mut self) {
        self.types.clear();
        self.priorities.clear();
        self.statuses.clear();
        self.assignees.clear();
        self.custom_fields.clear();
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.types.is_empty() && !self.types.contains(&task.task_type) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.assignees.is_empty()
            && !task
                .assigned_to_users
                .iter()
                .any(|user| self.assignees.contains(&user.id))
        {
            return false;
        }

        for (field_id, accepted) in &self.custom_fields {
            if accepted.is_empty() {
                continue;
            }
            // Raw value, not display_value; a task without a value for the
            // field fails the dimension.
            let matched = task
                .custom_field_values
                .get(field_id)
                .and_then(|v| v.value_text())
                .map(|text| accepted.contains(&text))
                .unwrap_or(false);
            if !matched {
                return false;
            }
        }

        true
    }

    /// Indices of matching tasks, in input order.
    pub fn apply(&self, tasks: &[Task]) -> Vec<usize> {
        tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| self.matches(task))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use encore_shared::{CustomFieldValue, UserRef};

    use super::*;

    fn task(task_type: TaskType, priority: Priority, status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Clear sync license".to_string(),
            status,
            priority,
            task_type,
            due_date: None,
            assigned_to_users: Vec::new(),
            related: None,
            custom_field_values: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_passes_everything() {
        let filter = TaskFilter::default();
        let tasks = vec![
            task(TaskType::Contract, Priority::Low, TaskStatus::Todo),
            task(TaskType::Campaign, Priority::Urgent, TaskStatus::Done),
        ];
        assert_eq!(filter.apply(&tasks), vec![0, 1]);
    }

    #[test]
    fn dimensions_combine_with_and() {
        let mut filter = TaskFilter::default();
        filter.types.insert(TaskType::Contract);
        filter.priorities.insert(Priority::Urgent);

        let tasks = vec![
            task(TaskType::Contract, Priority::Urgent, TaskStatus::Todo),
            task(TaskType::Contract, Priority::Low, TaskStatus::Todo),
            task(TaskType::Campaign, Priority::Urgent, TaskStatus::Todo),
        ];
        assert_eq!(filter.apply(&tasks), vec![0]);
    }

    #[test]
    fn values_within_a_dimension_combine_with_or() {
        let mut filter = TaskFilter::default();
        filter.statuses.insert(TaskStatus::Todo);
        filter.statuses.insert(TaskStatus::Review);

        let tasks = vec![
            task(TaskType::General, Priority::Normal, TaskStatus::Todo),
            task(TaskType::General, Priority::Normal, TaskStatus::Done),
            task(TaskType::General, Priority::Normal, TaskStatus::Review),
        ];
        assert_eq!(filter.apply(&tasks), vec![0, 2]);
    }

    #[test]
    fn assignee_matches_on_id_intersection() {
        let anna = UserRef {
            id: Uuid::new_v4(),
            name: "Anna".to_string(),
        };
        let ben = UserRef {
            id: Uuid::new_v4(),
            name: "Ben".to_string(),
        };

        let mut assigned = task(TaskType::General, Priority::Normal, TaskStatus::Todo);
        assigned.assigned_to_users = vec![anna.clone(), ben.clone()];
        let unassigned = task(TaskType::General, Priority::Normal, TaskStatus::Todo);

        let mut filter = TaskFilter::default();
        filter.assignees.insert(anna.id);

        let tasks = vec![assigned, unassigned];
        assert_eq!(filter.apply(&tasks), vec![0]);
    }

    #[test]
    fn custom_field_filter_uses_raw_value_and_fails_missing() {
        let mut with_value = task(TaskType::General, Priority::Normal, TaskStatus::Todo);
        with_value.custom_field_values.insert(
            7,
            CustomFieldValue {
                value: serde_json::json!("approved"),
                display_value: Some("Approved ✓".to_string()),
            },
        );
        let without_value = task(TaskType::General, Priority::Normal, TaskStatus::Todo);

        let mut filter = TaskFilter::default();
        filter
            .custom_fields
            .insert(7, HashSet::from(["approved".to_string()]));

        let tasks = vec![with_value, without_value];
        assert_eq!(filter.apply(&tasks), vec![0]);

        // Display value alone never matches.
        let mut display_only = TaskFilter::default();
        display_only
            .custom_fields
            .insert(7, HashSet::from(["Approved ✓".to_string()]));
        assert!(display_only.apply(&tasks).is_empty());
    }

    #[test]
    fn empty_custom_field_set_is_pass_through() {
        let mut filter = TaskFilter::default();
        filter.custom_fields.insert(7, HashSet::new());

        let tasks = vec![task(TaskType::General, Priority::Normal, TaskStatus::Todo)];
        assert_eq!(filter.apply(&tasks), vec![0]);
        assert!(!filter.is_active());
    }
}
