//! Status buckets: the filtered task set partitioned into the six workflow
//! states, each with its own expansion flag and paged visible count.

use encore_shared::{Task, TaskStatus};

/// Rows shown when a bucket first renders.
pub const INITIAL_VISIBLE: usize = 5;
/// Rows added per "show more".
pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct Bucket {
    pub status: TaskStatus,
    pub task_indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct BucketState {
    expanded: bool,
    visible_count: usize,
}

/// Session-local per-status presentation state. Reset whenever the table's
/// query identity changes.
#[derive(Debug)]
pub struct GroupState {
    states: [BucketState; TaskStatus::ALL.len()],
}

impl Default for GroupState {
    fn default() -> Self {
        let states = TaskStatus::ALL.map(|status| BucketState {
            expanded: status.default_expanded(),
            visible_count: INITIAL_VISIBLE,
        });
        Self { states }
    }
}

impl GroupState {
    fn slot(&self, status: TaskStatus) -> usize {
        TaskStatus::ALL
            .iter()
            .position(|s| *s == status)
            .unwrap_or(0)
    }

    pub fn is_expanded(&self, status: TaskStatus) -> bool {
        self.states[self.slot(status)].expanded
    }

    pub fn toggle(&mut self, status: TaskStatus) {
        let slot = self.slot(status);
        self.states[slot].expanded = !self.states[slot].expanded;
    }

    pub fn all_expanded(&self) -> bool {
        self.states.iter().all(|s| s.expanded)
    }

    /// Expand-all / collapse-all: every bucket's flag is set uniformly. The
    /// toggle collapses only when everything is already expanded.
    pub fn toggle_all(&mut self) {
        let expand = !self.all_expanded();
        for state in &mut self.states {
            state.expanded = expand;
        }
    }

    pub fn visible_count(&self, status: TaskStatus, bucket_len: usize) -> usize {
        self.states[self.slot(status)].visible_count.min(bucket_len)
    }

    pub fn remaining(&self, status: TaskStatus, bucket_len: usize) -> usize {
        bucket_len.saturating_sub(self.visible_count(status, bucket_len))
    }

    pub fn show_more(&mut self, status: TaskStatus) {
        let slot = self.slot(status);
        self.states[slot].visible_count += PAGE_SIZE;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Partition filtered indices into the six status buckets, preserving the
/// incoming order within each bucket. Every task lands in exactly one
/// bucket; the closed status enum leaves no unrecognized state to drop.
pub fn partition(tasks: &[Task], filtered: &[usize]) -> Vec<Bucket> {
    TaskStatus::ALL
        .iter()
        .map(|&status| Bucket {
            status,
            task_indices: filtered
                .iter()
                .copied()
                .filter(|&i| tasks[i].status == status)
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use encore_shared::{Priority, TaskType};
    use uuid::Uuid;

    use super::*;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Book mastering session".to_string(),
            status,
            priority: Priority::Normal,
            task_type: TaskType::General,
            due_date: None,
            assigned_to_users: Vec::new(),
            related: None,
            custom_field_values: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn buckets_are_exhaustive_and_disjoint() {
        let tasks: Vec<Task> = [
            TaskStatus::Done,
            TaskStatus::Todo,
            TaskStatus::Blocked,
            TaskStatus::Todo,
            TaskStatus::Cancelled,
            TaskStatus::Review,
            TaskStatus::InProgress,
            TaskStatus::Todo,
        ]
        .into_iter()
        .map(task)
        .collect();
        let filtered: Vec<usize> = (0..tasks.len()).collect();

        let buckets = partition(&tasks, &filtered);
        assert_eq!(buckets.len(), 6);

        let mut seen: Vec<usize> = buckets
            .iter()
            .flat_map(|b| b.task_indices.iter().copied())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, filtered);

        for bucket in &buckets {
            assert!(bucket
                .task_indices
                .iter()
                .all(|&i| tasks[i].status == bucket.status));
        }
    }

    #[test]
    fn partition_preserves_input_order_within_buckets() {
        let tasks: Vec<Task> = [TaskStatus::Todo, TaskStatus::Done, TaskStatus::Todo]
            .into_iter()
            .map(task)
            .collect();

        let buckets = partition(&tasks, &[2, 1, 0]);
        assert_eq!(buckets[0].task_indices, vec![2, 0]);
        assert_eq!(buckets[4].task_indices, vec![1]);
    }

    #[test]
    fn default_expansion_collapses_done_and_cancelled() {
        let groups = GroupState::default();
        assert!(groups.is_expanded(TaskStatus::Todo));
        assert!(groups.is_expanded(TaskStatus::InProgress));
        assert!(groups.is_expanded(TaskStatus::Blocked));
        assert!(groups.is_expanded(TaskStatus::Review));
        assert!(!groups.is_expanded(TaskStatus::Done));
        assert!(!groups.is_expanded(TaskStatus::Cancelled));
    }

    #[test]
    fn show_more_pages_by_twenty() {
        let mut groups = GroupState::default();
        assert_eq!(groups.visible_count(TaskStatus::Todo, 90), 5);
        assert_eq!(groups.remaining(TaskStatus::Todo, 90), 85);

        groups.show_more(TaskStatus::Todo);
        assert_eq!(groups.visible_count(TaskStatus::Todo, 90), 25);
        assert_eq!(groups.remaining(TaskStatus::Todo, 90), 65);

        // Visible count clamps to the bucket size.
        groups.show_more(TaskStatus::Todo);
        assert_eq!(groups.visible_count(TaskStatus::Todo, 30), 30);
        assert_eq!(groups.remaining(TaskStatus::Todo, 30), 0);
    }

    #[test]
    fn toggle_all_is_uniform_and_reflects_state() {
        let mut groups = GroupState::default();
        assert!(!groups.all_expanded());

        groups.toggle_all();
        assert!(groups.all_expanded());

        groups.toggle_all();
        assert!(TaskStatus::ALL.iter().all(|&s| !groups.is_expanded(s)));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut groups = GroupState::default();
        groups.show_more(TaskStatus::Review);
        groups.toggle(TaskStatus::Review);
        groups.reset();
        assert!(groups.is_expanded(TaskStatus::Review));
        assert_eq!(groups.visible_count(TaskStatus::Review, 100), 5);
    }
}
