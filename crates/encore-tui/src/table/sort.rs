//! Sort engine: comparator selection per column with tri-state direction
//! cycling. Sorting is stable and applied bucket-locally; with no active
//! sort the input order is preserved.

use std::cmp::Ordering;

use encore_shared::Task;

use super::columns::ColumnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<ColumnId>,
    pub direction: Option<SortDirection>,
}

impl SortState {
    /// Header click cycle: fresh column → asc, asc → desc, desc → cleared.
    pub fn cycle(&mut self, column: ColumnId) {
        if !column.is_sortable() {
            return;
        }

        if self.column != Some(column) {
            self.column = Some(column);
            self.direction = Some(SortDirection::Asc);
            return;
        }

        match self.direction {
            Some(SortDirection::Asc) => self.direction = Some(SortDirection::Desc),
            Some(SortDirection::Desc) | None => {
                self.column = None;
                self.direction = None;
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.column.is_some() && self.direction.is_some()
    }
}

/// Sort one bucket's task indices in place. A stable sort, so equal keys
/// keep their input order.
pub fn sort_bucket(indices: &mut [usize], tasks: &[Task], sort: &SortState) {
    let (Some(column), Some(direction)) = (sort.column, sort.direction) else {
        return;
    };

    indices.sort_by(|&a, &b| compare(&tasks[a], &tasks[b], column, direction));
}

fn compare(a: &Task, b: &Task, column: ColumnId, direction: SortDirection) -> Ordering {
    // Missing due dates sort after present ones no matter the direction, so
    // null handling happens before the direction is applied.
    if column == ColumnId::Due {
        return match (a.due_date, b.due_date) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(da), Some(db)) => directed(da.cmp(&db), direction),
        };
    }

    directed(compare_undirected(a, b, column), direction)
}

fn compare_undirected(a: &Task, b: &Task, column: ColumnId) -> Ordering {
    match column {
        ColumnId::Title => a.title.cmp(&b.title),
        ColumnId::Type => a.task_type.code().cmp(b.task_type.code()),
        // Urgent-first is the product's natural priority order: asc shows
        // 4,3,2,1 and desc inverts it.
        ColumnId::Priority => b.priority.rank().cmp(&a.priority.rank()),
        ColumnId::Status => a.status.code().cmp(b.status.code()),
        ColumnId::Custom(field_id) => compare_custom(a, b, field_id),
        ColumnId::Checkbox | ColumnId::Assigned | ColumnId::Due => Ordering::Equal,
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Comparison operand for a custom-field cell: the display value when the
/// server provided one, otherwise the raw value, otherwise empty text.
enum SortOperand {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl SortOperand {
    fn for_task(task: &Task, field_id: i64) -> Self {
        let Some(value) = task.custom_field_values.get(&field_id) else {
            return Self::Text(String::new());
        };

        if let Some(display) = &value.display_value {
            return Self::Text(display.clone());
        }

        match &value.value {
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Null => Self::Text(String::new()),
            other => Self::Text(other.to_string()),
        }
    }

    fn text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

fn compare_custom(a: &Task, b: &Task, field_id: i64) -> Ordering {
    let left = SortOperand::for_task(a, field_id);
    let right = SortOperand::for_task(b, field_id);

    match (&left, &right) {
        (SortOperand::Number(x), SortOperand::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (SortOperand::Bool(x), SortOperand::Bool(y)) => x.cmp(y),
        _ => left.text().cmp(&right.text()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{NaiveDate, Utc};
    use encore_shared::{CustomFieldValue, Priority, TaskStatus, TaskType};
    use uuid::Uuid;

    use super::*;

    fn task(title: &str, priority: Priority) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: title.to_string(),
            status: TaskStatus::Todo,
            priority,
            task_type: TaskType::General,
            due_date: None,
            assigned_to_users: Vec::new(),
            related: None,
            custom_field_values: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sorted_by(tasks: &[Task], column: ColumnId, direction: SortDirection) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..tasks.len()).collect();
        let sort = SortState {
            column: Some(column),
            direction: Some(direction),
        };
        sort_bucket(&mut indices, tasks, &sort);
        indices
    }

    #[test]
    fn cycling_same_column_three_times_clears_sort() {
        let mut sort = SortState::default();
        sort.cycle(ColumnId::Title);
        assert_eq!(sort.direction, Some(SortDirection::Asc));
        sort.cycle(ColumnId::Title);
        assert_eq!(sort.direction, Some(SortDirection::Desc));
        sort.cycle(ColumnId::Title);
        assert_eq!(sort, SortState::default());
    }

    #[test]
    fn cycling_a_fresh_column_always_lands_on_asc() {
        let mut sort = SortState::default();
        sort.cycle(ColumnId::Due);
        sort.cycle(ColumnId::Due);
        assert_eq!(sort.direction, Some(SortDirection::Desc));

        sort.cycle(ColumnId::Priority);
        assert_eq!(sort.column, Some(ColumnId::Priority));
        assert_eq!(sort.direction, Some(SortDirection::Asc));
    }

    #[test]
    fn unsortable_columns_do_not_change_state() {
        let mut sort = SortState::default();
        sort.cycle(ColumnId::Checkbox);
        sort.cycle(ColumnId::Assigned);
        assert_eq!(sort, SortState::default());
    }

    #[test]
    fn priority_asc_yields_descending_ranks() {
        let tasks = vec![
            task("a", Priority::Low),
            task("b", Priority::Urgent),
            task("c", Priority::Normal),
            task("d", Priority::High),
        ];

        let order = sorted_by(&tasks, ColumnId::Priority, SortDirection::Asc);
        let ranks: Vec<u8> = order.iter().map(|&i| tasks[i].priority.rank()).collect();
        assert_eq!(ranks, vec![4, 3, 2, 1]);

        let order = sorted_by(&tasks, ColumnId::Priority, SortDirection::Desc);
        let ranks: Vec<u8> = order.iter().map(|&i| tasks[i].priority.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn missing_due_dates_sort_last_in_both_directions() {
        let mut tasks = vec![
            task("a", Priority::Normal),
            task("b", Priority::Normal),
            task("c", Priority::Normal),
            task("d", Priority::Normal),
        ];
        tasks[0].due_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        tasks[2].due_date = NaiveDate::from_ymd_opt(2026, 8, 10);

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let order = sorted_by(&tasks, ColumnId::Due, direction);
            let (dated, dateless) = order.split_at(2);
            assert!(dated.iter().all(|&i| tasks[i].due_date.is_some()));
            assert!(dateless.iter().all(|&i| tasks[i].due_date.is_none()));
        }

        let asc = sorted_by(&tasks, ColumnId::Due, SortDirection::Asc);
        assert_eq!(&asc[..2], &[2, 0]);
        let desc = sorted_by(&tasks, ColumnId::Due, SortDirection::Desc);
        assert_eq!(&desc[..2], &[0, 2]);
    }

    #[test]
    fn title_sort_is_lexicographic_and_desc_negates() {
        let tasks = vec![
            task("Mix master", Priority::Normal),
            task("Art approval", Priority::Normal),
            task("Tour hold", Priority::Normal),
        ];

        assert_eq!(sorted_by(&tasks, ColumnId::Title, SortDirection::Asc), vec![1, 0, 2]);
        assert_eq!(sorted_by(&tasks, ColumnId::Title, SortDirection::Desc), vec![2, 0, 1]);
    }

    #[test]
    fn no_active_sort_keeps_input_order() {
        let tasks = vec![
            task("z", Priority::Low),
            task("a", Priority::Urgent),
        ];
        let mut indices = vec![0, 1];
        sort_bucket(&mut indices, &tasks, &SortState::default());
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn custom_field_sort_compares_numbers_numerically() {
        let mut tasks = vec![
            task("a", Priority::Normal),
            task("b", Priority::Normal),
            task("c", Priority::Normal),
        ];
        for (task, n) in tasks.iter_mut().zip([30.0, 4.0, 200.0]) {
            task.custom_field_values.insert(
                9,
                CustomFieldValue {
                    value: serde_json::json!(n),
                    display_value: None,
                },
            );
        }

        let order = sorted_by(&tasks, ColumnId::Custom(9), SortDirection::Asc);
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn custom_field_sort_prefers_display_value_and_defaults_empty() {
        let mut tasks = vec![
            task("a", Priority::Normal),
            task("b", Priority::Normal),
            task("c", Priority::Normal),
        ];
        tasks[0].custom_field_values.insert(
            9,
            CustomFieldValue {
                value: serde_json::json!(2),
                display_value: Some("beta".to_string()),
            },
        );
        tasks[1].custom_field_values.insert(
            9,
            CustomFieldValue {
                value: serde_json::json!("alpha"),
                display_value: None,
            },
        );
        // tasks[2] has no value: empty string sorts first ascending.

        let order = sorted_by(&tasks, ColumnId::Custom(9), SortDirection::Asc);
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn custom_field_sort_orders_false_before_true() {
        let mut tasks = vec![task("a", Priority::Normal), task("b", Priority::Normal)];
        for (task, flag) in tasks.iter_mut().zip([true, false]) {
            task.custom_field_values.insert(
                9,
                CustomFieldValue {
                    value: serde_json::json!(flag),
                    display_value: None,
                },
            );
        }

        let order = sorted_by(&tasks, ColumnId::Custom(9), SortDirection::Asc);
        assert_eq!(order, vec![1, 0]);
    }
}
