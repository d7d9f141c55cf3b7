//! Column model for the task table.
//!
//! Merges the fixed column catalog with the project's visible custom fields,
//! applying the persisted order for each. Corrupt persisted state is treated
//! as absent and falls back to defaults.

use encore_shared::CustomFieldDefinition;

use crate::layout::{LayoutStore, COLUMN_ORDER_KEY, CUSTOM_FIELD_ORDER_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnId {
    Checkbox,
    Title,
    Type,
    Priority,
    Status,
    Assigned,
    Due,
    Custom(i64),
}

impl ColumnId {
    /// Default fixed-column order. `Checkbox` and `Title` are pinned first
    /// and excluded from drag reordering.
    pub const FIXED_DEFAULT: [ColumnId; 7] = [
        ColumnId::Checkbox,
        ColumnId::Title,
        ColumnId::Type,
        ColumnId::Priority,
        ColumnId::Status,
        ColumnId::Assigned,
        ColumnId::Due,
    ];

    /// Persisted string form. The title column keeps its historical `task`
    /// code; custom-field columns are namespaced as `custom-<id>`.
    pub fn code(&self) -> String {
        match self {
            Self::Checkbox => "checkbox".to_string(),
            Self::Title => "task".to_string(),
            Self::Type => "type".to_string(),
            Self::Priority => "priority".to_string(),
            Self::Status => "status".to_string(),
            Self::Assigned => "assigned".to_string(),
            Self::Due => "due".to_string(),
            Self::Custom(id) => format!("custom-{}", id),
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "checkbox" => Some(Self::Checkbox),
            "task" => Some(Self::Title),
            "type" => Some(Self::Type),
            "priority" => Some(Self::Priority),
            "status" => Some(Self::Status),
            "assigned" => Some(Self::Assigned),
            "due" => Some(Self::Due),
            other => other
                .strip_prefix("custom-")
                .and_then(|id| id.parse().ok())
                .map(Self::Custom),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Checkbox | Self::Title)
    }

    pub fn is_sortable(&self) -> bool {
        !matches!(self, Self::Checkbox | Self::Assigned)
    }
}

/// Ordered, visible column set: the fixed catalog followed by the project's
/// visible custom fields. Both orders survive restarts via the layout store.
#[derive(Debug)]
pub struct ColumnModel {
    fixed: Vec<ColumnId>,
    custom: Option<Vec<i64>>,
}

impl ColumnModel {
    pub fn load(store: &dyn LayoutStore) -> Self {
        Self {
            fixed: load_fixed_order(store),
            custom: load_custom_order(store),
        }
    }

    pub fn fixed_order(&self) -> &[ColumnId] {
        &self.fixed
    }

    /// Visible custom fields in column order: persisted positions first,
    /// fields not yet in the persisted order appended in server order.
    pub fn visible_custom_fields<'a>(
        &self,
        defs: &'a [CustomFieldDefinition],
    ) -> Vec<&'a CustomFieldDefinition> {
        let mut visible: Vec<&CustomFieldDefinition> =
            defs.iter().filter(|d| d.is_visible()).collect();

        match &self.custom {
            Some(order) => visible.sort_by(|a, b| {
                let pa = order.iter().position(|id| *id == a.id);
                let pb = order.iter().position(|id| *id == b.id);
                match (pa, pb) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => a.order.cmp(&b.order),
                }
            }),
            None => visible.sort_by_key(|d| d.order),
        }

        visible
    }

    /// Full render order: fixed columns then custom-field columns.
    pub fn ordered_columns(&self, defs: &[CustomFieldDefinition]) -> Vec<ColumnId> {
        let mut columns = self.fixed.clone();
        columns.extend(
            self.visible_custom_fields(defs)
                .iter()
                .map(|d| ColumnId::Custom(d.id)),
        );
        columns
    }

    /// One-time reconciliation: any visible field missing from the persisted
    /// custom order is appended to it, so newly created fields get a stable
    /// slot without disturbing the user's arrangement.
    pub fn reconcile(&mut self, defs: &[CustomFieldDefinition], store: &mut dyn LayoutStore) {
        let visible: Vec<i64> = defs.iter().filter(|d| d.is_visible()).map(|d| d.id).collect();
        if visible.is_empty() {
            return;
        }

        let order = self.custom.get_or_insert_with(Vec::new);
        let mut incoming: Vec<i64> = visible
            .into_iter()
            .filter(|id| !order.contains(id))
            .collect();
        if incoming.is_empty() {
            return;
        }

        incoming.sort_by_key(|id| {
            defs.iter()
                .find(|d| d.id == *id)
                .map(|d| d.order)
                .unwrap_or(i64::MAX)
        });
        order.extend(incoming);
        self.persist_custom(store);
    }

    /// Apply a drag drop: move `dragged` to `target`'s position. The two
    /// must share a namespace and neither may be pinned; anything else is a
    /// no-op.
    pub fn move_column(
        &mut self,
        dragged: ColumnId,
        target: ColumnId,
        store: &mut dyn LayoutStore,
    ) -> bool {
        if dragged == target {
            return false;
        }

        match (dragged, target) {
            (ColumnId::Custom(src), ColumnId::Custom(dst)) => {
                let Some(order) = self.custom.as_mut() else {
                    return false;
                };
                let Some(from) = order.iter().position(|id| *id == src) else {
                    return false;
                };
                let Some(to) = order.iter().position(|id| *id == dst) else {
                    return false;
                };
                let id = order.remove(from);
                order.insert(to, id);
                self.persist_custom(store);
                true
            }
            (ColumnId::Custom(_), _) | (_, ColumnId::Custom(_)) => false,
            (dragged, target) => {
                if dragged.is_pinned() || target.is_pinned() {
                    return false;
                }
                let Some(from) = self.fixed.iter().position(|c| *c == dragged) else {
                    return false;
                };
                let Some(to) = self.fixed.iter().position(|c| *c == target) else {
                    return false;
                };
                let column = self.fixed.remove(from);
                self.fixed.insert(to, column);
                self.persist_fixed(store);
                true
            }
        }
    }

    fn persist_fixed(&self, store: &mut dyn LayoutStore) {
        let codes: Vec<String> = self.fixed.iter().map(|c| c.code()).collect();
        if let Ok(json) = serde_json::to_string(&codes) {
            store.set(COLUMN_ORDER_KEY, json);
        }
    }

    fn persist_custom(&self, store: &mut dyn LayoutStore) {
        let Some(order) = &self.custom else {
            return;
        };
        if let Ok(json) = serde_json::to_string(order) {
            store.set(CUSTOM_FIELD_ORDER_KEY, json);
        }
    }
}

/// Persisted fixed order, or the default catalog when the entry is absent,
/// unparseable, contains a non-fixed code, or has drifted in length from
/// the current catalog.
fn load_fixed_order(store: &dyn LayoutStore) -> Vec<ColumnId> {
    let parsed = store
        .get(COLUMN_ORDER_KEY)
        .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
        .and_then(|codes| {
            codes
                .iter()
                .map(|c| ColumnId::parse(c).filter(|id| !id.is_custom()))
                .collect::<Option<Vec<ColumnId>>>()
        });

    match parsed {
        Some(order) if order.len() == ColumnId::FIXED_DEFAULT.len() => order,
        _ => ColumnId::FIXED_DEFAULT.to_vec(),
    }
}

fn load_custom_order(store: &dyn LayoutStore) -> Option<Vec<i64>> {
    store
        .get(CUSTOM_FIELD_ORDER_KEY)
        .and_then(|raw| serde_json::from_str::<Vec<i64>>(&raw).ok())
}

#[cfg(test)]
mod tests {
    use encore_shared::CustomFieldType;

    use super::*;
    use crate::layout::MemoryLayoutStore;

    fn field(id: i64, order: i64, show: bool, archived: bool) -> CustomFieldDefinition {
        CustomFieldDefinition {
            id,
            field_name: format!("Field {}", id),
            field_type: CustomFieldType::Text,
            select_options: Vec::new(),
            show_in_table: show,
            is_archived: archived,
            order,
        }
    }

    #[test]
    fn column_codes_round_trip() {
        for column in ColumnId::FIXED_DEFAULT {
            assert_eq!(ColumnId::parse(&column.code()), Some(column));
        }
        assert_eq!(ColumnId::parse("custom-42"), Some(ColumnId::Custom(42)));
        assert_eq!(ColumnId::parse("custom-x"), None);
        assert_eq!(ColumnId::parse("banner"), None);
    }

    #[test]
    fn wrong_length_persisted_order_falls_back_to_default() {
        let mut store = MemoryLayoutStore::default();
        store.set(
            COLUMN_ORDER_KEY,
            r#"["task","type","priority"]"#.to_string(),
        );

        let model = ColumnModel::load(&store);
        let codes: Vec<String> = model.fixed_order().iter().map(|c| c.code()).collect();
        assert_eq!(
            codes,
            vec!["checkbox", "task", "type", "priority", "status", "assigned", "due"]
        );
    }

    #[test]
    fn malformed_persisted_order_falls_back_to_default() {
        let mut store = MemoryLayoutStore::default();
        store.set(COLUMN_ORDER_KEY, "not json".to_string());
        let model = ColumnModel::load(&store);
        assert_eq!(model.fixed_order(), &ColumnId::FIXED_DEFAULT);
    }

    #[test]
    fn valid_persisted_order_is_applied() {
        let mut store = MemoryLayoutStore::default();
        store.set(
            COLUMN_ORDER_KEY,
            r#"["checkbox","task","priority","type","status","assigned","due"]"#.to_string(),
        );

        let model = ColumnModel::load(&store);
        assert_eq!(model.fixed_order()[2], ColumnId::Priority);
        assert_eq!(model.fixed_order()[3], ColumnId::Type);
    }

    #[test]
    fn custom_fields_follow_persisted_order_with_unknowns_last() {
        let mut store = MemoryLayoutStore::default();
        store.set(CUSTOM_FIELD_ORDER_KEY, "[3,1]".to_string());

        let model = ColumnModel::load(&store);
        let defs = vec![
            field(1, 10, true, false),
            // Unknown to the persisted order; server order decides their
            // relative placement at the end.
            field(7, 40, true, false),
            field(5, 30, true, false),
            field(3, 20, true, false),
            field(9, 5, false, false),
            field(2, 6, true, true),
        ];

        let ids: Vec<i64> = model
            .visible_custom_fields(&defs)
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 5, 7]);
    }

    #[test]
    fn server_order_applies_without_persisted_order() {
        let store = MemoryLayoutStore::default();
        let model = ColumnModel::load(&store);
        let defs = vec![field(4, 2, true, false), field(8, 1, true, false)];

        let ids: Vec<i64> = model
            .visible_custom_fields(&defs)
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![8, 4]);
    }

    #[test]
    fn reconcile_appends_new_fields_and_persists() {
        let mut store = MemoryLayoutStore::default();
        store.set(CUSTOM_FIELD_ORDER_KEY, "[2]".to_string());

        let mut model = ColumnModel::load(&store);
        let defs = vec![
            field(2, 1, true, false),
            field(6, 3, true, false),
            field(4, 2, true, false),
        ];
        model.reconcile(&defs, &mut store);

        assert_eq!(store.get(CUSTOM_FIELD_ORDER_KEY).as_deref(), Some("[2,4,6]"));
    }

    #[test]
    fn move_fixed_column_persists_new_order() {
        let mut store = MemoryLayoutStore::default();
        let mut model = ColumnModel::load(&store);

        assert!(model.move_column(ColumnId::Priority, ColumnId::Status, &mut store));
        let persisted = store.get(COLUMN_ORDER_KEY).expect("order persisted");
        let codes: Vec<String> = serde_json::from_str(&persisted).expect("valid json");
        assert_eq!(
            codes,
            vec!["checkbox", "task", "type", "status", "priority", "assigned", "due"]
        );

        // Reload sees the dragged arrangement.
        let reloaded = ColumnModel::load(&store);
        assert_eq!(reloaded.fixed_order()[3], ColumnId::Status);
        assert_eq!(reloaded.fixed_order()[4], ColumnId::Priority);
    }

    #[test]
    fn move_custom_column_reorders_ids() {
        let mut store = MemoryLayoutStore::default();
        store.set(CUSTOM_FIELD_ORDER_KEY, "[1,2,3]".to_string());

        let mut model = ColumnModel::load(&store);
        assert!(model.move_column(ColumnId::Custom(3), ColumnId::Custom(1), &mut store));
        assert_eq!(store.get(CUSTOM_FIELD_ORDER_KEY).as_deref(), Some("[3,1,2]"));
    }

    #[test]
    fn cross_namespace_and_pinned_moves_are_noops() {
        let mut store = MemoryLayoutStore::default();
        store.set(CUSTOM_FIELD_ORDER_KEY, "[1,2]".to_string());
        let mut model = ColumnModel::load(&store);

        assert!(!model.move_column(ColumnId::Priority, ColumnId::Custom(1), &mut store));
        assert!(!model.move_column(ColumnId::Custom(1), ColumnId::Due, &mut store));
        assert!(!model.move_column(ColumnId::Title, ColumnId::Due, &mut store));
        assert!(!model.move_column(ColumnId::Due, ColumnId::Checkbox, &mut store));
        assert!(!model.move_column(ColumnId::Custom(1), ColumnId::Custom(9), &mut store));

        assert_eq!(model.fixed_order(), &ColumnId::FIXED_DEFAULT);
        assert_eq!(store.get(CUSTOM_FIELD_ORDER_KEY).as_deref(), Some("[1,2]"));
    }
}
