use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldType {
    Text,
    Number,
    Date,
    Checkbox,
    SingleSelect,
}

impl CustomFieldType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::Checkbox => "Checkbox",
            Self::SingleSelect => "Select",
        }
    }
}

/// A project-scoped, tenant-defined task attribute. Rendered as an extra
/// table column when visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    pub id: i64,
    pub field_name: String,
    pub field_type: CustomFieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select_options: Vec<String>,
    pub show_in_table: bool,
    pub is_archived: bool,
    pub order: i64,
}

impl CustomFieldDefinition {
    pub fn is_visible(&self) -> bool {
        self.show_in_table && !self.is_archived
    }
}
