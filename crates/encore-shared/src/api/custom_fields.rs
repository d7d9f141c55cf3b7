use serde::{Deserialize, Serialize};

use crate::models::CustomFieldType;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCustomFieldRequest {
    pub field_name: String,
    pub field_type: CustomFieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_options: Option<Vec<String>>,
    pub show_in_table: bool,
}
