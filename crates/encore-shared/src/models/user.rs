use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal user reference carried on task assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
}
