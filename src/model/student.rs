use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Minimal student identity used to enrich attendance views.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[schema(example = 12)]
    pub id: u64,

    #[schema(example = "ENR-2024-012")]
    pub enrollment_number: String,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "jane@school.edu")]
    pub email: String,
}
