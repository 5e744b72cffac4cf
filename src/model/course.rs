use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "title": "Operating Systems",
        "code": "CS-301",
        "teacherId": 4,
        "createdAt": "2024-01-01T00:00:00Z"
    })
)]
pub struct Course {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Operating Systems")]
    pub title: String,

    #[schema(example = "CS-301")]
    pub code: String,

    #[schema(example = 4, nullable = true)]
    pub teacher_id: Option<u64>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
