use crate::model::role::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Who is acting, as vouched for by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectIdentity {
    pub subject_id: u64,
    pub display_name: String,
    pub department: Option<String>,
    pub role: Role,
}

impl SubjectIdentity {
    pub fn summary(&self) -> SubjectSummary {
        SubjectSummary {
            display_name: self.display_name.clone(),
            subject_id: self.subject_id,
            department: self.department.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubjectSummary {
    #[schema(example = "John Doe")]
    pub display_name: String,
    #[schema(example = 1000)]
    pub subject_id: u64,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
}
