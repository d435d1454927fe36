//! Project-scoped API token used by agents

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission carried by a project token, stored as 1/2/3
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum AccessLevel {
    Read,
    Write,
    ReadWrite,
}

impl AccessLevel {
    /// Whether a token with this level may perform an operation needing `required`
    pub fn permits(self, required: AccessLevel) -> bool {
        self == required || self == AccessLevel::ReadWrite
    }
}

impl From<AccessLevel> for i32 {
    fn from(level: AccessLevel) -> Self {
        match level {
            AccessLevel::Read => 1,
            AccessLevel::Write => 2,
            AccessLevel::ReadWrite => 3,
        }
    }
}

impl TryFrom<i32> for AccessLevel {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AccessLevel::Read),
            2 => Ok(AccessLevel::Write),
            3 => Ok(AccessLevel::ReadWrite),
            other => Err(format!(
                "invalid access level {}: expected 1 (READ), 2 (WRITE) or 3 (READ_WRITE)",
                other
            )),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessLevel::Read => "READ",
            AccessLevel::Write => "WRITE",
            AccessLevel::ReadWrite => "READ_WRITE",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub project_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text")]
    pub hashed_token: String,

    #[serde(skip_serializing)]
    #[sea_orm(column_type = "Text")]
    pub lookup_value: String,

    pub access: i32,

    pub expiration_date: Option<DateTimeUtc>,

    pub last_used: Option<DateTimeUtc>,

    pub revoked: bool,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// Get the access level as an enum
    pub fn access_level(&self) -> Option<AccessLevel> {
        AccessLevel::try_from(self.access).ok()
    }

    /// Whether the token has passed its expiration date at `now`
    pub fn is_expired(&self, now: DateTimeUtc) -> bool {
        self.expiration_date.is_some_and(|exp| exp <= now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_level_permits() {
        assert!(AccessLevel::Read.permits(AccessLevel::Read));
        assert!(!AccessLevel::Read.permits(AccessLevel::Write));
        assert!(AccessLevel::Write.permits(AccessLevel::Write));
        assert!(!AccessLevel::Write.permits(AccessLevel::Read));
        assert!(AccessLevel::ReadWrite.permits(AccessLevel::Read));
        assert!(AccessLevel::ReadWrite.permits(AccessLevel::Write));
    }

    #[test]
    fn test_access_level_wire_format() {
        assert_eq!(serde_json::to_string(&AccessLevel::ReadWrite).unwrap(), "3");
        let level: AccessLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, AccessLevel::Write);
        assert!(serde_json::from_str::<AccessLevel>("7").is_err());
    }
}
