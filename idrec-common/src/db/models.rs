//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Role of a contact inside its cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    Primary,
    Secondary,
}

impl LinkPrecedence {
    /// Column value stored in `contacts.link_precedence`
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkPrecedence::Primary => "primary",
            LinkPrecedence::Secondary => "secondary",
        }
    }
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkPrecedence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "primary" => Ok(LinkPrecedence::Primary),
            "secondary" => Ok(LinkPrecedence::Secondary),
            other => Err(Error::InvariantViolation(format!(
                "Unknown link_precedence '{}'",
                other
            ))),
        }
    }
}

/// One row of the `contacts` table
///
/// `linked_id` is set exactly when `link_precedence` is `Secondary` and
/// points at the cluster's primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<i64>,
    pub link_precedence: LinkPrecedence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Decode a full `SELECT *` row from `contacts`
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let precedence: String = row.try_get("link_precedence")?;

        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            phone_number: row.try_get("phone_number")?,
            linked_id: row.try_get("linked_id")?,
            link_precedence: precedence.parse()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_precedence_column_values() {
        assert_eq!(LinkPrecedence::Primary.as_str(), "primary");
        assert_eq!("secondary".parse::<LinkPrecedence>().unwrap(), LinkPrecedence::Secondary);
        assert!(matches!(
            "Primary".parse::<LinkPrecedence>(),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_link_precedence_serializes_lowercase() {
        let json = serde_json::to_string(&LinkPrecedence::Secondary).unwrap();
        assert_eq!(json, "\"secondary\"");
    }
}
