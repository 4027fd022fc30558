//! External shape of a resolved cluster

use idrec_common::{Contact, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical view of one person's known identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterView {
    pub primary_contact_id: i64,
    /// Primary's email first, then first-seen order, no duplicates
    pub emails: Vec<String>,
    /// Primary's phone first, then first-seen order, no duplicates
    pub phone_numbers: Vec<String>,
    /// Ascending
    pub secondary_contact_ids: Vec<i64>,
}

/// Response body of `POST /identify`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub contact: ClusterView,
}

/// Derive the view of a cluster that has exactly one primary
pub fn format_cluster(cluster: &[Contact]) -> Result<ClusterView> {
    let mut primaries = cluster.iter().filter(|c| c.is_primary());
    let primary = match (primaries.next(), primaries.next()) {
        (Some(primary), None) => primary,
        (None, _) => {
            return Err(Error::InvariantViolation(format!(
                "Cluster of {} contacts has no primary",
                cluster.len()
            )))
        }
        (Some(_), Some(_)) => {
            let ids: Vec<i64> = cluster.iter().filter(|c| c.is_primary()).map(|c| c.id).collect();
            return Err(Error::InvariantViolation(format!(
                "Cluster has several primaries: {:?}",
                ids
            )));
        }
    };

    let mut secondary_contact_ids: Vec<i64> = cluster
        .iter()
        .filter(|c| !c.is_primary())
        .map(|c| c.id)
        .collect();
    secondary_contact_ids.sort_unstable();

    Ok(ClusterView {
        primary_contact_id: primary.id,
        emails: primary_first(
            primary.email.as_deref(),
            cluster.iter().map(|c| c.email.as_deref()),
        ),
        phone_numbers: primary_first(
            primary.phone_number.as_deref(),
            cluster.iter().map(|c| c.phone_number.as_deref()),
        ),
        secondary_contact_ids,
    })
}

fn primary_first<'a>(
    lead: Option<&'a str>,
    values: impl Iterator<Item = Option<&'a str>>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    lead.into_iter()
        .chain(values.flatten())
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use idrec_common::LinkPrecedence;

    fn contact(id: i64, email: Option<&str>, phone: Option<&str>, linked_id: Option<i64>) -> Contact {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Contact {
            id,
            email: email.map(str::to_string),
            phone_number: phone.map(str::to_string),
            linked_id,
            link_precedence: if linked_id.is_some() {
                LinkPrecedence::Secondary
            } else {
                LinkPrecedence::Primary
            },
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn test_singleton_primary() {
        let view = format_cluster(&[contact(7, Some("foo@x.com"), None, None)]).unwrap();

        assert_eq!(view.primary_contact_id, 7);
        assert_eq!(view.emails, vec!["foo@x.com"]);
        assert!(view.phone_numbers.is_empty());
        assert!(view.secondary_contact_ids.is_empty());
    }

    #[test]
    fn test_primary_identifiers_forced_first_and_deduplicated() {
        let cluster = vec![
            contact(3, Some("b@x.com"), Some("200"), Some(5)),
            contact(5, Some("a@x.com"), None, None),
            contact(4, Some("b@x.com"), Some("100"), Some(5)),
            contact(9, None, Some("200"), Some(5)),
        ];

        let view = format_cluster(&cluster).unwrap();

        assert_eq!(view.primary_contact_id, 5);
        assert_eq!(view.emails, vec!["a@x.com", "b@x.com"]);
        assert_eq!(view.phone_numbers, vec!["200", "100"]);
        assert_eq!(view.secondary_contact_ids, vec![3, 4, 9]);
    }

    #[test]
    fn test_zero_or_many_primaries_is_invariant_violation() {
        let none = vec![contact(2, Some("a@x.com"), None, Some(1))];
        assert!(matches!(format_cluster(&none), Err(Error::InvariantViolation(_))));

        let two = vec![
            contact(1, Some("a@x.com"), None, None),
            contact(2, Some("b@x.com"), None, None),
        ];
        assert!(matches!(format_cluster(&two), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_response_uses_camel_case_keys() {
        let view = format_cluster(&[contact(1, Some("a@x.com"), Some("555"), None)]).unwrap();
        let json = serde_json::to_value(IdentifyResponse { contact: view }).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "contact": {
                    "primaryContactId": 1,
                    "emails": ["a@x.com"],
                    "phoneNumbers": ["555"],
                    "secondaryContactIds": []
                }
            })
        );
    }
}
