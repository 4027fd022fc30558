//! Cluster resolution: find, create, or merge
//!
//! Given an email and/or phone number, locate every stored contact that is
//! the same person (transitively, through shared identifiers and links),
//! collapse the cluster onto its earliest primary, record the input if it
//! carries something new, and return the canonical view.
//!
//! The whole sequence runs in one unit of work: either every write lands or
//! none does. The resolver never retries; callers wrap it in
//! [`crate::utils::retry_on_lock`] when they want contention handled.

use idrec_common::{Contact, Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::db::contacts;
use crate::services::cluster_view::{format_cluster, ClusterView};
use crate::utils::begin_unit_of_work;

/// Validated identify input: at least one identifier, both already trimmed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentifyInput {
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Resolves identify inputs against the contact store
#[derive(Clone)]
pub struct ClusterResolver {
    db: SqlitePool,
}

impl ClusterResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Resolve `input` atomically
    ///
    /// Store errors roll the unit of work back and are returned unchanged.
    pub async fn resolve(&self, input: &IdentifyInput) -> Result<ClusterView> {
        let mut uow = begin_unit_of_work(&self.db, "cluster_resolver::resolve").await?;

        let outcome = resolve_in(uow.conn()?, input).await;
        match outcome {
            Ok(view) => {
                uow.commit().await?;
                Ok(view)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed resolve also failed");
                }
                Err(err)
            }
        }
    }
}

/// Run the resolution algorithm on an open transaction
pub async fn resolve_in(conn: &mut SqliteConnection, input: &IdentifyInput) -> Result<ClusterView> {
    let email = input.email.as_deref();
    let phone_number = input.phone_number.as_deref();
    info!(email, phone_number, "identify called");

    let matches = contacts::find_exact_matches(conn, email, phone_number).await?;
    let seed_ids: Vec<i64> = matches.iter().map(|c| c.id).collect();
    let cluster = if seed_ids.is_empty() {
        Vec::new()
    } else {
        contacts::fetch_cluster(conn, &seed_ids).await?
    };

    // Nothing live matched: this is a new identity
    if cluster.is_empty() {
        let created = contacts::insert_primary(conn, email, phone_number).await?;
        info!(primary_id = created.id, "No existing contact, inserted primary");
        return format_cluster(std::slice::from_ref(&created));
    }

    let canonical_id = select_canonical(&cluster)
        .map(|c| c.id)
        .ok_or_else(|| {
            Error::InvariantViolation(format!(
                "Cluster seeded from {:?} has no primary",
                seed_ids
            ))
        })?;

    merge_into(conn, &cluster, canonical_id).await?;

    if carries_new_information(&cluster, input) {
        let created = contacts::insert_secondary(conn, email, phone_number, canonical_id).await?;
        info!(
            secondary_id = created.id,
            primary_id = canonical_id,
            "Input carries new information, inserted secondary"
        );
    }

    let resolved = contacts::fetch_cluster(conn, &[canonical_id]).await?;
    let view = format_cluster(&resolved)?;
    debug!(
        primary_id = view.primary_contact_id,
        cluster_size = resolved.len(),
        "identify resolved"
    );

    Ok(view)
}

/// Earliest-created primary; equal timestamps resolve to the smaller id
pub fn select_canonical(cluster: &[Contact]) -> Option<&Contact> {
    cluster
        .iter()
        .filter(|c| c.is_primary())
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
}

/// Point every other member of `cluster` straight at `canonical_id`
///
/// Demotes surplus primaries and re-links secondaries that still point at a
/// demoted primary, so the cluster stays one level deep.
async fn merge_into(conn: &mut SqliteConnection, cluster: &[Contact], canonical_id: i64) -> Result<()> {
    let demoted: Vec<i64> = cluster
        .iter()
        .filter(|c| c.is_primary() && c.id != canonical_id)
        .map(|c| c.id)
        .collect();

    if !demoted.is_empty() {
        warn!(
            primary_id = canonical_id,
            demoted = ?demoted,
            "Multiple primaries in cluster, merging"
        );
    }

    for contact in cluster.iter().filter(|c| c.id != canonical_id) {
        if contact.is_primary() || contact.linked_id != Some(canonical_id) {
            contacts::demote_to_secondary(conn, contact.id, canonical_id).await?;
        }
    }

    Ok(())
}

/// True when the input names an email or phone the cluster has not seen
fn carries_new_information(cluster: &[Contact], input: &IdentifyInput) -> bool {
    let known_emails: HashSet<&str> = cluster.iter().filter_map(|c| c.email.as_deref()).collect();
    let known_phones: HashSet<&str> = cluster
        .iter()
        .filter_map(|c| c.phone_number.as_deref())
        .collect();

    let new_email = input
        .email
        .as_deref()
        .is_some_and(|email| !known_emails.contains(email));
    let new_phone = input
        .phone_number
        .as_deref()
        .is_some_and(|phone| !known_phones.contains(phone));

    new_email || new_phone
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use idrec_common::LinkPrecedence;

    fn primary(id: i64, offset_secs: i64) -> Contact {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs);
        Contact {
            id,
            email: Some(format!("p{}@example.com", id)),
            phone_number: None,
            linked_id: None,
            link_precedence: LinkPrecedence::Primary,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn test_canonical_is_earliest_created() {
        let cluster = vec![primary(1, 50), primary(2, 10), primary(3, 30)];
        assert_eq!(select_canonical(&cluster).map(|c| c.id), Some(2));
    }

    #[test]
    fn test_canonical_tie_breaks_on_smallest_id() {
        let cluster = vec![primary(9, 0), primary(4, 0), primary(6, 0)];
        assert_eq!(select_canonical(&cluster).map(|c| c.id), Some(4));
    }

    #[test]
    fn test_canonical_ignores_secondaries() {
        let mut older = primary(1, 0);
        older.link_precedence = LinkPrecedence::Secondary;
        older.linked_id = Some(2);
        let cluster = vec![older, primary(2, 100)];

        assert_eq!(select_canonical(&cluster).map(|c| c.id), Some(2));
        assert!(select_canonical(&cluster[..1]).is_none());
    }

    #[test]
    fn test_new_information_detection() {
        let mut known = primary(1, 0);
        known.phone_number = Some("555".to_string());
        let cluster = vec![known];

        let repeat = IdentifyInput {
            email: Some("p1@example.com".to_string()),
            phone_number: Some("555".to_string()),
        };
        let phone_only = IdentifyInput {
            email: None,
            phone_number: Some("555".to_string()),
        };
        let new_phone = IdentifyInput {
            email: Some("p1@example.com".to_string()),
            phone_number: Some("556".to_string()),
        };

        assert!(!carries_new_information(&cluster, &repeat));
        assert!(!carries_new_information(&cluster, &phone_only));
        assert!(carries_new_information(&cluster, &new_phone));
    }
}
