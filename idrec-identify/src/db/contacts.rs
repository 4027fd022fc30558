//! Contact store operations
//!
//! Exact-match lookup, transitive cluster fetch, inserts, and the single
//! permitted mutation (demotion to secondary), all against `contacts`.

use chrono::Utc;
use idrec_common::{Contact, Error, LinkPrecedence, Result};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{BTreeMap, BTreeSet};

/// Every contact whose email equals `email` or whose phone equals `phone_number`
///
/// Absent arguments match nothing. Rows come back in ascending id order.
pub async fn find_exact_matches(
    conn: &mut SqliteConnection,
    email: Option<&str>,
    phone_number: Option<&str>,
) -> Result<Vec<Contact>> {
    if email.is_none() && phone_number.is_none() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT * FROM contacts
        WHERE (? IS NOT NULL AND email = ?)
           OR (? IS NOT NULL AND phone_number = ?)
        ORDER BY id
        "#,
    )
    .bind(email)
    .bind(email)
    .bind(phone_number)
    .bind(phone_number)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(Contact::from_row).collect()
}

/// Transitive closure over `linked_id` starting from `seed_ids`
///
/// A contact joins the closure when it links to a member or a member links
/// to it. Traversal runs breadth-first until a round adds nothing new.
/// Soft-deleted rows are walked through but left out of the result, which
/// is ordered by id.
pub async fn fetch_cluster(conn: &mut SqliteConnection, seed_ids: &[i64]) -> Result<Vec<Contact>> {
    let mut members: BTreeMap<i64, Contact> = BTreeMap::new();

    let seeds: BTreeSet<i64> = seed_ids.iter().copied().collect();
    let mut frontier = load_by_ids(conn, &seeds).await?;

    while !frontier.is_empty() {
        let mut frontier_ids = BTreeSet::new();
        let mut frontier_targets = BTreeSet::new();
        for contact in frontier {
            frontier_ids.insert(contact.id);
            if let Some(target) = contact.linked_id {
                if !members.contains_key(&target) {
                    frontier_targets.insert(target);
                }
            }
            members.insert(contact.id, contact);
        }

        frontier = load_neighbors(conn, &frontier_ids, &frontier_targets)
            .await?
            .into_iter()
            .filter(|contact| !members.contains_key(&contact.id))
            .collect();
    }

    Ok(members
        .into_values()
        .filter(|contact| !contact.is_deleted())
        .collect())
}

/// Create a new primary contact
///
/// Fails with `ConstraintViolation` when both identifiers are absent.
pub async fn insert_primary(
    conn: &mut SqliteConnection,
    email: Option<&str>,
    phone_number: Option<&str>,
) -> Result<Contact> {
    insert_contact(conn, email, phone_number, None, LinkPrecedence::Primary).await
}

/// Create a new secondary contact linked to `primary_id`
pub async fn insert_secondary(
    conn: &mut SqliteConnection,
    email: Option<&str>,
    phone_number: Option<&str>,
    primary_id: i64,
) -> Result<Contact> {
    insert_contact(
        conn,
        email,
        phone_number,
        Some(primary_id),
        LinkPrecedence::Secondary,
    )
    .await
}

/// Make `id` a secondary of `new_primary_id`
///
/// No-op (and `updated_at` untouched) when the row is already a secondary
/// linked there. Returns whether the row changed.
pub async fn demote_to_secondary(
    conn: &mut SqliteConnection,
    id: i64,
    new_primary_id: i64,
) -> Result<bool> {
    if id == new_primary_id {
        return Err(Error::InvariantViolation(format!(
            "Contact {} cannot be linked to itself",
            id
        )));
    }

    let result = sqlx::query(
        r#"
        UPDATE contacts
        SET link_precedence = 'secondary', linked_id = ?, updated_at = ?
        WHERE id = ?
          AND NOT (link_precedence = 'secondary' AND linked_id IS ?)
        "#,
    )
    .bind(new_primary_id)
    .bind(Utc::now())
    .bind(id)
    .bind(new_primary_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_contact(
    conn: &mut SqliteConnection,
    email: Option<&str>,
    phone_number: Option<&str>,
    linked_id: Option<i64>,
    precedence: LinkPrecedence,
) -> Result<Contact> {
    if email.is_none() && phone_number.is_none() {
        return Err(Error::ConstraintViolation(
            "A contact needs an email or a phone number".to_string(),
        ));
    }

    let now = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO contacts (email, phone_number, linked_id, link_precedence, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(phone_number)
    .bind(linked_id)
    .bind(precedence.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Contact::from_row(&row)
}

async fn load_by_ids(conn: &mut SqliteConnection, ids: &BTreeSet<i64>) -> Result<Vec<Contact>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM contacts WHERE ");
    push_id_list(&mut query, "id", ids);

    let rows = query.build().fetch_all(&mut *conn).await?;
    rows.iter().map(Contact::from_row).collect()
}

/// Rows linking into `ids`, plus the rows `ids` link to (`targets`)
async fn load_neighbors(
    conn: &mut SqliteConnection,
    ids: &BTreeSet<i64>,
    targets: &BTreeSet<i64>,
) -> Result<Vec<Contact>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM contacts WHERE ");
    push_id_list(&mut query, "linked_id", ids);
    if !targets.is_empty() {
        query.push(" OR ");
        push_id_list(&mut query, "id", targets);
    }

    let rows = query.build().fetch_all(&mut *conn).await?;
    rows.iter().map(Contact::from_row).collect()
}

fn push_id_list(query: &mut QueryBuilder<'_, Sqlite>, column: &str, ids: &BTreeSet<i64>) {
    query.push(column);
    query.push(" IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}
