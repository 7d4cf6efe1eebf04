//! Grouping of raw grants by grantee.

use indexmap::IndexMap;

use crate::storage::{AggregatedBucket, Grant, RawBucket};

/// Label shown for grants without a grantee display name (public access).
pub const EVERYONE: &str = "Everyone";

/// Some provider tooling serialises a missing display name as this literal.
const UNDEFINED_NAME: &str = "undefined";

/// All permissions one grantee holds on one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedGrant {
    pub display_name: String,
    /// One label per raw grant, in the order the grants were listed.
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GranteeKey {
    Named(String),
    Everyone,
}

impl GranteeKey {
    fn of(grant: &Grant) -> GranteeKey {
        match grant.grantee.as_deref() {
            None | Some(UNDEFINED_NAME) => GranteeKey::Everyone,
            Some(name) => GranteeKey::Named(name.to_string()),
        }
    }

    fn into_display_name(self) -> String {
        match self {
            GranteeKey::Named(name) => name,
            GranteeKey::Everyone => EVERYONE.to_string(),
        }
    }
}

/// Group one bucket's grants by grantee, keeping first-seen order of
/// grantees and listing order of permissions. Duplicates are kept.
pub fn aggregate_grants(grants: Vec<Grant>) -> Vec<AggregatedGrant> {
    let mut groups: IndexMap<GranteeKey, Vec<String>> = IndexMap::new();
    for grant in grants {
        groups
            .entry(GranteeKey::of(&grant))
            .or_default()
            .push(grant.permission.label().to_string());
    }
    groups
        .into_iter()
        .map(|(key, permissions)| AggregatedGrant {
            display_name: key.into_display_name(),
            permissions,
        })
        .collect()
}

/// Replace every bucket's raw grants with the aggregated view.
pub fn aggregate(buckets: Vec<RawBucket>) -> Vec<AggregatedBucket> {
    buckets
        .into_iter()
        .map(|mut bucket| {
            let grants = std::mem::take(&mut bucket.permissions);
            bucket.with_permissions(aggregate_grants(grants))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Bucket, Permission};
    use chrono::Utc;

    fn grant(grantee: Option<&str>, code: &str) -> Grant {
        Grant::new(grantee, code)
    }

    fn entry(name: &str, permissions: &[&str]) -> AggregatedGrant {
        AggregatedGrant {
            display_name: name.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn groups_permissions_of_one_grantee() {
        let grouped = aggregate_grants(vec![
            grant(Some("alice"), "READ"),
            grant(Some("alice"), "WRITE"),
        ]);
        assert_eq!(grouped, vec![entry("alice", &["List", "Upload/Delete"])]);
    }

    #[test]
    fn absent_grantee_is_everyone() {
        let grouped = aggregate_grants(vec![grant(None, "FULL_CONTROL")]);
        assert_eq!(grouped, vec![entry("Everyone", &["Full Control"])]);
    }

    #[test]
    fn literal_undefined_is_treated_as_absent() {
        let grouped = aggregate_grants(vec![
            grant(None, "READ"),
            grant(Some("undefined"), "WRITE"),
        ]);
        assert_eq!(grouped, vec![entry("Everyone", &["List", "Upload/Delete"])]);
    }

    #[test]
    fn named_grantees_never_become_everyone() {
        let grouped = aggregate_grants(vec![
            grant(Some(""), "READ"),
            grant(Some("Undefined"), "READ"),
            grant(Some("bob"), "READ_ACP"),
        ]);
        let names: Vec<_> = grouped.iter().map(|g| g.display_name.as_str()).collect();
        assert_eq!(names, ["", "Undefined", "bob"]);
    }

    #[test]
    fn keeps_first_seen_grantee_order() {
        let grouped = aggregate_grants(vec![
            grant(Some("carol"), "READ"),
            grant(None, "READ"),
            grant(Some("alice"), "WRITE_ACP"),
            grant(Some("carol"), "FULL_CONTROL"),
            grant(None, "WRITE"),
        ]);
        assert_eq!(
            grouped,
            vec![
                entry("carol", &["List", "Full Control"]),
                entry("Everyone", &["List", "Upload/Delete"]),
                entry("alice", &["Edit permissions"]),
            ]
        );
    }

    #[test]
    fn translation_is_positional_and_keeps_duplicates() {
        let grouped = aggregate_grants(vec![
            grant(Some("alice"), "WRITE"),
            grant(Some("alice"), "READ"),
            grant(Some("alice"), "WRITE"),
        ]);
        assert_eq!(
            grouped[0].permissions,
            ["Upload/Delete", "List", "Upload/Delete"]
        );
    }

    #[test]
    fn unrecognized_codes_pass_through() {
        let grouped = aggregate_grants(vec![
            grant(Some("alice"), "FOO"),
            Grant::new(Some("alice"), Permission::Unrecognized(String::new())),
        ]);
        assert_eq!(grouped, vec![entry("alice", &["FOO", ""])]);
    }

    #[test]
    fn bucket_without_grants_aggregates_to_nothing() {
        assert!(aggregate_grants(Vec::new()).is_empty());
    }

    #[test]
    fn aggregation_stays_within_a_bucket() {
        let now = Utc::now();
        let buckets = vec![
            Bucket::new("one", now).with_permissions(vec![grant(Some("alice"), "READ")]),
            Bucket::new("two", now).with_permissions(vec![grant(Some("alice"), "WRITE")]),
        ];

        let aggregated = aggregate(buckets);

        assert_eq!(aggregated[0].name, "one");
        assert_eq!(aggregated[0].permissions, vec![entry("alice", &["List"])]);
        assert_eq!(aggregated[1].name, "two");
        assert_eq!(aggregated[1].permissions, vec![entry("alice", &["Upload/Delete"])]);
    }
}
