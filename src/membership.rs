//! Identity comparison for user ids.
//!
//! Ids reach the core as request strings, stored object ids, and populated
//! user records. Two ids are the same user iff their canonical forms (the
//! lowercase 24-digit hex encoding) are equal, and every place that builds or
//! checks a member set goes through this module.
use std::collections::HashSet;

use bson::oid::ObjectId;

use crate::error::SplitError;
use crate::schemas::{Group, UserId};

pub fn canonical_id(id: &ObjectId) -> String {
    id.to_hex()
}

/// Parses a textual id. Surrounding whitespace and hex case are ignored.
pub fn parse_id(raw: &str, field: &str) -> Result<ObjectId, SplitError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| SplitError::BadRequest(format!("{field} is not a valid id: {raw}")))
}

/// Removes repeated ids, keeping the first occurrence of each.
pub fn dedup_ids<I>(ids: I) -> Vec<UserId>
where
    I: IntoIterator<Item = UserId>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(canonical_id(id)))
        .collect()
}

/// The group's member set with any persisted duplicates dropped.
pub fn member_set(group: &Group) -> Vec<UserId> {
    dedup_ids(group.members.iter().copied())
}

pub fn is_member(group: &Group, user: &UserId) -> bool {
    let key = canonical_id(user);
    group.members.iter().any(|member| canonical_id(member) == key)
}

pub fn same_user(a: &UserId, b: &UserId) -> bool {
    canonical_id(a) == canonical_id(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group_with(members: Vec<UserId>) -> Group {
        let now = Utc::now();
        Group {
            id: ObjectId::new(),
            name: "Flat".to_string(),
            image: String::new(),
            created_by: members[0],
            members,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn differently_cased_ids_parse_to_one_member() {
        let lower = parse_id("64b7f0c2a1b2c3d4e5f60718", "members").unwrap();
        let upper = parse_id(" 64B7F0C2A1B2C3D4E5F60718 ", "members").unwrap();
        assert_eq!(dedup_ids([lower, upper]), vec![lower]);
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();
        assert_eq!(dedup_ids([b, a, b, c, a]), vec![b, a, c]);
    }

    #[test]
    fn invalid_id_is_a_bad_request() {
        let err = parse_id("not-an-id", "groupId").unwrap_err();
        assert!(matches!(err, SplitError::BadRequest(msg) if msg.contains("groupId")));
    }

    #[test]
    fn member_set_heals_persisted_duplicates() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let group = group_with(vec![a, b, a, a]);
        assert_eq!(member_set(&group), vec![a, b]);
        assert!(is_member(&group, &b));
        assert!(!is_member(&group, &ObjectId::new()));
    }
}
