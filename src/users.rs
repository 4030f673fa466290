use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SplitResult;
use crate::membership::{canonical_id, dedup_ids};
use crate::schemas::{User, UserId, UserSummary};
use crate::store::{DocumentStore, Filter, Query, Repository};

/// Read-only access to user records, used to expand id references into
/// display fields.
#[derive(Clone)]
pub struct UserDirectory {
    users: Repository<User>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: Repository::new(store),
        }
    }

    /// Display records keyed by canonical id. Unknown ids are left out.
    pub async fn summaries<I>(&self, ids: I) -> SplitResult<HashMap<String, UserSummary>>
    where
        I: IntoIterator<Item = UserId>,
    {
        let ids = dedup_ids(ids);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = self
            .users
            .find(&Filter::is_in("_id", ids), &Query::new())
            .await?;
        Ok(users
            .into_iter()
            .map(|user| (canonical_id(&user.id), UserSummary::from(user)))
            .collect())
    }

    /// Expands ids in order, once per distinct user. References to users that
    /// no longer exist are dropped.
    pub async fn populate(&self, ids: &[UserId]) -> SplitResult<Vec<UserSummary>> {
        let ids = dedup_ids(ids.iter().copied());
        let mut found = self.summaries(ids.iter().copied()).await?;
        Ok(ids
            .iter()
            .filter_map(|id| found.remove(&canonical_id(id)))
            .collect())
    }

    /// Other users whose name or email contains `search`, ignoring case.
    pub async fn search(&self, requester: &UserId, search: Option<&str>) -> SplitResult<Vec<User>> {
        let not_me = Filter::ne("_id", *requester);
        let filter = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(keyword) => Filter::And(vec![
                Filter::Or(vec![
                    Filter::contains_ignore_case("name", keyword),
                    Filter::contains_ignore_case("email", keyword),
                ]),
                not_me,
            ]),
            None => not_me,
        };
        Ok(self.users.find(&filter, &Query::new()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use bson::oid::ObjectId;

    async fn directory_with(users: &[(&str, &str)]) -> (UserDirectory, Vec<UserId>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let repository = Repository::<User>::new(Arc::clone(&store));
        let mut ids = Vec::new();
        for (name, email) in users {
            let user = User {
                id: ObjectId::new(),
                name: name.to_string(),
                email: email.to_string(),
                avatar: None,
            };
            ids.push(user.id);
            repository.create(user).await.unwrap();
        }
        (UserDirectory::new(store), ids)
    }

    #[tokio::test]
    async fn search_matches_name_or_email_and_skips_requester() {
        let (directory, ids) = directory_with(&[
            ("Ana", "ana@example.com"),
            ("Bruno", "bruno@ANAGRAM.io"),
            ("Carla", "carla@example.com"),
        ])
        .await;

        let found = directory.search(&ids[0], Some("ana")).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Bruno"]);

        let everyone_else = directory.search(&ids[0], Some("  ")).await.unwrap();
        assert_eq!(everyone_else.len(), 2);
    }

    #[tokio::test]
    async fn populate_keeps_order_and_drops_unknown_users() {
        let (directory, ids) =
            directory_with(&[("Ana", "ana@example.com"), ("Bruno", "bruno@example.com")]).await;

        let members = directory
            .populate(&[ids[1], ObjectId::new(), ids[0], ids[1]])
            .await
            .unwrap();
        let names: Vec<_> = members.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Bruno", "Ana"]);
    }
}
