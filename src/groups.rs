use std::sync::Arc;

use bson::oid::ObjectId;
use serde::Deserialize;

use crate::error::{SplitError, SplitResult};
use crate::membership::{dedup_ids, is_member, member_set, parse_id, same_user};
use crate::schemas::{Group, PopulatedGroup, UserId, DEFAULT_GROUP_IMAGE};
use crate::store::{timestamp_now, DocumentStore, Filter, Query, Repository};
use crate::users::UserDirectory;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewGroup {
    pub name: Option<String>,
    pub image: Option<String>,
    pub members: Option<Vec<String>>,
}

/// Owns group membership: who is in a group, who may see it and who may
/// delete it.
#[derive(Clone)]
pub struct GroupManager {
    groups: Repository<Group>,
    users: UserDirectory,
}

impl GroupManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            groups: Repository::new(Arc::clone(&store)),
            users: UserDirectory::new(store),
        }
    }

    /// Creates a group whose members are the given users plus the requester.
    pub async fn create_group(
        &self,
        requester: &UserId,
        new_group: NewGroup,
    ) -> SplitResult<Group> {
        let name = new_group
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                SplitError::BadRequest("Invalid group data: name is required".to_string())
            })?;

        let mut members = new_group
            .members
            .unwrap_or_default()
            .iter()
            .map(|raw| parse_id(raw, "members"))
            .collect::<SplitResult<Vec<_>>>()?;
        members.push(*requester);

        let now = timestamp_now();
        let group = Group {
            id: ObjectId::new(),
            name,
            image: new_group
                .image
                .filter(|image| !image.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GROUP_IMAGE.to_string()),
            members: dedup_ids(members),
            created_by: *requester,
            created_at: now,
            updated_at: now,
        };
        let group = self.groups.create(group).await?;
        tracing::info!(group = %group.id, members = group.members.len(), "group created");
        Ok(group)
    }

    /// Every group the requester belongs to, members expanded.
    pub async fn list_groups(&self, requester: &UserId) -> SplitResult<Vec<PopulatedGroup>> {
        let groups = self.groups_of(requester).await?;
        let mut populated = Vec::with_capacity(groups.len());
        for group in groups {
            populated.push(self.populate(group).await?);
        }
        Ok(populated)
    }

    pub async fn get_group(
        &self,
        requester: &UserId,
        group_id: &ObjectId,
    ) -> SplitResult<PopulatedGroup> {
        let group = self.require_member(requester, group_id).await?;
        self.populate(group).await
    }

    /// Deletes the group. Only its creator may do so; the group's expenses
    /// are left in place.
    pub async fn delete_group(&self, requester: &UserId, group_id: &ObjectId) -> SplitResult<()> {
        let group = self.require_group(group_id).await?;
        if !same_user(&group.created_by, requester) {
            tracing::warn!(
                group = %group_id,
                user = %requester,
                "delete refused, not the creator"
            );
            return Err(SplitError::Unauthorized(
                "Only the creator can delete the group".to_string(),
            ));
        }
        self.groups.delete_one(&group).await?;
        tracing::info!(group = %group_id, "group removed");
        Ok(())
    }

    /// Stored groups listing the user as a member, unexpanded.
    pub(crate) async fn groups_of(&self, user: &UserId) -> SplitResult<Vec<Group>> {
        Ok(self
            .groups
            .find(&Filter::eq("members", *user), &Query::new())
            .await?)
    }

    pub(crate) async fn require_group(&self, group_id: &ObjectId) -> SplitResult<Group> {
        self.groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| SplitError::NotFound("Group not found".to_string()))
    }

    /// Loads the group and checks the requester is one of its members.
    pub(crate) async fn require_member(
        &self,
        requester: &UserId,
        group_id: &ObjectId,
    ) -> SplitResult<Group> {
        let group = self.require_group(group_id).await?;
        if !is_member(&group, requester) {
            tracing::warn!(group = %group_id, user = %requester, "read refused, not a member");
            return Err(SplitError::Unauthorized(
                "Not authorized to view this group".to_string(),
            ));
        }
        Ok(group)
    }

    async fn populate(&self, mut group: Group) -> SplitResult<PopulatedGroup> {
        let members = member_set(&group);
        if members.len() != group.members.len() {
            tracing::debug!(group = %group.id, "dropping duplicate member ids");
        }
        group.members = members;
        let members = self.users.populate(&group.members).await?;
        Ok(PopulatedGroup { group, members })
    }
}
