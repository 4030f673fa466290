use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Entity;

pub type UserId = ObjectId;

pub const DEFAULT_GROUP_IMAGE: &str = concat!(
    "https://images.unsplash.com/photo-1576267423445-b2e0074d68a4",
    "?w=900&auto=format&fit=crop&q=60"
);
pub const DEFAULT_CATEGORY: &str = "General";

fn default_group_image() -> String {
    DEFAULT_GROUP_IMAGE.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default = "default_group_image")]
    pub image: String,
    #[serde(default)]
    pub members: Vec<UserId>,
    pub created_by: UserId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Group {
    const COLLECTION: &'static str = "Groups";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// One member's owed share of an expense.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Participant {
    pub user: UserId,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub description: String,
    pub amount: f64,
    pub paid_by: UserId,
    pub group_id: ObjectId,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Expense {
    const COLLECTION: &'static str = "Expenses";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

// Account fields other than the display ones live with the auth service and
// are ignored on read.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Entity for User {
    const COLLECTION: &'static str = "Users";

    fn id(&self) -> ObjectId {
        self.id
    }
}

/// The display fields of a referenced user.
#[derive(Clone, Debug, PartialEq)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupSummary {
    pub id: ObjectId,
    pub name: String,
}

/// A group whose member ids have been expanded into display records.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulatedGroup {
    pub group: Group,
    pub members: Vec<UserSummary>,
}

/// An expense with its payer and, when requested, its group resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseDetails {
    pub expense: Expense,
    pub paid_by: Option<UserSummary>,
    pub group: Option<GroupSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_defaults_fill_missing_image_and_members() {
        let now = Utc::now();
        let doc = bson::doc! {
            "_id": ObjectId::new(),
            "name": "Trip",
            "createdBy": ObjectId::new(),
            "createdAt": bson::DateTime::from_chrono(now),
            "updatedAt": bson::DateTime::from_chrono(now),
        };
        let group: Group = bson::from_document(doc).unwrap();
        assert_eq!(group.image, DEFAULT_GROUP_IMAGE);
        assert!(group.members.is_empty());
    }

    #[test]
    fn expense_is_stored_with_camel_case_fields() {
        let now = Utc::now();
        let expense = Expense {
            id: ObjectId::new(),
            description: "Dinner".to_string(),
            amount: 30.0,
            paid_by: ObjectId::new(),
            group_id: ObjectId::new(),
            participants: vec![],
            category: DEFAULT_CATEGORY.to_string(),
            date: now,
            is_paid: false,
            created_at: now,
            updated_at: now,
        };
        let doc = bson::to_document(&expense).unwrap();
        assert!(doc.contains_key("_id"));
        assert!(doc.contains_key("paidBy"));
        assert!(doc.contains_key("groupId"));
        assert!(doc.contains_key("isPaid"));
        assert!(matches!(doc.get("date"), Some(bson::Bson::DateTime(_))));
    }
}
