//! JSON bodies returned by the HTTP routes. Ids are rendered as hex strings
//! and dates as RFC 3339.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::balance::MemberBalance;
use crate::schemas::{
    Expense, ExpenseDetails, Group, GroupSummary, Participant, PopulatedGroup, User, UserSummary,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub image: String,
    pub members: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id.to_hex(),
            name: group.name,
            image: group.image,
            members: group.members.iter().map(|m| m.to_hex()).collect(),
            created_by: group.created_by.to_hex(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

impl From<UserSummary> for MemberResponse {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name,
            email: user.email,
            avatar: user.avatar,
        }
    }
}

impl From<User> for MemberResponse {
    fn from(user: User) -> Self {
        UserSummary::from(user).into()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedGroupResponse {
    pub id: String,
    pub name: String,
    pub image: String,
    pub members: Vec<MemberResponse>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PopulatedGroup> for PopulatedGroupResponse {
    fn from(populated: PopulatedGroup) -> Self {
        let group = populated.group;
        Self {
            id: group.id.to_hex(),
            name: group.name,
            image: group.image,
            members: populated.members.into_iter().map(Into::into).collect(),
            created_by: group.created_by.to_hex(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub user: String,
    pub amount: f64,
}

impl From<Participant> for ParticipantResponse {
    fn from(participant: Participant) -> Self {
        Self {
            user: participant.user.to_hex(),
            amount: participant.amount,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseResponse {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub paid_by: String,
    pub group_id: String,
    pub participants: Vec<ParticipantResponse>,
    pub category: String,
    pub date: DateTime<Utc>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id.to_hex(),
            description: expense.description,
            amount: expense.amount,
            paid_by: expense.paid_by.to_hex(),
            group_id: expense.group_id.to_hex(),
            participants: expense.participants.into_iter().map(Into::into).collect(),
            category: expense.category,
            date: expense.date,
            is_paid: expense.is_paid,
            created_at: expense.created_at,
            updated_at: expense.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PayerResponse {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupNameResponse {
    pub id: String,
    pub name: String,
}

impl From<GroupSummary> for GroupNameResponse {
    fn from(group: GroupSummary) -> Self {
        Self {
            id: group.id.to_hex(),
            name: group.name,
        }
    }
}

/// An expense with its payer expanded. Unresolvable references stay as ids.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDetailsResponse {
    #[serde(flatten)]
    pub expense: ExpenseResponse,
    pub payer: Option<PayerResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupNameResponse>,
}

impl From<ExpenseDetails> for ExpenseDetailsResponse {
    fn from(details: ExpenseDetails) -> Self {
        Self {
            payer: details.paid_by.map(|user| PayerResponse {
                id: user.id.to_hex(),
                name: user.name,
                avatar: user.avatar,
            }),
            group: details.group.map(Into::into),
            expense: details.expense.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user: String,
    pub balance: f64,
}

impl From<MemberBalance> for BalanceResponse {
    fn from(balance: MemberBalance) -> Self {
        Self {
            user: balance.user.to_hex(),
            balance: balance.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn expense_details_flatten_into_one_object() {
        let now = Utc::now();
        let payer = ObjectId::new();
        let details = ExpenseDetails {
            expense: Expense {
                id: ObjectId::new(),
                description: "Taxi".to_string(),
                amount: 12.5,
                paid_by: payer,
                group_id: ObjectId::new(),
                participants: vec![Participant {
                    user: payer,
                    amount: 12.5,
                }],
                category: "Transport".to_string(),
                date: now,
                is_paid: false,
                created_at: now,
                updated_at: now,
            },
            paid_by: Some(UserSummary {
                id: payer,
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                avatar: None,
            }),
            group: None,
        };

        let json = serde_json::to_value(ExpenseDetailsResponse::from(details)).unwrap();
        assert_eq!(json["paidBy"], payer.to_hex());
        assert_eq!(json["payer"]["name"], "Ana");
        assert_eq!(json["participants"][0]["user"], payer.to_hex());
        assert_eq!(json["isPaid"], false);
        assert!(json.get("group").is_none());
    }
}
