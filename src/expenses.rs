use std::collections::HashMap;
use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::balance::{compute_balance, MemberBalance};
use crate::error::{SplitError, SplitResult};
use crate::groups::GroupManager;
use crate::membership::{canonical_id, member_set, parse_id, same_user};
use crate::schemas::{
    Expense, ExpenseDetails, GroupSummary, Participant, UserId, DEFAULT_CATEGORY,
};
use crate::store::{
    timestamp_now, to_store_precision, DocumentStore, Filter, Query, Repository,
};
use crate::users::UserDirectory;

const RECENT_EXPENSES: i64 = 10;

/// Only `all` forces an equal split; any other value defers to the
/// participant list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    All,
    Selected,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ParticipantInput {
    pub user: String,
    pub amount: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub group_id: Option<String>,
    pub participants: Option<Vec<ParticipantInput>>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub paid_by: Option<String>,
    pub split_type: Option<SplitType>,
}

fn invalid(reason: &str) -> SplitError {
    SplitError::BadRequest(format!("Invalid expense data: {reason}"))
}

/// Splits `amount` evenly over the members. No remainder redistribution:
/// every share is the plain quotient.
pub fn equal_split(amount: f64, members: &[UserId]) -> Vec<Participant> {
    let share = amount / members.len() as f64;
    members
        .iter()
        .map(|member| Participant {
            user: *member,
            amount: share,
        })
        .collect()
}

#[derive(Clone)]
pub struct ExpenseEngine {
    groups: GroupManager,
    expenses: Repository<Expense>,
    users: UserDirectory,
}

impl ExpenseEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            groups: GroupManager::new(Arc::clone(&store)),
            expenses: Repository::new(Arc::clone(&store)),
            users: UserDirectory::new(store),
        }
    }

    /// Records an expense against a group. Any authenticated user may add to
    /// any existing group.
    pub async fn add_expense(
        &self,
        requester: &UserId,
        new_expense: NewExpense,
    ) -> SplitResult<Expense> {
        let group_id = new_expense
            .group_id
            .as_deref()
            .ok_or_else(|| invalid("groupId is required"))
            .and_then(|raw| parse_id(raw, "groupId"))?;
        let group = self.groups.require_group(&group_id).await?;

        // A blank payer means the requester paid.
        let paid_by = match new_expense.paid_by.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_id(raw, "paidBy")?,
            _ => *requester,
        };
        let description = new_expense
            .description
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| invalid("description is required"))?;
        let amount = new_expense
            .amount
            .filter(|a| a.is_finite() && *a > 0.0)
            .ok_or_else(|| invalid("amount must be a positive number"))?;

        let explicit = new_expense
            .participants
            .filter(|p| !p.is_empty() && new_expense.split_type != Some(SplitType::All));
        let participants = match explicit {
            Some(inputs) => inputs
                .iter()
                .map(|p| -> SplitResult<Participant> {
                    Ok(Participant {
                        user: parse_id(&p.user, "participants.user")?,
                        amount: p.amount,
                    })
                })
                .collect::<SplitResult<Vec<_>>>()?,
            None => {
                let members = member_set(&group);
                if members.is_empty() {
                    return Err(invalid("group has no members to split between"));
                }
                equal_split(amount, &members)
            }
        };

        let now = timestamp_now();
        let expense = Expense {
            id: ObjectId::new(),
            description,
            amount,
            paid_by,
            group_id,
            participants,
            category: new_expense
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            date: new_expense.date.map(to_store_precision).unwrap_or(now),
            is_paid: false,
            created_at: now,
            updated_at: now,
        };
        let expense = self.expenses.create(expense).await?;
        tracing::info!(
            expense = %expense.id,
            group = %group_id,
            participants = expense.participants.len(),
            "expense added"
        );
        Ok(expense)
    }

    /// The most recent expenses across every group the requester belongs to.
    pub async fn list_my_expenses(
        &self,
        requester: &UserId,
    ) -> SplitResult<Vec<ExpenseDetails>> {
        let groups = self.groups.groups_of(requester).await?;
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let names: HashMap<String, GroupSummary> = groups
            .into_iter()
            .map(|g| (canonical_id(&g.id), GroupSummary { id: g.id, name: g.name }))
            .collect();

        let group_ids = names.values().map(|g| g.id).collect::<Vec<_>>();
        let expenses = self
            .expenses
            .find(
                &Filter::is_in("groupId", group_ids),
                &Query::new().newest_first("date").limit(RECENT_EXPENSES),
            )
            .await?;

        let mut details = self.with_payers(expenses).await?;
        for detail in &mut details {
            detail.group = names.get(&canonical_id(&detail.expense.group_id)).cloned();
        }
        Ok(details)
    }

    /// All of a group's expenses, newest first. Members only.
    pub async fn list_group_expenses(
        &self,
        requester: &UserId,
        group_id: &ObjectId,
    ) -> SplitResult<Vec<ExpenseDetails>> {
        self.groups.require_member(requester, group_id).await?;
        let expenses = self
            .expenses
            .find(
                &Filter::eq("groupId", *group_id),
                &Query::new().newest_first("date"),
            )
            .await?;
        self.with_payers(expenses).await
    }

    /// Net balances of the group's members over its unsettled expenses.
    pub async fn group_balance(
        &self,
        requester: &UserId,
        group_id: &ObjectId,
    ) -> SplitResult<Vec<MemberBalance>> {
        let group = self.groups.require_member(requester, group_id).await?;
        let open = self
            .expenses
            .find(
                &Filter::And(vec![
                    Filter::eq("groupId", *group_id),
                    Filter::eq("isPaid", false),
                ]),
                &Query::new(),
            )
            .await?;
        Ok(compute_balance(&member_set(&group), &open))
    }

    /// Deletes the expense. Only its payer may do so.
    pub async fn delete_expense(
        &self,
        requester: &UserId,
        expense_id: &ObjectId,
    ) -> SplitResult<()> {
        let expense = self.require_expense(expense_id).await?;
        if !same_user(&expense.paid_by, requester) {
            tracing::warn!(
                expense = %expense_id,
                user = %requester,
                "delete refused, not the payer"
            );
            return Err(SplitError::Unauthorized(
                "Only the person who paid can delete the expense".to_string(),
            ));
        }
        self.expenses.delete_one(&expense).await?;
        tracing::info!(expense = %expense_id, "expense removed");
        Ok(())
    }

    /// Marks the expense as paid. Settling is permanent and settling twice is
    /// harmless.
    pub async fn settle_expense(&self, expense_id: &ObjectId) -> SplitResult<Expense> {
        let mut expense = self.require_expense(expense_id).await?;
        expense.is_paid = true;
        let expense = self.expenses.save(expense).await?;
        tracing::info!(expense = %expense_id, "expense settled");
        Ok(expense)
    }

    async fn require_expense(&self, expense_id: &ObjectId) -> SplitResult<Expense> {
        self.expenses
            .find_by_id(expense_id)
            .await?
            .ok_or_else(|| SplitError::NotFound("Expense not found".to_string()))
    }

    async fn with_payers(&self, expenses: Vec<Expense>) -> SplitResult<Vec<ExpenseDetails>> {
        let payers = self
            .users
            .summaries(expenses.iter().map(|e| e.paid_by))
            .await?;
        Ok(expenses
            .into_iter()
            .map(|expense| ExpenseDetails {
                paid_by: payers.get(&canonical_id(&expense.paid_by)).cloned(),
                group: None,
                expense,
            })
            .collect())
    }
}
