use std::collections::BTreeMap;

use crate::membership::canonical_id;
use crate::schemas::{Expense, UserId};

#[derive(Clone, Debug, PartialEq)]
pub struct MemberBalance {
    pub user: UserId,
    pub balance: f64,
}

type Balance = BTreeMap<String, MemberBalance>;

/// Net position of every member over the unsettled expenses: positive means
/// the member is owed money. Users that appear only in expenses (former
/// members, explicit participants) are included too.
pub fn compute_balance(members: &[UserId], expenses: &[Expense]) -> Vec<MemberBalance> {
    let mut balance = Balance::new();
    for member in members {
        add(&mut balance, member, 0.0);
    }
    for expense in expenses.iter().filter(|expense| !expense.is_paid) {
        add(&mut balance, &expense.paid_by, expense.amount);
        for participant in &expense.participants {
            add(&mut balance, &participant.user, -participant.amount);
        }
    }
    balance.into_values().collect()
}

fn add(balance: &mut Balance, user: &UserId, amount: f64) {
    balance
        .entry(canonical_id(user))
        .and_modify(|entry| entry.balance += amount)
        .or_insert(MemberBalance {
            user: *user,
            balance: amount,
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{Participant, DEFAULT_CATEGORY};
    use bson::oid::ObjectId;
    use chrono::Utc;

    fn expense(paid_by: UserId, amount: f64, shares: &[(UserId, f64)], is_paid: bool) -> Expense {
        let now = Utc::now();
        Expense {
            id: ObjectId::new(),
            description: "Groceries".to_string(),
            amount,
            paid_by,
            group_id: ObjectId::new(),
            participants: shares
                .iter()
                .map(|(user, amount)| Participant {
                    user: *user,
                    amount: *amount,
                })
                .collect(),
            category: DEFAULT_CATEGORY.to_string(),
            date: now,
            is_paid,
            created_at: now,
            updated_at: now,
        }
    }

    fn balance_of(balances: &[MemberBalance], user: &UserId) -> f64 {
        balances
            .iter()
            .find(|b| b.user == *user)
            .map(|b| b.balance)
            .unwrap()
    }

    #[test]
    fn payer_is_credited_and_participants_debited() {
        let (a, b, c) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        let expenses = vec![expense(c, 90.0, &[(a, 30.0), (b, 30.0), (c, 30.0)], false)];

        let balances = compute_balance(&[a, b, c], &expenses);

        assert_eq!(balances.len(), 3);
        assert_eq!(balance_of(&balances, &a), -30.0);
        assert_eq!(balance_of(&balances, &b), -30.0);
        assert_eq!(balance_of(&balances, &c), 60.0);
    }

    #[test]
    fn settled_expenses_do_not_count() {
        let (a, b) = (ObjectId::new(), ObjectId::new());
        let expenses = vec![
            expense(a, 20.0, &[(a, 10.0), (b, 10.0)], true),
            expense(b, 8.0, &[(a, 4.0), (b, 4.0)], false),
        ];

        let balances = compute_balance(&[a, b], &expenses);

        assert_eq!(balance_of(&balances, &a), -4.0);
        assert_eq!(balance_of(&balances, &b), 4.0);
    }

    #[test]
    fn members_without_expenses_are_even() {
        let a = ObjectId::new();
        let balances = compute_balance(&[a], &[]);
        assert_eq!(balances, vec![MemberBalance { user: a, balance: 0.0 }]);
    }
}
