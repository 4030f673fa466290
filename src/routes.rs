use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::SplitError;
use crate::expenses::{ExpenseEngine, NewExpense};
use crate::groups::{GroupManager, NewGroup};
use crate::membership::parse_id;
use crate::responses::{
    BalanceResponse, ExpenseDetailsResponse, ExpenseResponse, GroupResponse, MemberResponse,
    MessageResponse, PopulatedGroupResponse,
};
use crate::users::UserDirectory;

type RouteResult = Result<HttpResponse, SplitError>;

#[get("/")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().body("API is running...")
}

#[post("/api/groups")]
async fn create_group(
    groups: web::Data<GroupManager>,
    identity: Identity,
    json: web::Json<NewGroup>,
) -> RouteResult {
    let group = groups
        .create_group(identity.user_id(), json.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(GroupResponse::from(group)))
}

#[get("/api/groups")]
async fn list_groups(groups: web::Data<GroupManager>, identity: Identity) -> RouteResult {
    let listed = groups.list_groups(identity.user_id()).await?;
    Ok(HttpResponse::Ok().json(
        listed
            .into_iter()
            .map(PopulatedGroupResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[get("/api/groups/{id}")]
async fn get_group(
    groups: web::Data<GroupManager>,
    identity: Identity,
    id: web::Path<String>,
) -> RouteResult {
    let group_id = parse_id(&id.into_inner(), "id")?;
    let group = groups.get_group(identity.user_id(), &group_id).await?;
    Ok(HttpResponse::Ok().json(PopulatedGroupResponse::from(group)))
}

#[delete("/api/groups/{id}")]
async fn delete_group(
    groups: web::Data<GroupManager>,
    identity: Identity,
    id: web::Path<String>,
) -> RouteResult {
    let group_id = parse_id(&id.into_inner(), "id")?;
    groups.delete_group(identity.user_id(), &group_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Group removed",
    }))
}

#[post("/api/expenses")]
async fn add_expense(
    expenses: web::Data<ExpenseEngine>,
    identity: Identity,
    json: web::Json<NewExpense>,
) -> RouteResult {
    let expense = expenses
        .add_expense(identity.user_id(), json.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ExpenseResponse::from(expense)))
}

#[get("/api/expenses")]
async fn list_my_expenses(expenses: web::Data<ExpenseEngine>, identity: Identity) -> RouteResult {
    let listed = expenses.list_my_expenses(identity.user_id()).await?;
    Ok(HttpResponse::Ok().json(
        listed
            .into_iter()
            .map(ExpenseDetailsResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[get("/api/expenses/group/{group_id}")]
async fn list_group_expenses(
    expenses: web::Data<ExpenseEngine>,
    identity: Identity,
    group_id: web::Path<String>,
) -> RouteResult {
    let group_id = parse_id(&group_id.into_inner(), "groupId")?;
    let listed = expenses
        .list_group_expenses(identity.user_id(), &group_id)
        .await?;
    Ok(HttpResponse::Ok().json(
        listed
            .into_iter()
            .map(ExpenseDetailsResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[get("/api/expenses/group/{group_id}/balance")]
async fn group_balance(
    expenses: web::Data<ExpenseEngine>,
    identity: Identity,
    group_id: web::Path<String>,
) -> RouteResult {
    let group_id = parse_id(&group_id.into_inner(), "groupId")?;
    let balances = expenses.group_balance(identity.user_id(), &group_id).await?;
    Ok(HttpResponse::Ok().json(
        balances
            .into_iter()
            .map(BalanceResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[delete("/api/expenses/{id}")]
async fn delete_expense(
    expenses: web::Data<ExpenseEngine>,
    identity: Identity,
    id: web::Path<String>,
) -> RouteResult {
    let expense_id = parse_id(&id.into_inner(), "id")?;
    expenses
        .delete_expense(identity.user_id(), &expense_id)
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Expense removed",
    }))
}

// Any authenticated caller may settle.
#[put("/api/expenses/{id}/settle")]
async fn settle_expense(
    expenses: web::Data<ExpenseEngine>,
    _identity: Identity,
    id: web::Path<String>,
) -> RouteResult {
    let expense_id = parse_id(&id.into_inner(), "id")?;
    let expense = expenses.settle_expense(&expense_id).await?;
    Ok(HttpResponse::Ok().json(ExpenseResponse::from(expense)))
}

#[derive(Deserialize)]
struct SearchParams {
    search: Option<String>,
}

#[get("/api/users")]
async fn search_users(
    users: web::Data<UserDirectory>,
    identity: Identity,
    params: web::Query<SearchParams>,
) -> RouteResult {
    let found = users
        .search(identity.user_id(), params.search.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(
        found
            .into_iter()
            .map(MemberResponse::from)
            .collect::<Vec<_>>(),
    ))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(create_group)
        .service(list_groups)
        .service(get_group)
        .service(delete_group)
        .service(add_expense)
        .service(list_my_expenses)
        .service(list_group_expenses)
        .service(group_balance)
        .service(delete_expense)
        .service(settle_expense)
        .service(search_users);
}
