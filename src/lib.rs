//! Shared-expense tracking: groups of users log expenses and split them.
//!
//! [`groups::GroupManager`] owns group membership and
//! [`expenses::ExpenseEngine`] computes splits and handles settlement. Both
//! persist through a [`store::DocumentStore`], backed by MongoDB in
//! production and by [`memory_store::MemoryStore`] in tests.
use std::sync::Arc;

use actix_web::web;

pub mod auth;
pub mod balance;
pub mod config;
pub mod error;
pub mod expenses;
pub mod groups;
pub mod membership;
pub mod memory_store;
pub mod mongo_store;
pub mod responses;
pub mod routes;
pub mod schemas;
pub mod store;
pub mod users;

use auth::TokenSigner;
use error::SplitError;
use expenses::ExpenseEngine;
use groups::GroupManager;
use store::DocumentStore;
use users::UserDirectory;

/// Everything the routes need, shared across workers.
#[derive(Clone)]
pub struct AppState {
    groups: web::Data<GroupManager>,
    expenses: web::Data<ExpenseEngine>,
    users: web::Data<UserDirectory>,
    signer: web::Data<TokenSigner>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, signer: TokenSigner) -> Self {
        Self {
            groups: web::Data::new(GroupManager::new(Arc::clone(&store))),
            expenses: web::Data::new(ExpenseEngine::new(Arc::clone(&store))),
            users: web::Data::new(UserDirectory::new(store)),
            signer: web::Data::new(signer),
        }
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.groups.clone())
            .app_data(self.expenses.clone())
            .app_data(self.users.clone())
            .app_data(self.signer.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                SplitError::BadRequest(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                SplitError::BadRequest(err.to_string()).into()
            }));
        routes::configure(cfg);
    }
}
