pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod joke_handlers;
pub mod models;
pub mod user_handlers;

use std::sync::Arc;

use actix_web::{error::UrlencodedError, web, HttpRequest};
use tracing::debug;

use auth::SessionService;
use config::Config;
use credentials::CredentialService;
use db::Store;
use error::AppError;
use models::ActionData;

/// Read-only context shared by every request.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub credentials: CredentialService,
    pub sessions: SessionService,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn Store>) -> Self {
        Self {
            credentials: CredentialService::new(store.clone(), config.bcrypt_cost),
            sessions: SessionService::new(config),
            store,
        }
    }
}

fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    debug!("unreadable form body: {err}");
    AppError::BadRequest(ActionData::form_error("Form not submitted correctly")).into()
}

/// Mounts every route. `/jokes/new` is registered ahead of `/jokes/{joke_id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(form_error_handler))
        .service(joke_handlers::index)
        .service(joke_handlers::jokes_index)
        .service(joke_handlers::new_joke_page)
        .service(joke_handlers::create_joke)
        .service(joke_handlers::joke_detail)
        .service(user_handlers::login_page)
        .service(user_handlers::login)
        .service(user_handlers::logout)
        .service(user_handlers::logout_page);
}
