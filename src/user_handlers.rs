use actix_web::{get, http::header, post, web, HttpResponse};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::error::{AppError, CredentialError};
use crate::models::{ActionData, LoginForm, LoginQuery};
use crate::AppState;

const DEFAULT_REDIRECT: &str = "/jokes";

pub fn validate_username(username: Option<&str>) -> Option<String> {
    match username {
        None => Some("You must provide a username".to_string()),
        Some(u) if u.chars().count() < 3 => {
            Some("Username must be at least 3 characters".to_string())
        }
        Some(_) => None,
    }
}

pub fn validate_password(password: Option<&str>) -> Option<String> {
    match password {
        None => Some("You must provide a password".to_string()),
        Some(p) if p.chars().count() < 6 => {
            Some("Password must be at least 6 characters".to_string())
        }
        Some(_) => None,
    }
}

/// Only same-site paths are followed; anything else lands on the jokes page.
/// Browsers read `\` as `/`, and the value must be a valid `Location` header,
/// so only visible ASCII is accepted.
pub fn safe_redirect(to: Option<&str>) -> &str {
    match to {
        Some(to)
            if to.starts_with('/')
                && !to.starts_with("//")
                && !to.contains('\\')
                && to.bytes().all(|b| b.is_ascii_graphic()) =>
        {
            to
        }
        _ => DEFAULT_REDIRECT,
    }
}

#[get("/login")]
pub async fn login_page(query: web::Query<LoginQuery>, user: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "redirectTo": safe_redirect(query.redirect_to.as_deref()),
        "loginTypes": ["login", "register"],
        "loggedIn": user.0.is_some(),
    }))
}

#[post("/login")]
pub async fn login(
    form: web::Form<LoginForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();

    let (Some(username), Some(password)) = (form.username.as_deref(), form.password.as_deref())
    else {
        return Err(AppError::BadRequest(
            ActionData::default()
                .field("username", validate_username(form.username.as_deref()))
                .field("password", validate_password(form.password.as_deref())),
        ));
    };

    let Some(login_type) = form.login_type.as_deref() else {
        return Err(AppError::BadRequest(ActionData::form_error(
            "Form not submitted correctly",
        )));
    };
    let redirect_to = safe_redirect(form.redirect_to.as_deref());

    let values = ActionData::default()
        .value("username", username)
        .value("password", password)
        .value("loginType", login_type);
    let checked = values
        .clone()
        .field("username", validate_username(Some(username)))
        .field("password", validate_password(Some(password)));
    if checked.has_field_errors() {
        return Err(AppError::BadRequest(checked));
    }

    match login_type {
        "login" => match state.credentials.login(username, password).await {
            Ok(user_id) => {
                info!(%user_id, username, "user logged in");
                state.sessions.create_session(user_id, redirect_to)
            }
            Err(CredentialError::NoSuchUser | CredentialError::WrongPassword) => {
                warn!(username, "failed login attempt");
                Err(AppError::BadRequest(
                    values.with_form_error("Username/password combination is incorrect"),
                ))
            }
            Err(err) => Err(err.into()),
        },
        "register" => {
            if state.store.find_user_by_username(username).await?.is_some() {
                return Err(AppError::BadRequest(taken(values, username)));
            }

            match state.credentials.register(username, password).await {
                Ok(user_id) => state.sessions.create_session(user_id, redirect_to),
                // lost a race with a concurrent registration
                Err(CredentialError::UsernameTaken) => {
                    Err(AppError::BadRequest(taken(values, username)))
                }
                Err(err @ CredentialError::Hash(_)) => {
                    warn!(username, error = %err, "registration failed");
                    Err(AppError::BadRequest(values.with_form_error(
                        "Something went wrong when creating a new user",
                    )))
                }
                Err(err) => Err(err.into()),
            }
        }
        _ => Err(AppError::BadRequest(values.with_form_error("Login type invalid"))),
    }
}

fn taken(values: ActionData, username: &str) -> ActionData {
    values.field("username", Some(format!("Username {username} is already taken")))
}

#[post("/logout")]
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    state.sessions.logout()
}

#[get("/logout")]
pub async fn logout_page() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert_eq!(
            validate_username(None).as_deref(),
            Some("You must provide a username")
        );
        assert_eq!(
            validate_username(Some("ko")).as_deref(),
            Some("Username must be at least 3 characters")
        );
        assert_eq!(validate_username(Some("kod")), None);
    }

    #[test]
    fn password_rules() {
        assert!(validate_password(None).is_some());
        assert_eq!(
            validate_password(Some("12345")).as_deref(),
            Some("Password must be at least 6 characters")
        );
        assert_eq!(validate_password(Some("123456")), None);
        // counted in characters, not bytes
        assert!(validate_password(Some("ééééé")).is_some());
    }

    #[test]
    fn redirects_stay_on_site() {
        assert_eq!(safe_redirect(None), "/jokes");
        assert_eq!(safe_redirect(Some("/jokes/new")), "/jokes/new");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/jokes");
        assert_eq!(safe_redirect(Some("//evil.example")), "/jokes");
        assert_eq!(safe_redirect(Some("/\\evil.example")), "/jokes");
        assert_eq!(safe_redirect(Some("/jokes\nX-Evil: 1")), "/jokes");
        assert_eq!(safe_redirect(Some("/jokes\t")), "/jokes");
        assert_eq!(safe_redirect(Some("/jokés")), "/jokes");
    }
}
