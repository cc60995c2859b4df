use std::future::{ready, Ready};

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Claims, UserInfo};
use crate::AppState;

/// Mints and reads the signed, cookie-carried session token. Nothing is
/// kept server side; the token alone names the user until it expires.
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
    max_age: Duration,
    secure: bool,
}

impl SessionService {
    pub fn new(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.session_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.session_secret.as_bytes()),
            validation,
            cookie_name: config.cookie_name.clone(),
            max_age: config.session_max_age,
            secure: config.cookie_secure,
        }
    }

    pub fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.max_age).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))
    }

    /// Any failure (bad signature, expired, garbled, foreign subject) is
    /// treated as no session at all.
    pub fn verify_token(&self, token: &str) -> Option<Uuid> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| debug!("rejected session token: {e}"))
            .ok()?
            .claims;

        Uuid::parse_str(&claims.sub)
            .map_err(|e| debug!("session token subject is not a user id: {e}"))
            .ok()
    }

    /// Sets the session cookie on a redirect to `redirect_to`.
    pub fn create_session(&self, user_id: Uuid, redirect_to: &str) -> Result<HttpResponse, AppError> {
        let token = self.create_token(user_id)?;
        let cookie = Cookie::build(self.cookie_name.clone(), token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(self.max_age.num_seconds()))
            .finish();

        Ok(HttpResponse::Found()
            .insert_header((header::LOCATION, redirect_to))
            .cookie(cookie)
            .finish())
    }

    pub fn get_user_id(&self, req: &HttpRequest) -> Option<Uuid> {
        let cookie = req.cookie(&self.cookie_name)?;
        self.verify_token(cookie.value())
    }

    pub fn require_user_id(&self, req: &HttpRequest) -> Result<Uuid, AppError> {
        self.get_user_id(req).ok_or(AppError::Unauthenticated)
    }

    /// Redirects to the login page with the session cookie expired.
    pub fn logout(&self) -> HttpResponse {
        let mut cookie = Cookie::build(self.cookie_name.clone(), "")
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .finish();
        cookie.make_removal();

        HttpResponse::Found()
            .insert_header((header::LOCATION, "/login"))
            .cookie(cookie)
            .finish()
    }
}

/// Resolves the session to the user record; a session naming a deleted user
/// counts as no session.
pub async fn get_user(state: &AppState, user_id: Option<Uuid>) -> Result<Option<UserInfo>, AppError> {
    let Some(id) = user_id else {
        return Ok(None);
    };
    Ok(state
        .store
        .find_user_by_id(id)
        .await?
        .map(|user| UserInfo::from(&user)))
}

fn app_state(req: &HttpRequest) -> Result<&web::Data<AppState>, AppError> {
    req.app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not registered".to_string()))
}

/// The signed-in user's id, if any.
pub struct CurrentUser(pub Option<Uuid>);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(app_state(req).map(|state| CurrentUser(state.sessions.get_user_id(req))))
    }
}

/// The signed-in user's id. Extraction fails with 401 when there is none,
/// so the handler body never runs.
pub struct RequireUser(pub Uuid);

impl FromRequest for RequireUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            app_state(req)
                .and_then(|state| state.sessions.require_user_id(req))
                .map(RequireUser),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::MemoryStore;
    use actix_web::test::TestRequest;

    fn config(secret: &str) -> Config {
        Config {
            port: 0,
            session_secret: secret.to_string(),
            cookie_name: "RJ_session".to_string(),
            session_max_age: Duration::days(30),
            cookie_secure: false,
            bcrypt_cost: 4,
        }
    }

    fn sessions() -> SessionService {
        SessionService::new(&config("test-secret"))
    }

    fn tamper(token: &str) -> String {
        // flip a character in the middle of the signature segment
        let sig_start = token.rfind('.').unwrap() + 1;
        let idx = sig_start + (token.len() - sig_start) / 2;
        let mut bytes = token.as_bytes().to_vec();
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn token_round_trip() {
        let sessions = sessions();
        let id = Uuid::new_v4();
        let token = sessions.create_token(id).unwrap();
        assert_eq!(sessions.verify_token(&token), Some(id));
    }

    #[test]
    fn tampered_token_is_absent() {
        let sessions = sessions();
        let token = sessions.create_token(Uuid::new_v4()).unwrap();
        assert_eq!(sessions.verify_token(&tamper(&token)), None);
        assert_eq!(sessions.verify_token("not-a-token"), None);
    }

    #[test]
    fn token_from_other_secret_is_absent() {
        let other = SessionService::new(&config("another-secret"));
        let token = other.create_token(Uuid::new_v4()).unwrap();
        assert_eq!(sessions().verify_token(&token), None);
    }

    #[test]
    fn expired_token_is_absent() {
        let mut config = config("test-secret");
        config.session_max_age = Duration::seconds(-120);
        let expired = SessionService::new(&config);
        let token = expired.create_token(Uuid::new_v4()).unwrap();
        assert_eq!(sessions().verify_token(&token), None);
    }

    #[test]
    fn create_session_sets_http_only_cookie() {
        let sessions = sessions();
        let id = Uuid::new_v4();
        let res = sessions.create_session(id, "/jokes").unwrap();

        assert_eq!(res.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/jokes");

        let cookie = res.cookies().find(|c| c.name() == "RJ_session").unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));

        let req = TestRequest::default().cookie(cookie.into_owned()).to_http_request();
        assert_eq!(sessions.get_user_id(&req), Some(id));
    }

    #[test]
    fn missing_cookie_requires_login() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(sessions().get_user_id(&req), None);
        assert!(matches!(
            sessions().require_user_id(&req),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn logout_clears_cookie() {
        let res = sessions().logout();
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");
        let cookie = res.cookies().find(|c| c.name() == "RJ_session").unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[actix_web::test]
    async fn session_for_deleted_user_is_absent() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(&config("test-secret"), store.clone());

        assert_eq!(get_user(&state, None).await.unwrap(), None);
        assert_eq!(get_user(&state, Some(Uuid::new_v4())).await.unwrap(), None);

        let id = state.credentials.register("kody", "twixrox").await.unwrap();
        let user = get_user(&state, Some(id)).await.unwrap().unwrap();
        assert_eq!(user.username, "kody");
    }
}
