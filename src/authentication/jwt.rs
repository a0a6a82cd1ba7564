use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::schema::UserRole;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub user_role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = iat.saturating_add(lifetime.num_seconds());

        Self {
            user_id: id,
            username,
            user_role: role,
            iat,
            exp,
        }
    }
}

/// The authenticated identity handed to every mutating action.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub user_role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), potion::Error> {
        if !action.authenticate(self) {
            return Err(
                HtmlError::Unauthorized.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            user_role: value.user_role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, potion::Error> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| HtmlError::InternalServerError.new("Invalid signing key"))
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    lifetime: Duration,
) -> Result<String, potion::Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role.to_owned(),
        lifetime,
    );

    claims.sign_with_key(&key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        HtmlError::InternalServerError.new("Failed to sign session")
    })
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, potion::Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: 12,
            email: String::from("anna@example.com"),
            username: String::from("anna"),
            first_name: String::from("Anna"),
            last_name: String::from("Cook"),
            password: String::new(),
            avatar: None,
            role: UserRole::Admin,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_session_round_trip() {
        let token =
            generate_jwt_session(&user(), "test-secret", Duration::hours(1)).unwrap_or_default();
        let session: SessionData = match verify_jwt_session(&token, "test-secret") {
            Ok(claims) => claims.into(),
            Err(e) => panic!("{:?}", e.info),
        };

        assert_eq!(session.user_id, 12);
        assert_eq!(session.username, "anna");
        assert_eq!(session.user_role, UserRole::Admin);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token =
            generate_jwt_session(&user(), "test-secret", Duration::hours(1)).unwrap_or_default();
        assert!(verify_jwt_session(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token =
            generate_jwt_session(&user(), "test-secret", Duration::hours(-1)).unwrap_or_default();
        assert!(verify_jwt_session(&token, "test-secret").is_err());
    }
}
