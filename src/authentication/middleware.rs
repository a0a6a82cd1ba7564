use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use super::jwt::{verify_jwt_session, SessionData};

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Accepts `Bearer <jwt>` and `Token <jwt>` authorization headers.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    match scheme {
        "Bearer" | "Token" if !token.trim().is_empty() => Some(token.trim()),
        _ => None,
    }
}

fn resolve_session(header: &str, secret: &str) -> Option<SessionData> {
    let token = bearer_token(header)?;
    verify_jwt_session(token, secret).ok().map(SessionData::from)
}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            match header.and_then(|header| resolve_session(&header, &secret)) {
                Some(session) => Ok(session),
                None => Err(warp::reject::custom(Unauthorized)),
            }
        }
    })
}

/// Anonymous callers get `None`; a present but invalid token counts as
/// anonymous as well.
pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        header.and_then(|header| resolve_session(&header, &secret))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Bearer abc.def.ghi", Some("abc.def.ghi"))]
    #[case("Token abc.def.ghi", Some("abc.def.ghi"))]
    #[case("Basic dXNlcjpwYXNz", None)]
    #[case("Bearer ", None)]
    #[case("abc.def.ghi", None)]
    fn test_bearer_token(#[case] header: &str, #[case] token: Option<&str>) {
        assert_eq!(bearer_token(header), token);
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let filter = with_possible_session(Arc::from("secret"));
        let session = warp::test::request().filter(&filter).await;
        assert!(matches!(session, Ok(None)));
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let filter = with_session(Arc::from("secret"));
        let session = warp::test::request()
            .header("authorization", "Bearer not-a-token")
            .filter(&filter)
            .await;
        assert!(session.is_err());
    }
}
