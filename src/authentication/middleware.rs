use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter};

use crate::{constants::SESSION_COOKIE, error::RecipeError};

use super::jwt::{verify_jwt_session, SessionData};

/// Requires a valid session cookie.
pub fn with_session(
    secret: Arc<Vec<u8>>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |session: Option<String>| {
        let secret = secret.clone();
        async move {
            let token = session.ok_or_else(|| {
                warp::reject::custom(RecipeError::Unauthorized("Missing session cookie"))
            })?;

            verify_jwt_session(&token, &secret)
                .map(SessionData::from)
                .map_err(warp::reject::custom)
        }
    })
}

/// Anonymous requests, and ones with a broken session, pass with `None`.
pub fn with_possible_session(
    secret: Arc<Vec<u8>>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |session: Option<String>| {
        session
            .and_then(|token| verify_jwt_session(&token, &secret).ok())
            .map(SessionData::from)
    })
}
