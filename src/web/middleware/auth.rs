//! Bearer-token authentication middleware and identity extractors.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{
        header::{AUTHORIZATION, VARY},
        request::Parts,
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{self, AccessError, Identity};
use crate::db::User;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

fn vary_on_authorization(response: &mut Response) {
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
}

/// Resolve the caller of every request.
///
/// Requests without an `Authorization` header continue as
/// [`Identity::Anonymous`]; a header that does not resolve ends the request
/// with 401. The resolved identity is stored in the request extensions.
/// Every response varies on `Authorization`.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_string()),
            Err(_) => {
                let mut response = ApiError::from(AccessError::InvalidToken).into_response();
                vary_on_authorization(&mut response);
                return response;
            }
        },
    };

    let identity = match auth::authenticate(&state.db, header.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => {
            let mut response = ApiError::from(e).into_response();
            vary_on_authorization(&mut response);
            return response;
        }
    };

    req.extensions_mut().insert(identity);
    let mut response = next.run(req).await;
    vary_on_authorization(&mut response);
    response
}

/// Extractor for the caller's identity, anonymous or not.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentIdentity(
            parts
                .extensions
                .get::<Identity>()
                .cloned()
                .unwrap_or(Identity::Anonymous),
        ))
    }
}

/// Extractor for authenticated users.
///
/// Rejects anonymous callers with 401. Routes using it normally sit behind
/// a gate, which has already rejected them.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(parts, state).await?;
        match identity {
            Identity::User(user) => Ok(CurrentUser(user)),
            Identity::Anonymous => Err(AccessError::AuthenticationRequired.into()),
        }
    }
}
