use super::error::*;
use super::handler;
use crate::application_impl::AuthorizationGate;
use crate::domain_model::{AccessClaims, Role, UserId};
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;
const ADMINISTRATOR_ONLY: &[Role] = &[Role::Administrator];

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::path!("auth" / "refresh")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path!("auth" / "logout")
        .and(warp::post())
        .and(with_verification(server.authorization_gate.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_verification(server.authorization_gate.clone()))
        .and(with(server.user_lookup.clone()))
        .and_then(handler::me);

    let user = warp::path!("users" / UserId)
        .and(warp::get())
        .and(with_role(server.authorization_gate.clone(), ADMINISTRATOR_ONLY))
        .and(with(server.user_lookup.clone()))
        .and_then(handler::get_user);

    login.or(refresh).or(logout).or(me).or(user)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    gate: Arc<AuthorizationGate>,
) -> impl Filter<Extract = (AccessClaims,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let gate = gate.clone();
        async move {
            let claims = gate
                .authorize(header.as_deref())
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)?;
            Ok::<_, warp::Rejection>(claims)
        }
    })
}

fn with_role(
    gate: Arc<AuthorizationGate>,
    allowed: &'static [Role],
) -> impl Filter<Extract = (AccessClaims,), Error = warp::Rejection> + Clone {
    with_verification(gate).and_then(move |claims: AccessClaims| async move {
        AuthorizationGate::require_role(&claims, allowed)
            .map_err(ApiErrorCode::from)
            .map_err(reject::custom)?;
        Ok::<_, warp::Rejection>(claims)
    })
}
