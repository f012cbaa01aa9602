use super::error::*;
use crate::application_port::{AuthError, AuthService, LoginInput};
use crate::domain_model::{AccessClaims, UserId};
use crate::domain_port::UserLookup;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reject;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let tokens = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

pub async fn logout(
    claims: AccessClaims,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(&claims)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(())))
}

pub async fn me(
    claims: AccessClaims,
    user_lookup: Arc<dyn UserLookup>,
) -> Result<impl warp::Reply, warp::Rejection> {
    get_user(claims.sub, claims, user_lookup).await
}

pub async fn get_user(
    user_id: UserId,
    _claims: AccessClaims,
    user_lookup: Arc<dyn UserLookup>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = user_lookup
        .find_by_id(user_id)
        .await
        .map_err(AuthError::from)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?
        .ok_or(ApiErrorCode::NotFound)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(user)))
}
