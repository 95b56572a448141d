use super::error::*;
use crate::application_port::{AuthService, AuthTokens, Identity, LoginInput, SignupInput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

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
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse;

pub async fn signup(
    body: SignupRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signup_input = SignupInput {
        username: body.username,
        password: body.password,
    };
    auth_service
        .signup(signup_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(SignupResponse)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub auth_tokens: AuthTokens,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        username: body.username.clone(),
        password: body.password,
    };
    let tokens = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let login_response = LoginResponse {
        username: body.username,
        auth_tokens: tokens,
    };
    Ok(warp::reply::json(&ApiResponse::ok(login_response)))
}

pub async fn refresh(
    refresh_token: String,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let grant = auth_service
        .refresh(&refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(grant)))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse;

pub async fn logout(
    session: Identity,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(&session)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(LogoutResponse)))
}
