use super::error::*;
use super::handler;
use crate::application_port::{AuthService, Identity};
use crate::domain_model::TokenKind;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::post()
        .and(warp::path("signup"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    // Refresh goes through the same admit path as any protected route; the
    // service itself requires the presented credential to be a refresh one.
    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(bearer_token())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    signup.or(login).or(refresh).or(logout)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn bearer_token() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(
        |header: String| async move {
            match header.strip_prefix("Bearer ") {
                Some(token) => Ok(token.to_string()),
                None => Err(reject::custom(ApiErrorCode::InvalidToken)),
            }
        },
    )
}

/// Gate for protected routes: admit the bearer credential, then require it to
/// be an access credential. Refresh credentials only open the refresh route.
fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (Identity,), Error = warp::Rejection> + Clone {
    bearer_token().and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            let session = auth_service
                .admit(&token)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)?;
            if session.kind != TokenKind::Access {
                return Err(reject::custom(ApiErrorCode::InvalidToken));
            }
            Ok(session)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Http, Log, Settings, Store, Token, User};
    use serde_json::Value;

    fn memory_settings() -> Settings {
        Settings {
            http: Http {
                cert_path: "unused".to_string(),
                key_path: "unused".to_string(),
                address: "127.0.0.1:0".to_string(),
            },
            log: Log {
                filter: "info".to_string(),
            },
            store: Store {
                backend: "memory".to_string(),
            },
            token: Token {
                issuer: "gatehouse.test".to_string(),
                audience: "api-client".to_string(),
                access_ttl_secs: 900,
                refresh_ttl_secs: 2_592_000,
            },
            user: User {
                backend: "memory".to_string(),
            },
        }
    }

    async fn test_server() -> Arc<Server> {
        Arc::new(Server::try_new(&memory_settings()).await.unwrap())
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn signup_login_logout_flow() {
        let api = routes(test_server().await).recover(recover_error);
        let credentials = serde_json::json!({
            "username": "alice.liddell",
            "password": "correct-horse",
        });

        let res = warp::test::request()
            .method("POST")
            .path("/signup")
            .json(&credentials)
            .reply(&api)
            .await;
        assert!(body_json(res.body())["success"].as_bool().unwrap());

        let res = warp::test::request()
            .method("POST")
            .path("/login")
            .json(&credentials)
            .reply(&api)
            .await;
        let body = body_json(res.body());
        assert!(body["success"].as_bool().unwrap());
        let access = body["data"]["auth_tokens"]["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        let res = warp::test::request()
            .method("POST")
            .path("/logout")
            .header("authorization", format!("Bearer {access}"))
            .reply(&api)
            .await;
        assert!(body_json(res.body())["success"].as_bool().unwrap());

        // The revoked credential no longer opens the gate.
        let res = warp::test::request()
            .method("POST")
            .path("/logout")
            .header("authorization", format!("Bearer {access}"))
            .reply(&api)
            .await;
        let body = body_json(res.body());
        assert!(!body["success"].as_bool().unwrap());
        assert_eq!(body["error"]["code"], "InvalidToken");
    }

    #[tokio::test]
    async fn refresh_requires_a_refresh_credential() {
        let api = routes(test_server().await).recover(recover_error);
        let credentials = serde_json::json!({
            "username": "alice.liddell",
            "password": "correct-horse",
        });

        warp::test::request()
            .method("POST")
            .path("/signup")
            .json(&credentials)
            .reply(&api)
            .await;
        let res = warp::test::request()
            .method("POST")
            .path("/login")
            .json(&credentials)
            .reply(&api)
            .await;
        let body = body_json(res.body());
        let tokens = &body["data"]["auth_tokens"];
        let access = tokens["access_token"].as_str().unwrap().to_string();
        let refresh = tokens["refresh_token"].as_str().unwrap().to_string();

        let res = warp::test::request()
            .method("POST")
            .path("/refresh")
            .header("authorization", format!("Bearer {refresh}"))
            .reply(&api)
            .await;
        let body = body_json(res.body());
        assert!(body["success"].as_bool().unwrap());
        assert!(body["data"]["access_token"].as_str().is_some());

        let res = warp::test::request()
            .method("POST")
            .path("/refresh")
            .header("authorization", format!("Bearer {access}"))
            .reply(&api)
            .await;
        let body = body_json(res.body());
        assert!(!body["success"].as_bool().unwrap());
        assert_eq!(body["error"]["code"], "InvalidToken");
    }

    #[tokio::test]
    async fn login_with_unknown_user_is_rejected() {
        let api = routes(test_server().await).recover(recover_error);

        let res = warp::test::request()
            .method("POST")
            .path("/login")
            .json(&serde_json::json!({
                "username": "nobody.here",
                "password": "whatever-pass",
            }))
            .reply(&api)
            .await;
        let body = body_json(res.body());
        assert!(!body["success"].as_bool().unwrap());
        assert_eq!(body["error"]["code"], "InvalidCredentials");
    }

    #[tokio::test]
    async fn missing_bearer_prefix_is_rejected() {
        let api = routes(test_server().await).recover(recover_error);

        let res = warp::test::request()
            .method("POST")
            .path("/logout")
            .header("authorization", "not-a-bearer-header")
            .reply(&api)
            .await;
        let body = body_json(res.body());
        assert!(!body["success"].as_bool().unwrap());
        assert_eq!(body["error"]["code"], "InvalidToken");
    }
}
