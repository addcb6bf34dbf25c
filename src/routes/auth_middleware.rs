use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};
use crate::config;
use crate::realtime::userctx;
use crate::services::auth_service::{claims_role_prpls, claims_user_id, get_auth_token, validate_jwt};

pub async fn auth_middleware(
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {

    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };

    // 2. Validate the token
    let config = config::get_config();
    let secret = match &config.cloud_auth_jwt_secret {
        Some(secret) => secret,
        None => {
            error!("Cloud auth JWT secret not configured");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    let token_data = match validate_jwt(&token, secret) {
        Ok(token_data) => token_data,
        Err(e) => {
            debug!("JWT validation failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 3. Extract the user identity
    let user_uid = match claims_user_id(&token_data) {
        Some(uid) => uid,
        None => {
            debug!("JWT token carries no user identity claim");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 4. Principals: directory context best-effort, plus role claims
    let mut prpls = match userctx::get_or_fetch_user_ctx_async(&user_uid).await {
        Ok(ctx) => ctx.principals,
        Err(e) => {
            debug!("No directory context for {}: {}", user_uid, e);
            Vec::new()
        }
    };
    for role_prpl in claims_role_prpls(&token_data) {
        if !prpls.contains(&role_prpl) {
            prpls.push(role_prpl);
        }
    }

    // 5. Set identity and principals into request extensions for
    // downstream handlers
    {
        let extensions = req.extensions_mut();
        extensions.insert(prpls);
        extensions.insert(user_uid);
    }

    // Token is valid, proceed to next middleware/handler
    Ok(next.run(req).await)
}
