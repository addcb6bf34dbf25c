use moka::sync::Cache;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

use crate::clients::app_service_client;

/// Directory context for a user: display name plus access principals
#[derive(Clone, Debug)]
pub struct UserCtx {
    pub name: String,
    pub principals: Vec<String>,
}

static USER_CTX_CACHE: OnceLock<Cache<String, UserCtx>> = OnceLock::new();

/// Warm up the user context cache at startup
pub fn init_user_ctx_cache() {
    get_user_ctx_cache();
    info!("User context cache initialized");
}

pub fn get_user_ctx_cache() -> &'static Cache<String, UserCtx> {
    USER_CTX_CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(Duration::from_secs(5 * 60))
            .build()
    })
}

async fn fetch_user_ctx_from_service(uid: &str) -> Result<UserCtx, String> {
    let client = app_service_client::get_app_service_client()
        .ok_or_else(|| "App service client not initialized".to_string())?;

    let profile = client.get_profile(uid).await.map_err(|e| {
        debug!("Failed to retrieve profile for user {}: {}", uid, e);
        format!("Failed to retrieve profile: {}", e)
    })?;

    Ok(UserCtx {
        name: profile.name.unwrap_or_else(|| uid.to_string()),
        principals: profile.prpls,
    })
}

pub async fn get_or_fetch_user_ctx_async(uid: &str) -> Result<UserCtx, String> {
    let cache = get_user_ctx_cache();

    if let Some(ctx) = cache.get(uid) {
        return Ok(ctx);
    }

    debug!("User context cache miss for uid {}. Refreshing from app service.", uid);
    let fetched_ctx = fetch_user_ctx_from_service(uid).await?;

    cache.insert(uid.to_string(), fetched_ctx.clone());
    Ok(fetched_ctx)
}

/// Display name for a user, falling back to the raw identity when the
/// directory is unavailable. Presence payloads must never fail on a
/// directory outage.
pub async fn display_name(uid: &str) -> String {
    match get_or_fetch_user_ctx_async(uid).await {
        Ok(ctx) => ctx.name,
        Err(_) => uid.to_string(),
    }
}
