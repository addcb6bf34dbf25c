use axum::http::{self, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation, TokenData};

// Get the auth token from request headers: Authorization bearer first,
// then the auth_token cookie
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().ok()?;
        return Some(
            auth_str
                .strip_prefix("Bearer ")
                .unwrap_or(auth_str)
                .to_string(),
        );
    }

    let cookie_header = headers.get(http::header::COOKIE)?.to_str().ok()?;
    for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
        if cookie.name() == "auth_token" {
            return Some(cookie.value().to_string());
        }
    }
    None
}

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    token_from_headers(req.headers())
        .ok_or_else(|| "Missing Authorization header or auth_token cookie".to_string())
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

// Extract the user identity from validated claims. Platform tokens carry
// `sub`; tokens minted by the legacy auth routes carry `user_id`.
pub fn claims_user_id(token_data: &TokenData<serde_json::Value>) -> Option<String> {
    token_data
        .claims
        .get("sub")
        .or_else(|| token_data.claims.get("user_id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

// Role claims as principals ("r/{role}")
pub fn claims_role_prpls(token_data: &TokenData<serde_json::Value>) -> Vec<String> {
    match token_data.claims.get("roles").and_then(|v| v.as_array()) {
        Some(roles_array) => roles_array
            .iter()
            .filter_map(|r| r.as_str().map(|s| format!("r/{}", s)))
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn validates_and_extracts_sub_claim() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = mint(
            serde_json::json!({"sub": "u1", "roles": ["Admin"], "exp": exp}),
            "s3cret",
        );
        let data = validate_jwt(&token, "s3cret").unwrap();
        assert_eq!(claims_user_id(&data).unwrap(), "u1");
        assert_eq!(claims_role_prpls(&data), vec!["r/Admin".to_string()]);
    }

    #[test]
    fn falls_back_to_user_id_claim() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = mint(
            serde_json::json!({"user_id": "u2", "email": "u2@example.com", "exp": exp}),
            "s3cret",
        );
        let data = validate_jwt(&token, "s3cret").unwrap();
        assert_eq!(claims_user_id(&data).unwrap(), "u2");
    }

    #[test]
    fn rejects_wrong_secret() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = mint(serde_json::json!({"sub": "u1", "exp": exp}), "s3cret");
        assert!(validate_jwt(&token, "other").is_err());
    }
}
