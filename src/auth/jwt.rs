use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Tokens are minted by the identity service; this side only verifies them.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("refresh tokens cannot be used for API access".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn token(token_type: TokenType, exp_offset: i64, secret: &str) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            user_id: 1,
            sub: "ada".into(),
            name: "Ada Lovelace".into(),
            department: None,
            role: 2,
            exp: (now + exp_offset) as usize,
            jti: "t".into(),
            token_type,
            employee_id: Some(11),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_access_token() {
        let claims = verify_token(&token(TokenType::Access, 600, "s3cret"), "s3cret").unwrap();
        assert_eq!(claims.employee_id, Some(11));
        assert_eq!(claims.name, "Ada Lovelace");
    }

    #[test]
    fn rejects_wrong_secret_expired_and_refresh_tokens() {
        assert!(verify_token(&token(TokenType::Access, 600, "other"), "s3cret").is_err());
        assert!(verify_token(&token(TokenType::Access, -600, "s3cret"), "s3cret").is_err());
        assert!(verify_token(&token(TokenType::Refresh, 600, "s3cret"), "s3cret").is_err());
    }
}
