use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::identity::SubjectIdentity;
use crate::model::role::Role;
use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError, dev::Payload, web::Data,
};
use futures::future::{Ready, ready};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub display_name: String,
    pub department: Option<String>,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

/// Why a request could not be tied to a user. Always answered with 401.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Invalid Authorization header encoding")]
    BadEncoding,

    #[error("Authorization header must start with Bearer")]
    NotBearer,

    #[error("Invalid or expired token")]
    InvalidToken(String),

    #[error("Invalid role")]
    UnknownRole(u8),
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AuthRejection::InvalidToken(details) => {
                json!({ "error": self.to_string(), "details": details })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::Unauthorized().json(body)
    }
}

impl AuthUser {
    /// Resolves the bearer token in `headers` against `secret`.
    pub fn from_headers(headers: &HeaderMap, secret: &str) -> Result<Self, AuthRejection> {
        let header = headers
            .get(AUTHORIZATION)
            .ok_or(AuthRejection::MissingHeader)?
            .to_str()
            .map_err(|_| AuthRejection::BadEncoding)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthRejection::NotBearer)?;

        let claims = verify_token(token, secret).map_err(AuthRejection::InvalidToken)?;
        let role = Role::from_id(claims.role).ok_or(AuthRejection::UnknownRole(claims.role))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            display_name: claims.name,
            department: claims.department,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    /// The attendance subject behind this caller. Accounts without an employee
    /// profile cannot punch in or out.
    pub fn subject(&self) -> actix_web::Result<SubjectIdentity> {
        let subject_id = self
            .employee_id
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;
        Ok(self.identity_as(subject_id))
    }

    /// Identity for dashboard viewers, who may not have an employee profile.
    pub fn viewer(&self) -> SubjectIdentity {
        self.identity_as(self.employee_id.unwrap_or(self.user_id))
    }

    fn identity_as(&self, subject_id: u64) -> SubjectIdentity {
        SubjectIdentity {
            subject_id,
            display_name: self.display_name.clone(),
            department: self.department.clone(),
            role: self.role,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already verified by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(actix_web::error::ErrorInternalServerError(
                "Config missing",
            )));
        };

        ready(AuthUser::from_headers(req.headers(), &config.jwt_secret).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(
            AuthUser::from_headers(&HeaderMap::new(), "s").unwrap_err(),
            AuthRejection::MissingHeader
        );
        assert_eq!(
            AuthUser::from_headers(&headers("Token abc"), "s").unwrap_err(),
            AuthRejection::NotBearer
        );
        assert!(matches!(
            AuthUser::from_headers(&headers("Bearer not-a-jwt"), "s").unwrap_err(),
            AuthRejection::InvalidToken(_)
        ));
    }

    #[test]
    fn viewer_falls_back_to_user_id() {
        let admin = AuthUser {
            user_id: 1,
            username: "grace".into(),
            display_name: "Grace".into(),
            department: None,
            role: Role::Admin,
            employee_id: None,
        };
        assert!(admin.subject().is_err());
        assert_eq!(admin.viewer().subject_id, 1);
        assert!(admin.require_admin().is_ok());
    }
}
