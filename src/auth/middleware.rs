use crate::auth::auth::AuthUser;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::{debug, warn};

/// Rejects requests without a valid access token and stashes the resolved
/// [`AuthUser`] in the request extensions for the handlers.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match AuthUser::from_headers(req.headers(), &config.jwt_secret) {
        Ok(user) => {
            debug!(user_id = user.user_id, username = %user.username, role = %user.role, "Authenticated request");
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(rejection) => {
            warn!(path = %req.path(), reason = %rejection, "Rejected unauthenticated request");
            let resp = rejection.error_response();
            Ok(req.into_response(resp))
        }
    }
}
