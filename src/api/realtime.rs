use crate::auth::auth::AuthUser;
use crate::model::role::Role;
use crate::realtime::{ConnectionId, Notifier, NotifierError, stream};
use actix_web::http::StatusCode;
use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::{HttpResponse, Responder, ResponseError, web};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use utoipa::ToSchema;

pub const CONNECTION_ID_HEADER: &str = "X-Connection-Id";

impl ResponseError for NotifierError {
    fn status_code(&self) -> StatusCode {
        match self {
            NotifierError::UnknownConnection(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct JoinSubjectPayload {
    #[schema(example = 1000)]
    /// Employee whose personal group to join; defaults to the caller's own profile
    pub subject_id: Option<u64>,
}

/// Opens a server-sent event stream
///
/// The stream sits behind the Bearer `Authorization` header like every other `/api` route.
/// Browser `EventSource` cannot set that header, so clients read the stream with a
/// fetch-based SSE reader that sends it.
#[utoipa::path(
    get,
    path = "/api/realtime/stream",
    responses(
        (status = 200, description = "text/event-stream; the first event is `connected` and carries the connection id"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Realtime"
)]
#[instrument(name = "api_realtime_stream", skip_all, fields(user_id = auth.user_id))]
pub async fn open_stream(auth: AuthUser, notifier: web::Data<Notifier>) -> impl Responder {
    let (id, body) = stream::open(notifier.into_inner());

    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header((CONNECTION_ID_HEADER, id.to_string()))
        .streaming(body)
}

/// Adds a connection to the admin group
#[utoipa::path(
    post,
    path = "/api/realtime/{connection_id}/admin",
    params(
        ("connection_id" = String, Path, description = "Id announced by the `connected` event")
    ),
    responses(
        (status = 200, description = "Joined the admin group"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown connection")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Realtime"
)]
pub async fn join_admin(
    auth: AuthUser,
    notifier: web::Data<Notifier>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = ConnectionId::from(path.into_inner());
    notifier.join_admin_group(&id, &auth.viewer())?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Successfully joined admin room"
    })))
}

/// Removes a connection from the admin group
#[utoipa::path(
    delete,
    path = "/api/realtime/{connection_id}/admin",
    params(
        ("connection_id" = String, Path, description = "Id announced by the `connected` event")
    ),
    responses(
        (status = 200, description = "Left the admin group"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown connection")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Realtime"
)]
pub async fn leave_admin(
    _auth: AuthUser,
    notifier: web::Data<Notifier>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let id = ConnectionId::from(path.into_inner());
    notifier.leave_admin_group(&id)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Left admin room"
    })))
}

/// Adds a connection to an employee's personal group
#[utoipa::path(
    post,
    path = "/api/realtime/{connection_id}/subject",
    params(
        ("connection_id" = String, Path, description = "Id announced by the `connected` event")
    ),
    request_body(
        content = JoinSubjectPayload,
        description = "Admins may name any employee; employees may only join their own group",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Joined the personal group"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown connection")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Realtime"
)]
pub async fn join_subject(
    auth: AuthUser,
    notifier: web::Data<Notifier>,
    path: web::Path<String>,
    payload: Option<web::Json<JoinSubjectPayload>>,
) -> actix_web::Result<impl Responder> {
    let requested = payload.and_then(|p| p.into_inner().subject_id);

    let subject_id = match (requested, auth.role) {
        (Some(subject_id), Role::Admin) => subject_id,
        (Some(subject_id), _) if Some(subject_id) == auth.employee_id => subject_id,
        (Some(_), _) => {
            return Err(actix_web::error::ErrorForbidden(
                "Employees can only join their own group",
            ));
        }
        (None, _) => auth.subject()?.subject_id,
    };

    let id = ConnectionId::from(path.into_inner());
    notifier.join_subject_group(&id, subject_id)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Successfully connected",
        "data": { "employee_id": subject_id }
    })))
}
