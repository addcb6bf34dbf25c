use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// List the authenticated user's notifications
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    responses(
        (status = 200, description = "Notification feed in insertion order", body = NotificationListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_notifications_doc() {}

/// Mark a notification as read
#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "Notification not in the caller's feed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn mark_notification_read_doc() {}

/// Delete a notification permanently
#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{id}",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Notification not in the caller's feed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn delete_notification_doc() {}

/// Current collaborators on a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/presence",
    params(("project_id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Live presence for the project", body = PresenceResponse)
    )
)]
#[allow(dead_code)]
pub async fn project_presence_doc() {}

/// Operational statistics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Realtime service diagnostics", body = DiagnosticsResponse),
        (status = 403, description = "Cloud Admin access required", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        list_notifications_doc,
        mark_notification_read_doc,
        delete_notification_doc,
        project_presence_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            Notification,
            NotificationListResponse,
            CollaboratorEntry,
            PresenceResponse,
            DiagnosticsResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "api", description = "Realtime service API")
    )
)]
pub struct ApiDoc;
