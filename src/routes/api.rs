//! Handlers built on the request context

use crate::auth::Role;
use crate::error::ApiResult;
use crate::request::RequestContext;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub success: bool,
    pub request_id: Uuid,
    pub authenticated: bool,
    pub subject: Option<Uuid>,
    pub role: Option<Role>,
    pub is_user: bool,
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct EchoRequest {
    #[validate(length(min = 3, max = 64, message = "Name must be between 3 and 64 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoResponse {
    pub success: bool,
    pub request_id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

/// GET /api/whoami
///
/// Describe the caller as the request context sees it. Public.
pub async fn whoami(ctx: RequestContext) -> Json<WhoAmIResponse> {
    let claims = ctx.claims();

    Json(WhoAmIResponse {
        success: true,
        request_id: ctx.id(),
        authenticated: ctx.authenticated(),
        subject: claims.map(|c| c.sub),
        role: claims.map(|c| c.role.clone()),
        is_user: ctx.is_user(),
        is_admin: ctx.is_admin(),
    })
}

/// GET /api/admin/ping
///
/// Admin only.
pub async fn admin_ping(ctx: RequestContext) -> ApiResult<Json<serde_json::Value>> {
    let claims = ctx.require_admin()?;
    ctx.logger().in_scope(|| info!(sub = %claims.sub, "admin ping"));

    Ok(Json(serde_json::json!({
        "success": true,
        "requestId": ctx.id(),
    })))
}

/// POST /api/echo
///
/// Decode and validate the body, then send it back.
pub async fn echo(ctx: RequestContext) -> ApiResult<Json<EchoResponse>> {
    let mut req = EchoRequest::default();
    ctx.decode_and_validate_body(&mut req).await?;

    Ok(Json(EchoResponse {
        success: true,
        request_id: ctx.id(),
        name: req.name,
        email: req.email,
    }))
}
