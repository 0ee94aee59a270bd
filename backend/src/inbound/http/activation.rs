//! First-login activation handler.
//!
//! ```text
//! POST /api/v1/activation {"email":"alice@example.com","temporaryPassword":"Ab3dEf9h",
//!                          "newPassword":"n3w-secret","confirmPassword":"n3w-secret"}
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::{ActivatedAccount, ActivationRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Activation request body. Missing fields deserialise as blank.
#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivationBody {
    #[serde(default)]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[serde(default)]
    pub temporary_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl From<ActivationBody> for ActivationRequest {
    fn from(body: ActivationBody) -> Self {
        Self::new(
            body.email,
            body.temporary_password,
            body.new_password,
            body.confirm_password,
        )
    }
}

/// Lifecycle status reported for an activated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum AccountStatus {
    Active,
}

/// Response body for a completed activation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivationResponse {
    pub uid: String,
    pub class_code: String,
    pub status: AccountStatus,
    /// True when an earlier attempt had already finished the promotion.
    pub already_active: bool,
}

impl From<ActivatedAccount> for ActivationResponse {
    fn from(account: ActivatedAccount) -> Self {
        Self {
            uid: account.uid.to_string(),
            class_code: account.class_code.to_string(),
            status: AccountStatus::Active,
            already_active: account.already_active,
        }
    }
}

/// Replace the onboarding credential with a permanent one and activate the
/// account.
#[utoipa::path(
    post,
    path = "/api/v1/activation",
    request_body = ActivationBody,
    responses(
        (status = 200, description = "Account active", body = ActivationResponse),
        (status = 400, description = "Invalid or weak credential", body = Error),
        (status = 401, description = "Incorrect temporary password", body = Error),
        (status = 403, description = "No onboarding credential issued", body = Error),
        (status = 404, description = "No pending account for this email", body = Error),
        (status = 409, description = "Account already active or changed concurrently", body = Error),
        (status = 503, description = "Student records unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["sessions"],
    operation_id = "activateAccount",
    security([])
)]
#[post("/activation")]
pub async fn activate(
    state: web::Data<HttpState>,
    payload: web::Json<ActivationBody>,
) -> ApiResult<HttpResponse> {
    let account = state.activation.activate(payload.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(ActivationResponse::from(account)))
}
