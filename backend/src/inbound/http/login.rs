//! Student sign-in handler.
//!
//! ```text
//! POST /api/v1/login {"email":"alice@example.com","password":"Ab3dEf9h"}
//! ```
//!
//! A permanent credential yields `authenticated`; a valid onboarding
//! credential yields `activationRequired` and the client moves on to
//! `POST /api/v1/activation`.

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::LoginOutcome;
use crate::domain::{Error, LoginCredentials, LoginValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Login request body for `POST /api/v1/login`.
#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.email, &value.password)
    }
}

/// Result of a sign-in attempt, tagged by `status`.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LoginResponse {
    /// The student holds an active account.
    #[serde(rename_all = "camelCase")]
    Authenticated { uid: String, class_code: String },
    /// The onboarding credential was accepted; a permanent one must be set.
    #[serde(rename_all = "camelCase")]
    ActivationRequired { class_code: String },
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated { uid, class_code } => Self::Authenticated {
                uid: uid.to_string(),
                class_code: class_code.to_string(),
            },
            LoginOutcome::ActivationRequired { class_code } => Self::ActivationRequired {
                class_code: class_code.to_string(),
            },
        }
    }
}

fn map_login_validation_error(err: &LoginValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({ "code": err.code() }))
}

/// Sign a student in, or report that first-login activation is required.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated or activation required", body = LoginResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 403, description = "Account disabled or not a student", body = Error),
        (status = 404, description = "No account for this email", body = Error),
        (status = 429, description = "Too many failed attempts", body = Error),
        (status = 503, description = "Student records unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["sessions"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = LoginCredentials::try_from(payload.into_inner())
        .map_err(|err| map_login_validation_error(&err))?;
    let outcome = state.login.sign_in(&credentials).await?;
    Ok(HttpResponse::Ok().json(LoginResponse::from(outcome)))
}
