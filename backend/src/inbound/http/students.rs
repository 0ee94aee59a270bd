//! Student registration handler.
//!
//! ```text
//! POST /api/v1/students {"studentNumber":"2024-0001","name":"Alice Example",
//!                        "email":"alice@example.com","classCode":"CS101"}
//! ```

use actix_web::{HttpResponse, http::header, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::{CredentialDelivery, RegistrationReceipt, StudentRegistrationRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Registration form submitted by an operator.
///
/// Missing fields deserialise as blank and are rejected by the workflow.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    #[serde(default)]
    #[schema(example = "2024-0001")]
    pub student_number: String,
    #[serde(default)]
    #[schema(example = "Alice Example")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "CS101")]
    pub class_code: String,
}

impl From<RegisterStudentRequest> for StudentRegistrationRequest {
    fn from(value: RegisterStudentRequest) -> Self {
        Self {
            student_number: value.student_number,
            name: value.name,
            email: value.email,
            class_code: value.class_code,
        }
    }
}

/// How the onboarding credential reached the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryChannel {
    Emailed,
    DisplayToOperator,
}

/// Response body for a successful registration.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub class_code: String,
    pub email: String,
    pub credential_delivery: DeliveryChannel,
    /// Present only when delivery failed and the operator must pass the
    /// credential on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_credential: Option<String>,
}

impl From<RegistrationReceipt> for RegistrationResponse {
    fn from(receipt: RegistrationReceipt) -> Self {
        let (credential_delivery, temporary_credential) = match receipt.delivery {
            CredentialDelivery::Emailed => (DeliveryChannel::Emailed, None),
            CredentialDelivery::DisplayToOperator(credential) => (
                DeliveryChannel::DisplayToOperator,
                Some(credential.expose().to_owned()),
            ),
        };
        Self {
            class_code: receipt.class_code.to_string(),
            email: receipt.email.to_string(),
            credential_delivery,
            temporary_credential,
        }
    }
}

/// Register a student and issue their onboarding credential.
#[utoipa::path(
    post,
    path = "/api/v1/students",
    request_body = RegisterStudentRequest,
    responses(
        (
            status = 201,
            description = "Pending student record created",
            headers(("Cache-Control" = String, description = "Always no-store")),
            body = RegistrationResponse
        ),
        (status = 400, description = "Invalid form", body = Error),
        (status = 404, description = "Class code not found", body = Error),
        (status = 409, description = "Email or student number already registered", body = Error),
        (status = 503, description = "Student records unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["students"],
    operation_id = "registerStudent",
    security([])
)]
#[post("/students")]
pub async fn register_student(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterStudentRequest>,
) -> ApiResult<HttpResponse> {
    let receipt = state.registration.register(payload.into_inner().into()).await?;
    Ok(HttpResponse::Created()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(RegistrationResponse::from(receipt)))
}
