//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the onboarding endpoints, the health checks and the
//! shared error envelope. The document backs Swagger UI in debug builds and
//! is printed by the `openapi-dump` binary.

use utoipa::OpenApi;

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::activation::{AccountStatus, ActivationBody, ActivationResponse};
use crate::inbound::http::admin::{ReconciliationResponse, RepairedActivationDto};
use crate::inbound::http::login::{LoginRequest, LoginResponse};
use crate::inbound::http::students::{
    DeliveryChannel, RegisterStudentRequest, RegistrationResponse,
};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Classroom onboarding API",
        description = "Student registration, first-login activation and health checks."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::students::register_student,
        crate::inbound::http::login::login,
        crate::inbound::http::activation::activate,
        crate::inbound::http::admin::reconcile,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        RegisterStudentRequest,
        RegistrationResponse,
        DeliveryChannel,
        LoginRequest,
        LoginResponse,
        ActivationBody,
        ActivationResponse,
        AccountStatus,
        ReconciliationResponse,
        RepairedActivationDto,
        Error,
        ErrorCode
    )),
    tags(
        (name = "students", description = "Operator registration of students"),
        (name = "sessions", description = "Sign-in and first-login activation"),
        (name = "admin", description = "Operator maintenance"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
