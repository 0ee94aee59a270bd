//! Operator maintenance handlers.
//!
//! ```text
//! POST /api/v1/admin/reconcile
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::{ReconciliationReport, RepairedActivation};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// One pending record removed during reconciliation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairedActivationDto {
    pub class_code: String,
    pub email: String,
    pub uid: String,
}

impl From<RepairedActivation> for RepairedActivationDto {
    fn from(value: RepairedActivation) -> Self {
        Self {
            class_code: value.class_code.to_string(),
            email: value.email.to_string(),
            uid: value.uid.to_string(),
        }
    }
}

/// Response body for `POST /api/v1/admin/reconcile`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    pub repaired: Vec<RepairedActivationDto>,
}

impl From<ReconciliationReport> for ReconciliationResponse {
    fn from(report: ReconciliationReport) -> Self {
        Self {
            repaired: report.repaired.into_iter().map(Into::into).collect(),
        }
    }
}

/// Remove pending records left behind by interrupted activations.
#[utoipa::path(
    post,
    path = "/api/v1/admin/reconcile",
    responses(
        (status = 200, description = "Reconciliation finished", body = ReconciliationResponse),
        (status = 503, description = "Student records unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["admin"],
    operation_id = "reconcileActivations"
)]
#[post("/admin/reconcile")]
pub async fn reconcile(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let report = state.activation.reconcile().await?;
    Ok(HttpResponse::Ok().json(ReconciliationResponse::from(report)))
}
