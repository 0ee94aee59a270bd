//! HTTP inbound adapter exposing REST endpoints.

pub mod activation;
pub mod admin;
pub mod error;
pub mod health;
pub mod login;
pub mod state;
pub mod students;

pub use error::ApiResult;

use actix_web::web;

/// Register the onboarding endpoints on an `/api/v1` scope.
///
/// Health checks sit outside the versioned scope and are registered
/// separately.
pub fn api_scope() -> actix_web::Scope {
    web::scope("/api/v1")
        .service(students::register_student)
        .service(login::login)
        .service(activation::activate)
        .service(admin::reconcile)
}
