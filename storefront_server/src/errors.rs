use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use storefront_engine::{AuthApiError, PersistenceError, ReconciliationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The upstream payment gateway could not be reached. {0}")]
    UpstreamGatewayError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamGatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Client-facing rendering. 4xx responses carry the terse message; 5xx-class responses carry a generic body so
    /// no internal detail (connection strings, gateway responses) leaks to the caller.
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("💥️ {self}");
            "An internal error occurred.".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("The access token is invalid. {0}")]
    InvalidToken(String),
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::Validation(msg) => Self::ValidationError(msg),
            ReconciliationError::Configuration(msg) => Self::ConfigurationError(msg),
            ReconciliationError::UpstreamGateway(msg) => Self::UpstreamGatewayError(msg),
            ReconciliationError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            ReconciliationError::OrderModificationNoOp => {
                Self::ValidationError("The order already has that status.".to_string())
            },
            ReconciliationError::OrderModificationForbidden => {
                Self::ValidationError("That status change is not allowed.".to_string())
            },
            ReconciliationError::Persistence(e) => e.into(),
        }
    }
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::InvalidCredentials => Self::AuthenticationError(AuthError::InvalidCredentials),
            AuthApiError::EmailTaken(email) => {
                Self::ValidationError(format!("An account with email {email} already exists."))
            },
            AuthApiError::Validation(msg) => Self::ValidationError(msg),
            AuthApiError::Hashing(e) => Self::BackendError(format!("Password hashing error: {e}")),
            AuthApiError::Persistence(e) => e.into(),
        }
    }
}

impl From<crate::integrations::stripe::StripeApiError> for ServerError {
    fn from(e: crate::integrations::stripe::StripeApiError) -> Self {
        use crate::integrations::stripe::StripeApiError::*;
        match e {
            NotConfigured => Self::ConfigurationError("Stripe credentials are missing.".to_string()),
            Transport(msg) | Api(msg) | UnsupportedCurrency(msg) => Self::UpstreamGatewayError(msg),
            Serialization(msg) => Self::Unspecified(msg),
        }
    }
}

impl From<PersistenceError> for ServerError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            PersistenceError::ProductNotFound(id) => Self::NoRecordFound(format!("Product {id}")),
            PersistenceError::PaymentNotFound(id) => Self::NoRecordFound(format!("Payment {id}")),
            PersistenceError::DuplicateEmail(email) => {
                Self::ValidationError(format!("An account with email {email} already exists."))
            },
            other => Self::BackendError(other.to_string()),
        }
    }
}
