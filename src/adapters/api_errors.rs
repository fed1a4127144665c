use {
    crate::domain::error::ActivityError,
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde_json::{Map, Value, json},
};

/// Newtype over the domain error so the adapter layer owns HTTP mapping.
pub struct ApiError(pub ActivityError);

impl From<ActivityError> for ApiError {
    fn from(err: ActivityError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String, Map<String, Value>) {
        let mut extra = Map::new();
        let (status, code, message) = match &self.0 {
            ActivityError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            ActivityError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "not_found", self.0.to_string())
            }
            ActivityError::MissingActor => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "an authenticated actor is required".to_string(),
            ),
            ActivityError::SetupRequired { reason, script } => {
                extra.insert("script".into(), Value::String(script.clone()));
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "setup_required",
                    reason.clone(),
                )
            }
            ActivityError::StoreUnavailable(msg) => {
                tracing::warn!("store unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "storage is temporarily unavailable".to_string(),
                )
            }
            ActivityError::Database(err) => {
                tracing::error!("database error: {err}");
                internal()
            }
            ActivityError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                internal()
            }
            ActivityError::Config(msg) => {
                tracing::error!("config error: {msg}");
                internal()
            }
        };
        (status, code, message, extra)
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal error".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, extra) = self.parts();
        let mut body = json!({
            "error_code": error_code,
            "message": message,
        });
        if let Value::Object(map) = &mut body {
            map.extend(extra);
        }
        (status, Json(body)).into_response()
    }
}

/// Error on a read endpoint. Renders the error next to an empty result set
/// so clients can tell "no data" from "query failed".
pub struct ReadError(pub ActivityError);

impl From<ActivityError> for ReadError {
    fn from(err: ActivityError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ReadError {
    fn into_response(self) -> Response {
        let (status, error_code, message, _) = ApiError(self.0).parts();
        let body = json!({
            "error_code": error_code,
            "message": message,
            "records": [],
            "total": 0,
        });
        (status, Json(body)).into_response()
    }
}
