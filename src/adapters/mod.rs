pub mod api_errors;
pub mod context;
pub mod http;
