pub mod access_scope;
pub mod activity;
pub mod admin;
pub mod emitter;
pub mod fallback;
pub mod provisioning;
pub mod stats;
pub mod suspension_gate;
