//! Authentication strategy layer: credential material, auth-kind
//! enumeration, and per-kind signing/refresh strategies.

pub mod credential;
pub mod embedded_session;
pub mod kind;
pub mod oauth_state;
pub mod strategy;
