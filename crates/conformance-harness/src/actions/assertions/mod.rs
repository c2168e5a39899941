pub mod auth;
pub mod counts;
pub mod events;
pub mod headers;
pub mod identifiers;
pub mod marker;
pub mod retry;
