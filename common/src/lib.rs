//! Application route definitions shared by the gateway and its front ends.
//!
//! This crate has no dependencies. It knows every named route of the
//! application, the metadata attached to each one, and the guard that
//! decides whether a navigation may proceed for the current session.

pub mod routes;

pub use routes::{
    guard, AppRoute, GuardDecision, RouteMeta, ADMIN_ROLE, INDEX_ROUTE, LOGIN_PATH, LOGIN_ROUTE,
};
