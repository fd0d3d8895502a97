//! Middleware applied to every node request.

pub mod activity;
pub mod https_redirect;

pub use activity::track_activity;
pub use https_redirect::https_redirect;
