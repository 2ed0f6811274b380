//! Policy Gate - role-based authorization decisions
//!
//! Evaluates ordered, first-match-wins resource policies: given a principal's
//! roles, an action and a resource kind, answer allow or deny. Unknown
//! resources and unmatched requests are denied.

pub mod authz;
pub mod settings;
pub mod web;
