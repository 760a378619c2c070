//! Command implementations for the `cub` CLI.
//!
//! - `credentials` - Interactive setup and removal of the session key and org ID
//! - `status` - One-shot status rendering (`status`, `refresh`)

pub(crate) mod credentials;
pub(crate) mod status;

pub(crate) use credentials::*;
pub(crate) use status::*;
