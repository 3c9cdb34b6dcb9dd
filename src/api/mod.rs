//! Platform API Layer
//!
//! The request wrapper over the platform REST API and its wire types.
//! All traffic goes through [`ApiClient`], which owns bearer-token
//! attachment and the single refresh-and-retry recovery path.

pub mod client;
pub mod dto;
pub mod error;

pub use client::{
    decode, ApiClient, ApiClientConfig, FilePayload, RequestBody, RequestOptions, LOGIN_PATH,
    REFRESH_PATH,
};
pub use error::{ApiError, ApiResult};
