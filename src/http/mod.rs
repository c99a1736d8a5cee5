//! HTTP 客户端封装

pub mod client;
pub mod handler;
pub mod request;

pub use client::{DefaultHeaders, RequestService, REQUEST_ID_HEADER};
pub use handler::{
    ApiResponse, DefaultHandler, RequestContext, RequestFailure, ResponseHandler,
};
pub use request::{ApiRequest, Payload};
