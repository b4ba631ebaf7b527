//! Client for the Titan API.

mod client;

pub use client::{
    ErrorBody, HealthResponse, LoginResponse, SdkError, SessionResponse, StatusResponse,
    TitanClient,
};
