//! Shared message model and error definitions used across switchboard crates.
//!
//! The types here are what the schema validation engine inspects: endpoints,
//! content-type tags and typed property values. Message bodies are opaque
//! here; providers encode them.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    types::{
        DataType, DataValue, Endpoint, EndpointType, Message, MessageContent, MessageContentType,
    },
};
