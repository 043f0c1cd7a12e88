//! Resource lifecycle error types

use crate::azure::ApiError;
use crate::pool::id::ParseIdError;
use crate::pool::model::UnknownVariant;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One problem found while checking configuration against the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration could not be decoded into the configuration tree
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{}", .0.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; "))]
    Schema(Vec<SchemaViolation>),

    #[error(transparent)]
    Shape(#[from] serde_json::Error),
}

/// The configuration tree could not be expressed as an API model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("invalid {field} provided: {value:?}")]
    UnknownKind { field: &'static str, value: String },

    #[error("{field}: {source}")]
    InvalidValue {
        field: &'static str,
        #[source]
        source: UnknownVariant,
    },

    #[error("`{field}` is not supported when {block} kind is {kind:?}")]
    UnsupportedField {
        block: &'static str,
        kind: &'static str,
        field: &'static str,
    },

    #[error("identity: {0}")]
    Identity(String),

    #[error("{field} is not valid JSON: {reason}")]
    InvalidJson { field: &'static str, reason: String },

    #[error("API model is missing `{0}`")]
    MissingField(&'static str),
}

/// Why the current remote state could not be fetched
#[derive(Error, Debug)]
pub enum RetrievalFailure {
    #[error("the pool no longer exists")]
    Missing,

    #[error("response contained no model")]
    MissingModel,

    #[error("model contained no `properties`")]
    MissingProperties,

    #[error(transparent)]
    Api(ApiError),
}

/// Errors returned to the host by the pool lifecycle
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("decoding configuration for {operation} of {id}: {source}")]
    Decoding {
        operation: &'static str,
        id: String,
        #[source]
        source: DecodeError,
    },

    #[error("checking for the presence of an existing {id}: {source}")]
    Lookup {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("retrieving {id}: {source}")]
    Retrieval {
        id: String,
        #[source]
        source: RetrievalFailure,
    },

    #[error("a resource with the ID {id:?} already exists - to be managed it needs to be imported into the state; see the documentation for {resource_type} for more information")]
    AlreadyExists { resource_type: String, id: String },

    #[error("mapping configuration of {id} to the API model: {source}")]
    Mapping {
        id: String,
        #[source]
        source: MappingError,
    },

    #[error("creating {id}: {source}")]
    Create {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("updating {id}: {source}")]
    Update {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("deleting {id}: {source}")]
    Delete {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("setting `{field}` for {id}: {reason}")]
    Setting {
        id: String,
        field: String,
        reason: String,
    },

    #[error("changing `{field}` of {id} requires replacing the resource")]
    RequiresReplacement { id: String, field: &'static str },

    #[error("resource has no ID in state")]
    MissingId,

    #[error("parsing resource ID: {0}")]
    InvalidId(#[from] ParseIdError),

    #[error("{operation} of {resource} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        resource: String,
        after: Duration,
    },
}

pub type Result<T> = std::result::Result<T, PoolError>;
