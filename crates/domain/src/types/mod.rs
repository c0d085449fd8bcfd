//! Domain types and models

pub mod account;
pub mod batch;
pub mod http;
pub mod ids;
pub mod request;
pub mod search;

pub use account::{
    Account, Authorisation, Datacenter, PrivateAppIdentity, PublicAppIdentity, TokenKind, UserCredentials,
};
pub use batch::{
    AggregateOutcome, BatchOutcome, BatchRequest, ExecutionHint, FailPolicy, OperationOutcome,
    OperationResult,
};
pub use http::{RawRequest, RawResponse};
pub use ids::IdSet;
pub use request::{
    ExpectedShape, HttpMethod, ReadRequest, SearchRequest, ServiceName, SortDirection, Target,
    WriteOperation, WriteOperationBuilder,
};
pub use search::{SearchColumn, SearchMetadata, SearchPage};
