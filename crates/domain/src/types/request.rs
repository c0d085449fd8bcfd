//! Read, search and write request descriptors

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{AccountLinkError, Result};
use crate::impl_domain_status_conversions;
use crate::types::ids::IdSet;

/// HTTP method of a service call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl_domain_status_conversions!(HttpMethod {
    Get => "get",
    Post => "post",
    Put => "put",
    Delete => "delete",
    Options => "options",
});

impl HttpMethod {
    /// Whether a caller-supplied entity is sent as the request body
    pub const fn carries_entity(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

/// Path segment naming a remote service, e.g. `order-service`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(path: &str) -> Result<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(AccountLinkError::InvalidInput("Service path must be provided".into()));
        }
        if !path.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(AccountLinkError::InvalidInput(format!(
                "Service '{path}' must contain alphanumeric characters, hyphen and underscore only"
            )));
        }
        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ServiceName {
    type Error = AccountLinkError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<ServiceName> for String {
    fn from(value: ServiceName) -> Self {
        value.0
    }
}

/// JSON shape a successful response is expected to have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedShape {
    /// No response body is expected; any body is ignored
    #[default]
    Void,
    Any,
    Object,
    Array,
    String,
    Number,
    Boolean,
}

impl ExpectedShape {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Void | Self::Any => true,
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// Service, path and query parameters of a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub method: HttpMethod,
    pub service: ServiceName,
    /// Relative path inside the service, without a leading slash
    pub path: String,
    pub params: BTreeMap<String, String>,
}

impl Target {
    fn new(method: HttpMethod, service: ServiceName, path: &str) -> Result<Self> {
        let path = path.trim().trim_start_matches('/');
        if path.is_empty() {
            return Err(AccountLinkError::InvalidInput("Path must be a non-empty string".into()));
        }
        Ok(Self { method, service, path: path.to_string(), params: BTreeMap::new() })
    }

    fn add_param(&mut self, name: &str, value: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AccountLinkError::InvalidInput("Param name must be a non-empty string".into()));
        }
        self.params.insert(name.to_string(), value.trim().to_string());
        Ok(())
    }
}

/// A GET of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub target: Target,
    pub expect: ExpectedShape,
}

impl ReadRequest {
    pub fn new(service: ServiceName, path: &str) -> Result<Self> {
        Ok(Self { target: Target::new(HttpMethod::Get, service, path)?, expect: ExpectedShape::Any })
    }

    pub fn param(mut self, name: &str, value: &str) -> Result<Self> {
        self.target.add_param(name, value)?;
        Ok(self)
    }

    pub fn expect(mut self, shape: ExpectedShape) -> Self {
        self.expect = shape;
        self
    }

    /// Append `ids` in range notation as the last path segment, e.g.
    /// `product/1-5,7`
    pub fn ids(mut self, ids: &IdSet) -> Result<Self> {
        if ids.is_empty() {
            return Err(AccountLinkError::InvalidInput("Id set must not be empty".into()));
        }
        self.target.path = format!("{}/{ids}", self.target.path.trim_end_matches('/'));
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl_domain_status_conversions!(SortDirection {
    Asc => "asc",
    Desc => "desc",
});

/// A GET against a search resource
///
/// Filters, columns, sorting and paging are folded into query parameters
/// when the request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    service: ServiceName,
    path: String,
    filters: Vec<(String, String)>,
    columns: Vec<String>,
    sorts: Vec<(String, SortDirection)>,
    page_size: Option<u32>,
    first_result: Option<u32>,
}

impl SearchRequest {
    pub const COLUMNS_PARAM: &'static str = "columns";
    pub const PAGE_SIZE_PARAM: &'static str = "pageSize";
    pub const FIRST_RESULT_PARAM: &'static str = "firstResult";
    pub const SORT_PARAM: &'static str = "sort";

    pub fn new(service: ServiceName, path: &str) -> Self {
        Self {
            service,
            path: path.trim().to_string(),
            filters: Vec::new(),
            columns: Vec::new(),
            sorts: Vec::new(),
            page_size: None,
            first_result: None,
        }
    }

    pub fn filter(mut self, column: &str, value: &str) -> Self {
        self.filters.retain(|(existing, _)| existing != column);
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn column(mut self, column: &str) -> Self {
        if !column.trim().is_empty() {
            self.columns.push(column.trim().to_string());
        }
        self
    }

    pub fn sort(mut self, column: &str, direction: SortDirection) -> Self {
        self.sorts.retain(|(existing, _)| existing != column);
        self.sorts.push((column.to_string(), direction));
        self
    }

    pub fn page(mut self, page_size: u32, first_result: u32) -> Self {
        self.page_size = Some(page_size);
        self.first_result = Some(first_result);
        self
    }

    /// Resolve into a plain GET target
    pub fn to_read(&self) -> Result<ReadRequest> {
        let mut read = ReadRequest::new(self.service.clone(), &self.path)?.expect(ExpectedShape::Object);
        for (column, value) in &self.filters {
            read.target.add_param(column, value)?;
        }
        if !self.columns.is_empty() {
            read.target.add_param(Self::COLUMNS_PARAM, &self.columns.join(","))?;
        }
        if let Some(page_size) = self.page_size {
            read.target.add_param(Self::PAGE_SIZE_PARAM, &page_size.to_string())?;
        }
        if let Some(first_result) = self.first_result {
            read.target.add_param(Self::FIRST_RESULT_PARAM, &first_result.to_string())?;
        }
        if !self.sorts.is_empty() {
            let sort = self
                .sorts
                .iter()
                .map(|(column, direction)| format!("{column}|{}", direction.as_str().to_uppercase()))
                .collect::<Vec<_>>()
                .join(",");
            read.target.add_param(Self::SORT_PARAM, &sort)?;
        }
        Ok(read)
    }
}

/// A single write call, usable alone or as a member of a batch
///
/// The id doubles as the correlation label inside container calls.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOperation {
    id: String,
    target: Target,
    body: Option<Value>,
    expect: ExpectedShape,
}

impl WriteOperation {
    pub fn builder(method: HttpMethod, service: ServiceName, path: &str) -> WriteOperationBuilder {
        WriteOperationBuilder {
            id: None,
            method,
            service,
            path: path.to_string(),
            params: Vec::new(),
            body: None,
            expect: ExpectedShape::Void,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn method(&self) -> HttpMethod {
        self.target.method
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn expect(&self) -> ExpectedShape {
        self.expect
    }

    /// Body sent on a direct call: the entity for POST and PUT, `{}` otherwise
    pub fn direct_body(&self) -> Value {
        match &self.body {
            Some(body) if self.target.method.carries_entity() => body.clone(),
            _ => Value::Object(serde_json::Map::new()),
        }
    }

    /// Body sent inside a container call: the entity, or `{}` when absent
    pub fn container_body(&self) -> Value {
        self.body.clone().unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }
}

pub struct WriteOperationBuilder {
    id: Option<String>,
    method: HttpMethod,
    service: ServiceName,
    path: String,
    params: Vec<(String, String)>,
    body: Option<Value>,
    expect: ExpectedShape,
}

impl WriteOperationBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `entity` as the request body
    pub fn entity<T: Serialize>(self, entity: &T) -> Result<Self> {
        let body = serde_json::to_value(entity)
            .map_err(|e| AccountLinkError::InvalidInput(format!("Entity is not serializable: {e}")))?;
        Ok(self.body(body))
    }

    pub fn expect(mut self, shape: ExpectedShape) -> Self {
        self.expect = shape;
        self
    }

    pub fn build(self) -> Result<WriteOperation> {
        let id = match self.id {
            Some(id) if id.trim().is_empty() => {
                return Err(AccountLinkError::InvalidInput("Operation id must be a non-empty string".into()));
            }
            Some(id) => id.trim().to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let mut target = Target::new(self.method, self.service, &self.path)?;
        for (name, value) in &self.params {
            target.add_param(name, value)?;
        }
        Ok(WriteOperation { id, target, body: self.body, expect: self.expect })
    }
}
