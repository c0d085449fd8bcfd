use std::collections::BTreeMap;
use std::time::Duration;

use accountlink_core::ports::Transport;
use accountlink_domain::constants::CONTENT_TYPE_JSON;
use accountlink_domain::{AccountLinkError, HttpConfig, HttpMethod, RawRequest, RawResponse, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use tracing::debug;

use crate::errors::InfraError;

/// [`Transport`] backed by a reqwest client.
///
/// Only failures to connect are retried: the request never reached the
/// server, so resending cannot duplicate a write. Every received status is
/// handed back unchanged.
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    connect_retries: u32,
    base_backoff: Duration,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Build a transport from the `http` section of the configuration.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .connect_retries(config.connect_retries);
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }

    fn request(&self, request: &RawRequest) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method(request.method), &request.url)
            .header(ACCEPT, CONTENT_TYPE_JSON);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, CONTENT_TYPE_JSON).body(body.clone());
        }
        builder
    }

    fn backoff_delay(&self, retry_number: u32) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8);
        self.base_backoff.saturating_mul(1u32 << shift)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: RawRequest) -> Result<RawResponse> {
        let attempts = self.connect_retries.saturating_add(1);

        for attempt in 1..=attempts {
            debug!(attempt, method = %request.method, url = %request.url, "sending HTTP request");

            match self.request(&request).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    debug!(attempt, url = %request.url, status, "received HTTP response");
                    return read_response(response).await;
                }
                Err(err) if err.is_connect() && attempt < attempts => {
                    debug!(attempt, url = %request.url, error = %err, "connect failed; retrying");
                    let delay = self.backoff_delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(InfraError::from(err).into()),
            }
        }

        Err(AccountLinkError::Internal("http transport exhausted retries without producing a result".into()))
    }
}

async fn read_response(response: reqwest::Response) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let headers: BTreeMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let body = response.text().await.map_err(InfraError::from)?;

    let mut raw = RawResponse::new(status);
    raw.headers = headers;
    if !body.is_empty() {
        raw.body = Some(body);
    }
    Ok(raw)
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Options => Method::OPTIONS,
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    connect_timeout: Duration,
    connect_retries: u32,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            timeout: defaults.timeout,
            connect_timeout: defaults.connect_timeout,
            connect_retries: defaults.connect_retries,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl HttpTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Extra attempts after a connection failure.
    pub fn connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).connect_timeout(self.connect_timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| AccountLinkError::from(InfraError::from(err)))?;

        Ok(HttpTransport {
            client,
            connect_retries: self.connect_retries,
            base_backoff: self.base_backoff,
        })
    }
}
