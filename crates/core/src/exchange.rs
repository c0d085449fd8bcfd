//! One physical call to the remote API
//!
//! Wraps the transport with the rate limiter hooks and the 503
//! classification so that direct calls, container calls and authentication
//! all account for quota the same way.

use std::sync::Arc;
use std::time::Duration;

use accountlink_domain::constants::{
    NEXT_THROTTLE_PERIOD_HEADER, REQUESTS_REMAINING_HEADER, REQUEST_CAP_MARKER,
};
use accountlink_domain::{Account, AccountLinkError, RawRequest, RawResponse, Result};
use tracing::{debug, warn};

use crate::ports::{RateLimiter, Transport};

/// Rate-limited send of one raw request, with 503 classification
#[derive(Clone)]
pub struct Exchange {
    transport: Arc<dyn Transport>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl Exchange {
    /// Exchange that asks `rate_limiter` before every send on `transport`
    pub fn new(transport: Arc<dyn Transport>, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self { transport, rate_limiter }
    }

    /// Send `request` on behalf of `account`
    ///
    /// A 503 is turned into [`AccountLinkError::RequestCapExceeded`] when the
    /// body mentions the request cap and [`AccountLinkError::Unavailable`]
    /// otherwise. Every other status is returned for parsing.
    pub async fn send(&self, account: &Account, request: RawRequest) -> Result<RawResponse> {
        let account_code = account.account_code();
        self.rate_limiter.before_call(account_code).await;

        debug!(account = account_code, method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(request).await?;
        self.record_quota(account_code, &response);

        if response.status == 503 {
            let capped = response
                .body
                .as_deref()
                .is_some_and(|body| body.to_lowercase().contains(REQUEST_CAP_MARKER));
            if capped {
                warn!(account = account_code, "request cap exceeded");
                self.rate_limiter.on_capacity_exceeded(account_code);
                return Err(AccountLinkError::RequestCapExceeded("Request limit exceeded".into()));
            }
            return Err(AccountLinkError::Unavailable("API returned 503 Service Unavailable".into()));
        }

        Ok(response)
    }

    fn record_quota(&self, account_code: &str, response: &RawResponse) {
        let remaining = response
            .header(REQUESTS_REMAINING_HEADER)
            .and_then(|value| value.trim().parse::<u32>().ok());
        let period = response
            .header(NEXT_THROTTLE_PERIOD_HEADER)
            .and_then(|value| value.trim().parse::<u64>().ok());
        if let (Some(remaining), Some(period_ms)) = (remaining, period) {
            self.rate_limiter.after_call(account_code, remaining, Duration::from_millis(period_ms));
        }
    }
}
