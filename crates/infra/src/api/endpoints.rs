//! URL templates of the public API

use accountlink_core::ports::EndpointResolver;
use accountlink_domain::constants::{AUTHORISE_SEGMENT, MULTI_MESSAGE_SEGMENT, PUBLIC_API_SEGMENT};
use accountlink_domain::{Account, ServiceName};

/// Builds URLs from the account's datacenter host
///
/// - service call: `{host}/public-api/{account}/{service}/{path}`
/// - container: `{host}/public-api/{account}/multi-message`
/// - container item: `/{service}/{path}`
/// - authentication: `{host}/{account}/authorise`
#[derive(Debug, Clone, Copy, Default)]
pub struct DatacenterEndpoints;

impl EndpointResolver for DatacenterEndpoints {
    fn service_url(&self, account: &Account, service: &ServiceName, path: &str) -> String {
        format!(
            "{}/{PUBLIC_API_SEGMENT}/{}/{}/{}",
            account.datacenter().host(),
            account.account_code(),
            service.as_str(),
            path.trim_start_matches('/')
        )
    }

    fn batch_url(&self, account: &Account) -> String {
        format!(
            "{}/{PUBLIC_API_SEGMENT}/{}/{MULTI_MESSAGE_SEGMENT}",
            account.datacenter().host(),
            account.account_code()
        )
    }

    fn batch_item_uri(&self, service: &ServiceName, path: &str) -> String {
        format!("/{}/{}", service.as_str(), path.trim_start_matches('/'))
    }

    fn auth_url(&self, account: &Account) -> String {
        format!("{}/{}/{AUTHORISE_SEGMENT}", account.datacenter().host(), account.account_code())
    }
}
