//! Connection URI construction
//!
//! Builds `scheme://[user:pass@]host1[:port1],host2[:port2],.../[authDb][?param1&param2]`
//! from a [`DatasourceConfig`]. The output must stay byte-identical for a given
//! configuration, since stored datasources are compared against it.

use crate::config::DatasourceConfig;

/// Port substituted for endpoints without one (non-SRV only)
pub const DEFAULT_PORT: u16 = 27017;

const DIRECT_SCHEME: &str = "mongodb://";
const SRV_SCHEME: &str = "mongodb+srv://";

/// Build the client connection URI
///
/// Callers validate the configuration first; an empty endpoint list yields a URI
/// without hosts.
#[must_use]
pub fn build_client_uri(config: &DatasourceConfig) -> String {
    let is_srv = config.is_srv();

    let mut uri = String::from(if is_srv { SRV_SCHEME } else { DIRECT_SCHEME });

    if let Some(auth) = &config.authentication {
        uri.push_str(&url_encode(auth.username.as_deref().unwrap_or_default()));
        uri.push(':');
        uri.push_str(&url_encode(auth.password.as_deref().unwrap_or_default()));
        uri.push('@');
    }

    // SRV records supply ports, so none are written in that mode
    let hosts: Vec<String> = config
        .endpoints
        .iter()
        .map(|endpoint| match (is_srv, endpoint.port) {
            (true, _) => endpoint.host.clone(),
            (false, Some(port)) => format!("{}:{port}", endpoint.host),
            (false, None) => format!("{}:{DEFAULT_PORT}", endpoint.host),
        })
        .collect();
    uri.push_str(&hosts.join(","));

    uri.push('/');
    if let Some(database) =
        config.authentication.as_ref().and_then(|auth| auth.database_name.as_deref())
    {
        uri.push_str(database);
    }

    let params = query_params(config);
    if !params.is_empty() {
        uri.push('?');
        uri.push_str(&params.join("&"));
    }

    uri
}

/// Query parameters in their fixed order: `ssl`, then `authMechanism`
fn query_params(config: &DatasourceConfig) -> Vec<String> {
    let mut params = Vec::new();

    if config.connection.ssl.as_ref().is_some_and(|ssl| ssl.enabled) {
        params.push("ssl=true".to_string());
    }

    if let Some(auth_type) = config.authentication.as_ref().and_then(|auth| auth.auth_type) {
        params.push(format!("authMechanism={}", auth_type.mechanism()));
    }

    params
}

/// `application/x-www-form-urlencoded` encoding of a credential
///
/// Alphanumerics and `*-._` pass through, space becomes `+`, everything else is
/// `%XX` over its UTF-8 bytes.
fn url_encode(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes()).collect()
}
