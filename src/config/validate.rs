//! Datasource validation checklist
//!
//! Returns human-readable failures; an empty list means the datasource is usable.

use crate::config::{ConnectionMode, DatasourceConfig, SUPPORTED_AUTH_TYPES};

/// Check a datasource before building a URI or opening a connection
#[must_use]
pub fn validate_datasource(config: &DatasourceConfig) -> Vec<String> {
    let mut invalids = Vec::new();

    if config.endpoints.is_empty() {
        invalids.push("Missing endpoint(s).".to_string());
    } else if config.connection.mode == ConnectionMode::ReplicaSet
        && config.endpoints.len() == 1
        && config.endpoints[0].port.is_some()
    {
        invalids.push(
            "REPLICA_SET connections should not be given a port. \
             If you are trying to specify all the shards, please add more than one."
                .to_string(),
        );
    }

    let Some(auth) = &config.authentication else {
        invalids.push("Missing authentication details.".to_string());
        return invalids;
    };

    match auth.auth_type {
        Some(auth_type) if auth_type.is_supported() => {
            if auth.username.as_deref().unwrap_or_default().is_empty() {
                invalids.push(format!(
                    "Missing username for authentication. Needed because authType is {auth_type}."
                ));
            }

            let has_password = !auth.password.as_deref().unwrap_or_default().is_empty()
                || auth.password_env.is_some();
            if !has_password {
                invalids.push(format!(
                    "Missing password for authentication. Needed because authType is {auth_type}."
                ));
            }
        }
        _ => {
            let supported: Vec<&str> = SUPPORTED_AUTH_TYPES.iter().map(|t| t.as_str()).collect();
            invalids.push(format!("Invalid authType. Must be one of {}", supported.join(", ")));
        }
    }

    if auth.database_name.as_deref().unwrap_or_default().is_empty() {
        invalids.push("Missing database name.".to_string());
    }

    invalids
}
