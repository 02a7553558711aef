use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AuthError;

#[derive(Serialize)]
struct CodeRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    redirect_uri: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct CodeResponse {
    #[serde(default)]
    id_token: Option<String>,
}

/// Trades an authorization code for the upstream's signed assertion.
#[derive(Debug, Clone)]
pub struct CodeExchange {
    http: Client,
    token_endpoint: Url,
    client_id: String,
    redirect_uri: Url,
}

impl CodeExchange {
    /// Creates an exchange client. The HTTP client's timeout bounds each call.
    pub fn new(http: Client, token_endpoint: Url, client_id: String, redirect_uri: Url) -> Self {
        CodeExchange {
            http,
            token_endpoint,
            client_id,
            redirect_uri,
        }
    }

    /// POSTs the code to the token endpoint and returns the `id_token`.
    pub fn exchange(&self, code: &str) -> Result<String, AuthError> {
        let request = CodeRequest {
            code,
            client_id: &self.client_id,
            redirect_uri: self.redirect_uri.as_str(),
            grant_type: "authorization_code",
        };

        let response = self
            .http
            .post(self.token_endpoint.clone())
            .json(&request)
            .send()
            .map_err(|e| {
                warn!("code exchange with {} failed: {}", self.token_endpoint, e);
                AuthError::Network
            })?;

        let status = response.status();
        debug!("code exchange answered {}", status);
        if status != StatusCode::OK {
            warn!("upstream refused the code exchange: {}", status);
            return Err(AuthError::ExchangeRejected(status.as_u16()));
        }

        let body: CodeResponse = response.json().map_err(|e| {
            warn!("code exchange body is not JSON: {}", e);
            AuthError::MalformedResponse
        })?;

        body.id_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            warn!("code exchange succeeded without an id_token");
            AuthError::MalformedResponse
        })
    }
}
