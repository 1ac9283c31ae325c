//! Azure Naming Tool REST adapter
//!
//! Endpoints used:
//! - `POST   /api/ResourceNamingRequests/RequestName`
//! - `GET    /api/GeneratedNames/{id}`
//! - `DELETE /api/GeneratedNames/{id}`
//! - `GET    /api/ResourceTypes`
//!
//! Every request carries the `APIKey` header. Deleting generated names needs
//! the tool's admin password, which this client never holds, so a refused
//! delete is reported as `RetractUnsupported` rather than an auth failure.
//! A 401 is ambiguous between "no admin password" and "bad API key"; the
//! adapter re-checks the key against `ResourceTypes` before deciding.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    details_with_type_name, IdentityComponents, NameLookup, NameRecord, NamingAuthority,
    RecordId, ResourceType,
};
use crate::error::{Result, TransportError};

const API_KEY_HEADER: &str = "apikey";
const REQUEST_NAME_PATH: &str = "api/ResourceNamingRequests/RequestName";
const GENERATED_NAMES_PATH: &str = "api/GeneratedNames";
const RESOURCE_TYPES_PATH: &str = "api/ResourceTypes";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RequestNameBody<'a> {
    resource_environment: &'a str,
    resource_function: &'a str,
    resource_instance: &'a str,
    resource_location: &'a str,
    resource_org: &'a str,
    resource_type: &'a str,
    custom_components: CustomComponents<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CustomComponents<'a> {
    application: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestNameResponse {
    #[serde(default)]
    resource_name: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    resource_name_details: Option<GeneratedNameBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedNameBody {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    created_on: Option<String>,
    #[serde(default)]
    resource_name: String,
    #[serde(default)]
    resource_type_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceTypeBody {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    resource: String,
    #[serde(default)]
    optional: String,
    #[serde(default)]
    exclude: String,
    #[serde(default)]
    property: String,
    #[serde(default)]
    short_name: String,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    length_min: String,
    #[serde(default)]
    length_max: String,
    #[serde(default)]
    valid_text: String,
    #[serde(default)]
    invalid_text: String,
    #[serde(default)]
    invalid_characters: String,
    #[serde(default)]
    invalid_characters_start: String,
    #[serde(default)]
    invalid_characters_end: String,
    #[serde(default)]
    invalid_characters_consecutive: String,
    #[serde(default)]
    regx: String,
    #[serde(default)]
    static_values: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    apply_delimiter: bool,
}

impl From<ResourceTypeBody> for ResourceType {
    fn from(body: ResourceTypeBody) -> Self {
        Self {
            id: body.id,
            resource: body.resource,
            optional: body.optional,
            exclude: body.exclude,
            property: body.property,
            short_name: body.short_name,
            scope: body.scope,
            length_min: body.length_min,
            length_max: body.length_max,
            valid_text: body.valid_text,
            invalid_text: body.invalid_text,
            invalid_characters: body.invalid_characters,
            invalid_characters_start: body.invalid_characters_start,
            invalid_characters_end: body.invalid_characters_end,
            invalid_characters_consecutive: body.invalid_characters_consecutive,
            regx: body.regx,
            static_values: body.static_values,
            enabled: body.enabled,
            apply_delimiter: body.apply_delimiter,
        }
    }
}

/// The tool emits both RFC 3339 and zone-less timestamps.
fn parse_created_on(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Map a refused DELETE to a transport error.
///
/// `key_accepted` only matters for 401: with a working key the refusal means
/// the admin password is required, otherwise the key itself was rejected.
fn retract_error(status: u16, body: String, key_accepted: bool) -> TransportError {
    match status {
        401 if !key_accepted => TransportError::from_status(status, body),
        401 | 403 | 405 => TransportError::retract_unsupported(format!(
            "the naming tool refused deletion with API key credentials (status {})",
            status
        ))
        .with_status(status),
        _ => TransportError::from_status(status, body),
    }
}

/// Validate and normalize the host so relative joins keep any base path.
pub fn parse_host(host: &str) -> Result<Url> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(TransportError::config("host is required and must not be empty"));
    }
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| TransportError::config(format!("invalid host '{}': {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransportError::config(format!(
            "invalid host '{}': malformed scheme '{}', expected http or https",
            trimmed, other
        ))),
    }
}

/// Naming authority reached over HTTP
#[derive(Clone)]
pub struct HttpAuthority {
    client: Client,
    base: Url,
}

impl HttpAuthority {
    /// Build a client for `host` authenticated with `api_key`.
    pub fn new(host: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base = parse_host(host)?;
        if api_key.trim().is_empty() {
            return Err(TransportError::config("apikey is required and must not be empty"));
        }

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| TransportError::config(format!("apikey is not a valid header value: {}", e)))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::config(format!("unable to build HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| TransportError::config(format!("invalid request path '{}': {}", path, e)))
    }

    /// Whether the API key alone is still accepted by the tool.
    async fn key_accepted(&self) -> Result<bool> {
        let url = self.url(RESOURCE_TYPES_PATH)?;
        let status = self.client.get(url).send().await?.status();
        Ok(!matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::from_status(status.as_u16(), body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl NamingAuthority for HttpAuthority {
    fn authority_name(&self) -> &'static str {
        "azure-naming-tool"
    }

    async fn generate(&self, identity: &IdentityComponents) -> Result<NameRecord> {
        let body = RequestNameBody {
            resource_environment: &identity.environment,
            resource_function: &identity.function,
            resource_instance: &identity.instance,
            resource_location: &identity.location,
            resource_org: &identity.organization,
            resource_type: &identity.resource_type,
            custom_components: CustomComponents {
                application: &identity.application,
            },
        };

        let url = self.url(REQUEST_NAME_PATH)?;
        debug!(%url, "requesting name");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        let parsed: RequestNameResponse = Self::decode(response).await?;

        if !parsed.success {
            return Err(TransportError::rejected(if parsed.message.is_empty() {
                "the naming tool declined to generate a name".to_string()
            } else {
                parsed.message
            }));
        }

        let details = parsed.resource_name_details.ok_or_else(|| {
            TransportError::invalid_response("response is missing resourceNameDetails")
        })?;
        if details.id <= 0 {
            return Err(TransportError::invalid_response(
                "response did not carry a generated name id",
            ));
        }

        Ok(NameRecord {
            record_id: RecordId(details.id),
            resolved_name: parsed.resource_name,
            success: parsed.success,
            message: parsed.message,
            details: details_with_type_name(&details.resource_type_name),
        })
    }

    async fn lookup(&self, record_id: RecordId) -> Result<NameLookup> {
        let url = self.url(&format!("{}/{}", GENERATED_NAMES_PATH, record_id))?;
        debug!(%url, "looking up generated name");
        let response = self.client.get(url).send().await?;
        let body: GeneratedNameBody = Self::decode(response).await?;

        Ok(NameLookup {
            record_id: RecordId(body.id),
            resolved_name: body.resource_name,
            details: details_with_type_name(&body.resource_type_name),
            created_on: parse_created_on(body.created_on.as_deref()),
        })
    }

    async fn retract(&self, record_id: RecordId) -> Result<()> {
        let url = self.url(&format!("{}/{}", GENERATED_NAMES_PATH, record_id))?;
        debug!(%url, "retracting generated name");
        let response = self.client.delete(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let key_accepted = if status == StatusCode::UNAUTHORIZED {
            self.key_accepted().await?
        } else {
            true
        };
        Err(retract_error(status.as_u16(), body, key_accepted))
    }

    async fn resource_types(&self) -> Result<Vec<ResourceType>> {
        let url = self.url(RESOURCE_TYPES_PATH)?;
        let response = self.client.get(url).send().await?;
        let bodies: Vec<ResourceTypeBody> = Self::decode(response).await?;
        Ok(bodies.into_iter().map(ResourceType::from).collect())
    }
}
