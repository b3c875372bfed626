use crate::backend::{LookupRequestBackend, LookupUserBackend, RequestLookup};
use crate::config::KohaConfig;
use crate::prelude::*;
use async_trait::async_trait;
use ncip_core::koha::{
    first_hold, transform_patron, KohaAccount, KohaCheckout, KohaErrorBody, KohaHold,
    KohaPasswordValidation, KohaPatron, KohaPatronBundle,
};
use ncip_core::native::{NativeRequest, NativeUser};
use ncip_core::ncip::{AgencyId, RequestElementType};
use ncip_core::problem::GatewayError;
use ncip_core::selector::UserSections;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Create an HTTP client for the Koha REST API, with Basic Auth when credentials are set
pub fn create_koha_client(config: &KohaConfig) -> Result<reqwest::Client> {
    use base64::Engine;
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

    let mut headers = HeaderMap::new();
    if let (Some(user), Some(password)) = (&config.user, &config.password) {
        let auth_string = format!("{user}:{password}");
        let auth_encoded = base64::engine::general_purpose::STANDARD.encode(&auth_string);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {auth_encoded}"))
                .map_err(|e| eyre!("Invalid header value: {}", e))?,
        );
    }
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
}

/// Koha REST API v1 gateway
pub struct KohaGateway {
    client: reqwest::Client,
    base_url: String,
    minor_unit: u32,
}

impl KohaGateway {
    pub fn new(config: &KohaConfig, minor_unit: u32) -> Result<Self> {
        Ok(Self {
            client: create_koha_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            minor_unit,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// GET a JSON resource; `None` on HTTP 404
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, GatewayError> {
        let url = self.url(path);
        log::debug!("Koha request: GET {url}");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(f!("Failed to send request to Koha: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &body));
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| GatewayError::Parse(f!("Failed to parse Koha response from {path}: {e}")))
    }

    /// Resolve a patron by internal id, falling back to a card number search
    ///
    /// All-digit card numbers are common, so a numeric id that is not a
    /// `patron_id` is still searched as a card number.
    async fn find_patron(&self, user_id: &str) -> Result<Option<KohaPatron>, GatewayError> {
        let user_id = user_id.trim();
        if user_id.parse::<i64>().is_ok() {
            let path = format!("patrons/{}", urlencoding::encode(user_id));
            if let Some(patron) = self.get_json(&path, &[]).await? {
                return Ok(Some(patron));
            }
        }

        let patrons: Option<Vec<KohaPatron>> = self
            .get_json("patrons", &[("cardnumber", user_id.to_string())])
            .await?;
        Ok(patrons.and_then(|patrons| patrons.into_iter().next()))
    }
}

fn backend_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<KohaErrorBody>(body)
        .map(|error| error.error)
        .unwrap_or_else(|_| body.to_string());

    GatewayError::Backend {
        code: status.as_u16().to_string(),
        message,
    }
}

#[async_trait]
impl LookupUserBackend for KohaGateway {
    fn name(&self) -> &'static str {
        "koha"
    }

    async fn fetch_user_record(
        &self,
        user_id: &str,
        sections: UserSections,
    ) -> Result<Option<NativeUser>, GatewayError> {
        let Some(patron) = self.find_patron(user_id).await? else {
            return Ok(None);
        };
        let patron_id = patron.patron_id.to_string();

        let account: Option<KohaAccount> = if sections.contains(UserSections::FISCAL_ACCOUNTS) {
            self.get_json(&format!("patrons/{patron_id}/account"), &[])
                .await?
        } else {
            None
        };

        let checkouts: Option<Vec<KohaCheckout>> =
            if sections.contains(UserSections::LOANED_ITEMS) {
                self.get_json("checkouts", &[("patron_id", patron_id.clone())])
                    .await?
            } else {
                None
            };

        let holds: Option<Vec<KohaHold>> = if sections.contains(UserSections::REQUESTED_ITEMS) {
            self.get_json("holds", &[("patron_id", patron_id.clone())])
                .await?
        } else {
            None
        };

        let bundle = KohaPatronBundle {
            patron,
            account,
            checkouts,
            holds,
        };

        transform_patron(&bundle, self.minor_unit).map(Some)
    }

    async fn authenticate(
        &self,
        agency: &AgencyId,
        user_id: &str,
        password: &str,
    ) -> Result<String, GatewayError> {
        let url = self.url("auth/password/validation");
        log::debug!("Koha request: POST {url} (agency {})", agency.as_str());

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "identifier": user_id,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(f!("Failed to send request to Koha: {e}")))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<KohaErrorBody>(&body)
                .map(|error| error.error)
                .unwrap_or_else(|_| "Validation failed".to_string());
            return Err(GatewayError::InvalidCredentials(message));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &body));
        }

        let validation: KohaPasswordValidation = response.json().await.map_err(|e| {
            GatewayError::Parse(f!("Failed to parse Koha password validation: {e}"))
        })?;

        Ok(validation.patron_id.to_string())
    }
}

#[async_trait]
impl LookupRequestBackend for KohaGateway {
    fn name(&self) -> &'static str {
        "koha"
    }

    async fn fetch_request_record(
        &self,
        lookup: &RequestLookup,
    ) -> Result<Option<NativeRequest>, GatewayError> {
        let query = match lookup {
            RequestLookup::ById(hold_id) => vec![("hold_id", hold_id.clone())],
            RequestLookup::ByItemAndUser { item_id, user_id } => vec![
                ("item_id", item_id.clone()),
                ("patron_id", user_id.clone()),
            ],
        };

        let holds: Option<Vec<KohaHold>> = self.get_json("holds", &query).await?;
        Ok(holds.and_then(first_hold))
    }

    fn unsupported_request_elements(&self) -> &'static [RequestElementType] {
        &[RequestElementType::ShippingInformation]
    }
}
