use crate::backend::LookupUserBackend;
use crate::config::AlephConfig;
use crate::prelude::*;
use async_trait::async_trait;
use ncip_core::aleph::{transform_bor_auth, transform_bor_info};
use ncip_core::native::NativeUser;
use ncip_core::ncip::AgencyId;
use ncip_core::problem::GatewayError;
use ncip_core::selector::UserSections;

/// Aleph X-Services gateway
pub struct AlephGateway {
    client: reqwest::Client,
    config: AlephConfig,
    minor_unit: u32,
}

impl AlephGateway {
    pub fn new(config: &AlephConfig, minor_unit: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            config: config.clone(),
            minor_unit,
        })
    }

    /// Call one X-Server operation and return the raw XML reply
    async fn x_server(&self, op: &str, params: Vec<(&str, String)>) -> Result<String, GatewayError> {
        let mut query = vec![
            ("op", op.to_string()),
            ("library", self.config.library.clone()),
        ];
        query.extend(params);
        if let (Some(user), Some(password)) = (&self.config.user, &self.config.password) {
            query.push(("user_name", user.clone()));
            query.push(("user_password", password.clone()));
        }

        log::debug!("Aleph X-Server request: op={op}");

        let response = self
            .client
            .get(&self.config.xserver_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(f!("Failed to reach Aleph X-Server: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(f!("Failed to read Aleph reply: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Transport(f!(
                "Aleph X-Server returned HTTP {status}: {body}"
            )));
        }

        Ok(body)
    }
}

fn flag(sections: UserSections, section: UserSections, yes: &str) -> String {
    if sections.contains(section) {
        yes.to_string()
    } else {
        "N".to_string()
    }
}

#[async_trait]
impl LookupUserBackend for AlephGateway {
    fn name(&self) -> &'static str {
        "aleph"
    }

    async fn fetch_user_record(
        &self,
        user_id: &str,
        sections: UserSections,
    ) -> Result<Option<NativeUser>, GatewayError> {
        let xml = self
            .x_server(
                "bor-info",
                vec![
                    ("bor_id", user_id.to_string()),
                    ("loans", flag(sections, UserSections::LOANED_ITEMS, "Y")),
                    ("hold", flag(sections, UserSections::REQUESTED_ITEMS, "Y")),
                    ("cash", flag(sections, UserSections::FISCAL_ACCOUNTS, "B")),
                    ("translate", "N".to_string()),
                ],
            )
            .await?;

        transform_bor_info(&xml, self.minor_unit)
    }

    async fn authenticate(
        &self,
        _agency: &AgencyId,
        user_id: &str,
        password: &str,
    ) -> Result<String, GatewayError> {
        let xml = self
            .x_server(
                "bor-auth",
                vec![
                    ("bor_id", user_id.to_string()),
                    ("verification", password.to_string()),
                ],
            )
            .await?;

        transform_bor_auth(&xml)
    }
}
