//! Backend capabilities and connector selection
//!
//! Each ILS implements the capabilities it supports. The service operations
//! only see the traits; [`Connector`] picks the implementation from the
//! configuration.

use crate::aleph::AlephGateway;
use crate::config::{BackendKind, ConnectorConfig};
use crate::koha::KohaGateway;
use crate::prelude::*;
use async_trait::async_trait;
use ncip_core::assemble::AssemblyConfig;
use ncip_core::native::{NativeRequest, NativeUser};
use ncip_core::ncip::{
    AgencyId, LookupRequestInitiationData, LookupRequestResponseData, LookupUserInitiationData,
    LookupUserResponseData, RequestElementType,
};
use ncip_core::problem::GatewayError;
use ncip_core::selector::UserSections;

/// Patron lookups against one ILS
#[async_trait]
pub trait LookupUserBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch the patron record, or `None` if the ILS does not know the id
    ///
    /// `sections` lets the gateway skip resources nobody asked for.
    async fn fetch_user_record(
        &self,
        user_id: &str,
        sections: UserSections,
    ) -> Result<Option<NativeUser>, GatewayError>;

    /// Verify a patron's credentials and return the identifier the ILS knows them by
    async fn authenticate(
        &self,
        agency: &AgencyId,
        user_id: &str,
        password: &str,
    ) -> Result<String, GatewayError>;
}

/// How a Lookup Request initiation identifies the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestLookup {
    ById(String),
    ByItemAndUser { item_id: String, user_id: String },
}

/// Hold lookups against one ILS
#[async_trait]
pub trait LookupRequestBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_request_record(
        &self,
        lookup: &RequestLookup,
    ) -> Result<Option<NativeRequest>, GatewayError>;

    /// Elements this ILS will never provide
    fn unsupported_request_elements(&self) -> &'static [RequestElementType] {
        &[]
    }
}

/// The configured ILS connector
pub enum Connector {
    Aleph(AlephGateway),
    Koha(KohaGateway),
}

impl Connector {
    pub fn from_config(config: &ConnectorConfig) -> Result<Self> {
        let minor_unit = config.currency.minor_unit;
        match config.backend {
            BackendKind::Aleph => Ok(Connector::Aleph(AlephGateway::new(
                config.aleph_settings()?,
                minor_unit,
            )?)),
            BackendKind::Koha => Ok(Connector::Koha(KohaGateway::new(
                config.koha_settings()?,
                minor_unit,
            )?)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.user_backend().name()
    }

    pub fn user_backend(&self) -> &dyn LookupUserBackend {
        match self {
            Connector::Aleph(gateway) => gateway,
            Connector::Koha(gateway) => gateway,
        }
    }

    pub fn request_backend(&self) -> Option<&dyn LookupRequestBackend> {
        match self {
            Connector::Aleph(_) => None,
            Connector::Koha(gateway) => Some(gateway),
        }
    }

    pub async fn lookup_user(
        &self,
        init: &LookupUserInitiationData,
        config: &AssemblyConfig,
    ) -> Result<LookupUserResponseData, ServiceError> {
        Ok(crate::service::lookup_user(init, self.user_backend(), config).await)
    }

    /// Fails with [`ServiceError::UnsupportedOperation`] when the ILS has no request lookup
    pub async fn lookup_request(
        &self,
        init: &LookupRequestInitiationData,
        config: &AssemblyConfig,
    ) -> Result<LookupRequestResponseData, ServiceError> {
        let backend = self
            .request_backend()
            .ok_or_else(|| ServiceError::UnsupportedOperation {
                service: "LookupRequest".to_string(),
                backend: self.name().to_string(),
            })?;

        Ok(crate::service::lookup_request(init, backend, config).await)
    }
}
