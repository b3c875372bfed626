use crate::prelude::*;
use ncip_core::assemble::AssemblyConfig;
use ncip_core::native::MAX_MINOR_UNIT;
use ncip_core::ncip::{AgencyId, CurrencyCode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ILS the connector talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Aleph,
    Koha,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Aleph => "aleph",
            BackendKind::Koha => "koha",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "aleph" => Ok(BackendKind::Aleph),
            "koha" => Ok(BackendKind::Koha),
            other => Err(Error::UnknownBackend(other.to_string())),
        }
    }
}

/// Aleph X-Services settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlephConfig {
    /// X-Server endpoint, e.g. `https://aleph.example.org/X`
    pub xserver_url: String,
    /// ADM library code, e.g. `USM50`
    pub library: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Koha REST API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KohaConfig {
    /// Base URL of the Koha staff interface, without `/api/v1`
    pub base_url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Connector configuration, from environment variables or a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub backend: BackendKind,
    pub default_agency_id: String,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub aleph: Option<AlephConfig>,
    #[serde(default)]
    pub koha: Option<KohaConfig>,
}

impl ConnectorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup; empty values count as unset
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let backend: BackendKind = var("NCIP_BACKEND")
            .ok_or_else(|| eyre!("NCIP_BACKEND environment variable not set"))?
            .parse()?;

        let default_agency_id = var("NCIP_DEFAULT_AGENCY_ID")
            .ok_or_else(|| eyre!("NCIP_DEFAULT_AGENCY_ID environment variable not set"))?;

        let mut currency = CurrencyCode::default();
        if let Some(code) = var("NCIP_CURRENCY_CODE") {
            currency.code = code;
        }
        if let Some(minor_unit) = var("NCIP_CURRENCY_MINOR_UNIT") {
            currency.minor_unit = minor_unit
                .trim()
                .parse()
                .wrap_err_with(|| f!("Invalid NCIP_CURRENCY_MINOR_UNIT: {minor_unit}"))?;
        }

        let aleph = match var("ALEPH_XSERVER_URL") {
            Some(xserver_url) => Some(AlephConfig {
                xserver_url,
                library: var("ALEPH_LIBRARY").ok_or_else(|| Error::MissingBackendSettings {
                    backend: "aleph".to_string(),
                    variable: "ALEPH_LIBRARY".to_string(),
                })?,
                user: var("ALEPH_USER"),
                password: var("ALEPH_PASSWORD"),
            }),
            None => None,
        };

        let koha = var("KOHA_BASE_URL").map(|base_url| KohaConfig {
            base_url,
            user: var("KOHA_USER"),
            password: var("KOHA_PASSWORD"),
        });

        let config = Self {
            backend,
            default_agency_id,
            currency,
            aleph,
            koha,
        };
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| f!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(f!("{}: {}", path.display(), e)))?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that would break amount conversion
    fn validate(&self) -> std::result::Result<(), Error> {
        if self.currency.minor_unit > MAX_MINOR_UNIT {
            return Err(Error::InvalidMinorUnit {
                code: self.currency.code.clone(),
                minor_unit: self.currency.minor_unit,
                max: MAX_MINOR_UNIT,
            });
        }
        Ok(())
    }

    /// Load from `path` when given, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    /// Apply CLI overrides to the configuration
    pub fn with_overrides(
        mut self,
        backend: Option<BackendKind>,
        default_agency_id: Option<String>,
    ) -> Self {
        if let Some(backend) = backend {
            self.backend = backend;
        }
        if let Some(agency) = default_agency_id {
            self.default_agency_id = agency;
        }
        self
    }

    /// Settings consumed while assembling responses
    pub fn assembly_config(&self) -> AssemblyConfig {
        AssemblyConfig {
            default_agency_id: AgencyId::new(self.default_agency_id.clone()),
            currency: self.currency.clone(),
        }
    }

    pub fn aleph_settings(&self) -> std::result::Result<&AlephConfig, Error> {
        self.aleph
            .as_ref()
            .ok_or_else(|| Error::MissingBackendSettings {
                backend: "aleph".to_string(),
                variable: "ALEPH_XSERVER_URL".to_string(),
            })
    }

    pub fn koha_settings(&self) -> std::result::Result<&KohaConfig, Error> {
        self.koha
            .as_ref()
            .ok_or_else(|| Error::MissingBackendSettings {
                backend: "koha".to_string(),
                variable: "KOHA_BASE_URL".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_vars_defaults_currency() {
        let config = ConnectorConfig::from_vars(vars(&[
            ("NCIP_BACKEND", "koha"),
            ("NCIP_DEFAULT_AGENCY_ID", "CPL"),
            ("KOHA_BASE_URL", "https://koha.example.org"),
            ("KOHA_USER", "ncip"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Koha);
        assert_eq!(config.currency, CurrencyCode::new("USD", 2));
        assert_eq!(config.aleph, None);

        let koha = config.koha_settings().unwrap();
        assert_eq!(koha.user.as_deref(), Some("ncip"));
        assert_eq!(koha.password, None);
    }

    #[test]
    fn test_from_vars_aleph_with_currency() {
        let config = ConnectorConfig::from_vars(vars(&[
            ("NCIP_BACKEND", "Aleph"),
            ("NCIP_DEFAULT_AGENCY_ID", "MZK"),
            ("NCIP_CURRENCY_CODE", "CZK"),
            ("NCIP_CURRENCY_MINOR_UNIT", "0"),
            ("ALEPH_XSERVER_URL", "https://aleph.example.org/X"),
            ("ALEPH_LIBRARY", "MZK50"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Aleph);
        assert_eq!(config.currency, CurrencyCode::new("CZK", 0));
        assert_eq!(config.aleph_settings().unwrap().library, "MZK50");
        assert!(config.koha_settings().is_err());
    }

    #[test]
    fn test_from_vars_missing_backend() {
        let result = ConnectorConfig::from_vars(vars(&[("NCIP_DEFAULT_AGENCY_ID", "CPL")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_vars_unknown_backend() {
        let result = ConnectorConfig::from_vars(vars(&[
            ("NCIP_BACKEND", "evergreen"),
            ("NCIP_DEFAULT_AGENCY_ID", "CPL"),
        ]));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("evergreen"));
    }

    #[test]
    fn test_from_vars_aleph_without_library() {
        let result = ConnectorConfig::from_vars(vars(&[
            ("NCIP_BACKEND", "aleph"),
            ("NCIP_DEFAULT_AGENCY_ID", "MZK"),
            ("ALEPH_XSERVER_URL", "https://aleph.example.org/X"),
        ]));
        assert!(result.unwrap_err().to_string().contains("ALEPH_LIBRARY"));
    }

    #[test]
    fn test_from_vars_invalid_minor_unit() {
        let result = ConnectorConfig::from_vars(vars(&[
            ("NCIP_BACKEND", "koha"),
            ("NCIP_DEFAULT_AGENCY_ID", "CPL"),
            ("NCIP_CURRENCY_MINOR_UNIT", "two"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_vars_minor_unit_too_large() {
        let result = ConnectorConfig::from_vars(vars(&[
            ("NCIP_BACKEND", "koha"),
            ("NCIP_DEFAULT_AGENCY_ID", "CPL"),
            ("NCIP_CURRENCY_MINOR_UNIT", "19"),
        ]));
        assert!(result.unwrap_err().to_string().contains("minor unit 19"));

        let config = ConnectorConfig::from_vars(vars(&[
            ("NCIP_BACKEND", "koha"),
            ("NCIP_DEFAULT_AGENCY_ID", "CPL"),
            ("NCIP_CURRENCY_MINOR_UNIT", "18"),
        ]))
        .unwrap();
        assert_eq!(config.currency.minor_unit, 18);
    }

    #[test]
    fn test_from_file_minor_unit_too_large() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend = "koha"
default_agency_id = "CPL"

[currency]
code = "XXX"
minor_unit = 20
"#
        )
        .unwrap();

        let result = ConnectorConfig::from_file(file.path());
        assert!(result.unwrap_err().to_string().contains("minor unit 20"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend = "koha"
default_agency_id = "CPL"

[currency]
code = "EUR"
minor_unit = 2

[koha]
base_url = "https://koha.example.org"
user = "ncip"
password = "secret"
"#
        )
        .unwrap();

        let config = ConnectorConfig::from_file(file.path()).unwrap();

        assert_eq!(config.default_agency_id, "CPL");
        assert_eq!(config.currency.code, "EUR");
        assert_eq!(
            config.koha_settings().unwrap().password.as_deref(),
            Some("secret")
        );
    }

    #[test]
    fn test_from_file_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = ").unwrap();

        assert!(ConnectorConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_with_overrides_and_assembly_config() {
        let config = ConnectorConfig::from_vars(vars(&[
            ("NCIP_BACKEND", "koha"),
            ("NCIP_DEFAULT_AGENCY_ID", "CPL"),
        ]))
        .unwrap()
        .with_overrides(Some(BackendKind::Aleph), Some("MPL".to_string()));

        assert_eq!(config.backend, BackendKind::Aleph);

        let assembly = config.assembly_config();
        assert_eq!(assembly.default_agency_id, AgencyId::new("MPL"));
        assert_eq!(assembly.currency, CurrencyCode::default());
    }
}
