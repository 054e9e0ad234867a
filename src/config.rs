use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub whatsapp: WhatsAppConfig,
    pub sheets: SheetsConfig,
    pub admin: AdminConfig,
    pub rooms: RoomsConfig,
    #[serde(default)]
    pub payment_gateway: PaymentGatewayConfig,
    #[serde(default = "default_backup_config")]
    pub backup: BackupConfig,
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub api_token: String,
    pub verify_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    #[serde(default = "default_sheets_api_url")]
    pub api_url: String,
    pub api_token: String,
    pub spreadsheet_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    pub phone_numbers: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoomsConfig {
    pub available: Vec<String>,
    pub prices: HashMap<String, f64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaymentGatewayConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackupConfig {
    #[serde(default = "default_backup_enabled")]
    pub enabled: bool,
    #[serde(default = "default_backup_frequency_hours")]
    pub frequency_hours: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,
}

fn default_sheets_api_url() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_backup_enabled() -> bool {
    true
}

fn default_backup_frequency_hours() -> u32 {
    24
}

fn default_port() -> u16 {
    8000
}

fn default_backup_config() -> BackupConfig {
    BackupConfig {
        enabled: default_backup_enabled(),
        frequency_hours: default_backup_frequency_hours(),
    }
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        port: default_port(),
        debug: false,
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.whatsapp.api_url.is_empty() || self.whatsapp.api_token.is_empty() {
            bail!("whatsapp.api_url and whatsapp.api_token must be set");
        }
        if self.whatsapp.verify_token.is_empty() {
            bail!("whatsapp.verify_token must be set");
        }
        if self.sheets.api_token.is_empty() || self.sheets.spreadsheet_id.is_empty() {
            bail!("sheets.api_token and sheets.spreadsheet_id must be set");
        }
        if self.rooms.available.is_empty() {
            bail!("rooms.available must list at least one room");
        }
        for room in &self.rooms.available {
            if !self.rooms.prices.contains_key(room) {
                bail!("No price configured for room {room}");
            }
        }
        if self.payment_gateway.enabled && self.payment_gateway.api_key.is_none() {
            bail!("payment_gateway.api_key is required when the payment gateway is enabled");
        }
        Ok(())
    }

    /// Whether the phone number belongs to an admin.
    pub fn is_admin(&self, phone_number: &str) -> bool {
        self.admin
            .phone_numbers
            .iter()
            .any(|admin| admin == phone_number)
    }

    /// Whether the room identifier exists in the catalog.
    pub fn is_valid_room(&self, room: &str) -> bool {
        self.rooms.available.iter().any(|r| r == room)
    }

    /// Monthly rent for a room. Always `Some` for valid rooms because
    /// `validate` requires a price per available room.
    pub fn room_price(&self, room: &str) -> Option<f64> {
        self.rooms.prices.get(room).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> String {
        r#"
[whatsapp]
api_url = "https://graph.facebook.com/v19.0/123456"
api_token = "wa-token"
verify_token = "verify-me"

[sheets]
api_token = "sheets-token"
spreadsheet_id = "sheet-id"

[admin]
phone_numbers = ["08111111111"]

[rooms]
available = ["101", "102"]

[rooms.prices]
"101" = 1500000.0
"102" = 1750000.0
"#
        .to_string()
    }

    #[test]
    fn test_parse_sample_config() {
        let config = Config::parse(&sample_toml()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert!(!config.server.debug);
        assert!(config.backup.enabled);
        assert_eq!(config.backup.frequency_hours, 24);
        assert!(!config.payment_gateway.enabled);
        assert_eq!(config.sheets.api_url, "https://sheets.googleapis.com/v4");
    }

    #[test]
    fn test_room_helpers() {
        let config = Config::parse(&sample_toml()).unwrap();
        assert!(config.is_valid_room("101"));
        assert!(!config.is_valid_room("999"));
        assert_eq!(config.room_price("102"), Some(1_750_000.0));
        assert_eq!(config.room_price("999"), None);
    }

    #[test]
    fn test_admin_check() {
        let config = Config::parse(&sample_toml()).unwrap();
        assert!(config.is_admin("08111111111"));
        assert!(!config.is_admin("08222222222"));
    }

    #[test]
    fn test_missing_room_price_is_fatal() {
        let toml = sample_toml().replace("\"102\" = 1750000.0\n", "");
        let err = Config::parse(&toml).unwrap_err();
        assert!(err.to_string().contains("102"));
    }

    #[test]
    fn test_gateway_enabled_requires_api_key() {
        let toml = format!("{}\n[payment_gateway]\nenabled = true\n", sample_toml());
        assert!(Config::parse(&toml).is_err());
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let toml = sample_toml().replace("api_token = \"wa-token\"", "api_token = \"\"");
        assert!(Config::parse(&toml).is_err());
    }
}
