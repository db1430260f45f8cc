use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

/// Singleton settings documents. Each is an opaque JSON object replaced
/// wholesale on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSection {
    Customization,
    Advanced,
    Pdf,
    Certificate,
    Dsc,
    Branding,
}

impl SettingsSection {
    pub const ALL: [SettingsSection; 6] = [
        SettingsSection::Customization,
        SettingsSection::Advanced,
        SettingsSection::Pdf,
        SettingsSection::Certificate,
        SettingsSection::Dsc,
        SettingsSection::Branding,
    ];

    /// REST collection path for this section.
    pub fn path(&self) -> &'static str {
        match self {
            SettingsSection::Customization => "/customization-settings",
            SettingsSection::Advanced => "/advanced-settings",
            SettingsSection::Pdf => "/pdf-settings",
            SettingsSection::Certificate => "/certificate-settings",
            SettingsSection::Dsc => "/dsc-settings",
            SettingsSection::Branding => "/branding-settings",
        }
    }
}

impl std::fmt::Display for SettingsSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsSection::Customization => write!(f, "customization"),
            SettingsSection::Advanced => write!(f, "advanced"),
            SettingsSection::Pdf => write!(f, "pdf"),
            SettingsSection::Certificate => write!(f, "certificate"),
            SettingsSection::Dsc => write!(f, "dsc"),
            SettingsSection::Branding => write!(f, "branding"),
        }
    }
}

impl std::str::FromStr for SettingsSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_lowercase();
        let key = key.trim_end_matches("-settings");
        match key {
            "customization" => Ok(SettingsSection::Customization),
            "advanced" => Ok(SettingsSection::Advanced),
            "pdf" => Ok(SettingsSection::Pdf),
            "certificate" => Ok(SettingsSection::Certificate),
            "dsc" => Ok(SettingsSection::Dsc),
            "branding" => Ok(SettingsSection::Branding),
            _ => Err(format!("Unknown settings section: {}", s)),
        }
    }
}

/// Notification email sent on a workflow event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub event: String,
    pub subject: String,
    pub body: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmailTemplate {
    pub name: String,
    pub event: String,
    pub subject: String,
    pub body: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl NewEmailTemplate {
    pub fn into_email_template(self) -> EmailTemplate {
        EmailTemplate {
            base: EntityBase::new(),
            name: self.name,
            event: self.event,
            subject: self.subject,
            body: self.body,
            enabled: self.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn into_category(self) -> Category {
        Category {
            base: EntityBase::new(),
            name: self.name,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub monthly_price: f64,
    pub max_users: u32,
    pub max_documents: Option<u32>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan_id: Uuid,
    pub status: String,
    pub seats: u32,
    pub renews_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_parses_paths_and_names() {
        assert_eq!(
            "pdf-settings".parse::<SettingsSection>().unwrap(),
            SettingsSection::Pdf
        );
        assert_eq!(
            "Branding".parse::<SettingsSection>().unwrap(),
            SettingsSection::Branding
        );
        assert!("billing".parse::<SettingsSection>().is_err());
    }

    #[test]
    fn test_every_section_has_distinct_path() {
        let mut paths: Vec<_> = SettingsSection::ALL.iter().map(|s| s.path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), SettingsSection::ALL.len());
    }

    #[test]
    fn test_email_template_enabled_by_default() {
        let new: NewEmailTemplate = serde_json::from_value(serde_json::json!({
            "name": "Sign request",
            "event": "signature_requested",
            "subject": "Please sign",
            "body": "A document awaits your signature."
        }))
        .unwrap();
        assert!(new.enabled);
    }
}
