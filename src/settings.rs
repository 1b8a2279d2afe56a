use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Site-wide switches changed from the dashboard. Persisted next to the posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteSettings {
    pub analytics_enabled: bool,
    pub maintenance_mode: bool,
    pub show_personal_projects: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        SiteSettings {
            analytics_enabled: true,
            maintenance_mode: false,
            show_personal_projects: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingToggle {
    Analytics,
    Maintenance,
    PersonalProjects,
}

impl SettingToggle {
    pub const ALL: [SettingToggle; 3] = [
        SettingToggle::Analytics,
        SettingToggle::Maintenance,
        SettingToggle::PersonalProjects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingToggle::Analytics => "analytics",
            SettingToggle::Maintenance => "maintenance",
            SettingToggle::PersonalProjects => "personal_projects",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingToggle::Analytics => "Collect visitor analytics",
            SettingToggle::Maintenance => "Maintenance mode",
            SettingToggle::PersonalProjects => "Show personal projects",
        }
    }
}

impl FromStr for SettingToggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingToggle::ALL.into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown setting '{}'", s))
    }
}

impl Display for SettingToggle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SiteSettings {
    pub fn get(&self, toggle: SettingToggle) -> bool {
        match toggle {
            SettingToggle::Analytics => self.analytics_enabled,
            SettingToggle::Maintenance => self.maintenance_mode,
            SettingToggle::PersonalProjects => self.show_personal_projects,
        }
    }

    pub fn set(&mut self, toggle: SettingToggle, value: bool) {
        let slot = match toggle {
            SettingToggle::Analytics => &mut self.analytics_enabled,
            SettingToggle::Maintenance => &mut self.maintenance_mode,
            SettingToggle::PersonalProjects => &mut self.show_personal_projects,
        };
        *slot = value;
    }
}
