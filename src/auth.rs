use std::env;

use spdlog::warn;

use crate::config::Dashboard;

pub const SESSION_COOKIE: &str = "folio_session";
const COOKIE_PATH: &str = "/dashboard";

/// Single-password gate for the dashboard.
///
/// The session cookie carries a hex form of the password, so changing the
/// password logs every browser out.
pub struct DashboardAuth {
    password: Option<String>,
}

fn to_hex(buf: &str) -> String {
    buf.bytes().map(|b| format!("{:02x}", b)).collect()
}

fn same_bytes(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Value of cookie `name` in a raw `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

impl DashboardAuth {
    pub fn new(password: Option<String>) -> Self {
        let password = password.filter(|p| !p.is_empty());
        DashboardAuth { password }
    }

    /// Environment variable first, then the password written in the config.
    pub fn from_config(dashboard: &Dashboard) -> Self {
        let from_env = dashboard.password_env.as_ref().and_then(|var| env::var(var).ok());
        let auth = DashboardAuth::new(from_env.or_else(|| dashboard.password.clone()));
        if auth.is_locked() {
            warn!("No dashboard password configured. The dashboard is locked");
        }
        auth
    }

    pub fn is_locked(&self) -> bool {
        self.password.is_none()
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        match self.password {
            Some(ref password) => same_bytes(password.as_bytes(), candidate.as_bytes()),
            None => false,
        }
    }

    pub fn is_authorized(&self, cookie_header: Option<&str>) -> bool {
        let token = match self.password {
            Some(ref password) => to_hex(password),
            None => return false,
        };
        cookie_header
            .and_then(|header| cookie_value(header, SESSION_COOKIE))
            .map(|value| same_bytes(value.as_bytes(), token.as_bytes()))
            .unwrap_or(false)
    }

    pub fn login_cookie(&self) -> Option<String> {
        self.password.as_ref().map(|password| {
            format!("{}={}; Path={}; HttpOnly; SameSite=Strict", SESSION_COOKIE, to_hex(password), COOKIE_PATH)
        })
    }

    pub fn logout_cookie() -> String {
        format!("{}=; Path={}; HttpOnly; SameSite=Strict; Max-Age=0", SESSION_COOKIE, COOKIE_PATH)
    }
}
