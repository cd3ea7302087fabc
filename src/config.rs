//! Controller configuration: role, link, and section lookups over a
//! statically-typed, deserializable configuration document.

use crate::error::FixError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An opaque, application-defined bag of settings for one named role
/// (e.g. `"buy-side"`, `"exchange"`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Role {
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

/// A connection between two roles, describing the session-level wire
/// parameters used to build a [`crate::session::SessionConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    #[serde(rename = "acts-as-server")]
    pub acts_as_server: String,
    pub roles: Vec<String>,
    pub protocol_version: String,
    pub header_fields: Vec<u32>,
    pub binary_fields: Vec<u32>,
    pub required_fields: Vec<u32>,
    #[serde(default)]
    pub group_fields: HashMap<u32, Vec<u32>>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_max_length() -> usize {
    2048
}

/// A free-form named section, for anything not covered by roles/links.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Section {
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ControllerConfig {
    #[serde(default, rename = "ROLES")]
    roles: HashMap<String, Role>,
    #[serde(default, rename = "CONNECTIONS")]
    connections: Vec<Link>,
    #[serde(default, flatten)]
    sections: HashMap<String, Section>,
}

impl ControllerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, FixError> {
        serde_json::from_str(s).map_err(|e| FixError::InvalidConfig(e.to_string()))
    }

    pub fn from_map(roles: HashMap<String, Role>, connections: Vec<Link>) -> Self {
        Self {
            roles,
            connections,
            sections: HashMap::new(),
        }
    }

    /// A deep copy of the named role's settings.
    pub fn get_role(&self, role_name: &str) -> Result<Role, FixError> {
        self.roles
            .get(role_name)
            .cloned()
            .ok_or_else(|| FixError::InvalidConfig(format!("no such role: {role_name}")))
    }

    /// The link where both `client_role` and `server_role` participate,
    /// `acts-as-server` equals `server_role`, and `protocol` matches.
    pub fn get_link(&self, client_role: &str, server_role: &str, protocol_name: &str) -> Result<Link, FixError> {
        self.connections
            .iter()
            .find(|link| {
                link.protocol == protocol_name
                    && link.acts_as_server == server_role
                    && link.roles.iter().any(|r| r == client_role)
                    && link.roles.iter().any(|r| r == server_role)
            })
            .cloned()
            .ok_or_else(|| {
                FixError::InvalidConfig(format!(
                    "no link between {client_role} and {server_role} for protocol {protocol_name}"
                ))
            })
    }

    pub fn get_section(&self, section_name: &str) -> Result<Section, FixError> {
        self.sections
            .get(section_name)
            .cloned()
            .ok_or_else(|| FixError::InvalidConfig(format!("no such section: {section_name}")))
    }
}
