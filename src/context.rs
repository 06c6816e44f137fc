//! Lifecycle context passed to every resource call
//!
//! A fresh context is created per pass and discarded afterwards; it borrows
//! the externally persisted settings store, it never owns it. Availability
//! checks receive a [`CheckContext`] with shared access only, so the type
//! system rules out settings mutation during preflight.

use std::fmt;

use crate::settings::Settings;

/// The app lifecycle action driving a provisioning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Install,
    Upgrade,
    Restore,
    Remove,
}

impl AppAction {
    /// Actions that run `provision_or_update` on every resource
    pub fn provisions(self) -> bool {
        !matches!(self, Self::Remove)
    }
}

impl fmt::Display for AppAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Upgrade => "upgrade",
            Self::Restore => "restore",
            Self::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// Read-only context for availability checks
pub struct CheckContext<'a> {
    pub app_id: &'a str,
    pub settings: &'a Settings,
}

/// Mutable context for provision/deprovision passes
pub struct ProvisioningContext<'a> {
    pub app_id: &'a str,
    pub action: AppAction,
    pub settings: &'a mut Settings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(AppAction::Install.to_string(), "install");
        assert_eq!(AppAction::Remove.to_string(), "remove");
    }

    #[test]
    fn test_provisions() {
        assert!(AppAction::Install.provisions());
        assert!(AppAction::Upgrade.provisions());
        assert!(AppAction::Restore.provisions());
        assert!(!AppAction::Remove.provisions());
    }
}
