//! System account resource
//!
//! Creates the app's dedicated system user with its home directory, optional
//! login shell and supplementary groups. Group memberships are reconciled on
//! every provisioning pass so upgrades can change them.

use serde_json::json;

use crate::context::{CheckContext, ProvisioningContext};
use crate::error::{Result, group_already_exists, user_already_exists};
use crate::host::{HostServices, SystemUserSpec};
use crate::properties::{self, PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::AppResource;

pub const TYPE: &str = "system_user";

fn default_properties() -> PropertyMap {
    properties::object(json!({
        "username": "__APP__",
        "home_dir": "/var/www/__APP__",
        "use_shell": false,
        "groups": [],
    }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(SystemUserResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct SystemUserResource {
    spec: SystemUserSpec,
}

impl SystemUserResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        Ok(Self {
            spec: SystemUserSpec {
                username: props.str("username")?,
                home_dir: props.str("home_dir")?,
                use_shell: props.bool("use_shell")?,
                groups: props.str_list("groups")?,
            },
        })
    }
}

impl AppResource for SystemUserResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn check_availability(&self, host: &HostServices<'_>, _ctx: &CheckContext<'_>) -> Result<()> {
        if host.accounts.user_exists(&self.spec.username)? {
            return Err(user_already_exists(&self.spec.username));
        }
        if host.accounts.group_exists(&self.spec.username)? {
            return Err(group_already_exists(&self.spec.username));
        }
        Ok(())
    }

    fn provision_or_update(
        &self,
        host: &HostServices<'_>,
        _ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        if !host.accounts.user_exists(&self.spec.username)? {
            host.accounts.create_system_user(&self.spec)?;
        }
        host.accounts
            .set_user_groups(&self.spec.username, &self.spec.groups)?;
        Ok(())
    }

    fn deprovision(
        &self,
        host: &HostServices<'_>,
        _ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        if host.accounts.user_exists(&self.spec.username)? {
            host.accounts.delete_system_user(&self.spec.username)?;
        }
        // The primary group can outlive the account; drop it if still present
        if host.accounts.group_exists(&self.spec.username)? {
            host.accounts.delete_group(&self.spec.username)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::AppAction;
    use crate::host::fake::FakeHost;
    use crate::settings::Settings;

    fn resource(username: &str) -> SystemUserResource {
        let properties = properties::object(json!({
            "username": username,
            "home_dir": format!("/var/www/{username}"),
            "use_shell": false,
            "groups": ["www-data"],
        }));
        SystemUserResource::from_properties(&properties).unwrap()
    }

    #[test]
    fn test_availability_fails_on_existing_user_or_group() {
        let host = FakeHost::new();
        host.add_user("myapp");
        let settings = Settings::new();
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        let err = resource("myapp")
            .check_availability(&host.services(), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let host = FakeHost::new();
        host.add_group("myapp");
        let err = resource("myapp")
            .check_availability(&host.services(), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("group"));
    }

    #[test]
    fn test_provision_creates_account_once_and_reconciles_groups() {
        let host = FakeHost::new();
        let mut settings = Settings::new();
        let mut ctx = ProvisioningContext {
            app_id: "myapp",
            action: AppAction::Install,
            settings: &mut settings,
        };
        let user = resource("myapp");

        user.provision_or_update(&host.services(), &mut ctx).unwrap();
        assert!(host.has_user("myapp"));

        // Second pass must not attempt a second useradd
        user.provision_or_update(&host.services(), &mut ctx).unwrap();
        let useradds = host
            .journal()
            .iter()
            .filter(|e| e.starts_with("useradd"))
            .count();
        assert_eq!(useradds, 1);
    }

    #[test]
    fn test_deprovision_removes_user_then_group() {
        let host = FakeHost::new();
        let mut settings = Settings::new();
        let user = resource("myapp");

        {
            let mut install_ctx = ProvisioningContext {
                app_id: "myapp",
                action: AppAction::Install,
                settings: &mut settings,
            };
            user.provision_or_update(&host.services(), &mut install_ctx)
                .unwrap();
        }

        let mut ctx = ProvisioningContext {
            app_id: "myapp",
            action: AppAction::Remove,
            settings: &mut settings,
        };
        user.deprovision(&host.services(), &mut ctx).unwrap();
        assert!(!host.has_user("myapp"));
        assert!(!host.has_group("myapp"));
    }
}
