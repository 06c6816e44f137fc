//! Database resource
//!
//! Provisions a database and same-named owner account on one of the supported
//! engines, recording the connection settings for the app's scripts. The
//! database name is the app id with characters the engines reject mapped to
//! underscores; the password is generated once and reused on every later pass.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::json;

use crate::context::{CheckContext, ProvisioningContext};
use crate::error::{Result, engine_unavailable, invalid_property};
use crate::host::{DbEngine, HostServices};
use crate::properties::{self, PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::AppResource;

pub const TYPE: &str = "db";

const PASSWORD_LEN: usize = 24;

fn default_properties() -> PropertyMap {
    properties::object(json!({ "type": "mysql" }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(DatabaseResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct DatabaseResource {
    engine: DbEngine,
}

/// App ids may contain `-` and `.`, database names may not.
fn db_name_for(app_id: &str) -> String {
    app_id.replace(['-', '.'], "_")
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}

impl DatabaseResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        let engine = match props.str("type")?.as_str() {
            "mysql" => DbEngine::Mysql,
            "postgresql" => DbEngine::Postgresql,
            other => {
                return Err(invalid_property(
                    TYPE,
                    "type",
                    format!("unsupported engine {other:?}, expected \"mysql\" or \"postgresql\""),
                ));
            }
        };
        Ok(Self { engine })
    }
}

impl AppResource for DatabaseResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn check_availability(&self, host: &HostServices<'_>, _ctx: &CheckContext<'_>) -> Result<()> {
        if !host.databases.engine_available(self.engine)? {
            return Err(engine_unavailable(self.engine.to_string()));
        }
        Ok(())
    }

    fn provision_or_update(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        let name = db_name_for(ctx.app_id);
        let password = match ctx.settings.get_str("db_pwd") {
            Some(pwd) => pwd.to_string(),
            None => generate_password(),
        };

        ctx.settings.set("db_name", name.clone());
        ctx.settings.set("db_user", name.clone());
        ctx.settings.set("db_pwd", password.clone());

        if !host.databases.database_exists(self.engine, &name)? {
            host.databases
                .create_database(self.engine, &name, &name, &password)?;
        }
        Ok(())
    }

    fn deprovision(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        let name = db_name_for(ctx.app_id);
        if host.databases.database_exists(self.engine, &name)? {
            host.databases.drop_database(self.engine, &name, &name)?;
        }
        ctx.settings.remove("db_name");
        ctx.settings.remove("db_user");
        ctx.settings.remove("db_pwd");
        Ok(())
    }
}
