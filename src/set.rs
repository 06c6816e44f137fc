//! Per-app resource set orchestration
//!
//! An [`AppResourceSet`] holds one app's configured resources in manifest
//! declaration order. Availability is checked across the whole set with every
//! failure collected, so the operator sees all problems at once. Provisioning
//! walks the declared order; removal walks it in reverse, tearing down in the
//! opposite direction dependencies were built. A mid-pass provisioning
//! failure rolls the already-applied prefix back, leaving the host as it was.

use std::fmt;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::context::{AppAction, CheckContext, ProvisioningContext};
use crate::error::{AvailabilityFailure, HomesteadError, Result};
use crate::host::HostServices;
use crate::properties::PropertyMap;
use crate::registry::ResourceTypeRegistry;
use crate::resource::AppResource;
use crate::settings::Settings;

/// Knobs for an [`AppResourceSet::apply`] pass
pub struct ApplyOptions {
    /// Deprovision the already-applied prefix when a provisioning step fails
    pub rollback_on_failure: bool,
    /// Budget for a single lifecycle call; blocking calls cannot be
    /// preempted, so overruns are detected after the call returns and
    /// reported as fatal.
    pub call_timeout: Duration,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            rollback_on_failure: true,
            call_timeout: Duration::from_secs(300),
        }
    }
}

/// One app's resources, in manifest declaration order
pub struct AppResourceSet {
    app_id: String,
    resources: Vec<Box<dyn AppResource>>,
}

impl fmt::Debug for AppResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppResourceSet")
            .field("app_id", &self.app_id)
            .field(
                "resources",
                &self
                    .resources
                    .iter()
                    .map(|r| r.type_tag())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl AppResourceSet {
    /// Build every resource the manifest declares. Fails on the first unknown
    /// tag or invalid property, aborting the whole load.
    pub fn from_manifest(
        app_id: &str,
        manifest: &IndexMap<String, PropertyMap>,
        registry: &ResourceTypeRegistry,
    ) -> Result<Self> {
        let mut resources = Vec::with_capacity(manifest.len());
        for (tag, overrides) in manifest {
            resources.push(registry.instantiate(app_id, tag, overrides)?);
        }
        Ok(Self {
            app_id: app_id.to_string(),
            resources,
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Run every resource's read-only availability check and aggregate all
    /// failures into one error, so a manifest with several unsatisfiable
    /// requirements reports them together.
    pub fn check_availability(
        &self,
        host: &HostServices<'_>,
        settings: &Settings,
    ) -> Result<()> {
        let ctx = CheckContext {
            app_id: &self.app_id,
            settings,
        };
        let mut failures = Vec::new();
        for resource in &self.resources {
            if let Err(error) = resource.check_availability(host, &ctx) {
                failures.push(AvailabilityFailure {
                    type_tag: resource.type_tag().to_string(),
                    error: Box::new(error),
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HomesteadError::ResourcesUnavailable { failures })
        }
    }

    /// Run one lifecycle pass over the whole set.
    ///
    /// Install, upgrade and restore provision in declared order; remove
    /// deprovisions in reverse declared order, continuing past individual
    /// failures so as much as possible is cleaned up (the first failure is
    /// still reported).
    pub fn apply(
        &self,
        host: &HostServices<'_>,
        action: AppAction,
        settings: &mut Settings,
        options: &ApplyOptions,
    ) -> Result<()> {
        if action.provisions() {
            self.provision_all(host, action, settings, options)
        } else {
            self.deprovision_all(host, settings, options)
        }
    }

    fn provision_all(
        &self,
        host: &HostServices<'_>,
        action: AppAction,
        settings: &mut Settings,
        options: &ApplyOptions,
    ) -> Result<()> {
        for (index, resource) in self.resources.iter().enumerate() {
            info!(
                app = %self.app_id,
                resource = resource.type_tag(),
                %action,
                "provisioning"
            );
            let outcome = {
                let mut ctx = ProvisioningContext {
                    app_id: &self.app_id,
                    action,
                    settings: &mut *settings,
                };
                timed(resource.as_ref(), options.call_timeout, || {
                    resource.provision_or_update(host, &mut ctx)
                })
            };
            if let Err(error) = outcome {
                if options.rollback_on_failure {
                    // The failing step may have partially applied; include it
                    // in the teardown.
                    self.rollback(host, action, settings, index);
                }
                return Err(error);
            }
        }
        Ok(())
    }

    /// Deprovision resources `0..=last` in reverse order, continuing past
    /// failures.
    fn rollback(
        &self,
        host: &HostServices<'_>,
        action: AppAction,
        settings: &mut Settings,
        last: usize,
    ) {
        warn!(app = %self.app_id, "provisioning failed, rolling back");
        for resource in self.resources[..=last].iter().rev() {
            let mut ctx = ProvisioningContext {
                app_id: &self.app_id,
                action,
                settings: &mut *settings,
            };
            if let Err(error) = resource.deprovision(host, &mut ctx) {
                warn!(
                    app = %self.app_id,
                    resource = resource.type_tag(),
                    %error,
                    "rollback step failed"
                );
            }
        }
    }

    fn deprovision_all(
        &self,
        host: &HostServices<'_>,
        settings: &mut Settings,
        options: &ApplyOptions,
    ) -> Result<()> {
        let mut first_error = None;
        for resource in self.resources.iter().rev() {
            info!(app = %self.app_id, resource = resource.type_tag(), "deprovisioning");
            let outcome = {
                let mut ctx = ProvisioningContext {
                    app_id: &self.app_id,
                    action: AppAction::Remove,
                    settings: &mut *settings,
                };
                timed(resource.as_ref(), options.call_timeout, || {
                    resource.deprovision(host, &mut ctx)
                })
            };
            if let Err(error) = outcome {
                warn!(
                    app = %self.app_id,
                    resource = resource.type_tag(),
                    %error,
                    "deprovision step failed, continuing"
                );
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}

/// Run a lifecycle call and convert a budget overrun into a fatal error.
fn timed(
    resource: &dyn AppResource,
    budget: Duration,
    call: impl FnOnce() -> Result<()>,
) -> Result<()> {
    let started = Instant::now();
    let outcome = call();
    let elapsed = started.elapsed();
    if elapsed > budget {
        return Err(HomesteadError::LifecycleTimeout {
            type_tag: resource.type_tag().to_string(),
            elapsed_secs: elapsed.as_secs(),
            budget_secs: budget.as_secs(),
        });
    }
    outcome
}
