//! Upstream source artifact resource
//!
//! Declares the artifacts an app is built from, keyed by source name. The
//! preflight check probes every URL and, when an artifact is already cached,
//! verifies its checksum against the declared one. Provisioning predownloads
//! sources into the artifact cache so a later build step works offline.
//!
//! Parsing is deliberately lenient: overrides replace the whole per-source
//! mapping, so only `url` is mandatory and the other keys fall back to their
//! defaults when an override drops them. There are no default sources; a
//! declaration without any named source is valid and provisions nothing.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::context::{CheckContext, ProvisioningContext};
use crate::error::{Result, checksum_mismatch, invalid_property, stale_cached_artifact};
use crate::host::HostServices;
use crate::properties::{PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::AppResource;

pub const TYPE: &str = "sources";

fn default_properties() -> PropertyMap {
    PropertyMap::new()
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(SourcesResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

/// One declared source artifact
#[derive(Debug)]
struct Source {
    name: String,
    url: String,
    sha256sum: Option<String>,
    predownload: bool,
}

#[derive(Debug)]
pub struct SourcesResource {
    sources: Vec<Source>,
}

/// Hex-encoded sha256 of a byte slice, for artifact verification.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_source(name: &str, spec: &PropertyMap) -> Result<Source> {
    let url = match spec.get("url") {
        Some(Value::String(url)) if !url.is_empty() => url.clone(),
        _ => {
            return Err(invalid_property(
                TYPE,
                name,
                "source needs a non-empty string `url`",
            ));
        }
    };

    let sha256sum = match spec.get("sha256sum") {
        None | Some(Value::Null) => None,
        Some(Value::String(sum)) if sum.is_empty() => None,
        Some(Value::String(sum)) if is_hex_digest(sum) => Some(sum.to_ascii_lowercase()),
        Some(_) => {
            return Err(invalid_property(
                TYPE,
                name,
                "`sha256sum` must be a 64-character hex digest",
            ));
        }
    };

    let predownload = match spec.get("predownload") {
        None => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(invalid_property(
                TYPE,
                name,
                "`predownload` must be a boolean",
            ));
        }
    };

    Ok(Source {
        name: name.to_string(),
        url,
        sha256sum,
        predownload,
    })
}

impl SourcesResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        let mut sources = Vec::new();
        for name in properties.keys() {
            let spec = props.map(name)?;
            sources.push(parse_source(name, spec)?);
        }
        Ok(Self { sources })
    }
}

impl AppResource for SourcesResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn check_availability(&self, host: &HostServices<'_>, ctx: &CheckContext<'_>) -> Result<()> {
        for source in &self.sources {
            host.sources.probe(&source.url)?;
            // A stale cached artifact would poison the later build step
            if let Some(expected) = &source.sha256sum {
                if let Some(bytes) = host.sources.cached_artifact(ctx.app_id, &source.name)? {
                    let actual = sha256_hex(&bytes);
                    if actual != *expected {
                        return Err(stale_cached_artifact(&source.url, expected, actual));
                    }
                }
            }
        }
        Ok(())
    }

    fn provision_or_update(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        for source in &self.sources {
            if !source.predownload {
                continue;
            }
            let bytes = host.sources.fetch(ctx.app_id, &source.name, &source.url)?;
            if let Some(expected) = &source.sha256sum {
                let actual = sha256_hex(&bytes);
                if actual != *expected {
                    return Err(checksum_mismatch(&source.url, expected, actual));
                }
            }
        }
        Ok(())
    }

    fn deprovision(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        host.sources.evict(ctx.app_id)
    }
}
