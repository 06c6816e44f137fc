//! Resource construction from manifest declarations
//!
//! Covers registry lookup, shallow override semantics and `__APP__`
//! placeholder expansion as seen through the public API.

mod common;

use homestead::{AppAction, ApplyOptions, AppResourceSet, ResourceTypeRegistry, Settings};
use serde_json::json;

#[test]
fn test_unknown_type_tag_aborts_manifest_loading() {
    let registry = ResourceTypeRegistry::builtin();
    let manifest = common::manifest(&[("disk", json!({})), ("gpu", json!({}))]);

    let err = AppResourceSet::from_manifest(common::APP, &manifest, &registry)
        .expect_err("unknown tag must fail the whole load");
    assert!(err.to_string().contains("gpu"));
    assert!(err.is_validation());
}

#[test]
fn test_invalid_override_fails_at_construction() {
    let registry = ResourceTypeRegistry::builtin();

    // Size token absent from the size table
    let manifest = common::manifest(&[("disk", json!({ "space": "3G" }))]);
    assert!(AppResourceSet::from_manifest(common::APP, &manifest, &registry).is_err());

    // Wrong property type
    let manifest = common::manifest(&[("ram", json!({ "include_swap": "yes" }))]);
    assert!(AppResourceSet::from_manifest(common::APP, &manifest, &registry).is_err());
}

#[test]
fn test_overrides_never_mutate_the_type_defaults() {
    let registry = ResourceTypeRegistry::builtin();

    // Instantiate with an override...
    registry
        .instantiate(
            common::APP,
            "install_dir",
            &common::manifest(&[("install_dir", json!({ "dir": "/opt/custom" }))])["install_dir"],
        )
        .expect("override instance");

    // ...the descriptor still hands out the pristine defaults
    let defaults = registry
        .lookup("install_dir")
        .expect("registered type")
        .default_properties();
    assert_eq!(defaults["dir"], json!("/var/www/__APP__"));

    // and a second instance built without overrides behaves per the default
    let host = common::host();
    let set = common::resource_set(&[("install_dir", json!({}))]);
    let mut settings = Settings::new();
    set.apply(
        &host.services(),
        AppAction::Install,
        &mut settings,
        &ApplyOptions::default(),
    )
    .expect("install");
    assert_eq!(settings.get_str("installdir"), Some("/var/www/myapp"));
}

#[test]
fn test_overrides_replace_whole_values() {
    // Overriding "main" with just a url drops the default sha256sum and
    // predownload keys; parsing falls back to their defaults.
    let host = common::host();
    host.add_remote_artifact("https://example.org/app.tar.gz", b"tarball");

    let set = common::resource_set(&[(
        "sources",
        json!({ "main": { "url": "https://example.org/app.tar.gz" } }),
    )]);
    let mut settings = Settings::new();
    set.apply(
        &host.services(),
        AppAction::Install,
        &mut settings,
        &ApplyOptions::default(),
    )
    .expect("predownload defaults to true");
    assert!(host.cached_artifact_bytes(common::APP, "main").is_some());
}

#[test]
fn test_app_placeholder_expands_in_defaults_and_overrides() {
    let host = common::host();
    let set = common::resource_set(&[
        ("system_user", json!({})),
        ("install_dir", json!({ "dir": "/srv/__APP__/www" })),
    ]);

    let mut settings = Settings::new();
    set.apply(
        &host.services(),
        AppAction::Install,
        &mut settings,
        &ApplyOptions::default(),
    )
    .expect("install");

    // Default username __APP__ and the overridden dir both expanded
    assert!(host.has_user("myapp"));
    assert_eq!(settings.get_str("installdir"), Some("/srv/myapp/www"));
}

#[test]
fn test_declaration_order_is_preserved() {
    let host = common::host();
    let set = common::resource_set(&[
        ("install_dir", json!({})),
        ("system_user", json!({})),
    ]);

    let mut settings = Settings::new();
    set.apply(
        &host.services(),
        AppAction::Install,
        &mut settings,
        &ApplyOptions::default(),
    )
    .expect("install");

    let journal = host.journal();
    let mkdir = journal.iter().position(|e| e.starts_with("mkdir")).unwrap();
    let useradd = journal
        .iter()
        .position(|e| e.starts_with("useradd"))
        .unwrap();
    assert!(mkdir < useradd, "resources run in declared order");
}
