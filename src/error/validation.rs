//! Convenience constructors for validation-kind errors
//!
//! These are raised at resource construction or availability-check time, i.e.
//! before any host mutation.

use super::HomesteadError;

/// Create an UnknownResourceType error
pub fn unknown_resource_type(tag: impl Into<String>) -> HomesteadError {
    HomesteadError::UnknownResourceType { tag: tag.into() }
}

/// Create an InvalidProperty error
pub fn invalid_property(
    type_tag: impl Into<String>,
    property: impl Into<String>,
    reason: impl Into<String>,
) -> HomesteadError {
    HomesteadError::InvalidProperty {
        type_tag: type_tag.into(),
        property: property.into(),
        reason: reason.into(),
    }
}

/// Create an InvalidSizeToken error
pub fn invalid_size_token(
    type_tag: impl Into<String>,
    property: impl Into<String>,
    token: impl Into<String>,
) -> HomesteadError {
    HomesteadError::InvalidSizeToken {
        type_tag: type_tag.into(),
        property: property.into(),
        token: token.into(),
    }
}

/// Create a MissingSetting error
pub fn missing_setting(key: impl Into<String>) -> HomesteadError {
    HomesteadError::MissingSetting { key: key.into() }
}

/// Create an InsufficientSpace error
pub fn insufficient_space(
    mount: impl Into<String>,
    required: u64,
    available: u64,
) -> HomesteadError {
    HomesteadError::InsufficientSpace {
        mount: mount.into(),
        required,
        available,
    }
}

/// Create an InsufficientMemory error
pub fn insufficient_memory(required: u64, available: u64) -> HomesteadError {
    HomesteadError::InsufficientMemory {
        required,
        available,
    }
}

/// Create a ConflictingRoute error
pub fn conflicting_route(
    domain: impl Into<String>,
    path: impl Into<String>,
    held_by: impl Into<String>,
) -> HomesteadError {
    HomesteadError::ConflictingRoute {
        domain: domain.into(),
        path: path.into(),
        held_by: held_by.into(),
    }
}

/// Create a UserAlreadyExists error
pub fn user_already_exists(username: impl Into<String>) -> HomesteadError {
    HomesteadError::UserAlreadyExists {
        username: username.into(),
    }
}

/// Create a GroupAlreadyExists error
pub fn group_already_exists(username: impl Into<String>) -> HomesteadError {
    HomesteadError::GroupAlreadyExists {
        username: username.into(),
    }
}

/// Create a DirAlreadyExists error
pub fn dir_already_exists(path: impl Into<String>) -> HomesteadError {
    HomesteadError::DirAlreadyExists { path: path.into() }
}

/// Create a PackageUnavailable error
pub fn package_unavailable(package: impl Into<String>) -> HomesteadError {
    HomesteadError::PackageUnavailable {
        package: package.into(),
    }
}

/// Create a SourceUnreachable error
pub fn source_unreachable(url: impl Into<String>, reason: impl Into<String>) -> HomesteadError {
    HomesteadError::SourceUnreachable {
        url: url.into(),
        reason: reason.into(),
    }
}

/// Create a StaleCachedArtifact error
pub fn stale_cached_artifact(
    url: impl Into<String>,
    expected: impl Into<String>,
    actual: impl Into<String>,
) -> HomesteadError {
    HomesteadError::StaleCachedArtifact {
        url: url.into(),
        expected: expected.into(),
        actual: actual.into(),
    }
}

/// Create an EngineUnavailable error
pub fn engine_unavailable(engine: impl Into<String>) -> HomesteadError {
    HomesteadError::EngineUnavailable {
        engine: engine.into(),
    }
}
