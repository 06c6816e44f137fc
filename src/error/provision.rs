//! Convenience constructors for provisioning-kind errors
//!
//! These signal a failed host mutation during provision or deprovision.

use super::HomesteadError;

/// Create a PortExhausted error
pub fn port_exhausted(first: u16) -> HomesteadError {
    HomesteadError::PortExhausted { first }
}

/// Create a ChecksumMismatch error
pub fn checksum_mismatch(
    url: impl Into<String>,
    expected: impl Into<String>,
    actual: impl Into<String>,
) -> HomesteadError {
    HomesteadError::ChecksumMismatch {
        url: url.into(),
        expected: expected.into(),
        actual: actual.into(),
    }
}

/// Create a ProvisionFailed error
pub fn provision_failed(type_tag: impl Into<String>, reason: impl Into<String>) -> HomesteadError {
    HomesteadError::ProvisionFailed {
        type_tag: type_tag.into(),
        reason: reason.into(),
    }
}

/// Create a DeprovisionFailed error
pub fn deprovision_failed(
    type_tag: impl Into<String>,
    reason: impl Into<String>,
) -> HomesteadError {
    HomesteadError::DeprovisionFailed {
        type_tag: type_tag.into(),
        reason: reason.into(),
    }
}

/// Create a HostIo error from a failed collaborator call
pub fn host_io(operation: impl Into<String>, reason: impl ToString) -> HomesteadError {
    HomesteadError::HostIo {
        operation: operation.into(),
        reason: reason.to_string(),
    }
}
