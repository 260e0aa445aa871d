//! Batch validation engine.
//!
//! Validation is batch, never fail-fast: every check runs regardless of
//! earlier failures and all problems come back together in one
//! [`ValidationResult`]. An operator fixing a multi-field input file gets
//! every problem from one run instead of a guess-and-recheck loop.
//!
//! Three layers, each independently callable for unit testing:
//! [`address`] (syntax), [`topology`] (pools, VLANs, references) and
//! [`config`] (whole-tree orchestration plus mode-dependent fields).

pub mod address;
pub mod config;
pub mod topology;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::NetworkConfig;

/// Category of a validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// Malformed IPv4 address.
    InvalidAddress,
    /// Malformed CIDR network.
    InvalidCidr,
    /// Prefix length outside 0-32.
    InvalidPrefix,
    /// A field the current mode requires is absent.
    MissingField,
    /// A field the current mode forbids is present.
    UnexpectedField,
    /// DHCP pool start is after pool end.
    InvalidPoolRange,
    /// DHCP pool reaches outside the enclosing subnet.
    PoolOutsideSubnet,
    /// The subnet gateway falls inside the DHCP pool.
    GatewayInsidePool,
    /// VLAN id outside 1-4094.
    VlanIdOutOfRange,
    /// VLAN id appears more than once.
    DuplicateVlanId,
    /// VLAN id reserved by policy.
    ReservedVlanId,
    /// Two subnets overlap.
    OverlappingSubnets,
    /// A wireless network references a VLAN id that does not exist.
    DanglingVlanReference,
    /// Password fails the strength rules.
    WeakPassword,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationErrorKind::InvalidAddress => "invalid address",
            ValidationErrorKind::InvalidCidr => "invalid cidr",
            ValidationErrorKind::InvalidPrefix => "invalid prefix",
            ValidationErrorKind::MissingField => "missing field",
            ValidationErrorKind::UnexpectedField => "unexpected field",
            ValidationErrorKind::InvalidPoolRange => "invalid pool range",
            ValidationErrorKind::PoolOutsideSubnet => "pool outside subnet",
            ValidationErrorKind::GatewayInsidePool => "gateway inside pool",
            ValidationErrorKind::VlanIdOutOfRange => "vlan id out of range",
            ValidationErrorKind::DuplicateVlanId => "duplicate vlan id",
            ValidationErrorKind::ReservedVlanId => "reserved vlan id",
            ValidationErrorKind::OverlappingSubnets => "overlapping subnets",
            ValidationErrorKind::DanglingVlanReference => "dangling vlan reference",
            ValidationErrorKind::WeakPassword => "weak password",
        };
        f.write_str(name)
    }
}

/// One validation problem: category, field path, offending value, message
/// and an optional remediation suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Dotted field path (e.g. "lan.dhcp.pool", "vlans[1].id").
    pub field: String,
    /// The value as the reader delivered it.
    pub value: String,
    pub message: String,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} = '{}': {}",
            self.kind, self.field, self.value, self.message
        )?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

/// Accumulator threaded through every validator layer.
///
/// Layers only ever push; the orchestrator merges and converts to a
/// [`ValidationResult`] at the end. This keeps the "batch, never fail-fast"
/// contract explicit and testable per layer.
#[derive(Debug, Default)]
pub struct Problems {
    errors: Vec<ValidationError>,
}

impl Problems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem.
    pub fn push(
        &mut self,
        kind: ValidationErrorKind,
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(ValidationError {
            kind,
            field: field.into(),
            value: value.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    /// Record a problem with a remediation suggestion.
    pub fn push_suggesting(
        &mut self,
        kind: ValidationErrorKind,
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.errors.push(ValidationError {
            kind,
            field: field.into(),
            value: value.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    /// Absorb another accumulator.
    pub fn merge(&mut self, other: Problems) {
        self.errors.extend(other.errors);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Problems recorded so far.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Finish accumulation.
    pub fn into_result(self) -> ValidationResult {
        ValidationResult {
            is_valid: self.errors.is_empty(),
            errors: self.errors,
        }
    }
}

/// Outcome of validating a whole config: validity flag plus *every*
/// problem found, never just the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff `errors` is empty.
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Errors of one kind, for targeted assertions and reporting.
    pub fn of_kind(&self, kind: ValidationErrorKind) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.kind == kind).collect()
    }

    /// Errors whose field path starts with the given prefix.
    pub fn for_field(&self, prefix: &str) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.field.starts_with(prefix))
            .collect()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid {
            return write!(f, "configuration is valid");
        }
        writeln!(f, "{} validation error(s):", self.errors.len())?;
        for error in &self.errors {
            writeln!(f, "  {error}")?;
        }
        Ok(())
    }
}

/// Policy knobs for checks that depend on the operator's environment.
#[derive(Debug, Clone, Default)]
pub struct ValidationPolicy {
    /// VLAN ids that may not be assigned (e.g. a native/management VLAN the
    /// platform claims for itself). Empty by default.
    pub reserved_vlan_ids: Vec<u16>,
}

/// Validate a complete config under the default policy.
pub fn validate(config: &NetworkConfig) -> ValidationResult {
    validate_with_policy(config, &ValidationPolicy::default())
}

/// Validate a complete config under an explicit policy.
pub fn validate_with_policy(
    config: &NetworkConfig,
    policy: &ValidationPolicy,
) -> ValidationResult {
    let mut problems = Problems::new();
    config::check_config(config, policy, &mut problems);
    problems.into_result()
}
