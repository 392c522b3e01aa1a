//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts >= 0, status codes, record types)
//! - Check that each module carries what its prober needs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::{Config, Module, ProberKind};
use crate::prober::dns::{rcode_from_name, record_type_from_name};
use crate::prober::icmp::MAX_PAYLOAD_SIZE;

/// A single semantic problem in a module definition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("module name must not be empty")]
    EmptyModuleName,

    #[error("module {module:?}: timeout_secs must be a non-negative number, got {value}")]
    InvalidTimeout { module: String, value: f64 },

    #[error("module {module:?}: invalid HTTP method {method:?}")]
    InvalidMethod { module: String, method: String },

    #[error("module {module:?}: invalid HTTP status code {code}")]
    InvalidStatusCode { module: String, code: u16 },

    #[error("module {module:?}: dns prober requires query_name")]
    MissingQueryName { module: String },

    #[error("module {module:?}: unknown DNS record type {value:?}")]
    UnknownRecordType { module: String, value: String },

    #[error("module {module:?}: unknown DNS rcode {value:?}")]
    UnknownRcode { module: String, value: String },

    #[error("module {module:?}: icmp payload_size {size} exceeds {max}")]
    PayloadTooLarge { module: String, size: usize, max: usize },
}

/// Validate every module in the configuration.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let errors: Vec<ValidationError> = config
        .modules
        .iter()
        .flat_map(|(name, module)| module_errors(name, module))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a single module, e.g. after an inline override was merged.
pub fn validate_module(name: &str, module: &Module) -> Result<(), Vec<ValidationError>> {
    let errors = module_errors(name, module);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn module_errors(name: &str, module: &Module) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let owned = || name.to_string();

    if name.trim().is_empty() {
        errors.push(ValidationError::EmptyModuleName);
    }

    if !module.timeout_secs.is_finite() || module.timeout_secs < 0.0 {
        errors.push(ValidationError::InvalidTimeout {
            module: owned(),
            value: module.timeout_secs,
        });
    }

    // Protocol tables of other probers are ignored, so only check the active one.
    match module.prober {
        ProberKind::Http => {
            if reqwest::Method::from_bytes(module.http.method.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    module: owned(),
                    method: module.http.method.clone(),
                });
            }
            for &code in &module.http.valid_status_codes {
                if !(100..=599).contains(&code) {
                    errors.push(ValidationError::InvalidStatusCode { module: owned(), code });
                }
            }
        }
        ProberKind::Dns => {
            if module.dns.query_name.trim().is_empty() {
                errors.push(ValidationError::MissingQueryName { module: owned() });
            }
            if record_type_from_name(&module.dns.query_type).is_none() {
                errors.push(ValidationError::UnknownRecordType {
                    module: owned(),
                    value: module.dns.query_type.clone(),
                });
            }
            for rcode in &module.dns.valid_rcodes {
                if rcode_from_name(rcode).is_none() {
                    errors.push(ValidationError::UnknownRcode {
                        module: owned(),
                        value: rcode.clone(),
                    });
                }
            }
        }
        ProberKind::Icmp => {
            if module.icmp.payload_size > MAX_PAYLOAD_SIZE {
                errors.push(ValidationError::PayloadTooLarge {
                    module: owned(),
                    size: module.icmp.payload_size,
                    max: MAX_PAYLOAD_SIZE,
                });
            }
        }
        ProberKind::Tcp => {}
    }

    errors
}
