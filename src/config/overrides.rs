//! Per-request module overrides.
//!
//! A scrape may carry a TOML fragment in its `config` query parameter. The
//! fragment is deep-merged onto a copy of the resolved module; the shared
//! configuration is never touched.

use toml::{Table, Value};

use crate::config::schema::Module;
use crate::config::validation::{validate_module, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("failed to parse module override: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode module: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid module override: {}", join(.0))]
    Invalid(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Module {
    /// Return a copy of this module with `fragment` merged on top.
    ///
    /// Tables merge key by key; any other value replaces the base value.
    pub fn with_override(&self, name: &str, fragment: &str) -> Result<Module, OverrideError> {
        let patch: Table = fragment.parse()?;
        let mut base = Value::try_from(self)?;
        if let Value::Table(table) = &mut base {
            merge_tables(table, patch);
        }

        let merged: Module = base.try_into()?;
        validate_module(name, &merged).map_err(OverrideError::Invalid)?;
        Ok(merged)
    }
}

fn merge_tables(base: &mut Table, patch: Table) {
    for (key, value) in patch {
        let Value::Table(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        base.insert(key, Value::Table(incoming));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProberKind;

    #[test]
    fn test_override_merges_nested_fields() {
        let mut base = Module::new(ProberKind::Http).with_timeout_secs(5.0);
        base.http.headers.insert("Host".into(), "example.com".into());

        let merged = base
            .with_override("http_2xx", "timeout_secs = 2.0\n[http]\nmethod = \"HEAD\"")
            .unwrap();

        assert_eq!(merged.timeout_secs, 2.0);
        assert_eq!(merged.http.method, "HEAD");
        assert_eq!(merged.http.headers.get("Host").map(String::as_str), Some("example.com"));
        // The base is a template and stays as it was.
        assert_eq!(base.http.method, "GET");
        assert_eq!(base.timeout_secs, 5.0);
    }

    #[test]
    fn test_override_can_switch_prober() {
        let base = Module::new(ProberKind::Http);
        let merged = base.with_override("m", "prober = \"tcp\"").unwrap();
        assert_eq!(merged.prober, ProberKind::Tcp);
    }

    #[test]
    fn test_malformed_override_is_parse_error() {
        let base = Module::new(ProberKind::Http);
        let err = base.with_override("m", "timeout_secs = = 1").unwrap_err();
        assert!(matches!(err, OverrideError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse module override"));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let base = Module::new(ProberKind::Http);
        let err = base.with_override("m", "timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, OverrideError::Parse(_)));
    }

    #[test]
    fn test_override_is_validated() {
        let base = Module::new(ProberKind::Http);
        let err = base.with_override("m", "timeout_secs = -3.0").unwrap_err();
        assert!(matches!(err, OverrideError::Invalid(_)));
    }

    #[test]
    fn test_oversized_icmp_payload_is_rejected() {
        let base = Module::new(ProberKind::Http);
        let err = base
            .with_override(
                "http_2xx",
                "prober = \"icmp\"\n[icmp]\npayload_size = 9223372036854775807",
            )
            .unwrap_err();
        let OverrideError::Invalid(errors) = err else {
            panic!("expected a validation error, got {err}");
        };
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::PayloadTooLarge { .. }]
        ));

        let merged = base
            .with_override("http_2xx", "prober = \"icmp\"\n[icmp]\npayload_size = 65499")
            .unwrap();
        assert_eq!(merged.icmp.payload_size, 65499);
    }
}
