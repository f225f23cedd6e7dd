//! Rewrites `appId` and `productName` in `electron-builder.yml`.
//!
//! Top-level scalar lines are replaced in place so comments and layout of the
//! rest of the file survive. If the in-place edit does not round-trip (e.g. the
//! value was a block scalar), the document is re-serialized from the parsed
//! mapping instead.

use anyhow::{Context, Result, anyhow};
use regex::{NoExpand, Regex};
use serde_yaml::{Mapping, Value};

use super::targets::ELECTRON_BUILDER;
use super::types::{Patch, PatchOutcome};

/// Sets the installer identity fields.
#[derive(Debug, Clone)]
pub struct ElectronBuilderIdentity {
    pub app_id: String,
    pub product_name: String,
}

impl ElectronBuilderIdentity {
    fn fields(&self) -> [(&'static str, &str); 2] {
        [
            ("appId", self.app_id.as_str()),
            ("productName", self.product_name.as_str()),
        ]
    }
}

impl Patch for ElectronBuilderIdentity {
    fn name(&self) -> &str {
        "Update electron-builder.yml identity"
    }

    fn target(&self) -> &str {
        ELECTRON_BUILDER
    }

    fn apply(&self, contents: &str) -> Result<PatchOutcome> {
        let mapping = parse_mapping(contents)?;
        if self
            .fields()
            .iter()
            .all(|(key, value)| scalar(&mapping, key) == Some(*value))
        {
            return Ok(PatchOutcome::AlreadyApplied);
        }

        let mut patched = contents.to_string();
        for (key, value) in self.fields() {
            patched = set_top_level_line(&patched, key, value)?;
        }

        let reparsed = parse_mapping(&patched);
        let round_trips = reparsed.as_ref().is_ok_and(|mapping| {
            self.fields()
                .iter()
                .all(|(key, value)| scalar(mapping, key) == Some(*value))
        });
        if round_trips {
            return Ok(PatchOutcome::Applied(patched));
        }

        let mut mapping = mapping;
        for (key, value) in self.fields() {
            mapping.insert(Value::from(key), Value::from(value));
        }
        let dumped = serde_yaml::to_string(&mapping).context("serialize electron-builder.yml")?;
        Ok(PatchOutcome::Applied(dumped))
    }
}

fn parse_mapping(contents: &str) -> Result<Mapping> {
    let doc: Value =
        serde_yaml::from_str(contents).with_context(|| format!("parse {ELECTRON_BUILDER}"))?;
    match doc {
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(anyhow!("{ELECTRON_BUILDER}: top level is not a mapping")),
    }
}

fn scalar<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a str> {
    mapping.get(key).and_then(Value::as_str)
}

/// Replace the `key: ...` line at column zero, or append one if absent.
fn set_top_level_line(contents: &str, key: &str, value: &str) -> Result<String> {
    let rendered = serde_yaml::to_string(&Value::from(value))
        .with_context(|| format!("render yaml value for {key}"))?;
    let line = format!("{key}: {}", rendered.trim_end());

    let re = Regex::new(&format!(r"(?m)^{}:[^\r\n]*", regex::escape(key)))
        .with_context(|| format!("compile line regex for {key}"))?;
    if re.is_match(contents) {
        return Ok(re.replace(contents, NoExpand(&line)).into_owned());
    }

    let mut appended = contents.to_string();
    if !appended.is_empty() && !appended.ends_with('\n') {
        appended.push('\n');
    }
    appended.push_str(&line);
    appended.push('\n');
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ELECTRON_BUILDER_FIXTURE;

    fn identity() -> ElectronBuilderIdentity {
        ElectronBuilderIdentity {
            app_id: "com.acme.studio".to_string(),
            product_name: "Acme Studio".to_string(),
        }
    }

    #[test]
    fn replaces_identity_and_keeps_comments() {
        let PatchOutcome::Applied(patched) =
            identity().apply(ELECTRON_BUILDER_FIXTURE).expect("apply")
        else {
            panic!("expected changes");
        };
        assert!(patched.contains("appId: com.acme.studio\n"));
        assert!(patched.contains("productName: Acme Studio\n"));
        assert!(patched.contains("# Packaging configuration"));
        assert!(patched.contains("  executableName: Cherry Studio"));
    }

    #[test]
    fn matching_values_are_already_applied() {
        let PatchOutcome::Applied(patched) =
            identity().apply(ELECTRON_BUILDER_FIXTURE).expect("apply")
        else {
            panic!("expected changes");
        };
        assert_eq!(
            identity().apply(&patched).expect("apply twice"),
            PatchOutcome::AlreadyApplied
        );
    }

    #[test]
    fn missing_keys_are_appended() {
        let PatchOutcome::Applied(patched) = identity()
            .apply("directories:\n  output: dist")
            .expect("apply")
        else {
            panic!("expected changes");
        };
        assert_eq!(
            patched,
            "directories:\n  output: dist\nappId: com.acme.studio\nproductName: Acme Studio\n"
        );
    }

    #[test]
    fn values_needing_quotes_round_trip() {
        let identity = ElectronBuilderIdentity {
            app_id: "com.acme.studio".to_string(),
            product_name: "Acme: Studio".to_string(),
        };
        let PatchOutcome::Applied(patched) =
            identity.apply(ELECTRON_BUILDER_FIXTURE).expect("apply")
        else {
            panic!("expected changes");
        };
        let mapping = parse_mapping(&patched).expect("reparse");
        assert_eq!(scalar(&mapping, "productName"), Some("Acme: Studio"));
    }

    #[test]
    fn non_mapping_document_is_rejected() {
        let err = identity().apply("- a\n- b\n").unwrap_err();
        assert!(err.to_string().contains("not a mapping"));
    }
}
