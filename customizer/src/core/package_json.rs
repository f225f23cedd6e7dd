//! Rewrites `name`, `productName` and `version` in `package.json`.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::targets::PACKAGE_JSON;
use super::types::{Patch, PatchOutcome};

/// Sets the npm package identity fields. Key order is preserved.
#[derive(Debug, Clone)]
pub struct PackageIdentity {
    pub package_name: String,
    pub product_name: String,
    pub version: String,
}

impl PackageIdentity {
    fn fields(&self) -> [(&'static str, &str); 3] {
        [
            ("name", self.package_name.as_str()),
            ("productName", self.product_name.as_str()),
            ("version", self.version.as_str()),
        ]
    }
}

impl Patch for PackageIdentity {
    fn name(&self) -> &str {
        "Update package.json identity"
    }

    fn target(&self) -> &str {
        PACKAGE_JSON
    }

    fn apply(&self, contents: &str) -> Result<PatchOutcome> {
        let mut doc: Value =
            serde_json::from_str(contents).with_context(|| format!("parse {PACKAGE_JSON}"))?;
        let object = doc
            .as_object_mut()
            .ok_or_else(|| anyhow!("{PACKAGE_JSON}: top level is not an object"))?;

        if self
            .fields()
            .iter()
            .all(|(key, value)| object.get(*key).and_then(Value::as_str) == Some(*value))
        {
            return Ok(PatchOutcome::AlreadyApplied);
        }

        for (key, value) in self.fields() {
            object.insert(key.to_string(), Value::from(value));
        }

        let mut buf = serde_json::to_string_pretty(&doc).context("serialize package.json")?;
        buf.push('\n');
        Ok(PatchOutcome::Applied(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PACKAGE_JSON_FIXTURE;

    fn identity() -> PackageIdentity {
        PackageIdentity {
            package_name: "acme-studio".to_string(),
            product_name: "Acme Studio".to_string(),
            version: "2.0.0-acme.1".to_string(),
        }
    }

    #[test]
    fn updates_fields_in_place_and_keeps_order() {
        let PatchOutcome::Applied(patched) =
            identity().apply(PACKAGE_JSON_FIXTURE).expect("apply")
        else {
            panic!("expected changes");
        };
        let expected = r#"{
  "name": "acme-studio",
  "version": "2.0.0-acme.1",
  "description": "智能助手",
  "main": "./out/main/index.js",
  "scripts": {
    "format": "prettier --write .",
    "build:check": "pnpm lint && pnpm test",
    "build:mac": "electron-builder --mac",
    "build:win": "electron-builder --win"
  },
  "productName": "Acme Studio"
}
"#;
        assert_eq!(patched, expected);
    }

    #[test]
    fn identical_identity_is_already_applied() {
        let PatchOutcome::Applied(patched) =
            identity().apply(PACKAGE_JSON_FIXTURE).expect("apply")
        else {
            panic!("expected changes");
        };
        assert_eq!(
            identity().apply(&patched).expect("apply twice"),
            PatchOutcome::AlreadyApplied
        );
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = identity().apply("{ \"name\": ").unwrap_err();
        assert!(err.to_string().contains("parse package.json"));
    }
}
