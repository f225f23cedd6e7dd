//! Lets `BailianStrategy.buildUrl` target a custom DashScope-compatible host.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::{NoExpand, Regex};

use super::targets::BAILIAN_STRATEGY;
use super::types::{Patch, PatchOutcome};

const MARKER: &str = "buildUrl(baseURL?: string)";

static BUILD_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"buildUrl\(\): string \{\s*\n",
        r"\s*return 'https://dashscope\.aliyuncs\.com/api/v1/services/rerank/text-rerank/text-rerank'\s*\n",
        r"\s*\}",
    ))
    .expect("buildUrl regex")
});

// Template literal `${...}` must not be treated as a capture reference.
const BUILD_URL_WITH_BASE: &str = r"buildUrl(baseURL?: string): string {
    // Use the caller-supplied host when present
    if (baseURL) {
      const cleanBaseURL = baseURL.endsWith('/') ? baseURL.slice(0, -1) : baseURL
      return `${cleanBaseURL}/api/v1/services/rerank/text-rerank/text-rerank`
    }
    // Default to the official DashScope endpoint
    return 'https://dashscope.aliyuncs.com/api/v1/services/rerank/text-rerank/text-rerank'
  }";

/// Adds an optional `baseURL` parameter to `buildUrl`.
#[derive(Debug, Default)]
pub struct BailianBaseUrl;

impl Patch for BailianBaseUrl {
    fn name(&self) -> &str {
        "Apply BailianStrategy baseURL parameter"
    }

    fn target(&self) -> &str {
        BAILIAN_STRATEGY
    }

    fn apply(&self, contents: &str) -> Result<PatchOutcome> {
        if contents.contains(MARKER) {
            return Ok(PatchOutcome::AlreadyApplied);
        }
        if !BUILD_URL_RE.is_match(contents) {
            bail!("{BAILIAN_STRATEGY}: buildUrl method has an unexpected format");
        }
        let patched = BUILD_URL_RE
            .replace_all(contents, NoExpand(BUILD_URL_WITH_BASE))
            .into_owned();
        Ok(PatchOutcome::Applied(patched))
    }
}
