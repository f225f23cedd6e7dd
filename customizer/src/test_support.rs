//! Test-only fixtures: a miniature Cherry Studio checkout and a scripted build runner.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::targets;
use crate::core::update_ui::{
    AUTO_UPDATE_BLOCK, CHECK_UPDATE_BUTTON_BLOCK, CHECK_UPDATE_HANDLER, CHECK_UPDATE_STYLED,
    DISPATCH_HOOK, PORTABLE_EFFECT, PORTABLE_STATE, SETTINGS_HOOK, TEST_CHANNEL_HANDLERS,
};
use crate::io::build::{BuildOutcome, BuildRequest, BuildRunner};
use crate::io::paths::DEFAULT_CONFIG_FILE;

pub const SETTINGS_PAGE_FIXTURE: &str = r#"import {
  Cloud,
  Globe,
  HardDrive
} from 'lucide-react'
import { FC } from 'react'
import { Route, Routes, useLocation } from 'react-router'

import AboutSettings from './AboutSettings'
import DataSettings from './DataSettings/DataSettings'
import GeneralSettings from './GeneralSettings'

const SettingsPage: FC = () => {
  const { pathname } = useLocation()
  const isRoute = (path: string): string => (pathname.startsWith(path) ? 'active' : '')

  return (
    <Container>
      <SettingMenus>
        <MenuItemLink to="/settings/general">
          <MenuItem className={isRoute('/settings/general')}>
            <Globe size={18} />
            {t('settings.general.label')}
          </MenuItem>
        </MenuItemLink>
        <MenuItemLink to="/settings/data">
          <MenuItem className={isRoute('/settings/data')}>
            <HardDrive size={18} />
            {t('settings.data.title')}
          </MenuItem>
        </MenuItemLink>
      </SettingMenus>
      <SettingContent>
        <Routes>
          <Route path="general" element={<GeneralSettings />} />
          <Route path="data" element={<DataSettings />} />
          <Route path="about" element={<AboutSettings />} />
        </Routes>
      </SettingContent>
    </Container>
  )
}

export default SettingsPage
"#;

pub const BAILIAN_STRATEGY_FIXTURE: &str = r#"import { BaseRerankStrategy } from './RerankStrategy'

export class BailianStrategy extends BaseRerankStrategy {
  buildUrl(): string {
    return 'https://dashscope.aliyuncs.com/api/v1/services/rerank/text-rerank/text-rerank'
  }

  buildHeaders(): Record<string, string> {
    return {
      'Content-Type': 'application/json',
      Authorization: `Bearer ${this.apiKey}`
    }
  }
}
"#;

pub const UPDATE_APP_BUTTON_FIXTURE: &str = r#"import { FC } from 'react'

const UpdateAppButton: FC = () => {
  const { update } = useRuntime()
  if (!update.available) {
    return null
  }
  return <UpdateButton onClick={handleOpenUpdateDialog}>{t('button.update_available')}</UpdateButton>
}

export default UpdateAppButton
"#;

pub const SETTINGS_STORE_FIXTURE: &str = r#"export const initialState: SettingsState = {
  language: navigator.language as LanguageVarious,
  autoCheckUpdate: true,
  testPlan: false,
  testChannel: UpgradeChannel.LATEST
}
"#;

pub const ELECTRON_BUILDER_FIXTURE: &str = r#"# Packaging configuration
appId: com.kangfenmao.CherryStudio
productName: Cherry Studio
electronLanguages:
  - zh-CN
  - en-US
directories:
  buildResources: build
win:
  executableName: Cherry Studio
  artifactName: ${productName}-${version}-${arch}-setup.${ext}
mac:
  entitlementsInherit: build/entitlements.mac.plist
"#;

pub const PACKAGE_JSON_FIXTURE: &str = r#"{
  "name": "CherryStudio",
  "version": "1.5.0",
  "description": "智能助手",
  "main": "./out/main/index.js",
  "scripts": {
    "format": "prettier --write .",
    "build:check": "pnpm lint && pnpm test",
    "build:mac": "electron-builder --mac",
    "build:win": "electron-builder --win"
  }
}
"#;

const ABOUT_HEADER: &str = r#"import { useAppDispatch } from '@renderer/store'
import { setUpdateState } from '@renderer/store/runtime'
import { Button, Radio, Switch, Tooltip } from 'antd'
import { debounce } from 'lodash'
import { FC, useEffect, useState } from 'react'
import styled from 'styled-components'

const AboutSettings: FC = () => {
  const [version, setVersion] = useState('')
"#;

const ABOUT_RUNTIME: &str = "  const { update } = useRuntime()\n";

const ABOUT_EFFECT_OPEN: &str = r#"
  useEffect(() => {
    const runAsyncFunction = async () => {
      const appInfo = await window.api.getAppInfo()
"#;

const ABOUT_RENDER_OPEN: &str = r#"    }
    runAsyncFunction()
  }, [])

  return (
    <SettingContainer>
      <SettingGroup>
        <AboutHeader>
          <VersionWrapper>v{version}</VersionWrapper>
"#;

const ABOUT_HEADER_CLOSE: &str = "\n        </AboutHeader>\n";

const ABOUT_RENDER_CLOSE: &str = r#"
      </SettingGroup>
    </SettingContainer>
  )
}
"#;

const ABOUT_FOOTER: &str = "export default AboutSettings\n";

/// `AboutSettings.tsx` with every update control the patch knows how to remove.
pub static ABOUT_SETTINGS_FIXTURE: LazyLock<String> = LazyLock::new(|| {
    [
        ABOUT_HEADER,
        PORTABLE_STATE,
        SETTINGS_HOOK,
        DISPATCH_HOOK,
        ABOUT_RUNTIME,
        CHECK_UPDATE_HANDLER,
        TEST_CHANNEL_HANDLERS,
        ABOUT_EFFECT_OPEN,
        PORTABLE_EFFECT,
        ABOUT_RENDER_OPEN,
        CHECK_UPDATE_BUTTON_BLOCK,
        ABOUT_HEADER_CLOSE,
        AUTO_UPDATE_BLOCK,
        ABOUT_RENDER_CLOSE,
        CHECK_UPDATE_STYLED,
        ABOUT_FOOTER,
    ]
    .concat()
});

/// Config with build disabled, safe to run end-to-end in tests.
pub const NO_BUILD_CONFIG: &str = r#"{
  "appId": "com.acme.studio",
  "productName": "Acme Studio",
  "packageName": "acme-studio",
  "version": "2.0.0",
  "autoBuild": false
}
"#;

/// Every customized file of a pristine checkout, keyed by relative path.
pub fn fixture_files() -> Vec<(&'static str, String)> {
    vec![
        (targets::SETTINGS_PAGE, SETTINGS_PAGE_FIXTURE.to_string()),
        (targets::BAILIAN_STRATEGY, BAILIAN_STRATEGY_FIXTURE.to_string()),
        (targets::UPDATE_APP_BUTTON, UPDATE_APP_BUTTON_FIXTURE.to_string()),
        (targets::ABOUT_SETTINGS, ABOUT_SETTINGS_FIXTURE.clone()),
        (targets::SETTINGS_STORE, SETTINGS_STORE_FIXTURE.to_string()),
        (targets::ELECTRON_BUILDER, ELECTRON_BUILDER_FIXTURE.to_string()),
        (targets::PACKAGE_JSON, PACKAGE_JSON_FIXTURE.to_string()),
    ]
}

/// Temporary project root populated with pristine fixture files.
pub struct FixtureProject {
    dir: TempDir,
}

impl FixtureProject {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let project = Self { dir };
        for (rel, contents) in fixture_files() {
            project.write(rel, &contents)?;
        }
        Ok(project)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_config(&self, json: &str) -> Result<PathBuf> {
        self.write(DEFAULT_CONFIG_FILE, json)
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.path().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Every file under the root with its bytes, for before/after comparisons.
    pub fn snapshot(&self) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
        let mut files = BTreeMap::new();
        collect_files(self.path(), self.path(), &mut files)?;
        Ok(files)
    }

    /// Snapshot restricted to the customized files.
    pub fn target_snapshot(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut files = BTreeMap::new();
        for (rel, _) in fixture_files() {
            let path = self.path().join(rel);
            let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            files.insert(rel.to_string(), bytes);
        }
        Ok(files)
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.context("read entry")?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let rel = path
                .strip_prefix(root)
                .context("strip root prefix")?
                .to_path_buf();
            let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            files.insert(rel, bytes);
        }
    }
    Ok(())
}

/// Build runner that replays queued outcomes and records every request.
///
/// Once the queue is empty every further step succeeds.
#[derive(Default)]
pub struct ScriptedBuildRunner {
    outcomes: RefCell<VecDeque<BuildOutcome>>,
    requests: RefCell<Vec<BuildRequest>>,
}

impl ScriptedBuildRunner {
    pub fn new(outcomes: Vec<BuildOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<BuildRequest> {
        self.requests.borrow().clone()
    }
}

impl BuildRunner for ScriptedBuildRunner {
    fn run(&self, request: &BuildRequest) -> Result<BuildOutcome> {
        self.requests.borrow_mut().push(request.clone());
        Ok(self
            .outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or(BuildOutcome::Success))
    }
}
