//! Hides the in-app update UI: the home update button, the update controls on
//! the About page, and the auto-check default in the settings store.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

use super::targets::{ABOUT_SETTINGS, SETTINGS_STORE, UPDATE_APP_BUTTON};
use super::types::{Patch, PatchOutcome};

const BUTTON_MARKER: &str = "return null // customized: hidden";
const ABOUT_MARKER: &str = "// customized: update ui hidden";
const STORE_MARKER: &str = "autoCheckUpdate: false, // customized";

static BUTTON_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(const UpdateAppButton: FC = \(\) => \{)").expect("button regex")
});

/// Makes `UpdateAppButton` render nothing.
#[derive(Debug, Default)]
pub struct HideUpdateButton;

impl Patch for HideUpdateButton {
    fn name(&self) -> &str {
        "Hide update button"
    }

    fn target(&self) -> &str {
        UPDATE_APP_BUTTON
    }

    fn apply(&self, contents: &str) -> Result<PatchOutcome> {
        if contents.contains(BUTTON_MARKER) {
            return Ok(PatchOutcome::AlreadyApplied);
        }
        if !BUTTON_BODY_RE.is_match(contents) {
            bail!("{UPDATE_APP_BUTTON}: component declaration not found");
        }
        let patched = BUTTON_BODY_RE
            .replace(contents, format!("${{1}}\n  {BUTTON_MARKER}"))
            .into_owned();
        Ok(PatchOutcome::Applied(patched))
    }
}

pub const CHECK_UPDATE_BUTTON_BLOCK: &str = r#"          {!isPortable && (
            <CheckUpdateButton
              onClick={onCheckUpdate}
              loading={update.checking}
              disabled={update.downloading || update.checking}>
              {update.downloading
                ? t('settings.about.downloading')
                : update.available
                  ? t('settings.about.checkUpdate.available')
                  : t('settings.about.checkUpdate.label')}
            </CheckUpdateButton>
          )}"#;

pub const AUTO_UPDATE_BLOCK: &str = r#"        {!isPortable && (
          <>
            <SettingDivider />
            <SettingRow>
              <SettingRowTitle>{t('settings.general.auto_check_update.title')}</SettingRowTitle>
              <Switch value={autoCheckUpdate} onChange={(v) => setAutoCheckUpdate(v)} />
            </SettingRow>
            <SettingDivider />
            <SettingRow>
              <SettingRowTitle>{t('settings.general.test_plan.title')}</SettingRowTitle>
              <Tooltip title={t('settings.general.test_plan.tooltip')} trigger={['hover', 'focus']}>
                <Switch value={testPlan} onChange={(v) => handleSetTestPlan(v)} />
              </Tooltip>
            </SettingRow>
            {testPlan && (
              <>
                <SettingDivider />
                <SettingRow>
                  <SettingRowTitle>{t('settings.general.test_plan.version_options')}</SettingRowTitle>
                  <Radio.Group
                    size="small"
                    buttonStyle="solid"
                    value={getTestChannel()}
                    onChange={(e) => handleTestChannelChange(e.target.value)}>
                    {getAvailableTestChannels().map((option) => (
                      <Tooltip key={option.value} title={option.tooltip}>
                        <Radio.Button value={option.value}>{option.label}</Radio.Button>
                      </Tooltip>
                    ))}
                  </Radio.Group>
                </SettingRow>
              </>
            )}
          </>
        )}"#;

pub const PORTABLE_STATE: &str = "  const [isPortable, setIsPortable] = useState(false)\n";

pub const SETTINGS_HOOK: &str = "  const { autoCheckUpdate, setAutoCheckUpdate, testPlan, setTestPlan, testChannel, setTestChannel } = useSettings()\n";

const SETTINGS_HOOK_TRIMMED: &str = "  const { autoCheckUpdate, setAutoCheckUpdate } = useSettings()\n";

pub const CHECK_UPDATE_HANDLER: &str = r#"
  const onCheckUpdate = debounce(
    async () => {
      if (update.checking || update.downloading) {
        return
      }

      if (update.downloaded) {
        // Open update dialog directly in renderer
        UpdateDialogPopup.show({ releaseInfo: update.info || null })
        return
      }

      dispatch(setUpdateState({ checking: true }))

      try {
        await window.api.checkForUpdate()
      } catch (error) {
        window.toast.error(t('settings.about.updateError'))
      }

      dispatch(setUpdateState({ checking: false }))
    },
    2000,
    { leading: true, trailing: false }
  )
"#;

pub const TEST_CHANNEL_HANDLERS: &str = r#"
  const currentChannelByVersion =
    [
      { pattern: `-${UpgradeChannel.BETA}.`, channel: UpgradeChannel.BETA },
      { pattern: `-${UpgradeChannel.RC}.`, channel: UpgradeChannel.RC }
    ].find(({ pattern }) => version.includes(pattern))?.channel || UpgradeChannel.LATEST

  const handleTestChannelChange = async (value: UpgradeChannel) => {
    if (testPlan && currentChannelByVersion !== UpgradeChannel.LATEST && value !== currentChannelByVersion) {
      window.toast.warning(t('settings.general.test_plan.version_channel_not_match'))
    }
    setTestChannel(value)
    // Clear update info when switching upgrade channel
    dispatch(
      setUpdateState({
        available: false,
        info: null,
        downloaded: false,
        checking: false,
        downloading: false,
        downloadProgress: 0
      })
    )
  }

  // Get available test version options based on current version
  const getAvailableTestChannels = () => {
    return [
      {
        tooltip: t('settings.general.test_plan.rc_version_tooltip'),
        label: t('settings.general.test_plan.rc_version'),
        value: UpgradeChannel.RC
      },
      {
        tooltip: t('settings.general.test_plan.beta_version_tooltip'),
        label: t('settings.general.test_plan.beta_version'),
        value: UpgradeChannel.BETA
      }
    ]
  }

  const handleSetTestPlan = (value: boolean) => {
    setTestPlan(value)
    dispatch(
      setUpdateState({
        available: false,
        info: null,
        downloaded: false,
        checking: false,
        downloading: false,
        downloadProgress: 0
      })
    )

    if (value === true) {
      setTestChannel(getTestChannel())
    }
  }

  const getTestChannel = () => {
    if (testChannel === UpgradeChannel.LATEST) {
      return UpgradeChannel.RC
    }
    return testChannel
  }
"#;

pub const PORTABLE_EFFECT: &str = "      setVersion(appInfo.version)\n      setIsPortable(appInfo.isPortable)\n";

const PORTABLE_EFFECT_TRIMMED: &str = "      setVersion(appInfo.version)\n";

pub const CHECK_UPDATE_STYLED: &str = "\nconst CheckUpdateButton = styled(Button)``\n";

pub const DISPATCH_HOOK: &str = "  const dispatch = useAppDispatch()\n";

/// Ordered literal substitutions applied to `AboutSettings.tsx`: label, from, to.
const ABOUT_EDITS: &[(&str, &str, &str)] = &[
    ("check-update button", CHECK_UPDATE_BUTTON_BLOCK, ""),
    ("auto-update rows", AUTO_UPDATE_BLOCK, ""),
    ("portable state", PORTABLE_STATE, ""),
    ("settings hook", SETTINGS_HOOK, SETTINGS_HOOK_TRIMMED),
    ("check-update handler", CHECK_UPDATE_HANDLER, "\n"),
    ("test channel handlers", TEST_CHANNEL_HANDLERS, "\n"),
    ("portable effect", PORTABLE_EFFECT, PORTABLE_EFFECT_TRIMMED),
    ("check-update styled component", CHECK_UPDATE_STYLED, "\n"),
    ("dispatch hook", DISPATCH_HOOK, ""),
];

/// Strips the update controls from the About page.
#[derive(Debug, Default)]
pub struct HideAboutUpdateControls;

impl Patch for HideAboutUpdateControls {
    fn name(&self) -> &str {
        "Hide About page update controls"
    }

    fn target(&self) -> &str {
        ABOUT_SETTINGS
    }

    fn apply(&self, contents: &str) -> Result<PatchOutcome> {
        if contents.contains(ABOUT_MARKER) {
            return Ok(PatchOutcome::AlreadyApplied);
        }
        // Every block must be present: removing only some leaves dangling references.
        let mut patched = contents.to_string();
        let mut unmatched = Vec::new();
        for (label, from, to) in ABOUT_EDITS {
            if patched.contains(from) {
                patched = patched.replace(from, to);
            } else {
                unmatched.push(*label);
            }
        }
        if !unmatched.is_empty() {
            bail!(
                "{ABOUT_SETTINGS}: update controls did not match the known layout, unmatched: {}",
                unmatched.join(", ")
            );
        }
        patched.push('\n');
        patched.push_str(ABOUT_MARKER);
        Ok(PatchOutcome::Applied(patched))
    }
}

/// Turns off the automatic update check by default.
#[derive(Debug, Default)]
pub struct DisableAutoCheckUpdate;

impl Patch for DisableAutoCheckUpdate {
    fn name(&self) -> &str {
        "Disable autoCheckUpdate default"
    }

    fn target(&self) -> &str {
        SETTINGS_STORE
    }

    fn apply(&self, contents: &str) -> Result<PatchOutcome> {
        if contents.contains(STORE_MARKER) {
            return Ok(PatchOutcome::AlreadyApplied);
        }
        if !contents.contains("autoCheckUpdate: true,") {
            bail!("{SETTINGS_STORE}: autoCheckUpdate default not found");
        }
        Ok(PatchOutcome::Applied(
            contents.replace("autoCheckUpdate: true,", STORE_MARKER),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        ABOUT_SETTINGS_FIXTURE, SETTINGS_STORE_FIXTURE, UPDATE_APP_BUTTON_FIXTURE,
    };

    fn applied(outcome: PatchOutcome) -> String {
        match outcome {
            PatchOutcome::Applied(text) => text,
            PatchOutcome::AlreadyApplied => panic!("expected changes"),
        }
    }

    #[test]
    fn update_button_returns_null_first() {
        let patched = applied(
            HideUpdateButton
                .apply(UPDATE_APP_BUTTON_FIXTURE)
                .expect("apply"),
        );
        assert!(patched.contains("const UpdateAppButton: FC = () => {\n  return null // customized: hidden\n"));
        assert_eq!(
            HideUpdateButton.apply(&patched).expect("apply twice"),
            PatchOutcome::AlreadyApplied
        );
    }

    #[test]
    fn update_button_without_component_is_an_error() {
        assert!(HideUpdateButton.apply("export default null\n").is_err());
    }

    #[test]
    fn about_page_loses_update_controls() {
        let fixture = ABOUT_SETTINGS_FIXTURE.as_str();
        let patched = applied(HideAboutUpdateControls.apply(fixture).expect("apply"));

        assert!(!patched.contains("CheckUpdateButton"));
        assert!(!patched.contains("isPortable"));
        assert!(!patched.contains("handleSetTestPlan"));
        assert!(!patched.contains("useAppDispatch()"));
        assert!(patched.contains(SETTINGS_HOOK_TRIMMED));
        assert!(patched.contains("      setVersion(appInfo.version)\n    }"));
        assert!(patched.ends_with(ABOUT_MARKER));
        assert_eq!(
            HideAboutUpdateControls
                .apply(&patched)
                .expect("apply twice"),
            PatchOutcome::AlreadyApplied
        );
    }

    #[test]
    fn about_page_with_unknown_layout_is_an_error() {
        let err = HideAboutUpdateControls
            .apply("const AboutSettings = () => null\n")
            .unwrap_err();
        assert!(err.to_string().contains("known layout"));
    }

    #[test]
    fn about_page_missing_one_block_is_left_alone() {
        let drifted = ABOUT_SETTINGS_FIXTURE.replace(PORTABLE_EFFECT, PORTABLE_EFFECT_TRIMMED);
        let err = HideAboutUpdateControls.apply(&drifted).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unmatched: portable effect"), "{msg}");
        assert!(!msg.contains("check-update button"), "{msg}");
    }

    #[test]
    fn store_default_flips_to_false() {
        let patched = applied(
            DisableAutoCheckUpdate
                .apply(SETTINGS_STORE_FIXTURE)
                .expect("apply"),
        );
        assert!(patched.contains("  autoCheckUpdate: false, // customized\n"));
        assert!(patched.contains("  testPlan: false,\n"));
        assert_eq!(
            DisableAutoCheckUpdate.apply(&patched).expect("apply twice"),
            PatchOutcome::AlreadyApplied
        );
    }
}
