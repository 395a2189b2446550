//! VPSFlow の設定管理
//!
//! `vpsflow.yaml` の探索・読み込み、環境変数による上書き、検証、
//! データディレクトリ (`cache/`, `data/`, `logs/`) の配置を扱う。

pub mod error;
pub mod layout;

pub use error::*;
pub use layout::{DataLayout, InstallReport};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vpsflow_cloud::ApiCredential;
use vpsflow_cloud::defaults::{DEFAULT_LOCATION, HETZNER_API_BASE, LOCATION_CODES};

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "VPSFLOW_CONFIG_PATH";
/// APIトークンを上書きする環境変数
pub const TOKEN_ENV: &str = "HCLOUD_TOKEN";
/// データディレクトリを上書きする環境変数
pub const DATA_DIR_ENV: &str = "VPSFLOW_DATA_DIR";

/// これより短いトークンは入力ミスとみなす
pub const MIN_TOKEN_LENGTH: usize = 20;

const CONFIG_CANDIDATES: [&str; 2] = ["vpsflow.yaml", ".vpsflow/vpsflow.yaml"];

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    vpsflow_cloud::DEFAULT_TTL.as_secs()
}

fn default_api_base_url() -> String {
    HETZNER_API_BASE.to_string()
}

/// モジュール設定
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Hetzner Cloud APIトークン
    #[serde(default)]
    pub api_token: Option<String>,

    /// 新規サーバーのデフォルトロケーション
    #[serde(default = "default_location")]
    pub default_location: String,

    #[serde(default)]
    pub enable_backups: bool,

    #[serde(default)]
    pub enable_monitoring: bool,

    /// データルート（未指定時は `<data_dir>/vpsflow`）
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// カタログキャッシュの有効期間（秒）
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            default_location: default_location(),
            enable_backups: false,
            enable_monitoring: false,
            data_dir: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            api_base_url: default_api_base_url(),
        }
    }
}

// トークンをログに出さない
impl fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("default_location", &self.default_location)
            .field("enable_backups", &self.enable_backups)
            .field("enable_monitoring", &self.enable_monitoring)
            .field("data_dir", &self.data_dir)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl ModuleConfig {
    /// 設定を読み込む
    ///
    /// 設定ファイルが見つからない場合はデフォルト値を使い、
    /// 最後に環境変数 (`HCLOUD_TOKEN`, `VPSFLOW_DATA_DIR`) で上書きする。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match find_config_file(explicit)? {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides(
            std::env::var(TOKEN_ENV).ok(),
            std::env::var(DATA_DIR_ENV).ok(),
        );
        Ok(config)
    }

    /// YAMLファイルから読み込む（環境変数は反映しない）
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // 空ファイルはデフォルト扱い
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// 空文字の環境変数は無視する
    pub fn apply_env_overrides(&mut self, token: Option<String>, data_dir: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.api_token = Some(token.trim().to_string());
        }
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// 問題点をすべて返す（空なら正常）
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        match self.api_token.as_deref().map(str::trim) {
            None | Some("") => problems.push("APIトークンが設定されていません".to_string()),
            Some(token) if token.chars().count() < MIN_TOKEN_LENGTH => {
                problems.push("APIトークンが短すぎます".to_string())
            }
            Some(_) => {}
        }

        if !LOCATION_CODES.contains(&self.default_location.as_str()) {
            problems.push(format!(
                "デフォルトロケーションが不正です: {} (有効な値: {})",
                self.default_location,
                LOCATION_CODES.join(", ")
            ));
        }

        problems
    }

    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    pub fn credential(&self) -> Option<ApiCredential> {
        ApiCredential::from_optional(self.api_token.clone())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// データルート
    pub fn data_root(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("vpsflow"))
                .ok_or(ConfigError::DataDirNotFound),
        }
    }

    pub fn layout(&self) -> Result<DataLayout> {
        Ok(DataLayout::new(self.data_root()?))
    }
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. `--config` で明示されたパス（存在しなければエラー）
/// 2. 環境変数 VPSFLOW_CONFIG_PATH
/// 3. カレントディレクトリ: vpsflow.yaml, .vpsflow/vpsflow.yaml
/// 4. ~/.config/vpsflow/config.yaml (グローバル設定)
///
/// どれも無ければ `None`。
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let current_dir = std::env::current_dir()?;
    let global = dirs::config_dir().map(|d| d.join("vpsflow").join("config.yaml"));
    search_config_file(explicit, env_path, &current_dir, global)
}

fn search_config_file(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    current_dir: &Path,
    global: Option<PathBuf>,
) -> Result<Option<PathBuf>> {
    // 1. 明示指定
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    // 2. 環境変数で直接指定
    if let Some(path) = env_path.filter(|p| p.is_file()) {
        return Ok(Some(path));
    }

    // 3. カレントディレクトリで検索
    for candidate in CONFIG_CANDIDATES {
        let path = current_dir.join(candidate);
        if path.is_file() {
            return Ok(Some(path));
        }
    }

    // 4. グローバル設定
    Ok(global.filter(|p| p.is_file()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const VALID_TOKEN: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

    #[test]
    fn test_defaults() {
        let config = ModuleConfig::default();
        assert_eq!(config.default_location, "fsn1");
        assert_eq!(config.cache_ttl_secs, 86_400);
        assert_eq!(config.api_base_url, "https://api.hetzner.cloud/v1");
        assert!(config.api_token.is_none());
        assert!(!config.enable_backups);
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = ModuleConfig::from_yaml(
            "api_token: secret-token-value-1234567\ndefault_location: hel1\nenable_monitoring: true\n",
        )
        .unwrap();
        assert_eq!(config.default_location, "hel1");
        assert!(config.enable_monitoring);
        assert!(!config.enable_backups);
        assert_eq!(config.cache_ttl_secs, 86_400);
    }

    #[test]
    fn test_from_yaml_empty() {
        assert_eq!(ModuleConfig::from_yaml("").unwrap(), ModuleConfig::default());
    }

    #[test]
    fn test_from_file_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("vpsflow.yaml");
        fs::write(&path, "cache_ttl_secs: [oops").unwrap();

        let err = ModuleConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ModuleConfig::default();
        config.apply_env_overrides(Some(VALID_TOKEN.to_string()), Some("/srv/vpsflow".to_string()));
        assert_eq!(config.api_token.as_deref(), Some(VALID_TOKEN));
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/vpsflow")));

        // 空の値は上書きしない
        config.apply_env_overrides(Some("  ".to_string()), Some(String::new()));
        assert_eq!(config.api_token.as_deref(), Some(VALID_TOKEN));
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/vpsflow")));
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let config = ModuleConfig {
            default_location: "mars1".to_string(),
            ..Default::default()
        };
        let problems = config.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("設定されていません"));
        assert!(problems[1].contains("mars1"));

        let config = ModuleConfig {
            api_token: Some("short".to_string()),
            ..Default::default()
        };
        let problems = config.problems();
        assert_eq!(problems, vec!["APIトークンが短すぎます".to_string()]);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ModuleConfig {
            api_token: Some(VALID_TOKEN.to_string()),
            default_location: "ash".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ModuleConfig {
            api_token: Some(VALID_TOKEN.to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains(VALID_TOKEN));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_credential_blank_is_none() {
        let config = ModuleConfig {
            api_token: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_data_root_explicit() {
        let config = ModuleConfig {
            data_dir: Some(PathBuf::from("/srv/vpsflow")),
            ..Default::default()
        };
        assert_eq!(config.data_root().unwrap(), PathBuf::from("/srv/vpsflow"));
        assert_eq!(
            config.layout().unwrap().cache_dir(),
            PathBuf::from("/srv/vpsflow/cache")
        );
    }

    #[test]
    fn test_search_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cwd = temp_dir.path().join("project");
        fs::create_dir_all(cwd.join(".vpsflow")).unwrap();
        let global = temp_dir.path().join("global.yaml");
        fs::write(&global, "").unwrap();

        // グローバル設定のみ
        let found = search_config_file(None, None, &cwd, Some(global.clone())).unwrap();
        assert_eq!(found, Some(global.clone()));

        // .vpsflow/ ディレクトリ
        fs::write(cwd.join(".vpsflow/vpsflow.yaml"), "").unwrap();
        let found = search_config_file(None, None, &cwd, Some(global.clone())).unwrap();
        assert!(found.unwrap().ends_with(".vpsflow/vpsflow.yaml"));

        // カレントディレクトリが優先される
        fs::write(cwd.join("vpsflow.yaml"), "").unwrap();
        let found = search_config_file(None, None, &cwd, Some(global.clone())).unwrap();
        assert_eq!(found, Some(cwd.join("vpsflow.yaml")));

        // 環境変数はさらに優先
        let env_path = temp_dir.path().join("env.yaml");
        fs::write(&env_path, "").unwrap();
        let found =
            search_config_file(None, Some(env_path.clone()), &cwd, Some(global.clone())).unwrap();
        assert_eq!(found, Some(env_path.clone()));

        // 明示指定が最優先
        let found =
            search_config_file(Some(&global), Some(env_path), &cwd, Some(global.clone())).unwrap();
        assert_eq!(found, Some(global));
    }

    #[test]
    fn test_search_missing_env_path_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let found = search_config_file(
            None,
            Some(temp_dir.path().join("missing.yaml")),
            temp_dir.path(),
            None,
        )
        .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_search_missing_explicit_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.yaml");
        let err = search_config_file(Some(&missing), None, temp_dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == missing));
    }

    #[test]
    #[serial]
    fn test_load_from_env_path_with_token_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(
            &config_path,
            "api_token: from-file-token-000000000\nenable_backups: true\n",
        )
        .unwrap();

        temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, Some(config_path.to_str().unwrap())),
                (TOKEN_ENV, Some(VALID_TOKEN)),
                (DATA_DIR_ENV, None),
            ],
            || {
                let config = ModuleConfig::load(None).unwrap();
                assert!(config.enable_backups);
                assert_eq!(config.api_token.as_deref(), Some(VALID_TOKEN));
                assert!(config.data_dir.is_none());
            },
        );
    }
}
