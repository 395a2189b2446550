use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("データディレクトリが見つかりません。data_dir または VPSFLOW_DATA_DIR で指定してください")]
    DataDirNotFound,

    #[error("設定ファイルが見つかりません: {0}")]
    NotFound(PathBuf),

    #[error("設定ファイルの解析に失敗しました ({path}): {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("設定が不正です:\n{}", bullet_list(.0))]
    Invalid(Vec<String>),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, ConfigError>;
