//! 設定から各サービスを組み立てる

use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vpsflow_cloud::{FileCacheStore, FileRecordStore};
use vpsflow_cloud_hetzner::{AuditLog, CatalogService, HetznerClient, ProvisioningService};
use vpsflow_config::{DataLayout, ModuleConfig};

pub struct Context {
    pub config: ModuleConfig,
    pub layout: DataLayout,
}

impl Context {
    /// `--data-dir` は設定ファイルと環境変数より優先する
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = ModuleConfig::load(config_path)?;
        if let Some(dir) = data_dir {
            config.data_dir = Some(dir);
        }
        let layout = config.layout()?;
        tracing::debug!("Data root: {}", layout.root().display());
        Ok(Self { config, layout })
    }

    fn client(&self) -> anyhow::Result<Arc<HetznerClient>> {
        let client = HetznerClient::with_base_url(&self.config.api_base_url)
            .context("HTTPクライアントの初期化に失敗しました")?
            .with_audit_log(AuditLog::new(self.layout.audit_log_path()));
        Ok(Arc::new(client))
    }

    pub fn catalog(&self) -> anyhow::Result<CatalogService> {
        let cache = Arc::new(FileCacheStore::new(self.layout.cache_dir()));
        Ok(
            CatalogService::new(self.client()?, cache, self.config.credential())
                .with_ttl(self.config.cache_ttl()),
        )
    }

    pub fn provisioner(&self) -> anyhow::Result<ProvisioningService> {
        let records = Arc::new(FileRecordStore::new(self.layout.records_dir()));
        Ok(ProvisioningService::new(
            self.client()?,
            records,
            self.config.credential(),
        ))
    }

    pub fn has_credential(&self) -> bool {
        self.config.credential().is_some()
    }
}
