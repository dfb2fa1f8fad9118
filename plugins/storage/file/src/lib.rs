mod config;
mod storage;

pub use config::FileStoreConfig;
pub use storage::FileStore;

impl From<&FileStoreConfig> for FileStore {
    fn from(cfg: &FileStoreConfig) -> Self {
        FileStore::new(&cfg.dir)
    }
}
