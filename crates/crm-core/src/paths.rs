use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CRM_DIR: &str = ".crm";
pub const DATA_DIR: &str = ".crm/data";
pub const CONFIG_FILE: &str = ".crm/config.yaml";
pub const IDS_FILE: &str = ".crm/data/ids.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn crm_dir(root: &Path) -> PathBuf {
    root.join(CRM_DIR)
}

pub fn data_dir(root: &Path) -> PathBuf {
    root.join(DATA_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// One YAML file per table, e.g. `.crm/data/contact_sequences.yaml`.
pub fn table_path(root: &Path, table: &str) -> PathBuf {
    data_dir(root).join(format!("{table}.yaml"))
}

/// Highest id issued per table.
pub fn ids_path(root: &Path) -> PathBuf {
    root.join(IDS_FILE)
}
