use std::path::Path;

/// Prepares a clean environment for a database-backed test: loads `.env`, wires up logging, and removes any
/// leftover database file from a previous run. The pool constructor creates the file and schema afresh.
pub async fn prepare_test_env(url: &str) {
    let _ = dotenvy::dotenv();
    let _ = env_logger::try_init();
    if let Some(path) = url.strip_prefix("sqlite://") {
        let path = Path::new(path);
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let _ = std::fs::remove_file(path);
    }
}
