use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    let path = Config::default_config_path();

    if Config::create_default_if_missing()? {
        println!("✓ Config file created at {}.", path.display());
        println!("Set backend.url and backend.api_key, or export QRSYNC_BACKEND_URL and QRSYNC_BACKEND_KEY.");
    } else {
        println!("Config file already exists: {}", path.display());
    }

    Ok(())
}
