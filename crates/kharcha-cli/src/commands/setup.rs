//! Setup command: authorize mail access and initialize the store

use anyhow::Result;
use kharcha_core::{config, gmail, Config};

pub async fn cmd_setup() -> Result<()> {
    let data_dir = config::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let cfg = Config::load()?;

    println!();
    println!("🏦 kharcha setup");
    println!("   Data directory: {}", data_dir.display());

    // Store first so a failed auth still leaves a usable layout
    let db = super::open_db(&cfg)?;
    println!("   ✅ Store ready at {}", db.path());

    match gmail::ensure_access_token(&data_dir, &cfg.gmail).await {
        Ok(_) => println!("   ✅ Mail access authorized (read-only)"),
        Err(e) => {
            println!("   ❌ Mail authorization failed: {}", e);
            return Err(e.into());
        }
    }

    let gateway = super::gateway(&cfg);
    if gateway.available().await {
        println!("   ✅ Model binary found ({})", cfg.model_bin());
    } else {
        println!(
            "   ⚠  Model binary '{}' not available; sync will run without AI extraction",
            cfg.model_bin()
        );
    }

    println!();
    println!("   Run 'kharcha sync' to pull your first transactions.");
    Ok(())
}
