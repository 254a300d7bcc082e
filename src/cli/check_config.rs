use crate::cli::{load_config, CheckConfigArgs};
use anyhow::Result;

pub async fn execute(args: &CheckConfigArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let cache = &config.cache;

    println!("=== Cache Configuration ===\n");
    println!("Service:          {}", cache.service_name);
    println!("TTL:              {} min", cache.ttl_minutes);
    println!("Sweep interval:   {} min", cache.sweep_interval_minutes);
    println!("Key mode:         {:?}", cache.key_mode);
    println!("\n✅ Configuration is valid");

    Ok(())
}
