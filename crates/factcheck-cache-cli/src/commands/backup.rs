use anyhow::Result;
use colored::Colorize;
use factcheck_cache::CacheService;

use crate::cli::{DirArgs, OutputFormat};
use crate::output::{print_json, print_success};

pub async fn backup(cache: &CacheService, args: &DirArgs, format: OutputFormat) -> Result<()> {
    let info = cache.backup(&args.dir).await?;
    if matches!(format, OutputFormat::Json) {
        return print_json(&info);
    }
    print_success(&format!(
        "Backup {} written ({} memory entries, {} files)",
        info.stamp, info.memory_entries, info.files
    ));
    println!("  {}: {}", "Snapshot".cyan(), info.snapshot.display());
    println!("  {}: {}", "Files".cyan(), info.file_dir.display());
    if cache.config().redis.enabled {
        let remote = if info.remote_persistence_requested {
            "BGSAVE requested".green()
        } else {
            "BGSAVE failed".yellow()
        };
        println!("  {}: {}", "Redis".cyan(), remote);
    }
    Ok(())
}

pub async fn restore(cache: &CacheService, args: &DirArgs, format: OutputFormat) -> Result<()> {
    let info = cache.restore(&args.dir).await?;
    if matches!(format, OutputFormat::Json) {
        return print_json(&info);
    }
    print_success(&format!(
        "Restored backup {} ({} memory entries, {} files, {} expired skipped)",
        info.stamp, info.memory_entries, info.files, info.skipped_expired
    ));
    if cache.config().redis.enabled {
        println!(
            "  {}",
            "Redis data is not restored by this tool; restore its RDB/AOF separately.".dimmed()
        );
    }
    Ok(())
}
