use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use factcheck_cache::CacheService;

use crate::cli::{KeysArgs, MonitorArgs, OutputFormat};
use crate::output::{format_bytes, print_json, print_pairs, print_table, status_mark};

pub async fn stats(cache: &CacheService, format: OutputFormat) -> Result<()> {
    let stats = cache.get_stats().await;
    if matches!(format, OutputFormat::Json) {
        return print_json(&stats);
    }
    print_pairs(vec![
        ("Total requests", stats.total_requests.to_string()),
        ("Hit rate", format!("{:.1}%", stats.hit_rate * 100.0)),
        ("Memory hits", stats.memory_hits.to_string()),
        ("File hits", stats.file_hits.to_string()),
        ("Remote hits", stats.remote_hits.to_string()),
        ("Misses", stats.misses.to_string()),
        ("Sets", stats.sets.to_string()),
        ("Deletes", stats.deletes.to_string()),
        ("Evictions", stats.evictions.to_string()),
        (
            "Memory entries",
            format!("{} / {}", stats.memory_entries, stats.memory_capacity),
        ),
        ("File size", format_bytes(stats.file_bytes)),
        (
            "Remote entries",
            stats
                .remote_entries
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
        ),
        (
            "Last cleanup",
            stats
                .last_cleanup
                .map_or_else(|| "never".to_string(), |at| at.to_string()),
        ),
    ]);
    Ok(())
}

pub async fn health(cache: &CacheService, format: OutputFormat) -> Result<()> {
    let health = cache.health_check().await;
    if matches!(format, OutputFormat::Json) {
        return print_json(&health);
    }
    println!("{}: {}", "Memory".cyan(), status_mark(health.memory));
    println!("{}: {}", "File".cyan(), status_mark(health.file));
    let remote = if cache.config().redis.enabled {
        status_mark(health.remote)
    } else {
        "not configured".dimmed().to_string()
    };
    println!("{}: {}", "Remote".cyan(), remote);
    Ok(())
}

pub async fn keys(cache: &CacheService, args: &KeysArgs, format: OutputFormat) -> Result<()> {
    let keys = cache
        .get_keys(&args.pattern, args.namespace.as_deref())
        .await;
    match format {
        OutputFormat::Json => print_json(&keys)?,
        OutputFormat::Table if keys.is_empty() => println!("No keys found."),
        OutputFormat::Table => {
            for key in &keys {
                println!("{key}");
            }
            println!("Total: {}", keys.len());
        }
    }
    Ok(())
}

pub async fn namespaces(cache: &CacheService, format: OutputFormat) -> Result<()> {
    let namespaces = cache.get_namespaces().await;
    match format {
        OutputFormat::Json => print_json(&namespaces)?,
        OutputFormat::Table if namespaces.is_empty() => println!("No namespaces found."),
        OutputFormat::Table => {
            for ns in &namespaces {
                println!("{ns}");
            }
        }
    }
    Ok(())
}

pub async fn monitor(cache: &CacheService, args: &MonitorArgs, format: OutputFormat) -> Result<()> {
    if args.interval == 0 {
        anyhow::bail!("--interval must be at least 1 second");
    }
    let handle = cache.spawn_monitor(
        Duration::from_secs(args.duration),
        Duration::from_secs(args.interval),
    );
    if matches!(format, OutputFormat::Table) {
        println!(
            "Monitoring for {}s every {}s (Ctrl-C to stop)...",
            args.duration, args.interval
        );
    }

    let stop = handle.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping monitor");
            stop.cancel();
        }
    });
    let samples = handle.join().await;
    interrupt.abort();
    tracing::debug!(samples = samples.len(), "Monitor finished");

    if matches!(format, OutputFormat::Json) {
        return print_json(&samples);
    }
    print_table(
        ["Time", "Memory", "File", "Hit rate", "Ops/s", "Remote"],
        samples
            .iter()
            .map(|s| {
                [
                    s.timestamp.time().to_string(),
                    s.memory_entries.to_string(),
                    format_bytes(s.file_bytes),
                    format!("{:.1}%", s.hit_rate * 100.0),
                    format!("{:.2}", s.operations_per_second),
                    s.remote_entries
                        .map_or_else(|| "-".to_string(), |n| n.to_string()),
                ]
            })
            .collect(),
    );
    Ok(())
}
