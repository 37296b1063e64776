use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use factcheck_cache::CacheService;
use serde_json::Value;

use crate::cli::{ClearArgs, KeyArgs, OutputFormat, SetArgs};
use crate::output::{print_json, print_success};

pub async fn get(cache: &CacheService, args: &KeyArgs, format: OutputFormat) -> Result<()> {
    let value: Option<Value> = cache
        .get(&args.key, &args.namespace)
        .await
        .with_context(|| format!("{}:{} is not a JSON-compatible value", args.namespace, args.key))?;
    match (value, format) {
        (Some(value), _) => print_json(&value)?,
        (None, OutputFormat::Json) => print_json(&Value::Null)?,
        (None, OutputFormat::Table) => {
            println!("{} {}:{}", "Not found:".yellow(), args.namespace, args.key);
        }
    }
    Ok(())
}

pub async fn set(cache: &CacheService, args: &SetArgs) -> Result<()> {
    let value: Value = serde_json::from_str(&args.value).context("value must be valid JSON")?;
    let ttl = args.ttl.map(Duration::from_secs);
    cache.set(&args.key, &value, ttl, &args.namespace).await?;
    print_success(&format!("Stored {}:{}", args.namespace, args.key));
    Ok(())
}

pub async fn delete(cache: &CacheService, args: &KeyArgs) -> Result<()> {
    if cache.delete(&args.key, &args.namespace).await {
        print_success(&format!("Deleted {}:{}", args.namespace, args.key));
    } else {
        println!("{} {}:{}", "Not found:".yellow(), args.namespace, args.key);
    }
    Ok(())
}

pub async fn clear(cache: &CacheService, args: &ClearArgs) -> Result<()> {
    let removed = cache.clear(args.namespace.as_deref()).await;
    let scope = match &args.namespace {
        Some(ns) => format!("namespace {ns}"),
        None => "all namespaces".to_string(),
    };
    print_success(&format!("Removed {removed} entries from {scope}"));
    Ok(())
}

pub async fn cleanup(cache: &CacheService) -> Result<()> {
    let removed = cache.cleanup_expired().await;
    print_success(&format!("Purged {removed} expired entries"));
    Ok(())
}
