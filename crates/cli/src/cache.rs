use crate::GlobalArgs;
use crate::session::load_config;
use classdex_api::{CacheStats, PlatformCacheManager};
use classdex_core::PlatformCache;
use clap::Subcommand;
use tabled::{Table, Tabled};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show platform cache statistics
    Stats,
    /// Delete the platform cache file
    Clear,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Key")]
    key: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn run(global: &GlobalArgs, cmd: CacheCommands) -> Result<(), Box<dyn std::error::Error>> {
    // Only the cache location matters here, so `--no-cache` is ignored
    let config = load_config(&GlobalArgs {
        no_cache: false,
        ..global.clone()
    })?;
    let cache: Box<dyn PlatformCacheManager> = Box::new(PlatformCache::new(config.cache_dir.clone()));

    match cmd {
        CacheCommands::Stats => {
            let stats = cache.stats();
            if !stats.exists {
                println!("No platform cache at {}", stats.cache_file.display());
            } else {
                println!("{}", Table::new(stat_rows(&stats, now_secs())));
            }
        }
        CacheCommands::Clear => {
            cache.clear()?;
            println!("Platform cache cleared.");
        }
    }

    Ok(())
}

fn stat_rows(stats: &CacheStats, now: u64) -> Vec<StatRow> {
    let optional = |value: Option<String>| value.unwrap_or_else(|| "unreadable".to_string());
    vec![
        StatRow {
            key: "File",
            value: stats.cache_file.display().to_string(),
        },
        StatRow {
            key: "Size",
            value: format_size(stats.size_bytes),
        },
        StatRow {
            key: "Format",
            value: optional(stats.format_version.map(|v| format!("v{}", v))),
        },
        StatRow {
            key: "JDK",
            value: optional(stats.fingerprint.clone()),
        },
        StatRow {
            key: "Age",
            value: optional(stats.created_at.map(|t| format_age(now.saturating_sub(t)))),
        },
        StatRow {
            key: "Packages",
            value: stats.package_count.to_string(),
        },
        StatRow {
            key: "Types",
            value: stats.type_count.to_string(),
        },
    ]
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    }
}

fn format_age(age: u64) -> String {
    if age < 60 {
        format!("{}s ago", age)
    } else if age < 3600 {
        format!("{}m ago", age / 60)
    } else if age < 86400 {
        format!("{}h ago", age / 3600)
    } else {
        format!("{}d ago", age / 86400)
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
