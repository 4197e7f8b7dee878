//! `fmr report`

use std::path::PathBuf;

use anyhow::{Context, Result};
use fmr_config::{report_unused_keys, LoadedConfig, ReportConfig, UnusedKeyPolicy};
use tracing::warn;

use super::{parse_report_mode, ENV_DATA_ROOT};

pub struct ReportArgs {
    pub config_paths: Vec<String>,
    pub root: Option<String>,
    pub mode: Option<String>,
    pub out: Option<String>,
    pub strict: bool,
}

pub fn report(args: ReportArgs) -> Result<()> {
    let path_refs: Vec<&str> = args.config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = fmr_config::load_layered_yaml(&path_refs)?;
    let cfg = effective_config(&loaded, &args)?;

    let policy = if args.strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let unused = report_unused_keys(cfg.report.mode, &loaded.config_json, policy)?;
    if !unused.is_clean() {
        warn!(
            mode = %cfg.report.mode,
            unused_leaf_keys = unused.unused_leaf_pointers.len(),
            "CONFIG_UNUSED_KEYS"
        );
        for p in &unused.unused_leaf_pointers {
            eprintln!("  unused={p}");
        }
    }

    let outcome = fmr_runtime::run_report(&cfg, &loaded.config_hash)?;

    println!("run_id={}", outcome.run_id);
    println!("mode={}", outcome.mode);
    println!("config_hash={}", loaded.config_hash);
    println!("output={}", outcome.output.display());
    println!("manifest={}", outcome.manifest_path.display());
    println!("rows={}", outcome.rows);
    println!("trade_days={}", outcome.trade_days);
    println!("dropped_rows={}", outcome.dropped_rows);
    Ok(())
}

/// Typed config with CLI flags applied. `FMR_DATA_ROOT` fills the data root
/// only when neither the flag nor any config layer sets it.
fn effective_config(loaded: &LoadedConfig, args: &ReportArgs) -> Result<ReportConfig> {
    let mut cfg = loaded.report_config()?;

    if let Some(root) = &args.root {
        cfg.data.root = PathBuf::from(root);
    } else if loaded.config_json.pointer("/data/root").is_none() {
        if let Ok(root) = std::env::var(ENV_DATA_ROOT) {
            cfg.data.root = PathBuf::from(root);
        }
    }
    if let Some(mode) = &args.mode {
        cfg.report.mode = parse_report_mode(mode)?;
    }
    if let Some(out) = &args.out {
        cfg.report.output = Some(PathBuf::from(out));
    }

    cfg.validate().context("invalid effective config")?;
    Ok(cfg)
}
