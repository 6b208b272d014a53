use std::path::Path;

use anyhow::Context;

use pulse_core::{Defaults, PulseConfig, ResolvedConfig};

pub fn validate(config: &Path, format: &str) -> anyhow::Result<()> {
    let cfg = PulseConfig::from_file(config)?.resolve(&Defaults::default())?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary_json(&cfg))?),
        _ => print!("{}", summary_text(&cfg)),
    }
    Ok(())
}

pub fn init(config: &Path, force: bool) -> anyhow::Result<()> {
    if config.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", config.display());
    }
    let text = PulseConfig::sample()
        .to_toml_string()
        .context("failed to serialize sample configuration")?;
    std::fs::write(config, text).with_context(|| format!("failed to write {}", config.display()))?;
    println!("✓ Generated {}", config.display());
    Ok(())
}

fn summary_text(cfg: &ResolvedConfig) -> String {
    let mut out = format!(
        "{} service(s), {} endpoint(s), history kept {} day(s), concurrency {}\n",
        cfg.services.len(),
        cfg.endpoint_count(),
        cfg.max_log_days,
        cfg.concurrency
    );
    for svc in &cfg.services {
        out.push_str(&format!(
            "  {} (timeout {}s, retry {})\n",
            svc.name,
            svc.settings.timeout.as_secs(),
            svc.settings.retry
        ));
        for ep in svc.endpoints() {
            out.push_str(&format!("    {:<6} {:<4} {}\n", ep.kind, ep.method, ep.url));
        }
    }
    out
}

fn summary_json(cfg: &ResolvedConfig) -> serde_json::Value {
    let services: Vec<_> = cfg
        .services
        .iter()
        .map(|svc| {
            let endpoints: Vec<_> = svc
                .endpoints()
                .map(|ep| {
                    serde_json::json!({
                        "kind": ep.kind,
                        "method": ep.method,
                        "url": ep.url,
                        "expected_status": ep.expected_status,
                        "response_regex": ep.response_pattern.as_ref().map(|r| r.as_str()),
                    })
                })
                .collect();
            serde_json::json!({
                "name": svc.name,
                "timeout_secs": svc.settings.timeout.as_secs(),
                "retry": svc.settings.retry.get(),
                "endpoints": endpoints,
            })
        })
        .collect();

    serde_json::json!({
        "max_log_days": cfg.max_log_days,
        "concurrency": cfg.concurrency,
        "services": services,
    })
}
