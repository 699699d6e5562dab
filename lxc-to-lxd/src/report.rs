use colored::Colorize;

use crate::migrate::{BatchReport, ContainerStatus};
use crate::target::{Device, TargetSpec};

/// Render batch results for terminal output.
pub fn render_batch_text(report: &BatchReport, verbose: bool) -> String {
    let mut out = Vec::new();
    out.push(
        format!(
            "result containers={} succeeded={} failed={}",
            report.containers.len(),
            report.succeeded(),
            report.failed()
        )
        .cyan()
        .to_string(),
    );

    if report.containers.is_empty() {
        out.push("- none".to_string());
        return out.join("\n");
    }

    for container in &report.containers {
        match &container.status {
            ContainerStatus::Migrated { spec } => {
                out.push(format!("- [{}] {}", "MIGRATED".green(), container.name));
                if verbose {
                    out.push(render_spec(spec));
                }
            }
            ContainerStatus::DryRun { spec } => {
                out.push(format!("- [{}] {}", "DRY-RUN".yellow(), container.name));
                out.push(render_spec(spec));
            }
            ContainerStatus::Failed { code, reason } => {
                out.push(format!(
                    "- [{}] {}: {code}: {reason}",
                    "FAILED".red(),
                    container.name
                ));
            }
        }
    }
    out.join("\n")
}

/// Indented summary of a translated container.
pub fn render_spec(spec: &TargetSpec) -> String {
    let mut out = Vec::new();
    out.push(format!(
        "  architecture: {}",
        spec.architecture
            .map(|arch| arch.to_string())
            .unwrap_or_else(|| "host".to_string())
    ));
    out.push(format!("  profiles: {}", spec.profiles.join(",")));
    out.push("  config".to_string());
    for (key, value) in &spec.config {
        out.push(format!("    {key}={value}"));
    }
    out.push("  devices".to_string());
    if spec.devices.is_empty() {
        out.push("    none".to_string());
    }
    for (name, device) in &spec.devices {
        let kind = match device {
            Device::Nic(_) => "nic",
            Device::Disk(_) => "disk",
        };
        let attrs: Vec<String> = device
            .attributes()
            .into_iter()
            .filter(|(key, _)| *key != "type")
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        out.push(format!("    {name} ({kind}) {}", attrs.join(" ")));
    }
    out.join("\n")
}
