//! Human-readable deployment summary built from a topology descriptor.
//!
//! Rendering is pure so it can be tested and reused by the `summary` command
//! against a descriptor read back from disk. Any field the descriptor lacks
//! is left out rather than printed as a placeholder.

use apex_common::TopologyDescriptor;
use console::style;
use std::fmt::Write;

use crate::ui::icons::{BOOKS, BULLET, METRICS, PARTY, ROCKET, TARGET};

const WIDTH: usize = 62;

/// Render the summary as plain text lines.
pub fn render_summary(descriptor: &TopologyDescriptor) -> String {
    let mut out = String::new();
    let arch = &descriptor.architecture;
    let endpoints = &descriptor.endpoints;

    let _ = writeln!(out);
    let _ = writeln!(out, "┌{}┐", "─".repeat(WIDTH));
    let _ = writeln!(
        out,
        "│  {:<w$}│",
        "APEX NEXUS SUPREME - FULLY OPERATIONAL!",
        w = WIDTH - 2
    );
    let _ = writeln!(out, "└{}┘", "─".repeat(WIDTH));

    let mut metrics = Vec::new();
    let repos = descriptor.repositories();
    if !repos.is_empty() {
        metrics.push(format!("Repositories Integrated: {}", repos.len()));
    }
    if !arch.memory.systems.is_empty() {
        metrics.push(format!(
            "Memory Systems: {} ({})",
            arch.memory.systems.len(),
            arch.memory.systems.join(", ")
        ));
    }
    if arch.orchestration.api_count > 0 {
        metrics.push(format!("API Integrations: {}+", arch.orchestration.api_count));
    }
    metrics.push(format!("Skills: {}", arch.execution.skills));
    if let Some(bolt) = &arch.graph.bolt {
        metrics.push(format!("Graph Database: {}", bolt));
    }
    section(&mut out, &format!("{}Deployment Metrics:", METRICS), &metrics);

    let access: Vec<String> = [
        ("APEX API Gateway", endpoints.apex_api.as_ref()),
        ("Health Check", endpoints.health.as_ref()),
        ("Graph Browser", arch.graph.http.as_ref()),
        ("Dashboard", descriptor.monitoring.dashboard.as_ref()),
        ("Metrics", descriptor.monitoring.metrics.as_ref()),
    ]
    .into_iter()
    .filter_map(|(label, url)| url.map(|u| format!("{}: {}", label, u)))
    .collect();
    section(&mut out, &format!("{}Access Points:", TARGET), &access);

    let commands: Vec<String> = [
        ("Add Memory", "curl -X POST", endpoints.memory_add.as_ref()),
        ("Search", "curl -X POST", endpoints.memory_search.as_ref()),
        ("Forensic", "curl -X POST", endpoints.forensic.as_ref()),
        ("Health", "curl", endpoints.health.as_ref()),
    ]
    .into_iter()
    .filter_map(|(label, cmd, url)| url.map(|u| format!("{}: {} {}", label, cmd, u)))
    .collect();
    section(&mut out, &format!("{}Quick Commands:", ROCKET), &commands);

    let mut steps = vec![
        "Run tests: make apex-test".to_string(),
        "View docs: open docs/ARCHITECTURE.md".to_string(),
    ];
    if let Some(dashboard) = &descriptor.monitoring.dashboard {
        steps.push(format!("Monitor dashboard: open {}", dashboard));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}Next Steps:", BOOKS);
    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, step);
    }

    out
}

fn section(out: &mut String, header: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", header);
    for line in lines {
        let _ = writeln!(out, "  {}{}", BULLET, line);
    }
}

pub fn print_summary(descriptor: &TopologyDescriptor) {
    print!("{}", render_summary(descriptor));
}

/// Closing line after a successful deployment.
pub fn print_completion(topology_path: &std::path::Path) {
    println!();
    println!(
        "{}{} Topology written to {}",
        PARTY,
        style("Deployment complete.").green().bold(),
        topology_path.display()
    );
}
