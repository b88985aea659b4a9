mod containers;
mod monitor;
mod reconcile;

pub use containers::{run_list, run_pull, run_remove, run_restart, run_start, run_stop};
pub use monitor::run_monitor;
pub use reconcile::{run_apply_settings, run_dangling, run_orphans, run_reallocate, run_repair};

use mcp_fleet::reconciler::BulkReport;

/// Print a bulk report in a compact human form.
pub(crate) fn print_report(report: &BulkReport) {
    println!(
        "{}: {} succeeded, {} skipped, {} failed",
        report.operation,
        report.succeeded.len(),
        report.skipped.len(),
        report.failures.len()
    );
    for item in &report.recreated {
        println!("  recreated  {}", item);
    }
    for skipped in &report.skipped {
        println!("  skipped    {} ({})", skipped.item, skipped.reason);
    }
    for failure in &report.failures {
        println!("  failed     {}: {}", failure.item, failure.error);
    }
}
