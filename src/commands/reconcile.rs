use super::print_report;
use mcp_fleet::config::ServerDefaults;
use mcp_fleet::reconciler::{DanglingReason, RepairOutcome};
use mcp_fleet::Reconciler;

pub async fn run_orphans(reconciler: &Reconciler, cleanup: bool) -> anyhow::Result<()> {
    if cleanup {
        let report = reconciler.cleanup_orphans().await?;
        print_report(&report);
        return Ok(());
    }

    let orphans = reconciler.detect_orphans().await?;
    if orphans.is_empty() {
        println!("No orphaned containers");
        return Ok(());
    }
    for orphan in orphans {
        println!("{}  {}  {}", orphan.id, orphan.name, orphan.state.as_str());
    }
    println!("\nRemove them with: fleet orphans --cleanup");
    Ok(())
}

pub async fn run_reallocate(
    reconciler: &Reconciler,
    base: u16,
    defaults: &ServerDefaults,
) -> anyhow::Result<()> {
    let report = reconciler.reallocate_ports(base, defaults).await?;
    print_report(&report);
    Ok(())
}

pub async fn run_apply_settings(
    reconciler: &Reconciler,
    defaults: &ServerDefaults,
) -> anyhow::Result<()> {
    let report = reconciler.apply_settings_to_existing(defaults).await?;
    print_report(&report);
    Ok(())
}

pub async fn run_dangling(reconciler: &Reconciler, json: bool) -> anyhow::Result<()> {
    let dangling = reconciler.dangling_servers().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dangling)?);
        return Ok(());
    }
    if dangling.is_empty() {
        println!("All configured servers are consistent");
        return Ok(());
    }

    for entry in dangling {
        let reason = match &entry.reason {
            DanglingReason::FailedRecreation { phase, error } => match error {
                Some(e) => format!("recreation failed while {}: {}", phase, e),
                None => format!("recreation interrupted while {}", phase),
            },
            DanglingReason::MissingContainer => "container no longer exists".to_string(),
        };
        println!("{}  {}  {}", entry.server.id, entry.server.name, reason);
    }
    println!("\nRepair with: fleet repair <server-id>");
    Ok(())
}

pub async fn run_repair(reconciler: &Reconciler, server_id: &str) -> anyhow::Result<()> {
    match reconciler.resolve_dangling(server_id).await? {
        RepairOutcome::NothingToRepair => println!("{} needs no repair", server_id),
        RepairOutcome::MarkerCleared => {
            println!("{}: container exists, cleared recreation marker", server_id)
        }
        RepairOutcome::Unlinked => println!(
            "{}: container is gone, record unlinked (create a new container to use it again)",
            server_id
        ),
    }
    Ok(())
}
