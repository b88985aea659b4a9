use mcp_fleet::Reconciler;

pub async fn run_list(reconciler: &Reconciler, json: bool) -> anyhow::Result<()> {
    let containers = reconciler.list_containers().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&containers)?);
        return Ok(());
    }

    if containers.is_empty() {
        println!("No managed containers");
        return Ok(());
    }

    println!(
        "{:<14} {:<24} {:<11} {:<6} {:<10} {:<7} {:<7} {}",
        "ID", "NAME", "STATE", "PORT", "UPTIME", "CPU", "MEM", "VERSION"
    );
    for c in containers {
        let port = if c.port == 0 {
            "-".to_string()
        } else {
            c.port.to_string()
        };
        println!(
            "{:<14} {:<24} {:<11} {:<6} {:<10} {:<7} {:<7} {}",
            c.id,
            c.display_name,
            c.state.as_str(),
            port,
            c.uptime,
            c.cpu,
            c.memory,
            c.version
        );
    }
    Ok(())
}

pub async fn run_start(reconciler: &Reconciler, id: &str) -> anyhow::Result<()> {
    reconciler.start(id).await?;
    println!("Started {}", id);
    Ok(())
}

pub async fn run_stop(reconciler: &Reconciler, id: &str) -> anyhow::Result<()> {
    reconciler.stop(id).await?;
    println!("Stopped {}", id);
    Ok(())
}

pub async fn run_restart(reconciler: &Reconciler, id: &str) -> anyhow::Result<()> {
    reconciler.restart(id).await?;
    println!("Restarted {}", id);
    Ok(())
}

pub async fn run_remove(reconciler: &Reconciler, id: &str, force: bool) -> anyhow::Result<()> {
    reconciler.remove(id, force).await?;
    println!("Removed {}", id);
    Ok(())
}

pub async fn run_pull(reconciler: &Reconciler, image: &str) -> anyhow::Result<()> {
    reconciler.pull_image(image).await?;
    println!("Pulled {}", image);
    Ok(())
}
