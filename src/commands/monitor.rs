use mcp_fleet::config::MonitorConfig;
use mcp_fleet::docker::ContainerRuntime;
use mcp_fleet::reconciler::RuntimeMonitor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run_monitor(
    runtime: Arc<dyn ContainerRuntime>,
    config: MonitorConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let (monitor, mut events) = RuntimeMonitor::spawn(runtime, config, &cancel);
    println!("Watching container runtime (Ctrl-C to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(event) => println!(
                    "{}  runtime {}",
                    event.checked_at.format("%Y-%m-%d %H:%M:%S"),
                    event.status
                ),
                None => break,
            },
        }
    }

    monitor.stop().await;
    Ok(())
}
