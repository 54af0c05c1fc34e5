//! # Example: swarm
//!
//! Builds three services, wires them with queues and runs them until Ctrl-C.
//!
//! Shows how to:
//! - Register creators that do setup work and spawn build-phase watchers
//! - Forward a queue into another with [`Queue::bypass`]
//! - Start the swarm and wait for its completion signal
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► register "ticker"   (publishes ticks on `ticks`)
//!   ├─► register "alerts"   (publishes every 5th tick on `alerts`, which bypasses to `ticks`)
//!   ├─► register "printer"  (subscribes to `ticks`, prints everything)
//!   ├─► Swarm::start(root)
//!   ├─► wait for Ctrl-C ──► root.cancel()
//!   └─► instance.done().await
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example swarm
//! ```

use std::time::Duration;

use swarmvisor::{CreateError, CreatorFn, DirectCreator, Queue, QueueConfig, RunnerFn, Swarm};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1. Topology: `alerts` forwards into `ticks`; `printer` reads `ticks`.
    let ticks: Queue<String> = Queue::with_config(QueueConfig::default().with_buffer_len(8));
    let alerts: Queue<String> = Queue::new();
    alerts.bypass(&ticks);
    let mut feed = ticks.subscribe();

    let swarm = Swarm::new();

    // 2. A creator with a build-phase watcher.
    let tx = ticks.clone();
    swarm.register(CreatorFn::new("ticker", move |build: CancellationToken| async move {
        tokio::spawn(async move {
            build.cancelled().await;
            tracing::info!("build context released");
        });
        Ok::<_, CreateError>(RunnerFn::new(move |ctx: CancellationToken| async move {
            let mut n = 0u64;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(500)) => {
                        n += 1;
                        tx.send(format!("tick {n}")).await;
                    }
                }
            }
        }))
    }));

    // 3. A creator that validates its input before building.
    let every = 5u64;
    let alert_tx = alerts.clone();
    swarm.register(CreatorFn::new("alerts", move |_build: CancellationToken| async move {
        if every == 0 {
            return Err(CreateError::fail("alert period must be positive"));
        }
        Ok(RunnerFn::new(move |ctx: CancellationToken| async move {
            let period = Duration::from_millis(500 * every);
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = tokio::time::sleep(period) => alert_tx.send("alert!".to_string()).await,
                }
            }
        }))
    }));

    // 4. A service that needs no setup.
    swarm.register(DirectCreator::new(
        "printer",
        RunnerFn::new(move |ctx: CancellationToken| async move {
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    msg = feed.recv() => match msg {
                        Some(msg) => println!("{msg}"),
                        None => break,
                    },
                }
            }
        }),
    ));

    // 5. Build and run; Ctrl-C cancels the run context.
    let root = CancellationToken::new();
    let instance = swarm
        .start(&root)
        .await
        .map_err(|e| anyhow::anyhow!("swarm build failed: {e}"))?;
    println!("{} services running, press Ctrl-C to stop", instance.len());

    tokio::signal::ctrl_c().await?;
    root.cancel();
    instance.done().await;
    println!("all services stopped");
    Ok(())
}
