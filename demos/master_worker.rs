//! Master/worker - a task queue shared by three workers.
//!
//! The master stores thirty integers into `task`. Each worker has its own
//! session, consumes tasks with a blocking `ifetch` cursor and stores
//! `(worker, n, n * n)` into `result`, which the master collects.
//!
//! ```text
//! RUST_LOG=nws_client=debug cargo run --example master_worker
//! ```

use nws_client::{Mode, Session, SessionConfig};

const NUM_WORKERS: usize = 3;
const NUM_TASKS: i64 = 30;

async fn worker(name: String, config: SessionConfig, workspace: String) -> nws_client::Result<()> {
    let session = Session::from_config(config).await?;
    let ws = session.use_workspace(&workspace).await?;

    let mut tasks = ws.ifetch("task");
    loop {
        let n: i64 = tasks.next().await?;
        ws.store("result", &(name.as_str(), n, n * n)).await?;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SessionConfig::default();
    let session = Session::from_config(config.clone()).await?;
    let ws = session.open_workspace("test").await?;
    ws.declare("task", Mode::Fifo).await?;
    ws.declare("result", Mode::Fifo).await?;

    let mut workers = Vec::new();
    for i in 0..NUM_WORKERS {
        let name = format!("Worker_{}", i);
        workers.push(tokio::spawn(worker(
            name,
            config.clone(),
            ws.name().to_string(),
        )));
    }

    for i in 0..NUM_TASKS {
        ws.store("task", &i).await?;
    }

    for _ in 0..NUM_TASKS {
        let (name, n, square): (String, i64, i64) = ws.fetch("result").await?;
        println!("{}: {} squared is {}", name, n, square);
    }

    for handle in workers {
        handle.abort();
    }
    session.close().await?;
    Ok(())
}
