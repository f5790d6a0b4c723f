//! Simple - store ten values, then read them back with a cursor.
//!
//! Needs an NWS server on `localhost:8765`.
//!
//! ```text
//! cargo run --example simple
//! ```

use nws_client::{Mode, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let session = Session::builder().connect().await?;
    let ws = session.open_workspace("test").await?;
    let x = ws.declare("x", Mode::Fifo).await?;

    for i in 0..10 {
        x.store(&i).await?;
    }

    let mut values = x.ifind_try()?;
    while let Some(i) = values.try_next::<i32>().await? {
        println!("{}", i);
    }

    session.close().await?;
    Ok(())
}
