//! Publish/subscribe - three subscribers follow one variable.
//!
//! Every subscriber walks `x` with its own blocking `ifind` cursor, so each
//! sees every published value without consuming it. `-1` ends the stream.
//!
//! ```text
//! cargo run --example pub_sub
//! ```

use nws_client::{Mode, Session};

const END_OF_STREAM: i32 = -1;

async fn subscriber(name: String) -> nws_client::Result<()> {
    let session = Session::builder().connect().await?;
    let ws = session.use_workspace("test").await?;

    let mut x = ws.ifind("x");
    loop {
        let i: i32 = x.next().await?;
        if i == END_OF_STREAM {
            break;
        }
        println!("{}: got {}", name, i);
    }
    session.close().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let session = Session::builder().connect().await?;
    let ws = session.open_workspace("test").await?;
    let x = ws.declare("x", Mode::Fifo).await?;

    let subscribers: Vec<_> = (0..3)
        .map(|i| tokio::spawn(subscriber(format!("Sub_{}", i))))
        .collect();

    for i in 0..10 {
        x.store(&i).await?;
    }
    x.store(&END_OF_STREAM).await?;

    for handle in subscribers {
        handle.await??;
    }
    session.close().await?;
    Ok(())
}
