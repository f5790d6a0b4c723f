//! Babelfish - renders stored values as text for the server's web interface.
//!
//! Fetches every value stored into `food`, renders it as text and stores the
//! UTF-8 bytes raw into `doof`. Values that cannot be decoded are answered
//! with the decode error.
//!
//! ```text
//! cargo run --example babelfish
//! ```

use nws_client::codec::MsgPackCodec;
use nws_client::{NwsError, Session, Value};

const MAX_LEN: usize = 1000;

fn render(value: &Value) -> String {
    let text = if value.is_raw() {
        String::from_utf8_lossy(value.as_bytes()).into_owned()
    } else {
        match value.decode::<MsgPackCodec, serde_json::Value>() {
            Ok(serde_json::Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(NwsError::Deserialize(msg)) => return msg,
            Err(e) => return e.to_string(),
        }
    };

    if text.is_empty() {
        return "\"\"".to_string();
    }
    match text.char_indices().nth(MAX_LEN) {
        Some((cut, _)) => format!("{}[WARNING: output truncated]", &text[..cut]),
        None => text,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let session = Session::builder().connect().await?;
    let ws = session.open_workspace("Rust babelfish").await?;

    loop {
        let value = ws.fetch_value("food").await?;
        let text = render(&value);
        tracing::debug!("Translated {} bytes into {} chars", value.as_bytes().len(), text.len());
        ws.store_bytes("doof", text.into_bytes()).await?;
    }
}
