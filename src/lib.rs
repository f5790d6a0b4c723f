//! # nws-client
//!
//! Rust client for NetWorkSpaces (NWS) servers.
//!
//! An NWS server hosts named workspaces of named variables. Processes
//! coordinate by storing values into variables and finding or fetching them
//! back, in FIFO, LIFO, MULTI or SINGLE order.
//!
//! ## Architecture
//!
//! - **Transport**: one TCP connection per [`Session`], handshaken on connect
//! - **Protocol**: fixed-width ASCII decimal framing of requests and responses
//! - **Codec**: typed values through an injected [`Serializer`](codec::Serializer)
//!   (MessagePack by default), or raw bytes passed through untouched
//!
//! ## Example
//!
//! ```ignore
//! use nws_client::{Mode, Session};
//!
//! #[tokio::main]
//! async fn main() -> nws_client::Result<()> {
//!     let session = Session::connect("localhost", 8765).await?;
//!     let ws = session.open_workspace("example").await?;
//!
//!     let queue = ws.declare("queue", Mode::Fifo).await?;
//!     queue.store(&1).await?;
//!     queue.store(&2).await?;
//!
//!     assert_eq!(queue.fetch::<i32>().await?, 1);
//!     assert_eq!(queue.fetch_try(-1).await?, 2);
//!     assert_eq!(queue.fetch_try(-1).await?, -1);
//!
//!     session.close().await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod mode;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod variable;
pub mod workspace;

pub use codec::{JsonCodec, MsgPackCodec, Value};
pub use config::{SessionConfig, WorkspaceOptions};
pub use cursor::Cursor;
pub use error::{NwsError, Result};
pub use mode::Mode;
pub use session::{Session, SessionBuilder};
pub use variable::Variable;
pub use workspace::{Retrieval, Workspace};
