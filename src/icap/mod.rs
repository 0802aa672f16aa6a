//! ICAP/1.0 protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection from the proxy
//!     → server.rs (accept loop, persistent connection handling)
//!     → head.rs (ICAP request line, headers, Encapsulated offsets)
//!     → http_head.rs (embedded HTTP request head → CarriedRequest)
//!     → chunked.rs (preview / body)
//!     → [decision engine picks the outcome]
//!     → response.rs (status, ISTag, Service, echoed request)
//!     → Send to proxy
//! ```

pub mod chunked;
pub mod error;
pub mod head;
pub mod http_head;
pub mod response;
pub mod server;

pub use error::IcapError;
pub use response::ServiceIdentity;
pub use server::IcapServer;
