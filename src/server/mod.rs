//! HTTP layer for bitblt.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                                                                 │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌────────────────────┐  │
//! │  │  handlers   │  │    middleware    │  │       routes       │  │
//! │  │ (health,    │  │ (directive, HTML │  │  (origin wrapping) │  │
//! │  │  errors)    │  │  rewrite, resize)│  │                    │  │
//! │  └─────────────┘  └──────────────────┘  └────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::{health_handler, ErrorResponse, HealthResponse};
pub use middleware::{bitblt_middleware, BitbltState, CACHE_STATUS_HEADER};
pub use routes::{create_router, wrap_router, RouterConfig};
