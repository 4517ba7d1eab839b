//! Fee routing.
//!
//! Fees collected in arbitrary tokens are swapped into the reward token
//! through allow-listed routers and handed to a dividend sink. Route lookup
//! is external: a [`RouteResolver`] returns an opaque payload that is
//! forwarded to the router unmodified.

pub mod dividend;
pub mod error;
pub mod manager;
pub mod route;
pub mod router;

pub use dividend::{DividendPool, DividendSink};
pub use error::{FeeError, Result};
pub use manager::FeeManager;
pub use route::{RouteQuery, RouteResolver, StaticRouteResolver, SwapRoute};
pub use router::{FixedRateRouter, SwapRouter};
