//! Build lifecycle for tilegfx
//!
//! A build runs in two phases:
//! - **Collect**: sprite definitions register replacements into a
//!   [`BuildContext`], usually through
//!   [`VariantCollection::replace_old`](crate::variant::VariantCollection::replace_old)
//! - **Finalize**: the replacement table is coalesced into runs, ordered
//!   most specific key first and guarded, giving a [`FinalPlan`]
//!
//! The plan is then handed to the container encoder through the [`Sink`]
//! trait.
//!
//! # Example
//!
//! ```ignore
//! use tilegfx::build::BuildContext;
//! use tilegfx::config::load_config;
//!
//! let config = load_config(None)?;
//! let mut ctx = BuildContext::new(config);
//! ground.replace_old(&mut ctx, 3924)?;
//!
//! let plan = ctx.finalize()?;
//! plan.emit(&mut encoder)?;
//! ```

pub mod context;
pub mod error;
pub mod plan;
pub mod sink;

pub use context::*;
pub use error::*;
pub use plan::*;
pub use sink::*;
