// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Diagnose *why* a DNS name does or does not resolve.
//!
//! Two engines share one trace document and one outcome taxonomy:
//!
//! - [`ladder`] queries a list of recursive resolvers in order (RD=1) and
//!   classifies by the first decisive answer.
//! - [`tracer`] performs iterative resolution from the root servers (RD=0),
//!   chasing referrals, glue, and CNAME/DNAME chains, with a parallel
//!   per-hop fan-out.
//!
//! Both produce a [`model::TraceResult`]: the ordered query/response steps,
//! per-step timings, and a single [`diagnose::OutcomeKind`] classification
//! (`SUCCESS`, `NXDOMAIN`, `NODATA`, `BROKEN_DELEGATION`, `LAME_DELEGATION`,
//! or `SERVFAIL_TIMEOUT`).

#![warn(
    clippy::default_trait_access,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::unimplemented,
    missing_copy_implementations,
    missing_docs,
    non_snake_case,
    non_upper_case_globals,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod client;
pub mod diagnose;
pub mod error;
pub mod ladder;
pub mod model;
pub mod output;
pub mod resolvers;
mod response;
pub mod root_hints;
pub mod tracer;
pub mod transport;

pub use client::{Client, ClientOptions, Protocol, TransportMode};
pub use diagnose::{diagnose, Outcome, OutcomeKind};
pub use error::{Error, ErrorKind};
pub use model::TraceResult;
pub use tracer::{Tracer, TracerConfig};
