// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Result aggregation
//!
//! Stage reports are read with [`parse`] (JUnit XML) and folded into a single
//! [`AggregateReport`] with [`fold`].

mod aggregate;
mod junit;
mod model;

pub use aggregate::fold;
pub use junit::{parse, parse_str};
pub use model::*;
