// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Theory managers: typed, backend-agnostic formula construction.
//!
//! Each manager is a stateless view over a backend; all managers attached to
//! the same [`Environment`](crate::env::Environment) build terms in the same
//! term graph. Managers are kind-preserving by construction, so their
//! operations cannot produce an ill-sorted wrapper.

mod arrays;
mod bools;
mod ints;
mod strings;

pub use arrays::Arrays;
pub use bools::Bools;
pub use ints::Ints;
pub use strings::Strings;
