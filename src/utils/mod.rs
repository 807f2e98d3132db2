// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod retry;
pub mod text;

pub use retry::{RetryPolicy, RetryableError};
pub use text::{preview, truncate_chars};
