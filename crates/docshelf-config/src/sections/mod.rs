// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod docsets;
mod http;
mod logging;

pub use docsets::{DocsetsConfig, DocsetsConfigLayer, DEFAULT_CATALOG_URL};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
