// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::sync::Arc;
use std::{future::Future, pin::Pin};
use tokio::sync::OnceCell;

pub type ApiKeyResolverFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Option<String>> + Send>> + Send + Sync>;

/// Source of the intake API key.
///
/// A dynamic key is resolved on first use and cached for the life of the
/// process, so a slow secret lookup never delays startup.
#[derive(Clone)]
pub enum ApiKeyFactory {
    Static(String),
    Dynamic {
        resolver_fn: ApiKeyResolverFn,
        api_key: Arc<OnceCell<Option<String>>>,
    },
}

impl ApiKeyFactory {
    pub fn new(api_key: &str) -> Self {
        Self::Static(api_key.to_string())
    }

    pub fn new_from_resolver(resolver_fn: ApiKeyResolverFn) -> Self {
        Self::Dynamic {
            resolver_fn,
            api_key: Arc::new(OnceCell::new()),
        }
    }

    /// Returns `None` when no usable (non-empty) key could be obtained.
    pub async fn get_api_key(&self) -> Option<&str> {
        let key = match self {
            Self::Static(api_key) => Some(api_key.as_str()),
            Self::Dynamic {
                resolver_fn,
                api_key,
            } => api_key
                .get_or_init(|| async { (resolver_fn)().await })
                .await
                .as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

impl Debug for ApiKeyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKeyFactory")
    }
}
