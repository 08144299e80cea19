// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Refresh token storage.
//!
//! Outstanding refresh tokens are tracked in an allow-list. Refresh and logout
//! consume the presented token; a token that was never registered or has
//! already been consumed is rejected the same way.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::error::ApiResult;

// =============================================================================
// TokenStore
// =============================================================================

/// Storage for outstanding refresh tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Records a newly issued refresh token.
    async fn register(&self, token: &str, expires_at: i64) -> ApiResult<()>;

    /// Removes the token, returning `true` if it was outstanding and unexpired.
    ///
    /// Must be atomic: of two concurrent calls with the same token at most one
    /// returns `true`.
    async fn consume(&self, token: &str) -> ApiResult<bool>;

    /// Drops expired records, returning how many were removed.
    async fn purge_expired(&self) -> ApiResult<usize>;
}

// =============================================================================
// MemoryTokenStore
// =============================================================================

/// In-memory token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<String, i64>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of outstanding tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no tokens are outstanding.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn register(&self, token: &str, expires_at: i64) -> ApiResult<()> {
        self.tokens.insert(token.to_string(), expires_at);
        Ok(())
    }

    async fn consume(&self, token: &str) -> ApiResult<bool> {
        let now = Utc::now().timestamp();
        Ok(self
            .tokens
            .remove(token)
            .is_some_and(|(_, expires_at)| expires_at >= now))
    }

    async fn purge_expired(&self) -> ApiResult<usize> {
        let now = Utc::now().timestamp();
        let before = self.tokens.len();
        self.tokens.retain(|_, expires_at| *expires_at >= now);
        Ok(before.saturating_sub(self.tokens.len()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn in_an_hour() -> i64 {
        Utc::now().timestamp() + 3600
    }

    #[tokio::test]
    async fn test_consume_once() {
        let store = MemoryTokenStore::new();
        store.register("r1", in_an_hour()).await.unwrap();

        assert!(store.consume("r1").await.unwrap());
        assert!(!store.consume("r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_unknown() {
        let store = MemoryTokenStore::new();
        assert!(!store.consume("never-issued").await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_expired() {
        let store = MemoryTokenStore::new();
        store.register("old", Utc::now().timestamp() - 10).await.unwrap();

        assert!(!store.consume("old").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryTokenStore::new();
        store.register("old", Utc::now().timestamp() - 10).await.unwrap();
        store.register("fresh", in_an_hour()).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_consume_single_winner() {
        let store = Arc::new(MemoryTokenStore::new());
        store.register("shared", in_an_hour()).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.consume("shared").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }
}
