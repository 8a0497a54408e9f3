// src/relay/reply.rs

//! Seams to the external collaborators: reply delivery and authorization.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::relay::UserId;

/// Capability to send one text reply back to the conversation a command came
/// from.
pub trait ReplySink: Send + Sync {
    fn send_reply(&self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// `is_authorized(user_id)` predicate.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, user_id: UserId) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(UserId) -> bool + Send + Sync,
{
    fn is_authorized(&self, user_id: UserId) -> bool {
        self(user_id)
    }
}

/// Static allow-list of user ids, loaded from config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ids: BTreeSet<UserId>,
}

impl AllowList {
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Authorizer for AllowList {
    fn is_authorized(&self, user_id: UserId) -> bool {
        self.ids.contains(&user_id)
    }
}
