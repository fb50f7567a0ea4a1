//! Reusable buffers and keyed-hash objects.
//!
//! Every verification borrows its working memory from the pools defined here
//! through a [`Pooled`] guard. The guard hands the value back on drop, so
//! resources return to their pool on every exit path, early failures
//! included. Values are recycled (cleared or reset) before they become
//! visible to the next borrower.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use dashmap::DashMap;
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use sha2::Sha256;

use crate::sign::config::SignConfig;
use crate::sign::error::SignError;
use crate::sign::tokenizer::Pair;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Label used to derive the init-data master key from a bot token.
const WEB_APP_DATA: &[u8] = b"WebAppData";

/// Values that can be returned to a [`Pool`].
pub trait Recycle {
    /// Restores the value to a pristine state without releasing capacity.
    fn recycle(&mut self);
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl Recycle for HmacSha256 {
    fn recycle(&mut self) {
        Mac::reset(self);
    }
}

/// A bounded free-list of reusable values.
///
/// `acquire` pops an idle value or builds a new one; released values beyond
/// `max_idle` are dropped instead of retained.
pub struct Pool<T> {
    idle: Mutex<Vec<T>>,
    max_idle: usize,
    create: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Recycle> Pool<T> {
    /// Creates an empty pool that builds new values with `create`.
    pub fn new<F>(max_idle: usize, create: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            create: Box::new(create),
        }
    }

    /// Borrows a value for exclusive use until the guard is dropped.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let value = self.idle.lock().pop().unwrap_or_else(|| (self.create)());
        Pooled {
            value: Some(value),
            pool: self,
        }
    }

    /// Number of values currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut value: T) {
        value.recycle();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(value);
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.idle.lock().len())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Exclusive handle to a pooled value; returns it to the pool on drop.
pub struct Pooled<'a, T: Recycle> {
    // Only `None` while `drop` runs.
    value: Option<T>,
    pool: &'a Pool<T>,
}

impl<T: Recycle> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("pooled value already released")
    }
}

impl<T: Recycle> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("pooled value already released")
    }
}

impl<T: Recycle> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}

/// Per-call working buffers, one pool per purpose.
pub(crate) struct BufferPools {
    pub(crate) pairs: Pool<Vec<Pair>>,
    pub(crate) scratch: Pool<Vec<u8>>,
    pub(crate) canonical: Pool<Vec<u8>>,
}

impl BufferPools {
    pub(crate) fn new(config: &SignConfig) -> Self {
        let pair_capacity = config.pair_capacity;
        let scratch_capacity = config.scratch_capacity;
        let canonical_capacity = config.canonical_capacity;
        Self {
            pairs: Pool::new(config.max_idle, move || Vec::with_capacity(pair_capacity)),
            scratch: Pool::new(config.max_idle, move || Vec::with_capacity(scratch_capacity)),
            canonical: Pool::new(config.max_idle, move || {
                Vec::with_capacity(canonical_capacity)
            }),
        }
    }
}

/// How the HMAC key is obtained from the caller's secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySchedule {
    /// The secret is the HMAC key.
    Raw,
    /// The HMAC key is `HMAC-SHA256(key = "WebAppData", msg = secret)`.
    WebAppData,
}

impl KeySchedule {
    fn derive(self, secret: &[u8]) -> Result<Vec<u8>, SignError> {
        match self {
            KeySchedule::Raw => Ok(secret.to_vec()),
            KeySchedule::WebAppData => {
                let mut mac = HmacSha256::new_from_slice(WEB_APP_DATA)
                    .map_err(|_| SignError::Configuration)?;
                mac.update(secret);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }
}

/// Keyed-hash pools indexed by key schedule and secret.
///
/// Building an HMAC instance runs the key schedule, which dominates the cost
/// of hashing a short canonical string. Each distinct secret therefore gets
/// its own pool whose instances are clones of a keyed prototype. Pool
/// creation happens under the map's entry lock, so a derived key is computed
/// once per secret and concurrent first callers all see the finished pool.
///
/// Pools are kept for every distinct secret ever seen and never evicted.
/// With application secrets from a fixed table this is bounded; with bot
/// tokens supplied by untrusted callers it grows with each new token until
/// [`MacPools::clear`] runs.
pub(crate) struct MacPools {
    raw: DashMap<Vec<u8>, Arc<Pool<HmacSha256>>>,
    web_app_data: DashMap<Vec<u8>, Arc<Pool<HmacSha256>>>,
    max_idle: usize,
}

impl MacPools {
    pub(crate) fn new(config: &SignConfig) -> Self {
        Self {
            raw: DashMap::new(),
            web_app_data: DashMap::new(),
            max_idle: config.max_idle,
        }
    }

    fn map(&self, schedule: KeySchedule) -> &DashMap<Vec<u8>, Arc<Pool<HmacSha256>>> {
        match schedule {
            KeySchedule::Raw => &self.raw,
            KeySchedule::WebAppData => &self.web_app_data,
        }
    }

    /// Returns the pool serving `secret`, creating it on first use.
    pub(crate) fn pool_for(
        &self,
        schedule: KeySchedule,
        secret: &[u8],
    ) -> Result<Arc<Pool<HmacSha256>>, SignError> {
        let map = self.map(schedule);
        if let Some(pool) = map.get(secret) {
            return Ok(Arc::clone(pool.value()));
        }

        let max_idle = self.max_idle;
        let entry = map.entry(secret.to_vec()).or_try_insert_with(|| {
            let key = schedule.derive(secret)?;
            let prototype =
                HmacSha256::new_from_slice(&key).map_err(|_| SignError::Configuration)?;
            tracing::trace!(?schedule, "created keyed hash pool");
            Ok::<_, SignError>(Arc::new(Pool::new(max_idle, move || prototype.clone())))
        })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Drops every pool. Instances already borrowed finish on their own `Arc`.
    pub(crate) fn clear(&self) {
        self.raw.clear();
        self.web_app_data.clear();
    }

    /// Number of distinct secrets with a pool.
    pub(crate) fn secret_count(&self) -> usize {
        self.raw.len() + self.web_app_data.len()
    }
}

/// Snapshot of pool occupancy, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Idle pair lists.
    pub idle_pair_lists: usize,
    /// Idle percent-decoding scratch buffers.
    pub idle_scratch_buffers: usize,
    /// Idle canonical-string buffers.
    pub idle_canonical_buffers: usize,
    /// Secrets that currently own a keyed-hash pool.
    pub keyed_secrets: usize,
}

impl PoolStats {
    pub(crate) fn collect(buffers: &BufferPools, macs: &MacPools) -> Self {
        Self {
            idle_pair_lists: buffers.pairs.idle_count(),
            idle_scratch_buffers: buffers.scratch.idle_count(),
            idle_canonical_buffers: buffers.canonical.idle_count(),
            keyed_secrets: macs.secret_count(),
        }
    }
}
