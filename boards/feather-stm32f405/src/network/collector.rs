#![deny(unsafe_code)]
#![deny(warnings)]
//! Pending batch access from the network task
//!
//! The batch is an RTIC shared resource also written by the input task, so
//! every access goes through the resource lock. The uploader only ever locks
//! for the snapshot and the acknowledge, never across an `await`.

use redlight_core::{BatchStore, PendingBatch};

/// `BatchStore` over an RTIC shared-resource proxy
pub struct SharedBatch<M>(pub M);

impl<M, const K: usize> BatchStore<K> for SharedBatch<M>
where
    M: rtic::Mutex<T = PendingBatch<K>>,
{
    fn with_batch<R>(&mut self, f: impl FnOnce(&mut PendingBatch<K>) -> R) -> R {
        self.0.lock(f)
    }
}
