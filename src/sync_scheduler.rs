//! Coalescing of expensive heightmap syncs across stamps.
//!
//! Purely call-driven: the countdown only moves when a stamp lands. If no
//! further stamp arrives, a deferred sync stays pending until
//! [`SyncScheduler::take_pending`] is used to flush it.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncScheduler {
    coalesce: bool,
    sync_every_n_frames: u32,
    countdown: u32,
    pending: bool,
}

impl SyncScheduler {
    pub fn new(coalesce: bool, sync_every_n_frames: u32) -> Self {
        Self {
            coalesce,
            sync_every_n_frames: sync_every_n_frames.max(1),
            countdown: 0,
            pending: false,
        }
    }

    /// Coalescing with an interval of one is the same as syncing every stamp.
    pub fn is_coalescing(&self) -> bool {
        self.coalesce && self.sync_every_n_frames > 1
    }

    /// Record a stamp. Returns `true` when the caller should sync now.
    pub fn on_stamp(&mut self) -> bool {
        if !self.is_coalescing() {
            self.pending = false;
            return true;
        }

        if self.countdown == 0 {
            self.countdown = self.sync_every_n_frames;
        }
        self.countdown -= 1;

        if self.countdown == 0 {
            self.pending = false;
            true
        } else {
            self.pending = true;
            false
        }
    }

    /// Claim a deferred sync, if any. The countdown restarts afterwards.
    pub fn take_pending(&mut self) -> bool {
        let pending = self.pending;
        if pending {
            self.mark_synced();
        }
        pending
    }

    /// An unconditional sync happened elsewhere; nothing is outstanding.
    pub fn mark_synced(&mut self) {
        self.pending = false;
        self.countdown = 0;
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }
}
