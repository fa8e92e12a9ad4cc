//! State shared between the receive interrupt and the task context.
//!
//! Everything that both contexts touch lives in one [`ControlBlock`]: the
//! node identity, the device mode, the update session counters and the task
//! timing table. Every field is an atomic, so the block is `Sync` and can be
//! placed in a `static` and handed to the interrupt handler and the tasks by
//! shared reference.
use crate::config::NodeConfig;

pub mod mode;
pub mod session;
pub mod task_stats;

pub use mode::{DeviceMode, ModeCell};
pub use session::SessionCounters;
pub use task_stats::{TaskId, TaskStats};

/// Context object bundling all cross-context state of one node.
#[derive(Debug)]
pub struct ControlBlock {
    node: NodeConfig,
    mode: ModeCell,
    session: SessionCounters,
    tasks: TaskStats,
}

impl ControlBlock {
    /// Fresh block: `Normal` mode, no update session, zeroed statistics.
    pub const fn new(node: NodeConfig) -> Self {
        Self {
            node,
            mode: ModeCell::new(),
            session: SessionCounters::new(),
            tasks: TaskStats::new(),
        }
    }

    #[inline]
    pub fn node(&self) -> &NodeConfig {
        &self.node
    }

    #[inline]
    pub fn mode(&self) -> &ModeCell {
        &self.mode
    }

    #[inline]
    pub fn session(&self) -> &SessionCounters {
        &self.session
    }

    #[inline]
    pub fn tasks(&self) -> &TaskStats {
        &self.tasks
    }
}
