//! Bus health monitor: polls the controller fault state from the slow task,
//! latches it per bus, reports transitions and keeps requesting recovery for
//! as long as a bus stays off.
use crate::error::TransportError;
use crate::protocol::transport::traits::bus_controller::{BusController, BusHealth, BusStats};
use crate::protocol::transport::Transport;

/// Outcome of one poll of one bus.
#[derive(Debug, PartialEq, Eq)]
pub struct PollReport<E: core::fmt::Debug> {
    /// State reported by the controller on this poll.
    pub health: BusHealth,
    pub stats: BusStats,
    /// `(previous, current)` when the latched state changed.
    pub transition: Option<(BusHealth, BusHealth)>,
    /// Result of the recovery request issued because the bus is off.
    pub recovery: Option<Result<(), TransportError<E>>>,
}

impl<E: core::fmt::Debug> PollReport<E> {
    #[inline]
    pub fn changed(&self) -> bool {
        self.transition.is_some()
    }
}

/// Stateless poller; the latched state lives in the bus counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusMonitor;

impl BusMonitor {
    pub const fn new() -> Self {
        Self
    }

    /// Poll one bus.
    ///
    /// The controller state is latched and compared with the previous one.
    /// While the bus is off, recovery is requested on every poll, not only
    /// on the transition.
    pub fn poll<B, const N: usize, const K: usize>(
        &self,
        transport: &mut Transport<'_, B, N, K>,
    ) -> PollReport<B::Error>
    where
        B: BusController,
    {
        let status = transport.status();
        let previous = transport.latch_health(status.health);
        let transition = (previous != status.health).then_some((previous, status.health));

        #[cfg(feature = "defmt")]
        if let Some((from, to)) = transition {
            defmt::warn!(
                "Bus health {} -> {} (tec {=u16}, rec {=u16})",
                from.as_str(),
                to.as_str(),
                status.stats.tx_error_count,
                status.stats.rx_error_count
            );
        }

        let recovery = (status.health == BusHealth::Off).then(|| {
            let result = transport.recover();
            #[cfg(feature = "defmt")]
            if result.is_err() {
                defmt::error!("Bus-off recovery request failed");
            }
            result
        });

        PollReport {
            health: status.health,
            stats: status.stats,
            transition,
            recovery,
        }
    }

    /// Poll every bus in order and hand each report to `report`.
    pub fn poll_all<'t, 'a: 't, B, const N: usize, const K: usize>(
        &self,
        transports: impl IntoIterator<Item = &'t mut Transport<'a, B, N, K>>,
        mut report: impl FnMut(usize, PollReport<B::Error>),
    ) where
        B: BusController + 't,
    {
        for (index, transport) in transports.into_iter().enumerate() {
            report(index, self.poll(transport));
        }
    }
}
