use tracing::debug;

use crate::classify::RowKind;

/// Where in the schedule document we currently are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleContext {
    pub branch: Option<String>,
    pub queue: Option<u8>,
    pub subqueue: Option<u8>,
    /// Ambient settlement: the last one named explicitly in a data row.
    pub settlement: Option<String>,
}

impl ScheduleContext {
    /// The context after seeing a row of the given kind.
    ///
    /// A queue header always clears the sub-queue; data rows leave the
    /// context untouched.
    pub fn transition(&self, kind: &RowKind) -> ScheduleContext {
        let mut next = self.clone();
        match kind {
            RowKind::BranchHeader(branch) => next.branch = Some(branch.clone()),
            RowKind::QueueHeader { queue } => {
                next.queue = Some(*queue);
                next.subqueue = None;
            }
            RowKind::SubqueueHeader { queue, subqueue } => {
                next.queue = Some(*queue);
                next.subqueue = Some(*subqueue);
            }
            RowKind::Data => {}
        }
        next
    }

    /// `(queue, subqueue)` once both are known.
    pub fn slot(&self) -> Option<(u8, u8)> {
        self.queue.zip(self.subqueue)
    }

    pub fn slot_key(&self) -> Option<String> {
        self.slot().map(|(q, s)| format!("{q}.{s}"))
    }
}

/// A data row that arrived with a complete slot, plus the context it
/// arrived in.
#[derive(Debug, Clone)]
pub struct SlottedRow<'a> {
    pub context: ScheduleContext,
    pub queue: u8,
    pub subqueue: u8,
    pub address_text: &'a str,
}

/// Feeds classified rows through [`ScheduleContext::transition`] in
/// document order.
#[derive(Debug, Default)]
pub struct ContextTracker {
    context: ScheduleContext,
}

impl ContextTracker {
    pub fn new(default_settlement: Option<String>) -> Self {
        ContextTracker {
            context: ScheduleContext {
                settlement: default_settlement,
                ..ScheduleContext::default()
            },
        }
    }

    pub fn context(&self) -> &ScheduleContext {
        &self.context
    }

    /// Advance on one row. Header rows return `None`; data rows return a
    /// snapshot only when queue and sub-queue are both set, otherwise they
    /// are discarded.
    pub fn observe<'a>(&mut self, kind: &RowKind, address_text: &'a str) -> Option<SlottedRow<'a>> {
        self.context = self.context.transition(kind);
        match kind {
            RowKind::BranchHeader(branch) => {
                debug!("branch: {branch}");
                None
            }
            RowKind::QueueHeader { queue } => {
                debug!("queue: {queue}");
                None
            }
            RowKind::SubqueueHeader { queue, subqueue } => {
                debug!("sub-queue: {queue}.{subqueue}");
                None
            }
            RowKind::Data => {
                let (queue, subqueue) = self.context.slot()?;
                Some(SlottedRow {
                    context: self.context.clone(),
                    queue,
                    subqueue,
                    address_text,
                })
            }
        }
    }

    /// Remember the last explicit settlement of a row for the rows after it.
    pub fn set_settlement(&mut self, settlement: String) {
        self.context.settlement = Some(settlement);
    }
}
