use shared::Status;

use crate::{assembler::RouteDraftAssembler, builder::SegmentBuilder, error::DraftError};

/// Where the metrics shown for a draft come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsSource {
    Local,
    Backend,
}

impl MetricsSource {
    pub fn for_status(status: Status) -> Self {
        match status {
            Status::Preliminary => MetricsSource::Local,
            Status::Final => MetricsSource::Backend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Finalized,
    Reopened,
}

/// Moves `status` to `target`, freezing or unlocking the draft.
pub fn transition(
    status: &mut Status,
    target: Status,
    assembler: &mut RouteDraftAssembler,
    builder: &mut SegmentBuilder,
) -> Transition {
    match (*status, target) {
        (Status::Preliminary, Status::Final) => {
            assembler.finalize_current(builder);
            assembler.mark_all_final();
            builder.lock();
            *status = Status::Final;
            tracing::info!(
                "route marked final with {} segments",
                assembler.segments().len()
            );
            Transition::Finalized
        }
        (Status::Final, Status::Preliminary) => {
            builder.unlock();
            *status = Status::Preliminary;
            tracing::info!("route reopened for editing");
            Transition::Reopened
        }
        _ => Transition::Unchanged,
    }
}

/// Re-derives point permission and draw mode after a status was restored.
pub fn apply_editing_rules(status: Status, builder: &mut SegmentBuilder) {
    match status {
        Status::Final => builder.lock(),
        Status::Preliminary if !builder.points_allowed() => builder.unlock(),
        Status::Preliminary => {}
    }
}

pub fn ensure_persistable(status: Status) -> Result<(), DraftError> {
    match status {
        Status::Final => Ok(()),
        Status::Preliminary => Err(DraftError::PreliminarySave),
    }
}

pub fn ensure_exportable(status: Status) -> Result<(), DraftError> {
    match status {
        Status::Final => Ok(()),
        Status::Preliminary => Err(DraftError::PreliminaryExport),
    }
}
