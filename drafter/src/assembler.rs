use shared::{RouteDraft, Segment, Status};

use crate::builder::SegmentBuilder;

/// Holds the finalized segments and assembles them with the segment still
/// being drawn.
#[derive(Debug, Clone, Default)]
pub struct RouteDraftAssembler {
    segments: Vec<Segment>,
}

impl RouteDraftAssembler {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Deep copy of the finalized segments, plus the current segment when it
    /// has points.
    pub fn collect_segments(&self, builder: &SegmentBuilder) -> Vec<Segment> {
        let mut segments = self.segments.clone();
        if !builder.current().is_empty() {
            segments.push(builder.current().clone());
        }
        segments
    }

    pub fn draft(&self, builder: &SegmentBuilder, name: &str, status: Status) -> RouteDraft {
        RouteDraft {
            name: name.to_string(),
            status,
            segments: self.collect_segments(builder),
        }
    }

    pub fn finalize_current(&mut self, builder: &mut SegmentBuilder) -> bool {
        builder.finalize_segment(&mut self.segments)
    }

    /// Out-of-range indices are ignored.
    pub fn remove_segment(&mut self, index: usize) -> Option<Segment> {
        if index >= self.segments.len() {
            tracing::debug!(
                "ignoring removal of segment {index}, only {} finalized",
                self.segments.len()
            );
            return None;
        }
        Some(self.segments.remove(index))
    }

    pub fn mark_all_final(&mut self) {
        for segment in &mut self.segments {
            segment.preliminary = false;
        }
    }

    pub fn replace(&mut self, segments: Vec<Segment>) {
        self.segments = segments;
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }
}
