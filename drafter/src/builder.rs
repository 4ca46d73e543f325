use std::{fmt, str::FromStr};

use shared::{Point, Segment, SurfaceType};
use uuid::Uuid;

pub const DEFAULT_FREE_DRAW_MIN_DISTANCE_M: f64 = 8.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawMode {
    /// One point per click.
    #[default]
    Point,
    /// Continuous sampling while a stroke is held.
    Free,
    /// Map navigation only.
    Pan,
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawMode::Point => f.write_str("POINT"),
            DrawMode::Free => f.write_str("FREE"),
            DrawMode::Pan => f.write_str("PAN"),
        }
    }
}

impl FromStr for DrawMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POINT" => Ok(DrawMode::Point),
            "FREE" => Ok(DrawMode::Free),
            "PAN" => Ok(DrawMode::Pan),
            other => Err(format!("unknown draw mode: {other}")),
        }
    }
}

/// Pointer input that may produce a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Click,
    /// Pointer move while a free-draw stroke is held.
    Stroke,
}

/// Owns the segment being drawn and the draw mode.
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    current: Segment,
    mode: DrawMode,
    points_allowed: bool,
    stroke_active: bool,
    last_sample: Option<Point>,
    min_sample_distance_m: f64,
    surface: SurfaceType,
}

impl SegmentBuilder {
    pub fn new(surface: SurfaceType, min_sample_distance_m: f64) -> Self {
        Self {
            current: fresh_segment(0, &surface),
            mode: DrawMode::Point,
            points_allowed: true,
            stroke_active: false,
            last_sample: None,
            min_sample_distance_m,
            surface,
        }
    }

    pub fn current(&self) -> &Segment {
        &self.current
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn points_allowed(&self) -> bool {
        self.points_allowed
    }

    pub fn stroke_active(&self) -> bool {
        self.stroke_active
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.current.name = name.into();
    }

    pub fn set_surface(&mut self, surface: SurfaceType) {
        self.current.surface_type = surface.clone();
        self.surface = surface;
    }

    /// Returns false when the switch is refused: while points are locked only
    /// `Pan` is accepted.
    pub fn set_mode(&mut self, mode: DrawMode) -> bool {
        if !self.points_allowed && mode != DrawMode::Pan {
            tracing::debug!("draw mode {mode} refused while the route is locked");
            return false;
        }
        if mode != DrawMode::Free {
            self.end_stroke();
        }
        self.mode = mode;
        true
    }

    pub fn begin_stroke(&mut self) -> bool {
        if self.mode != DrawMode::Free || !self.points_allowed {
            return false;
        }
        self.stroke_active = true;
        self.last_sample = self.current.points.last().copied();
        true
    }

    pub fn end_stroke(&mut self) {
        self.stroke_active = false;
    }

    /// Decides whether a pointer event captures a point. Free-draw samples
    /// closer than the minimum distance to the last captured point are
    /// dropped. While earlier samples are still being snapped, the last
    /// admitted sample stands in for it.
    pub fn admit(&mut self, raw: Point, gesture: Gesture) -> Option<Point> {
        if !self.points_allowed {
            return None;
        }
        match (self.mode, gesture) {
            (DrawMode::Point, Gesture::Click) => {}
            (DrawMode::Free, Gesture::Stroke) if self.stroke_active => {
                if let Some(last) = self.last_sample {
                    if last.distance_to(&raw) < self.min_sample_distance_m {
                        return None;
                    }
                }
            }
            _ => return None,
        }
        let point = Point::new(raw.lat, raw.lng);
        self.last_sample = Some(point);
        Some(point)
    }

    pub fn push_point(&mut self, point: Point) -> bool {
        if !self.points_allowed {
            return false;
        }
        self.current.points.push(point);
        true
    }

    /// Measures later free-draw samples from the last point in the segment.
    /// Called once no admitted sample is waiting to be appended.
    pub fn settle_last_sample(&mut self) {
        self.last_sample = self.current.points.last().copied();
    }

    /// Moves the current segment into `finalized` and starts a new one.
    /// No-op when the current segment has no points.
    pub fn finalize_segment(&mut self, finalized: &mut Vec<Segment>) -> bool {
        if self.current.is_empty() {
            return false;
        }
        let mut segment = std::mem::replace(&mut self.current, fresh_segment(0, &self.surface));
        segment.id.get_or_insert_with(Uuid::new_v4);
        tracing::info!(
            "finalized segment {:?} with {} points",
            segment.name,
            segment.points.len()
        );
        finalized.push(segment);
        self.reset(finalized.len());
        true
    }

    /// Drops the current segment and starts an empty one named after the
    /// number of finalized segments.
    pub fn reset(&mut self, finalized_count: usize) {
        self.current = fresh_segment(finalized_count, &self.surface);
        self.stroke_active = false;
        self.last_sample = None;
    }

    pub fn restore(&mut self, current: Segment) {
        self.current = current;
        self.stroke_active = false;
        self.last_sample = None;
    }

    /// Blocks point capture and parks the map in `Pan`.
    pub fn lock(&mut self) {
        self.points_allowed = false;
        self.stroke_active = false;
        self.mode = DrawMode::Pan;
    }

    pub fn unlock(&mut self) {
        self.points_allowed = true;
        if self.mode == DrawMode::Pan {
            self.mode = DrawMode::Point;
        }
    }
}

fn fresh_segment(finalized_count: usize, surface: &SurfaceType) -> Segment {
    Segment::new(format!("Segment {}", finalized_count + 1), surface.clone())
}
