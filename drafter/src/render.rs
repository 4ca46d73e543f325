use shared::{Point, Segment};

use crate::builder::DrawMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaseLayer {
    #[default]
    OpenStreetMap,
    Satellite,
    Topographic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileProvider {
    pub url_template: &'static str,
    pub attribution: &'static str,
    pub max_zoom: u8,
}

impl BaseLayer {
    pub const ALL: [BaseLayer; 3] = [
        BaseLayer::OpenStreetMap,
        BaseLayer::Satellite,
        BaseLayer::Topographic,
    ];

    pub fn provider(self) -> TileProvider {
        match self {
            BaseLayer::OpenStreetMap => TileProvider {
                url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
                attribution: "© OpenStreetMap",
                max_zoom: 19,
            },
            BaseLayer::Satellite => TileProvider {
                url_template: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
                attribution: "© Esri",
                max_zoom: 18,
            },
            BaseLayer::Topographic => TileProvider {
                url_template: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
                attribution: "© OpenTopoMap",
                max_zoom: 17,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: &'static str,
    pub weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub radius: f32,
}

pub const ACTIVE_LINE: LineStyle = LineStyle {
    color: "#d32f2f",
    weight: 4.0,
};
pub const PRELIMINARY_LINE: LineStyle = LineStyle {
    color: "#ffa726",
    weight: 4.0,
};
pub const FINAL_LINE: LineStyle = LineStyle {
    color: "#1976d2",
    weight: 4.0,
};
pub const ACTIVE_MARKER: MarkerStyle = MarkerStyle {
    color: "#d32f2f",
    radius: 4.0,
};

/// Drawing surface the session writes to. It is never read back.
pub trait MapSurface {
    type Handle;

    fn set_base_layer(&mut self, layer: BaseLayer);
    fn draw_line(&mut self, points: &[Point], style: &LineStyle) -> Self::Handle;
    fn remove_line(&mut self, handle: Self::Handle);
    fn draw_point_markers(&mut self, points: &[Point], style: &MarkerStyle) -> Vec<Self::Handle>;
    fn remove_markers(&mut self, handles: Vec<Self::Handle>);
    fn set_interaction(&mut self, enabled: bool);
}

/// What a redraw needs from the session.
pub struct RenderView<'a> {
    pub segments: &'a [Segment],
    pub current: &'a Segment,
    pub mode: DrawMode,
}

/// Keeps track of what is on the surface so each redraw replaces it.
pub struct MapSync<M: MapSurface> {
    surface: M,
    base_layer: BaseLayer,
    segment_lines: Vec<M::Handle>,
    active_line: Option<M::Handle>,
    markers: Vec<M::Handle>,
}

impl<M: MapSurface> MapSync<M> {
    pub fn new(mut surface: M, base_layer: BaseLayer) -> Self {
        surface.set_base_layer(base_layer);
        Self {
            surface,
            base_layer,
            segment_lines: Vec::new(),
            active_line: None,
            markers: Vec::new(),
        }
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn base_layer(&self) -> BaseLayer {
        self.base_layer
    }

    pub fn set_base_layer(&mut self, layer: BaseLayer) {
        if layer != self.base_layer {
            self.base_layer = layer;
            self.surface.set_base_layer(layer);
        }
    }

    pub fn redraw(&mut self, view: RenderView<'_>) {
        self.clear();

        for segment in view.segments.iter().filter(|s| !s.is_empty()) {
            let style = if segment.preliminary {
                &PRELIMINARY_LINE
            } else {
                &FINAL_LINE
            };
            let handle = self.surface.draw_line(&segment.points, style);
            self.segment_lines.push(handle);
        }

        if !view.current.is_empty() {
            self.active_line = Some(self.surface.draw_line(&view.current.points, &ACTIVE_LINE));
            self.markers = self
                .surface
                .draw_point_markers(&view.current.points, &ACTIVE_MARKER);
        }

        // Dragging the map would fight the free-draw stroke.
        self.surface.set_interaction(view.mode != DrawMode::Free);
    }

    fn clear(&mut self) {
        for handle in self.segment_lines.drain(..) {
            self.surface.remove_line(handle);
        }
        if let Some(handle) = self.active_line.take() {
            self.surface.remove_line(handle);
        }
        let markers = std::mem::take(&mut self.markers);
        if !markers.is_empty() {
            self.surface.remove_markers(markers);
        }
    }
}
