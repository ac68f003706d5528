//! Preview geometry derived from the vertices of an in-progress drawing.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Vertex count at which a drawing is treated as a closed polygon.
pub const POLYGON_MIN_VERTICES: usize = 3;

/// Coordinate system of a geometry, identified by its well-known ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

impl SpatialReference {
    /// Web Mercator, the default for scene views.
    pub const WEB_MERCATOR: Self = Self { wkid: 102100 };
    /// Geographic WGS 84.
    pub const WGS84: Self = Self { wkid: 4326 };

    pub fn new(wkid: u32) -> Self {
        Self { wkid }
    }
}

impl Default for SpatialReference {
    fn default() -> Self {
        Self::WEB_MERCATOR
    }
}

/// Shape of a preview geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Polyline,
    Polygon,
}

/// Transient geometry shown while the user is still drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewGeometry {
    pub kind: GeometryKind,
    /// Path (polyline) or ring (polygon) vertices, in input order.
    /// Rings are left open; the engine closes them when drawing.
    pub points: Vec<Point>,
    #[serde(default)]
    pub spatial_reference: SpatialReference,
}

impl PreviewGeometry {
    pub fn is_polygon(&self) -> bool {
        self.kind == GeometryKind::Polygon
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounds of the vertices, or `None` when there are none.
    pub fn bounds(&self) -> Option<Rect> {
        let (first, rest) = self.points.split_first()?;
        Some(
            rest.iter()
                .fold(Rect::from_points(*first, *first), |rect, p| rect.union_pt(*p)),
        )
    }
}

/// Build the preview for the current vertex sequence in the default
/// spatial reference.
pub fn accumulate(points: &[Point]) -> PreviewGeometry {
    accumulate_in(points, SpatialReference::default())
}

/// Build the preview for the current vertex sequence.
///
/// Fewer than [`POLYGON_MIN_VERTICES`] points yield a polyline, otherwise a
/// polygon. The points are copied unchanged; no closing vertex is appended.
/// This is stateless, so undo/redo can shrink and regrow the input freely.
pub fn accumulate_in(points: &[Point], spatial_reference: SpatialReference) -> PreviewGeometry {
    let kind = if points.len() >= POLYGON_MIN_VERTICES {
        GeometryKind::Polygon
    } else {
        GeometryKind::Polyline
    };

    PreviewGeometry {
        kind,
        points: points.to_vec(),
        spatial_reference,
    }
}
