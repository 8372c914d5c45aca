//! 填充导出：复合形状的每条边界写成 OCS 中的闭合多段线边界。

use zcad_core::document::{
    self as dxf, BoundaryPath, Entity, EntityKind, HatchEdge, HatchPattern, HatchPatternLine,
    PolylineVertex,
};
use zcad_core::geometry::{Plane, Point3, Vector2};
use zcad_kernel::{Attributes, Hatch, HatchStyle, LinePatternId};

use super::ExportSession;
use super::resources::signed_segments;
use crate::errors::IoError;

const SOLID_PATTERN: &str = "SOLID";

impl ExportSession<'_> {
    pub(super) fn hatch(
        &mut self,
        hatch: &Hatch,
        attributes: &Attributes,
    ) -> Result<Option<Entity>, IoError> {
        let normal = hatch.plane.normal().normalize().ok_or_else(|| {
            IoError::InvalidParameter("hatch plane has a degenerate normal".to_string())
        })?;
        let ocs = Plane::ocs(Point3::ORIGIN, normal).ok_or_else(|| {
            IoError::InvalidParameter("hatch plane has a degenerate normal".to_string())
        })?;
        let elevation = (hatch.plane.origin() - Point3::ORIGIN).dot(normal);

        let paths: Vec<BoundaryPath> = hatch
            .shape
            .borders()
            .into_iter()
            .map(|(border, is_outer)| BoundaryPath {
                is_external: is_outer,
                edges: vec![HatchEdge::Polyline {
                    vertices: border
                        .points()
                        .iter()
                        .map(|point| PolylineVertex::new(ocs.to_local(hatch.plane.to_global(*point))))
                        .collect(),
                    is_closed: true,
                }],
            })
            .collect();
        if paths.is_empty() {
            return Ok(None);
        }

        let project = self.project;
        let style = hatch.style.and_then(|id| project.hatch_styles.get(id));
        let (is_solid, pattern) = match style {
            Some(HatchStyle::Solid { .. }) => (
                true,
                HatchPattern {
                    name: SOLID_PATTERN.to_string(),
                    lines: Vec::new(),
                },
            ),
            Some(HatchStyle::Lines {
                name,
                angle,
                distance,
                line_pattern,
                ..
            }) => (
                false,
                HatchPattern {
                    name: name.clone(),
                    lines: vec![self.pattern_line(&hatch.plane, &ocs, *angle, *distance, *line_pattern)],
                },
            ),
            None => (false, HatchPattern::default()),
        };

        let mut entity = Entity::new(EntityKind::Hatch(dxf::Hatch {
            elevation,
            normal,
            is_solid,
            pattern,
            paths,
        }));
        if attributes.color.is_none() {
            if let Some((color, transparency)) = style.and_then(|style| self.color(style.color())) {
                entity.common.color = color;
                entity.common.transparency = transparency;
            }
        }
        Ok(Some(entity))
    }

    /// 样式角度相对填充平面，写出时换算到 OCS；偏移垂直于线方向。
    fn pattern_line(
        &self,
        plane: &Plane,
        ocs: &Plane,
        angle: f64,
        distance: f64,
        line_pattern: Option<LinePatternId>,
    ) -> HatchPatternLine {
        let direction = plane.vector_to_global(Vector2::new(angle.cos(), angle.sin()));
        let angle = ocs.vector_to_local(direction).angle();
        let dash_lengths = line_pattern
            .and_then(|id| self.project.line_patterns.get(id))
            .map(|pattern| signed_segments(&pattern.pattern))
            .unwrap_or_default();
        HatchPatternLine {
            angle,
            base_point: ocs.to_local(plane.origin()),
            offset: Vector2::new(-angle.sin(), angle.cos()) * distance,
            dash_lengths,
        }
    }
}
