//! 填充与 SOLID 实体：边界环转为复合形状，再配上填充样式。

use std::f64::consts::TAU;

use tracing::{debug, warn};
use zcad_core::document::{self as dxf, Entity, HatchEdge};
use zcad_core::geometry::{Plane, Point2, Point3, Transform, normalize_angle};
use zcad_kernel::{
    BSpline, Block, Border, CompoundShape, Ellipse, GeoObject, Geometry, Hatch, Line,
};

use super::ImportSession;
use super::curves::bulge_segments;
use crate::errors::IoError;

const HATCH_BLOCK: &str = "Hatch";

impl ImportSession<'_> {
    pub(super) fn hatch(
        &mut self,
        entity: &Entity,
        hatch: &dxf::Hatch,
    ) -> Result<Option<Geometry>, IoError> {
        let Some(normal) = hatch.normal.normalize() else {
            return Ok(None);
        };
        let Some(ocs) = Plane::ocs(Point3::ORIGIN + normal * hatch.elevation, normal) else {
            return Ok(None);
        };
        let Some((plane, shape)) = self.hatch_shape(&ocs, &hatch.paths) else {
            debug!(handle = %entity.handle(), "填充边界无法组成区域");
            return Ok(None);
        };

        let color = self.color_id(entity.common.color, &entity.common.layer);
        if hatch.is_solid {
            let style = self.solid_style(color);
            return Ok(Some(Hatch::new(plane, shape, Some(style)).into()));
        }

        let mut hatches: Vec<Hatch> = hatch
            .pattern
            .lines
            .iter()
            .map(|line| {
                let style = self.line_style(color, line.angle, line.offset.length(), &line.dash_lengths);
                Hatch::new(plane, shape.clone(), Some(style))
            })
            .collect();
        Ok(Some(match hatches.len() {
            0 => Hatch::new(plane, shape, None).into(),
            1 => hatches.remove(0).into(),
            _ => Block::new(HATCH_BLOCK)
                .with_children(hatches.into_iter().map(GeoObject::new).collect())
                .into(),
        }))
    }

    /// 首个边界环确定平面；后续环依次从区域中减去，结果不确定时按奇偶规则重建。
    fn hatch_shape(
        &self,
        ocs: &Plane,
        paths: &[dxf::BoundaryPath],
    ) -> Option<(Plane, CompoundShape)> {
        let precision = self.config.import.approximation_precision;
        let tolerance = precision.max(self.eps);
        let mut plane: Option<Plane> = None;
        let mut shape: Option<CompoundShape> = None;
        let mut ambiguous = false;
        let mut all_fragments: Vec<Vec<Point2>> = Vec::new();

        for path in paths {
            let curves = self.boundary_curves(ocs, path);
            if curves.is_empty() {
                continue;
            }
            let frame = match plane {
                Some(frame) => frame,
                None => {
                    let frame = self.loop_plane(ocs, &curves)?;
                    plane = Some(frame);
                    frame
                }
            };
            let fragments: Vec<Vec<Point2>> = curves
                .iter()
                .filter_map(GeoObject::as_curve)
                .map(|curve| curve.project(&frame, precision))
                .collect();
            all_fragments.extend(fragments.iter().cloned());

            let Some(border) = Border::from_unoriented_list(&fragments, tolerance) else {
                debug!(curves = curves.len(), "边界环未闭合");
                ambiguous = true;
                continue;
            };
            let piece = CompoundShape::from_border(&border);
            shape = Some(match shape {
                None => piece,
                Some(current) => {
                    let before = current.area();
                    let next = current.subtract(&piece);
                    if next.area() >= before - self.eps {
                        ambiguous = true;
                    }
                    next
                }
            });
        }

        let plane = plane?;
        let mut shape = shape?;
        if ambiguous || shape.area() <= self.eps {
            debug!("填充区域不确定，改用奇偶规则");
            shape = CompoundShape::create_from_list(&all_fragments, tolerance);
        }
        (!shape.is_empty()).then_some((plane, shape))
    }

    /// 环上所有点位于 OCS 平面时直接使用 OCS，否则拟合平面；不共面返回 `None`。
    fn loop_plane(&self, ocs: &Plane, curves: &[GeoObject]) -> Option<Plane> {
        let points: Vec<Point3> = curves
            .iter()
            .filter_map(GeoObject::as_curve)
            .flat_map(|curve| curve.approximate(self.config.import.approximation_precision))
            .collect();
        if ocs.max_distance(&points) <= self.eps {
            return Some(*ocs);
        }
        let fitted = Plane::fit_points(&points)?;
        (fitted.max_distance(&points) <= self.eps).then_some(fitted)
    }

    fn boundary_curves(&self, ocs: &Plane, path: &dxf::BoundaryPath) -> Vec<GeoObject> {
        let mut curves = Vec::with_capacity(path.edges.len());
        for edge in &path.edges {
            match edge {
                HatchEdge::Line { start, end } => {
                    if start.distance(*end) > self.eps {
                        curves.push(GeoObject::new(Line::new(
                            ocs.to_global(*start),
                            ocs.to_global(*end),
                        )));
                    }
                }
                HatchEdge::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    counter_clockwise,
                } => {
                    if *radius <= self.eps {
                        continue;
                    }
                    let (start, sweep) = edge_sweep(*start_angle, *end_angle, *counter_clockwise);
                    curves.push(GeoObject::new(Ellipse::arc(
                        ocs,
                        ocs.to_global(*center),
                        *radius,
                        start,
                        sweep,
                    )));
                }
                HatchEdge::Ellipse {
                    center,
                    major_axis,
                    minor_ratio,
                    start_angle,
                    end_angle,
                    counter_clockwise,
                } => {
                    let major = ocs.vector_to_global(*major_axis);
                    let minor = ocs.normal().cross(major) * *minor_ratio;
                    if major.length() <= self.eps || minor.length() <= self.eps {
                        continue;
                    }
                    let (start, sweep) = edge_sweep(*start_angle, *end_angle, *counter_clockwise);
                    curves.push(GeoObject::new(Ellipse::from_axes(
                        ocs.to_global(*center),
                        major,
                        minor,
                        start,
                        sweep,
                    )));
                }
                HatchEdge::Spline {
                    degree,
                    control_points,
                    weights,
                    knots,
                    periodic,
                } => {
                    let poles = control_points.iter().map(|p| ocs.to_global(*p)).collect();
                    match BSpline::new(*degree, poles, weights.clone(), knots.clone(), *periodic) {
                        Ok(spline) => curves.push(GeoObject::new(spline)),
                        Err(err) => warn!(error = %err, "填充边界样条无效，已跳过该边"),
                    }
                }
                HatchEdge::Polyline {
                    vertices,
                    is_closed,
                } => {
                    let vertices: Vec<(Point2, f64)> = vertices
                        .iter()
                        .map(|vertex| (vertex.position, vertex.bulge))
                        .collect();
                    curves.extend(bulge_segments(&vertices, *is_closed, ocs, self.eps));
                }
            }
        }
        curves
    }

    /// SOLID 的角点按 1-2-4-3 顺序组成多边形，生成实心填充。
    pub(super) fn solid(&mut self, entity: &Entity, solid: &dxf::Solid) -> Option<Geometry> {
        let to_world = Plane::ocs(Point3::ORIGIN, solid.normal)
            .map(|ocs| Transform::from_plane(&ocs))
            .unwrap_or(Transform::IDENTITY);
        let mut corners: Vec<Point3> = Vec::with_capacity(4);
        for index in [0, 1, 3, 2] {
            let corner = to_world.apply_point(solid.corners[index]);
            if corners.iter().all(|existing| existing.distance(corner) > self.eps) {
                corners.push(corner);
            }
        }
        if corners.len() < 3 {
            return None;
        }
        let plane = Plane::fit_points(&corners)?;
        let border = Border::new(corners.iter().map(|p| plane.to_local(*p)).collect())?;
        let color = self.color_id(entity.common.color, &entity.common.layer);
        let style = self.solid_style(color);
        Some(Hatch::new(plane, CompoundShape::from_border(&border), Some(style)).into())
    }
}

/// 边界弧的起始角与带符号扫角；顺时针弧的角度按镜像约定取反。
fn edge_sweep(start: f64, end: f64, counter_clockwise: bool) -> (f64, f64) {
    let mut sweep = normalize_angle(end - start);
    if sweep <= f64::EPSILON {
        sweep = TAU;
    }
    if counter_clockwise {
        (start, sweep)
    } else {
        (-start, -sweep)
    }
}
