//! 直线、圆弧、椭圆、样条与多段线的重建。

use std::f64::consts::TAU;

use tracing::{debug, warn};
use zcad_core::document as dxf;
use zcad_core::geometry::{Bounds3D, Plane, Point2, Point3, Vector3, normalize_angle};
use zcad_kernel::nurbs::NurbsEvaluator;
use zcad_kernel::{
    BSpline, Curve, Ellipse, Face, GeoObject, Geometry, Line, Path, Polyline, Shell,
};

use super::ImportSession;
use crate::errors::IoError;

/// 扫角小于该值视为整圈。
const FULL_TURN_TOLERANCE: f64 = 1e-12;

impl ImportSession<'_> {
    pub(super) fn line(&self, line: &dxf::Line) -> Option<Geometry> {
        let segment = Line::new(line.start, line.end);
        if line.thickness.abs() <= self.eps {
            return Some(segment.into());
        }
        let extrusion = line.normal.normalize().unwrap_or(Vector3::Z) * line.thickness;
        if line.start.distance(line.end) <= self.eps {
            return Some(Line::new(line.start, line.start + extrusion).into());
        }
        let corners = [line.start, line.end, line.end + extrusion, line.start + extrusion];
        Some(match Face::from_polygon(&corners, self.eps) {
            Some(face) => face.into(),
            None => segment.into(),
        })
    }

    pub(super) fn ray(&self, ray: &dxf::Ray) -> Option<Geometry> {
        if ray.direction.length() <= self.eps {
            return None;
        }
        Some(Line::new(ray.start, ray.start + ray.direction).into())
    }

    /// 圆弧在 OCS 中绕法向逆时针。
    pub(super) fn arc(&self, arc: &dxf::Arc) -> Option<Geometry> {
        if arc.radius <= 0.0 {
            return None;
        }
        let plane = Plane::ocs(arc.center, arc.normal)?;
        let sweep = normalize_angle(arc.end_angle - arc.start_angle);
        let ellipse = if sweep < FULL_TURN_TOLERANCE {
            Ellipse::arc(&plane, arc.center, arc.radius, arc.start_angle, TAU)
        } else {
            Ellipse::arc(&plane, arc.center, arc.radius, arc.start_angle, sweep)
        };
        Some(self.extrude(ellipse, plane.normal(), arc.thickness))
    }

    pub(super) fn circle(&self, circle: &dxf::Circle) -> Option<Geometry> {
        if circle.radius <= 0.0 {
            return None;
        }
        let plane = Plane::ocs(circle.center, circle.normal)?;
        let ellipse = Ellipse::circle(&plane, circle.center, circle.radius);
        Some(self.extrude(ellipse, plane.normal(), circle.thickness))
    }

    /// 有厚度的圆弧沿法向拉伸：逼近折线的每一段成为一个平面四边形。
    fn extrude(&self, ellipse: Ellipse, normal: Vector3, thickness: f64) -> Geometry {
        if thickness.abs() <= self.eps {
            return ellipse.into();
        }
        let extrusion = normal * thickness;
        let points = ellipse.approximate(self.config.import.approximation_precision);
        let mut faces: Vec<Face> = points
            .windows(2)
            .filter_map(|pair| {
                let (a, b) = (pair[0], pair[1]);
                Face::from_polygon(&[a, b, b + extrusion, a + extrusion], self.eps)
            })
            .collect();
        debug!(thickness, faces = faces.len(), "圆弧按厚度拉伸");
        match faces.len() {
            0 => ellipse.into(),
            1 => faces.remove(0).into(),
            _ => Shell::new(faces).into(),
        }
    }

    pub(super) fn ellipse(&self, ellipse: &dxf::Ellipse) -> Option<Geometry> {
        let major = ellipse.major_axis.length();
        let minor = ellipse.ratio * major;
        if major <= self.eps || minor <= self.eps {
            return None;
        }
        let normal = ellipse.normal.normalize()?;
        let minor_axis = normal.cross(ellipse.major_axis).normalize()? * minor;

        let recover = |parameter: f64| {
            let (x, y) = (major * parameter.cos(), minor * parameter.sin());
            (y / minor).atan2(x / major)
        };
        let start = recover(ellipse.start_parameter);
        let mut sweep = recover(ellipse.end_parameter) - start;
        if sweep.abs() < FULL_TURN_TOLERANCE {
            sweep = TAU;
        } else if sweep < 0.0 {
            sweep += TAU;
        }
        Some(
            Ellipse::from_axes(ellipse.center, ellipse.major_axis, minor_axis, start, sweep)
                .into(),
        )
    }

    pub(super) fn spline(&self, spline: &dxf::Spline) -> Result<Option<Geometry>, IoError> {
        let flags = spline.flags;
        if spline.control_points.is_empty() {
            if spline.fit_points.len() < 2 {
                return Ok(None);
            }
            let degree = if spline.degree == 0 { 3 } else { spline.degree };
            return Ok(
                match BSpline::through_points(&spline.fit_points, degree, flags.closed) {
                    Ok(curve) => Some(curve.into()),
                    Err(err) => {
                        warn!(error = %err, "拟合点无法插值，样条已丢弃");
                        None
                    }
                },
            );
        }

        let controls = &spline.control_points;
        let count = controls.len();
        let weights = if spline.weights.is_empty() {
            vec![1.0; count]
        } else if spline.weights.len() != count {
            return Err(IoError::InvalidParameter(format!(
                "{} weights for {count} control points",
                spline.weights.len()
            )));
        } else {
            spline.weights.clone()
        };

        if count == 2 && spline.degree > 1 {
            return Ok(Some(Line::new(controls[0], controls[1]).into()));
        }

        let periodic = flags.closed && flags.periodic;
        let curve = match BSpline::new(
            spline.degree,
            controls.clone(),
            weights.clone(),
            spline.knots.clone(),
            periodic,
        ) {
            Ok(curve) => curve,
            Err(err) => {
                warn!(error = %err, degree = spline.degree, poles = count, "样条数据无效，已丢弃");
                return Ok(None);
            }
        };

        if !curve.full_multiplicity_split_indices().is_empty() {
            return Ok(self.split_spline(&curve));
        }
        if controls.windows(2).any(|pair| pair[0].distance(pair[1]) < self.eps) {
            return self.sampled_spline(spline, &curve, &weights).map(Some);
        }
        Ok(Some(curve.into()))
    }

    /// 在满重节点处拆分，保留非退化的段组成路径。
    fn split_spline(&self, curve: &BSpline) -> Option<Geometry> {
        let parts = match curve.split_at_full_multiplicity_knots() {
            Ok(parts) => parts,
            Err(err) => {
                warn!(error = %err, "样条拆分失败，已丢弃");
                return None;
            }
        };
        let total = parts.len();
        let kept: Vec<GeoObject> = parts
            .into_iter()
            .filter(|part| part.poles_extent() > self.eps && part.length() > self.eps)
            .map(GeoObject::new)
            .collect();
        debug!(parts = total, kept = kept.len(), "样条在满重节点处拆分");
        if kept.is_empty() {
            return None;
        }
        Path::from_curves(kept).ok().map(Geometry::Path)
    }

    /// 控制点重合时改用折线逼近。
    fn sampled_spline(
        &self,
        spline: &dxf::Spline,
        curve: &BSpline,
        weights: &[f64],
    ) -> Result<Geometry, IoError> {
        let count = curve
            .approximate(self.config.import.approximation_precision)
            .len()
            .max(2);
        let knots = (!spline.knots.is_empty()).then_some(spline.knots.as_slice());
        let flags = spline.flags;
        let points = match NurbsEvaluator::new(
            &spline.control_points,
            Some(weights),
            knots,
            spline.degree,
            flags.closed,
            flags.closed && flags.periodic,
        ) {
            Ok(evaluator) => evaluator.sample(count)?,
            Err(err) => {
                debug!(error = %err, "节点布局不适用于求值器，改为直接采样");
                curve.sample(count)
            }
        };
        Ok(Polyline::new(dedup(points, self.eps), flags.closed).into())
    }

    pub(super) fn polyline(&self, polyline: &dxf::Polyline) -> Option<Geometry> {
        let (points, plane) = if polyline.is_3d {
            (polyline.points(), None)
        } else {
            let normal = polyline.normal.normalize()?;
            let plane = Plane::ocs(Point3::ORIGIN + normal * polyline.elevation, normal)?;
            let points = polyline
                .vertices
                .iter()
                .map(|vertex| plane.to_global(vertex.position))
                .collect();
            (points, Some(plane))
        };
        if points.is_empty() || Bounds3D::from_points(&points).size() < self.eps {
            return None;
        }

        match plane {
            Some(plane) if polyline.has_bulges() => {
                let vertices: Vec<(Point2, f64)> = polyline
                    .vertices
                    .iter()
                    .map(|vertex| (vertex.position, vertex.bulge))
                    .collect();
                let curves = bulge_segments(&vertices, polyline.is_closed, &plane, self.eps);
                if curves.is_empty() {
                    return None;
                }
                Path::from_curves(curves).ok().map(Geometry::Path)
            }
            _ => Some(Polyline::new(dedup(points, self.eps), polyline.is_closed).into()),
        }
    }
}

/// 去掉相邻重复点。
pub(super) fn dedup(points: Vec<Point3>, eps: f64) -> Vec<Point3> {
    let mut unique: Vec<Point3> = Vec::with_capacity(points.len());
    for point in points {
        if unique.last().is_none_or(|last| last.distance(point) > eps) {
            unique.push(point);
        }
    }
    unique
}

/// 把带凸度的顶点序列展开为直线与圆弧，顶点坐标位于 `plane` 中。
pub(super) fn bulge_segments(
    vertices: &[(Point2, f64)],
    closed: bool,
    plane: &Plane,
    eps: f64,
) -> Vec<GeoObject> {
    let count = vertices.len();
    let segments = if closed { count } else { count.saturating_sub(1) };
    let mut curves = Vec::with_capacity(segments);
    for index in 0..segments {
        let (start, bulge) = vertices[index];
        let (end, _) = vertices[(index + 1) % count];
        if start.distance(end) <= eps {
            continue;
        }
        if bulge.abs() <= FULL_TURN_TOLERANCE {
            curves.push(GeoObject::new(Line::new(
                plane.to_global(start),
                plane.to_global(end),
            )));
        } else {
            curves.push(GeoObject::new(bulge_arc(start, end, bulge, plane)));
        }
    }
    curves
}

/// 凸度为圆心角四分之一的正切，正值逆时针。
fn bulge_arc(start: Point2, end: Point2, bulge: f64, plane: &Plane) -> Ellipse {
    let (dx, dy) = (end.x() - start.x(), end.y() - start.y());
    let chord = dx.hypot(dy);
    let sweep = 4.0 * bulge.atan();
    let radius = chord / (2.0 * (sweep / 2.0).sin().abs());
    let k = (1.0 - bulge * bulge) / (4.0 * bulge);
    let center = Point2::new(
        0.5 * (start.x() + end.x()) - dy * k,
        0.5 * (start.y() + end.y()) + dx * k,
    );
    let start_angle = (start.y() - center.y()).atan2(start.x() - center.x());
    Ellipse::arc(plane, plane.to_global(center), radius, start_angle, sweep)
}
