//! 直线、圆弧、椭圆、多段线、样条与路径的导出。

use std::f64::consts::{PI, TAU};

use zcad_core::document::{self as dxf, Entity, EntityKind, SplineFlags};
use zcad_core::geometry::{Plane, Point3, Vector3, normalize_angle};
use zcad_kernel::{BSpline, Curve, Ellipse, Line, Path, Polyline};

use super::ExportSession;
use crate::errors::IoError;

impl ExportSession<'_> {
    pub(super) fn line(&self, line: &Line) -> EntityKind {
        EntityKind::Line(dxf::Line::new(line.start, line.end))
    }

    pub(super) fn polyline(&self, polyline: &Polyline) -> EntityKind {
        EntityKind::Polyline(dxf::Polyline::from_points_3d(
            &polyline.vertices,
            polyline.is_closed,
        ))
    }

    pub(super) fn ellipse(&self, ellipse: &Ellipse) -> Result<EntityKind, IoError> {
        if ellipse.major_radius() <= 0.0 || ellipse.minor_radius() <= 0.0 {
            return Err(IoError::InvalidParameter(format!(
                "ellipse radii {} and {} must be positive",
                ellipse.major_radius(),
                ellipse.minor_radius()
            )));
        }
        if ellipse.is_circle() {
            return Ok(self.circular(ellipse));
        }

        let major = ellipse.major_axis();
        let mut minor = ellipse.minor_axis();
        let mut start = ellipse.start_parameter();
        let mut end = ellipse.end_parameter();
        if !ellipse.is_counter_clockwise() {
            minor = -minor;
            start = -start;
            end = -end;
        }
        if start < 0.0 && end >= 0.0 {
            start += TAU;
        } else if end < 0.0 && start >= 0.0 {
            end += TAU;
        }
        Ok(EntityKind::Ellipse(dxf::Ellipse {
            center: ellipse.center(),
            major_axis: major,
            ratio: minor.length() / major.length(),
            start_parameter: start,
            end_parameter: end,
            normal: major.cross(minor).normalize().unwrap_or(Vector3::Z),
        }))
    }

    /// 圆形椭圆写成 CIRCLE 或 ARC；顺时针弧交换起止点后按逆时针写出。
    fn circular(&self, ellipse: &Ellipse) -> EntityKind {
        let center = ellipse.center();
        let radius = ellipse.radius();
        let normal = ellipse.normal();
        let (from, to) = if ellipse.is_counter_clockwise() {
            (ellipse.start_point(), ellipse.end_point())
        } else {
            (ellipse.end_point(), ellipse.start_point())
        };
        if ellipse.sweep_parameter().abs() > PI && from.distance(to) <= self.eps {
            return EntityKind::Circle(dxf::Circle {
                center,
                radius,
                normal,
                thickness: 0.0,
            });
        }
        let ocs = Plane::ocs(center, normal).unwrap_or(Plane::XY.with_origin(center));
        let angle = |point: Point3| normalize_angle(ocs.vector_to_local(point - center).angle());
        EntityKind::Arc(dxf::Arc {
            center,
            radius,
            start_angle: angle(from),
            end_angle: angle(to),
            normal,
            thickness: 0.0,
        })
    }

    pub(super) fn spline(&self, spline: &BSpline) -> EntityKind {
        EntityKind::Spline(dxf::Spline {
            degree: spline.degree(),
            flags: SplineFlags {
                closed: spline.is_closed(self.eps),
                periodic: spline.is_periodic(),
                rational: spline.is_rational(),
            },
            control_points: spline.poles().to_vec(),
            weights: spline.weights().to_vec(),
            knots: spline.knots().to_vec(),
            fit_points: spline.through_point_list().to_vec(),
            normal: Vector3::Z,
        })
    }

    /// 路径写成匿名块加插入，或按配置展开为独立实体。
    pub(super) fn path(&mut self, path: &Path) -> Result<Vec<Entity>, IoError> {
        let mut entities = Vec::with_capacity(path.curve_count());
        for curve in path.curves() {
            entities.extend(self.convert(curve)?);
        }
        if !self.config.export.paths_as_blocks || entities.is_empty() {
            return Ok(entities);
        }
        let name = self.anonymous_name();
        let handle = self.document.add_block(name, Point3::ORIGIN, entities);
        Ok(vec![Entity::new(EntityKind::Insert(dxf::Insert::new(
            handle,
            Point3::ORIGIN,
        )))])
    }
}
