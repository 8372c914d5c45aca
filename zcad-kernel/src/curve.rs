//! 曲线能力与基本曲线对象：直线、椭圆（弧）、多段线、路径。

use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};
use zcad_core::geometry::{DEFAULT_EPS, Plane, Point2, Point3, Transform, Vector3};

use crate::errors::KernelError;
use crate::object::{GeoObject, Geometry};

/// 求长度时使用的离散容差。
const LENGTH_TOLERANCE: f64 = 1e-5;
const INITIAL_SEGMENTS: usize = 16;
const MAX_DEPTH: u32 = 10;

/// 曲线能力：参数 `t` 归一化到 [0, 1]。
pub trait Curve {
    fn point_at(&self, t: f64) -> Point3;

    fn start_point(&self) -> Point3 {
        self.point_at(0.0)
    }

    fn end_point(&self) -> Point3 {
        self.point_at(1.0)
    }

    /// 折线逼近，弦高误差不超过 `tolerance`。
    fn approximate(&self, tolerance: f64) -> Vec<Point3> {
        adaptive_sample(&|t| self.point_at(t), tolerance)
    }

    fn length(&self) -> f64 {
        polyline_length(&self.approximate(LENGTH_TOLERANCE))
    }

    /// 等参数采样 `count` 个点（含两端）。
    fn sample(&self, count: usize) -> Vec<Point3> {
        match count {
            0 => Vec::new(),
            1 => vec![self.start_point()],
            _ => (0..count)
                .map(|i| self.point_at(i as f64 / (count - 1) as f64))
                .collect(),
        }
    }

    /// 投影到平面局部坐标。
    fn project(&self, plane: &Plane, tolerance: f64) -> Vec<Point2> {
        self.approximate(tolerance)
            .into_iter()
            .map(|point| plane.to_local(point))
            .collect()
    }

    fn is_closed(&self, eps: f64) -> bool {
        self.start_point().distance(self.end_point()) <= eps
    }
}

fn adaptive_sample(f: &dyn Fn(f64) -> Point3, tolerance: f64) -> Vec<Point3> {
    let tolerance = tolerance.max(f64::EPSILON);
    let mut points = vec![f(0.0)];
    for segment in 0..INITIAL_SEGMENTS {
        let t0 = segment as f64 / INITIAL_SEGMENTS as f64;
        let t1 = (segment + 1) as f64 / INITIAL_SEGMENTS as f64;
        let p0 = points.last().copied().unwrap_or_else(|| f(t0));
        subdivide(f, (t0, p0), (t1, f(t1)), tolerance, 0, &mut points);
    }
    points
}

fn subdivide(
    f: &dyn Fn(f64) -> Point3,
    (t0, p0): (f64, Point3),
    (t1, p1): (f64, Point3),
    tolerance: f64,
    depth: u32,
    out: &mut Vec<Point3>,
) {
    let tm = 0.5 * (t0 + t1);
    let pm = f(tm);
    if depth >= MAX_DEPTH || distance_to_segment(pm, p0, p1) <= tolerance {
        out.push(p1);
        return;
    }
    subdivide(f, (t0, p0), (tm, pm), tolerance, depth + 1, out);
    subdivide(f, (tm, pm), (t1, p1), tolerance, depth + 1, out);
}

fn distance_to_segment(point: Point3, start: Point3, end: Point3) -> f64 {
    let direction = end - start;
    let length_squared = direction.length_squared();
    if length_squared <= f64::EPSILON {
        return point.distance(start);
    }
    let t = ((point - start).dot(direction) / length_squared).clamp(0.0, 1.0);
    point.distance(start + direction * t)
}

pub fn polyline_length(points: &[Point3]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point3,
    pub end: Point3,
}

impl Line {
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
    }

    pub fn transform(&mut self, transform: &Transform) {
        self.start = transform.apply_point(self.start);
        self.end = transform.apply_point(self.end);
    }
}

impl Curve for Line {
    fn point_at(&self, t: f64) -> Point3 {
        self.start.lerp(self.end, t)
    }

    fn approximate(&self, _tolerance: f64) -> Vec<Point3> {
        vec![self.start, self.end]
    }

    fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// 椭圆或椭圆弧：`center + major·cos(t) + minor·sin(t)`，
/// t 从 `start_parameter` 扫过 `sweep_parameter`（负值表示绕法向顺时针）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    center: Point3,
    major_axis: Vector3,
    minor_axis: Vector3,
    start_parameter: f64,
    sweep_parameter: f64,
}

impl Ellipse {
    /// 整圆，轴向取平面坐标轴。
    pub fn circle(plane: &Plane, center: Point3, radius: f64) -> Self {
        Self::arc(plane, center, radius, 0.0, TAU)
    }

    /// 圆弧，起始角在平面坐标系中度量。
    pub fn arc(plane: &Plane, center: Point3, radius: f64, start: f64, sweep: f64) -> Self {
        Self {
            center,
            major_axis: plane.x_axis() * radius,
            minor_axis: plane.y_axis() * radius,
            start_parameter: start,
            sweep_parameter: sweep,
        }
    }

    /// 由两条共轭半轴构造，必要时换算为主轴/次轴形式。
    pub fn from_axes(
        center: Point3,
        major_axis: Vector3,
        minor_axis: Vector3,
        start_parameter: f64,
        sweep_parameter: f64,
    ) -> Self {
        let mut ellipse = Self {
            center,
            major_axis,
            minor_axis,
            start_parameter,
            sweep_parameter,
        };
        ellipse.normalize_axes();
        ellipse
    }

    #[inline]
    pub fn center(&self) -> Point3 {
        self.center
    }

    #[inline]
    pub fn major_axis(&self) -> Vector3 {
        self.major_axis
    }

    #[inline]
    pub fn minor_axis(&self) -> Vector3 {
        self.minor_axis
    }

    #[inline]
    pub fn start_parameter(&self) -> f64 {
        self.start_parameter
    }

    #[inline]
    pub fn sweep_parameter(&self) -> f64 {
        self.sweep_parameter
    }

    #[inline]
    pub fn end_parameter(&self) -> f64 {
        self.start_parameter + self.sweep_parameter
    }

    #[inline]
    pub fn major_radius(&self) -> f64 {
        self.major_axis.length()
    }

    #[inline]
    pub fn minor_radius(&self) -> f64 {
        self.minor_axis.length()
    }

    /// 圆半径（对椭圆返回主半径）。
    #[inline]
    pub fn radius(&self) -> f64 {
        self.major_radius()
    }

    /// 法向 major × minor；轴退化时为世界 Z。
    pub fn normal(&self) -> Vector3 {
        self.major_axis
            .cross(self.minor_axis)
            .normalize()
            .unwrap_or(Vector3::Z)
    }

    /// 以圆心为原点、主轴为 x 轴的平面。
    pub fn plane(&self) -> Option<Plane> {
        Plane::from_axes(self.center, self.major_axis, self.minor_axis)
    }

    pub fn is_circle(&self) -> bool {
        let major = self.major_radius();
        (major - self.minor_radius()).abs() <= DEFAULT_EPS * major.max(1.0)
    }

    /// 非整圈即为弧。
    pub fn is_arc(&self) -> bool {
        self.sweep_parameter.abs() < TAU - 1e-9
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.sweep_parameter > 0.0
    }

    pub fn point_at_parameter(&self, parameter: f64) -> Point3 {
        self.center + self.major_axis * parameter.cos() + self.minor_axis * parameter.sin()
    }

    /// 起点与终点互换，点集不变。
    pub fn reverse(&mut self) {
        self.start_parameter += self.sweep_parameter;
        self.sweep_parameter = -self.sweep_parameter;
    }

    /// 仿射变换后重新求取主次轴；非均匀缩放下仍保持点集一致。
    pub fn transform(&mut self, transform: &Transform) {
        self.center = transform.apply_point(self.center);
        self.major_axis = transform.apply_vector(self.major_axis);
        self.minor_axis = transform.apply_vector(self.minor_axis);
        self.normalize_axes();
    }

    fn normalize_axes(&mut self) {
        let u = self.major_axis;
        let v = self.minor_axis;
        let uv = u.dot(v);
        let scale = u.length_squared().max(v.length_squared());
        if uv.abs() > 1e-12 * scale.max(1.0) {
            let t0 = 0.5 * (2.0 * uv).atan2(u.length_squared() - v.length_squared());
            let (sin, cos) = t0.sin_cos();
            self.major_axis = u * cos + v * sin;
            self.minor_axis = v * cos - u * sin;
            self.start_parameter -= t0;
        }
        if self.minor_axis.length() > self.major_axis.length() + DEFAULT_EPS {
            let major = self.major_axis;
            self.major_axis = self.minor_axis;
            self.minor_axis = -major;
            self.start_parameter -= FRAC_PI_2;
        }
    }
}

impl Curve for Ellipse {
    fn point_at(&self, t: f64) -> Point3 {
        self.point_at_parameter(self.start_parameter + t * self.sweep_parameter)
    }

    fn length(&self) -> f64 {
        if self.is_circle() {
            self.radius() * self.sweep_parameter.abs()
        } else {
            polyline_length(&self.approximate(LENGTH_TOLERANCE))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub vertices: Vec<Point3>,
    pub is_closed: bool,
}

impl Polyline {
    pub fn new(vertices: Vec<Point3>, is_closed: bool) -> Self {
        Self {
            vertices,
            is_closed,
        }
    }

    /// 闭合时末尾补上首点。
    pub fn closed_vertices(&self) -> Vec<Point3> {
        let mut points = self.vertices.clone();
        if self.is_closed {
            if let Some(first) = self.vertices.first() {
                points.push(*first);
            }
        }
        points
    }

    pub fn reverse(&mut self) {
        self.vertices.reverse();
    }

    pub fn transform(&mut self, transform: &Transform) {
        for vertex in &mut self.vertices {
            *vertex = transform.apply_point(*vertex);
        }
    }
}

impl Curve for Polyline {
    fn point_at(&self, t: f64) -> Point3 {
        let points = self.closed_vertices();
        match points.len() {
            0 => Point3::ORIGIN,
            1 => points[0],
            count => {
                let segments = (count - 1) as f64;
                let scaled = (t.clamp(0.0, 1.0) * segments).min(segments);
                let index = (scaled.floor() as usize).min(count - 2);
                points[index].lerp(points[index + 1], scaled - index as f64)
            }
        }
    }

    fn approximate(&self, _tolerance: f64) -> Vec<Point3> {
        self.closed_vertices()
    }

    fn length(&self) -> f64 {
        polyline_length(&self.closed_vertices())
    }
}

/// 首尾相接的曲线序列。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    curves: Vec<GeoObject>,
}

impl Path {
    /// 嵌套路径会被展开；非曲线对象返回错误。
    pub fn from_curves(curves: Vec<GeoObject>) -> Result<Path, KernelError> {
        let mut flattened = Vec::with_capacity(curves.len());
        for curve in curves {
            match curve.geometry {
                Geometry::Path(inner) => flattened.extend(inner.curves),
                _ if curve.as_curve().is_some() => flattened.push(curve),
                _ => {
                    return Err(KernelError::invalid(format!(
                        "{} cannot be part of a path",
                        curve.kind_name()
                    )));
                }
            }
        }
        Ok(Path { curves: flattened })
    }

    /// 从列表中取出能首尾相接的曲线组成一条路径，已使用的曲线从列表移除。
    pub fn chain(curves: &mut Vec<GeoObject>, tolerance: f64) -> Option<Path> {
        curves.retain(|curve| curve.as_curve().is_some());
        if curves.is_empty() {
            return None;
        }
        let mut chained = vec![curves.remove(0)];
        loop {
            let (Some(head), Some(tail)) = (
                chained.first().and_then(|c| c.as_curve()).map(|c| c.start_point()),
                chained.last().and_then(|c| c.as_curve()).map(|c| c.end_point()),
            ) else {
                break;
            };
            if head.distance(tail) <= tolerance && chained.len() > 1 {
                break;
            }
            let mut progress = false;
            for index in 0..curves.len() {
                let Some(curve) = curves[index].as_curve() else {
                    continue;
                };
                let (start, end) = (curve.start_point(), curve.end_point());
                if start.distance(tail) <= tolerance {
                    chained.push(curves.remove(index));
                } else if end.distance(tail) <= tolerance {
                    let mut next = curves.remove(index);
                    next.geometry.reverse_curve();
                    chained.push(next);
                } else if end.distance(head) <= tolerance {
                    chained.insert(0, curves.remove(index));
                } else if start.distance(head) <= tolerance {
                    let mut next = curves.remove(index);
                    next.geometry.reverse_curve();
                    chained.insert(0, next);
                } else {
                    continue;
                }
                progress = true;
                break;
            }
            if !progress {
                break;
            }
        }
        Some(Path { curves: chained })
    }

    #[inline]
    pub fn curves(&self) -> &[GeoObject] {
        &self.curves
    }

    #[inline]
    pub fn curves_mut(&mut self) -> &mut [GeoObject] {
        &mut self.curves
    }

    #[inline]
    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    pub fn reverse(&mut self) {
        self.curves.reverse();
        for curve in &mut self.curves {
            curve.geometry.reverse_curve();
        }
    }

    pub fn transform(&mut self, transform: &Transform) {
        for curve in &mut self.curves {
            curve.transform(transform);
        }
    }
}

impl Curve for Path {
    fn point_at(&self, t: f64) -> Point3 {
        let count = self.curves.len();
        if count == 0 {
            return Point3::ORIGIN;
        }
        let scaled = t.clamp(0.0, 1.0) * count as f64;
        let index = (scaled.floor() as usize).min(count - 1);
        self.curves[index]
            .as_curve()
            .map(|curve| curve.point_at(scaled - index as f64))
            .unwrap_or(Point3::ORIGIN)
    }

    fn approximate(&self, tolerance: f64) -> Vec<Point3> {
        let mut points: Vec<Point3> = Vec::new();
        for curve in self.curves.iter().filter_map(GeoObject::as_curve) {
            let part = curve.approximate(tolerance);
            let skip = match (points.last(), part.first()) {
                (Some(last), Some(first)) if last.distance(*first) <= DEFAULT_EPS => 1,
                _ => 0,
            };
            points.extend(part.into_iter().skip(skip));
        }
        points
    }

    fn length(&self) -> f64 {
        self.curves
            .iter()
            .filter_map(GeoObject::as_curve)
            .map(|curve| curve.length())
            .sum()
    }
}
