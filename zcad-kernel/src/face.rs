//! 平面面片、壳与实体。

use serde::{Deserialize, Serialize};
use zcad_core::geometry::{Plane, Point2, Point3, Transform, Vector3};

use crate::attributes::ColorId;

/// 平面上的多边形面，外轮廓逆时针，孔任意方向。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    plane: Plane,
    outline: Vec<Point2>,
    holes: Vec<Vec<Point2>>,
    color: Option<ColorId>,
}

impl Face {
    /// 由空间多边形构造平面面；点数不足、共线或不共面时返回 `None`。
    pub fn from_polygon(points: &[Point3], eps: f64) -> Option<Face> {
        let mut unique: Vec<Point3> = Vec::with_capacity(points.len());
        for point in points {
            if unique.last().is_none_or(|last| last.distance(*point) > eps) {
                unique.push(*point);
            }
        }
        while unique.len() > 1 && unique[0].distance(unique[unique.len() - 1]) <= eps {
            unique.pop();
        }
        if unique.len() < 3 {
            return None;
        }
        let plane = Plane::fit_points(&unique)?;
        if plane.max_distance(&unique) > eps {
            return None;
        }
        let outline: Vec<Point2> = unique.iter().map(|p| plane.to_local(*p)).collect();
        let face = Face {
            plane,
            outline,
            holes: Vec::new(),
            color: None,
        };
        (face.area() > eps * eps).then_some(face)
    }

    pub fn triangle(a: Point3, b: Point3, c: Point3, eps: f64) -> Option<Face> {
        Face::from_polygon(&[a, b, c], eps)
    }

    /// 由平面局部坐标构造，外轮廓会被调整为逆时针。
    pub fn from_plane(plane: Plane, mut outline: Vec<Point2>, holes: Vec<Vec<Point2>>) -> Option<Face> {
        if outline.len() < 3 {
            return None;
        }
        if signed_area(&outline) < 0.0 {
            outline.reverse();
        }
        Some(Face {
            plane,
            outline,
            holes: holes.into_iter().filter(|hole| hole.len() >= 3).collect(),
            color: None,
        })
    }

    pub fn with_color(mut self, color: Option<ColorId>) -> Self {
        self.color = color;
        self
    }

    #[inline]
    pub fn color(&self) -> Option<ColorId> {
        self.color
    }

    #[inline]
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    #[inline]
    pub fn outline(&self) -> &[Point2] {
        &self.outline
    }

    #[inline]
    pub fn holes(&self) -> &[Vec<Point2>] {
        &self.holes
    }

    #[inline]
    pub fn normal(&self) -> Vector3 {
        self.plane.normal()
    }

    pub fn outline_3d(&self) -> Vec<Point3> {
        self.outline.iter().map(|p| self.plane.to_global(*p)).collect()
    }

    /// 无孔四边形。
    pub fn is_quad(&self) -> bool {
        self.holes.is_empty() && self.outline.len() == 4
    }

    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|hole| signed_area(hole).abs()).sum();
        signed_area(&self.outline).abs() - holes
    }

    /// 耳切三角化，孔先桥接到外轮廓。三角形与外轮廓同向。
    pub fn triangulate(&self) -> Vec<[Point3; 3]> {
        let polygon = bridge_holes(&self.outline, &self.holes);
        ear_clip(&polygon)
            .into_iter()
            .map(|[a, b, c]| {
                [
                    self.plane.to_global(a),
                    self.plane.to_global(b),
                    self.plane.to_global(c),
                ]
            })
            .collect()
    }

    pub fn transform(&mut self, transform: &Transform) {
        let Some(plane) = self.plane.transformed(transform) else {
            return;
        };
        let map = |points: &[Point2]| -> Vec<Point2> {
            points
                .iter()
                .map(|p| plane.to_local(transform.apply_point(self.plane.to_global(*p))))
                .collect()
        };
        let outline = map(&self.outline);
        let holes = self.holes.iter().map(|hole| map(hole)).collect();
        self.plane = plane;
        self.outline = outline;
        self.holes = holes;
    }
}

fn signed_area(points: &[Point2]) -> f64 {
    let count = points.len();
    if count < 3 {
        return 0.0;
    }
    0.5 * (0..count)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % count]);
            a.x() * b.y() - b.x() * a.y()
        })
        .sum::<f64>()
}

fn cross(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x() - a.x()) * (c.y() - a.y()) - (b.y() - a.y()) * (c.x() - a.x())
}

/// 严格内部判定，落在边上或与顶点重合的点不计。
fn point_in_triangle(p: Point2, a: Point2, b: Point2, c: Point2) -> bool {
    if p == a || p == b || p == c {
        return false;
    }
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    (d1 > 0.0 && d2 > 0.0 && d3 > 0.0) || (d1 < 0.0 && d2 < 0.0 && d3 < 0.0)
}

/// 每个孔从最右侧顶点连到最近的外轮廓顶点，合并成单一多边形。
fn bridge_holes(outline: &[Point2], holes: &[Vec<Point2>]) -> Vec<Point2> {
    let mut polygon = outline.to_vec();
    let mut ordered: Vec<Vec<Point2>> = holes
        .iter()
        .filter(|hole| hole.len() >= 3)
        .map(|hole| {
            let mut hole = hole.clone();
            if signed_area(&hole) > 0.0 {
                hole.reverse();
            }
            hole
        })
        .collect();
    ordered.sort_by(|a, b| max_x(b).total_cmp(&max_x(a)));

    for hole in ordered {
        let Some(start) = (0..hole.len()).max_by(|&i, &j| hole[i].x().total_cmp(&hole[j].x()))
        else {
            continue;
        };
        let anchor = hole[start];
        let Some(target) = (0..polygon.len()).min_by(|&i, &j| {
            polygon[i]
                .distance(anchor)
                .total_cmp(&polygon[j].distance(anchor))
        }) else {
            continue;
        };
        let mut merged = Vec::with_capacity(polygon.len() + hole.len() + 2);
        merged.extend_from_slice(&polygon[..=target]);
        merged.extend((0..=hole.len()).map(|k| hole[(start + k) % hole.len()]));
        merged.push(polygon[target]);
        merged.extend_from_slice(&polygon[target + 1..]);
        polygon = merged;
    }
    polygon
}

fn max_x(points: &[Point2]) -> f64 {
    points.iter().map(|p| p.x()).fold(f64::NEG_INFINITY, f64::max)
}

/// 逆时针多边形的耳切三角化；找不到耳时对剩余顶点做扇形剖分。
fn ear_clip(polygon: &[Point2]) -> Vec<[Point2; 3]> {
    let mut triangles = Vec::new();
    if polygon.len() < 3 {
        return triangles;
    }
    let mut remaining: Vec<Point2> = polygon.to_vec();
    while remaining.len() > 3 {
        let n = remaining.len();
        let mut found_ear = false;
        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;
            let (a, b, c) = (remaining[prev], remaining[i], remaining[next]);
            if cross(a, b, c) <= 0.0 {
                continue;
            }
            let blocked = (0..n)
                .filter(|&j| j != prev && j != i && j != next)
                .any(|j| point_in_triangle(remaining[j], a, b, c));
            if blocked {
                continue;
            }
            triangles.push([a, b, c]);
            remaining.remove(i);
            found_ear = true;
            break;
        }
        if !found_ear {
            break;
        }
    }
    for k in 1..remaining.len() - 1 {
        triangles.push([remaining[0], remaining[k], remaining[k + 1]]);
    }
    triangles
}

/// 一组共享边的面。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shell {
    faces: Vec<Face>,
}

impl Shell {
    pub fn new(faces: Vec<Face>) -> Self {
        Self { faces }
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn into_faces(self) -> Vec<Face> {
        self.faces
    }

    pub fn transform(&mut self, transform: &Transform) {
        for face in &mut self.faces {
            face.transform(transform);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Solid {
    shells: Vec<Shell>,
}

impl Solid {
    pub fn new(shells: Vec<Shell>) -> Self {
        Self { shells }
    }

    #[inline]
    pub fn shells(&self) -> &[Shell] {
        &self.shells
    }

    pub fn transform(&mut self, transform: &Transform) {
        for shell in &mut self.shells {
            shell.transform(transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_area(triangle: &[Point3; 3]) -> f64 {
        0.5 * (triangle[1] - triangle[0])
            .cross(triangle[2] - triangle[0])
            .length()
    }

    fn square(size: f64, z: f64) -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, z),
            Point3::new(size, 0.0, z),
            Point3::new(size, size, z),
            Point3::new(0.0, size, z),
        ]
    }

    #[test]
    fn planar_quad_is_accepted() {
        let face = Face::from_polygon(&square(2.0, 1.0), 1e-6).expect("planar quad");
        assert!(face.is_quad());
        assert!((face.area() - 4.0).abs() < 1e-12);
        assert!(face.normal().dot(Vector3::Z) > 0.999);
        for (a, b) in face.outline_3d().iter().zip(square(2.0, 1.0)) {
            assert!(a.distance(b) < 1e-12);
        }
    }

    #[test]
    fn non_planar_and_degenerate_polygons_are_rejected() {
        let mut twisted = square(2.0, 0.0);
        twisted[2] = Point3::new(2.0, 2.0, 0.5);
        assert!(Face::from_polygon(&twisted, 1e-6).is_none());
        let collinear = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(Face::from_polygon(&collinear, 1e-6).is_none());
        assert!(Face::triangle(collinear[0], collinear[0], collinear[1], 1e-6).is_none());
    }

    #[test]
    fn concave_polygon_triangulates_to_its_area() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 4.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
        ];
        let face = Face::from_polygon(&points, 1e-6).expect("concave face");
        let triangles = face.triangulate();
        assert_eq!(triangles.len(), 3);
        let total: f64 = triangles.iter().map(triangle_area).sum();
        assert!((total - face.area()).abs() < 1e-9);
    }

    #[test]
    fn face_with_hole_triangulates_without_hole_area() {
        let outline = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let hole = vec![
            Point2::new(4.0, 4.0),
            Point2::new(6.0, 4.0),
            Point2::new(6.0, 6.0),
            Point2::new(4.0, 6.0),
        ];
        let face = Face::from_plane(Plane::XY, outline, vec![hole]).expect("face");
        assert!((face.area() - 96.0).abs() < 1e-12);
        let total: f64 = face.triangulate().iter().map(triangle_area).sum();
        assert!((total - 96.0).abs() < 1e-9);
    }

    #[test]
    fn transform_moves_face() {
        let mut face = Face::from_polygon(&square(1.0, 0.0), 1e-6).expect("face");
        face.transform(&Transform::translation(Vector3::new(0.0, 0.0, 3.0)));
        assert!(face.outline_3d().iter().all(|p| (p.z() - 3.0).abs() < 1e-12));
        assert!((face.area() - 1.0).abs() < 1e-12);
    }
}
