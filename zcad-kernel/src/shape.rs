//! 平面区域：闭合边界与带孔的复合形状，布尔运算交给 `geo`。

use geo::{Area, BooleanOps, Coord, LineString, MapCoords, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use zcad_core::geometry::Point2;

/// 闭合边界，不重复保存首点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Border {
    points: Vec<Point2>,
}

impl Border {
    /// 少于三个不同顶点时返回 `None`。
    pub fn new(points: Vec<Point2>) -> Option<Border> {
        let mut unique: Vec<Point2> = Vec::with_capacity(points.len());
        for point in points {
            if unique.last() != Some(&point) {
                unique.push(point);
            }
        }
        if unique.len() > 1 && unique.first() == unique.last() {
            unique.pop();
        }
        (unique.len() >= 3).then_some(Border { points: unique })
    }

    /// 把方向不定的折线片段首尾相接成一条闭合边界，不能闭合时返回 `None`。
    pub fn from_unoriented_list(fragments: &[Vec<Point2>], tolerance: f64) -> Option<Border> {
        let mut pending: Vec<Vec<Point2>> = fragments
            .iter()
            .filter(|fragment| !fragment.is_empty())
            .cloned()
            .collect();
        let (points, closed) = chain_fragments(&mut pending, tolerance)?;
        if !closed || !pending.is_empty() {
            return None;
        }
        Border::new(points)
    }

    #[inline]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// 有符号面积，逆时针为正。
    pub fn signed_area(&self) -> f64 {
        let count = self.points.len();
        0.5 * (0..count)
            .map(|i| {
                let (a, b) = (self.points[i], self.points[(i + 1) % count]);
                a.x() * b.y() - b.x() * a.y()
            })
            .sum::<f64>()
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(ring(&self.points), vec![])
    }
}

fn ring(points: &[Point2]) -> LineString<f64> {
    LineString::from(
        points
            .iter()
            .map(|point| Coord {
                x: point.x(),
                y: point.y(),
            })
            .collect::<Vec<_>>(),
    )
}

fn ring_points(ring: &LineString<f64>) -> Vec<Point2> {
    let mut points: Vec<Point2> = ring.coords().map(|c| Point2::new(c.x, c.y)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// 带孔的平面区域，可包含多个互不相交的外边界。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundShape {
    regions: MultiPolygon<f64>,
}

impl CompoundShape {
    pub fn empty() -> Self {
        Self {
            regions: MultiPolygon::new(Vec::new()),
        }
    }

    pub fn from_border(border: &Border) -> Self {
        Self {
            regions: MultiPolygon::new(vec![border.to_polygon()]),
        }
    }

    /// 所有片段连成闭合边界后按奇偶规则合并；无法闭合的片段被忽略。
    pub fn create_from_list(fragments: &[Vec<Point2>], tolerance: f64) -> Self {
        let mut pending: Vec<Vec<Point2>> = fragments
            .iter()
            .filter(|fragment| !fragment.is_empty())
            .cloned()
            .collect();
        let mut shape = Self::empty();
        while let Some((points, closed)) = chain_fragments(&mut pending, tolerance) {
            if !closed {
                continue;
            }
            if let Some(border) = Border::new(points) {
                shape = shape.xor(&Self::from_border(&border));
            }
        }
        shape
    }

    #[inline]
    pub fn regions(&self) -> &MultiPolygon<f64> {
        &self.regions
    }

    pub fn area(&self) -> f64 {
        self.regions.unsigned_area()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.0.is_empty() || self.area() <= 0.0
    }

    pub fn subtract(&self, other: &CompoundShape) -> CompoundShape {
        CompoundShape {
            regions: self.regions.difference(&other.regions),
        }
    }

    pub fn xor(&self, other: &CompoundShape) -> CompoundShape {
        CompoundShape {
            regions: self.regions.xor(&other.regions),
        }
    }

    /// 所有边界环，附带是否为外边界。
    pub fn borders(&self) -> Vec<(Border, bool)> {
        self.regions
            .iter()
            .flat_map(|polygon| {
                let outer = Border::new(ring_points(polygon.exterior())).map(|b| (b, true));
                let inner = polygon
                    .interiors()
                    .iter()
                    .filter_map(|ring| Border::new(ring_points(ring)).map(|b| (b, false)));
                outer.into_iter().chain(inner).collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn map_points(&self, f: impl Fn(Point2) -> Point2 + Copy) -> CompoundShape {
        CompoundShape {
            regions: self.regions.map_coords(move |coord| {
                let point = f(Point2::new(coord.x, coord.y));
                Coord {
                    x: point.x(),
                    y: point.y(),
                }
            }),
        }
    }
}

/// 从 `pending` 中取出首个片段并尽量向两端延伸，返回拼接结果及是否闭合。
pub(crate) fn chain_fragments(
    pending: &mut Vec<Vec<Point2>>,
    tolerance: f64,
) -> Option<(Vec<Point2>, bool)> {
    if pending.is_empty() {
        return None;
    }
    let mut chain = pending.remove(0);
    loop {
        let (Some(&head), Some(&tail)) = (chain.first(), chain.last()) else {
            return None;
        };
        if chain.len() > 2 && head.distance(tail) <= tolerance {
            chain.pop();
            return Some((chain, true));
        }
        let next = pending.iter().position(|fragment| {
            let (first, last) = (fragment[0], fragment[fragment.len() - 1]);
            first.distance(tail) <= tolerance
                || last.distance(tail) <= tolerance
                || first.distance(head) <= tolerance
                || last.distance(head) <= tolerance
        });
        let Some(index) = next else {
            return Some((chain, false));
        };
        let mut fragment = pending.remove(index);
        let (first, last) = (fragment[0], fragment[fragment.len() - 1]);
        if first.distance(tail) <= tolerance {
            chain.extend(fragment.into_iter().skip(1));
        } else if last.distance(tail) <= tolerance {
            fragment.reverse();
            chain.extend(fragment.into_iter().skip(1));
        } else if last.distance(head) <= tolerance {
            fragment.pop();
            fragment.extend(chain);
            chain = fragment;
        } else {
            fragment.reverse();
            fragment.pop();
            fragment.extend(chain);
            chain = fragment;
        }
    }
}
