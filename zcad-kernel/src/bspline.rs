//! 有理 B 样条曲线。
//!
//! 内核始终保存标准布局：`knots.len() == poles.len() + degree + 1`，
//! 周期数据在构造时展开。

use glam::DVec4;
use serde::{Deserialize, Serialize};
use zcad_core::geometry::{Bounds3D, Point3, Transform};

use crate::curve::Curve;
use crate::errors::KernelError;
use crate::nurbs::{basis, create_knot_vector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSpline {
    degree: usize,
    poles: Vec<Point3>,
    weights: Vec<f64>,
    knots: Vec<f64>,
    is_periodic: bool,
    through_points: Vec<Point3>,
}

impl BSpline {
    /// 构造样条。`weights` 为空时全部取 1，`knots` 为空时生成节点；
    /// 周期样条若给出 `n + 2p + 1` 个节点，会把末尾 `p` 个控制点补到开头。
    pub fn new(
        degree: usize,
        poles: Vec<Point3>,
        weights: Vec<f64>,
        knots: Vec<f64>,
        periodic: bool,
    ) -> Result<Self, KernelError> {
        let count = poles.len();
        if degree == 0 {
            return Err(KernelError::invalid("spline degree must be at least 1"));
        }
        if count <= degree {
            return Err(KernelError::invalid(format!(
                "degree {degree} needs more than {count} poles"
            )));
        }
        let weights = if weights.is_empty() {
            vec![1.0; count]
        } else if weights.len() != count {
            return Err(KernelError::invalid(format!(
                "{} weights for {count} poles",
                weights.len()
            )));
        } else {
            weights
        };
        if weights.iter().any(|weight| *weight <= 0.0 || !weight.is_finite()) {
            return Err(KernelError::invalid("spline weights must be positive"));
        }

        let knots = if knots.is_empty() {
            create_knot_vector(count, degree, periodic)
        } else {
            knots
        };

        let (poles, weights) = if knots.len() == count + 2 * degree + 1 && periodic {
            let tail = count - degree;
            let mut wrapped_poles = poles[tail..].to_vec();
            wrapped_poles.extend(poles);
            let mut wrapped_weights = weights[tail..].to_vec();
            wrapped_weights.extend(weights);
            (wrapped_poles, wrapped_weights)
        } else {
            (poles, weights)
        };

        let count = poles.len();
        if knots.len() != count + degree + 1 {
            return Err(KernelError::invalid(format!(
                "invalid knot count {} for {count} poles of degree {degree}",
                knots.len()
            )));
        }
        if knots.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(KernelError::invalid("knot vector must be non-decreasing"));
        }
        if knots[count] - knots[degree] <= 0.0 {
            return Err(KernelError::Degenerate("empty spline domain".to_string()));
        }

        Ok(Self {
            degree,
            poles,
            weights,
            knots,
            is_periodic: periodic,
            through_points: Vec::new(),
        })
    }

    /// 三次（或给定次数）插值样条，参数取弦长，节点取平均值。
    /// `closed` 时曲线回到首点。
    pub fn through_points(
        points: &[Point3],
        degree: usize,
        closed: bool,
    ) -> Result<Self, KernelError> {
        let mut unique: Vec<Point3> = Vec::with_capacity(points.len() + 1);
        for point in points {
            if unique.last().is_none_or(|last| last.distance(*point) > f64::EPSILON) {
                unique.push(*point);
            }
        }
        if closed {
            if let (Some(first), Some(last)) = (unique.first().copied(), unique.last().copied()) {
                if unique.len() > 1 && first.distance(last) > f64::EPSILON {
                    unique.push(first);
                }
            }
        }
        let count = unique.len();
        if count < 2 {
            return Err(KernelError::invalid("interpolation needs at least two points"));
        }
        let degree = degree.clamp(1, count - 1);

        let chords: Vec<f64> = unique.windows(2).map(|pair| pair[0].distance(pair[1])).collect();
        let total: f64 = chords.iter().sum();
        let mut params = Vec::with_capacity(count);
        let mut accumulated = 0.0;
        params.push(0.0);
        for chord in &chords {
            accumulated += chord;
            params.push(accumulated / total);
        }
        params[count - 1] = 1.0;

        let mut knots = vec![0.0; degree + 1];
        for j in 1..count - degree {
            let sum: f64 = params[j..j + degree].iter().sum();
            knots.push(sum / degree as f64);
        }
        knots.extend(std::iter::repeat_n(1.0, degree + 1));

        let mut matrix = vec![vec![0.0; count]; count];
        matrix[0][0] = 1.0;
        matrix[count - 1][count - 1] = 1.0;
        for row in 1..count - 1 {
            for column in 0..count {
                matrix[row][column] = basis(&knots, column, degree, params[row]);
            }
        }
        let rhs: Vec<[f64; 3]> = unique
            .iter()
            .map(|point| [point.x(), point.y(), point.z()])
            .collect();
        let solved = solve_linear(matrix, rhs)?;
        let poles = solved
            .into_iter()
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect();

        let mut spline = Self::new(degree, poles, Vec::new(), knots, false)?;
        spline.through_points = points.to_vec();
        Ok(spline)
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    #[inline]
    pub fn poles(&self) -> &[Point3] {
        &self.poles
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.is_periodic
    }

    pub fn is_rational(&self) -> bool {
        self.weights
            .iter()
            .any(|weight| (weight - self.weights[0]).abs() > f64::EPSILON)
    }

    /// 插值点（仅由拟合点构造时非空）。
    #[inline]
    pub fn through_point_list(&self) -> &[Point3] {
        &self.through_points
    }

    /// 参数定义域 `[knots[p], knots[n]]`。
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.poles.len()])
    }

    /// de Boor 算法求值，参数会被限制在定义域内。
    pub fn point_at_param(&self, u: f64) -> Point3 {
        let (start, end) = self.domain();
        let u = u.clamp(start, end);
        let p = self.degree;
        let span = self.find_span(u);

        let mut d: Vec<DVec4> = (0..=p)
            .map(|j| {
                let index = j + span - p;
                let weight = self.weights[index];
                (self.poles[index].as_vec3() * weight).extend(weight)
            })
            .collect();
        for r in 1..=p {
            for j in (r..=p).rev() {
                let i = j + span - p;
                let denominator = self.knots[i + p + 1 - r] - self.knots[i];
                let alpha = if denominator.abs() < f64::EPSILON {
                    0.0
                } else {
                    (u - self.knots[i]) / denominator
                };
                d[j] = d[j - 1] * (1.0 - alpha) + d[j] * alpha;
            }
        }
        let h = d[p];
        if h.w.abs() < f64::EPSILON {
            return Point3::ORIGIN;
        }
        Point3::from(h.truncate() / h.w)
    }

    fn find_span(&self, u: f64) -> usize {
        let count = self.poles.len();
        (self.degree..count)
            .filter(|&i| self.knots[i] <= u && self.knots[i] < self.knots[i + 1])
            .last()
            .unwrap_or(self.degree)
    }

    /// 相邻控制点距离小于 `eps` 时返回 true。
    pub fn has_coincident_poles(&self, eps: f64) -> bool {
        self.poles
            .windows(2)
            .any(|pair| pair[0].distance(pair[1]) < eps)
    }

    /// 控制点包围盒对角线长度。
    pub fn poles_extent(&self) -> f64 {
        Bounds3D::from_points(&self.poles).size()
    }

    /// 满重（`degree + 1` 重）内部节点所在游程的起始下标。
    pub fn full_multiplicity_split_indices(&self) -> Vec<usize> {
        let p = self.degree;
        let knots = &self.knots;
        let mut indices: Vec<usize> = Vec::new();
        if knots.len() < 2 * p + 2 {
            return indices;
        }
        for i in p + 1..knots.len() - p - 1 {
            let run_start = i - 1;
            let full = (0..p).all(|j| knots[run_start] == knots[i + j]);
            if full && indices.last().is_none_or(|&previous| run_start > previous + p) {
                indices.push(run_start);
            }
        }
        indices
    }

    /// 在满重节点处拆分成彼此独立的段；没有满重节点时返回自身的副本。
    pub fn split_at_full_multiplicity_knots(&self) -> Result<Vec<BSpline>, KernelError> {
        let splits = self.full_multiplicity_split_indices();
        if splits.is_empty() {
            return Ok(vec![self.clone()]);
        }
        let p = self.degree;
        let mut segments = Vec::with_capacity(splits.len() + 1);
        let mut start = 0;
        for &end in &splits {
            segments.push(Self::new(
                p,
                self.poles[start..end].to_vec(),
                self.weights[start..end].to_vec(),
                self.knots[start..=end + p].to_vec(),
                false,
            )?);
            start = end;
        }
        segments.push(Self::new(
            p,
            self.poles[start..].to_vec(),
            self.weights[start..].to_vec(),
            self.knots[start..].to_vec(),
            false,
        )?);
        Ok(segments)
    }

    pub fn reverse(&mut self) {
        self.poles.reverse();
        self.weights.reverse();
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];
        self.knots = self.knots.iter().rev().map(|k| first + last - k).collect();
        self.through_points.reverse();
    }

    pub fn transform(&mut self, transform: &Transform) {
        for pole in &mut self.poles {
            *pole = transform.apply_point(*pole);
        }
        for point in &mut self.through_points {
            *point = transform.apply_point(*point);
        }
    }
}

impl Curve for BSpline {
    fn point_at(&self, t: f64) -> Point3 {
        let (start, end) = self.domain();
        self.point_at_param(start + t.clamp(0.0, 1.0) * (end - start))
    }
}

/// 列主元高斯消元，三个坐标分量共用一个系数矩阵。
fn solve_linear(
    mut matrix: Vec<Vec<f64>>,
    mut rhs: Vec<[f64; 3]>,
) -> Result<Vec<[f64; 3]>, KernelError> {
    let size = matrix.len();
    for column in 0..size {
        let pivot = (column..size)
            .max_by(|&a, &b| matrix[a][column].abs().total_cmp(&matrix[b][column].abs()))
            .unwrap_or(column);
        if matrix[pivot][column].abs() < 1e-14 {
            return Err(KernelError::Degenerate(
                "singular interpolation matrix".to_string(),
            ));
        }
        matrix.swap(column, pivot);
        rhs.swap(column, pivot);
        for row in column + 1..size {
            let factor = matrix[row][column] / matrix[column][column];
            if factor == 0.0 {
                continue;
            }
            for k in column..size {
                matrix[row][k] -= factor * matrix[column][k];
            }
            for axis in 0..3 {
                rhs[row][axis] -= factor * rhs[column][axis];
            }
        }
    }
    let mut solution = vec![[0.0; 3]; size];
    for row in (0..size).rev() {
        for axis in 0..3 {
            let tail: f64 = (row + 1..size)
                .map(|k| matrix[row][k] * solution[k][axis])
                .sum();
            solution[row][axis] = (rhs[row][axis] - tail) / matrix[row][row];
        }
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use zcad_core::geometry::Vector3;

    use super::*;

    fn square_poles() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(3.0, 2.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn clamped_spline_interpolates_end_poles() {
        let spline = BSpline::new(
            3,
            square_poles(),
            Vec::new(),
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            false,
        )
        .expect("valid spline");
        assert!(spline.start_point().distance(Point3::new(0.0, 0.0, 0.0)) < 1e-12);
        assert!(spline.end_point().distance(Point3::new(4.0, 0.0, 0.0)) < 1e-12);
        assert!(spline.point_at(0.5).distance(Point3::new(2.0, 1.5, 0.0)) < 1e-12);
    }

    #[test]
    fn periodic_knots_are_unwrapped() {
        let poles = square_poles();
        let knots: Vec<f64> = (0..11).map(|i| i as f64).collect();
        let spline = BSpline::new(3, poles, Vec::new(), knots, true).expect("periodic spline");
        assert_eq!(spline.poles().len(), 7);
        assert_eq!(spline.knots().len(), 11);
        assert_eq!(spline.poles()[0], Point3::new(1.0, 2.0, 0.0));
        assert!(spline.is_periodic());
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        assert!(BSpline::new(3, square_poles(), vec![1.0; 3], Vec::new(), false).is_err());
        assert!(BSpline::new(3, square_poles(), Vec::new(), vec![0.0; 5], false).is_err());
        assert!(
            BSpline::new(
                3,
                square_poles(),
                Vec::new(),
                vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.5],
                false
            )
            .is_err()
        );
        assert!(BSpline::new(4, square_poles(), Vec::new(), Vec::new(), false).is_err());
    }

    #[test]
    fn split_at_full_multiplicity_knots_keeps_shape() {
        let poles: Vec<Point3> = (0..8)
            .map(|i| Point3::new(i as f64, (i % 3) as f64, 0.0))
            .collect();
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0];
        let spline = BSpline::new(3, poles.clone(), Vec::new(), knots, false).expect("spline");
        assert_eq!(spline.full_multiplicity_split_indices(), vec![4]);

        let segments = spline.split_at_full_multiplicity_knots().expect("segments");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].poles(), &poles[..4]);
        assert_eq!(segments[1].poles(), &poles[4..]);
        assert_eq!(segments[0].knots(), &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        // 满重节点处曲线不连续，u = 1 属于第二段
        for step in 0..=10 {
            let u = step as f64 / 10.0;
            if step < 10 {
                assert!(
                    spline
                        .point_at_param(u)
                        .distance(segments[0].point_at_param(u))
                        < 1e-9
                );
            }
            assert!(
                spline
                    .point_at_param(1.0 + u)
                    .distance(segments[1].point_at_param(1.0 + u))
                    < 1e-9
            );
        }
    }

    #[test]
    fn smooth_spline_is_not_split() {
        let spline = BSpline::new(2, square_poles(), Vec::new(), Vec::new(), false)
            .expect("spline");
        assert!(spline.full_multiplicity_split_indices().is_empty());
        assert_eq!(
            spline.split_at_full_multiplicity_knots().expect("segments").len(),
            1
        );
    }

    #[test]
    fn interpolation_passes_through_points() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(3.0, 0.5, 0.0),
            Point3::new(4.0, 2.0, 1.0),
            Point3::new(6.0, 0.0, 0.0),
        ];
        let spline = BSpline::through_points(&points, 3, false).expect("interpolation");
        assert_eq!(spline.through_point_list().len(), 5);
        assert!(spline.start_point().distance(points[0]) < 1e-9);
        assert!(spline.end_point().distance(points[4]) < 1e-9);
        for point in &points[1..4] {
            let closest = spline
                .sample(20_001)
                .into_iter()
                .map(|sample| sample.distance(*point))
                .fold(f64::INFINITY, f64::min);
            assert!(closest < 1e-2, "missed {point:?} by {closest}");
        }
    }

    #[test]
    fn closed_interpolation_returns_to_start() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let spline = BSpline::through_points(&points, 3, true).expect("interpolation");
        assert!(spline.is_closed(1e-9));
    }

    #[test]
    fn reverse_and_transform_keep_point_set() {
        let mut spline = BSpline::new(
            2,
            square_poles(),
            vec![1.0, 2.0, 0.5, 1.0],
            Vec::new(),
            false,
        )
        .expect("spline");
        assert!(spline.is_rational());
        let start = spline.start_point();
        let middle = spline.point_at(0.3);
        spline.reverse();
        assert!(spline.end_point().distance(start) < 1e-12);
        assert!(spline.point_at(0.7).distance(middle) < 1e-9);

        let shift = Transform::translation(Vector3::new(0.0, 0.0, 5.0));
        spline.transform(&shift);
        assert!((spline.end_point().z() - 5.0).abs() < 1e-12);
        assert!(!spline.has_coincident_poles(1e-6));
        assert!((spline.poles_extent() - 20f64.sqrt()).abs() < 1e-12);
    }
}
