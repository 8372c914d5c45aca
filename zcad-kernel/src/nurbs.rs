//! NURBS 求值：节点向量生成、Cox–de Boor 递归基函数与曲线采样。

use glam::DVec3;
use zcad_core::geometry::Point3;

use crate::errors::KernelError;

/// 生成节点向量。非周期为夹紧节点（两端各 `degree + 1` 重），
/// 周期为均匀节点，共 `n + 2 * degree + 1` 个。
pub fn create_knot_vector(control_points: usize, degree: usize, periodic: bool) -> Vec<f64> {
    if periodic {
        let count = control_points + 2 * degree + 1;
        let factor = 1.0 / (control_points as f64 - degree as f64);
        (0..count)
            .map(|i| (i as f64 - degree as f64) * factor)
            .collect()
    } else {
        let count = control_points + degree + 1;
        let last = control_points as f64 - degree as f64;
        (0..count)
            .map(|i| {
                if i <= degree {
                    0.0
                } else if i < control_points {
                    (i - degree) as f64
                } else {
                    last
                }
            })
            .collect()
    }
}

/// 第 `i` 个 `p` 次基函数在 `u` 处的值，区间为左闭右开。
pub fn basis(knots: &[f64], i: usize, p: usize, u: f64) -> f64 {
    if p == 0 {
        return if knots[i] <= u && u < knots[i + 1] {
            1.0
        } else {
            0.0
        };
    }

    let mut value = 0.0;
    let left_span = knots[i + p] - knots[i];
    if left_span.abs() >= f64::EPSILON {
        let coefficient = (u - knots[i]) / left_span;
        if coefficient != 0.0 {
            value += coefficient * basis(knots, i, p - 1, u);
        }
    }
    let right_span = knots[i + p + 1] - knots[i + 1];
    if right_span.abs() >= f64::EPSILON {
        let coefficient = (knots[i + p + 1] - u) / right_span;
        if coefficient != 0.0 {
            value += coefficient * basis(knots, i + 1, p - 1, u);
        }
    }
    value
}

/// 有理曲线求值。加权基函数之和过小时返回原点。
pub fn evaluate(
    controls: &[Point3],
    weights: &[f64],
    knots: &[f64],
    degree: usize,
    u: f64,
) -> Point3 {
    let mut numerator = DVec3::ZERO;
    let mut denominator = 0.0;
    for (i, (point, weight)) in controls.iter().zip(weights).enumerate() {
        let n = basis(knots, i, degree, u);
        if n == 0.0 {
            continue;
        }
        denominator += n * weight;
        numerator += point.as_vec3() * (weight * n);
    }
    if denominator.abs() < f64::EPSILON {
        return Point3::ORIGIN;
    }
    Point3::from(numerator / denominator)
}

/// 按 DXF 样条的闭合/周期标志离散曲线。
#[derive(Debug, Clone)]
pub struct NurbsEvaluator {
    controls: Vec<Point3>,
    weights: Vec<f64>,
    knots: Vec<f64>,
    degree: usize,
    closed: bool,
    periodic: bool,
}

impl NurbsEvaluator {
    pub fn new(
        controls: &[Point3],
        weights: Option<&[f64]>,
        knots: Option<&[f64]>,
        degree: usize,
        closed: bool,
        periodic: bool,
    ) -> Result<Self, KernelError> {
        let count = controls.len();
        if count == 0 {
            return Err(KernelError::invalid("spline requires control points"));
        }
        if count <= degree {
            return Err(KernelError::invalid(format!(
                "degree {degree} needs more than {count} control points"
            )));
        }

        let weights = match weights {
            Some(weights) if weights.len() != count => {
                return Err(KernelError::invalid(format!(
                    "{} weights for {count} control points",
                    weights.len()
                )));
            }
            Some(weights) => weights.to_vec(),
            None => vec![1.0; count],
        };

        let expected = if periodic {
            count + 2 * degree + 1
        } else {
            count + degree + 1
        };
        let knots = match knots {
            Some(knots) if knots.len() != expected => {
                return Err(KernelError::invalid(format!(
                    "invalid knot count {} (expected {expected})",
                    knots.len()
                )));
            }
            Some(knots) => knots.to_vec(),
            None => create_knot_vector(count, degree, periodic),
        };

        let (controls, weights) = if periodic {
            let tail = count - degree;
            let mut wrapped_controls = controls[tail..].to_vec();
            wrapped_controls.extend_from_slice(controls);
            let mut wrapped_weights = weights[tail..].to_vec();
            wrapped_weights.extend_from_slice(&weights);
            (wrapped_controls, wrapped_weights)
        } else {
            (controls.to_vec(), weights)
        };

        Ok(Self {
            controls,
            weights,
            knots,
            degree,
            closed,
            periodic,
        })
    }

    /// 生成 `precision` 个采样点；开放曲线以最后一个控制点收尾。
    pub fn sample(&self, precision: usize) -> Result<Vec<Point3>, KernelError> {
        if precision < 2 {
            return Err(KernelError::invalid(format!(
                "precision must be at least 2, got {precision}"
            )));
        }

        let last = self.knots.len() - 1;
        let (start, end, steps) = if self.closed {
            (self.knots[0], self.knots[last], precision)
        } else if self.periodic {
            (
                self.knots[self.degree],
                self.knots[last - self.degree],
                precision,
            )
        } else {
            (self.knots[0], self.knots[last], precision - 1)
        };

        let delta = (end - start) / steps as f64;
        let mut points: Vec<Point3> = (0..steps)
            .map(|i| {
                let u = start + delta * i as f64;
                evaluate(&self.controls, &self.weights, &self.knots, self.degree, u)
            })
            .collect();

        if !(self.closed || self.periodic) {
            if let Some(last_control) = self.controls.last() {
                points.push(*last_control);
            }
        }
        Ok(points)
    }
}
