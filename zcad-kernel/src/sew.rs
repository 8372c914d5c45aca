//! 面片缝合：顶点在容差内合并，共享边的面归入同一个壳。

use std::collections::HashMap;

use tracing::debug;
use zcad_core::geometry::Point3;

use crate::face::{Face, Shell};
use crate::object::Geometry;

/// 网格哈希的顶点池，查找时检查相邻单元。
#[derive(Debug, Clone)]
pub struct VertexPool {
    tolerance: f64,
    cells: HashMap<(i64, i64, i64), Vec<usize>>,
    points: Vec<Point3>,
}

impl VertexPool {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(f64::EPSILON),
            cells: HashMap::new(),
            points: Vec::new(),
        }
    }

    fn cell(&self, point: Point3) -> (i64, i64, i64) {
        let size = self.tolerance * 2.0;
        (
            (point.x() / size).floor() as i64,
            (point.y() / size).floor() as i64,
            (point.z() / size).floor() as i64,
        )
    }

    /// 返回容差内已有顶点的序号，没有则追加。
    pub fn index_of(&mut self, point: Point3) -> usize {
        let (cx, cy, cz) = self.cell(point);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    if let Some(&index) = bucket
                        .iter()
                        .find(|&&index| self.points[index].distance(point) <= self.tolerance)
                    {
                        return index;
                    }
                }
            }
        }
        let index = self.points.len();
        self.points.push(point);
        self.cells.entry((cx, cy, cz)).or_default().push(index);
        index
    }

    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<Point3> {
        self.points
    }
}

fn find(parents: &mut [usize], mut node: usize) -> usize {
    while parents[node] != node {
        parents[node] = parents[parents[node]];
        node = parents[node];
    }
    node
}

fn union(parents: &mut [usize], a: usize, b: usize) {
    let (root_a, root_b) = (find(parents, a), find(parents, b));
    if root_a != root_b {
        parents[root_b.max(root_a)] = root_a.min(root_b);
    }
}

/// 把面缝合成壳。多于一个面的连通分量成为 [`Shell`]，孤立的面保持为 [`Face`]。
/// 结果按各分量首个面的原始顺序排列。
pub fn sew_faces(faces: Vec<Face>, tolerance: f64) -> Vec<Geometry> {
    let mut pool = VertexPool::new(tolerance);
    let mut edges: HashMap<(usize, usize), usize> = HashMap::new();
    let mut parents: Vec<usize> = (0..faces.len()).collect();

    for (face_index, face) in faces.iter().enumerate() {
        let ids: Vec<usize> = face
            .outline_3d()
            .into_iter()
            .map(|point| pool.index_of(point))
            .collect();
        for k in 0..ids.len() {
            let (a, b) = (ids[k], ids[(k + 1) % ids.len()]);
            if a == b {
                continue;
            }
            let key = (a.min(b), a.max(b));
            match edges.get(&key) {
                Some(&other) => union(&mut parents, other, face_index),
                None => {
                    edges.insert(key, face_index);
                }
            }
        }
    }

    let mut components: Vec<(usize, Vec<Face>)> = Vec::new();
    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    for (index, face) in faces.into_iter().enumerate() {
        let root = find(&mut parents, index);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            components.push((root, Vec::new()));
            components.len() - 1
        });
        components[slot].1.push(face);
    }

    debug!(
        vertices = pool.points.len(),
        components = components.len(),
        "面片缝合完成"
    );

    components
        .into_iter()
        .map(|(_, mut faces)| {
            if faces.len() == 1 {
                Geometry::Face(faces.remove(0))
            } else {
                Geometry::Shell(Shell::new(faces))
            }
        })
        .collect()
}
