//! 三维面、多面网格与 MESH 的重建。

use tracing::warn;
use zcad_core::document as dxf;
use zcad_core::geometry::{Plane, Point2, Point3};
use zcad_kernel::sew::sew_faces;
use zcad_kernel::{Block, Face, GeoObject, Geometry};

use super::ImportSession;

const MESH_BLOCK: &str = "Mesh";
const FACE_BLOCK: &str = "Face3D";

impl ImportSession<'_> {
    pub(super) fn face_3d(&self, face: &dxf::Face3D) -> Option<Geometry> {
        let mut corners: Vec<Point3> = Vec::with_capacity(4);
        for corner in face.corners {
            if corners.last().is_none_or(|last| last.distance(corner) > self.eps) {
                corners.push(corner);
            }
        }
        if corners.len() == 4 && corners[0].distance(corners[3]) <= self.eps {
            corners.pop();
        }

        match corners.len() {
            3 => Face::triangle(corners[0], corners[1], corners[2], self.eps).map(Geometry::Face),
            4 => {
                let plane = Plane::fit_points(&corners)
                    .or_else(|| Plane::fit_points(&corners[..3]))?;
                if plane.max_distance(&corners) > self.eps {
                    let triangles: Vec<GeoObject> = split_quad(&corners, self.eps)
                        .into_iter()
                        .map(GeoObject::new)
                        .collect();
                    return match triangles.len() {
                        0 => None,
                        _ => Some(Block::new(FACE_BLOCK).with_children(triangles).into()),
                    };
                }
                let ordered = untwist_quad(&corners, &plane);
                Face::from_polygon(&ordered, self.eps).map(Geometry::Face)
            }
            _ => None,
        }
    }

    pub(super) fn polyface_mesh(&self, mesh: &dxf::PolyfaceMesh) -> Option<Geometry> {
        let mut faces = Vec::with_capacity(mesh.faces.len());
        for (index, record) in mesh.faces.iter().enumerate() {
            let indices: Vec<usize> = record
                .iter()
                .map_while(|&raw| (raw.unsigned_abs() as usize).checked_sub(1))
                .collect();
            let indices = match indices.as_slice() {
                [a, b, c, d] if d == c => vec![*a, *b, *c],
                _ => indices,
            };
            faces.extend(self.indexed_faces(&mesh.vertices, &indices, index));
        }
        self.assemble_faces(faces)
    }

    pub(super) fn mesh(&self, mesh: &dxf::Mesh) -> Option<Geometry> {
        let mut faces = Vec::with_capacity(mesh.faces.len());
        for (index, polygon) in mesh.faces.iter().enumerate() {
            faces.extend(self.indexed_faces(&mesh.vertices, polygon, index));
        }
        self.assemble_faces(faces)
    }

    /// 按索引取顶点构造面。重复索引的面直接丢弃，越界索引告警后丢弃。
    fn indexed_faces(&self, vertices: &[Point3], indices: &[usize], face: usize) -> Vec<Face> {
        if indices.len() < 3 {
            return Vec::new();
        }
        if indices
            .iter()
            .enumerate()
            .any(|(i, a)| indices[i + 1..].contains(a))
        {
            return Vec::new();
        }
        let Some(points) = indices
            .iter()
            .map(|&index| vertices.get(index).copied())
            .collect::<Option<Vec<Point3>>>()
        else {
            warn!(face, vertices = vertices.len(), "网格面索引越界，已丢弃");
            return Vec::new();
        };

        if let Some(face) = Face::from_polygon(&points, self.eps) {
            return vec![face];
        }
        match points.len() {
            3 => Vec::new(),
            4 => split_quad(&points, self.eps),
            _ => (1..points.len() - 1)
                .filter_map(|i| Face::triangle(points[0], points[i], points[i + 1], self.eps))
                .collect(),
        }
    }

    /// 多个面缝合成壳；结果多于一个时放入名为 `Mesh` 的块。
    fn assemble_faces(&self, faces: Vec<Face>) -> Option<Geometry> {
        match faces.len() {
            0 => None,
            1 => faces.into_iter().next().map(Geometry::Face),
            _ => {
                let mut parts = sew_faces(faces, self.eps);
                if parts.len() == 1 {
                    return parts.pop();
                }
                let children = parts.into_iter().map(GeoObject::new).collect();
                Some(Block::new(MESH_BLOCK).with_children(children).into())
            }
        }
    }
}

/// 非平面四边形拆成 (0,1,2) 与 (2,3,0) 两个三角形。
fn split_quad(points: &[Point3], eps: f64) -> Vec<Face> {
    [
        Face::triangle(points[0], points[1], points[2], eps),
        Face::triangle(points[2], points[3], points[0], eps),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// 自交（蝴蝶结形）四边形调整为简单四边形。
fn untwist_quad(points: &[Point3], plane: &Plane) -> Vec<Point3> {
    let local: Vec<Point2> = points.iter().map(|point| plane.to_local(*point)).collect();
    if segments_cross(local[0], local[1], local[2], local[3]) {
        vec![points[0], points[2], points[1], points[3]]
    } else if segments_cross(local[1], local[2], local[3], local[0]) {
        vec![points[0], points[1], points[3], points[2]]
    } else {
        points.to_vec()
    }
}

fn segments_cross(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let orient = |p: Point2, q: Point2, r: Point2| {
        (q.x() - p.x()) * (r.y() - p.y()) - (q.y() - p.y()) * (r.x() - p.x())
    };
    let (d1, d2) = (orient(a, b, c), orient(a, b, d));
    let (d3, d4) = (orient(c, d, a), orient(c, d, b));
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

#[cfg(test)]
mod tests {
    use zcad_config::ConverterConfig;
    use zcad_core::document::Document;

    use super::*;

    fn with_session(check: impl FnOnce(&ImportSession<'_>)) {
        let document = Document::new();
        let config = ConverterConfig::default();
        check(&ImportSession::new(&document, &config));
    }

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn two_triangles_sharing_an_edge_form_one_shell() {
        with_session(|session| {
            let mesh = dxf::PolyfaceMesh {
                vertices: vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)],
                faces: vec![[1, 2, 3, 0], [-1, 3, 4, 4]],
            };
            let Some(Geometry::Shell(shell)) = session.polyface_mesh(&mesh) else {
                panic!("应为壳");
            };
            assert_eq!(shell.faces().len(), 2);
        });
    }

    #[test]
    fn degenerate_and_out_of_range_faces_are_dropped() {
        with_session(|session| {
            let mesh = dxf::PolyfaceMesh {
                vertices: vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
                faces: vec![[1, 1, 2, 0], [1, 2, 9, 0], [1, 2, 3, 0]],
            };
            assert!(matches!(session.polyface_mesh(&mesh), Some(Geometry::Face(_))));
        });
    }

    #[test]
    fn non_planar_quad_splits_into_triangles() {
        with_session(|session| {
            let mesh = dxf::PolyfaceMesh {
                vertices: vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 0.0)],
                faces: vec![[1, 2, 3, 4]],
            };
            let Some(Geometry::Shell(shell)) = session.polyface_mesh(&mesh) else {
                panic!("应为两个三角形组成的壳");
            };
            assert!(shell.faces().iter().all(|face| face.outline().len() == 3));
        });
    }

    #[test]
    fn separate_components_are_grouped_in_a_block() {
        with_session(|session| {
            let mesh = dxf::Mesh {
                vertices: vec![
                    p(0.0, 0.0, 0.0),
                    p(1.0, 0.0, 0.0),
                    p(0.0, 1.0, 0.0),
                    p(5.0, 0.0, 0.0),
                    p(6.0, 0.0, 0.0),
                    p(6.0, 1.0, 0.0),
                    p(5.5, 1.5, 0.0),
                    p(5.0, 1.0, 0.0),
                ],
                faces: vec![vec![0, 1, 2], vec![3, 4, 5, 6, 7]],
            };
            let Some(Geometry::Block(block)) = session.mesh(&mesh) else {
                panic!("应为块");
            };
            assert_eq!(block.name, MESH_BLOCK);
            assert_eq!(block.children().len(), 2);
        });
    }

    #[test]
    fn bow_tie_face_is_untwisted() {
        with_session(|session| {
            let face = dxf::Face3D {
                corners: [p(0.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
            };
            let Some(Geometry::Face(face)) = session.face_3d(&face) else {
                panic!("应为面");
            };
            assert!((face.area() - 1.0).abs() < 1e-9);
        });
    }

    #[test]
    fn triangle_face_with_repeated_corner() {
        with_session(|session| {
            let face = dxf::Face3D {
                corners: [p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(0.0, 2.0, 0.0), p(0.0, 2.0, 0.0)],
            };
            let Some(Geometry::Face(face)) = session.face_3d(&face) else {
                panic!("应为三角形");
            };
            assert!(face.outline().len() == 3);
            assert!((face.area() - 2.0).abs() < 1e-9);
        });
    }

    #[test]
    fn non_planar_face_becomes_block_of_triangles() {
        with_session(|session| {
            let face = dxf::Face3D {
                corners: [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 0.0)],
            };
            let Some(Geometry::Block(block)) = session.face_3d(&face) else {
                panic!("应为块");
            };
            assert_eq!(block.children().len(), 2);
        });
    }
}
