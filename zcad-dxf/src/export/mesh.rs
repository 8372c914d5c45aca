//! 面、壳与实体写成多面网格或 MESH。

use zcad_core::document::{self as dxf, Entity, EntityKind};
use zcad_core::geometry::Point3;
use zcad_kernel::{ColorId, Face, Shell, VertexPool};

use super::ExportSession;
use crate::errors::IoError;

/// 多面网格用 i16 存 1 基索引。
const MAX_POLYFACE_VERTICES: usize = i16::MAX as usize;

/// 收集顶点与面，距离在容差内的顶点合并。
struct MeshBuilder {
    vertices: VertexPool,
    faces: Vec<Vec<usize>>,
}

impl MeshBuilder {
    fn new(eps: f64) -> Self {
        Self {
            vertices: VertexPool::new(eps),
            faces: Vec::new(),
        }
    }

    fn add_polygon(&mut self, points: &[Point3]) {
        let indices = points
            .iter()
            .map(|point| self.vertices.index_of(*point))
            .collect();
        self.faces.push(indices);
    }

    /// 四边形原样保留，其余面先三角化。
    fn add_face(&mut self, face: &Face, keep_quads: bool) {
        if keep_quads && face.is_quad() {
            self.add_polygon(&face.outline_3d());
        } else {
            for triangle in face.triangulate() {
                self.add_polygon(&triangle);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    fn into_kind(self, use_mesh: bool) -> Result<EntityKind, IoError> {
        if use_mesh {
            return Ok(EntityKind::Mesh(dxf::Mesh {
                vertices: self.vertices.into_points(),
                faces: self.faces,
            }));
        }
        if self.vertices.len() > MAX_POLYFACE_VERTICES {
            return Err(IoError::InvalidParameter(format!(
                "polyface mesh with {} vertices exceeds the limit of {}",
                self.vertices.len(),
                MAX_POLYFACE_VERTICES
            )));
        }
        let faces = self
            .faces
            .iter()
            .map(|indices| {
                let mut record = [0i16; 4];
                for (slot, index) in record.iter_mut().zip(indices) {
                    *slot = (*index + 1) as i16;
                }
                record
            })
            .collect();
        Ok(EntityKind::PolyfaceMesh(dxf::PolyfaceMesh {
            vertices: self.vertices.into_points(),
            faces,
        }))
    }
}

impl ExportSession<'_> {
    pub(super) fn face(&self, face: &Face) -> Result<Vec<Entity>, IoError> {
        let mut builder = MeshBuilder::new(self.eps);
        builder.add_face(face, true);
        if builder.is_empty() {
            return Ok(Vec::new());
        }
        let entity = self.painted(builder.into_kind(self.config.export.use_mesh)?, face.color());
        Ok(vec![entity])
    }

    /// 壳按面颜色分组，每组一个网格实体；也可按配置每个面单独写出。
    pub(super) fn shell(&self, shell: &Shell) -> Result<Vec<Entity>, IoError> {
        if self.config.export.single_mesh_per_face {
            let mut entities = Vec::with_capacity(shell.faces().len());
            for face in shell.faces() {
                entities.extend(self.face(face)?);
            }
            return Ok(entities);
        }

        let mut groups: Vec<(Option<ColorId>, MeshBuilder)> = Vec::new();
        for face in shell.faces() {
            let index = match groups.iter().position(|(color, _)| *color == face.color()) {
                Some(index) => index,
                None => {
                    groups.push((face.color(), MeshBuilder::new(self.eps)));
                    groups.len() - 1
                }
            };
            groups[index].1.add_face(face, false);
        }

        groups
            .into_iter()
            .filter(|(_, builder)| !builder.is_empty())
            .map(|(color, builder)| {
                Ok(self.painted(builder.into_kind(self.config.export.use_mesh)?, color))
            })
            .collect()
    }

    fn painted(&self, kind: EntityKind, color: Option<ColorId>) -> Entity {
        let mut entity = Entity::new(kind);
        if let Some((color, transparency)) = color.and_then(|id| self.color(id)) {
            entity.common.color = color;
            entity.common.transparency = transparency;
        }
        entity
    }
}
