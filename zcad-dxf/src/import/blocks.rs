//! 块引用、标注、引线与多线。

use tracing::{debug, warn};
use zcad_core::document::{self as dxf, Entity, Handle};
use zcad_core::geometry::{Plane, Point3, Transform};
use zcad_kernel::{Block, GeoObject, Geometry, Path, Polyline};

use super::ImportSession;
use crate::errors::IoError;

const MLINE_BLOCK: &str = "MLine";

impl ImportSession<'_> {
    /// 块只展开一次，之后返回缓存的副本。
    fn resolve_block(&mut self, handle: Handle) -> Result<Option<Block>, IoError> {
        if let Some(block) = self.blocks.get(&handle) {
            return Ok(Some(block.clone()));
        }
        let document = self.document;
        let Some(record) = document.block(handle) else {
            warn!(block = %handle, "引用的块不存在");
            return Ok(None);
        };
        if !self.visiting.insert(handle) {
            return Err(IoError::CyclicBlockReference { handle });
        }
        let children = self.convert_all(&record.entities);
        self.visiting.remove(&handle);

        let mut block = Block::new(record.name.clone()).with_children(children?);
        block.ref_point = record.base_point;
        debug!(block = %record.name, children = block.children().len(), "块已展开");
        self.blocks.insert(handle, block.clone());
        Ok(Some(block))
    }

    pub(super) fn insert(&mut self, insert: &dxf::Insert) -> Result<Option<Geometry>, IoError> {
        let Some(mut block) = self.resolve_block(insert.block)? else {
            return Ok(None);
        };
        if block.is_empty() {
            return Ok(None);
        }
        block.transform(&placement(insert, block.ref_point));
        Ok(Some(block.into()))
    }

    pub(super) fn dimension(
        &mut self,
        entity: &Entity,
        dimension: &dxf::Dimension,
    ) -> Result<Option<Geometry>, IoError> {
        let Some(handle) = dimension.block else {
            warn!(handle = %entity.handle(), "标注没有关联块，已跳过");
            return Ok(None);
        };
        Ok(self
            .resolve_block(handle)?
            .filter(|block| !block.is_empty())
            .map(Geometry::Block))
    }

    /// 引线转为块 `Leader:<handle>`：注释对象加上经过各顶点的折线。
    pub(super) fn leader(
        &mut self,
        entity: &Entity,
        leader: &dxf::Leader,
    ) -> Result<Option<Geometry>, IoError> {
        let mut block = Block::new(format!("Leader:{}", entity.handle()));
        if let Some(annotation) = leader.annotation {
            let document = self.document;
            match document.entity(annotation) {
                Some(target) => {
                    if !self.visiting.insert(annotation) {
                        return Err(IoError::CyclicBlockReference { handle: annotation });
                    }
                    let converted = self.convert(target);
                    self.visiting.remove(&annotation);
                    if let Some(object) = converted? {
                        block.add(object);
                    }
                }
                None => warn!(handle = %entity.handle(), annotation = %annotation, "引线注释对象不存在"),
            }
        }

        let mut vertices: Vec<Point3> = Vec::with_capacity(leader.vertices.len());
        for vertex in &leader.vertices {
            if vertices.last().is_none_or(|last| last.distance(*vertex) > self.eps) {
                vertices.push(*vertex);
            }
        }
        if vertices.len() >= 2 {
            block.add(GeoObject::new(Polyline::new(vertices, false)));
        }
        Ok((!block.is_empty()).then(|| block.into()))
    }

    /// 每个样式元素沿斜接方向偏移出一条折线。
    pub(super) fn mline(&self, mline: &dxf::MLine) -> Option<Geometry> {
        if mline.vertices.len() < 2 {
            return None;
        }
        let offsets: &[f64] = if mline.element_offsets.is_empty() {
            &[0.0]
        } else {
            &mline.element_offsets
        };
        let mut elements: Vec<GeoObject> = offsets
            .iter()
            .map(|offset| {
                let points = mline
                    .vertices
                    .iter()
                    .map(|vertex| vertex.position + vertex.miter * *offset)
                    .collect();
                GeoObject::new(Polyline::new(points, mline.is_closed))
            })
            .collect();

        let mut paths: Vec<GeoObject> = Vec::new();
        while let Some(path) = Path::chain(&mut elements, self.eps) {
            paths.push(GeoObject::new(path));
        }
        match paths.len() {
            0 => None,
            1 => paths.pop().map(|path| path.geometry),
            _ => Some(Block::new(MLINE_BLOCK).with_children(paths).into()),
        }
    }
}

/// 块坐标到世界坐标：减去基点、缩放、旋转、转入 OCS，最后平移到插入点。
fn placement(insert: &dxf::Insert, base_point: Point3) -> Transform {
    let to_world = Plane::ocs(Point3::ORIGIN, insert.normal)
        .map(|ocs| Transform::from_plane(&ocs))
        .unwrap_or(Transform::IDENTITY);
    Transform::translation(Point3::ORIGIN - base_point)
        .then(Transform::scale(insert.scale.x(), insert.scale.y(), insert.scale.z()))
        .then(Transform::rotation_z(insert.rotation))
        .then(to_world)
        .then(Transform::translation(insert.insert_point - Point3::ORIGIN))
}
