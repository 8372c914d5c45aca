//! 导入会话：把已解析的 DXF 实体重建为内核几何对象。
//!
//! 会话持有块表与资源缓存，整个文档处理完毕后交出 [`Project`]。

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};
use zcad_config::ConverterConfig;
use zcad_core::document::{Document, Entity, EntityKind, Handle};
use zcad_kernel::{Attributes, Block, GeoObject, Geometry, Model, Point, Project, UserData};

use crate::errors::IoError;

mod blocks;
mod curves;
mod hatch;
mod mesh;
mod resources;
mod text;
mod xdata;

pub use text::process_acad_string;
pub use xdata::HANDLE_KEY;

use resources::ResourceCache;

/// 图纸空间导入后的模型名称。
pub const PAPER_MODEL: &str = "Paper";

pub struct ImportSession<'a> {
    document: &'a Document,
    config: &'a ConverterConfig,
    eps: f64,
    project: Project,
    resources: ResourceCache,
    blocks: HashMap<Handle, Block>,
    visiting: HashSet<Handle>,
}

impl<'a> ImportSession<'a> {
    pub fn new(document: &'a Document, config: &'a ConverterConfig) -> Self {
        Self {
            document,
            config,
            eps: config.precision.eps,
            project: Project::new(),
            resources: ResourceCache::default(),
            blocks: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// 转换模型空间与（按配置）图纸空间。
    pub fn import(mut self) -> Result<Project, IoError> {
        let document = self.document;
        self.register_tables();
        debug!(counts = ?document.entity_counts(), "模型空间实体统计");

        let objects = self.convert_all(document.model_space())?;
        let imported = objects.len();
        if let Some(model) = self.project.model_mut(0) {
            model.extend(objects);
        }

        let paper_space = document.paper_space();
        if self.config.import.import_paper_space && !paper_space.is_empty() {
            let mut paper = Model::new(PAPER_MODEL);
            paper.extend(self.convert_all(paper_space)?);
            let index = self.project.add_model(paper);
            if document.model_space().is_empty() {
                self.project.set_active_model(index);
            }
        }

        info!(
            entities = document.model_space().len(),
            objects = imported,
            blocks = self.blocks.len(),
            "实体重建完成"
        );
        Ok(self.project)
    }

    fn convert_all(&mut self, entities: &[Entity]) -> Result<Vec<GeoObject>, IoError> {
        let mut objects = Vec::with_capacity(entities.len());
        for entity in entities {
            if let Some(object) = self.convert(entity)? {
                objects.push(object);
            }
        }
        Ok(objects)
    }

    /// 重建单个实体。不支持或退化的实体返回 `Ok(None)`。
    pub fn convert(&mut self, entity: &Entity) -> Result<Option<GeoObject>, IoError> {
        let geometry = match &entity.kind {
            EntityKind::Line(line) => self.line(line),
            EntityKind::Ray(ray) => self.ray(ray),
            EntityKind::Arc(arc) => self.arc(arc),
            EntityKind::Circle(circle) => self.circle(circle),
            EntityKind::Ellipse(ellipse) => self.ellipse(ellipse),
            EntityKind::Spline(spline) => self.spline(spline)?,
            EntityKind::Face3D(face) => self.face_3d(face),
            EntityKind::PolyfaceMesh(mesh) => self.polyface_mesh(mesh),
            EntityKind::Mesh(mesh) => self.mesh(mesh),
            EntityKind::Hatch(hatch) => self.hatch(entity, hatch)?,
            EntityKind::Solid(solid) => self.solid(entity, solid),
            EntityKind::Insert(insert) => self.insert(insert)?,
            EntityKind::MLine(mline) => self.mline(mline),
            EntityKind::Text(text) => self.text(text),
            EntityKind::MText(mtext) => self.mtext(mtext),
            EntityKind::Dimension(dimension) => self.dimension(entity, dimension)?,
            EntityKind::Leader(leader) => self.leader(entity, leader)?,
            EntityKind::Point(point) => Some(Geometry::Point(Point::cross(point.location))),
            EntityKind::Polyline(polyline) => self.polyline(polyline),
            EntityKind::Unknown { type_name } => {
                warn!(handle = %entity.handle(), kind = %type_name, "不支持的实体类型，已跳过");
                return Ok(None);
            }
        };

        let Some(geometry) = geometry else {
            debug!(handle = %entity.handle(), kind = entity.type_name(), "实体退化，已丢弃");
            return Ok(None);
        };

        let mut attributes = self.attributes(entity);
        attributes.user_data = xdata::user_data(entity);
        Ok(Some(bind(geometry, attributes)))
    }
}

/// 组合对象中未设置属性的子对象继承父对象的属性（用户数据除外）。
fn bind(mut geometry: Geometry, attributes: Attributes) -> GeoObject {
    let inherited = Attributes {
        user_data: UserData::default(),
        ..attributes.clone()
    };
    match &mut geometry {
        Geometry::Block(block) => inherit(block.children_mut(), &inherited),
        Geometry::Path(path) => inherit(path.curves_mut(), &inherited),
        _ => {}
    }
    GeoObject::new(geometry).with_attributes(attributes)
}

fn inherit(children: &mut [GeoObject], parent: &Attributes) {
    let unset = Attributes::default();
    for child in children {
        if child.attributes == unset {
            child.attributes = parent.clone();
        }
    }
}
