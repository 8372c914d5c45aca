//! 导出会话：把内核模型写成 DXF 文档。
//!
//! 顶层的独立面按图层合并为一个壳，在其他对象之后写出。

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};
use zcad_config::ConverterConfig;
use zcad_core::document::{Color, Document, Entity, EntityKind, LineType, LineWeight, PointEntity};
use zcad_kernel::{Attributes, Face, GeoObject, Geometry, LayerId, LinePatternId, Project, Shell};

use crate::errors::IoError;

mod blocks;
mod curves;
mod hatch;
mod mesh;
mod resources;
mod text;
mod xdata;

const DEFAULT_LAYER: &str = "0";

pub struct ExportSession<'a> {
    project: &'a Project,
    config: &'a ConverterConfig,
    eps: f64,
    document: Document,
    anonymous_blocks: usize,
    line_types: HashMap<LinePatternId, String>,
    created_layers: HashSet<String>,
}

impl<'a> ExportSession<'a> {
    pub fn new(project: &'a Project, config: &'a ConverterConfig) -> Self {
        Self {
            project,
            config,
            eps: config.precision.eps,
            document: Document::new(),
            anonymous_blocks: 0,
            line_types: HashMap::new(),
            created_layers: HashSet::new(),
        }
    }

    pub fn export(mut self) -> Result<Document, IoError> {
        let project = self.project;
        let model = project
            .model_to_export()
            .ok_or_else(|| IoError::InvalidDocument("project has no model to export".to_string()))?;

        let mut loose_faces: Vec<(Option<LayerId>, Vec<Face>)> = Vec::new();
        for object in model.objects() {
            if let Geometry::Face(face) = &object.geometry {
                let face = match face.color() {
                    Some(_) => face.clone(),
                    None => face.clone().with_color(object.attributes.color),
                };
                let layer = object.attributes.layer;
                match loose_faces.iter_mut().find(|(group, _)| *group == layer) {
                    Some((_, faces)) => faces.push(face),
                    None => loose_faces.push((layer, vec![face])),
                }
                continue;
            }
            for entity in self.convert(object)? {
                self.document.add_entity(entity);
            }
        }

        for (layer, faces) in loose_faces {
            let attributes = Attributes {
                layer,
                ..Attributes::default()
            };
            let mut entities = match faces.len() {
                1 => self.face(&faces[0])?,
                _ => self.shell(&Shell::new(faces))?,
            };
            for entity in &mut entities {
                self.apply_attributes(entity, &attributes, false)?;
            }
            for entity in entities {
                self.document.add_entity(entity);
            }
        }

        info!(
            model = %model.name,
            entities = self.document.model_space().len(),
            blocks = self.document.blocks().count(),
            "模型导出完成"
        );
        Ok(self.document)
    }

    /// 转换单个对象。单一实体携带对象的全部属性与扩展数据；
    /// 拆成多个实体时只补齐尚未设置的属性。
    pub fn convert(&mut self, object: &GeoObject) -> Result<Vec<Entity>, IoError> {
        let mut entities = match &object.geometry {
            Geometry::Point(point) => vec![Entity::new(EntityKind::Point(PointEntity {
                location: point.location,
            }))],
            Geometry::Line(line) => vec![Entity::new(self.line(line))],
            Geometry::Ellipse(ellipse) => vec![Entity::new(self.ellipse(ellipse)?)],
            Geometry::Polyline(polyline) => vec![Entity::new(self.polyline(polyline))],
            Geometry::BSpline(spline) => vec![Entity::new(self.spline(spline))],
            Geometry::Path(path) => self.path(path)?,
            Geometry::Text(text) => vec![Entity::new(self.text(text))],
            Geometry::Block(block) => self.block(block)?,
            Geometry::Face(face) => self.face(face)?,
            Geometry::Shell(shell) => self.shell(shell)?,
            Geometry::Solid(solid) => match solid.shells().first() {
                Some(shell) => self.shell(shell)?,
                None => Vec::new(),
            },
            Geometry::Hatch(hatch) => self.hatch(hatch, &object.attributes)?.into_iter().collect(),
        };
        if entities.is_empty() {
            debug!(kind = object.kind_name(), "对象没有可导出的实体");
        }

        let single = entities.len() == 1;
        for entity in &mut entities {
            self.apply_attributes(entity, &object.attributes, single)?;
        }
        Ok(entities)
    }

    /// 只填充实体上仍为默认值的属性。
    fn apply_attributes(
        &mut self,
        entity: &mut Entity,
        attributes: &Attributes,
        with_xdata: bool,
    ) -> Result<(), IoError> {
        let common = &mut entity.common;
        if let Some(layer) = attributes.layer {
            if common.layer == DEFAULT_LAYER {
                common.layer = self.layer(layer);
            }
        }
        if let Some(color) = attributes.color {
            if common.color == Color::ByLayer {
                if let Some((color, transparency)) = self.color(color) {
                    common.color = color;
                    common.transparency = transparency;
                }
            }
        }
        if let Some(pattern) = attributes.line_pattern {
            if common.line_type == LineType::BY_LAYER {
                if let Some(name) = self.line_type(pattern) {
                    common.line_type = name;
                }
            }
        }
        if let Some(width) = attributes.line_width {
            if common.line_weight == LineWeight::ByLayer {
                if let Some(weight) = self.entity_line_weight(width, attributes.layer) {
                    common.line_weight = weight;
                }
            }
        }
        common.invisible |= !attributes.is_visible;
        if with_xdata {
            common.xdata = self.xdata(&attributes.user_data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use zcad_core::geometry::Point3;
    use zcad_kernel::{ColorDef, Layer, Line, Model};

    use super::*;

    fn square(x: f64) -> Face {
        Face::from_polygon(
            &[
                Point3::new(x, 0.0, 0.0),
                Point3::new(x + 1.0, 0.0, 0.0),
                Point3::new(x + 1.0, 1.0, 0.0),
                Point3::new(x, 1.0, 0.0),
            ],
            1e-9,
        )
        .expect("正方形应可构造")
    }

    #[test]
    fn loose_faces_are_merged_per_layer() {
        let mut project = Project::new();
        let walls = project.layers.add(Layer::new("Walls"));
        let red = project.colors.add(ColorDef::new("255,0,0", (255, 0, 0)));
        let on_walls = Attributes {
            layer: Some(walls),
            color: Some(red),
            ..Attributes::default()
        };
        if let Some(model) = project.model_mut(0) {
            model.add(GeoObject::new(square(0.0)).with_attributes(on_walls.clone()));
            model.add(GeoObject::new(square(2.0)).with_attributes(on_walls));
            model.add(GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(1.0, 1.0, 0.0))));
        }
        let config = ConverterConfig::default();
        let document = ExportSession::new(&project, &config).export().expect("导出失败");

        let entities = document.model_space();
        assert_eq!(entities.len(), 2);
        assert!(matches!(entities[0].kind, EntityKind::Line(_)));
        let EntityKind::PolyfaceMesh(mesh) = &entities[1].kind else {
            panic!("应为多面网格");
        };
        assert_eq!(mesh.faces.len(), 4);
        assert_eq!(entities[1].common.layer, "Walls");
        assert_eq!(entities[1].common.color, Color::Rgb(255, 0, 0));
    }

    #[test]
    fn model_space_is_preferred_over_active_model() {
        let mut project = Project::new();
        if let Some(model) = project.model_mut(0) {
            model.add(GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0))));
        }
        let mut paper = Model::new("Paper");
        paper.add(GeoObject::new(zcad_kernel::Point::cross(Point3::ORIGIN)));
        let index = project.add_model(paper);
        project.set_active_model(index);

        let config = ConverterConfig::default();
        let document = ExportSession::new(&project, &config).export().expect("导出失败");
        assert_eq!(document.model_space().len(), 1);
        assert!(matches!(document.model_space()[0].kind, EntityKind::Line(_)));
    }
}
