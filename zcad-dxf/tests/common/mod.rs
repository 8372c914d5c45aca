#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use zcad_config::ConverterConfig;
use zcad_core::document::{Document, Entity, EntityKind, Layer, LineType};
use zcad_core::geometry::Point3;
use zcad_dxf::{DocumentLoader, DocumentSaver, ExportSession, ImportSession, IoError};
use zcad_kernel::{GeoObject, Project};

/// 以 JSON 文件保存已解析文档，代替真实的 DXF 读写器。
pub struct JsonStore;

impl DocumentLoader for JsonStore {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let text = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|err| IoError::InvalidDocument(err.to_string()))
    }
}

impl DocumentSaver for JsonStore {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        let text = serde_json::to_string_pretty(document)
            .map_err(|err| IoError::InvalidDocument(err.to_string()))?;
        fs::write(path, text).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn lenient_config() -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.xdata.strict = false;
    config
}

pub fn import(document: &Document) -> Project {
    ImportSession::new(document, &lenient_config())
        .import()
        .expect("导入失败")
}

pub fn export(project: &Project, config: &ConverterConfig) -> Document {
    ExportSession::new(project, config)
        .export()
        .expect("导出失败")
}

/// 文档中只放一个实体，导入后返回对应的内核对象。
pub fn import_single(entity: Entity) -> GeoObject {
    let mut document = Document::new();
    document.add_entity(entity);
    let project = import(&document);
    let model = project.model(0).expect("应有模型空间");
    assert_eq!(model.len(), 1, "应只导入一个对象");
    model.objects()[0].clone()
}

/// 单个内核对象导出后再导入。
pub fn round_trip(object: GeoObject, config: &ConverterConfig) -> GeoObject {
    let mut project = Project::new();
    if let Some(model) = project.model_mut(0) {
        model.add(object);
    }
    let document = export(&project, config);
    let reimported = ImportSession::new(&document, config)
        .import()
        .expect("重新导入失败");
    let model = reimported.model(0).expect("应有模型空间");
    assert_eq!(model.len(), 1, "应只得到一个对象");
    model.objects()[0].clone()
}

pub fn layer(name: &str, line_type: &str) -> Layer {
    let mut layer = Layer::new(name);
    layer.line_type = line_type.to_string();
    layer
}

pub fn dashed_line_type() -> LineType {
    LineType::new("DASHED", [0.5, -0.25])
}

fn round(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

pub fn point_value(point: Point3) -> Value {
    json!([round(point.x()), round(point.y()), round(point.z())])
}

/// 模型空间的概要：实体类型、图层与关键几何量。
pub fn summary(document: &Document) -> Value {
    let entities: Vec<Value> = document
        .model_space()
        .iter()
        .map(|entity| {
            let data = match &entity.kind {
                EntityKind::Line(line) => json!({
                    "start": point_value(line.start),
                    "end": point_value(line.end),
                }),
                EntityKind::Arc(arc) => json!({
                    "center": point_value(arc.center),
                    "radius": round(arc.radius),
                    "start_angle": round(arc.start_angle),
                    "end_angle": round(arc.end_angle),
                }),
                EntityKind::Circle(circle) => json!({
                    "center": point_value(circle.center),
                    "radius": round(circle.radius),
                }),
                EntityKind::Insert(insert) => json!({
                    "block": document
                        .block(insert.block)
                        .map(|block| block.name.clone())
                        .unwrap_or_default(),
                    "insert": point_value(insert.insert_point),
                }),
                EntityKind::PolyfaceMesh(mesh) => json!({
                    "vertices": mesh.vertices.len(),
                    "faces": mesh.faces.len(),
                }),
                _ => Value::Null,
            };
            json!({
                "kind": entity.type_name(),
                "layer": entity.layer_name(),
                "data": data,
            })
        })
        .collect();
    json!({ "entities": entities })
}
