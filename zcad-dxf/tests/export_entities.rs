mod common;

use common::{JsonStore, export, lenient_config, summary};
use serde_json::json;
use zcad_config::ConverterConfig;
use zcad_core::document::{Color, EntityKind, LineWeight};
use zcad_core::geometry::{Plane, Point3};
use zcad_dxf::{DocumentLoader, export_file};
use zcad_kernel::{
    Attributes, ColorDef, Ellipse, Face, GeoObject, Layer, Line, LinePattern, LineWidth, Path,
    Project, Shell,
};

fn project_with(objects: Vec<GeoObject>) -> Project {
    let mut project = Project::new();
    if let Some(model) = project.model_mut(0) {
        model.extend(objects);
    }
    project
}

fn square(x: f64, y: f64) -> Face {
    Face::from_polygon(
        &[
            Point3::new(x, y, 0.0),
            Point3::new(x + 1.0, y, 0.0),
            Point3::new(x + 1.0, y + 1.0, 0.0),
            Point3::new(x, y + 1.0, 0.0),
        ],
        1e-9,
    )
    .expect("正方形应可构造")
}

#[test]
fn exported_model_space_summary() {
    let mut project = Project::new();
    let walls = project.layers.add(Layer::new("Walls"));
    let on_walls = Attributes {
        layer: Some(walls),
        ..Attributes::default()
    };
    let path = Path::from_curves(vec![
        GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(2.0, 0.0, 0.0))),
        GeoObject::new(Line::new(Point3::new(2.0, 0.0, 0.0), Point3::new(2.0, 2.0, 0.0))),
    ])
    .expect("路径应可构造");
    if let Some(model) = project.model_mut(0) {
        model.add(
            GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)))
                .with_attributes(on_walls),
        );
        model.add(GeoObject::new(Ellipse::circle(
            &Plane::XY,
            Point3::new(5.0, 5.0, 0.0),
            2.0,
        )));
        model.add(GeoObject::new(path));
    }

    let document = export(&project, &lenient_config());
    assert_eq!(
        summary(&document),
        json!({
            "entities": [
                {
                    "kind": "LINE",
                    "layer": "Walls",
                    "data": { "start": [0.0, 0.0, 0.0], "end": [1.0, 0.0, 0.0] }
                },
                {
                    "kind": "CIRCLE",
                    "layer": "0",
                    "data": { "center": [5.0, 5.0, 0.0], "radius": 2.0 }
                },
                {
                    "kind": "INSERT",
                    "layer": "0",
                    "data": { "block": "AnonymousBlock1", "insert": [0.0, 0.0, 0.0] }
                }
            ]
        })
    );
    assert!(document.layer("Walls").is_some());
}

#[test]
fn shell_exports_one_polyface_per_color() {
    let mut project = Project::new();
    let red = project.colors.add(ColorDef::new("255,0,0", (255, 0, 0)));
    let blue = project.colors.add(ColorDef::new("0,0,255", (0, 0, 255)));
    let shell = Shell::new(vec![
        square(0.0, 0.0).with_color(Some(red)),
        square(1.0, 0.0).with_color(Some(red)),
        square(0.0, 1.0).with_color(Some(blue)),
    ]);
    if let Some(model) = project.model_mut(0) {
        model.add(GeoObject::new(shell));
    }

    let document = export(&project, &lenient_config());
    let meshes: Vec<_> = document
        .model_space()
        .iter()
        .filter_map(|entity| match &entity.kind {
            EntityKind::PolyfaceMesh(mesh) => Some((entity.common.color, mesh)),
            _ => None,
        })
        .collect();
    assert_eq!(meshes.len(), 2);
    assert_eq!(meshes[0].0, Color::Rgb(255, 0, 0));
    assert_eq!(meshes[0].1.faces.len(), 4);
    assert_eq!(meshes[1].0, Color::Rgb(0, 0, 255));
    assert_eq!(meshes[1].1.faces.len(), 2);
}

#[test]
fn attributes_become_table_entries() {
    let mut project = Project::new();
    let dashed = project
        .line_patterns
        .add(LinePattern::new("Dashed", vec![0.5, 0.25]));
    let thick = project.line_widths.add(LineWidth::new("Thick", 0.5));
    let attributes = Attributes {
        line_pattern: Some(dashed),
        line_width: Some(thick),
        is_visible: false,
        ..Attributes::default()
    };
    if let Some(model) = project.model_mut(0) {
        model.add(
            GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)))
                .with_attributes(attributes),
        );
    }

    let document = export(&project, &lenient_config());
    let entity = &document.model_space()[0];
    assert_eq!(entity.common.line_type, "Dashed");
    assert_eq!(entity.common.line_weight, LineWeight::Value(50));
    assert!(entity.common.invisible);
    let lengths: Vec<f64> = document
        .line_type("Dashed")
        .expect("应创建线型")
        .segments
        .iter()
        .map(|segment| segment.length)
        .collect();
    assert_eq!(lengths, vec![0.5, -0.25]);
}

#[test]
fn flat_paths_when_blocks_are_disabled() {
    let path = Path::from_curves(vec![
        GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0))),
        GeoObject::new(Line::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0))),
    ])
    .expect("路径应可构造");
    let project = project_with(vec![GeoObject::new(path)]);
    let mut config = ConverterConfig::default();
    config.export.paths_as_blocks = false;

    let document = export(&project, &config);
    assert_eq!(document.model_space().len(), 2);
    assert_eq!(document.blocks().count(), 0);
}

#[test]
fn export_file_writes_through_saver() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let path = dir.path().join("out.json");
    let project = project_with(vec![GeoObject::new(Line::new(
        Point3::ORIGIN,
        Point3::new(0.0, 3.0, 0.0),
    ))]);

    export_file(&JsonStore, &project, &path, &lenient_config()).expect("写出失败");
    let written = JsonStore.load(&path).expect("读取写出的文档失败");
    assert_eq!(written.model_space().len(), 1);
    assert_eq!(written.model_space()[0].type_name(), "LINE");
}
