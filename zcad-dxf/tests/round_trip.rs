mod common;

use std::f64::consts::TAU;

use common::{layer, lenient_config, round_trip};
use zcad_config::ConverterConfig;
use zcad_core::document::{
    self as dxf, Color, Document, Entity, EntityKind, LineWeight, Transparency,
};
use zcad_core::geometry::{Plane, Point2, Point3, Vector3};
use zcad_dxf::{ExportSession, IoError};
use zcad_kernel::{
    Attributes, Border, ColorDef, CompoundShape, Curve, Ellipse, ExtendedEntityData, GeoObject,
    Geometry, Hatch, HatchStyle, Line, LinePattern, Project, Text, UserData, UserValue, XValue,
};

fn ellipse_of(object: &GeoObject) -> &Ellipse {
    match &object.geometry {
        Geometry::Ellipse(ellipse) => ellipse,
        other => panic!("应为椭圆，实际为 {}", other.kind_name()),
    }
}

#[test]
fn counter_clockwise_arc_round_trips() {
    let center = Point3::new(1.0, 2.0, 0.0);
    let arc = Ellipse::arc(&Plane::XY, center, 5.0, 0.3, 1.2);
    let back = round_trip(GeoObject::new(arc), &lenient_config());
    let back = ellipse_of(&back);
    assert!(back.center().approx_eq(center, 1e-9));
    assert!((back.radius() - 5.0).abs() < 1e-9);
    assert!((back.start_parameter() - 0.3).abs() < 1e-9);
    assert!((back.sweep_parameter() - 1.2).abs() < 1e-9);
}

#[test]
fn clockwise_arc_round_trips_as_same_point_set() {
    let center = Point3::new(-3.0, 0.0, 0.0);
    let arc = Ellipse::arc(&Plane::XY, center, 2.0, 1.0, -0.8);
    let back = round_trip(GeoObject::new(arc.clone()), &lenient_config());
    let back = ellipse_of(&back);
    assert!(back.center().approx_eq(center, 1e-9));
    assert!((back.radius() - 2.0).abs() < 1e-9);
    assert!((back.sweep_parameter() - 0.8).abs() < 1e-9);
    assert!(back.start_point().approx_eq(arc.end_point(), 1e-9));
    assert!(back.end_point().approx_eq(arc.start_point(), 1e-9));
}

#[test]
fn full_circle_stays_a_circle() {
    let circle = Ellipse::circle(&Plane::XY, Point3::new(4.0, 4.0, 1.0), 3.0);
    let back = round_trip(GeoObject::new(circle), &lenient_config());
    let back = ellipse_of(&back);
    assert!(!back.is_arc());
    assert!((back.sweep_parameter() - TAU).abs() < 1e-9);
    assert!((back.radius() - 3.0).abs() < 1e-9);
}

#[test]
fn tilted_arc_keeps_its_plane() {
    let normal = Vector3::new(1.0, 0.0, 1.0);
    let plane = Plane::ocs(Point3::ORIGIN, normal).expect("平面应可构造");
    let arc = Ellipse::arc(&plane, Point3::new(0.0, 5.0, 0.0), 1.5, 0.5, 2.0);
    let back = round_trip(GeoObject::new(arc.clone()), &lenient_config());
    let back = ellipse_of(&back);
    assert!(back.start_point().approx_eq(arc.start_point(), 1e-9));
    assert!(back.end_point().approx_eq(arc.end_point(), 1e-9));
    assert!(back.normal().as_vec3().abs_diff_eq(arc.normal().as_vec3(), 1e-9));
}

#[test]
fn ellipse_round_trips() {
    let ellipse = Ellipse::from_axes(
        Point3::new(1.0, 1.0, 0.0),
        Vector3::new(4.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
        0.5,
        2.0,
    );
    let back = round_trip(GeoObject::new(ellipse), &lenient_config());
    let back = ellipse_of(&back);
    assert!(back.center().approx_eq(Point3::new(1.0, 1.0, 0.0), 1e-9));
    assert!((back.major_axis().x() - 4.0).abs() < 1e-9);
    assert!((back.minor_axis().y() - 2.0).abs() < 1e-9);
    assert!((back.start_parameter() - 0.5).abs() < 1e-9);
    assert!((back.sweep_parameter() - 2.0).abs() < 1e-9);
}

#[test]
fn clockwise_ellipse_keeps_its_direction() {
    let ellipse = Ellipse::from_axes(
        Point3::ORIGIN,
        Vector3::new(4.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
        0.5,
        -1.0,
    );
    let back = round_trip(GeoObject::new(ellipse.clone()), &lenient_config());
    let back = ellipse_of(&back);
    assert!((back.sweep_parameter() - 1.0).abs() < 1e-9);
    assert!(back.normal().z() < 0.0);
    assert!(back.start_point().approx_eq(ellipse.start_point(), 1e-9));
    assert!(back.end_point().approx_eq(ellipse.end_point(), 1e-9));
    assert!(back.point_at(0.5).approx_eq(ellipse.point_at(0.5), 1e-9));
}

#[test]
fn dash_pattern_round_trips() {
    let mut project = Project::new();
    let pattern = vec![0.5, 0.25, 0.0, 0.25];
    let id = project
        .line_patterns
        .add(LinePattern::new("DashDot", pattern.clone()));
    let line = GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(10.0, 0.0, 0.0)))
        .with_attributes(Attributes {
            line_pattern: Some(id),
            ..Attributes::default()
        });
    if let Some(model) = project.model_mut(0) {
        model.add(line);
    }

    let config = lenient_config();
    let document = ExportSession::new(&project, &config)
        .export()
        .expect("导出失败");
    let reimported = common::import(&document);
    let object = &reimported.model(0).expect("应有模型空间").objects()[0];
    let back = object
        .attributes
        .line_pattern
        .and_then(|id| reimported.line_patterns.get(id))
        .expect("应有线型图案");
    assert_eq!(back.name, "DashDot");
    assert_eq!(back.pattern, pattern);
}

fn with_xdata(records: Vec<(i16, XValue)>) -> GeoObject {
    let mut extended = ExtendedEntityData::new("ZCAD");
    for (code, value) in records {
        extended.push(code, value);
    }
    let mut user_data = UserData::default();
    user_data.insert("ZCAD", UserValue::ExtendedData(extended));
    GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0))).with_attributes(
        Attributes {
            user_data,
            ..Attributes::default()
        },
    )
}

#[test]
fn xdata_round_trips_record_codes() {
    let records = vec![
        (1000, XValue::Text("door".to_string())),
        (1002, XValue::Bool(true)),
        (1005, XValue::Handle(0x1F)),
        (1010, XValue::Point(Point3::new(1.0, 2.0, 3.0))),
        (1040, XValue::Real(2.5)),
        (1070, XValue::Int16(-3)),
        (1071, XValue::Int32(70_000)),
        (1002, XValue::Bool(false)),
    ];
    let back = round_trip(with_xdata(records.clone()), &lenient_config());
    let Some(UserValue::ExtendedData(extended)) = back.attributes.user_data.get("ZCAD") else {
        panic!("应有扩展数据");
    };
    assert_eq!(extended.application_name, "ZCAD");
    assert_eq!(extended.data, records);
}

#[test]
fn strict_xdata_rejects_undeclared_codes() {
    let mut project = Project::new();
    if let Some(model) = project.model_mut(0) {
        model.add(with_xdata(vec![(1099, XValue::Int16(1))]));
    }
    let mut config = ConverterConfig::default();
    config.xdata.strict = true;
    let result = ExportSession::new(&project, &config).export();
    assert!(matches!(result, Err(IoError::XData { code: 1099, .. })));

    config.xdata.strict = false;
    let document = ExportSession::new(&project, &config)
        .export()
        .expect("宽松模式应成功");
    assert!(document.model_space()[0].common.xdata.is_empty());
    assert!(document.app_ids().is_empty());
}

#[test]
fn text_flags_and_font_round_trip() {
    let mut text = Text::new(
        "Title",
        Point3::new(2.0, 3.0, 0.0),
        Vector3::new(3.0, 0.0, 0.0),
        Vector3::new(0.0, 2.5, 0.0),
    );
    text.font = "Arial".to_string();
    text.bold = true;
    text.underline = true;
    text.strikeout = true;

    let back = round_trip(GeoObject::new(text), &lenient_config());
    let Geometry::Text(back) = &back.geometry else {
        panic!("应为文字");
    };
    assert_eq!(back.text, "Title");
    assert_eq!(back.font, "Arial");
    assert!(back.bold && !back.italic);
    assert!(back.underline && back.strikeout);
    assert!((back.text_size() - 2.5).abs() < 1e-9);
    assert!((back.width_factor() - 1.2).abs() < 1e-9);
}

#[test]
fn solid_hatch_ring_round_trips() {
    let square = |min: f64, max: f64| {
        let border = Border::new(vec![
            Point2::new(min, min),
            Point2::new(max, min),
            Point2::new(max, max),
            Point2::new(min, max),
        ])
        .expect("边界应可构造");
        CompoundShape::from_border(&border)
    };
    let mut project = Project::new();
    let red = project.colors.add(ColorDef::new("255,0,0", (255, 0, 0)));
    let style = project.hatch_styles.add(HatchStyle::Solid {
        name: "Solid_255,0,0".to_string(),
        color: red,
    });
    let hatch = Hatch::new(
        Plane::XY,
        square(0.0, 10.0).subtract(&square(3.0, 7.0)),
        Some(style),
    );
    if let Some(model) = project.model_mut(0) {
        model.add(GeoObject::new(hatch));
    }

    let config = lenient_config();
    let document = ExportSession::new(&project, &config)
        .export()
        .expect("导出失败");
    let reimported = common::import(&document);
    let object = &reimported.model(0).expect("应有模型空间").objects()[0];
    let Geometry::Hatch(back) = &object.geometry else {
        panic!("应为填充");
    };
    assert!((back.shape.area() - 84.0).abs() < 1e-6);
    let color = object
        .attributes
        .color
        .and_then(|id| reimported.colors.get(id))
        .expect("应有颜色");
    assert_eq!(color.rgb, (255, 0, 0));
}

#[test]
fn by_layer_attributes_stay_by_layer() {
    let mut document = Document::new();
    let mut heavy = layer("Heavy", "Continuous");
    heavy.line_weight = LineWeight::Value(50);
    document.add_layer(heavy);
    document.add_entity(
        Entity::new(EntityKind::Line(dxf::Line::new(
            Point3::ORIGIN,
            Point3::new(4.0, 0.0, 0.0),
        )))
        .with_layer("Heavy"),
    );

    let project = common::import(&document);
    let exported = common::export(&project, &lenient_config());
    let entity = &exported.model_space()[0];
    assert_eq!(entity.common.layer, "Heavy");
    assert_eq!(entity.common.color, Color::ByLayer);
    assert_eq!(entity.common.transparency, Transparency::ByLayer);
    assert_eq!(entity.common.line_weight, LineWeight::ByLayer);
    assert_eq!(
        exported.layer("Heavy").map(|layer| layer.line_weight),
        Some(LineWeight::Value(50))
    );
}
