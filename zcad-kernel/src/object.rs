//! 内核几何对象：属性加上一种几何体。

use serde::{Deserialize, Serialize};
use zcad_core::geometry::{Plane, Point3, Transform, Vector3};

use crate::attributes::{ColorId, HatchStyleId, LayerId, LinePatternId, LineWidthId};
use crate::bspline::BSpline;
use crate::curve::{Curve, Ellipse, Line, Path, Polyline};
use crate::face::{Face, Shell, Solid};
use crate::shape::CompoundShape;
use crate::userdata::UserData;

/// 对象引用的项目资源与用户数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub layer: Option<LayerId>,
    pub color: Option<ColorId>,
    pub line_pattern: Option<LinePatternId>,
    pub line_width: Option<LineWidthId>,
    pub is_visible: bool,
    pub user_data: UserData,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            layer: None,
            color: None,
            line_pattern: None,
            line_width: None,
            is_visible: true,
            user_data: UserData::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point),
    Line(Line),
    Ellipse(Ellipse),
    Polyline(Polyline),
    BSpline(BSpline),
    Path(Path),
    Text(Text),
    Block(Block),
    Face(Face),
    Shell(Shell),
    Solid(Solid),
    Hatch(Hatch),
}

impl Geometry {
    pub fn as_curve(&self) -> Option<&dyn Curve> {
        match self {
            Geometry::Line(line) => Some(line),
            Geometry::Ellipse(ellipse) => Some(ellipse),
            Geometry::Polyline(polyline) => Some(polyline),
            Geometry::BSpline(spline) => Some(spline),
            Geometry::Path(path) => Some(path),
            Geometry::Point(_)
            | Geometry::Text(_)
            | Geometry::Block(_)
            | Geometry::Face(_)
            | Geometry::Shell(_)
            | Geometry::Solid(_)
            | Geometry::Hatch(_) => None,
        }
    }

    /// 反转曲线方向，非曲线不变。
    pub fn reverse_curve(&mut self) {
        match self {
            Geometry::Line(line) => line.reverse(),
            Geometry::Ellipse(ellipse) => ellipse.reverse(),
            Geometry::Polyline(polyline) => polyline.reverse(),
            Geometry::BSpline(spline) => spline.reverse(),
            Geometry::Path(path) => path.reverse(),
            _ => {}
        }
    }

    pub fn transform(&mut self, transform: &Transform) {
        match self {
            Geometry::Point(point) => point.location = transform.apply_point(point.location),
            Geometry::Line(line) => line.transform(transform),
            Geometry::Ellipse(ellipse) => ellipse.transform(transform),
            Geometry::Polyline(polyline) => polyline.transform(transform),
            Geometry::BSpline(spline) => spline.transform(transform),
            Geometry::Path(path) => path.transform(transform),
            Geometry::Text(text) => text.transform(transform),
            Geometry::Block(block) => block.transform(transform),
            Geometry::Face(face) => face.transform(transform),
            Geometry::Shell(shell) => shell.transform(transform),
            Geometry::Solid(solid) => solid.transform(transform),
            Geometry::Hatch(hatch) => hatch.transform(transform),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Line(_) => "Line",
            Geometry::Ellipse(_) => "Ellipse",
            Geometry::Polyline(_) => "Polyline",
            Geometry::BSpline(_) => "BSpline",
            Geometry::Path(_) => "Path",
            Geometry::Text(_) => "Text",
            Geometry::Block(_) => "Block",
            Geometry::Face(_) => "Face",
            Geometry::Shell(_) => "Shell",
            Geometry::Solid(_) => "Solid",
            Geometry::Hatch(_) => "Hatch",
        }
    }
}

macro_rules! impl_from_geometry {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Geometry {
                fn from(value: $variant) -> Self {
                    Geometry::$variant(value)
                }
            }
        )*
    };
}

impl_from_geometry!(
    Point, Line, Ellipse, Polyline, BSpline, Path, Text, Block, Face, Shell, Solid, Hatch,
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoObject {
    pub attributes: Attributes,
    pub geometry: Geometry,
}

impl GeoObject {
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self {
            attributes: Attributes::default(),
            geometry: geometry.into(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[inline]
    pub fn as_curve(&self) -> Option<&dyn Curve> {
        self.geometry.as_curve()
    }

    #[inline]
    pub fn transform(&mut self, transform: &Transform) {
        self.geometry.transform(transform);
    }

    #[inline]
    pub fn kind_name(&self) -> &'static str {
        self.geometry.kind_name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointSymbol {
    #[default]
    Dot,
    Cross,
    Plus,
    Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub location: Point3,
    pub symbol: PointSymbol,
}

impl Point {
    pub fn new(location: Point3, symbol: PointSymbol) -> Self {
        Self { location, symbol }
    }

    pub fn cross(location: Point3) -> Self {
        Self::new(location, PointSymbol::Cross)
    }
}

/// 文字竖直方向的对齐基准。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlignment {
    #[default]
    Baseline,
    Bottom,
    Center,
    Top,
}

/// 文字水平方向的对齐方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// 单行文字。`line_direction` 长度为字宽，`glyph_direction` 长度为字高。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    pub location: Point3,
    pub line_direction: Vector3,
    pub glyph_direction: Vector3,
    pub font: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
    pub alignment: TextAlignment,
    pub line_alignment: LineAlignment,
}

impl Text {
    pub fn new(
        text: impl Into<String>,
        location: Point3,
        line_direction: Vector3,
        glyph_direction: Vector3,
    ) -> Self {
        Self {
            text: text.into(),
            location,
            line_direction,
            glyph_direction,
            font: "Arial".to_string(),
            bold: false,
            italic: false,
            underline: false,
            strikeout: false,
            alignment: TextAlignment::Baseline,
            line_alignment: LineAlignment::Left,
        }
    }

    #[inline]
    pub fn text_size(&self) -> f64 {
        self.glyph_direction.length()
    }

    /// 宽度系数：字宽与字高之比。
    pub fn width_factor(&self) -> f64 {
        let size = self.text_size();
        if size > 0.0 {
            self.line_direction.length() / size
        } else {
            1.0
        }
    }

    /// 文字所在平面，x 轴沿行方向。
    pub fn plane(&self) -> Option<Plane> {
        Plane::from_axes(self.location, self.line_direction, self.glyph_direction)
    }

    pub fn transform(&mut self, transform: &Transform) {
        self.location = transform.apply_point(self.location);
        self.line_direction = transform.apply_vector(self.line_direction);
        self.glyph_direction = transform.apply_vector(self.glyph_direction);
    }
}

/// 命名的对象组，`ref_point` 为插入基点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub ref_point: Point3,
    children: Vec<GeoObject>,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ref_point: Point3::ORIGIN,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<GeoObject>) -> Self {
        self.children = children;
        self
    }

    pub fn add(&mut self, child: GeoObject) {
        self.children.push(child);
    }

    #[inline]
    pub fn children(&self) -> &[GeoObject] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut [GeoObject] {
        &mut self.children
    }

    pub fn into_children(self) -> Vec<GeoObject> {
        self.children
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn transform(&mut self, transform: &Transform) {
        self.ref_point = transform.apply_point(self.ref_point);
        for child in &mut self.children {
            child.transform(transform);
        }
    }
}

/// 填充：平面局部坐标中的复合形状加填充样式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hatch {
    pub plane: Plane,
    pub shape: CompoundShape,
    pub style: Option<HatchStyleId>,
}

impl Hatch {
    pub fn new(plane: Plane, shape: CompoundShape, style: Option<HatchStyleId>) -> Self {
        Self {
            plane,
            shape,
            style,
        }
    }

    pub fn transform(&mut self, transform: &Transform) {
        let Some(plane) = self.plane.transformed(transform) else {
            return;
        };
        let old = self.plane;
        self.shape = self
            .shape
            .map_points(|p| plane.to_local(transform.apply_point(old.to_global(p))));
        self.plane = plane;
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use zcad_core::geometry::Point2;

    use super::*;
    use crate::shape::Border;

    #[test]
    fn block_transform_reaches_children() {
        let mut block = Block::new("B").with_children(vec![GeoObject::new(Line::new(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ))]);
        block.transform(&Transform::rotation_z(FRAC_PI_2));
        let Geometry::Line(line) = &block.children()[0].geometry else {
            panic!("expected line");
        };
        assert!(line.start.distance(Point3::new(0.0, 1.0, 0.0)) < 1e-12);
    }

    #[test]
    fn only_curves_expose_curve_capability() {
        let line = GeoObject::new(Line::new(Point3::ORIGIN, Point3::new(3.0, 4.0, 0.0)));
        let point = GeoObject::new(Point::cross(Point3::ORIGIN));
        assert_eq!(line.as_curve().map(|curve| curve.length()), Some(5.0));
        assert!(point.as_curve().is_none());
        assert_eq!(point.kind_name(), "Point");
        assert!(line.attributes.is_visible);
    }

    #[test]
    fn hatch_transform_keeps_area() {
        let border = Border::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .expect("border");
        let mut hatch = Hatch::new(Plane::XY, CompoundShape::from_border(&border), None);
        hatch.transform(&Transform::translation(Vector3::new(5.0, 5.0, 1.0)));
        assert!((hatch.plane.origin().z() - 1.0).abs() < 1e-12);
        assert!((hatch.shape.area() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn text_reports_size_and_width_factor() {
        let text = Text::new(
            "abc",
            Point3::ORIGIN,
            Vector3::new(1.5, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
        );
        assert!((text.text_size() - 2.0).abs() < 1e-12);
        assert!((text.width_factor() - 0.75).abs() < 1e-12);
    }
}
