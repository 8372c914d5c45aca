pub mod geometry {
    use std::f64::consts::TAU;
    use std::ops::{Add, AddAssign, Mul, Neg, Sub};

    use glam::{DAffine3, DMat3, DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 默认几何容差，对应转换过程中的 `Precision.eps`。
    pub const DEFAULT_EPS: f64 = 1e-6;

    /// 任意轴算法的阈值（1/64）。
    const ARBITRARY_AXIS_LIMIT: f64 = 1.0 / 64.0;

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    impl Add<Vector2> for Point2 {
        type Output = Point2;

        fn add(self, rhs: Vector2) -> Point2 {
            Point2(self.0 + rhs.0)
        }
    }

    impl Sub for Point2 {
        type Output = Vector2;

        fn sub(self, rhs: Point2) -> Vector2 {
            Vector2(self.0 - rhs.0)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        /// 与 x 轴的夹角，范围 (-π, π]。
        #[inline]
        pub fn angle(self) -> f64 {
            self.0.y.atan2(self.0.x)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    impl Mul<f64> for Vector2 {
        type Output = Vector2;

        fn mul(self, rhs: f64) -> Vector2 {
            Vector2(self.0 * rhs)
        }
    }

    /// 三维点。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        pub const ORIGIN: Point3 = Point3(DVec3::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn distance(self, other: Point3) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn lerp(self, other: Point3, t: f64) -> Point3 {
            Point3(self.0.lerp(other.0, t))
        }

        /// 丢弃 z 分量。
        #[inline]
        pub fn to_2d(self) -> Point2 {
            Point2::new(self.0.x, self.0.y)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        pub fn approx_eq(self, other: Point3, eps: f64) -> bool {
            self.distance(other) <= eps
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    impl From<Point2> for Point3 {
        fn from(value: Point2) -> Self {
            Point3::new(value.x(), value.y(), 0.0)
        }
    }

    impl Add<Vector3> for Point3 {
        type Output = Point3;

        fn add(self, rhs: Vector3) -> Point3 {
            Point3(self.0 + rhs.0)
        }
    }

    impl AddAssign<Vector3> for Point3 {
        fn add_assign(&mut self, rhs: Vector3) {
            self.0 += rhs.0;
        }
    }

    impl Sub<Vector3> for Point3 {
        type Output = Point3;

        fn sub(self, rhs: Vector3) -> Point3 {
            Point3(self.0 - rhs.0)
        }
    }

    impl Sub for Point3 {
        type Output = Vector3;

        fn sub(self, rhs: Point3) -> Vector3 {
            Vector3(self.0 - rhs.0)
        }
    }

    /// 三维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        pub const ZERO: Vector3 = Vector3(DVec3::ZERO);
        pub const X: Vector3 = Vector3(DVec3::X);
        pub const Y: Vector3 = Vector3(DVec3::Y);
        pub const Z: Vector3 = Vector3(DVec3::Z);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn dot(self, other: Vector3) -> f64 {
            self.0.dot(other.0)
        }

        #[inline]
        pub fn cross(self, other: Vector3) -> Vector3 {
            Self(self.0.cross(other.0))
        }

        /// 两向量是否平行（含反向）。
        pub fn is_parallel(self, other: Vector3, eps: f64) -> bool {
            match (self.normalize(), other.normalize()) {
                (Some(a), Some(b)) => a.cross(b).length() <= eps,
                _ => false,
            }
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    impl Add for Vector3 {
        type Output = Vector3;

        fn add(self, rhs: Vector3) -> Vector3 {
            Vector3(self.0 + rhs.0)
        }
    }

    impl Sub for Vector3 {
        type Output = Vector3;

        fn sub(self, rhs: Vector3) -> Vector3 {
            Vector3(self.0 - rhs.0)
        }
    }

    impl Mul<f64> for Vector3 {
        type Output = Vector3;

        fn mul(self, rhs: f64) -> Vector3 {
            Vector3(self.0 * rhs)
        }
    }

    impl Neg for Vector3 {
        type Output = Vector3;

        fn neg(self) -> Vector3 {
            Vector3(-self.0)
        }
    }

    /// 将角度规整到 [0, 2π)。
    pub fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        if result >= TAU { 0.0 } else { result }
    }

    /// DXF 任意轴算法：由法向量推导 OCS 的 x、y 轴（未归一化）。
    pub fn arbitrary_axis(normal: Vector3) -> (Vector3, Vector3) {
        let ax = if normal.x().abs() < ARBITRARY_AXIS_LIMIT
            && normal.y().abs() < ARBITRARY_AXIS_LIMIT
        {
            Vector3::Y.cross(normal)
        } else {
            Vector3::Z.cross(normal)
        };
        let ay = normal.cross(ax);
        (ax, ay)
    }

    /// 右手正交平面坐标系：原点与单位 x、y 轴，法向为 x × y。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Plane {
        origin: Point3,
        x_axis: Vector3,
        y_axis: Vector3,
    }

    impl Plane {
        pub const XY: Plane = Plane {
            origin: Point3::ORIGIN,
            x_axis: Vector3::X,
            y_axis: Vector3::Y,
        };

        /// 以任意轴算法构造 OCS 平面。法向为零向量时返回 `None`。
        pub fn ocs(origin: Point3, normal: Vector3) -> Option<Plane> {
            let normal = normal.normalize()?;
            let (ax, ay) = arbitrary_axis(normal);
            Some(Plane {
                origin,
                x_axis: ax.normalize()?,
                y_axis: ay.normalize()?,
            })
        }

        /// 由 x 方向与平面内另一方向构造平面，y 轴被正交化。
        pub fn from_axes(origin: Point3, x_dir: Vector3, in_plane: Vector3) -> Option<Plane> {
            let x_axis = x_dir.normalize()?;
            let normal = x_axis.cross(in_plane).normalize()?;
            let y_axis = normal.cross(x_axis);
            Some(Plane {
                origin,
                x_axis,
                y_axis,
            })
        }

        /// 由 x 方向与法向构造平面。
        pub fn from_x_and_normal(origin: Point3, x_dir: Vector3, normal: Vector3) -> Option<Plane> {
            let normal = normal.normalize()?;
            let x_axis = (x_dir - normal * x_dir.dot(normal)).normalize()?;
            Some(Plane {
                origin,
                x_axis,
                y_axis: normal.cross(x_axis),
            })
        }

        /// 使用 Newell 法拟合点集所在平面，原点取第一个点，轴向由任意轴算法决定。
        /// 点集共线或为空时返回 `None`；平面性需通过 [`Plane::max_distance`] 另行判断。
        pub fn fit_points(points: &[Point3]) -> Option<Plane> {
            let first = *points.first()?;
            let mut normal = DVec3::ZERO;
            for (index, current) in points.iter().enumerate() {
                let next = points[(index + 1) % points.len()];
                let (a, b) = (current.0 - first.0, next.0 - first.0);
                normal.x += (a.y - b.y) * (a.z + b.z);
                normal.y += (a.z - b.z) * (a.x + b.x);
                normal.z += (a.x - b.x) * (a.y + b.y);
            }
            if normal.length_squared() <= f64::EPSILON * f64::EPSILON {
                return None;
            }
            Plane::ocs(first, Vector3(normal))
        }

        #[inline]
        pub fn origin(&self) -> Point3 {
            self.origin
        }

        #[inline]
        pub fn x_axis(&self) -> Vector3 {
            self.x_axis
        }

        #[inline]
        pub fn y_axis(&self) -> Vector3 {
            self.y_axis
        }

        #[inline]
        pub fn normal(&self) -> Vector3 {
            self.x_axis.cross(self.y_axis)
        }

        pub fn with_origin(&self, origin: Point3) -> Plane {
            Plane { origin, ..*self }
        }

        /// 投影到平面局部坐标。
        pub fn to_local(&self, point: Point3) -> Point2 {
            let offset = point - self.origin;
            Point2::new(offset.dot(self.x_axis), offset.dot(self.y_axis))
        }

        pub fn to_global(&self, point: Point2) -> Point3 {
            self.origin + self.x_axis * point.x() + self.y_axis * point.y()
        }

        pub fn vector_to_global(&self, vector: Vector2) -> Vector3 {
            self.x_axis * vector.x() + self.y_axis * vector.y()
        }

        pub fn vector_to_local(&self, vector: Vector3) -> Vector2 {
            Vector2::new(vector.dot(self.x_axis), vector.dot(self.y_axis))
        }

        /// 点到平面的有符号距离。
        pub fn distance(&self, point: Point3) -> f64 {
            (point - self.origin).dot(self.normal())
        }

        pub fn max_distance(&self, points: &[Point3]) -> f64 {
            points
                .iter()
                .map(|point| self.distance(*point).abs())
                .fold(0.0, f64::max)
        }

        /// 应用仿射变换后重新正交化。退化时返回 `None`。
        pub fn transformed(&self, transform: &Transform) -> Option<Plane> {
            let origin = transform.apply_point(self.origin);
            let x_dir = transform.apply_vector(self.x_axis);
            let y_dir = transform.apply_vector(self.y_axis);
            Plane::from_axes(origin, x_dir, y_dir)
        }
    }

    /// 三维仿射变换，封装 `glam::DAffine3`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Transform(pub DAffine3);

    impl Transform {
        pub const IDENTITY: Transform = Transform(DAffine3::IDENTITY);

        pub fn translation(offset: Vector3) -> Self {
            Self(DAffine3::from_translation(offset.0))
        }

        pub fn rotation_z(angle: f64) -> Self {
            Self(DAffine3::from_rotation_z(angle))
        }

        pub fn scale(x: f64, y: f64, z: f64) -> Self {
            Self(DAffine3::from_scale(DVec3::new(x, y, z)))
        }

        /// 由平面局部坐标到世界坐标的变换。
        pub fn from_plane(plane: &Plane) -> Self {
            let matrix = DMat3::from_cols(
                plane.x_axis().0,
                plane.y_axis().0,
                plane.normal().0,
            );
            Self(DAffine3::from_mat3_translation(matrix, plane.origin().0))
        }

        /// 先应用 `self`，再应用 `other`。
        pub fn then(self, other: Transform) -> Transform {
            Transform(other.0 * self.0)
        }

        pub fn apply_point(&self, point: Point3) -> Point3 {
            Point3(self.0.transform_point3(point.0))
        }

        pub fn apply_vector(&self, vector: Vector3) -> Vector3 {
            Vector3(self.0.transform_vector3(vector.0))
        }

        /// 行列式小于零表示镜像。
        pub fn determinant(&self) -> f64 {
            self.0.matrix3.determinant()
        }
    }

    impl Mul for Transform {
        type Output = Transform;

        fn mul(self, rhs: Transform) -> Transform {
            Transform(self.0 * rhs.0)
        }
    }

    /// 轴对齐包围盒，用于判定对象尺寸是否退化。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds3D {
        min: Point3,
        max: Point3,
    }

    impl Bounds3D {
        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
                max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(*point);
            }
            bounds
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y() || self.min.z() > self.max.z()
        }

        pub fn include_point(&mut self, point: Point3) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            self.min = Point3(self.min.0.min(point.0));
            self.max = Point3(self.max.0.max(point.0));
        }

        /// 对角线长度，空包围盒为 0。
        pub fn size(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.min.distance(self.max)
            }
        }
    }
}

pub mod document {
    use std::collections::{BTreeMap, HashMap};
    use std::fmt;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, Point3, Vector2, Vector3};

    /// DXF 对象句柄。0 表示尚未分配。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
    pub struct Handle(u64);

    impl Handle {
        pub const NULL: Handle = Handle(0);

        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }

        #[inline]
        pub fn is_null(self) -> bool {
            self.0 == 0
        }
    }

    impl fmt::Display for Handle {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:X}", self.0)
        }
    }

    /// 实体颜色：随层、随块、ACI 索引或真彩色。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub enum Color {
        #[default]
        ByLayer,
        ByBlock,
        Index(u8),
        Rgb(u8, u8, u8),
    }

    impl Color {
        pub const WHITE: Color = Color::Index(7);

        /// 解析为 RGB；随层/随块颜色无法独立解析。
        pub fn rgb(self) -> Option<(u8, u8, u8)> {
            match self {
                Color::ByLayer | Color::ByBlock => None,
                Color::Index(index) => Some(aci_to_rgb(index)),
                Color::Rgb(r, g, b) => Some((r, g, b)),
            }
        }
    }

    /// AutoCAD 颜色索引到 RGB 的标准映射。
    pub fn aci_to_rgb(index: u8) -> (u8, u8, u8) {
        match index {
            0 => (0, 0, 0),
            1 => (255, 0, 0),
            2 => (255, 255, 0),
            3 => (0, 255, 0),
            4 => (0, 255, 255),
            5 => (0, 0, 255),
            6 => (255, 0, 255),
            7 => (255, 255, 255),
            8 => (128, 128, 128),
            9 => (192, 192, 192),
            10..=249 => {
                let hue = f64::from(index / 10 - 1) * 15.0;
                let offset = index % 10;
                let value = match offset / 2 {
                    0 => 1.0,
                    1 => 0.8,
                    2 => 0.6,
                    3 => 0.5,
                    _ => 0.3,
                };
                let saturation = if offset % 2 == 0 { 1.0 } else { 0.5 };
                hsv_to_rgb(hue, saturation, value)
            }
            250 => (51, 51, 51),
            251 => (80, 80, 80),
            252 => (105, 105, 105),
            253 => (130, 130, 130),
            254 => (190, 190, 190),
            255 => (255, 255, 255),
        }
    }

    fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> (u8, u8, u8) {
        let c = value * saturation;
        let h = hue / 60.0;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = value - c;
        let to_byte = |channel: f64| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        (to_byte(r), to_byte(g), to_byte(b))
    }

    /// 透明度，数值为 0–90 的百分比。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum Transparency {
        #[default]
        ByLayer,
        ByBlock,
        Value(u8),
    }

    /// 线宽，数值以 0.01 mm 为单位。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum LineWeight {
        #[default]
        ByLayer,
        ByBlock,
        Default,
        Value(i16),
    }

    impl LineWeight {
        /// DXF 允许的离散线宽取值。
        pub const STANDARD: [i16; 24] = [
            0, 5, 9, 13, 15, 18, 20, 25, 30, 35, 40, 50, 53, 60, 70, 80, 90, 100, 106, 120, 140,
            158, 200, 211,
        ];

        /// 按最小绝对误差吸附到最近的标准线宽，输入单位为毫米。
        pub fn nearest(width_mm: f64) -> LineWeight {
            let target = width_mm * 100.0;
            let mut best = Self::STANDARD[0];
            let mut best_error = f64::MAX;
            for candidate in Self::STANDARD {
                let error = (f64::from(candidate) - target).abs();
                if error < best_error {
                    best_error = error;
                    best = candidate;
                }
            }
            LineWeight::Value(best)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub color: Color,
        pub line_type: String,
        pub line_weight: LineWeight,
        pub is_visible: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color: Color::WHITE,
                line_type: LineType::CONTINUOUS.to_string(),
                line_weight: LineWeight::Default,
                is_visible: true,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LineTypeSegment {
        /// 正值为实线段，负值为空白，0 为点。
        pub length: f64,
        pub is_shape: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LineType {
        pub name: String,
        pub description: String,
        pub segments: Vec<LineTypeSegment>,
    }

    impl LineType {
        pub const CONTINUOUS: &'static str = "Continuous";
        pub const BY_LAYER: &'static str = "ByLayer";
        pub const BY_BLOCK: &'static str = "ByBlock";

        pub fn new(name: impl Into<String>, lengths: impl IntoIterator<Item = f64>) -> Self {
            Self {
                name: name.into(),
                description: String::new(),
                segments: lengths
                    .into_iter()
                    .map(|length| LineTypeSegment {
                        length,
                        is_shape: false,
                    })
                    .collect(),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct TextStyle {
        pub name: String,
        pub font_file: String,
        pub is_bold: bool,
        pub is_italic: bool,
    }

    impl Default for TextStyle {
        fn default() -> Self {
            Self {
                name: "Standard".to_string(),
                font_file: "txt.shx".to_string(),
                is_bold: false,
                is_italic: false,
            }
        }
    }

    /// 扩展数据记录，按 DXF 组码区分类型。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum XDataRecord {
        String(String),
        /// `true` 表示 `{`，`false` 表示 `}`。
        ControlString(bool),
        LayerName(String),
        BinaryData(Vec<u8>),
        Handle(Handle),
        Coordinate(Point3),
        WorldCoordinate(Point3),
        WorldDisplacement(Vector3),
        WorldDirection(Vector3),
        Real(f64),
        Distance(f64),
        ScaleFactor(f64),
        Integer16(i16),
        Integer32(i32),
    }

    impl XDataRecord {
        pub fn code(&self) -> i16 {
            match self {
                XDataRecord::String(_) => 1000,
                XDataRecord::ControlString(_) => 1002,
                XDataRecord::LayerName(_) => 1003,
                XDataRecord::BinaryData(_) => 1004,
                XDataRecord::Handle(_) => 1005,
                XDataRecord::Coordinate(_) => 1010,
                XDataRecord::WorldCoordinate(_) => 1011,
                XDataRecord::WorldDisplacement(_) => 1012,
                XDataRecord::WorldDirection(_) => 1013,
                XDataRecord::Real(_) => 1040,
                XDataRecord::Distance(_) => 1041,
                XDataRecord::ScaleFactor(_) => 1042,
                XDataRecord::Integer16(_) => 1070,
                XDataRecord::Integer32(_) => 1071,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct XData {
        pub app_id: String,
        pub records: Vec<XDataRecord>,
    }

    /// 所有实体共享的属性。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EntityCommon {
        pub handle: Handle,
        pub owner: Option<Handle>,
        pub layer: String,
        pub color: Color,
        pub transparency: Transparency,
        pub line_type: String,
        pub line_weight: LineWeight,
        pub invisible: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub xdata: Vec<XData>,
    }

    impl Default for EntityCommon {
        fn default() -> Self {
            Self {
                handle: Handle::NULL,
                owner: None,
                layer: "0".to_string(),
                color: Color::ByLayer,
                transparency: Transparency::ByLayer,
                line_type: LineType::BY_LAYER.to_string(),
                line_weight: LineWeight::ByLayer,
                invisible: false,
                xdata: Vec::new(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Entity {
        pub common: EntityCommon,
        pub kind: EntityKind,
    }

    impl Entity {
        pub fn new(kind: EntityKind) -> Self {
            Self {
                common: EntityCommon::default(),
                kind,
            }
        }

        pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
            self.common.layer = layer.into();
            self
        }

        pub fn with_color(mut self, color: Color) -> Self {
            self.common.color = color;
            self
        }

        pub fn with_handle(mut self, handle: Handle) -> Self {
            self.common.handle = handle;
            self
        }

        #[inline]
        pub fn handle(&self) -> Handle {
            self.common.handle
        }

        #[inline]
        pub fn layer_name(&self) -> &str {
            &self.common.layer
        }

        /// DXF 实体类型名，用于诊断输出。
        pub fn type_name(&self) -> &str {
            match &self.kind {
                EntityKind::Line(_) => "LINE",
                EntityKind::Ray(_) => "RAY",
                EntityKind::Arc(_) => "ARC",
                EntityKind::Circle(_) => "CIRCLE",
                EntityKind::Ellipse(_) => "ELLIPSE",
                EntityKind::Spline(_) => "SPLINE",
                EntityKind::Face3D(_) => "3DFACE",
                EntityKind::PolyfaceMesh(_) => "POLYFACE",
                EntityKind::Mesh(_) => "MESH",
                EntityKind::Hatch(_) => "HATCH",
                EntityKind::Solid(_) => "SOLID",
                EntityKind::Insert(_) => "INSERT",
                EntityKind::MLine(_) => "MLINE",
                EntityKind::Text(_) => "TEXT",
                EntityKind::MText(_) => "MTEXT",
                EntityKind::Dimension(_) => "DIMENSION",
                EntityKind::Leader(_) => "LEADER",
                EntityKind::Point(_) => "POINT",
                EntityKind::Polyline(_) => "POLYLINE",
                EntityKind::Unknown { type_name } => type_name,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum EntityKind {
        Line(Line),
        Ray(Ray),
        Arc(Arc),
        Circle(Circle),
        Ellipse(Ellipse),
        Spline(Spline),
        Face3D(Face3D),
        PolyfaceMesh(PolyfaceMesh),
        Mesh(Mesh),
        Hatch(Hatch),
        Solid(Solid),
        Insert(Insert),
        MLine(MLine),
        Text(Text),
        MText(MText),
        Dimension(Dimension),
        Leader(Leader),
        Point(PointEntity),
        Polyline(Polyline),
        /// 解析器识别但没有对应结构的实体。
        Unknown { type_name: String },
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point3,
        pub end: Point3,
        pub normal: Vector3,
        pub thickness: f64,
    }

    impl Line {
        pub fn new(start: Point3, end: Point3) -> Self {
            Self {
                start,
                end,
                normal: Vector3::Z,
                thickness: 0.0,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Ray {
        pub start: Point3,
        pub direction: Vector3,
    }

    /// 圆弧实体：圆心为世界坐标，角度以弧度计、在 OCS 内逆时针度量。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point3,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub normal: Vector3,
        pub thickness: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point3,
        pub radius: f64,
        pub normal: Vector3,
        pub thickness: f64,
    }

    /// 椭圆实体，主轴为世界坐标向量，参数为弧度形式的参数角。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point3,
        pub major_axis: Vector3,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub normal: Vector3,
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SplineFlags {
        pub closed: bool,
        pub periodic: bool,
        pub rational: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: usize,
        pub flags: SplineFlags,
        pub control_points: Vec<Point3>,
        pub weights: Vec<f64>,
        pub knots: Vec<f64>,
        pub fit_points: Vec<Point3>,
        pub normal: Vector3,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Face3D {
        pub corners: [Point3; 4],
    }

    /// 多面网格：顶点与 1 基索引面，索引符号表示边可见性，0 表示缺省。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolyfaceMesh {
        pub vertices: Vec<Point3>,
        pub faces: Vec<[i16; 4]>,
    }

    /// MESH 实体：0 基多边形索引。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Mesh {
        pub vertices: Vec<Point3>,
        pub faces: Vec<Vec<usize>>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HatchPatternLine {
        pub angle: f64,
        pub base_point: Point2,
        pub offset: Vector2,
        pub dash_lengths: Vec<f64>,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct HatchPattern {
        pub name: String,
        pub lines: Vec<HatchPatternLine>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    /// 填充边界的边，坐标位于填充的 OCS 中。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum HatchEdge {
        Line {
            start: Point2,
            end: Point2,
        },
        Arc {
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            counter_clockwise: bool,
        },
        Ellipse {
            center: Point2,
            major_axis: Vector2,
            minor_ratio: f64,
            start_angle: f64,
            end_angle: f64,
            counter_clockwise: bool,
        },
        Spline {
            degree: usize,
            control_points: Vec<Point2>,
            weights: Vec<f64>,
            knots: Vec<f64>,
            periodic: bool,
        },
        Polyline {
            vertices: Vec<PolylineVertex>,
            is_closed: bool,
        },
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct BoundaryPath {
        pub is_external: bool,
        pub edges: Vec<HatchEdge>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Hatch {
        pub elevation: f64,
        pub normal: Vector3,
        pub is_solid: bool,
        pub pattern: HatchPattern,
        pub paths: Vec<BoundaryPath>,
    }

    /// SOLID 实体，四个角点按 DXF 约定的 1-2-4-3 顺序围成四边形。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Solid {
        pub corners: [Point3; 4],
        pub normal: Vector3,
        pub thickness: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Insert {
        pub block: Handle,
        pub insert_point: Point3,
        pub scale: Vector3,
        pub rotation: f64,
        pub normal: Vector3,
    }

    impl Insert {
        pub fn new(block: Handle, insert_point: Point3) -> Self {
            Self {
                block,
                insert_point,
                scale: Vector3::new(1.0, 1.0, 1.0),
                rotation: 0.0,
                normal: Vector3::Z,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MLineVertex {
        pub position: Point3,
        pub direction: Vector3,
        pub miter: Vector3,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MLine {
        pub vertices: Vec<MLineVertex>,
        /// 样式中各元素相对中心线的偏移。
        pub element_offsets: Vec<f64>,
        pub is_closed: bool,
        pub normal: Vector3,
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub enum TextHorizontalAlignment {
        #[default]
        Left,
        Center,
        Right,
        Aligned,
        Middle,
        Fit,
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub enum TextVerticalAlignment {
        #[default]
        Baseline,
        Bottom,
        Middle,
        Top,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub value: String,
        pub insert: Point3,
        pub height: f64,
        pub rotation: f64,
        pub width_factor: f64,
        pub style: TextStyle,
        pub horizontal: TextHorizontalAlignment,
        pub vertical: TextVerticalAlignment,
        pub normal: Vector3,
    }

    /// MTEXT 附着点，1–9 依次为左上至右下。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AttachmentPoint {
        #[default]
        TopLeft,
        TopCenter,
        TopRight,
        MiddleLeft,
        MiddleCenter,
        MiddleRight,
        BottomLeft,
        BottomCenter,
        BottomRight,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MText {
        pub value: String,
        pub insert: Point3,
        pub height: f64,
        pub rotation: f64,
        pub style: TextStyle,
        pub attachment: AttachmentPoint,
        pub normal: Vector3,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Dimension {
        pub block: Option<Handle>,
        pub definition_point: Point3,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Leader {
        pub vertices: Vec<Point3>,
        pub annotation: Option<Handle>,
        pub normal: Vector3,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PointEntity {
        pub location: Point3,
    }

    /// 多段线。二维多段线的顶点位于 OCS（含标高），三维多段线顶点为世界坐标。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        /// 三维多段线的 z 值，与 `vertices` 一一对应。
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub z_values: Vec<f64>,
        pub is_closed: bool,
        pub is_3d: bool,
        pub elevation: f64,
        pub normal: Vector3,
    }

    impl Polyline {
        pub fn from_points_3d(points: &[Point3], is_closed: bool) -> Self {
            Self {
                vertices: points
                    .iter()
                    .map(|point| PolylineVertex::new(point.to_2d()))
                    .collect(),
                z_values: points.iter().map(|point| point.z()).collect(),
                is_closed,
                is_3d: true,
                elevation: 0.0,
                normal: Vector3::Z,
            }
        }

        /// 三维多段线返回世界坐标顶点；二维多段线返回 OCS 坐标（含标高）。
        pub fn points(&self) -> Vec<Point3> {
            self.vertices
                .iter()
                .enumerate()
                .map(|(index, vertex)| {
                    let z = if self.is_3d {
                        self.z_values.get(index).copied().unwrap_or(0.0)
                    } else {
                        self.elevation
                    };
                    Point3::new(vertex.position.x(), vertex.position.y(), z)
                })
                .collect()
        }

        pub fn has_bulges(&self) -> bool {
            self.vertices.iter().any(|vertex| vertex.bulge.abs() > f64::EPSILON)
        }
    }

    /// 块定义记录。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockRecord {
        pub handle: Handle,
        pub name: String,
        pub base_point: Point3,
        pub entities: Vec<Entity>,
    }

    /// 已解析的 DXF 文档。由外部读取器填充，或由导出会话生成后交给写出器。
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct Document {
        layers: BTreeMap<String, Layer>,
        line_types: BTreeMap<String, LineType>,
        text_styles: Vec<TextStyle>,
        app_ids: Vec<String>,
        blocks: BTreeMap<Handle, BlockRecord>,
        model_space: Vec<Entity>,
        paper_space: Vec<Entity>,
        next_handle: u64,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self {
                next_handle: 1,
                ..Self::default()
            };
            doc.ensure_layer("0");
            doc.add_line_type(LineType::new(LineType::CONTINUOUS, []));
            doc
        }

        pub fn allocate_handle(&mut self) -> Handle {
            self.next_handle = self.next_handle.max(1);
            let handle = Handle(self.next_handle);
            self.next_handle += 1;
            handle
        }

        fn reserve_handle(&mut self, handle: Handle) {
            if handle.get() >= self.next_handle {
                self.next_handle = handle.get() + 1;
            }
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) -> &mut Layer {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key))
        }

        pub fn add_layer(&mut self, layer: Layer) {
            self.layers.insert(layer.name.clone(), layer);
        }

        #[inline]
        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.get(name)
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        pub fn add_line_type(&mut self, line_type: LineType) {
            self.line_types.insert(line_type.name.clone(), line_type);
        }

        #[inline]
        pub fn line_type(&self, name: &str) -> Option<&LineType> {
            self.line_types.get(name)
        }

        #[inline]
        pub fn line_types(&self) -> impl Iterator<Item = &LineType> {
            self.line_types.values()
        }

        pub fn add_text_style(&mut self, style: TextStyle) {
            if !self.text_styles.iter().any(|existing| existing.name == style.name) {
                self.text_styles.push(style);
            }
        }

        #[inline]
        pub fn text_styles(&self) -> &[TextStyle] {
            &self.text_styles
        }

        pub fn ensure_app_id(&mut self, name: &str) {
            if !self.app_ids.iter().any(|existing| existing == name) {
                self.app_ids.push(name.to_string());
            }
        }

        #[inline]
        pub fn app_ids(&self) -> &[String] {
            &self.app_ids
        }

        /// 登记块定义，块内实体的 owner 指向该块，返回块句柄。
        pub fn add_block(
            &mut self,
            name: impl Into<String>,
            base_point: Point3,
            entities: Vec<Entity>,
        ) -> Handle {
            let handle = self.allocate_handle();
            let entities = entities
                .into_iter()
                .map(|mut entity| {
                    self.prepare_entity(&mut entity);
                    entity.common.owner = Some(handle);
                    entity
                })
                .collect();
            self.blocks.insert(
                handle,
                BlockRecord {
                    handle,
                    name: name.into(),
                    base_point,
                    entities,
                },
            );
            handle
        }

        #[inline]
        pub fn block(&self, handle: Handle) -> Option<&BlockRecord> {
            self.blocks.get(&handle)
        }

        pub fn block_by_name(&self, name: &str) -> Option<&BlockRecord> {
            self.blocks.values().find(|block| block.name == name)
        }

        #[inline]
        pub fn blocks(&self) -> impl Iterator<Item = &BlockRecord> {
            self.blocks.values()
        }

        /// 添加模型空间实体；未分配句柄时自动分配。
        pub fn add_entity(&mut self, mut entity: Entity) -> Handle {
            self.prepare_entity(&mut entity);
            let handle = entity.common.handle;
            self.model_space.push(entity);
            handle
        }

        pub fn add_paper_entity(&mut self, mut entity: Entity) -> Handle {
            self.prepare_entity(&mut entity);
            let handle = entity.common.handle;
            self.paper_space.push(entity);
            handle
        }

        fn prepare_entity(&mut self, entity: &mut Entity) {
            if entity.common.handle.is_null() {
                entity.common.handle = self.allocate_handle();
            } else {
                self.reserve_handle(entity.common.handle);
            }
            self.ensure_layer(&entity.common.layer);
        }

        #[inline]
        pub fn model_space(&self) -> &[Entity] {
            &self.model_space
        }

        #[inline]
        pub fn paper_space(&self) -> &[Entity] {
            &self.paper_space
        }

        /// 在模型空间与所有块中按句柄查找实体。
        pub fn entity(&self, handle: Handle) -> Option<&Entity> {
            self.model_space
                .iter()
                .chain(self.paper_space.iter())
                .chain(self.blocks.values().flat_map(|block| block.entities.iter()))
                .find(|entity| entity.common.handle == handle)
        }

        /// 查找引用指定块的所有 INSERT 实体。
        pub fn inserts_of(&self, block: Handle) -> impl Iterator<Item = &Entity> {
            self.model_space
                .iter()
                .chain(self.paper_space.iter())
                .chain(self.blocks.values().flat_map(|record| record.entities.iter()))
                .filter(move |entity| {
                    matches!(&entity.kind, EntityKind::Insert(insert) if insert.block == block)
                })
        }

        /// 统计各类实体数量，便于日志输出。
        pub fn entity_counts(&self) -> HashMap<String, usize> {
            let mut counts = HashMap::new();
            for entity in &self.model_space {
                *counts.entry(entity.type_name().to_string()).or_insert(0) += 1;
            }
            counts
        }
    }
}
