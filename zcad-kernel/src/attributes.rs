//! 属性列表：图层、颜色、线型、线宽与填充样式。
//!
//! 列表以名称为键，返回稳定的类型化 id；同名资源只创建一次。

use serde::{Deserialize, Serialize};

macro_rules! attribute_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }
    };
}

attribute_id!(
    /// 图层 id。
    LayerId
);
attribute_id!(ColorId);
attribute_id!(LinePatternId);
attribute_id!(LineWidthId);
attribute_id!(HatchStyleId);

/// 可放入 [`AttributeList`] 的资源。
pub trait Attribute {
    type Id: Copy + From<usize>;

    fn name(&self) -> &str;
    fn index_of(id: Self::Id) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    /// 随层对象使用的线宽。
    #[serde(default)]
    pub line_width: Option<LineWidthId>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line_width: None,
        }
    }

    pub fn with_line_width(mut self, line_width: Option<LineWidthId>) -> Self {
        self.line_width = line_width;
        self
    }
}

/// 颜色来源：对象自身、命名颜色、随父对象（随块）或随样式（随层）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorSource {
    #[default]
    FromObject,
    FromName,
    FromParent,
    FromStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorDef {
    pub name: String,
    pub rgb: (u8, u8, u8),
    pub alpha: u8,
    pub source: ColorSource,
}

impl ColorDef {
    pub fn new(name: impl Into<String>, rgb: (u8, u8, u8)) -> Self {
        Self {
            name: name.into(),
            rgb,
            alpha: 255,
            source: ColorSource::FromObject,
        }
    }

    pub fn with_source(mut self, source: ColorSource) -> Self {
        self.source = source;
        self
    }

    /// 颜色名称采用 `R,G,B` 形式。
    pub fn rgb_name(rgb: (u8, u8, u8)) -> String {
        format!("{},{},{}", rgb.0, rgb.1, rgb.2)
    }
}

/// 线型图案：依次为实线、空白长度，首段总是实线。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePattern {
    pub name: String,
    pub pattern: Vec<f64>,
}

impl LinePattern {
    pub fn new(name: impl Into<String>, pattern: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            pattern,
        }
    }

    pub fn matches(&self, pattern: &[f64], eps: f64) -> bool {
        self.pattern.len() == pattern.len()
            && self
                .pattern
                .iter()
                .zip(pattern)
                .all(|(a, b)| (a - b).abs() <= eps)
    }
}

/// 线宽，单位毫米。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineWidth {
    pub name: String,
    pub width: f64,
}

impl LineWidth {
    pub fn new(name: impl Into<String>, width: f64) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HatchStyle {
    Solid {
        name: String,
        color: ColorId,
    },
    Lines {
        name: String,
        color: ColorId,
        /// 线方向，弧度。
        angle: f64,
        distance: f64,
        line_pattern: Option<LinePatternId>,
    },
}

impl HatchStyle {
    pub fn color(&self) -> ColorId {
        match self {
            HatchStyle::Solid { color, .. } | HatchStyle::Lines { color, .. } => *color,
        }
    }
}

macro_rules! impl_attribute {
    ($ty:ty, $id:ty, |$item:ident| $name:expr) => {
        impl Attribute for $ty {
            type Id = $id;

            fn name(&self) -> &str {
                let $item = self;
                $name
            }

            fn index_of(id: $id) -> usize {
                id.index()
            }
        }
    };
}

impl_attribute!(Layer, LayerId, |item| &item.name);
impl_attribute!(ColorDef, ColorId, |item| &item.name);
impl_attribute!(LinePattern, LinePatternId, |item| &item.name);
impl_attribute!(LineWidth, LineWidthId, |item| &item.name);
impl_attribute!(HatchStyle, HatchStyleId, |item| match item {
    HatchStyle::Solid { name, .. } | HatchStyle::Lines { name, .. } => name,
});

/// 有序属性列表。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeList<T> {
    items: Vec<T>,
}

impl<T> Default for AttributeList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Attribute> AttributeList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<T::Id> {
        self.items
            .iter()
            .position(|item| item.name() == name)
            .map(T::Id::from)
    }

    pub fn find_by(&self, predicate: impl Fn(&T) -> bool) -> Option<T::Id> {
        self.items.iter().position(predicate).map(T::Id::from)
    }

    pub fn add(&mut self, item: T) -> T::Id {
        self.items.push(item);
        T::Id::from(self.items.len() - 1)
    }

    /// 同名资源存在时返回已有 id，否则创建。
    pub fn create_or_find(&mut self, name: &str, create: impl FnOnce() -> T) -> T::Id {
        match self.find(name) {
            Some(id) => id,
            None => self.add(create()),
        }
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.get(T::index_of(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (T::Id, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (T::Id::from(index), item))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 生成列表中未使用的名称：`prefix`、`prefix_1`、`prefix_2`……
    pub fn new_name(&self, prefix: &str) -> String {
        if self.find(prefix).is_none() {
            return prefix.to_string();
        }
        (1..)
            .map(|counter| format!("{prefix}_{counter}"))
            .find(|candidate| self.find(candidate).is_none())
            .unwrap_or_else(|| prefix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_or_find_reuses_existing_entries() {
        let mut layers = AttributeList::<Layer>::new();
        let first = layers.create_or_find("WALLS", || Layer::new("WALLS"));
        let second = layers.create_or_find("WALLS", || Layer::new("WALLS"));
        let other = layers.create_or_find("DOORS", || Layer::new("DOORS"));
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(layers.len(), 2);
        assert_eq!(layers.get(other).map(|layer| layer.name.as_str()), Some("DOORS"));
    }

    #[test]
    fn new_name_appends_counter() {
        let mut patterns = AttributeList::<LinePattern>::new();
        assert_eq!(patterns.new_name("DXFpattern"), "DXFpattern");
        patterns.add(LinePattern::new("DXFpattern", vec![1.0, 1.0]));
        patterns.add(LinePattern::new("DXFpattern_1", vec![2.0, 1.0]));
        assert_eq!(patterns.new_name("DXFpattern"), "DXFpattern_2");
    }

    #[test]
    fn hatch_style_name_is_used_as_key() {
        let mut styles = AttributeList::<HatchStyle>::new();
        let id = styles.add(HatchStyle::Solid {
            name: "Solid 1".to_string(),
            color: ColorId::from(0),
        });
        assert_eq!(styles.find("Solid 1"), Some(id));
        assert_eq!(styles.get(id).map(HatchStyle::color), Some(ColorId::from(0)));
    }
}
