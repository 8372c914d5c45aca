//! 项目：若干模型加上共享的属性列表。

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeList, ColorDef, HatchStyle, Layer, LinePattern, LineWidth};
use crate::object::GeoObject;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    objects: Vec<GeoObject>,
}

impl Model {
    pub const MODEL_SPACE: &'static str = "*Model_Space";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    pub fn add(&mut self, object: GeoObject) {
        self.objects.push(object);
    }

    pub fn extend(&mut self, objects: impl IntoIterator<Item = GeoObject>) {
        self.objects.extend(objects);
    }

    #[inline]
    pub fn objects(&self) -> &[GeoObject] {
        &self.objects
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    models: Vec<Model>,
    active_model: usize,
    pub layers: AttributeList<Layer>,
    pub colors: AttributeList<ColorDef>,
    pub line_patterns: AttributeList<LinePattern>,
    pub line_widths: AttributeList<LineWidth>,
    pub hatch_styles: AttributeList<HatchStyle>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    /// 含一个名为 `*Model_Space` 的空模型。
    pub fn new() -> Self {
        Self {
            models: vec![Model::new(Model::MODEL_SPACE)],
            active_model: 0,
            layers: AttributeList::new(),
            colors: AttributeList::new(),
            line_patterns: AttributeList::new(),
            line_widths: AttributeList::new(),
            hatch_styles: AttributeList::new(),
        }
    }

    pub fn add_model(&mut self, model: Model) -> usize {
        self.models.push(model);
        self.models.len() - 1
    }

    #[inline]
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    pub fn model_mut(&mut self, index: usize) -> Option<&mut Model> {
        self.models.get_mut(index)
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|model| model.name == name)
    }

    pub fn active_model(&self) -> Option<&Model> {
        self.models.get(self.active_model)
    }

    /// 索引越界时保持原值。
    pub fn set_active_model(&mut self, index: usize) {
        if index < self.models.len() {
            self.active_model = index;
        }
    }

    /// 导出时使用的模型：唯一的模型、名为 `*Model_Space` 的模型或当前模型。
    pub fn model_to_export(&self) -> Option<&Model> {
        if self.models.len() == 1 {
            return self.models.first();
        }
        self.model_by_name(Model::MODEL_SPACE)
            .or_else(|| self.active_model())
    }
}

#[cfg(test)]
mod tests {
    use zcad_core::geometry::Point3;

    use super::*;
    use crate::object::Point;

    #[test]
    fn export_prefers_model_space() {
        let mut project = Project::new();
        let paper = project.add_model(Model::new("Paper"));
        project.set_active_model(paper);
        project
            .model_mut(0)
            .expect("model space")
            .add(GeoObject::new(Point::cross(Point3::ORIGIN)));
        let chosen = project.model_to_export().expect("model");
        assert_eq!(chosen.name, Model::MODEL_SPACE);
        assert_eq!(chosen.len(), 1);
        assert_eq!(project.active_model().map(|m| m.name.as_str()), Some("Paper"));
    }

    #[test]
    fn out_of_range_active_model_is_ignored() {
        let mut project = Project::new();
        project.set_active_model(5);
        assert_eq!(
            project.active_model().map(|m| m.name.as_str()),
            Some(Model::MODEL_SPACE)
        );
    }
}
