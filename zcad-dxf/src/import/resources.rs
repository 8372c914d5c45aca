//! 图层、颜色、线型、线宽与填充样式的查找或创建。

use std::collections::HashMap;

use tracing::debug;
use zcad_core::document::{Color, Entity, LineType, LineWeight};
use zcad_kernel::{
    Attributes, ColorDef, ColorId, ColorSource, HatchStyle, HatchStyleId, Layer, LayerId,
    LinePattern, LinePatternId, LineWidth, LineWidthId,
};

use super::ImportSession;

const BLACK: (u8, u8, u8) = (0, 0, 0);
const WHITE: (u8, u8, u8) = (255, 255, 255);
const BY_BLOCK_COLOR: &str = "ByBlock";
const HATCH_PATTERN_PREFIX: &str = "DXFpattern";

/// 会话内的资源缓存。
#[derive(Debug, Default)]
pub(super) struct ResourceCache {
    layers: HashMap<String, (LayerId, ColorId)>,
    line_patterns: HashMap<String, Option<LinePatternId>>,
    solid_styles: HashMap<ColorId, HatchStyleId>,
    line_styles: Vec<(LineStyleKey, HatchStyleId)>,
}

#[derive(Debug, Clone, Copy)]
struct LineStyleKey {
    color: ColorId,
    angle: f64,
    distance: f64,
    pattern: Option<LinePatternId>,
}

impl LineStyleKey {
    fn matches(&self, other: &LineStyleKey, eps: f64) -> bool {
        self.color == other.color
            && self.pattern == other.pattern
            && (self.angle - other.angle).abs() <= eps
            && (self.distance - other.distance).abs() <= eps
    }
}

/// 白色在白底上不可见，改用黑色。
fn visible_rgb(rgb: (u8, u8, u8)) -> (u8, u8, u8) {
    if rgb == WHITE { BLACK } else { rgb }
}

/// DXF 线型段（正为实线、负为空白、0 为点）规整为以实线开头、实线与空白交替的长度序列。
pub(crate) fn normalize_dashes(lengths: &[f64]) -> Vec<f64> {
    let is_gap = |length: &f64| length.is_sign_negative();
    let leading = lengths.iter().take_while(|length| is_gap(length)).count();
    if leading == lengths.len() {
        return Vec::new();
    }
    let mut ordered = lengths.to_vec();
    ordered.rotate_left(leading);

    let mut pattern: Vec<f64> = Vec::with_capacity(ordered.len() + 1);
    for length in ordered {
        let expects_stroke = pattern.len() % 2 == 0;
        if is_gap(&length) == expects_stroke {
            pattern.push(0.0);
        }
        pattern.push(length.abs());
    }
    if pattern.len() % 2 == 1 {
        pattern.push(0.0);
    }
    pattern
}

impl ImportSession<'_> {
    /// 预先登记文档中的图层与线型，保证资源顺序与文档一致。
    pub(super) fn register_tables(&mut self) {
        let document = self.document;
        for layer in document.layers() {
            self.layer_entry(&layer.name);
        }
        for line_type in document.line_types() {
            self.line_pattern_for(&line_type.name);
        }
    }

    pub(super) fn attributes(&mut self, entity: &Entity) -> Attributes {
        let common = &entity.common;
        let (layer, _) = self.layer_entry(&common.layer);
        Attributes {
            layer: Some(layer),
            color: Some(self.color_id(common.color, &common.layer)),
            line_pattern: self.entity_line_pattern(&common.line_type, &common.layer),
            line_width: Some(self.line_width_id(entity)),
            is_visible: !common.invisible,
            ..Attributes::default()
        }
    }

    /// 图层及其随层颜色 `"<layer>:ByLayer"`。
    fn layer_entry(&mut self, name: &str) -> (LayerId, ColorId) {
        if let Some(entry) = self.resources.layers.get(name) {
            return *entry;
        }
        let document = self.document;
        let source = document.layer(name);
        let width = self.width_for(source.map(|layer| layer.line_weight));
        let layer = self
            .project
            .layers
            .create_or_find(name, || Layer::new(name).with_line_width(Some(width)));
        let rgb = source.and_then(|layer| layer.color.rgb()).unwrap_or(WHITE);
        let color_name = format!("{name}:ByLayer");
        let color = self.project.colors.create_or_find(&color_name, || {
            ColorDef::new(color_name.clone(), visible_rgb(rgb)).with_source(ColorSource::FromStyle)
        });
        self.resources.layers.insert(name.to_string(), (layer, color));
        (layer, color)
    }

    pub(super) fn color_id(&mut self, color: Color, layer: &str) -> ColorId {
        match color {
            Color::ByLayer => self.layer_entry(layer).1,
            Color::ByBlock => self.project.colors.create_or_find(BY_BLOCK_COLOR, || {
                ColorDef::new(BY_BLOCK_COLOR, BLACK).with_source(ColorSource::FromParent)
            }),
            other => {
                let rgb = visible_rgb(other.rgb().unwrap_or(BLACK));
                let name = ColorDef::rgb_name(rgb);
                self.project
                    .colors
                    .create_or_find(&name, || ColorDef::new(name.clone(), rgb))
            }
        }
    }

    fn entity_line_pattern(&mut self, line_type: &str, layer: &str) -> Option<LinePatternId> {
        if line_type.eq_ignore_ascii_case(LineType::BY_BLOCK) {
            return None;
        }
        if !line_type.eq_ignore_ascii_case(LineType::BY_LAYER) {
            return self.line_pattern_for(line_type);
        }
        let document = self.document;
        let layer_type = document.layer(layer)?.line_type.as_str();
        if layer_type.eq_ignore_ascii_case(LineType::BY_LAYER)
            || layer_type.eq_ignore_ascii_case(LineType::BY_BLOCK)
        {
            return None;
        }
        self.line_pattern_for(layer_type)
    }

    /// 连续线型没有图案，返回 `None`。
    fn line_pattern_for(&mut self, name: &str) -> Option<LinePatternId> {
        if let Some(cached) = self.resources.line_patterns.get(name) {
            return *cached;
        }
        let lengths: Vec<f64> = match self.document.line_type(name) {
            Some(line_type) => line_type
                .segments
                .iter()
                .filter(|segment| !segment.is_shape)
                .map(|segment| segment.length)
                .collect(),
            None => {
                debug!(line_type = name, "文档中没有该线型，按连续线处理");
                Vec::new()
            }
        };
        let pattern = normalize_dashes(&lengths);
        let id = (!pattern.is_empty()).then(|| {
            self.project
                .line_patterns
                .create_or_find(name, || LinePattern::new(name, pattern))
        });
        self.resources.line_patterns.insert(name.to_string(), id);
        id
    }

    fn line_width_id(&mut self, entity: &Entity) -> LineWidthId {
        let document = self.document;
        let weight = match entity.common.line_weight {
            LineWeight::ByLayer => document
                .layer(&entity.common.layer)
                .map(|layer| layer.line_weight),
            LineWeight::ByBlock => entity
                .common
                .owner
                .and_then(|owner| document.inserts_of(owner).next())
                .and_then(|insert| document.layer(insert.layer_name()))
                .map(|layer| layer.line_weight),
            other => Some(other),
        };
        self.width_for(weight)
    }

    /// 线宽登记为 `"DXF_<值>"`；非具体数值与负值都记为 0。
    fn width_for(&mut self, weight: Option<LineWeight>) -> LineWidthId {
        let value = match weight {
            Some(LineWeight::Value(value)) => value.max(0),
            _ => 0,
        };
        let name = format!("DXF_{value}");
        self.project.line_widths.create_or_find(&name, || {
            LineWidth::new(name.clone(), f64::from(value) / 100.0)
        })
    }

    /// 实心填充样式，按颜色缓存。
    pub(super) fn solid_style(&mut self, color: ColorId) -> HatchStyleId {
        if let Some(style) = self.resources.solid_styles.get(&color) {
            return *style;
        }
        let color_name = self
            .project
            .colors
            .get(color)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| color.index().to_string());
        let name = format!("Solid_{color_name}");
        let style = self
            .project
            .hatch_styles
            .create_or_find(&name, || HatchStyle::Solid {
                name: name.clone(),
                color,
            });
        self.resources.solid_styles.insert(color, style);
        style
    }

    /// 平行线填充样式，按（颜色、角度、间距、虚线）缓存。
    pub(super) fn line_style(
        &mut self,
        color: ColorId,
        angle: f64,
        distance: f64,
        dashes: &[f64],
    ) -> HatchStyleId {
        let key = LineStyleKey {
            color,
            angle,
            distance,
            pattern: self.dash_pattern(dashes),
        };
        if let Some((_, style)) = self
            .resources
            .line_styles
            .iter()
            .find(|(cached, _)| cached.matches(&key, self.eps))
        {
            return *style;
        }
        let name = self.project.hatch_styles.new_name("Lines");
        let style = self.project.hatch_styles.add(HatchStyle::Lines {
            name,
            color,
            angle,
            distance,
            line_pattern: key.pattern,
        });
        self.resources.line_styles.push((key, style));
        style
    }

    fn dash_pattern(&mut self, dashes: &[f64]) -> Option<LinePatternId> {
        let pattern = normalize_dashes(dashes);
        if pattern.is_empty() {
            return None;
        }
        let eps = self.eps;
        if let Some(existing) = self
            .project
            .line_patterns
            .find_by(|candidate| candidate.matches(&pattern, eps))
        {
            return Some(existing);
        }
        let name = self.project.line_patterns.new_name(HATCH_PATTERN_PREFIX);
        Some(self.project.line_patterns.add(LinePattern::new(name, pattern)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_gap_moves_to_the_end() {
        assert_eq!(normalize_dashes(&[-0.25, 0.5]), vec![0.5, 0.25]);
    }

    #[test]
    fn dots_and_adjacent_strokes_keep_alternation() {
        assert_eq!(
            normalize_dashes(&[0.5, -0.25, 0.0, -0.25]),
            vec![0.5, 0.25, 0.0, 0.25]
        );
        assert_eq!(normalize_dashes(&[0.5, 0.5]), vec![0.5, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn odd_pattern_is_padded_and_gaps_only_is_continuous() {
        assert_eq!(normalize_dashes(&[1.0]), vec![1.0, 0.0]);
        assert!(normalize_dashes(&[-1.0, -2.0]).is_empty());
        assert!(normalize_dashes(&[]).is_empty());
    }
}
