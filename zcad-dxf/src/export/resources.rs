//! 图层、颜色、线型与线宽写回 DXF 表。

use zcad_core::document::{Color, LineType, LineWeight, Transparency};
use zcad_kernel::{ColorDef, ColorId, ColorSource, LayerId, LinePatternId, LineWidthId};

use super::{DEFAULT_LAYER, ExportSession};

const WHITE: (u8, u8, u8) = (255, 255, 255);
const BLACK: (u8, u8, u8) = (0, 0, 0);
/// 黑白两色都写为 ACI 7，由显示端按背景取反。
const ACI_FOREGROUND: Color = Color::Index(7);

pub(super) fn dxf_color(def: &ColorDef) -> (Color, Transparency) {
    let color = match def.source {
        ColorSource::FromParent => Color::ByBlock,
        ColorSource::FromStyle => Color::ByLayer,
        ColorSource::FromObject | ColorSource::FromName if def.rgb == WHITE || def.rgb == BLACK => {
            ACI_FOREGROUND
        }
        ColorSource::FromObject | ColorSource::FromName => {
            Color::Rgb(def.rgb.0, def.rgb.1, def.rgb.2)
        }
    };
    let transparency = match def.source {
        ColorSource::FromParent => Transparency::ByBlock,
        ColorSource::FromStyle => Transparency::ByLayer,
        ColorSource::FromObject | ColorSource::FromName => {
            let percent = 90.0 - f64::from(def.alpha) / 255.0 * 90.0;
            Transparency::Value(percent.round().clamp(0.0, 90.0) as u8)
        }
    };
    (color, transparency)
}

/// 内核图案 `[实线, 空白, ...]` 转为 DXF 段长：实线为正、空白为负。
pub(crate) fn signed_segments(pattern: &[f64]) -> Vec<f64> {
    pattern
        .iter()
        .enumerate()
        .map(|(index, length)| {
            if index % 2 == 0 {
                length.abs()
            } else {
                -length.abs()
            }
        })
        .collect()
}

impl ExportSession<'_> {
    /// 图层名；文档中没有时创建，图层颜色取 `"<layer>:ByLayer"`。
    pub(super) fn layer(&mut self, id: LayerId) -> String {
        let project = self.project;
        let Some(layer) = project.layers.get(id) else {
            return DEFAULT_LAYER.to_string();
        };
        if self.created_layers.insert(layer.name.clone()) {
            let weight = layer.line_width.and_then(|width| self.line_weight(width));
            let color = project
                .colors
                .find(&format!("{}:ByLayer", layer.name))
                .and_then(|id| project.colors.get(id))
                .map(|def| match def.rgb {
                    WHITE | BLACK => ACI_FOREGROUND,
                    (r, g, b) => Color::Rgb(r, g, b),
                });
            let entry = self.document.ensure_layer(&layer.name);
            if let Some(color) = color {
                entry.color = color;
            }
            if let Some(weight) = weight {
                entry.line_weight = weight;
            }
        }
        layer.name.clone()
    }

    pub(super) fn color(&self, id: ColorId) -> Option<(Color, Transparency)> {
        self.project.colors.get(id).map(dxf_color)
    }

    /// 每个线型图案只建一次线型。
    pub(super) fn line_type(&mut self, id: LinePatternId) -> Option<String> {
        if let Some(name) = self.line_types.get(&id) {
            return Some(name.clone());
        }
        let project = self.project;
        let pattern = project.line_patterns.get(id)?;
        if self.document.line_type(&pattern.name).is_none() {
            self.document
                .add_line_type(LineType::new(pattern.name.clone(), signed_segments(&pattern.pattern)));
        }
        self.line_types.insert(id, pattern.name.clone());
        Some(pattern.name.clone())
    }

    /// 与所在图层线宽相同时写为随层。
    pub(super) fn entity_line_weight(
        &self,
        id: LineWidthId,
        layer: Option<LayerId>,
    ) -> Option<LineWeight> {
        let layer_width = layer
            .and_then(|layer| self.project.layers.get(layer))
            .and_then(|layer| layer.line_width);
        if layer_width == Some(id) {
            return Some(LineWeight::ByLayer);
        }
        self.line_weight(id)
    }

    pub(super) fn line_weight(&self, id: LineWidthId) -> Option<LineWeight> {
        self.project
            .line_widths
            .get(id)
            .map(|width| LineWeight::nearest(width.width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_sources_map_to_dxf_colors() {
        let by_layer = ColorDef::new("0:ByLayer", (0, 0, 0)).with_source(ColorSource::FromStyle);
        assert_eq!(dxf_color(&by_layer).0, Color::ByLayer);
        let by_block = ColorDef::new("ByBlock", (0, 0, 0)).with_source(ColorSource::FromParent);
        assert_eq!(dxf_color(&by_block).0, Color::ByBlock);
        assert_eq!(dxf_color(&ColorDef::new("black", BLACK)).0, Color::Index(7));
        assert_eq!(dxf_color(&ColorDef::new("white", WHITE)).0, Color::Index(7));
        assert_eq!(
            dxf_color(&ColorDef::new("teal", (0, 128, 128))).0,
            Color::Rgb(0, 128, 128)
        );
    }

    #[test]
    fn inherited_colors_inherit_transparency() {
        let by_layer = ColorDef::new("0:ByLayer", (0, 0, 0)).with_source(ColorSource::FromStyle);
        assert_eq!(dxf_color(&by_layer).1, Transparency::ByLayer);
        let by_block = ColorDef::new("ByBlock", (0, 0, 0)).with_source(ColorSource::FromParent);
        assert_eq!(dxf_color(&by_block).1, Transparency::ByBlock);
    }

    #[test]
    fn width_of_the_layer_is_written_by_layer() {
        use zcad_config::ConverterConfig;
        use zcad_kernel::{Layer, LineWidth, Project};

        let mut project = Project::new();
        let thick = project.line_widths.add(LineWidth::new("DXF_50", 0.5));
        let thin = project.line_widths.add(LineWidth::new("DXF_13", 0.13));
        let walls = project
            .layers
            .add(Layer::new("Walls").with_line_width(Some(thick)));
        let config = ConverterConfig::default();
        let mut session = ExportSession::new(&project, &config);

        assert_eq!(session.layer(walls), "Walls");
        assert_eq!(
            session.document.layer("Walls").map(|layer| layer.line_weight),
            Some(LineWeight::Value(50))
        );
        assert_eq!(session.entity_line_weight(thick, Some(walls)), Some(LineWeight::ByLayer));
        assert_eq!(session.entity_line_weight(thin, Some(walls)), Some(LineWeight::Value(13)));
        assert_eq!(session.entity_line_weight(thick, None), Some(LineWeight::Value(50)));
    }

    #[test]
    fn alpha_maps_to_transparency_percent() {
        let opaque = ColorDef::new("red", (255, 0, 0));
        assert_eq!(dxf_color(&opaque).1, Transparency::Value(0));
        let clear = ColorDef {
            alpha: 0,
            ..opaque
        };
        assert_eq!(dxf_color(&clear).1, Transparency::Value(90));
    }

    #[test]
    fn segments_alternate_signs() {
        assert_eq!(signed_segments(&[0.5, 0.25, 0.0, 0.25]), vec![0.5, -0.25, 0.0, -0.25]);
    }

    #[test]
    fn line_weight_snaps_to_nearest_standard_value() {
        assert_eq!(LineWeight::nearest(0.26), LineWeight::Value(25));
        assert_eq!(LineWeight::nearest(0.0), LineWeight::Value(0));
        assert_eq!(LineWeight::nearest(3.0), LineWeight::Value(211));
    }
}
