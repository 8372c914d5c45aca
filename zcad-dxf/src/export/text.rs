//! 文字导出：控制码前缀、样式与对齐。

use zcad_core::document::{
    self as dxf, EntityKind, TextHorizontalAlignment, TextStyle, TextVerticalAlignment,
};
use zcad_core::geometry::{Plane, Point3, Vector3, normalize_angle};
use zcad_kernel::{LineAlignment, Text, TextAlignment};

use super::ExportSession;

const UNDERLINE: &str = "%%U";
const STRIKEOUT: &str = "%%K";

fn horizontal(alignment: LineAlignment) -> TextHorizontalAlignment {
    match alignment {
        LineAlignment::Left => TextHorizontalAlignment::Left,
        LineAlignment::Center => TextHorizontalAlignment::Center,
        LineAlignment::Right => TextHorizontalAlignment::Right,
        LineAlignment::Justify => TextHorizontalAlignment::Aligned,
    }
}

fn vertical(alignment: TextAlignment) -> TextVerticalAlignment {
    match alignment {
        TextAlignment::Baseline => TextVerticalAlignment::Baseline,
        TextAlignment::Bottom => TextVerticalAlignment::Bottom,
        TextAlignment::Center => TextVerticalAlignment::Middle,
        TextAlignment::Top => TextVerticalAlignment::Top,
    }
}

impl ExportSession<'_> {
    /// 按字体与粗斜体查找或创建文字样式。
    fn text_style(&mut self, text: &Text) -> TextStyle {
        let mut name = text.font.clone();
        if text.bold {
            name.push_str(" Bold");
        }
        if text.italic {
            name.push_str(" Italic");
        }
        let style = TextStyle {
            name,
            font_file: text.font.clone(),
            is_bold: text.bold,
            is_italic: text.italic,
        };
        self.document.add_text_style(style.clone());
        style
    }

    pub(super) fn text(&mut self, text: &Text) -> EntityKind {
        let mut value = String::with_capacity(text.text.len() + 6);
        if text.strikeout {
            value.push_str(STRIKEOUT);
        }
        if text.underline {
            value.push_str(UNDERLINE);
        }
        value.push_str(&text.text);

        let normal = text.plane().map_or(Vector3::Z, |plane| plane.normal());
        let ocs = Plane::ocs(Point3::ORIGIN, normal).unwrap_or(Plane::XY);
        let rotation = normalize_angle(ocs.vector_to_local(text.line_direction).angle());

        EntityKind::Text(dxf::Text {
            value,
            insert: text.location,
            height: text.text_size(),
            rotation,
            width_factor: text.width_factor(),
            style: self.text_style(text),
            horizontal: horizontal(text.line_alignment),
            vertical: vertical(text.alignment),
            normal,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use zcad_config::ConverterConfig;
    use zcad_kernel::Project;

    use super::*;

    fn upright(value: &str) -> Text {
        Text::new(
            value,
            Point3::new(3.0, 4.0, 0.0),
            Vector3::new(0.0, 1.6, 0.0),
            Vector3::new(-2.0, 0.0, 0.0),
        )
    }

    #[test]
    fn text_carries_rotation_size_and_flags() {
        let project = Project::new();
        let config = ConverterConfig::default();
        let mut session = ExportSession::new(&project, &config);
        let mut source = upright("Note");
        source.underline = true;
        source.strikeout = true;
        source.line_alignment = LineAlignment::Justify;
        source.alignment = TextAlignment::Center;

        let EntityKind::Text(text) = session.text(&source) else {
            panic!("应为文字");
        };
        assert_eq!(text.value, "%%K%%UNote");
        assert!((text.rotation - FRAC_PI_2).abs() < 1e-9);
        assert!((text.height - 2.0).abs() < 1e-9);
        assert!((text.width_factor - 0.8).abs() < 1e-9);
        assert_eq!(text.horizontal, TextHorizontalAlignment::Aligned);
        assert_eq!(text.vertical, TextVerticalAlignment::Middle);
        assert!((text.normal.z() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn styles_are_shared_by_font_and_flags() {
        let project = Project::new();
        let config = ConverterConfig::default();
        let mut session = ExportSession::new(&project, &config);
        let mut bold = upright("A");
        bold.bold = true;
        session.text(&bold);
        session.text(&bold);
        session.text(&upright("B"));

        let names: Vec<&str> = session
            .document
            .text_styles()
            .iter()
            .map(|style| style.name.as_str())
            .collect();
        assert!(names.contains(&"Arial Bold"));
        assert!(names.contains(&"Arial"));
        assert_eq!(names.iter().filter(|name| **name == "Arial Bold").count(), 1);
    }
}
