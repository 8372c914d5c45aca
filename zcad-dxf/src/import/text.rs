//! TEXT 与 MTEXT：控制码替换、字体解析与对齐映射。

use std::path::Path;

use zcad_core::document::{
    self as dxf, AttachmentPoint, TextHorizontalAlignment, TextStyle, TextVerticalAlignment,
};
use zcad_core::geometry::{Plane, Point3, Vector2, Vector3};
use zcad_kernel::{Geometry, LineAlignment, Text, TextAlignment};

use super::ImportSession;

/// 按顺序替换的 AutoCAD 控制码；数字码需先于字母码处理。
const CONTROL_CODES: [(&str, &str); 18] = [
    ("%%153", "Ø"),
    ("%%127", "°"),
    ("%%214", "Ö"),
    ("%%220", "Ü"),
    ("%%228", "ä"),
    ("%%246", "ö"),
    ("%%223", "ß"),
    ("%%u", ""),
    ("%%U", ""),
    ("%%k", ""),
    ("%%K", ""),
    ("%%D", "°"),
    ("%%d", "°"),
    ("%%P", "±"),
    ("%%p", "±"),
    ("%%C", "Ø"),
    ("%%c", "Ø"),
    ("%%%", "%"),
];

/// MTEXT 段落分隔符。
const PARAGRAPH_BREAK: &str = "\\P";

/// 把 AutoCAD 文字控制码替换为对应字符，下划线与删除线开关被移除。
pub fn process_acad_string(value: &str) -> String {
    CONTROL_CODES
        .iter()
        .fold(value.to_string(), |text, (code, replacement)| {
            text.replace(code, replacement)
        })
}

fn has_underline(value: &str) -> bool {
    value.contains("%%u") || value.contains("%%U")
}

fn has_strikeout(value: &str) -> bool {
    value.contains("%%k") || value.contains("%%K")
}

/// SHX 字体取文件名主干，TrueType 字体取样式名。
fn font_name(style: &TextStyle) -> String {
    let file = Path::new(&style.font_file);
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let stem = || {
        file.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&style.font_file)
            .to_string()
    };
    match extension.as_deref() {
        Some("shx") => stem(),
        Some("ttf") if style.name.chars().count() > 1 => style.name.clone(),
        Some("ttf") => stem(),
        _ => style.font_file.clone(),
    }
}

fn line_alignment(horizontal: TextHorizontalAlignment) -> LineAlignment {
    match horizontal {
        TextHorizontalAlignment::Left
        | TextHorizontalAlignment::Aligned
        | TextHorizontalAlignment::Fit => LineAlignment::Left,
        TextHorizontalAlignment::Center | TextHorizontalAlignment::Middle => LineAlignment::Center,
        TextHorizontalAlignment::Right => LineAlignment::Right,
    }
}

fn text_alignment(vertical: TextVerticalAlignment) -> TextAlignment {
    match vertical {
        TextVerticalAlignment::Baseline => TextAlignment::Baseline,
        TextVerticalAlignment::Bottom => TextAlignment::Bottom,
        TextVerticalAlignment::Middle => TextAlignment::Center,
        TextVerticalAlignment::Top => TextAlignment::Top,
    }
}

fn attachment_alignment(attachment: AttachmentPoint) -> (TextAlignment, LineAlignment) {
    use AttachmentPoint::*;
    let vertical = match attachment {
        TopLeft | TopCenter | TopRight => TextAlignment::Top,
        MiddleLeft | MiddleCenter | MiddleRight => TextAlignment::Center,
        BottomLeft | BottomCenter | BottomRight => TextAlignment::Bottom,
    };
    let horizontal = match attachment {
        TopLeft | MiddleLeft | BottomLeft => LineAlignment::Left,
        TopCenter | MiddleCenter | BottomCenter => LineAlignment::Center,
        TopRight | MiddleRight | BottomRight => LineAlignment::Right,
    };
    (vertical, horizontal)
}

/// 构造文字所需的公共参数。
struct TextFrame<'a> {
    value: &'a str,
    insert: Point3,
    height: f64,
    rotation: f64,
    width_factor: f64,
    style: &'a TextStyle,
    normal: Vector3,
}

impl ImportSession<'_> {
    pub(super) fn text(&self, text: &dxf::Text) -> Option<Geometry> {
        let mut result = self.build_text(TextFrame {
            value: &text.value,
            insert: text.insert,
            height: text.height,
            rotation: text.rotation,
            width_factor: text.width_factor,
            style: &text.style,
            normal: text.normal,
        })?;
        result.line_alignment = line_alignment(text.horizontal);
        result.alignment = text_alignment(text.vertical);
        Some(result.into())
    }

    /// 多行文字按单行处理，段落分隔符替换为空格。
    pub(super) fn mtext(&self, mtext: &dxf::MText) -> Option<Geometry> {
        let value = mtext.value.replace(PARAGRAPH_BREAK, " ");
        let mut result = self.build_text(TextFrame {
            value: &value,
            insert: mtext.insert,
            height: mtext.height,
            rotation: mtext.rotation,
            width_factor: 1.0,
            style: &mtext.style,
            normal: mtext.normal,
        })?;
        (result.alignment, result.line_alignment) = attachment_alignment(mtext.attachment);
        Some(result.into())
    }

    fn build_text(&self, frame: TextFrame<'_>) -> Option<Text> {
        let value = process_acad_string(frame.value);
        if value.trim().is_empty() || frame.height < self.eps {
            return None;
        }
        let plane = Plane::ocs(frame.insert, frame.normal)?;
        let direction = Vector2::new(frame.rotation.cos(), frame.rotation.sin());
        let left = Vector2::new(-frame.rotation.sin(), frame.rotation.cos());
        let width_factor = if frame.width_factor > 0.0 {
            frame.width_factor
        } else {
            1.0
        };

        let mut text = Text::new(
            value,
            frame.insert,
            plane.vector_to_global(direction) * (frame.height * width_factor),
            plane.vector_to_global(left) * frame.height,
        );
        text.font = font_name(frame.style);
        text.bold = frame.style.is_bold;
        text.italic = frame.style.is_italic;
        text.underline = has_underline(frame.value);
        text.strikeout = has_strikeout(frame.value);
        Some(text)
    }
}
