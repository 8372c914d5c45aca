//! 用户数据写回扩展数据。

use tracing::warn;
use zcad_core::document::{Handle, XData, XDataRecord};
use zcad_core::geometry::Point3;
use zcad_kernel::{ExtendedEntityData, UserData, UserValue, XValue};

use super::ExportSession;
use crate::errors::IoError;
use crate::import::HANDLE_KEY;

fn real(value: &XValue) -> Option<f64> {
    match value {
        XValue::Real(value) => Some(*value),
        XValue::Int16(value) => Some(f64::from(*value)),
        XValue::Int32(value) => Some(f64::from(*value)),
        _ => None,
    }
}

/// 按坐标轴拆开的组码（1010/1020/1030 等）返回基础组码与轴序号。
fn axis_code(code: i16) -> Option<(i16, usize)> {
    match code {
        1010..=1013 => Some((code, 0)),
        1020..=1023 => Some((code - 10, 1)),
        1030..=1033 => Some((code - 20, 2)),
        _ => None,
    }
}

fn point_record(base: i16, point: Point3) -> XDataRecord {
    match base {
        1010 => XDataRecord::Coordinate(point),
        1011 => XDataRecord::WorldCoordinate(point),
        1012 => XDataRecord::WorldDisplacement(point - Point3::ORIGIN),
        _ => XDataRecord::WorldDirection(point - Point3::ORIGIN),
    }
}

/// 按声明的组码转换单条记录，类型不符返回 `None`。
fn record(code: i16, value: &XValue) -> Option<XDataRecord> {
    Some(match (code, value) {
        (1000, XValue::Text(text)) => XDataRecord::String(text.clone()),
        (1002, XValue::Bool(open)) => XDataRecord::ControlString(*open),
        (1002, XValue::Text(text)) if text == "{" => XDataRecord::ControlString(true),
        (1002, XValue::Text(text)) if text == "}" => XDataRecord::ControlString(false),
        (1003, XValue::Text(text)) => XDataRecord::LayerName(text.clone()),
        (1004, XValue::Bytes(bytes)) => XDataRecord::BinaryData(bytes.clone()),
        (1005, XValue::Handle(handle)) => XDataRecord::Handle(Handle::new(*handle)),
        (1005, XValue::Text(text)) => {
            XDataRecord::Handle(Handle::new(u64::from_str_radix(text, 16).ok()?))
        }
        (1010..=1013, XValue::Point(point)) => point_record(code, *point),
        (1040, value) => XDataRecord::Real(real(value)?),
        (1041, value) => XDataRecord::Distance(real(value)?),
        (1042, value) => XDataRecord::ScaleFactor(real(value)?),
        (1070, XValue::Int16(value)) => XDataRecord::Integer16(*value),
        (1071, XValue::Int32(value)) => XDataRecord::Integer32(*value),
        (1071, XValue::Int16(value)) => XDataRecord::Integer32(i32::from(*value)),
        _ => return None,
    })
}

fn single(app_id: &str, record: XDataRecord) -> XData {
    XData {
        app_id: app_id.to_string(),
        records: vec![record],
    }
}

impl ExportSession<'_> {
    /// 除导入句柄外的所有用户数据；每个应用程序名登记到文档。
    pub(super) fn xdata(&mut self, user_data: &UserData) -> Result<Vec<XData>, IoError> {
        let mut result = Vec::new();
        for (key, value) in user_data.iter() {
            if key == HANDLE_KEY {
                continue;
            }
            let xdata = match value {
                UserValue::ExtendedData(extended) => XData {
                    app_id: extended.application_name.clone(),
                    records: self.records(extended)?,
                },
                UserValue::Text(text) => single(key, XDataRecord::String(text.clone())),
                UserValue::Int16(value) => single(key, XDataRecord::Integer16(*value)),
                UserValue::Int32(value) => single(key, XDataRecord::Integer32(*value)),
                UserValue::Real(value) => single(key, XDataRecord::Real(*value)),
                UserValue::Bytes(bytes) => single(key, XDataRecord::BinaryData(bytes.clone())),
            };
            if xdata.app_id.is_empty() || xdata.records.is_empty() {
                continue;
            }
            self.document.ensure_app_id(&xdata.app_id);
            result.push(xdata);
        }
        Ok(result)
    }

    /// 分轴写出的坐标会合并成一个点记录。
    fn records(&self, extended: &ExtendedEntityData) -> Result<Vec<XDataRecord>, IoError> {
        let mut records = Vec::with_capacity(extended.data.len());
        let mut pending: Option<(i16, [f64; 3])> = None;

        for (code, value) in &extended.data {
            let code = *code;
            if let (Some((base, axis)), Some(coordinate)) = (axis_code(code), real(value)) {
                match &mut pending {
                    Some((open, coords)) if *open == base && axis > 0 => coords[axis] = coordinate,
                    _ => {
                        if let Some((open, [x, y, z])) = pending.take() {
                            records.push(point_record(open, Point3::new(x, y, z)));
                        }
                        let mut coords = [0.0; 3];
                        coords[axis] = coordinate;
                        pending = Some((base, coords));
                    }
                }
                continue;
            }
            if let Some((open, [x, y, z])) = pending.take() {
                records.push(point_record(open, Point3::new(x, y, z)));
            }
            match record(code, value) {
                Some(record) => records.push(record),
                None if self.config.xdata.strict => {
                    return Err(IoError::XData {
                        code,
                        message: format!(
                            "value {value:?} of application {} does not match the group code",
                            extended.application_name
                        ),
                    });
                }
                None => warn!(
                    app = %extended.application_name,
                    code,
                    value = ?value,
                    "扩展数据记录类型与组码不符，已跳过"
                ),
            }
        }
        if let Some((open, [x, y, z])) = pending {
            records.push(point_record(open, Point3::new(x, y, z)));
        }
        Ok(records)
    }
}
