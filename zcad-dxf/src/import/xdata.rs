//! 扩展数据与句柄写入对象的用户数据。

use zcad_core::document::{Entity, XDataRecord};
use zcad_kernel::{ExtendedEntityData, UserData, UserValue, XValue};

/// 保存原始 DXF 句柄（十六进制文本）的用户数据键。
pub const HANDLE_KEY: &str = "DxfImport.Handle";

pub(super) fn user_data(entity: &Entity) -> UserData {
    let mut data = UserData::default();
    if !entity.handle().is_null() {
        data.insert(HANDLE_KEY, UserValue::Text(entity.handle().to_string()));
    }
    for xdata in &entity.common.xdata {
        let mut extended = ExtendedEntityData::new(xdata.app_id.clone());
        for record in &xdata.records {
            extended.push(record.code(), record_value(record));
        }
        data.insert(xdata.app_id.clone(), UserValue::ExtendedData(extended));
    }
    data
}

fn record_value(record: &XDataRecord) -> XValue {
    match record {
        XDataRecord::String(text) | XDataRecord::LayerName(text) => XValue::Text(text.clone()),
        XDataRecord::ControlString(open) => XValue::Bool(*open),
        XDataRecord::BinaryData(bytes) => XValue::Bytes(bytes.clone()),
        XDataRecord::Handle(handle) => XValue::Handle(handle.get()),
        XDataRecord::Coordinate(point) | XDataRecord::WorldCoordinate(point) => {
            XValue::Point(*point)
        }
        XDataRecord::WorldDisplacement(vector) | XDataRecord::WorldDirection(vector) => {
            XValue::Point(vector.as_vec3().into())
        }
        XDataRecord::Real(value) | XDataRecord::Distance(value) | XDataRecord::ScaleFactor(value) => {
            XValue::Real(*value)
        }
        XDataRecord::Integer16(value) => XValue::Int16(*value),
        XDataRecord::Integer32(value) => XValue::Int32(*value),
    }
}
