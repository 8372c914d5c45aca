//! 块定义与插入。

use tracing::debug;
use zcad_core::document::{Entity, EntityKind, Insert};
use zcad_kernel::Block;

use super::ExportSession;
use crate::errors::IoError;

/// 块名中不允许出现的字符。
const INVALID_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', ';', ',', '=', '`'];

impl ExportSession<'_> {
    pub(super) fn anonymous_name(&mut self) -> String {
        loop {
            self.anonymous_blocks += 1;
            let name = format!("AnonymousBlock{}", self.anonymous_blocks);
            if self.document.block_by_name(&name).is_none() {
                return name;
            }
        }
    }

    fn is_valid_block_name(&self, name: &str) -> bool {
        !name.trim().is_empty()
            && !name.contains(INVALID_NAME_CHARS)
            && self.document.block_by_name(name).is_none()
    }

    /// 块写成块定义加一个位于参考点的插入。名称不可用时改为匿名块。
    pub(super) fn block(&mut self, block: &Block) -> Result<Vec<Entity>, IoError> {
        let mut entities = Vec::with_capacity(block.children().len());
        for child in block.children() {
            entities.extend(self.convert(child)?);
        }
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let name = if self.is_valid_block_name(&block.name) {
            block.name.clone()
        } else {
            let name = self.anonymous_name();
            debug!(original = %block.name, renamed = %name, "块名不可用，改为匿名块");
            name
        };
        let handle = self.document.add_block(name, block.ref_point, entities);
        Ok(vec![Entity::new(EntityKind::Insert(Insert::new(
            handle,
            block.ref_point,
        )))])
    }
}

#[cfg(test)]
mod tests {
    use zcad_config::ConverterConfig;
    use zcad_core::geometry::Point3;
    use zcad_kernel::{GeoObject, Line, Project};

    use super::*;

    fn named(name: &str) -> Block {
        let mut block = Block::new(name).with_children(vec![GeoObject::new(Line::new(
            Point3::ORIGIN,
            Point3::new(1.0, 0.0, 0.0),
        ))]);
        block.ref_point = Point3::new(5.0, 5.0, 0.0);
        block
    }

    fn block_name(session: &ExportSession<'_>, entity: &Entity) -> String {
        let EntityKind::Insert(insert) = &entity.kind else {
            panic!("应为插入");
        };
        assert!(insert.insert_point.approx_eq(Point3::new(5.0, 5.0, 0.0), 1e-12));
        session
            .document
            .block(insert.block)
            .map(|record| record.name.clone())
            .expect("块应存在")
    }

    #[test]
    fn block_keeps_valid_name_and_reference_point() {
        let project = Project::new();
        let config = ConverterConfig::default();
        let mut session = ExportSession::new(&project, &config);
        let entities = session.block(&named("Door")).expect("导出失败");
        assert_eq!(block_name(&session, &entities[0]), "Door");
        let record = session.document.block_by_name("Door").expect("块应存在");
        assert!(record.base_point.approx_eq(Point3::new(5.0, 5.0, 0.0), 1e-12));
    }

    #[test]
    fn invalid_or_duplicate_names_become_anonymous() {
        let project = Project::new();
        let config = ConverterConfig::default();
        let mut session = ExportSession::new(&project, &config);
        let first = session.block(&named("Door")).expect("导出失败");
        let duplicate = session.block(&named("Door")).expect("导出失败");
        let invalid = session.block(&named("a/b")).expect("导出失败");
        let empty = session.block(&named("")).expect("导出失败");
        assert_eq!(block_name(&session, &first[0]), "Door");
        assert_eq!(block_name(&session, &duplicate[0]), "AnonymousBlock1");
        assert_eq!(block_name(&session, &invalid[0]), "AnonymousBlock2");
        assert_eq!(block_name(&session, &empty[0]), "AnonymousBlock3");
    }

    #[test]
    fn empty_block_exports_nothing() {
        let project = Project::new();
        let config = ConverterConfig::default();
        let mut session = ExportSession::new(&project, &config);
        assert!(session.block(&Block::new("Empty")).expect("导出失败").is_empty());
        assert_eq!(session.document.blocks().count(), 0);
    }
}
