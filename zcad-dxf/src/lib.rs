//! DXF 文档与内核项目之间的双向转换。
//!
//! 字节流读写由外部实现的 [`DocumentLoader`] / [`DocumentSaver`] 负责，
//! 本 crate 只处理已解析的 [`Document`]。

use std::path::Path;

use tracing::info;
use zcad_config::ConverterConfig;
use zcad_core::document::Document;
use zcad_kernel::Project;

pub mod export;
pub mod import;

pub use export::ExportSession;
pub use import::{ImportSession, process_acad_string};

pub mod errors {
    use std::path::PathBuf;

    use thiserror::Error;
    use zcad_core::document::Handle;
    use zcad_kernel::KernelError;

    #[derive(Debug, Error)]
    pub enum IoError {
        #[error("unsupported feature: {0}")]
        UnsupportedFeature(String),
        #[error("failed to read file {path:?}: {source}")]
        ReadError {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        #[error("failed to write file {path:?}: {source}")]
        WriteError {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        #[error("invalid document structure: {0}")]
        InvalidDocument(String),
        #[error("invalid parameter: {0}")]
        InvalidParameter(String),
        #[error("block {handle} references itself")]
        CyclicBlockReference { handle: Handle },
        #[error("extended data record {code}: {message}")]
        XData { code: i16, message: String },
        #[error(transparent)]
        Kernel(#[from] KernelError),
    }
}

pub use errors::IoError;

/// 把文件读成已解析的 DXF 文档。
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

/// 把 DXF 文档写入文件。
pub trait DocumentSaver {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
}

/// 读取 DXF 文件并转换为内核项目。
pub fn import_file(
    loader: &dyn DocumentLoader,
    path: &Path,
    config: &ConverterConfig,
) -> Result<Project, IoError> {
    info!(path = %path.display(), "读取 DXF 文件");
    let document = loader.load(path)?;
    let project = ImportSession::new(&document, config).import()?;
    info!(
        models = project.models().len(),
        layers = project.layers.len(),
        "DXF 导入完成"
    );
    Ok(project)
}

/// 把项目中待导出的模型写成 DXF 文件。
pub fn export_file(
    saver: &dyn DocumentSaver,
    project: &Project,
    path: &Path,
    config: &ConverterConfig,
) -> Result<(), IoError> {
    let document = ExportSession::new(project, config).export()?;
    info!(
        path = %path.display(),
        entities = document.model_space().len(),
        blocks = document.blocks().count(),
        "写出 DXF 文件"
    );
    saver.save(&document, path)
}
