pub mod attributes;
pub mod bspline;
pub mod curve;
pub mod face;
pub mod nurbs;
pub mod object;
pub mod project;
pub mod sew;
pub mod shape;
pub mod userdata;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum KernelError {
        #[error("invalid parameter: {0}")]
        InvalidParameter(String),
        #[error("degenerate geometry: {0}")]
        Degenerate(String),
    }

    impl KernelError {
        pub(crate) fn invalid(message: impl Into<String>) -> Self {
            Self::InvalidParameter(message.into())
        }
    }
}

pub use attributes::{
    AttributeList, ColorDef, ColorId, ColorSource, HatchStyle, HatchStyleId, Layer, LayerId,
    LinePattern, LinePatternId, LineWidth, LineWidthId,
};
pub use bspline::BSpline;
pub use curve::{Curve, Ellipse, Line, Path, Polyline};
pub use errors::KernelError;
pub use face::{Face, Shell, Solid};
pub use object::{
    Attributes, Block, GeoObject, Geometry, Hatch, LineAlignment, Point, PointSymbol, Text,
    TextAlignment,
};
pub use project::{Model, Project};
pub use sew::VertexPool;
pub use shape::{Border, CompoundShape};
pub use userdata::{ExtendedEntityData, UserData, UserValue, XValue};
