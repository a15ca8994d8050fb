//! Common types shared across the legend services.
//!
//! Holds the layer tree model, the permission filter and the image source
//! resolver. Everything here is synchronous and free of I/O apart from the
//! file existence checks done by [`source::DirectoryLocator`].

pub mod error;
pub mod filter;
pub mod layer;
pub mod request;
pub mod schema;
pub mod source;

pub use error::{LegendError, LegendResult};
pub use filter::{filter, FilterOutcome, FilteredNode};
pub use layer::{LayerNode, LegendImageRef, NodeRef, ServiceCatalog, WmsService};
pub use request::{LegendParams, LegendType, RequestedLayer};
pub use schema::{build_catalog, load_services, NodeEntry, SchemaError, ServiceEntry};
pub use source::{
    resolve, DirectoryLocator, ImageLocator, ImageSource, NoLocator, RemoteRender, ResolveContext,
};
