pub mod document;

pub use document::{
    DocumentAsset, DocumentAssetResponse, DocumentAssetUpdate, DocumentStatus, PageAsset, TextSpan,
};
