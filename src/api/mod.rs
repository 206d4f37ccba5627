//! Backend access: the authenticated primary client, the credential-free OCR
//! client, typed endpoint wrappers, and the wire types they share.

pub mod client;
pub mod ocr;
pub mod service;
pub mod types;

pub use client::ApiClient;
pub use ocr::OcrClient;
pub use types::ApiError;
