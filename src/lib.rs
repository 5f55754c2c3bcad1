//! # instagrandad
//!
//! A small family photo-sharing service. Family members upload photos with a
//! short description; grandad pages through them in a gallery.
//!
//! # Architecture
//!
//! Three parts, each usable on its own:
//!
//! ```text
//! files ──► Upload Pipeline ──► Image Codec       (validate, resize, re-encode)
//!                 │
//!                 └──► Photo Store ◄── HTTP API ◄── gallery / CLI
//! ```
//!
//! - The **image codec** turns an in-memory image into a bounded full-size
//!   rendition and a thumbnail. It performs no I/O.
//! - The **upload pipeline** validates each selected file, encodes it (with a
//!   process-lifetime cache), builds a [`types::Photo`] and submits it. Files
//!   go in batches of three; a failing file does not sink the batch.
//! - The **photo store** keeps the whole gallery as one JSON document under one
//!   key, newest first, and serves it page by page.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Validation, aspect-preserving resize, WebP/JPEG encoding |
//! | [`upload`] | Batched upload pipeline with partial-failure reporting |
//! | [`cache`] | LRU encode cache keyed by (filename, size, mtime) |
//! | [`data_uri`] | `data:<mime>;base64,...` encoding and parsing |
//! | [`store`] | Versioned key-value backends and the photo document on top |
//! | [`server`] | axum HTTP API: listing, upload/delete commands, raw image bytes |
//! | [`client`] | reqwest client for a running server |
//! | [`config`] | `instagrandad.toml` loading, merging and validation |
//! | [`types`] | Photo records and pagination shared by every layer |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Document, Optimistic Writes
//!
//! The gallery is small and read far more often than written, so it lives in
//! a single JSON array that is rewritten on every change. Writes are
//! conditional on the etag that was read and retried a bounded number of
//! times, so two relatives uploading at once both keep their photos. The
//! older last-write-wins behaviour remains available as a write policy.
//!
//! ## Images Travel As Data-URIs
//!
//! Photo records embed their images, which keeps the store a plain key-value
//! blob with no separate object storage. The price is size, which is why
//! large originals are re-encoded to 1200px WebP and every photo carries a
//! 300px thumbnail for the gallery grid.

pub mod cache;
pub mod client;
pub mod config;
pub mod data_uri;
pub mod imaging;
pub mod output;
pub mod server;
pub mod store;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
