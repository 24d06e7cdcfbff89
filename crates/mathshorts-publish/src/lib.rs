//! # MathShorts Publish
//!
//! Hands approved bundles to the video-hosting platform, one language
//! at a time. Fails-soft per language: a failed upload is a
//! `PublishOutcome` with `succeeded = false`, and siblings carry on.

pub mod upload;

pub use upload::VideoUploadSink;
