//! # legende-core
//!
//! Inference and post-processing library for légende, an image-captioning
//! service with English→French translation, built on the
//! [Candle](https://github.com/huggingface/candle) framework.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |---|---|
//! | [`models`] | Pretrained model wrappers (BLIP captioner, MarianMT translator) |
//! | [`translate`] | Translation seam: `Translator` trait, sentinel fallbacks, batching |
//! | [`text`] | Caption cleaning and word-tag derivation |
//! | [`utils`] | Device selection and image preprocessing |
//!
//! ## Feature flags
//!
//! | Flag | Effect |
//! |---|---|
//! | `cuda` | Enable CUDA devices (requires CUDA toolkit) |
//! | `metal` | Enable Metal devices on macOS |
//! | `accelerate` | Link against Apple Accelerate for CPU BLAS |

pub mod models;
pub mod text;
pub mod translate;
pub mod utils;
