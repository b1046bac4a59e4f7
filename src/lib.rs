//! # cropkit
//!
//! Single-purpose image tools that run entirely on the local machine. The
//! core tool is crop → resize → export; around it sit a handful of one-shot
//! tools (color adjust, filters, channel average, watermark, convert) and a
//! batch resizer.
//!
//! # Architecture: Loader → Transform → Exporter
//!
//! Every tool has the same shape:
//!
//! ```text
//! 1. Load       FileInput   →  SourceImage     (type check + decode)
//! 2. Transform  SourceImage →  RenderedResult  (one parameterized op + encode)
//! 3. Export     RenderedResult → file          (fixed name, no retries)
//! ```
//!
//! No tool composes with another, none keeps state beyond its session, and
//! none talks to a network.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`loader`] | File intake, MIME check, decode; generation-tagged background loads |
//! | [`session`] | The crop/resize tool as a state machine (`Empty` / `Loaded` / `Rendered`) |
//! | [`imaging`] | Pure-Rust pixel work: crop, resample, filters, overlay, text, encode |
//! | [`export`] | Named artifacts and the download step |
//! | [`tools`] | One-shot tools built from the same three stages |
//! | [`batch`] | Directory walk + parallel fit-within resize |
//! | [`config`] | `cropkit.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//! | [`error`] | The [`ToolError`] taxonomy |
//!
//! # Design Decisions
//!
//! ## Newest Load Wins
//!
//! Decoding is the only work that leaves the caller's thread. Every load
//! gets a generation number; when a decode finishes after a newer file was
//! picked, its bitmap is dropped instead of replacing the newer one.
//!
//! ## Results Are Never Cached
//!
//! Each render goes back to the source bitmap. The encoded result lives
//! until the next load or reset, and re-rendering the same inputs produces
//! the same bytes.
//!
//! ## Bounded Canvases
//!
//! No transform allocates a bitmap larger than
//! [`imaging::MAX_CANVAS_SIDE`] per side or [`imaging::MAX_CANVAS_PIXELS`]
//! in total. Oversized requests fail as render errors instead of aborting
//! the process.
//!
//! ## Honest Names
//!
//! The tool usually labelled "remove background" averages color channels;
//! it does not segment anything. Here it is [`tools::average_channels`], and
//! only the CLI keeps the familiar `remove-bg` name.

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod imaging;
pub mod loader;
pub mod output;
pub mod session;
pub mod tools;

pub use error::ToolError;
pub use loader::{FileInput, SourceImage};
pub use session::{CropSession, LoadOutcome, ToolState};
