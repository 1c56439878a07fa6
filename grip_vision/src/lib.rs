// THEORY:
// This file is the main entry point for the `grip_vision` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the `live_tester` camera
// loop or the replay runner in `main.rs`).
//
// The primary goal is to export the `GripPipeline` and its associated data
// structures (`PipelineConfig`, `FrameAnalysis`, `Report`, etc.) as the clean,
// high-level interface for the whole classification engine. The geometric rules,
// classifiers, fusion and debounce logic live in `core_modules` and can be tested
// in isolation from any camera, detector or playback service.

pub mod config;
pub mod core_modules;
pub mod detection;
pub mod display;
pub mod pipeline;
pub mod replay;
