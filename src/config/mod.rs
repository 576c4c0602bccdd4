//! Configuration module for Klipp.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChunkingSettings, GeneralSettings, RankingSettings, RefineSettings, Settings,
    TranscriptSettings, VideoSettings,
};
