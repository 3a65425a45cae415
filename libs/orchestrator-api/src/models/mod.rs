//! API models

pub mod config;
pub mod envelope;
pub mod history;
pub mod timeline;

pub use config::{
    CodeEditorValueDto, ConfigListDto, ConfigResourceDto, ConfigSnapshotResponseDto, ConfigValueDto,
};
pub use envelope::{ApiEnvelope, ApiErrorDto};
pub use history::{GitTriggerDto, HistoryRecordDto, HistoryResponseDto};
pub use timeline::{ResourceDetailDto, TimelineEventDto, TimelineResponseDto};
