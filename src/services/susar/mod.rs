// SUSAR 拆分：按项目编号把不良事件表拆成本项目 / 非本项目两份文档。
pub mod classifier;
pub mod error;
pub mod keywords;
pub mod locator;
pub mod metadata;
pub mod naming;
pub mod package;
pub mod pdf;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod sheet;
mod styles;
pub mod workbook_export;

pub use error::SusarError;
pub use keywords::{KeywordProfile, Limits, Placeholders, SusarSettings};
pub use pipeline::{process, OutputFormat, ProcessOutcome, ProcessRequest};
