//! # OR Board Core
//!
//! 手术室看板的核心模块，提供基础数据结构、错误定义和日历工具。

pub mod calendar;
pub mod error;
pub mod models;

pub use error::{OrBoardError, Result};
pub use models::*;
