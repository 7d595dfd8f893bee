//! # AIIE Core
//!
//! 影像检查适宜性训练系统的核心模块，提供临床数据模型、考核数据模型、错误定义和通用工具。

pub mod clinical;
pub mod error;
pub mod models;
pub mod utils;

pub use clinical::*;
pub use error::{AiieError, Result};
pub use models::*;
