//! # AIIE
//!
//! 影像检查适宜性评分与限时考核引擎的统一入口。

pub use aiie_achievements as achievements;
pub use aiie_admin as admin;
pub use aiie_assessment as assessment;
pub use aiie_core as domain;
pub use aiie_scoring as scoring;

pub use aiie_core::{AiieError, Result};
