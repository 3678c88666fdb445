//! Chart pattern and trend recognition
//!
//! - [`swings`]: swing-point segmentation into high-to-low waves
//! - [`vcp`]: Volatility Contraction Pattern detection
//! - [`stage`]: market stage classification
//! - [`trend_template`]: six-point trend template

pub mod stage;
pub mod swings;
pub mod trend_template;
pub mod vcp;

pub use stage::{classify_stage, stage_at, Stage, StageInputs};
pub use swings::{SwingKind, SwingPoint, Wave};
pub use trend_template::{TrendTemplate, TrendTemplateResult};
pub use vcp::{VcpDetector, VcpResult};
