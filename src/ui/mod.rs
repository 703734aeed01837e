//! Terminal dashboard for watching a training run: cost charts, epoch timing
//! and run statistics.

pub mod training_dashboard;
pub mod training_view;
