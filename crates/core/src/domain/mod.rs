pub mod plan;
pub mod review;
pub mod run;
pub mod state;
pub mod task;
