pub mod answers;
pub mod check;
pub mod context;
pub mod run;
