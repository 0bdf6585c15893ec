pub mod conversation;
pub mod run;
