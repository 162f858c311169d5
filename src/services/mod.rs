pub mod callback;
pub mod poll;
pub mod reconciler;
pub mod submitter;
pub mod worker;
