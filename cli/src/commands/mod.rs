pub mod extract;
pub mod input;
pub mod remote;
pub mod report;
pub mod unify;
