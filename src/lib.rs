#![forbid(unsafe_code)]

pub mod batch;
pub mod cli;
pub mod client;
pub mod epub;
pub mod index;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod sanitize;
pub mod throttle;
