pub mod args;

pub use args::{Args, QueuePolicyArg, Source};
