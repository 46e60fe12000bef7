//! Turning a raw command line into something that can be run: tokens, the
//! redirection plan, and the resolved executable.

pub mod redirection;
pub mod resolver;
pub mod tokenizer;
