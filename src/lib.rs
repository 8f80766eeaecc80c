//! A tree‑walking interpreter for the Lox scripting language.
//!
//! Source text flows through [`scanner`] → [`parser`] → [`resolver`] →
//! [`interpreter`]; [`session::Session`] strings the phases together and keeps
//! interpreter state alive between runs.
//!
//! Known limitation: there is no bound on recursion depth, so very deep
//! nesting or runaway recursion in a Lox program overflows the host stack.

pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod token;
pub mod value;
