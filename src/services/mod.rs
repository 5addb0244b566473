//! Assistant services.
//!
//! ARCHITECTURE
//! ============
//! `completion` turns a prompt into a typed reply using the LLM adapter;
//! `conversation` owns the message history and drives `completion`. The
//! terminal front end in `repl` only talks to `conversation`.

pub mod completion;
pub mod conversation;
