// Interview lifecycle: creation, outbound screening calls, call-end intake and
// transcript analysis. Provider access goes through voice_client and llm_client.

pub mod analysis;
pub mod handlers;
pub mod lifecycle;
pub mod prompts;
pub mod queue;
pub mod store;
pub mod webhook;

#[cfg(test)]
pub mod testing;
