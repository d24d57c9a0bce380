pub mod claude_api;
pub mod document_store;
pub mod loading_optimizer;
pub mod loading_prompt;
pub mod response_sanitizer;
pub mod scripted_generator;
