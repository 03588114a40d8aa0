pub mod provider_client;

pub use provider_client::{ChatClient, ChatRequest, ChatResponse, ProviderClient};
