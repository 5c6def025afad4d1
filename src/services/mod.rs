pub mod agronomist;
pub mod diagnosis;
pub mod gemini;
pub mod market;
pub mod metrics_manager;
pub mod session_manager;
