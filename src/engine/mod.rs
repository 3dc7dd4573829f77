pub mod chart;
pub mod pipeline;
pub mod response;
pub mod rules;
pub mod summarizer;
pub mod synthesizer;
