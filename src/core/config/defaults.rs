pub const DEFAULT_TOPIC: &str = "Roman Empire";
pub const DEFAULT_COLLECTION: &str = "roman_empire";

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_TOP_K: usize = 4;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo-0125";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

pub const DEFAULT_WIKIPEDIA_URL: &str = "https://{lang}.wikipedia.org";

pub const DEFAULT_SINK_ENDPOINT: &str = "http://localhost:6006";
pub const DEFAULT_SINK_PORT: u16 = 6006;
pub const DEFAULT_MONITOR_PORT: u16 = 6008;
pub const DEFAULT_FEEDBACK_TIMEOUT_SECS: u64 = 5;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// System instruction. `{context}` is replaced with the retrieved passages.
pub const DEFAULT_SYSTEM_TEMPLATE: &str = "You are a knowledgeable historian specialized in the Roman Empire.
Use the following context to answer questions about Roman history, culture, and society.
If you're not sure about something, admit it and stick to what's provided in the context.

Context: {context}";

/// User turn. `{question}` is replaced with the raw question.
pub const DEFAULT_HUMAN_TEMPLATE: &str = "{question}";

pub const APOLOGY_MESSAGE: &str =
    "I apologize, but I encountered an error while processing your question. Please try again.";
