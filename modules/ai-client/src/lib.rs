pub mod error;
pub mod gemini;
pub mod schema;

pub use error::{ClientError, ClientResult};
pub use gemini::Gemini;
pub use schema::StructuredOutput;
